//! Results of a design run, read back from the solution of the design problem.
//!
//! Annual energies are reported in MWh and hourly powers in kW. Annual quantities are weighted by
//! the number of calendar days each representative day stands for, and hourly profiles are
//! expanded back to the full calendar year.
use crate::carrier::Carrier;
use crate::device::{Device, DeviceKind, DeviceModel};
use crate::model::Model;
use crate::optimisation::variables::{CostVariables, DeviceVariables};
use crate::optimisation::{DesignSolution, Variable};
use crate::reference::ReferenceResult;
use crate::time_series::{DayProfiles, DemandStatistics};
use crate::units::{Area, Capacity, Co2, Energy, Money};
use crate::wind::normalised_power;
use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Capacity above which a device counts as installed (kW or kWh)
const USED_CAPACITY: f64 = 0.1;

/// Capacity up to which the full-load hours are reported as zero
const MIN_CAPACITY_FOR_FULL_LOAD: f64 = 0.01;

/// Annual generation (MWh) below which a device which is not a storage is left out
const MIN_GENERATION: f64 = 1e-3;

/// Specific heat capacity of water (kJ/(kg K))
const WATER_HEAT_CAPACITY: f64 = 4.18;

/// Density of water (kg/m³)
const WATER_DENSITY: f64 = 1000.0;

/// Results for one installed device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceResult {
    /// Installed capacity (kW, or kWh for storages)
    pub capacity: Capacity,
    /// Annual generation of the main output, or the discharged energy of a storage (MWh)
    pub generation: f64,
    /// Annual electricity generation of a cogeneration unit (MWh)
    pub generation_power: Option<f64>,
    /// Annual heat generation of a cogeneration unit (MWh)
    pub generation_heat: Option<f64>,
    /// Generation divided by capacity (h)
    pub full_load_hours: f64,
    /// Largest hourly output (kW)
    pub peak_generation: f64,
    /// Number of full charge cycles of a storage
    pub charge_cycles: Option<f64>,
    /// Renewable energy which was available but not used (MWh)
    pub curtailment: Option<f64>,
    /// Installed area of a solar device (m²)
    pub area: Option<Area>,
    /// Volume of a water tank (m³)
    pub volume: Option<f64>,
    /// Mean coefficient of performance of a heat pump
    pub mean_cop: Option<f64>,
    /// Annualised investment cost
    pub investment_cost: Money,
    /// Annual O&M cost
    pub om_cost: Money,
    /// Cost of the carriers the device consumes
    pub demand_cost: Money,
    /// Sum of the cost components
    pub total_cost: Money,
}

/// Breakdown of the total annualised cost
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TotalCosts {
    /// Total annualised cost
    pub tac: Money,
    /// Annualised investment of all devices
    pub investment: Money,
    /// O&M of all devices
    pub om: Money,
    /// Costs of the carriers consumed by devices
    pub demand_related: Money,
    /// Energy costs of all imports
    pub supply: Money,
    /// Costs of grid capacity
    pub capacity: Money,
    /// Revenue for exported electricity
    pub feed_in_revenue: Money,
    /// Tax on the emissions of burnt fuels
    pub co2_tax: Money,
}

/// Emissions caused and credited for one carrier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CarrierEmissions {
    /// Emissions of the imported carrier
    pub generated: Co2,
    /// Credit for the exported carrier
    pub credited: Co2,
}

/// Breakdown of the annual CO₂ emissions (kg)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Co2Emissions {
    /// Emissions minus credits
    pub net: Co2,
    /// Emissions of fuels burnt in the hub
    pub onsite: Co2,
    /// Emissions of imported electricity
    pub grid: Co2,
    /// Credit for exported electricity
    pub feed_in_credit: Co2,
    /// Emissions of each imported carrier
    pub by_carrier: IndexMap<Carrier, CarrierEmissions>,
    /// Tax paid on the emissions of burnt fuels
    pub tax: Money,
}

/// Exchange of one carrier with the outside of the hub
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridFlows {
    /// Annual import (MWh)
    pub import: f64,
    /// Largest hourly import (kW)
    pub max_import: f64,
    /// Annual export (MWh)
    pub export: Option<f64>,
    /// Largest hourly export (kW)
    pub max_export: Option<f64>,
    /// Capacity of the grid connection (kW)
    pub capacity: Option<Capacity>,
}

/// Costs and revenues of one carrier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SupplyCosts {
    /// Energy costs of imports
    pub supply: Money,
    /// Costs of the grid connection
    pub capacity: Option<Money>,
    /// Revenue for exports
    pub feed_in_revenue: Option<Money>,
    /// Supply and capacity costs minus feed-in revenue
    pub total: Money,
}

/// The complete result of a design run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioResult {
    /// Installed devices
    pub devices: IndexMap<DeviceKind, DeviceResult>,
    /// Breakdown of the total annualised cost
    pub total_costs: TotalCosts,
    /// Breakdown of the emissions
    pub co2_emissions: Co2Emissions,
    /// Exchange of each importable carrier
    pub grid_flows: IndexMap<Carrier, GridFlows>,
    /// Costs and revenues of each importable carrier
    pub supply_costs: IndexMap<Carrier, SupplyCosts>,
    /// The conventional system the design is compared with
    pub reference: Option<ReferenceResult>,
    /// Share of renewable generation in all energy used (%)
    pub renewable_share: f64,
    /// Statistics of the unclustered demand
    pub demands: DemandStatistics,
    /// Whether the solver proved optimality within the MIP gap
    pub optimal: bool,
}

/// Weighted annual sum of a profile in MWh
fn annual_mwh(model: &Model, profile: &DayProfiles) -> f64 {
    model.days.weighted_sum(profile) / 1000.0
}

/// Weighted annual sum of `potential - output` where positive, in MWh
fn curtailed_mwh<F>(model: &Model, output: &DayProfiles, potential: F) -> f64
where
    F: Fn(usize, usize) -> f64,
{
    output
        .iter()
        .map(|(day, hour, value)| model.days.weight(day) * (potential(day, hour) - value).max(0.0))
        .sum::<f64>()
        / 1000.0
}

/// Energy which a renewable device could have produced but did not
fn curtailment(
    model: &Model,
    device: &Device,
    output: &DayProfiles,
    capacity: f64,
    area: f64,
) -> Option<f64> {
    let weather = &model.days.weather;
    match &device.model {
        DeviceModel::Solar { efficiency, .. } => Some(curtailed_mwh(model, output, |day, hour| {
            weather.ghi.get(day, hour) / 1000.0 * efficiency.value() * area
        })),
        DeviceModel::Wind {
            hub_height,
            reference_height,
            roughness_exponent,
        } => {
            let norm = normalised_power(
                &weather.wind_speed,
                *hub_height,
                *reference_height,
                *roughness_exponent,
            );
            Some(curtailed_mwh(model, output, |day, hour| {
                norm.get(day, hour) * capacity
            }))
        }
        DeviceModel::Hydro { potential } => Some(curtailed_mwh(model, output, |_, _| {
            capacity.min(potential.value())
        })),
        _ => None,
    }
}

/// Results of a single device, if it was installed and used
fn device_result(
    model: &Model,
    device: &Device,
    vars: &DeviceVariables,
    solution: &DesignSolution,
) -> Option<DeviceResult> {
    let capacity = solution.value(vars.capacity);
    if capacity <= USED_CAPACITY {
        return None;
    }

    let flow = |carrier: Carrier| {
        vars.flows
            .get(&carrier)
            .map(|vars| solution.slot_values(vars))
    };
    let area = vars.area.map(|var| solution.value(var));

    let mut result = DeviceResult {
        capacity: Capacity(capacity),
        generation: 0.0,
        generation_power: None,
        generation_heat: None,
        full_load_hours: 0.0,
        peak_generation: 0.0,
        charge_cycles: None,
        curtailment: None,
        area: area.map(Area),
        volume: None,
        mean_cop: None,
        investment_cost: Money(solution.value(vars.costs.investment)),
        om_cost: Money(solution.value(vars.costs.om)),
        demand_cost: Money(solution.value(vars.costs.demand)),
        total_cost: Money(solution.value(vars.costs.total)),
    };

    match &device.model {
        DeviceModel::Storage { delta_t, .. } => {
            let charge = solution.slot_values(&vars.storage.as_ref()?.charge);
            let discharge = charge.map(|value| (-value).max(0.0));
            result.generation = annual_mwh(model, &discharge);
            result.peak_generation = discharge.peak();
            let throughput = model.days.weighted_sum(&charge.map(f64::abs));
            result.charge_cycles = Some(throughput / 2.0 / capacity);
            result.volume = delta_t.map(|delta_t| {
                capacity / (WATER_HEAT_CAPACITY * WATER_DENSITY * delta_t) * 3600.0
            });
        }
        DeviceModel::Chp { .. } | DeviceModel::FuelCell { .. } => {
            let power = flow(Carrier::Electricity)?;
            let heat = flow(Carrier::Heat)?;
            result.generation = annual_mwh(model, &power);
            result.generation_power = Some(result.generation);
            result.generation_heat = Some(annual_mwh(model, &heat));
            result.peak_generation = power
                .iter()
                .map(|(day, hour, value)| value + heat.get(day, hour))
                .fold(0.0, f64::max);
        }
        model_kind => {
            let output = flow(model_kind.primary_output()?)?;
            result.generation = annual_mwh(model, &output);
            result.peak_generation = output.peak();
            result.curtailment =
                curtailment(model, device, &output, capacity, area.unwrap_or_default());
            if let DeviceModel::HeatPump { .. } = model_kind {
                let power = annual_mwh(model, &flow(Carrier::Electricity)?);
                result.mean_cop = (power > 0.0).then(|| result.generation / power);
            }
        }
    }

    if !device.is_storage() && result.generation < MIN_GENERATION {
        return None;
    }
    if capacity > MIN_CAPACITY_FOR_FULL_LOAD {
        result.full_load_hours = result.generation * 1000.0 / capacity;
    }

    Some(result)
}

impl ScenarioResult {
    /// Read the results of a design back from the solution.
    ///
    /// # Arguments
    ///
    /// * `model` - The model which was optimised
    /// * `solution` - The solution of the design problem
    /// * `reference` - The result of the reference system, if one was calculated
    pub fn new(
        model: &Model,
        solution: &DesignSolution,
        reference: Option<ReferenceResult>,
    ) -> Self {
        let variables = &solution.variables;
        let money = |var| Money(solution.value(var));

        let devices: IndexMap<_, _> = model
            .catalog
            .iter()
            .filter_map(|device| {
                let vars = &variables.devices[&device.kind];
                device_result(model, device, vars, solution).map(|result| (device.kind, result))
            })
            .collect();

        let mut grid_flows = IndexMap::new();
        let mut supply_costs = IndexMap::new();
        let mut by_carrier = IndexMap::new();
        for (carrier, vars) in &variables.carriers {
            let import = solution.slot_values(&vars.import);
            let export = vars.export.as_ref().map(|vars| solution.slot_values(vars));
            grid_flows.insert(
                *carrier,
                GridFlows {
                    import: annual_mwh(model, &import),
                    max_import: import.peak(),
                    export: export.as_ref().map(|export| annual_mwh(model, export)),
                    max_export: export.as_ref().map(DayProfiles::peak),
                    capacity: vars.grid_capacity.map(|var| Capacity(solution.value(var))),
                },
            );

            let supply = money(vars.supply_cost);
            let capacity = vars.capacity_cost.map(money);
            let revenue = vars.feed_in_revenue.map(money);
            supply_costs.insert(
                *carrier,
                SupplyCosts {
                    supply,
                    capacity,
                    feed_in_revenue: revenue,
                    total: supply + capacity.unwrap_or_default() - revenue.unwrap_or_default(),
                },
            );

            let parameters = model.parameters.supply(*carrier);
            let credited = vars.export_total.map_or(Co2(0.0), |var| {
                parameters.co2_feed_in_factor * Energy(solution.value(var))
            });
            by_carrier.insert(
                *carrier,
                CarrierEmissions {
                    generated: parameters.co2_factor * Energy(solution.value(vars.import_total)),
                    credited,
                },
            );
        }

        // Unused devices still contribute their fixed O&M
        let sum_devices = |cost: fn(&CostVariables) -> Variable| -> Money {
            variables
                .devices
                .values()
                .map(|vars| money(cost(&vars.costs)))
                .sum()
        };
        let sum_supply = |cost: fn(&SupplyCosts) -> Option<Money>| -> Money {
            supply_costs.values().filter_map(cost).sum()
        };
        let total_costs = TotalCosts {
            tac: money(variables.tac),
            investment: sum_devices(|costs| costs.investment),
            om: sum_devices(|costs| costs.om),
            demand_related: sum_devices(|costs| costs.demand),
            supply: sum_supply(|costs| Some(costs.supply)),
            capacity: sum_supply(|costs| costs.capacity),
            feed_in_revenue: sum_supply(|costs| costs.feed_in_revenue),
            co2_tax: money(variables.co2_tax),
        };

        let grid = by_carrier
            .get(&Carrier::Electricity)
            .map_or(Co2(0.0), |emissions| emissions.generated);
        let generated: Co2 = by_carrier.values().map(|emissions| emissions.generated).sum();
        let co2_emissions = Co2Emissions {
            net: Co2(solution.value(variables.co2)),
            onsite: generated - grid,
            grid,
            feed_in_credit: by_carrier.values().map(|emissions| emissions.credited).sum(),
            by_carrier,
            tax: total_costs.co2_tax,
        };

        let renewable: f64 = devices
            .iter()
            .filter(|(kind, _)| kind.is_renewable())
            .map(|(_, device)| device.generation)
            .sum();
        let imports: f64 = grid_flows.values().map(|flows| flows.import).sum();
        let renewable_share = if renewable + imports > 0.0 {
            renewable / (renewable + imports) * 100.0
        } else {
            0.0
        };

        Self {
            devices,
            total_costs,
            co2_emissions,
            grid_flows,
            supply_costs,
            reference,
            renewable_share,
            demands: DemandStatistics::new(&model.hourly.demand),
            optimal: solution.optimal,
        }
    }

    /// Read a result previously written as JSON
    pub fn from_path(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Could not read results from {}", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Invalid results file {}", path.display()))
    }
}

/// Hourly profiles of the whole calendar year, in column order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct YearProfiles(IndexMap<String, Vec<f64>>);

impl YearProfiles {
    /// Expand the dispatch of the representative days to every hour of the year.
    ///
    /// Contains the demand, the flows of every installed device (the state of charge of storages
    /// is already hourly) and the imports and exports of every carrier.
    pub fn new(model: &Model, solution: &DesignSolution) -> Self {
        let mapping = &model.days.mapping;
        let mut columns = IndexMap::new();
        for (carrier, series) in model.hourly.demand.iter() {
            columns.insert(format!("demand_{}", carrier.profile_label()), series.clone());
        }

        for device in model.catalog.iter() {
            let vars = &solution.variables.devices[&device.kind];
            if solution.value(vars.capacity) <= USED_CAPACITY {
                continue;
            }

            let kind = device.kind;
            for (carrier, flow) in &vars.flows {
                let name = format!("{kind}_{}", carrier.profile_label());
                columns.insert(name, mapping.expand(&solution.slot_values(flow)));
            }
            if let DeviceModel::HeatPump { .. } = device.model
                && let (Some(heat), Some(power)) = (
                    vars.flows.get(&Carrier::Heat),
                    vars.flows.get(&Carrier::Electricity),
                )
            {
                let heat = solution.slot_values(heat);
                let power = solution.slot_values(power);
                let ambient = DayProfiles::new(
                    (0..heat.n_days())
                        .map(|day| {
                            let mut ambient = *heat.day(day);
                            for (value, power) in ambient.iter_mut().zip(power.day(day)) {
                                *value -= power;
                            }
                            ambient
                        })
                        .collect(),
                );
                columns.insert(format!("{kind}_ambient"), mapping.expand(&ambient));
            }
            if let Some(storage) = &vars.storage {
                let charge = solution.slot_values(&storage.charge);
                columns.insert(format!("ch_{kind}"), mapping.expand(&charge));
                columns.insert(format!("soc_{kind}"), solution.values_of(&storage.soc));
            }
        }

        for (carrier, vars) in &solution.variables.carriers {
            let label = carrier.profile_label();
            let import = solution.slot_values(&vars.import);
            columns.insert(format!("import_{label}"), mapping.expand(&import));
            if let Some(export) = &vars.export {
                let export = solution.slot_values(export);
                columns.insert(format!("export_{label}"), mapping.expand(&export));
            }
        }

        Self(columns)
    }

    /// The profile with the given column name
    pub fn get(&self, name: &str) -> Option<&[f64]> {
        self.0.get(name).map(Vec::as_slice)
    }

    /// Iterate over the column names and profiles
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.0
            .iter()
            .map(|(name, series)| (name.as_str(), series.as_slice()))
    }
}
