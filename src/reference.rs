//! Rule-based dispatch of a conventional system used as a baseline for the optimised hub.
//!
//! The reference system always covers cooling with a compression chiller and hydrogen with an
//! electrolyser. Heat is covered by one of four combinations of CHP unit, heat pump and gas
//! boiler, chosen by the `[reference]` section of the model parameters.
use crate::carrier::Carrier;
use crate::device::{Device, DeviceKind, DeviceModel};
use crate::finance::CostFactors;
use crate::model::Model;
use crate::model::parameters::ReferenceParameters;
use crate::units::{Capacity, Co2, Energy, Money};
use anyhow::{Context, Result, bail};
use log::info;
use serde::{Deserialize, Serialize};
use strum::Display;

/// Which devices of the reference system cover the heat demand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReferenceState {
    /// CHP unit follows the power demand and a heat pump covers the remaining heat
    ChpHeatPump,
    /// CHP unit follows the power demand and a gas boiler covers the remaining heat
    ChpBoiler,
    /// A heat pump covers all heat
    HeatPumpOnly,
    /// A gas boiler covers all heat
    BoilerOnly,
}

impl ReferenceState {
    /// Choose the state from the enabled technologies
    pub fn new(enable_chp: bool, enable_hp: bool) -> Self {
        match (enable_chp, enable_hp) {
            (true, true) => Self::ChpHeatPump,
            (true, false) => Self::ChpBoiler,
            (false, true) => Self::HeatPumpOnly,
            (false, false) => Self::BoilerOnly,
        }
    }

    /// Whether the state operates a CHP unit
    pub fn uses_chp(self) -> bool {
        matches!(self, Self::ChpHeatPump | Self::ChpBoiler)
    }

    /// Whether the state operates a gas boiler
    pub fn uses_boiler(self) -> bool {
        matches!(self, Self::ChpBoiler | Self::BoilerOnly)
    }
}

/// Demand of a single hour
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HourDemand {
    /// Heat demand (kW)
    pub heat: f64,
    /// Cooling demand (kW)
    pub cooling: f64,
    /// Electricity demand (kW)
    pub power: f64,
    /// Hydrogen demand (kW)
    pub hydrogen: f64,
}

/// Flows of the reference system in a single hour (kW)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HourDispatch {
    /// Electricity produced by the CHP unit
    pub chp_power: f64,
    /// Gas burnt by the CHP unit
    pub chp_gas: f64,
    /// Heat produced by the CHP unit
    pub chp_heat: f64,
    /// Electricity consumed by the heat pump
    pub hp_power: f64,
    /// Heat produced by the heat pump
    pub hp_heat: f64,
    /// Heat produced by the gas boiler
    pub boiler_heat: f64,
    /// Gas burnt by the gas boiler
    pub boiler_gas: f64,
    /// Cooling produced by the chiller
    pub chiller_cooling: f64,
    /// Electricity consumed by the chiller
    pub chiller_power: f64,
    /// Hydrogen produced by the electrolyser
    pub elyz_hydrogen: f64,
    /// Electricity consumed by the electrolyser
    pub elyz_power: f64,
    /// Electricity drawn from the grid (negative values are fed in)
    pub grid_power: f64,
    /// Gas drawn from the grid
    pub grid_gas: f64,
}

/// Efficiencies of the reference technologies
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceSystem {
    /// Which devices cover the heat demand
    pub state: ReferenceState,
    /// Electrical and thermal efficiency of the CHP unit
    pub chp: (f64, f64),
    /// Thermal efficiency of the gas boiler
    pub boiler_efficiency: f64,
    /// Efficiency of the electrolyser
    pub electrolyser_efficiency: f64,
    /// Coefficient of performance of the heat pump
    pub cop_hp: f64,
    /// Coefficient of performance of the compression chiller
    pub cop_cc: f64,
}

/// Get a converter efficiency from the catalog
fn converter_efficiency(model: &Model, kind: DeviceKind) -> Result<f64> {
    match &catalog_device(model, kind)?.model {
        DeviceModel::Converter { efficiency, .. } => Ok(efficiency.value()),
        _ => bail!("Device {kind} is not a single-input converter"),
    }
}

fn catalog_device(model: &Model, kind: DeviceKind) -> Result<&Device> {
    model
        .catalog
        .get(kind)
        .with_context(|| format!("The reference system needs device {kind} in the catalog"))
}

impl ReferenceSystem {
    /// Take the efficiencies of the reference technologies from the model's catalog.
    ///
    /// Only the technologies which the chosen state (and the hub's demand) need have to be
    /// present in the catalog.
    pub fn from_model(model: &Model, parameters: &ReferenceParameters) -> Result<Self> {
        let state = ReferenceState::new(parameters.enable_chp, parameters.enable_hp);
        let chp = if state.uses_chp() {
            match &catalog_device(model, DeviceKind::GasChp)?.model {
                DeviceModel::Chp { eta_el, eta_th, .. } => (eta_el.value(), eta_th.value()),
                _ => bail!("Device {} is not a CHP unit", DeviceKind::GasChp),
            }
        } else {
            (0.0, 0.0)
        };
        let boiler_efficiency = if state.uses_boiler() {
            converter_efficiency(model, DeviceKind::GasBoiler)?
        } else {
            0.0
        };
        let electrolyser_efficiency = if model.hourly.peak_demand(Carrier::Hydrogen) > 0.0 {
            converter_efficiency(model, DeviceKind::Electrolyser)?
        } else {
            1.0
        };

        Ok(Self {
            state,
            chp,
            boiler_efficiency,
            electrolyser_efficiency,
            cop_hp: parameters.cop_hp,
            cop_cc: parameters.cop_cc,
        })
    }

    /// Dispatch the reference system for one hour
    pub fn dispatch(&self, demand: HourDemand) -> HourDispatch {
        let mut flows = HourDispatch {
            chiller_cooling: demand.cooling,
            chiller_power: demand.cooling / self.cop_cc,
            elyz_hydrogen: demand.hydrogen,
            elyz_power: demand.hydrogen / self.electrolyser_efficiency,
            ..HourDispatch::default()
        };
        let total_power = demand.power + flows.chiller_power + flows.elyz_power;
        let (eta_el, eta_th) = self.chp;

        match self.state {
            ReferenceState::ChpHeatPump | ReferenceState::ChpBoiler => {
                // Heat of the CHP unit when it exactly covers the power demand
                let power_led_heat = total_power / eta_el * eta_th;
                if demand.heat > power_led_heat {
                    if self.state == ReferenceState::ChpHeatPump {
                        flows.hp_power =
                            (demand.heat - power_led_heat) / (eta_th / eta_el + self.cop_hp);
                        flows.hp_heat = self.cop_hp * flows.hp_power;
                        flows.chp_power = flows.hp_power + total_power;
                    } else {
                        flows.chp_power = total_power;
                    }
                    flows.chp_gas = flows.chp_power / eta_el;
                    flows.chp_heat = flows.chp_gas * eta_th;
                    if self.state == ReferenceState::ChpBoiler {
                        flows.boiler_heat = demand.heat - flows.chp_heat;
                        flows.boiler_gas = flows.boiler_heat / self.boiler_efficiency;
                    }
                } else {
                    flows.chp_heat = demand.heat;
                    flows.chp_gas = demand.heat / eta_th;
                    flows.chp_power = flows.chp_gas * eta_el;
                }
            }
            ReferenceState::HeatPumpOnly => {
                flows.hp_heat = demand.heat;
                flows.hp_power = demand.heat / self.cop_hp;
            }
            ReferenceState::BoilerOnly => {
                flows.boiler_heat = demand.heat;
                flows.boiler_gas = demand.heat / self.boiler_efficiency;
            }
        }

        flows.grid_power = demand.power + flows.chiller_power + flows.hp_power + flows.elyz_power
            - flows.chp_power;
        flows.grid_gas = flows.boiler_gas + flows.chp_gas;
        flows
    }
}

/// Weighted annual energy of the reference dispatch (MWh)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ReferenceTotals {
    /// Heat from the heat pump
    pub heat_hp: f64,
    /// Electricity from the CHP unit
    pub power_chp: f64,
    /// Heat from the gas boiler
    pub heat_boiler: f64,
    /// Cooling from the chiller
    pub cooling_chiller: f64,
    /// Hydrogen from the electrolyser
    pub hydrogen_electrolyser: f64,
    /// Net electricity drawn from the grid
    pub power_grid: f64,
    /// Gas drawn from the grid
    pub gas_grid: f64,
}

/// Installed capacities of the reference system (kW)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ReferenceCapacities {
    /// Electrical capacity of the CHP unit
    pub chp: Capacity,
    /// Thermal capacity of the heat pump
    pub heat_pump: Capacity,
    /// Thermal capacity of the gas boiler
    pub boiler: Capacity,
    /// Cooling capacity of the chiller
    pub chiller: Capacity,
    /// Electrical capacity of the electrolyser
    pub electrolyser: Capacity,
    /// Electricity grid connection
    pub power_grid: Capacity,
    /// Gas grid connection
    pub gas_grid: Capacity,
}

/// Annual costs and emissions of the reference system
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferenceResult {
    /// Which devices covered the heat demand
    pub state: ReferenceState,
    /// Annual energy of each technology
    pub totals: ReferenceTotals,
    /// Installed capacities
    pub capacities: ReferenceCapacities,
    /// Energy and capacity costs of gas
    pub gas_costs: Money,
    /// Energy and capacity costs of electricity
    pub power_costs: Money,
    /// Tax on the emissions of burnt gas
    pub co2_costs: Money,
    /// Annualised investment and O&M costs of the devices
    pub investment_om: Money,
    /// Total annualised cost
    pub tac: Money,
    /// Annual emissions (kg)
    pub co2: Co2,
}

/// Annualised investment plus O&M of a reference device
fn investment_om(
    model: &Model,
    cost_factors: &CostFactors,
    kind: DeviceKind,
    capacity: Capacity,
) -> Result<Money> {
    if capacity.value() <= 0.0 {
        return Ok(Money(0.0));
    }

    let device = catalog_device(model, kind)?;
    let factor = cost_factors.annuity_factor(kind) + device.om_rate;
    Ok(device.investment_cost * (factor * capacity))
}

/// Dispatch the reference system and calculate its costs and emissions.
///
/// Returns `None` if the model has no `[reference]` section.
pub fn calculate_reference(
    model: &Model,
    cost_factors: &CostFactors,
) -> Result<Option<ReferenceResult>> {
    let Some(parameters) = &model.parameters.reference else {
        return Ok(None);
    };

    let system = ReferenceSystem::from_model(model, parameters)?;
    info!("Calculating reference system with state {}", system.state);

    // Energy totals and grid connections from the representative days
    let days = &model.days;
    let mut totals = ReferenceTotals::default();
    let mut power_grid = 0.0f64;
    let mut gas_grid = 0.0f64;
    for (day, hour) in days.slots() {
        let demand = HourDemand {
            heat: days.demand.heat.get(day, hour),
            cooling: days.demand.cooling.get(day, hour),
            power: days.demand.power.get(day, hour),
            hydrogen: days.demand.hydrogen.get(day, hour),
        };
        let flows = system.dispatch(demand);
        let weight = days.weight(day) / 1000.0;
        totals.heat_hp += weight * flows.hp_heat;
        totals.power_chp += weight * flows.chp_power;
        totals.heat_boiler += weight * flows.boiler_heat;
        totals.cooling_chiller += weight * flows.chiller_cooling;
        totals.hydrogen_electrolyser += weight * flows.elyz_hydrogen;
        totals.power_grid += weight * flows.grid_power;
        totals.gas_grid += weight * flows.grid_gas;
        power_grid = power_grid.max(flows.grid_power);
        gas_grid = gas_grid.max(flows.grid_gas);
    }

    // Device capacities from the unclustered year
    let hourly = &model.hourly.demand;
    let mut capacities = ReferenceCapacities {
        power_grid: Capacity(power_grid),
        gas_grid: Capacity(gas_grid),
        ..ReferenceCapacities::default()
    };
    for hour in 0..hourly.heat.len() {
        let flows = system.dispatch(HourDemand {
            heat: hourly.heat[hour],
            cooling: hourly.cooling[hour],
            power: hourly.power[hour],
            hydrogen: hourly.hydrogen[hour],
        });
        capacities.chp = capacities.chp.max(Capacity(flows.chp_power));
        capacities.heat_pump = capacities.heat_pump.max(Capacity(flows.hp_heat));
        capacities.boiler = capacities.boiler.max(Capacity(flows.boiler_heat));
        capacities.chiller = capacities.chiller.max(Capacity(flows.chiller_cooling));
        capacities.electrolyser = capacities.electrolyser.max(Capacity(flows.elyz_power));
    }

    let gas = model.parameters.supply(Carrier::Gas);
    let power = model.parameters.supply(Carrier::Electricity);
    let gas_energy = Energy(totals.gas_grid * 1000.0);
    let power_energy = Energy(totals.power_grid * 1000.0);
    let gas_costs = gas.capacity_price * capacities.gas_grid + gas.price * gas_energy;
    let power_costs = power.capacity_price * capacities.power_grid + power.price * power_energy;
    let co2_costs = model.parameters.emissions.co2_tax * (gas.co2_factor * gas_energy);

    let mut investment = Money(0.0);
    for (kind, capacity) in [
        (DeviceKind::GasChp, capacities.chp),
        (DeviceKind::GasBoiler, capacities.boiler),
        (DeviceKind::HeatPump, capacities.heat_pump),
        (DeviceKind::CompressionChiller, capacities.chiller),
        (DeviceKind::Electrolyser, capacities.electrolyser),
    ] {
        investment += investment_om(model, cost_factors, kind, capacity)?;
    }

    let tac = investment + gas_costs + power_costs + co2_costs;
    let co2 = gas.co2_factor * gas_energy + power.co2_factor * power_energy;

    Ok(Some(ReferenceResult {
        state: system.state,
        totals,
        capacities,
        gas_costs,
        power_costs,
        co2_costs,
        investment_om: investment,
        tac,
        co2,
    }))
}
