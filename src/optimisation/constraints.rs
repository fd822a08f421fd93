//! Code for adding constraints to the design problem.
use super::variables::{DeviceVariables, SlotVariables, Variables};
use super::{DesignProblem, Variable};
use crate::carrier::Carrier;
use crate::day_mapping::RepresentativeDays;
use crate::device::{Device, DeviceModel, carnot_cop};
use crate::finance::CostFactors;
use crate::model::Model;
use crate::time_series::{HOURS_PER_DAY, HOURS_PER_YEAR};
use crate::wind::normalised_power;
use strum::{Display, EnumIter, IntoEnumIterator};

/// Groups of constraints which can be left out together when diagnosing infeasibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum ConstraintGroup {
    /// Which devices are installed and their capacity bounds
    Selection,
    /// Flows, storage levels and grid exchange limited by installed capacity
    CapacityLimit,
    /// Conversion physics and weather-dependent availability
    Conversion,
    /// Energy balance of every carrier in every time step
    CarrierBalance,
    /// Installed capacity covering the unclustered peak demand
    PeakCoverage,
    /// State of charge of the storages
    StorageDynamics,
    /// Limits on grid capacity, supply and paid feed-in
    GridLimit,
    /// Disabled imports and feed-in
    SupplyToggle,
    /// Emission limits
    Carbon,
    /// Definitions of annual totals, costs and emissions
    CostAccounting,
}

impl ConstraintGroup {
    /// Whether the group may be left out when diagnosing infeasibility.
    ///
    /// The accounting rows only define auxiliary variables, so they can never cause a conflict.
    pub fn is_relaxable(self) -> bool {
        self != Self::CostAccounting
    }
}

/// Weighted annual sum of a per-slot variable
fn weighted_terms(
    days: &RepresentativeDays,
    vars: &SlotVariables,
    factor: f64,
) -> impl Iterator<Item = (Variable, f64)> {
    vars.iter()
        .map(move |(day, _, var)| (var, factor * days.weight(day)))
}

/// Add all constraints except those of the objective.
///
/// # Arguments
///
/// * `problem` - The optimisation problem
/// * `variables` - The variables in the problem
/// * `model` - The model
/// * `cost_factors` - Annualised cost factors of the catalog's devices
pub fn add_constraints(
    problem: &mut DesignProblem,
    variables: &Variables,
    model: &Model,
    cost_factors: &CostFactors,
) {
    for device in model.catalog.iter() {
        let vars = &variables.devices[&device.kind];
        add_selection_constraints(problem, vars, device);
        add_capacity_constraints(problem, vars, device);
        add_conversion_constraints(problem, vars, device, &model.days);
        add_storage_constraints(problem, vars, device, &model.days);
        add_device_cost_constraints(problem, vars, device, model, cost_factors);
    }
    add_carrier_balance_constraints(problem, variables, model);
    add_peak_coverage_constraints(problem, variables, model);
    add_grid_constraints(problem, variables, model);
}

/// Fix the selection of a device and bound its capacity.
///
/// Devices which may not be installed in this run get zero capacity. The capacity of a solar
/// device follows from its area, so its selection is enforced through the area bounds.
fn add_selection_constraints(problem: &mut DesignProblem, vars: &DeviceVariables, device: &Device) {
    let group = ConstraintGroup::Selection;
    if device.feasible {
        problem.add_row(group, 1.0..=1.0, [(vars.selected, 1.0)]);
        let (min, max) = (device.min_capacity.value(), device.max_capacity.value());
        problem.add_row(group, min..=max, [(vars.capacity, 1.0)]);
    } else {
        problem.add_row(group, 0.0..=0.0, [(vars.selected, 1.0)]);
        problem.add_row(group, 0.0..=0.0, [(vars.capacity, 1.0)]);
    }
}

/// Limit flows and storage levels by the installed capacity
fn add_capacity_constraints(problem: &mut DesignProblem, vars: &DeviceVariables, device: &Device) {
    let group = ConstraintGroup::CapacityLimit;
    for carrier in device.model.rated_carriers() {
        for (_, _, flow) in vars.flows[&carrier].iter() {
            problem.add_row(group, ..=0.0, [(flow, 1.0), (vars.capacity, -1.0)]);
        }
    }

    if let Some(storage) = &vars.storage {
        for soc in &storage.soc {
            problem.add_row(group, ..=0.0, [(*soc, 1.0), (vars.capacity, -1.0)]);
        }
    }

    if let (
        DeviceModel::Solar {
            efficiency,
            peak_irradiance,
            min_area,
            max_area,
            ..
        },
        Some(area),
    ) = (&device.model, vars.area)
    {
        problem.add_row(group, 0.0.., [(area, 1.0), (vars.selected, -min_area.value())]);
        problem.add_row(group, ..=0.0, [(area, 1.0), (vars.selected, -max_area.value())]);
        let capacity_per_area = peak_irradiance.value() * efficiency.value();
        problem.add_row(
            group,
            0.0..=0.0,
            [(vars.capacity, 1.0), (area, -capacity_per_area)],
        );
    }
}

/// Add the conversion physics of a device
fn add_conversion_constraints(
    problem: &mut DesignProblem,
    vars: &DeviceVariables,
    device: &Device,
    days: &RepresentativeDays,
) {
    let group = ConstraintGroup::Conversion;
    let flow = |carrier: Carrier| &vars.flows[&carrier];

    match &device.model {
        DeviceModel::Solar {
            output, efficiency, ..
        } => {
            if let Some(area) = vars.area {
                for (day, hour, var) in flow(*output).iter() {
                    let per_area = days.weather.ghi.get(day, hour) / 1000.0 * efficiency.value();
                    problem.add_row(group, ..=0.0, [(var, 1.0), (area, -per_area)]);
                }
            }
        }
        DeviceModel::Wind {
            hub_height,
            reference_height,
            roughness_exponent,
        } => {
            let norm = normalised_power(
                &days.weather.wind_speed,
                *hub_height,
                *reference_height,
                *roughness_exponent,
            );
            for (day, hour, var) in flow(Carrier::Electricity).iter() {
                let factor = norm.get(day, hour);
                problem.add_row(group, ..=0.0, [(var, 1.0), (vars.capacity, -factor)]);
            }
        }
        DeviceModel::Hydro { potential } => {
            for (_, _, var) in flow(Carrier::Electricity).iter() {
                problem.add_row(group, ..=potential.value(), [(var, 1.0)]);
            }
        }
        DeviceModel::HeatPump {
            carnot_efficiency,
            supply_temperature,
        } => {
            let power = flow(Carrier::Electricity);
            for (day, hour, heat) in flow(Carrier::Heat).iter() {
                let air = days.weather.air_temperature.get(day, hour);
                let cop = carnot_cop(*carnot_efficiency, *supply_temperature, air);
                let power = power.get(day, hour);
                problem.add_row(group, 0.0..=0.0, [(heat, 1.0), (power, -cop)]);
                if cop <= 0.0 {
                    problem.add_row(group, ..=0.0, [(power, 1.0)]);
                }
            }
        }
        DeviceModel::Converter {
            input,
            output,
            efficiency,
            ..
        } => {
            let input = flow(*input);
            for (day, hour, out) in flow(*output).iter() {
                let terms = [(out, 1.0), (input.get(day, hour), -efficiency.value())];
                problem.add_row(group, 0.0..=0.0, terms);
            }
        }
        DeviceModel::Chp {
            fuel,
            eta_el,
            eta_th,
        } => {
            add_cogeneration_rows(
                problem,
                vars,
                flow(*fuel),
                eta_el.value(),
                eta_th.value(),
                false,
            );
        }
        DeviceModel::FuelCell {
            eta_el,
            eta_th,
            heat_dissipation,
        } => {
            add_cogeneration_rows(
                problem,
                vars,
                flow(Carrier::Hydrogen),
                eta_el.value(),
                eta_th.value(),
                *heat_dissipation,
            );
        }
        DeviceModel::Storage { .. } => {}
    }
}

/// Electricity and heat produced from one fuel flow.
///
/// With heat dissipation, surplus heat may be discarded so the heat output is only bounded.
fn add_cogeneration_rows(
    problem: &mut DesignProblem,
    vars: &DeviceVariables,
    fuel: &SlotVariables,
    eta_el: f64,
    eta_th: f64,
    heat_dissipation: bool,
) {
    let group = ConstraintGroup::Conversion;
    let power = &vars.flows[&Carrier::Electricity];
    let heat = &vars.flows[&Carrier::Heat];
    let heat_bounds = if heat_dissipation {
        f64::NEG_INFINITY..=0.0
    } else {
        0.0..=0.0
    };
    for (day, hour, fuel) in fuel.iter() {
        problem.add_row(
            group,
            0.0..=0.0,
            [(power.get(day, hour), 1.0), (fuel, -eta_el)],
        );
        problem.add_row(
            group,
            heat_bounds.clone(),
            [(heat.get(day, hour), 1.0), (fuel, -eta_th)],
        );
    }
}

/// Add the state of charge of a storage over the whole calendar year.
///
/// Every calendar hour is charged like the same hour of its representative day. The last hour
/// of the year is followed by the first, so the storage ends the year where it started.
fn add_storage_constraints(
    problem: &mut DesignProblem,
    vars: &DeviceVariables,
    device: &Device,
    days: &RepresentativeDays,
) {
    let (DeviceModel::Storage { loss_rate, .. }, Some(storage)) = (&device.model, &vars.storage)
    else {
        return;
    };

    let retained = 1.0 - loss_rate.value();
    for hour in 0..HOURS_PER_YEAR {
        let previous = (hour + HOURS_PER_YEAR - 1) % HOURS_PER_YEAR;
        let day = days.mapping.representative_of(hour / HOURS_PER_DAY);
        let charge = storage.charge.get(day, hour % HOURS_PER_DAY);
        problem.add_row(
            ConstraintGroup::StorageDynamics,
            0.0..=0.0,
            [
                (storage.soc[hour], 1.0),
                (storage.soc[previous], -retained),
                (charge, -1.0),
            ],
        );
    }
}

/// Define the annualised cost components of a device
fn add_device_cost_constraints(
    problem: &mut DesignProblem,
    vars: &DeviceVariables,
    device: &Device,
    model: &Model,
    cost_factors: &CostFactors,
) {
    let group = ConstraintGroup::CostAccounting;
    let costs = &vars.costs;
    let investment = cost_factors.investment_cost_per_capacity(device).value();
    problem.add_row(
        group,
        0.0..=0.0,
        [(costs.investment, 1.0), (vars.capacity, -investment)],
    );
    let om = cost_factors.om_cost(device).value();
    problem.add_row(group, 0.0..=0.0, [(costs.om, 1.0), (vars.selected, -om)]);

    let mut terms = vec![(costs.demand, 1.0)];
    for carrier in device.model.inputs() {
        let price = model.parameters.supply(carrier).price;
        if let Some(cost) = cost_factors.demand_cost_per_energy(carrier, price) {
            terms.extend(weighted_terms(&model.days, &vars.flows[&carrier], -cost.value()));
        }
    }
    problem.add_row(group, 0.0..=0.0, terms);

    problem.add_row(
        group,
        0.0..=0.0,
        [
            (costs.total, 1.0),
            (costs.investment, -1.0),
            (costs.om, -1.0),
            (costs.demand, -1.0),
        ],
    );
}

/// Balance production and imports against consumption, demand, storage and exports
fn add_carrier_balance_constraints(
    problem: &mut DesignProblem,
    variables: &Variables,
    model: &Model,
) {
    let days = &model.days;
    for carrier in Carrier::iter() {
        let demand = days.demand.get(carrier);
        let mut contributions: Vec<(&SlotVariables, f64)> = Vec::new();
        for device in model.catalog.iter() {
            let vars = &variables.devices[&device.kind];
            if let Some(flow) = vars.flows.get(&carrier) {
                let sign = if device.model.outputs().contains(&carrier) {
                    1.0
                } else {
                    -1.0
                };
                contributions.push((flow, sign));
            }
            if let Some(storage) = &vars.storage
                && device.model.storage_carrier() == Some(carrier)
            {
                contributions.push((&storage.charge, -1.0));
            }
        }
        if let Some(vars) = variables.carriers.get(&carrier) {
            contributions.push((&vars.import, 1.0));
            if let Some(export) = &vars.export {
                contributions.push((export, -1.0));
            }
        }

        for (day, hour) in days.slots() {
            let rhs = demand.map_or(0.0, |profile| profile.get(day, hour));
            if contributions.is_empty() && rhs == 0.0 {
                continue;
            }
            let terms = contributions
                .iter()
                .map(|(vars, sign)| (vars.get(day, hour), *sign));
            problem.add_row(ConstraintGroup::CarrierBalance, rhs..=rhs, terms);
        }
    }
}

/// Require the installed capacity to cover the unclustered peak demand
fn add_peak_coverage_constraints(
    problem: &mut DesignProblem,
    variables: &Variables,
    model: &Model,
) {
    let count_renewables = model.parameters.peak_dem_met_conv;
    for carrier in [
        Carrier::Heat,
        Carrier::Cooling,
        Carrier::Electricity,
        Carrier::Hydrogen,
    ] {
        let peak = model.hourly.peak_demand(carrier);
        if peak <= 0.0 {
            continue;
        }

        let mut terms = Vec::new();
        let mut feasible_supplier = false;
        for device in model.catalog.iter() {
            if let Some(factor) = device.model.peak_capacity_factor(carrier, count_renewables) {
                terms.push((variables.devices[&device.kind].capacity, factor.value()));
                feasible_supplier |= device.feasible;
            }
        }

        match carrier {
            Carrier::Electricity => {
                if let Some(grid) = variables.carriers[&carrier].grid_capacity {
                    terms.push((grid, 1.0));
                }
            }
            // Only needed when hydrogen cannot be bought
            Carrier::Hydrogen => {
                if model.parameters.supply(carrier).enabled || !feasible_supplier {
                    continue;
                }
            }
            _ => {}
        }

        problem.add_row(ConstraintGroup::PeakCoverage, peak.., terms);
    }
}

/// Add the grid connections, supply toggles and annual totals of every importable carrier
fn add_grid_constraints(problem: &mut DesignProblem, variables: &Variables, model: &Model) {
    let days = &model.days;
    for (carrier, vars) in &variables.carriers {
        let supply = model.parameters.supply(*carrier);

        // Annual totals
        let mut terms = vec![(vars.import_total, 1.0)];
        terms.extend(weighted_terms(days, &vars.import, -1.0));
        problem.add_row(ConstraintGroup::CostAccounting, 0.0..=0.0, terms);
        if let (Some(export), Some(total)) = (&vars.export, vars.export_total) {
            let mut terms = vec![(total, 1.0)];
            terms.extend(weighted_terms(days, export, -1.0));
            problem.add_row(ConstraintGroup::CostAccounting, 0.0..=0.0, terms);
        }

        // Hourly exchange limited by the grid connection
        if let Some(grid) = vars.grid_capacity {
            for series in [Some(&vars.import), vars.export.as_ref()].into_iter().flatten() {
                for (_, _, var) in series.iter() {
                    problem.add_row(
                        ConstraintGroup::CapacityLimit,
                        ..=0.0,
                        [(var, 1.0), (grid, -1.0)],
                    );
                }
            }
            if let Some(limit) = supply.capacity_limit {
                problem.add_row(ConstraintGroup::GridLimit, ..=limit.value(), [(grid, 1.0)]);
            }
        }
        if let Some(limit) = supply.supply_limit {
            problem.add_row(
                ConstraintGroup::GridLimit,
                ..=limit.value(),
                [(vars.import_total, 1.0)],
            );
        }

        // Every exported kWh is paid, and the revenue may not exceed that of the feed-in limit
        if let (Some(revenue), Some(export_total)) = (vars.feed_in_revenue, vars.export_total) {
            let price = supply.feed_in_revenue.value();
            problem.add_row(
                ConstraintGroup::CostAccounting,
                0.0..=0.0,
                [(revenue, 1.0), (export_total, -price)],
            );
            if let Some(limit) = supply.feed_in_limit {
                problem.add_row(
                    ConstraintGroup::GridLimit,
                    ..=price * limit.value(),
                    [(revenue, 1.0)],
                );
            }
        }

        // Disabled exchange
        if !supply.enabled {
            problem.add_row(
                ConstraintGroup::SupplyToggle,
                0.0..=0.0,
                [(vars.import_total, 1.0)],
            );
        }
        if let (Some(export), Some(total)) = (&vars.export, vars.export_total)
            && !supply.feed_in
        {
            problem.add_row(ConstraintGroup::SupplyToggle, 0.0..=0.0, [(total, 1.0)]);
            for (_, _, var) in export.iter() {
                problem.add_row(ConstraintGroup::SupplyToggle, ..=0.0, [(var, 1.0)]);
            }
        }

        // Supply and capacity costs
        problem.add_row(
            ConstraintGroup::CostAccounting,
            0.0..=0.0,
            [
                (vars.supply_cost, 1.0),
                (vars.import_total, -supply.price.value()),
            ],
        );
        if let (Some(cost), Some(grid)) = (vars.capacity_cost, vars.grid_capacity) {
            problem.add_row(
                ConstraintGroup::CostAccounting,
                0.0..=0.0,
                [(cost, 1.0), (grid, -supply.capacity_price.value())],
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{Device, DeviceCatalog, DeviceKind};
    use crate::fixture::{battery, boiler, chp, model};
    use crate::model::parameters::CarrierSupply;
    use crate::optimisation::variables::add_variables;
    use rstest::rstest;

    fn build(model: &Model) -> (DesignProblem, Variables) {
        let factors = CostFactors::new(&model.parameters.economics, &model.catalog);
        let mut problem = DesignProblem::default();
        let variables = add_variables(&mut problem, model);
        add_constraints(&mut problem, &variables, model, &factors);
        (problem, variables)
    }

    #[test]
    fn test_only_cost_accounting_is_kept() {
        let kept: Vec<_> = ConstraintGroup::iter()
            .filter(|group| !group.is_relaxable())
            .collect();
        assert_eq!(kept, [ConstraintGroup::CostAccounting]);
        assert_eq!(ConstraintGroup::CarrierBalance.to_string(), "carrier_balance");
    }

    #[rstest]
    fn test_storage_rows_cover_year(mut model: Model, boiler: Device, battery: Device) {
        model.catalog = DeviceCatalog::new([boiler, battery]);
        let (problem, variables) = build(&model);
        assert_eq!(
            problem.count_rows(ConstraintGroup::StorageDynamics),
            HOURS_PER_YEAR
        );

        // The first hour of the year follows the last
        let storage = variables.devices[&DeviceKind::Battery]
            .storage
            .as_ref()
            .unwrap();
        let first = problem
            .rows()
            .iter()
            .find(|row| {
                row.group == ConstraintGroup::StorageDynamics && row.terms[0].0 == storage.soc[0]
            })
            .unwrap();
        assert_eq!(
            first.terms[1],
            (storage.soc[HOURS_PER_YEAR - 1], -(1.0 - 0.001))
        );
    }

    #[rstest]
    fn test_balance_rows(model: Model) {
        let (problem, _) = build(&model);

        // Heat, electricity and gas have variables; the other carriers have no variables and no
        // demand, except biomass, waste and hydrogen which can be imported
        let n_rows = problem.count_rows(ConstraintGroup::CarrierBalance);
        assert_eq!(n_rows, 6 * HOURS_PER_DAY);
        let heat_row = problem
            .rows()
            .iter()
            .find(|row| row.group == ConstraintGroup::CarrierBalance && row.lower == 100.0)
            .unwrap();
        assert_eq!(heat_row.upper, 100.0);
    }

    #[rstest]
    fn test_chp_conversion_rows(mut model: Model, chp: Device) {
        model.catalog = DeviceCatalog::new([chp]);
        let (problem, _) = build(&model);
        assert_eq!(
            problem.count_rows(ConstraintGroup::Conversion),
            2 * HOURS_PER_DAY
        );
    }

    #[rstest]
    fn test_supply_toggles(mut model: Model) {
        let (problem, _) = build(&model);
        // Hydrogen, biomass and waste cannot be bought
        assert_eq!(problem.count_rows(ConstraintGroup::SupplyToggle), 3 + 1 + HOURS_PER_DAY);

        // Neither import nor feed-in of electricity
        model
            .parameters
            .supply
            .insert(Carrier::Electricity, CarrierSupply::UNAVAILABLE);
        let (problem, _) = build(&model);
        assert_eq!(
            problem.count_rows(ConstraintGroup::SupplyToggle),
            4 + 2 * (1 + HOURS_PER_DAY)
        );
    }

    #[rstest]
    fn test_peak_coverage(mut model: Model) {
        let (problem, variables) = build(&model);
        // Heat and power have a demand
        assert_eq!(problem.count_rows(ConstraintGroup::PeakCoverage), 2);
        let power_row = problem
            .rows()
            .iter()
            .find(|row| row.group == ConstraintGroup::PeakCoverage && row.lower == 50.0)
            .unwrap();
        let grid = variables.carriers[&Carrier::Electricity]
            .grid_capacity
            .unwrap();
        assert_eq!(power_row.terms, [(grid, 1.0)]);

        model.parameters.peak_dem_met_conv = true;
        let (problem, _) = build(&model);
        assert_eq!(problem.count_rows(ConstraintGroup::PeakCoverage), 2);
    }
}
