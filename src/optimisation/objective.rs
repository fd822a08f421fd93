//! Total annualised cost and CO₂ emissions, and the objectives built from them.
use super::variables::Variables;
use super::{ConstraintGroup, DesignProblem, Variable};
use crate::carrier::Carrier;
use crate::model::Model;
use crate::model::parameters::Co2Mode;

/// Relative tolerance added to the cost bound of the second stage, so that the design found in
/// the first stage remains feasible despite the solver's tolerances
const COST_BOUND_TOLERANCE: f64 = 1e-6;

/// Carriers whose combustion is taxed
const TAXED_FUELS: [Carrier; 3] = [Carrier::Gas, Carrier::Biomass, Carrier::Waste];

/// Define the total annualised cost and the net emissions, and add the emission limits.
///
/// ```text
/// tac = Σ device costs + Σ (supply + capacity costs) − Σ feed-in revenue + CO₂ tax
/// co2 = Σ import × CO₂ factor − Σ feed-in × CO₂ credit
/// ```
pub fn add_objective_constraints(
    problem: &mut DesignProblem,
    variables: &Variables,
    model: &Model,
) {
    let parameters = &model.parameters;
    let group = ConstraintGroup::CostAccounting;

    // Tax on burnt fuels
    let tax = parameters.emissions.co2_tax.value();
    let mut terms = vec![(variables.co2_tax, 1.0)];
    for carrier in TAXED_FUELS {
        let factor = parameters.supply(carrier).co2_factor.value();
        terms.push((variables.carriers[&carrier].import_total, -tax * factor));
    }
    problem.add_row(group, 0.0..=0.0, terms);

    // Total annualised cost
    let mut terms = vec![(variables.tac, 1.0), (variables.co2_tax, -1.0)];
    for vars in variables.devices.values() {
        terms.push((vars.costs.total, -1.0));
    }
    for vars in variables.carriers.values() {
        terms.push((vars.supply_cost, -1.0));
        if let Some(cost) = vars.capacity_cost {
            terms.push((cost, -1.0));
        }
        if let Some(revenue) = vars.feed_in_revenue {
            terms.push((revenue, 1.0));
        }
    }
    problem.add_row(group, 0.0..=0.0, terms);

    // Net emissions
    let mut terms = vec![(variables.co2, 1.0)];
    let mut credit_terms = Vec::new();
    for (carrier, vars) in &variables.carriers {
        let supply = parameters.supply(*carrier);
        terms.push((vars.import_total, -supply.co2_factor.value()));
        if let Some(export) = vars.export_total {
            terms.push((export, supply.co2_feed_in_factor.value()));
            credit_terms.push((export, supply.co2_feed_in_factor.value()));
        }
    }
    problem.add_row(group, 0.0..=0.0, terms);

    if let Some(limit) = parameters.emissions.co2_feed_in_limit {
        problem.add_row(ConstraintGroup::Carbon, ..=limit.value(), credit_terms);
    }
    if let Co2Mode::HardLimit { tolerance } = parameters.objective {
        problem.add_row(
            ConstraintGroup::Carbon,
            ..=tolerance.value(),
            [(variables.co2, 1.0)],
        );
    }
}

/// Minimise the total annualised cost
pub fn cost_objective(variables: &Variables) -> Vec<(Variable, f64)> {
    vec![(variables.tac, 1.0)]
}

/// Minimise the net emissions
pub fn co2_objective(variables: &Variables) -> Vec<(Variable, f64)> {
    vec![(variables.co2, 1.0)]
}

/// The largest total annualised cost allowed in the second stage of the secondary objective
pub fn cost_bound(min_cost: f64, cost_slack: f64) -> f64 {
    min_cost + (cost_slack + COST_BOUND_TOLERANCE) * min_cost.abs() + COST_BOUND_TOLERANCE
}

/// Do not let the total annualised cost exceed the minimum by more than `cost_slack`
pub fn add_cost_bound(
    problem: &mut DesignProblem,
    variables: &Variables,
    min_cost: f64,
    cost_slack: f64,
) {
    problem.add_row(
        ConstraintGroup::CostAccounting,
        ..=cost_bound(min_cost, cost_slack),
        [(variables.tac, 1.0)],
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::model;
    use crate::optimisation::variables::add_variables;
    use crate::units::Co2;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[rstest]
    #[case(1000.0, 0.0, 1000.0)]
    #[case(1000.0, 0.1, 1100.0)]
    #[case(-1000.0, 0.1, -900.0)]
    fn test_cost_bound(#[case] min_cost: f64, #[case] slack: f64, #[case] expected: f64) {
        assert_approx_eq!(f64, cost_bound(min_cost, slack), expected, epsilon = 1e-2);
        assert!(cost_bound(min_cost, slack) > min_cost + slack * min_cost.abs());
    }

    #[rstest]
    fn test_hard_limit_row(mut model: Model) {
        let count_carbon_rows = |model: &Model| {
            let mut problem = DesignProblem::default();
            let variables = add_variables(&mut problem, model);
            add_objective_constraints(&mut problem, &variables, model);
            problem.count_rows(ConstraintGroup::Carbon)
        };
        assert_eq!(count_carbon_rows(&model), 0);

        model.parameters.objective = Co2Mode::HardLimit {
            tolerance: Co2(1e-6),
        };
        assert_eq!(count_carbon_rows(&model), 1);

        model.parameters.emissions.co2_feed_in_limit = Some(Co2(100.0));
        assert_eq!(count_carbon_rows(&model), 2);
    }

    #[rstest]
    fn test_tac_definition(model: Model) {
        let mut problem = DesignProblem::default();
        let variables = add_variables(&mut problem, &model);
        add_objective_constraints(&mut problem, &variables, &model);

        // Tax, cost and emission rows
        assert_eq!(problem.rows().len(), 3);
        let tac_row = &problem.rows()[1];
        assert_eq!(tac_row.terms[0], (variables.tac, 1.0));
        let revenue = variables.carriers[&Carrier::Electricity]
            .feed_in_revenue
            .unwrap();
        assert!(tac_row.terms.contains(&(revenue, 1.0)));
    }
}
