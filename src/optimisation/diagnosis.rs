//! Find out which constraint groups make the design problem infeasible.
use super::solver::{SolveStatus, solve};
use super::{ConstraintGroup, DesignProblem};
use crate::model::parameters::SolverParameters;
use itertools::Itertools;
use log::{info, warn};
use strum::IntoEnumIterator;

/// Find a minimal set of constraint groups which cannot be satisfied together.
///
/// A deletion filter is used: each group is left out in turn and stays out if the problem remains
/// infeasible without it. The groups which are left over conflict with each other, and leaving out
/// any one of them makes the problem feasible. The objective is ignored.
///
/// Returns `None` if the problem is infeasible even without any of the relaxable groups.
pub fn diagnose_infeasibility(
    problem: &DesignProblem,
    options: &SolverParameters,
) -> Option<Vec<ConstraintGroup>> {
    info!("Diagnosing infeasibility of the design problem");
    let relaxable: Vec<_> = ConstraintGroup::iter()
        .filter(|group| group.is_relaxable() && problem.count_rows(*group) > 0)
        .collect();

    if solve(problem, &[], options, &relaxable).status == SolveStatus::Infeasible {
        warn!("The design problem is infeasible even without any relaxable constraints");
        return None;
    }

    let mut skipped = Vec::new();
    let mut conflicts = Vec::new();
    for group in relaxable {
        skipped.push(group);
        if solve(problem, &[], options, &skipped).status != SolveStatus::Infeasible {
            skipped.pop();
            conflicts.push(group);
        }
    }

    info!(
        "Conflicting constraint groups: {}",
        conflicts.iter().join(", ")
    );
    Some(conflicts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnose_infeasibility() {
        let mut problem = DesignProblem::default();
        let x = problem.add_column("x".into(), 0.0..);
        let y = problem.add_column("y".into(), 0.0..=1.0);
        let z = problem.add_column("z".into(), 0.0..);
        problem.add_row(ConstraintGroup::CarrierBalance, 2.0.., [(x, 1.0), (y, 1.0)]);
        problem.add_row(ConstraintGroup::CapacityLimit, ..=0.5, [(x, 1.0)]);
        problem.add_row(ConstraintGroup::Conversion, ..=3.0, [(z, 1.0)]);
        problem.add_row(ConstraintGroup::CostAccounting, 0.0..=0.0, [(z, 1.0), (x, -1.0)]);

        let conflicts = diagnose_infeasibility(&problem, &SolverParameters::default());
        assert_eq!(
            conflicts,
            Some(vec![
                ConstraintGroup::CapacityLimit,
                ConstraintGroup::CarrierBalance
            ])
        );
    }

    #[test]
    fn test_diagnose_accounting_conflict() {
        let mut problem = DesignProblem::default();
        let x = problem.add_column("x".into(), 0.0..=1.0);
        problem.add_row(ConstraintGroup::CostAccounting, 2.0.., [(x, 1.0)]);
        problem.add_row(ConstraintGroup::CarrierBalance, ..=0.5, [(x, 1.0)]);

        assert_eq!(
            diagnose_infeasibility(&problem, &SolverParameters::default()),
            None
        );
    }
}
