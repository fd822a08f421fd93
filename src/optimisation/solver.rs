//! Hand a [`DesignProblem`] to the HiGHS solver.
use super::{ConstraintGroup, DesignProblem, Variable};
use crate::model::parameters::SolverParameters;
use highs::{HighsModelStatus, RowProblem as Problem, Sense};
use log::debug;

/// Largest row violation for which a solution found before a limit is accepted
const LIMIT_SOLUTION_TOLERANCE: f64 = 1e-4;

/// How the solver finished
#[derive(Debug, Clone, PartialEq)]
pub enum SolveStatus {
    /// Optimal within the MIP gap
    Optimal,
    /// A time or iteration limit was hit
    LimitReached,
    /// No solution satisfies all rows
    Infeasible,
    /// The objective has no lower bound
    Unbounded,
    /// Any other status reported by the solver
    Failed(String),
}

/// The status of a solve and, if a usable solution exists, the value of every column
#[derive(Debug, Clone, PartialEq)]
pub struct SolveOutcome {
    /// How the solver finished
    pub status: SolveStatus,
    /// Value of every column, if the solution can be used
    pub values: Option<Vec<f64>>,
}

/// Dump the output of HiGHS to stdout if debugging output was requested.
///
/// The output does not go through our logger, so it will not appear in the log files.
fn enable_highs_logging(model: &mut highs::Model) {
    let verbose = std::env::var("HUBDESIGN_LOG_LEVEL").is_ok_and(|level| {
        level.eq_ignore_ascii_case("debug") || level.eq_ignore_ascii_case("trace")
    });
    if verbose {
        model.set_option("log_to_console", true);
        model.set_option("output_flag", true);
    }
}

/// Convert the problem into a HiGHS problem, leaving out the rows of the skipped groups
fn to_highs_problem(
    problem: &DesignProblem,
    objective: &[(Variable, f64)],
    skip: &[ConstraintGroup],
) -> Problem {
    let mut costs = vec![0.0; problem.columns().len()];
    for (var, coeff) in objective {
        costs[var.index()] += coeff;
    }

    let mut highs_problem = Problem::default();
    let cols: Vec<_> = problem
        .columns()
        .iter()
        .zip(costs)
        .map(|(col, cost)| {
            if col.integer {
                highs_problem.add_integer_column(cost, col.lower..=col.upper)
            } else {
                highs_problem.add_column(cost, col.lower..=col.upper)
            }
        })
        .collect();

    for row in problem.rows().iter().filter(|row| !skip.contains(&row.group)) {
        highs_problem.add_row(
            row.lower..=row.upper,
            row.terms.iter().map(|(var, coeff)| (cols[var.index()], *coeff)),
        );
    }

    highs_problem
}

/// Solve the problem for the given objective.
///
/// # Arguments
///
/// * `problem` - The design problem
/// * `objective` - Coefficients of the objective, which is minimised
/// * `options` - Solver options
/// * `skip` - Constraint groups to leave out
pub fn solve(
    problem: &DesignProblem,
    objective: &[(Variable, f64)],
    options: &SolverParameters,
    skip: &[ConstraintGroup],
) -> SolveOutcome {
    let mut highs_model = to_highs_problem(problem, objective, skip).optimise(Sense::Minimise);
    highs_model.set_option("mip_rel_gap", options.mip_gap);
    if options.time_limit.is_finite() {
        highs_model.set_option("time_limit", options.time_limit);
    }
    highs_model.set_option("random_seed", options.random_seed);
    enable_highs_logging(&mut highs_model);

    let solved = highs_model.solve();
    let status = match solved.status() {
        HighsModelStatus::Optimal => SolveStatus::Optimal,
        HighsModelStatus::ReachedTimeLimit | HighsModelStatus::ReachedIterationLimit => {
            SolveStatus::LimitReached
        }
        HighsModelStatus::Infeasible | HighsModelStatus::UnboundedOrInfeasible => {
            SolveStatus::Infeasible
        }
        HighsModelStatus::Unbounded => SolveStatus::Unbounded,
        status => SolveStatus::Failed(format!("{status:?}")),
    };
    debug!("Solver finished with status {status:?}");

    let values = match status {
        SolveStatus::Optimal => Some(solved.get_solution().columns().to_vec()),
        SolveStatus::LimitReached if skip.is_empty() => {
            let values = solved.get_solution().columns().to_vec();
            let usable = values.len() == problem.columns().len()
                && problem.max_violation(&values) <= LIMIT_SOLUTION_TOLERANCE;
            usable.then_some(values)
        }
        _ => None,
    };

    SolveOutcome { status, values }
}
