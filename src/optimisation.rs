//! Code for performing the design optimisation.
//!
//! The design problem is a mixed-integer linear program which chooses the devices of the hub,
//! their capacities and their dispatch on the representative days. The problem is assembled in a
//! [`DesignProblem`] whose rows are tagged with a [`ConstraintGroup`], so that it can be handed to
//! the solver several times: with a different objective (for the secondary CO₂ objective) or with
//! some groups left out (to find out why a problem is infeasible).
use crate::finance::CostFactors;
use crate::model::Model;
use crate::model::parameters::{Co2Mode, SolverParameters};
use crate::time_series::DayProfiles;
use log::{info, warn};
use std::fmt;
use std::ops::{Bound, RangeBounds};

pub mod constraints;
pub mod diagnosis;
pub mod objective;
pub mod solver;
pub mod variables;
pub use constraints::ConstraintGroup;
use diagnosis::diagnose_infeasibility;
use objective::{add_cost_bound, co2_objective, cost_objective};
use solver::{SolveOutcome, SolveStatus, solve};
pub use variables::{SlotVariables, Variables};

/// A decision variable in the optimisation.
///
/// Note that this type does **not** include the value of the variable; it just refers to a
/// particular column of the problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Variable(usize);

impl Variable {
    /// Position of the variable's column in the problem
    pub fn index(self) -> usize {
        self.0
    }
}

/// A column of the problem
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Name used in debug output
    pub name: String,
    /// Lower bound
    pub lower: f64,
    /// Upper bound
    pub upper: f64,
    /// Whether the column is binary
    pub integer: bool,
}

/// A linear constraint `lower <= Σ coeff × var <= upper`
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// The group the row is relaxed with
    pub group: ConstraintGroup,
    /// Lower bound of the left-hand side
    pub lower: f64,
    /// Upper bound of the left-hand side
    pub upper: f64,
    /// Coefficients of the left-hand side
    pub terms: Vec<(Variable, f64)>,
}

impl Row {
    /// Evaluate the left-hand side for the given column values
    pub fn activity(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|(var, coeff)| coeff * values[var.index()])
            .sum()
    }

    /// By how much the given column values violate this row
    pub fn violation(&self, values: &[f64]) -> f64 {
        let activity = self.activity(values);
        (self.lower - activity).max(activity - self.upper).max(0.0)
    }
}

/// Convert range bounds into a pair of lower and upper bounds
fn bounds_of<B: RangeBounds<f64>>(bounds: &B) -> (f64, f64) {
    let lower = match bounds.start_bound() {
        Bound::Included(value) | Bound::Excluded(value) => *value,
        Bound::Unbounded => f64::NEG_INFINITY,
    };
    let upper = match bounds.end_bound() {
        Bound::Included(value) | Bound::Excluded(value) => *value,
        Bound::Unbounded => f64::INFINITY,
    };

    (lower, upper)
}

/// The design problem, before it is handed to the solver
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DesignProblem {
    columns: Vec<Column>,
    rows: Vec<Row>,
}

impl DesignProblem {
    /// Add a continuous column with the given bounds
    pub fn add_column<B: RangeBounds<f64>>(&mut self, name: String, bounds: B) -> Variable {
        let (lower, upper) = bounds_of(&bounds);
        self.columns.push(Column {
            name,
            lower,
            upper,
            integer: false,
        });

        Variable(self.columns.len() - 1)
    }

    /// Add a binary column
    pub fn add_binary_column(&mut self, name: String) -> Variable {
        let var = self.add_column(name, 0.0..=1.0);
        self.columns[var.index()].integer = true;
        var
    }

    /// Add a row belonging to the given group
    pub fn add_row<B, I>(&mut self, group: ConstraintGroup, bounds: B, terms: I)
    where
        B: RangeBounds<f64>,
        I: IntoIterator<Item = (Variable, f64)>,
    {
        let (lower, upper) = bounds_of(&bounds);
        self.rows.push(Row {
            group,
            lower,
            upper,
            terms: terms.into_iter().collect(),
        });
    }

    /// The columns of the problem
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// The rows of the problem
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Number of rows in each constraint group
    pub fn count_rows(&self, group: ConstraintGroup) -> usize {
        self.rows.iter().filter(|row| row.group == group).count()
    }

    /// The largest violation of any row (and of the column bounds) by the given values
    pub fn max_violation(&self, values: &[f64]) -> f64 {
        let rows = self.rows.iter().map(|row| row.violation(values));
        let columns = self
            .columns
            .iter()
            .zip(values)
            .map(|(col, value)| (col.lower - value).max(value - col.upper).max(0.0));
        rows.chain(columns).fold(0.0, f64::max)
    }
}

/// Why the design optimisation did not produce a solution
#[derive(Debug, Clone, PartialEq)]
pub enum OptimisationError {
    /// No design satisfies all constraints
    Infeasible {
        /// The smallest set of constraint groups found to conflict, if a diagnosis was run
        conflicts: Option<Vec<ConstraintGroup>>,
    },
    /// The objective can be improved without limit
    Unbounded,
    /// The solver stopped at a limit without finding any feasible design
    NoSolution(String),
    /// The solver failed
    SolverError(String),
}

impl fmt::Display for OptimisationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Infeasible { conflicts: None } => write!(f, "The design problem is infeasible"),
            Self::Infeasible {
                conflicts: Some(groups),
            } => {
                let names: Vec<_> = groups.iter().map(ToString::to_string).collect();
                write!(
                    f,
                    "The design problem is infeasible. Conflicting constraint groups: {}",
                    names.join(", ")
                )
            }
            Self::Unbounded => write!(f, "The design problem is unbounded"),
            Self::NoSolution(reason) => write!(f, "No feasible design was found: {reason}"),
            Self::SolverError(reason) => write!(f, "The solver failed: {reason}"),
        }
    }
}

impl std::error::Error for OptimisationError {}

/// The solution to the design optimisation problem
#[derive(Debug, Clone, PartialEq)]
pub struct DesignSolution {
    /// The variables of the problem
    pub variables: Variables,
    /// Names of all columns, in order
    pub names: Vec<String>,
    /// Value of every column
    values: Vec<f64>,
    /// Whether the solver proved optimality within the MIP gap
    pub optimal: bool,
}

impl DesignSolution {
    /// The value of a variable
    pub fn value(&self, var: Variable) -> f64 {
        self.values[var.index()]
    }

    /// Values of a per-slot variable on every representative day
    pub fn slot_values(&self, vars: &SlotVariables) -> DayProfiles {
        vars.values(&self.values)
    }

    /// Values of a list of variables
    pub fn values_of(&self, vars: &[Variable]) -> Vec<f64> {
        vars.iter().map(|var| self.value(*var)).collect()
    }

    /// Iterate over the names and values of all columns
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }
}

/// Classify a failed solve
fn solve_error(status: SolveStatus) -> OptimisationError {
    match status {
        SolveStatus::Infeasible => OptimisationError::Infeasible { conflicts: None },
        SolveStatus::Unbounded => OptimisationError::Unbounded,
        SolveStatus::LimitReached => {
            OptimisationError::NoSolution("the solver reached its time limit".into())
        }
        SolveStatus::Failed(reason) => OptimisationError::SolverError(reason),
        SolveStatus::Optimal => OptimisationError::SolverError("no solution returned".into()),
    }
}

/// Solve a problem, retrying once with a relaxed MIP gap if the solver hits its time limit
fn solve_with_retry(
    problem: &DesignProblem,
    objective: &[(Variable, f64)],
    model: &Model,
) -> SolveOutcome {
    let options = model.parameters.solver;
    let outcome = solve(problem, objective, &options, &[]);
    if outcome.status != SolveStatus::LimitReached {
        return outcome;
    }

    let relaxed_gap = (options.mip_gap * options.gap_relaxation).min(0.99);
    warn!("Solver reached its time limit. Retrying with a MIP gap of {relaxed_gap}.");
    let relaxed = SolverParameters {
        mip_gap: relaxed_gap,
        ..options
    };
    let retry = solve(problem, objective, &relaxed, &[]);
    match (&retry.values, &outcome.values) {
        (None, Some(_)) => outcome,
        _ => retry,
    }
}

/// Turn an outcome into its values, running the diagnosis for infeasible problems
fn outcome_values(
    outcome: SolveOutcome,
    problem: &DesignProblem,
    model: &Model,
) -> Result<(Vec<f64>, bool), OptimisationError> {
    let optimal = outcome.status == SolveStatus::Optimal;
    if let Some(values) = outcome.values {
        return Ok((values, optimal));
    }

    match outcome.status {
        SolveStatus::Infeasible => {
            let conflicts = diagnose_infeasibility(problem, &model.parameters.solver);
            Err(OptimisationError::Infeasible { conflicts })
        }
        status => Err(solve_error(status)),
    }
}

/// Perform the design optimisation.
///
/// # Arguments
///
/// * `model` - The model
/// * `cost_factors` - Annualised cost factors of the catalog's devices
///
/// # Returns
///
/// The values of all variables or an [`OptimisationError`] if no design could be found
pub fn perform_design_optimisation(
    model: &Model,
    cost_factors: &CostFactors,
) -> Result<DesignSolution, OptimisationError> {
    // Set up problem
    let mut problem = DesignProblem::default();
    let variables = variables::add_variables(&mut problem, model);
    constraints::add_constraints(&mut problem, &variables, model, cost_factors);
    objective::add_objective_constraints(&mut problem, &variables, model);
    info!(
        "Design problem has {} columns and {} rows",
        problem.columns().len(),
        problem.rows().len()
    );

    // Minimise cost
    let outcome = solve_with_retry(&problem, &cost_objective(&variables), model);
    let (mut values, mut optimal) = outcome_values(outcome, &problem, model)?;

    // Minimise emissions without making the design much more expensive
    if let Co2Mode::Secondary { cost_slack } = model.parameters.objective {
        let tac = values[variables.tac.index()];
        info!("Minimising CO2 emissions with total annual cost of at most {tac} (+{cost_slack})");
        let mut second = problem.clone();
        add_cost_bound(&mut second, &variables, tac, cost_slack.value());
        let outcome = solve_with_retry(&second, &co2_objective(&variables), model);
        let (second_values, second_optimal) = outcome_values(outcome, &second, model)?;
        values = second_values;
        optimal = optimal && second_optimal;
    }

    let names = problem.columns().iter().map(|col| col.name.clone()).collect();
    Ok(DesignSolution {
        variables,
        names,
        values,
        optimal,
    })
}
