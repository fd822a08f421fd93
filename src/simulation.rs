//! Functionality for running a design of the energy hub.
use crate::finance::CostFactors;
use crate::model::Model;
use crate::optimisation::{DesignSolution, perform_design_optimisation};
use crate::output::metadata::write_metadata;
use crate::output::{write_debug_variables, write_profiles, write_results};
use crate::reference::{ReferenceResult, calculate_reference};
use crate::results::{ScenarioResult, YearProfiles};
use anyhow::{Context, Result};
use log::{info, warn};
use std::path::Path;

/// The outcome of a design run, before anything is written to disk
#[derive(Debug, Clone, PartialEq)]
pub struct DesignRun {
    /// Values of all variables
    pub solution: DesignSolution,
    /// Results read back from the solution
    pub result: ScenarioResult,
}

/// Calculate the reference system of a model, if it has one
pub fn run_reference(model: &Model) -> Result<Option<ReferenceResult>> {
    let cost_factors = CostFactors::new(&model.parameters.economics, &model.catalog);
    let reference = calculate_reference(model, &cost_factors)
        .context("Failed to calculate the reference system.")?;
    if let Some(reference) = &reference {
        info!(
            "Reference system: total annual cost {:.2}, CO2 emissions {:.2} kg",
            reference.tac.value(),
            reference.co2.value()
        );
    }

    Ok(reference)
}

/// Optimise the design of the hub and read back the results.
///
/// The reference system is calculated first so that it can be reported alongside the design.
pub fn design_hub(model: &Model) -> Result<DesignRun> {
    let reference = run_reference(model)?;

    let cost_factors = CostFactors::new(&model.parameters.economics, &model.catalog);
    let solution = perform_design_optimisation(model, &cost_factors)
        .context("Design optimisation failed.")?;
    if !solution.optimal {
        warn!("The solver stopped before proving optimality; results may not be optimal");
    }

    let result = ScenarioResult::new(model, &solution, reference);
    info!(
        "Design: total annual cost {:.2}, CO2 emissions {:.2} kg, {} devices installed",
        result.total_costs.tac.value(),
        result.co2_emissions.net.value(),
        result.devices.len()
    );

    Ok(DesignRun { solution, result })
}

/// Run the design and write its outputs.
///
/// # Arguments
///
/// * `model` - The model to run
/// * `output_path` - The folder to which output files will be written
/// * `debug_model` - Whether to write the values of all variables
/// * `write_year_profiles` - Whether to write the hourly profiles of the year
pub fn run(
    model: &Model,
    output_path: &Path,
    debug_model: bool,
    write_year_profiles: bool,
) -> Result<ScenarioResult> {
    write_metadata(output_path, model).context("Failed to save metadata.")?;

    let DesignRun { solution, result } = design_hub(model)?;
    write_results(output_path, &result)?;
    if write_year_profiles {
        write_profiles(output_path, &YearProfiles::new(model, &solution))?;
    }
    if debug_model {
        write_debug_variables(output_path, &solution)?;
    }

    Ok(result)
}
