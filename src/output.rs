//! The module responsible for writing output data to disk.
use crate::optimisation::DesignSolution;
use crate::results::{ScenarioResult, YearProfiles};
use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub mod metadata;

/// The root folder in which model-specific output folders will be created
const OUTPUT_DIRECTORY_ROOT: &str = "hubdesign_results";

/// The output file name for the results of a design run
pub const RESULTS_FILE_NAME: &str = "results.json";

/// The output file name for the hourly profiles of the year
pub const PROFILES_FILE_NAME: &str = "annual_profiles.csv";

/// The output file name for the values of all variables
const VARIABLES_FILE_NAME: &str = "debug_variables.csv";

/// Get the model name from the specified directory path
pub fn get_output_dir(model_dir: &Path) -> Result<PathBuf> {
    // Get the model name from the dir path. This ends up being convoluted because we need to check
    // for all possible errors. Ugh.
    let model_dir = model_dir
        .canonicalize() // canonicalise in case the user has specified "."
        .context("Could not resolve path to model")?;

    let model_name = model_dir
        .file_name()
        .context("Model cannot be in root folder")?
        .to_str()
        .context("Invalid chars in model dir name")?;

    // Construct path
    Ok([OUTPUT_DIRECTORY_ROOT, model_name].iter().collect())
}

/// Create a new output directory, emptying it first if it already exists.
///
/// # Returns
///
/// Whether an existing output directory was overwritten
pub fn create_output_directory(output_dir: &Path, allow_overwrite: bool) -> Result<bool> {
    let overwrite = output_dir.is_dir() && fs::read_dir(output_dir)?.next().is_some();
    if overwrite {
        ensure!(
            allow_overwrite,
            "Output folder already exists and is not empty. Use --overwrite to replace it."
        );
        fs::remove_dir_all(output_dir)?;
    }

    // Try to create the directory, with parents
    fs::create_dir_all(output_dir)?;

    Ok(overwrite)
}

/// Write a value as pretty-printed JSON
fn write_json<T: Serialize>(file_path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(file_path, json)
        .with_context(|| format!("Could not write {}", file_path.display()))
}

/// Write the results of a design run to `results.json`
pub fn write_results(output_path: &Path, result: &ScenarioResult) -> Result<()> {
    write_json(&output_path.join(RESULTS_FILE_NAME), result)
}

/// Write the hourly profiles of the year to a CSV file with one row per hour
pub fn write_profiles(output_path: &Path, profiles: &YearProfiles) -> Result<()> {
    let mut writer = csv::Writer::from_path(output_path.join(PROFILES_FILE_NAME))?;
    let (names, columns): (Vec<_>, Vec<_>) = profiles.iter().unzip();
    writer.write_record(std::iter::once("hour").chain(names.iter().copied()))?;

    let n_hours = columns.first().map_or(0, |column| column.len());
    for hour in 0..n_hours {
        let values = columns.iter().map(|column| column[hour].to_string());
        writer.write_record(std::iter::once(hour.to_string()).chain(values))?;
    }
    writer.flush()?;

    Ok(())
}

/// Represents a row in the debug variables CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct VariableRow {
    variable: String,
    value: f64,
}

/// Write the name and value of every variable of the design problem to a CSV file
pub fn write_debug_variables(output_path: &Path, solution: &DesignSolution) -> Result<()> {
    let mut writer = csv::Writer::from_path(output_path.join(VARIABLES_FILE_NAME))?;
    for (name, value) in solution.iter() {
        writer.serialize(VariableRow {
            variable: name.into(),
            value,
        })?;
    }
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finance::CostFactors;
    use crate::fixture::model;
    use crate::model::Model;
    use crate::optimisation::perform_design_optimisation;
    use crate::time_series::HOURS_PER_YEAR;
    use itertools::Itertools;
    use rstest::rstest;
    use tempfile::tempdir;

    #[test]
    fn test_create_output_directory() {
        let dir = tempdir().unwrap();
        let output_dir = dir.path().join("results");

        // New directory
        assert!(!create_output_directory(&output_dir, false).unwrap());
        assert!(output_dir.is_dir());

        // Existing but empty directory
        assert!(!create_output_directory(&output_dir, false).unwrap());

        // Existing directory with contents
        fs::write(output_dir.join("file.txt"), "contents").unwrap();
        assert!(create_output_directory(&output_dir, false).is_err());
        assert!(create_output_directory(&output_dir, true).unwrap());
        assert!(!output_dir.join("file.txt").exists());
    }

    #[rstest]
    fn test_write_outputs(model: Model) {
        let factors = CostFactors::new(&model.parameters.economics, &model.catalog);
        let solution = perform_design_optimisation(&model, &factors).unwrap();
        let result = ScenarioResult::new(&model, &solution, None);
        let dir = tempdir().unwrap();

        // Results round trip through JSON
        write_results(dir.path(), &result).unwrap();
        let read = ScenarioResult::from_path(&dir.path().join(RESULTS_FILE_NAME)).unwrap();
        assert_eq!(read.devices.keys().collect_vec(), result.devices.keys().collect_vec());
        assert_eq!(read.optimal, result.optimal);

        // One row per hour
        write_profiles(dir.path(), &YearProfiles::new(&model, &solution)).unwrap();
        let mut reader = csv::Reader::from_path(dir.path().join(PROFILES_FILE_NAME)).unwrap();
        assert_eq!(&reader.headers().unwrap()[0], "hour");
        assert_eq!(reader.records().count(), HOURS_PER_YEAR);

        write_debug_variables(dir.path(), &solution).unwrap();
        let rows: Vec<VariableRow> = csv::Reader::from_path(dir.path().join(VARIABLES_FILE_NAME))
            .unwrap()
            .into_deserialize()
            .try_collect()
            .unwrap();
        assert_eq!(rows.len(), solution.names.len());
        assert!(rows.iter().any(|row| row.variable == "tac"));
    }
}
