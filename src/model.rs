//! The model represents the static input data provided by the user.
use crate::day_mapping::{DayMapping, RepresentativeDays};
use crate::device::DeviceCatalog;
use crate::input::catalog::read_catalog;
use crate::input::day_clusters::read_day_mapping;
use crate::input::time_series::read_hourly_inputs;
use crate::time_series::HourlyInputs;
use anyhow::Result;
use log::info;
use std::path::{Path, PathBuf};

pub mod parameters;
pub use parameters::ModelParameters;

/// Model definition
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    /// Path to model folder
    pub model_path: PathBuf,
    /// Parameters from the model TOML file
    pub parameters: ModelParameters,
    /// The devices which may be part of the hub
    pub catalog: DeviceCatalog,
    /// Unclustered demand and weather of the whole year
    pub hourly: HourlyInputs,
    /// Demand and weather of the representative days
    pub days: RepresentativeDays,
}

impl Model {
    /// Read a model from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `model_dir` - Folder containing model configuration files
    pub fn from_path<P: AsRef<Path>>(model_dir: P) -> Result<Model> {
        let model_dir = model_dir.as_ref();
        let parameters = ModelParameters::from_path(model_dir)?;
        let catalog = read_catalog(
            model_dir,
            parameters.device_overrides.as_deref(),
            &parameters.devices_to_use,
        )?;
        let hourly = read_hourly_inputs(model_dir)?;
        let mapping = read_day_mapping(model_dir)?;
        info!(
            "Using {} representative days for {} catalog devices",
            mapping.n_representative(),
            catalog.iter().count()
        );

        Ok(Self::new(
            model_dir.to_path_buf(),
            parameters,
            catalog,
            hourly,
            mapping,
        ))
    }

    /// Bundle the inputs of a model, reducing the hourly inputs to the representative days
    pub fn new(
        model_path: PathBuf,
        parameters: ModelParameters,
        catalog: DeviceCatalog,
        hourly: HourlyInputs,
        mapping: DayMapping,
    ) -> Self {
        let days = RepresentativeDays::new(mapping, &hourly);
        Self {
            model_path,
            parameters,
            catalog,
            hourly,
            days,
        }
    }
}
