//! Code for reading the hourly demand and weather series from a CSV file.
use super::*;
use crate::time_series::{Demand, HOURS_PER_YEAR, HourlyInputs, Weather};
use anyhow::{Context, Result, ensure};
use serde::Deserialize;
use std::path::Path;

const TIME_SERIES_FILE_NAME: &str = "time_series.csv";

/// One hour of demand and weather data
#[derive(PartialEq, Debug, Deserialize)]
struct HourRaw {
    hour: usize,
    heat: f64,
    cool: f64,
    power: f64,
    #[serde(default)]
    hydrogen: f64,
    t_air: f64,
    ghi: f64,
    wind_speed: f64,
}

/// Collect hourly records into demand and weather series
fn read_hourly_inputs_from_iter<I>(iter: I) -> Result<HourlyInputs>
where
    I: IntoIterator<Item = HourRaw>,
{
    let mut demand = Demand::<Vec<f64>>::default();
    let mut weather = Weather::<Vec<f64>>::default();
    for (idx, record) in iter.into_iter().enumerate() {
        ensure!(
            record.hour == idx + 1,
            "Hours must be numbered consecutively from 1 (expected {}, found {})",
            idx + 1,
            record.hour
        );
        ensure!(
            record.ghi >= 0.0 && record.wind_speed >= 0.0,
            "Irradiance and wind speed must be non-negative (hour {})",
            record.hour
        );
        ensure!(
            record.t_air.is_finite(),
            "Air temperature must be a finite number (hour {})",
            record.hour
        );

        demand.heat.push(record.heat);
        demand.cooling.push(record.cool);
        demand.power.push(record.power);
        demand.hydrogen.push(record.hydrogen);
        weather.air_temperature.push(record.t_air);
        weather.ghi.push(record.ghi);
        weather.wind_speed.push(record.wind_speed);
    }
    ensure!(
        demand.heat.len() == HOURS_PER_YEAR,
        "Expected {HOURS_PER_YEAR} hours, found {}",
        demand.heat.len()
    );

    HourlyInputs::new(demand, weather)
}

/// Read the hourly demand and weather of the year.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
pub fn read_hourly_inputs(model_dir: &Path) -> Result<HourlyInputs> {
    let file_path = model_dir.join(TIME_SERIES_FILE_NAME);
    let records = read_csv::<HourRaw>(&file_path)?;
    read_hourly_inputs_from_iter(records).with_context(|| input_err_msg(&file_path))
}
