//! Code for reading the assignment of calendar days to representative days.
use super::*;
use crate::day_mapping::DayMapping;
use crate::time_series::DAYS_PER_YEAR;
use anyhow::{Context, Result, ensure};
use serde::Deserialize;
use std::path::Path;

const DAY_CLUSTERS_FILE_NAME: &str = "day_clusters.csv";

/// A calendar day and the calendar day representing it (both numbered from 1)
#[derive(PartialEq, Debug, Deserialize)]
struct DayClusterRaw {
    day: usize,
    representative: usize,
}

fn read_day_mapping_from_iter<I>(iter: I) -> Result<DayMapping>
where
    I: IntoIterator<Item = DayClusterRaw>,
{
    let mut medoids = Vec::with_capacity(DAYS_PER_YEAR);
    for (idx, record) in iter.into_iter().enumerate() {
        ensure!(
            record.day == idx + 1,
            "Days must be numbered consecutively from 1 (expected {}, found {})",
            idx + 1,
            record.day
        );
        ensure!(
            (1..=DAYS_PER_YEAR).contains(&record.representative),
            "Representative day {} of day {} is outside the year",
            record.representative,
            record.day
        );
        medoids.push(record.representative - 1);
    }

    DayMapping::from_medoids(&medoids)
}

/// Read the day clusters from a CSV file.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
///
/// # Returns
///
/// The day mapping or, if the file doesn't exist, a mapping in which every calendar day
/// represents itself.
pub fn read_day_mapping(model_dir: &Path) -> Result<DayMapping> {
    let file_path = model_dir.join(DAY_CLUSTERS_FILE_NAME);
    if !file_path.exists() {
        return Ok(DayMapping::identity());
    }

    let records = read_csv::<DayClusterRaw>(&file_path)?;
    read_day_mapping_from_iter(records).with_context(|| input_err_msg(&file_path))
}
