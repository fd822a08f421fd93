//! Code for writing metadata about a run to file
use crate::device::DeviceKind;
use crate::model::Model;
use anyhow::{Result, anyhow};
use chrono::prelude::*;
use platform_info::{PlatformInfo, PlatformInfoAPI, UNameAPI};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// The output file name for metadata
const METADATA_FILE_NAME: &str = "metadata.toml";

/// Information about the program build via `built` crate
mod built_info {
    // The file has been placed there by the build script.
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

/// The short git commit hash of the build, marked if the tree was dirty
fn git_hash() -> String {
    match (built_info::GIT_COMMIT_HASH_SHORT, built_info::GIT_DIRTY) {
        (None, _) => "unknown".into(),
        (Some(hash), Some(true)) => format!("{hash}-dirty"),
        (Some(hash), _) => hash.into(),
    }
}

#[derive(Serialize)]
struct Metadata<'a> {
    run: RunMetadata<'a>,
    program: ProgramMetadata,
    platform: PlatformMetadata,
}

/// Information about the design run
#[derive(Serialize)]
struct RunMetadata<'a> {
    /// Path to the model which was run
    model_path: &'a Path,
    /// The date and time at which the run started
    datetime: String,
    /// Devices which could be installed
    devices: Vec<DeviceKind>,
    /// Number of representative days in the design problem
    representative_days: usize,
}

#[derive(Serialize)]
struct ProgramMetadata {
    name: &'static str,
    /// The program version as specified in Cargo.toml
    version: &'static str,
    /// The target triple of the build
    target: &'static str,
    is_debug: bool,
    rustc_version: &'static str,
    build_time_utc: &'static str,
    git_commit_hash: String,
}

impl ProgramMetadata {
    fn new() -> Self {
        Self {
            name: built_info::PKG_NAME,
            version: built_info::PKG_VERSION,
            target: built_info::TARGET,
            is_debug: built_info::DEBUG,
            rustc_version: built_info::RUSTC_VERSION,
            build_time_utc: built_info::BUILT_TIME_UTC,
            git_commit_hash: git_hash(),
        }
    }
}

/// The system the program is running on, as reported by [`PlatformInfo`]
#[derive(Serialize)]
struct PlatformMetadata {
    sysname: String,
    release: String,
    machine: String,
    osname: String,
}

impl PlatformMetadata {
    fn new() -> Result<Self> {
        let info = PlatformInfo::new()
            .map_err(|err| anyhow!("Unable to determine platform info: {err}"))?;
        Ok(Self {
            sysname: info.sysname().to_string_lossy().into(),
            release: info.release().to_string_lossy().into(),
            machine: info.machine().to_string_lossy().into(),
            osname: info.osname().to_string_lossy().into(),
        })
    }
}

/// Write metadata about the run of `model` to the specified output path in TOML format
pub fn write_metadata(output_path: &Path, model: &Model) -> Result<()> {
    let metadata = Metadata {
        run: RunMetadata {
            model_path: &model.model_path,
            datetime: Local::now().to_rfc2822(),
            devices: model.catalog.iter().map(|device| device.kind).collect(),
            representative_days: model.days.n_days(),
        },
        program: ProgramMetadata::new(),
        platform: PlatformMetadata::new()?,
    };
    let file_path = output_path.join(METADATA_FILE_NAME);
    fs::write(&file_path, toml::to_string(&metadata)?)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::model;
    use rstest::rstest;
    use tempfile::tempdir;

    #[rstest]
    fn test_write_metadata(model: Model) {
        let dir = tempdir().unwrap();
        write_metadata(dir.path(), &model).unwrap();

        let contents = fs::read_to_string(dir.path().join(METADATA_FILE_NAME)).unwrap();
        let table: toml::Table = toml::from_str(&contents).unwrap();
        assert_eq!(table["run"]["devices"].as_array().unwrap().len(), 1);
        assert_eq!(table["run"]["representative_days"].as_integer(), Some(1));
        assert_eq!(table["program"]["name"].as_str(), Some("hubdesign"));
    }
}
