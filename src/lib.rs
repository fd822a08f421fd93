//! Design optimisation of energy hubs.
//!
//! A hub converts and stores energy carriers (electricity, heat, cooling, fuels) to cover the
//! demand of a building or district. The devices to install, their capacities and their dispatch
//! on a set of representative days are chosen by solving a mixed-integer linear program, and the
//! result is compared with a conventional reference system.
#![warn(missing_docs)]
use std::path::PathBuf;

pub mod carrier;
pub mod cli;
pub mod compare;
pub mod day_mapping;
pub mod device;
pub mod finance;
pub mod input;
pub mod log;
pub mod model;
pub mod optimisation;
pub mod output;
pub mod reference;
pub mod results;
pub mod settings;
pub mod simulation;
pub mod time_series;
pub mod units;
pub mod wind;

#[cfg(test)]
mod fixture;

/// Get the folder of the program's configuration files
pub fn get_config_dir() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_default();
    path.push("hubdesign");
    path
}
