//! Monthly voyage planning for a coastal tanker fleet.
//!
//! Given a fleet of tankers, the ports they serve and the sailing times between them, the planner
//! decides which vessel makes which voyages so that every port receives exactly its monthly demand
//! at the least total cost, or explains why that is impossible.
#![warn(missing_docs)]
use std::path::PathBuf;

pub mod cli;
pub mod costing;
pub mod diagnostics;
pub mod error;
pub mod fixed;
pub mod id;
pub mod input;
pub mod log;
pub mod model;
pub mod optimisation;
pub mod output;
pub mod pattern;
pub mod planner;
pub mod port;
pub mod result;
pub mod sailing;
pub mod settings;
pub mod solver;
pub mod units;
pub mod vessel;

#[cfg(test)]
mod fixture;

/// Get the config dir for the program
pub fn get_fleetplan_config_dir() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_default();
    path.push("fleetplan");

    path
}
