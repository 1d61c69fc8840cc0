//! Simulation of retrofit interventions on the energy and carbon pathways of a real-estate
//! portfolio, compared against business as usual and CRREM decarbonisation targets.
#![warn(missing_docs)]
use anyhow::{Context, Result};
use std::path::PathBuf;

pub mod asset;
pub mod cli;
pub mod id;
pub mod input;
pub mod intervention;
pub mod log;
pub mod model;
pub mod output;
pub mod pathway;
pub mod reference;
pub mod rollout;
pub mod scenario;
pub mod settings;
pub mod simulation;
pub mod units;

#[cfg(test)]
mod fixture;

/// Get config dir for program.
///
/// This is `$HOME/.config/crrem-sim` on Linux and the platform equivalent elsewhere.
pub fn get_crrem_sim_config_dir() -> Result<PathBuf> {
    let mut path = dirs::config_dir().context("Could not locate user config directory")?;
    path.push("crrem-sim");
    Ok(path)
}
