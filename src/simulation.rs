//! Functionality for running a model's scenarios and saving the results.
use crate::model::{Model, ScenarioSet};
use crate::output::DataWriter;
use crate::output::metadata::write_metadata;
use anyhow::{Context, Result};
use log::{info, warn};
use std::path::Path;

/// Run the simulation.
///
/// # Arguments:
///
/// * `model` - The model to run
/// * `scenarios` - The scenarios to compare against BAU, including any which failed to build
/// * `output_path` - The folder to which output files will be written
/// * `model_path` - The folder the model was loaded from (recorded in the run metadata)
pub fn run(
    model: &Model,
    scenarios: &ScenarioSet,
    output_path: &Path,
    model_path: &Path,
) -> Result<()> {
    let total = scenarios.scenarios.len() + scenarios.failed.len();
    if total == 0 {
        warn!("No scenarios defined: only BAU and target pathways will be written");
    }

    let mut comparison = model.apply_interventions(&scenarios.scenarios)?;
    comparison
        .failed
        .splice(0..0, scenarios.failed.iter().cloned());
    if !comparison.failed.is_empty() {
        warn!(
            "{} of {total} scenarios failed and were left out of the results",
            comparison.failed.len()
        );
    }

    let mut writer = DataWriter::create(output_path)?;
    writer.write_comparison(&comparison, &model.assets)?;
    writer.flush()?;
    write_metadata(output_path, model_path, &comparison)
        .context("Failed to save metadata")?;
    info!(
        "Results for {} scenarios written to {}",
        comparison.impacts.len(),
        output_path.display()
    );

    Ok(())
}
