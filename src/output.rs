//! The module responsible for writing output data to disk.
use crate::asset::{Asset, AssetMap};
use crate::id::{AssetID, CountryID, InterventionTypeID, ScenarioName, SectorID, UtilityID};
use crate::intervention::ImpactRecord;
use crate::model::ScenarioComparison;
use crate::pathway::{ConsumptionPathway, CrremPathway, PathwayCode};
use crate::units::{Area, Money};
use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};
use std::fs;
use std::fs::File;
use std::path::{Path, PathBuf};

pub mod metadata;

/// The root folder in which model-specific output folders will be created
const OUTPUT_DIRECTORY_ROOT: &str = "crrem_sim_results";

/// The output file name for energy and emissions pathways
const PATHWAYS_FILE_NAME: &str = "pathways.csv";

/// The output file name for consumption under each scenario
const CONSUMPTION_FILE_NAME: &str = "scenario_consumption.csv";

/// The output file name for intervention impacts
const IMPACTS_FILE_NAME: &str = "impacts.csv";

/// Get the default output directory for the model specified at `model_dir`
pub fn get_output_dir(model_dir: &Path) -> Result<PathBuf> {
    // Resolve "." and the like so the folder has a name
    let model_dir = model_dir
        .canonicalize()
        .context("Could not resolve path to model")?;

    let model_name = model_dir
        .file_name()
        .context("Model cannot be in root folder")?
        .to_str()
        .context("Invalid chars in model dir name")?;

    // Construct path
    Ok([OUTPUT_DIRECTORY_ROOT, model_name].iter().collect())
}

/// Create a new output directory for the model, optionally replacing an existing one.
///
/// # Returns
///
/// True if an existing directory was overwritten, false otherwise.
pub fn create_output_directory(output_dir: &Path, allow_overwrite: bool) -> Result<bool> {
    // If the folder already exists, then delete it
    let overwrite = if let Ok(mut it) = fs::read_dir(output_dir) {
        if it.next().is_none() {
            // Folder exists and is empty: nothing to do
            return Ok(false);
        }

        ensure!(
            allow_overwrite,
            "Output folder already exists and is not empty. \
            Please delete the folder or pass the --overwrite command-line option."
        );

        fs::remove_dir_all(output_dir)?;
        true
    } else {
        false
    };

    // Try to create the directory, with parents
    fs::create_dir_all(output_dir)?;

    Ok(overwrite)
}

/// Asset attributes appended to rows of the pathways CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct AssetAttributesRow {
    sector: SectorID,
    country: CountryID,
    area: Area,
}

impl AssetAttributesRow {
    fn new(asset: &Asset) -> Self {
        Self {
            sector: asset.sector.clone(),
            country: asset.country.clone(),
            area: asset.area,
        }
    }
}

/// Represents a row in the pathways CSV file.
///
/// This will be written along with an [`AssetAttributesRow`] containing asset-related info.
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct PathwayRow {
    scenario: ScenarioName,
    asset_id: AssetID,
    pathway_code: PathwayCode,
    year: u32,
    value: f64,
    /// Value per m² of floor area
    intensity: f64,
}

/// Represents a row in the scenario consumption CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct ConsumptionRow {
    scenario: ScenarioName,
    asset_id: AssetID,
    utility: UtilityID,
    year: u32,
    consumption: f64,
}

/// Represents a row in the impacts CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct ImpactRow {
    scenario: ScenarioName,
    target: AssetID,
    year: u32,
    intervention_type: InterventionTypeID,
    cost: Money,
    utility: UtilityID,
    change: f64,
}

/// An object for writing scenario results to file
pub struct DataWriter {
    pathways_writer: csv::Writer<File>,
    consumption_writer: csv::Writer<File>,
    impacts_writer: csv::Writer<File>,
}

impl DataWriter {
    /// Open CSV files to write output data to
    ///
    /// # Arguments
    ///
    /// * `output_path` - Folder where files will be saved
    pub fn create(output_path: &Path) -> Result<Self> {
        let new_writer = |file_name| {
            let file_path = output_path.join(file_name);
            csv::Writer::from_path(file_path)
        };

        Ok(Self {
            pathways_writer: new_writer(PATHWAYS_FILE_NAME)?,
            consumption_writer: new_writer(CONSUMPTION_FILE_NAME)?,
            impacts_writer: new_writer(IMPACTS_FILE_NAME)?,
        })
    }

    /// Write all results in a [`ScenarioComparison`]
    pub fn write_comparison(
        &mut self,
        comparison: &ScenarioComparison,
        assets: &AssetMap,
    ) -> Result<()> {
        for (scenario, pathways) in &comparison.pathways {
            self.write_pathways(scenario, pathways, assets)?;
        }
        for (scenario, consumption) in &comparison.consumption {
            self.write_consumption(scenario, consumption)?;
        }
        for (scenario, impacts) in &comparison.impacts {
            self.write_impacts(scenario, impacts)?;
        }

        Ok(())
    }

    /// Write a scenario's energy and emissions pathways to a CSV file, in absolute terms and per
    /// m² of floor area
    pub fn write_pathways(
        &mut self,
        scenario: &ScenarioName,
        pathways: &CrremPathway,
        assets: &AssetMap,
    ) -> Result<()> {
        let intensities = pathways.normalise(assets)?;
        for ((asset_id, code, year, value), (_, _, _, intensity)) in
            pathways.iter_records().zip(intensities.iter_records())
        {
            let asset = assets
                .get(asset_id)
                .with_context(|| format!("Unknown asset ID {asset_id}"))?;
            let row = PathwayRow {
                scenario: scenario.clone(),
                asset_id: asset_id.clone(),
                pathway_code: *code,
                year,
                value,
                intensity,
            };
            self.pathways_writer
                .serialize((row, AssetAttributesRow::new(asset)))?;
        }

        Ok(())
    }

    /// Write a scenario's consumption to a CSV file
    pub fn write_consumption(
        &mut self,
        scenario: &ScenarioName,
        consumption: &ConsumptionPathway,
    ) -> Result<()> {
        for (asset_id, utility, year, value) in consumption.iter_records() {
            let row = ConsumptionRow {
                scenario: scenario.clone(),
                asset_id: asset_id.clone(),
                utility: utility.clone(),
                year,
                consumption: value,
            };
            self.consumption_writer.serialize(row)?;
        }

        Ok(())
    }

    /// Write a scenario's impact log to a CSV file, with one row per utility per intervention
    pub fn write_impacts(&mut self, scenario: &ScenarioName, impacts: &[ImpactRecord]) -> Result<()> {
        for impact in impacts {
            for (utility, change) in &impact.changes {
                let row = ImpactRow {
                    scenario: scenario.clone(),
                    target: impact.target.clone(),
                    year: impact.year,
                    intervention_type: impact.intervention_type.clone(),
                    cost: impact.cost,
                    utility: utility.clone(),
                    change: *change,
                };
                self.impacts_writer.serialize(row)?;
            }
        }

        Ok(())
    }

    /// Flush the underlying streams
    pub fn flush(&mut self) -> Result<()> {
        self.pathways_writer.flush()?;
        self.consumption_writer.flush()?;
        self.impacts_writer.flush()?;

        Ok(())
    }
}
