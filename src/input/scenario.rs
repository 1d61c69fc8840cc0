//! Code for reading the interventions and rollouts tables.
use super::*;
use crate::asset::Scope;
use crate::id::{InterventionTypeID, ScenarioName};
use crate::scenario::{InterventionSpec, RolloutSpec};
use serde::Deserialize;

const INTERVENTIONS_FILE_NAME: &str = "interventions.csv";
const ROLLOUTS_FILE_NAME: &str = "rollouts.csv";

#[derive(PartialEq, Debug, Deserialize)]
struct RolloutSpecRaw {
    scenario: ScenarioName,
    intervention_type: InterventionTypeID,
    start_year: u32,
    installations_per_year: u32,
    #[serde(default)]
    country_scope: String,
    #[serde(default)]
    sector_scope: String,
}

impl From<RolloutSpecRaw> for RolloutSpec {
    fn from(raw: RolloutSpecRaw) -> Self {
        Self {
            scenario: raw.scenario,
            intervention_type: raw.intervention_type,
            start_year: raw.start_year,
            installations_per_year: raw.installations_per_year,
            country_scope: Scope::parse(&raw.country_scope),
            sector_scope: Scope::parse(&raw.sector_scope),
        }
    }
}

/// Read the interventions table, if present.
///
/// Rows are returned in file order.
pub fn read_intervention_specs(model_dir: &Path) -> Result<Vec<InterventionSpec>> {
    let file_path = model_dir.join(INTERVENTIONS_FILE_NAME);
    Ok(read_csv_optional(&file_path)?.collect())
}

/// Read the rollouts table, if present.
///
/// Rows are returned in file order.
pub fn read_rollout_specs(model_dir: &Path) -> Result<Vec<RolloutSpec>> {
    let file_path = model_dir.join(ROLLOUTS_FILE_NAME);
    Ok(read_csv_optional::<RolloutSpecRaw>(&file_path)?
        .map(RolloutSpec::from)
        .collect())
}
