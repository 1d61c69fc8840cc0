//! Scenarios are named sets of interventions, replayed in year order against a pathway.
use crate::asset::Scope;
use crate::id::{AssetID, CountryID, InterventionTypeID, ScenarioName, SectorID};
use crate::intervention::{ImpactRecord, Intervention};
use crate::model::Model;
use crate::pathway::SplitPathway;
use crate::rollout::Rollout;
use anyhow::{Context, Result};
use itertools::Itertools;
use log::debug;
use serde::Deserialize;

/// A row of the interventions table
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InterventionSpec {
    /// The scenario the intervention belongs to
    pub scenario: ScenarioName,
    /// The asset to intervene upon
    pub target: AssetID,
    /// The year the intervention takes effect
    pub year: u32,
    /// The type of intervention
    pub intervention_type: InterventionTypeID,
}

/// A row of the rollouts table
#[derive(Debug, Clone, PartialEq)]
pub struct RolloutSpec {
    /// The scenario the rollout belongs to
    pub scenario: ScenarioName,
    /// The type of intervention to roll out
    pub intervention_type: InterventionTypeID,
    /// The first year of installations
    pub start_year: u32,
    /// The number of assets to intervene upon each year
    pub installations_per_year: u32,
    /// The countries in which to intervene
    pub country_scope: Scope<CountryID>,
    /// The sectors in which to intervene
    pub sector_scope: Scope<SectorID>,
}

/// A named, ordered set of interventions
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    /// The scenario's name
    pub name: ScenarioName,
    interventions: Vec<Intervention>,
}

impl Scenario {
    /// Create a new [`Scenario`] from explicit interventions and rollouts.
    ///
    /// Rollouts are unpacked and appended to the explicit interventions, then the whole list is
    /// sorted by year. Interventions in the same year keep the order in which they were given.
    pub fn new(
        name: ScenarioName,
        mut interventions: Vec<Intervention>,
        rollouts: &[Rollout],
        model: &Model,
    ) -> Result<Self> {
        for rollout in rollouts {
            let unpacked = rollout.unpack(model).with_context(|| {
                format!(
                    "Failed to unpack {} rollout starting in {}",
                    rollout.intervention_type, rollout.start_year
                )
            })?;
            interventions.extend(unpacked);
        }
        interventions.sort_by_key(|intervention| intervention.year);

        Ok(Self {
            name,
            interventions,
        })
    }

    /// Create a new [`Scenario`] from the rows of the interventions and rollouts tables with a
    /// matching scenario name
    pub fn from_tables(
        name: ScenarioName,
        interventions: &[InterventionSpec],
        rollouts: &[RolloutSpec],
        model: &Model,
    ) -> Result<Self> {
        let explicit: Vec<_> = interventions
            .iter()
            .filter(|row| row.scenario == name)
            .map(|row| Intervention::new(&row.target, row.year, row.intervention_type.clone(), model))
            .try_collect()?;
        let rollouts: Vec<_> = rollouts
            .iter()
            .filter(|row| row.scenario == name)
            .map(|row| {
                Rollout::new(
                    row.intervention_type.clone(),
                    row.start_year,
                    row.installations_per_year,
                    row.country_scope.clone(),
                    row.sector_scope.clone(),
                    model,
                )
            })
            .try_collect()?;

        Self::new(name, explicit, &rollouts, model)
    }

    /// The interventions in this scenario, in execution order
    pub fn interventions(&self) -> &[Intervention] {
        &self.interventions
    }

    /// Replay the scenario against a pathway.
    ///
    /// Each intervention acts on the pathway produced by the previous one. Returns the final
    /// pathway along with the impact of each intervention in execution order.
    pub fn act(&self, pathway: SplitPathway) -> Result<(SplitPathway, Vec<ImpactRecord>)> {
        let mut impacts = Vec::with_capacity(self.interventions.len());
        let pathway = self
            .interventions
            .iter()
            .try_fold(pathway, |pathway, intervention| {
                debug!(
                    "{}: applying {} to {} in {}",
                    self.name, intervention.intervention_type, intervention.asset.id, intervention.year
                );
                let (pathway, impact) = intervention.act(pathway)?;
                impacts.push(impact);
                Ok::<_, anyhow::Error>(pathway)
            })?;

        Ok((pathway, impacts))
    }
}
