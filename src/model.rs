//! The model holds the BAU baseline for a portfolio and runs intervention scenarios against it.
use crate::asset::AssetMap;
use crate::id::{AssetID, ScenarioName, UtilityID};
use crate::intervention::ImpactRecord;
use crate::pathway::{ConsumptionPathway, CrremPathway, PathwayCode, SplitPathway};
use crate::reference::ReferenceData;
use crate::scenario::{InterventionSpec, RolloutSpec, Scenario};
use crate::units::Energy;
use anyhow::{Context, Result, ensure};
use indexmap::{IndexMap, IndexSet};
use itertools::Itertools;
use log::{error, info, warn};
use serde::Deserialize;

pub mod parameters;
pub use parameters::ModelParameters;

/// The name given to the business-as-usual pathways in a [`ScenarioComparison`]
pub const BAU_SCENARIO_NAME: &str = "BAU";

/// The name given to the target pathways in a [`ScenarioComparison`]
pub const TARGET_SCENARIO_NAME: &str = "Target";

/// A single observation of an asset's annual consumption of a utility
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConsumptionRecord {
    /// The asset
    pub asset_id: AssetID,
    /// The utility consumed (e.g. "Elec", "Gas")
    pub utility: UtilityID,
    /// The year of consumption
    pub year: u32,
    /// Total consumption over the year
    pub consumption: Energy,
}

/// Model definition
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    /// Parameters from the model TOML file
    pub parameters: ModelParameters,
    /// The portfolio's assets
    pub assets: AssetMap,
    /// Reference data
    pub reference: ReferenceData,
    /// Forecast BAU consumption for each asset and utility
    pub bau_consumption: ConsumptionPathway,
    /// BAU energy and emissions for each asset
    pub bau_pathways: CrremPathway,
    /// Target energy and emissions budgets for each asset
    pub targets: CrremPathway,
}

/// The results of running a set of scenarios
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScenarioComparison {
    /// Energy and emissions pathways for BAU, target and each successful scenario, in that order
    pub pathways: IndexMap<ScenarioName, CrremPathway>,
    /// Consumption by asset and utility for each successful scenario
    pub consumption: IndexMap<ScenarioName, ConsumptionPathway>,
    /// The impact of each executed intervention, in execution order, for each successful scenario
    pub impacts: IndexMap<ScenarioName, Vec<ImpactRecord>>,
    /// Scenarios which could not be run
    pub failed: Vec<ScenarioName>,
}

/// Scenarios built from the interventions and rollouts tables
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScenarioSet {
    /// Scenarios which were built successfully, in the order their names first appear
    pub scenarios: Vec<Scenario>,
    /// Scenarios which could not be built
    pub failed: Vec<ScenarioName>,
}

/// Pivot consumption records into a pathway and forecast it out to `horizon`.
///
/// Records for assets not in `assets` are dropped with a warning.
pub fn forecast_bau_consumption(
    assets: &AssetMap,
    records: &[ConsumptionRecord],
    horizon: u32,
) -> Result<ConsumptionPathway> {
    let (known, unknown): (Vec<_>, Vec<_>) = records
        .iter()
        .partition(|record| assets.contains_key(&record.asset_id));

    if !unknown.is_empty() {
        warn!(
            "Ignoring consumption records for assets not in the asset registry: {}",
            unknown.iter().map(|record| &record.asset_id).unique().join(", ")
        );
    }

    for record in &known {
        ensure!(
            record.consumption.is_finite() && record.consumption >= Energy(0.0),
            "Consumption for asset {} must be a finite, non-negative number",
            record.asset_id
        );
    }

    let pathway = ConsumptionPathway::from_records(known.into_iter().map(|record| {
        (
            record.asset_id.clone(),
            record.utility.clone(),
            record.year,
            record.consumption.value(),
        )
    }))?;

    Ok(pathway.fill_to_horizon(horizon))
}

impl Model {
    /// Create a new [`Model`] from the portfolio's assets and consumption.
    ///
    /// BAU consumption is forecast out to the horizon, and the BAU and target pathways are
    /// calculated.
    pub fn new(
        parameters: ModelParameters,
        assets: AssetMap,
        consumption: &[ConsumptionRecord],
        reference: ReferenceData,
    ) -> Result<Self> {
        parameters.validate()?;
        reference.check_end_use_splits();

        let bau_consumption = forecast_bau_consumption(&assets, consumption, parameters.horizon)?;
        ensure!(
            !bau_consumption.is_empty(),
            "No consumption data for any asset in the registry"
        );
        ensure!(
            bau_consumption.year_index(parameters.base_year).is_some(),
            "Base year {} is not covered by the consumption data",
            parameters.base_year
        );

        let bau_pathways = Self::compute_crrem_pathways(&bau_consumption, &assets, &reference)
            .context("Failed to calculate BAU pathways")?;
        let targets = reference
            .target_pathways(&assets, bau_consumption.years())
            .context("Failed to calculate target pathways")?;

        info!(
            "Forecast BAU consumption for {} assets ({}-{})",
            bau_consumption.iter_asset_ids().count(),
            bau_consumption.years()[0],
            parameters.horizon
        );

        Ok(Self {
            parameters,
            assets,
            reference,
            bau_consumption,
            bau_pathways,
            targets,
        })
    }

    /// The first modelled year
    pub fn first_year(&self) -> u32 {
        self.bau_consumption
            .years()
            .first()
            .copied()
            .unwrap_or(self.parameters.base_year)
    }

    /// Calculate total energy and emissions for each asset.
    ///
    /// Energy is summed across utilities. Emissions are calculated by applying the emissions
    /// factor for each utility in the asset's country, then summing.
    pub fn compute_crrem_pathways(
        consumption: &ConsumptionPathway,
        assets: &AssetMap,
        reference: &ReferenceData,
    ) -> Result<CrremPathway> {
        let years = consumption.years();
        let mut pathways = CrremPathway::new(years.to_vec())?;
        for asset_id in consumption.iter_asset_ids() {
            let asset = assets
                .get(asset_id)
                .with_context(|| format!("Unknown asset ID {asset_id}"))?;

            let mut energy = vec![0.0; years.len()];
            let mut emissions = vec![0.0; years.len()];
            for (utility, values) in consumption.asset_rows(asset_id).into_iter().flatten() {
                for (idx, (year, value)) in years.iter().zip(values).enumerate() {
                    let factor = reference.emission_factor(&asset.country, utility, *year)?;
                    energy[idx] += value;
                    emissions[idx] += (Energy(*value) * factor).value();
                }
            }

            pathways.insert_row(asset_id.clone(), PathwayCode::Emissions, emissions)?;
            pathways.insert_row(asset_id.clone(), PathwayCode::Energy, energy)?;
        }

        Ok(pathways)
    }

    /// Split BAU consumption of each utility into end uses, according to each asset's sector
    pub fn split_consumption(&self) -> Result<SplitPathway> {
        let mut split = SplitPathway::new(self.bau_consumption.years().to_vec())?;
        for (asset_id, utility, values) in self.bau_consumption.iter_rows() {
            let asset = &self.assets[asset_id];
            let splits = self.reference.end_use_splits(&asset.sector)?;

            let mut found = false;
            for ((_, end_use), fraction) in splits.iter().filter(|((u, _), _)| u == utility) {
                found = true;
                split.insert_row(
                    asset_id.clone(),
                    (utility.clone(), end_use.clone()),
                    values.iter().map(|value| value * fraction.0).collect(),
                )?;
            }
            ensure!(
                found,
                "No end-use splits for utility {utility} in sector {}",
                asset.sector
            );
        }

        Ok(split)
    }

    /// Build scenarios from tables of interventions and rollouts.
    ///
    /// One scenario is created for each distinct scenario name, in the order the names first
    /// appear (interventions table first, then rollouts table). A scenario which cannot be built
    /// is logged and recorded as failed; the others are unaffected.
    pub fn scenarios_from_tables(
        &self,
        interventions: &[InterventionSpec],
        rollouts: &[RolloutSpec],
    ) -> ScenarioSet {
        let names: IndexSet<&ScenarioName> = interventions
            .iter()
            .map(|row| &row.scenario)
            .chain(rollouts.iter().map(|row| &row.scenario))
            .collect();

        let mut set = ScenarioSet::default();
        for name in names {
            match Scenario::from_tables(name.clone(), interventions, rollouts, self) {
                Ok(scenario) => set.scenarios.push(scenario),
                Err(err) => {
                    error!("Failed to build scenario {name}: {err:?}");
                    set.failed.push(name.clone());
                }
            }
        }

        set
    }

    /// Run each scenario against its own copy of the split BAU consumption.
    ///
    /// The returned comparison contains the BAU and target pathways followed by the pathways for
    /// each scenario. A scenario which fails is logged and left out of the comparison; the others
    /// are unaffected.
    pub fn apply_interventions(&self, scenarios: &[Scenario]) -> Result<ScenarioComparison> {
        let mut names = IndexSet::new();
        for scenario in scenarios {
            ensure!(
                ![BAU_SCENARIO_NAME, TARGET_SCENARIO_NAME].contains(&&*scenario.name.0),
                "Scenario name {} is reserved",
                scenario.name
            );
            ensure!(
                names.insert(&scenario.name),
                "Duplicate scenario name {}",
                scenario.name
            );
        }

        let split = self.split_consumption()?;
        let mut comparison = ScenarioComparison::default();
        comparison
            .pathways
            .insert(BAU_SCENARIO_NAME.into(), self.bau_pathways.clone());
        comparison
            .pathways
            .insert(TARGET_SCENARIO_NAME.into(), self.targets.clone());

        for scenario in scenarios {
            match self.run_scenario(scenario, split.clone()) {
                Ok((consumption, pathways, impacts)) => {
                    let name = scenario.name.clone();
                    comparison.pathways.insert(name.clone(), pathways);
                    comparison.consumption.insert(name.clone(), consumption);
                    comparison.impacts.insert(name, impacts);
                }
                Err(err) => {
                    error!("Scenario {} failed: {err:?}", scenario.name);
                    comparison.failed.push(scenario.name.clone());
                }
            }
        }

        Ok(comparison)
    }

    /// Replay a scenario and calculate its consumption and pathways
    fn run_scenario(
        &self,
        scenario: &Scenario,
        split: SplitPathway,
    ) -> Result<(ConsumptionPathway, CrremPathway, Vec<ImpactRecord>)> {
        info!(
            "Running scenario {} ({} interventions)",
            scenario.name,
            scenario.interventions().len()
        );

        let (result, impacts) = scenario.act(split)?;
        let consumption = result.aggregate(|(utility, _)| utility.clone());
        let pathways = Self::compute_crrem_pathways(&consumption, &self.assets, &self.reference)?;

        Ok((consumption, pathways, impacts))
    }
}
