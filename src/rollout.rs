//! Rollouts describe an intervention applied across part of the portfolio at a fixed rate.
use crate::asset::{Scope, iter_assets_in_scope};
use crate::id::{AssetID, CountryID, InterventionTypeID, SectorID};
use crate::intervention::Intervention;
use crate::model::Model;
use crate::pathway::PathwayCode;
use anyhow::{Result, ensure};
use log::{debug, warn};

/// An intervention type installed on every eligible asset, a fixed number of assets per year
#[derive(Debug, Clone, PartialEq)]
pub struct Rollout {
    /// The type of intervention to install
    pub intervention_type: InterventionTypeID,
    /// The year in which installations begin
    pub start_year: u32,
    /// The number of installations per year
    pub rate: u32,
    /// The countries in which the rollout takes place
    pub country_scope: Scope<CountryID>,
    /// The sectors in which the rollout takes place
    pub sector_scope: Scope<SectorID>,
    /// Eligible assets, sorted in ascending order of BAU energy consumption in the base year
    targets: Vec<AssetID>,
}

impl Rollout {
    /// Create a new [`Rollout`], ranking the eligible assets in the model.
    ///
    /// Assets are eligible if they lie within the country and sector scopes and have BAU
    /// consumption in the model's base year.
    pub fn new(
        intervention_type: InterventionTypeID,
        start_year: u32,
        rate: u32,
        country_scope: Scope<CountryID>,
        sector_scope: Scope<SectorID>,
        model: &Model,
    ) -> Result<Self> {
        ensure!(
            rate > 0,
            "Installations per year for {intervention_type} rollout must be greater than zero"
        );
        model.reference.category(&intervention_type)?;

        let base_year = model.parameters.base_year;
        let mut ranked: Vec<(f64, &AssetID)> =
            iter_assets_in_scope(&model.assets, &country_scope, &sector_scope)
                .filter_map(|asset| {
                    let intensity =
                        model
                            .bau_pathways
                            .get(&asset.id, &PathwayCode::Energy, base_year);
                    if intensity.is_none() {
                        debug!("Asset {} has no BAU pathway; excluding from rollout", asset.id);
                    }
                    Some((intensity?, &asset.id))
                })
                .collect();

        // NB: this is a stable sort, so ties keep the order of the asset registry
        ranked.sort_by(|(a, _), (b, _)| a.total_cmp(b));
        let targets: Vec<AssetID> = ranked.into_iter().map(|(_, id)| id.clone()).collect();

        if targets.is_empty() {
            warn!(
                "No assets in scope for {intervention_type} rollout (country: {country_scope}, \
                sector: {sector_scope})"
            );
        }

        Ok(Self {
            intervention_type,
            start_year,
            rate,
            country_scope,
            sector_scope,
            targets,
        })
    }

    /// Eligible assets, in ascending order of base-year energy consumption
    pub fn targets(&self) -> &[AssetID] {
        &self.targets
    }

    /// Expand the rollout into individual interventions.
    ///
    /// Assets are taken from the end of the target list (i.e. the highest-consuming assets
    /// first), `rate` per year, starting in the start year and continuing until every target has
    /// been assigned.
    pub fn unpack(&self, model: &Model) -> Result<Vec<Intervention>> {
        let batch_size = self.rate as usize;
        let mut interventions = Vec::with_capacity(self.targets.len());
        for (year, batch) in (self.start_year..).zip(self.targets.rchunks(batch_size)) {
            for target in batch.iter().rev() {
                interventions.push(Intervention::new(
                    target,
                    year,
                    self.intervention_type.clone(),
                    model,
                )?);
            }
        }

        Ok(interventions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, model, ranked_model};
    use rstest::rstest;

    fn unpacked(interventions: &[Intervention]) -> Vec<(String, u32)> {
        interventions
            .iter()
            .map(|intervention| (intervention.asset.id.to_string(), intervention.year))
            .collect()
    }

    #[rstest]
    fn test_targets_sorted_by_consumption(model: Model) {
        let rollout = Rollout::new(
            "LED Lighting".into(),
            2021,
            2,
            Scope::All,
            Scope::All,
            &model,
        )
        .unwrap();
        let targets: Vec<_> = rollout.targets().iter().map(ToString::to_string).collect();
        assert_eq!(targets, ["A1", "A3", "A4", "A2"]);
    }

    #[rstest]
    #[case(Scope::Only("UK".into()), Scope::All, &["A1", "A3", "A2"])]
    #[case(Scope::Only("UK".into()), Scope::Only("OFF".into()), &["A1", "A2"])]
    #[case(Scope::All, Scope::Only("RET".into()), &["A3"])]
    #[case(Scope::Only("DE".into()), Scope::All, &[])]
    fn test_targets_in_scope(
        model: Model,
        #[case] country_scope: Scope<CountryID>,
        #[case] sector_scope: Scope<SectorID>,
        #[case] expected: &[&str],
    ) {
        let rollout = Rollout::new(
            "LED Lighting".into(),
            2021,
            1,
            country_scope,
            sector_scope,
            &model,
        )
        .unwrap();
        let targets: Vec<_> = rollout.targets().iter().map(ToString::to_string).collect();
        assert_eq!(targets, expected);
    }

    #[rstest]
    fn test_unpack_worst_first(ranked_model: Model) {
        let rollout = Rollout::new(
            "LED Lighting".into(),
            2025,
            4,
            Scope::All,
            Scope::All,
            &ranked_model,
        )
        .unwrap();
        let interventions = rollout.unpack(&ranked_model).unwrap();

        let expected: Vec<(String, u32)> = [
            ("a10", 2025),
            ("a9", 2025),
            ("a8", 2025),
            ("a7", 2025),
            ("a6", 2026),
            ("a5", 2026),
            ("a4", 2026),
            ("a3", 2026),
            ("a2", 2027),
            ("a1", 2027),
        ]
        .into_iter()
        .map(|(id, year)| (id.to_string(), year))
        .collect();
        assert_eq!(unpacked(&interventions), expected);

        // Unpacking does not consume the targets
        assert_eq!(rollout.targets().len(), 10);
        assert_eq!(unpacked(&rollout.unpack(&ranked_model).unwrap()), expected);
    }

    #[rstest]
    fn test_unpack_empty_scope(model: Model) {
        let rollout = Rollout::new(
            "LED Lighting".into(),
            2021,
            3,
            Scope::Only("DE".into()),
            Scope::All,
            &model,
        )
        .unwrap();
        assert!(rollout.unpack(&model).unwrap().is_empty());
    }

    #[rstest]
    fn test_unpack_beyond_horizon(model: Model) {
        // One asset per year from 2024 runs past the 2025 horizon
        let rollout =
            Rollout::new("LED Lighting".into(), 2024, 1, Scope::All, Scope::All, &model).unwrap();
        assert!(rollout.unpack(&model).is_err());
    }

    #[rstest]
    fn test_new_zero_rate(model: Model) {
        assert_error!(
            Rollout::new("Heat Pump".into(), 2021, 0, Scope::All, Scope::All, &model),
            "Installations per year for Heat Pump rollout must be greater than zero"
        );
    }

    #[rstest]
    fn test_new_unknown_type(model: Model) {
        assert_error!(
            Rollout::new("Solar Roof".into(), 2021, 1, Scope::All, Scope::All, &model),
            "Unknown intervention type: Solar Roof"
        );
    }
}
