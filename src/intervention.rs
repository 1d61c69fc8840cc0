//! Interventions are scheduled actions which modify the consumption of a single asset.
use crate::asset::Asset;
use crate::id::{AssetID, InterventionTypeID, UtilityID};
use crate::model::Model;
use crate::pathway::{AssetRows, EndUseKey, SplitPathway};
use crate::units::Money;
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::rc::Rc;

pub mod effect;
use effect::{AssetSlice, Effect};

/// The change in an asset's consumption caused by a single intervention
#[derive(Debug, Clone, PartialEq)]
pub struct ImpactRecord {
    /// The asset which was intervened upon
    pub target: AssetID,
    /// The year the intervention took effect
    pub year: u32,
    /// The type of intervention
    pub intervention_type: InterventionTypeID,
    /// The cost of the intervention (always zero; costs are not modelled)
    pub cost: Money,
    /// Net change in consumption for each utility in the intervention year
    pub changes: BTreeMap<UtilityID, f64>,
}

/// A single intervention on an asset, taking effect from a given year
#[derive(Debug, Clone, PartialEq)]
pub struct Intervention {
    /// The asset targeted by this intervention
    pub asset: Rc<Asset>,
    /// The year from which the intervention takes effect
    pub year: u32,
    /// The type of intervention
    pub intervention_type: InterventionTypeID,
    /// BAU consumption of the asset in the intervention year, by utility
    pub bau_consumption: BTreeMap<UtilityID, f64>,
    effect: Effect,
}

impl Intervention {
    /// Create a new [`Intervention`] against the given model.
    ///
    /// Fails if the intervention type is unknown, the target asset is not in the model or has no
    /// consumption data, or the year is outside the modelled years.
    pub fn new(
        target: &AssetID,
        year: u32,
        intervention_type: InterventionTypeID,
        model: &Model,
    ) -> Result<Self> {
        let effect = Effect::for_type(&intervention_type, &model.reference)?;
        let asset = model
            .assets
            .get(target)
            .with_context(|| format!("Unknown asset ID {target}"))?;
        let bau = &model.bau_consumption;
        let rows = bau
            .asset_rows(target)
            .with_context(|| format!("Asset {target} has no consumption data"))?;
        let idx = bau.year_index(year).with_context(|| {
            format!(
                "Intervention year {year} for asset {target} is outside the modelled years \
                ({}-{})",
                model.first_year(),
                model.parameters.horizon
            )
        })?;

        Ok(Self {
            asset: Rc::clone(asset),
            year,
            intervention_type,
            bau_consumption: rows
                .iter()
                .map(|(utility, values)| (utility.clone(), values[idx]))
                .collect(),
            effect,
        })
    }

    /// Apply the intervention to a pathway.
    ///
    /// The target asset's consumption is replaced with the result of the intervention's effect
    /// for every year from the intervention year onwards. The returned [`ImpactRecord`] only
    /// captures the change in the intervention year itself.
    pub fn act(&self, mut pathway: SplitPathway) -> Result<(SplitPathway, ImpactRecord)> {
        let target = &self.asset.id;
        let num_years = pathway.years().len();
        let start = pathway
            .year_index(self.year)
            .with_context(|| format!("Year {} is not covered by the pathway", self.year))?;
        let rows = pathway
            .asset_rows_mut(target)
            .with_context(|| format!("No consumption for asset {target} in pathway"))?;

        let before = utility_totals(rows, start);
        let slice: AssetSlice = rows
            .iter()
            .map(|(key, values)| (key.clone(), values[start..].to_vec()))
            .collect();
        for (key, values) in self.effect.apply(slice) {
            rows.entry(key)
                .or_insert_with(|| vec![0.0; num_years])[start..]
                .copy_from_slice(&values);
        }
        let after = utility_totals(rows, start);

        let mut changes: BTreeMap<UtilityID, f64> =
            before.keys().map(|utility| (utility.clone(), 0.0)).collect();
        for (utility, value) in after {
            *changes.entry(utility).or_default() += value;
        }
        for (utility, value) in before {
            *changes.entry(utility).or_default() -= value;
        }

        let impact = ImpactRecord {
            target: target.clone(),
            year: self.year,
            intervention_type: self.intervention_type.clone(),
            cost: Money(0.0),
            changes,
        };

        Ok((pathway, impact))
    }
}

/// Total consumption for each utility in the column `idx`
fn utility_totals(rows: &AssetRows<EndUseKey>, idx: usize) -> BTreeMap<UtilityID, f64> {
    let mut totals = BTreeMap::new();
    for ((utility, _), values) in rows {
        *totals.entry(utility.clone()).or_default() += values[idx];
    }

    totals
}
