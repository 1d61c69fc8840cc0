//! Reference data used to parameterise the model.
//!
//! This is a read-only snapshot of the CRREM target pathways, emissions factors, end-use splits
//! and intervention parameters. It is constructed once (usually from CSV files, see
//! [`crate::input`]) and passed into the [`Model`](crate::model::Model).
use crate::asset::AssetMap;
use crate::id::{CountryID, InterventionTypeID, SectorID, UtilityID};
use crate::pathway::{CrremPathway, EndUseKey, PathwayCode};
use crate::units::{Dimensionless, EmissionsPerEnergy};
use anyhow::{Context, Result};
use float_cmp::approx_eq;
use indexmap::IndexMap;
use log::warn;
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::rc::Rc;

/// Values for each year
pub type YearSeries<T> = BTreeMap<u32, T>;

/// Target pathways per m² of floor area, keyed by sector, country and pathway code
pub type TargetPathwayMap = IndexMap<(SectorID, CountryID, PathwayCode), YearSeries<f64>>;

/// Emissions factors, keyed by country and utility
pub type EmissionFactorMap = IndexMap<(CountryID, UtilityID), YearSeries<EmissionsPerEnergy>>;

/// Fractions of each utility's consumption attributed to each end use, keyed by sector
pub type EndUseSplitMap = IndexMap<SectorID, IndexMap<EndUseKey, Dimensionless>>;

/// Proportional reductions in consumption for each utility and end use
pub type EfficiencyCoefficients = IndexMap<EndUseKey, Dimensionless>;

/// The intervention types known to the model, with their category
pub type InterventionCategoryMap = IndexMap<InterventionTypeID, InterventionCategory>;

/// The category of an intervention type, which determines how it affects consumption
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, SerializeLabeledStringEnum, DeserializeLabeledStringEnum,
)]
pub enum InterventionCategory {
    /// Consumption is reduced by a fixed proportion
    #[string = "Efficiency"]
    Efficiency,
    /// Consumption is moved from one utility/end use to another
    #[string = "Relative Reassignment"]
    RelativeReassignment,
}

/// The intervention types used when no table of types is provided
pub const DEFAULT_INTERVENTION_TYPES: &[(&str, InterventionCategory)] = &[
    ("Monitoring & Targeting", InterventionCategory::Efficiency),
    ("Smart Thermostats", InterventionCategory::Efficiency),
    ("BMS Set Point Optimisation", InterventionCategory::Efficiency),
    (
        "Localised Heating / Cooling Controls",
        InterventionCategory::Efficiency,
    ),
    ("LED Lighting", InterventionCategory::Efficiency),
    ("Lighting Occupancy Sensor", InterventionCategory::Efficiency),
    ("Daylighting Control", InterventionCategory::Efficiency),
    ("External Wall Insulation", InterventionCategory::Efficiency),
    ("Cavity Wall Insulation", InterventionCategory::Efficiency),
    ("Floor Insulation", InterventionCategory::Efficiency),
    ("Roof Insulation", InterventionCategory::Efficiency),
    ("Double Glazing", InterventionCategory::Efficiency),
    ("Heat Pump", InterventionCategory::RelativeReassignment),
    (
        "Heat Pump - Renewable Power",
        InterventionCategory::RelativeReassignment,
    ),
];

/// Get the default table of intervention types
pub fn default_intervention_categories() -> InterventionCategoryMap {
    DEFAULT_INTERVENTION_TYPES
        .iter()
        .map(|(name, category)| ((*name).into(), *category))
        .collect()
}

/// A rule for moving consumption from one utility/end use to another
#[derive(Debug, Clone, PartialEq)]
pub struct ReassignmentRule {
    /// The utility and end use which consumption is taken from
    pub from: EndUseKey,
    /// The utility and end use which consumption is moved to
    pub to: EndUseKey,
    /// Coefficient of performance of the new equipment
    pub cop: Dimensionless,
}

/// Custom values which take precedence over the default reference data
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ReferenceOverrides {
    /// Custom target pathways
    pub target_pathways: Option<TargetPathwayMap>,
    /// Custom emissions factors
    pub emission_factors: Option<EmissionFactorMap>,
    /// Custom end-use splits
    pub end_use_splits: Option<IndexMap<(SectorID, EndUseKey), Dimensionless>>,
}

/// Read-only reference data for the model
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceData {
    /// Known intervention types and the category of each
    pub intervention_categories: InterventionCategoryMap,
    /// CRREM target pathways per m²
    pub target_pathways: TargetPathwayMap,
    /// Emissions factors per unit energy
    pub emission_factors: EmissionFactorMap,
    /// End-use split fractions
    pub end_use_splits: EndUseSplitMap,
    /// Coefficients for efficiency interventions, keyed by intervention type
    pub efficiency_parameters: IndexMap<InterventionTypeID, Rc<EfficiencyCoefficients>>,
    /// Rules for reassignment interventions, keyed by intervention type, in table order
    pub reassignment_rules: IndexMap<InterventionTypeID, Rc<Vec<ReassignmentRule>>>,
}

impl ReferenceData {
    /// Get the category for the given intervention type
    pub fn category(&self, intervention_type: &InterventionTypeID) -> Result<InterventionCategory> {
        self.intervention_categories
            .get(intervention_type)
            .copied()
            .with_context(|| format!("Unknown intervention type: {intervention_type}"))
    }

    /// Get the efficiency coefficients for an intervention type.
    ///
    /// If none are configured, an empty set is returned (i.e. the intervention has no effect).
    pub fn efficiency_coefficients(
        &self,
        intervention_type: &InterventionTypeID,
    ) -> Rc<EfficiencyCoefficients> {
        self.efficiency_parameters
            .get(intervention_type)
            .cloned()
            .unwrap_or_default()
    }

    /// Get the reassignment rules for an intervention type, in table order.
    ///
    /// If none are configured, an empty list is returned (i.e. the intervention has no effect).
    pub fn reassignment_rules(
        &self,
        intervention_type: &InterventionTypeID,
    ) -> Rc<Vec<ReassignmentRule>> {
        self.reassignment_rules
            .get(intervention_type)
            .cloned()
            .unwrap_or_default()
    }

    /// Get the emissions factor for a utility in a country and year
    pub fn emission_factor(
        &self,
        country: &CountryID,
        utility: &UtilityID,
        year: u32,
    ) -> Result<EmissionsPerEnergy> {
        self.emission_factors
            .get(&(country.clone(), utility.clone()))
            .with_context(|| {
                format!("No emissions factors for utility {utility} in country {country}")
            })?
            .get(&year)
            .copied()
            .with_context(|| {
                format!("No emissions factor for utility {utility} in country {country} for {year}")
            })
    }

    /// Get the end-use splits for a sector
    pub fn end_use_splits(&self, sector: &SectorID) -> Result<&IndexMap<EndUseKey, Dimensionless>> {
        self.end_use_splits
            .get(sector)
            .with_context(|| format!("No end-use splits for sector {sector}"))
    }

    /// Get the target pathways for the given assets, as absolute budgets for each year.
    ///
    /// Target pathways are defined per m² of floor area, so they are multiplied by each asset's
    /// area. Assets with no target pathway for their sector and country are skipped with a
    /// warning.
    pub fn target_pathways(&self, assets: &AssetMap, years: &[u32]) -> Result<CrremPathway> {
        let mut per_area = CrremPathway::new(years.to_vec())?;
        for asset in assets.values() {
            let mut found = false;
            for code in [PathwayCode::Emissions, PathwayCode::Energy] {
                let key = (asset.sector.clone(), asset.country.clone(), code);
                let Some(series) = self.target_pathways.get(&key) else {
                    continue;
                };
                found = true;

                let values = years
                    .iter()
                    .map(|year| {
                        series.get(year).copied().with_context(|| {
                            format!(
                                "Target pathway {code} for sector {} and country {} has no \
                                value for {year}",
                                asset.sector, asset.country
                            )
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                per_area.insert_row(asset.id.clone(), code, values)?;
            }

            if !found {
                warn!(
                    "No target pathway for asset {} (sector {}, country {})",
                    asset.id, asset.sector, asset.country
                );
            }
        }

        per_area.denormalise(assets)
    }

    /// Log a warning for any sector/utility whose end-use fractions do not sum to one
    pub fn check_end_use_splits(&self) {
        for (sector, splits) in &self.end_use_splits {
            let mut totals: IndexMap<&UtilityID, f64> = IndexMap::new();
            for ((utility, _), fraction) in splits {
                *totals.entry(utility).or_default() += fraction.0;
            }

            for (utility, total) in totals {
                if !approx_eq!(f64, total, 1.0, epsilon = 1e-5) {
                    warn!(
                        "End-use splits for utility {utility} in sector {sector} sum to {total} \
                        rather than 1"
                    );
                }
            }
        }
    }

    /// Apply custom values, which replace default values wherever both are defined.
    ///
    /// Custom entries with no corresponding default entry are ignored with a warning.
    pub fn with_overrides(mut self, overrides: ReferenceOverrides) -> Self {
        if let Some(custom) = overrides.target_pathways {
            apply_overrides(&mut self.target_pathways, custom, "target pathways");
        }
        if let Some(custom) = overrides.emission_factors {
            apply_overrides(&mut self.emission_factors, custom, "emissions factors");
        }
        if let Some(custom) = overrides.end_use_splits {
            for ((sector, key), fraction) in custom {
                match self
                    .end_use_splits
                    .get_mut(&sector)
                    .and_then(|splits| splits.get_mut(&key))
                {
                    Some(value) => *value = fraction,
                    None => warn!(
                        "Ignoring custom end-use split for sector {sector}, utility {}, end use {}: \
                        no default value to override",
                        key.0, key.1
                    ),
                }
            }
        }

        self
    }
}

/// Replace values in `defaults` with those in `custom` where the keys overlap
fn apply_overrides<K, V>(defaults: &mut IndexMap<K, V>, custom: IndexMap<K, V>, table_name: &str)
where
    K: Hash + Eq + Debug,
{
    for (key, value) in custom {
        match defaults.get_mut(&key) {
            Some(default) => *default = value,
            None => warn!("Ignoring custom {table_name} entry {key:?}: no default value to override"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, assets, reference_data};
    use crate::id::EndUseID;
    use float_cmp::assert_approx_eq;
    use indexmap::indexmap;
    use rstest::rstest;

    #[rstest]
    fn test_category(reference_data: ReferenceData) {
        assert_eq!(
            reference_data.category(&"LED Lighting".into()).unwrap(),
            InterventionCategory::Efficiency
        );
        assert_eq!(
            reference_data.category(&"Heat Pump".into()).unwrap(),
            InterventionCategory::RelativeReassignment
        );
        assert_error!(
            reference_data.category(&"Solar Roof".into()),
            "Unknown intervention type: Solar Roof"
        );
    }

    #[test]
    fn test_category_label() {
        assert_eq!(
            InterventionCategory::RelativeReassignment.to_string(),
            "Relative Reassignment"
        );
    }

    #[test]
    fn test_default_intervention_categories() {
        let categories = default_intervention_categories();
        assert_eq!(categories.len(), 14);
        assert_eq!(
            categories[&InterventionTypeID::from("Heat Pump - Renewable Power")],
            InterventionCategory::RelativeReassignment
        );
    }

    #[rstest]
    fn test_missing_parameters_are_empty(reference_data: ReferenceData) {
        assert!(
            reference_data
                .efficiency_coefficients(&"Double Glazing".into())
                .is_empty()
        );
        assert!(
            reference_data
                .reassignment_rules(&"LED Lighting".into())
                .is_empty()
        );
    }

    #[rstest]
    fn test_emission_factor(reference_data: ReferenceData) {
        assert_approx_eq!(
            f64,
            reference_data
                .emission_factor(&"UK".into(), &"Elec".into(), 2020)
                .unwrap()
                .value(),
            0.2
        );
        assert_error!(
            reference_data.emission_factor(&"UK".into(), &"Oil".into(), 2020),
            "No emissions factors for utility Oil in country UK"
        );
        assert_error!(
            reference_data.emission_factor(&"UK".into(), &"Elec".into(), 1990),
            "No emissions factor for utility Elec in country UK for 1990"
        );
    }

    #[rstest]
    fn test_target_pathways(reference_data: ReferenceData, assets: AssetMap) {
        let years = [2020, 2021];
        let targets = reference_data.target_pathways(&assets, &years).unwrap();

        // A1 is an office in the UK with 100 m² of floor area
        assert_approx_eq!(
            f64,
            targets
                .get(&"A1".into(), &PathwayCode::Energy, 2021)
                .unwrap(),
            100.0 * 19.0
        );
        assert_approx_eq!(
            f64,
            targets
                .get(&"A1".into(), &PathwayCode::Emissions, 2020)
                .unwrap(),
            100.0 * 4.0
        );
        assert_eq!(targets.iter_asset_ids().count(), assets.len());
    }

    #[rstest]
    fn test_target_pathways_missing_year(reference_data: ReferenceData, assets: AssetMap) {
        assert!(reference_data.target_pathways(&assets, &[2019]).is_err());
    }

    #[rstest]
    fn test_with_overrides(reference_data: ReferenceData) {
        let overrides = ReferenceOverrides {
            emission_factors: Some(indexmap! {
                ("UK".into(), "Elec".into()) => YearSeries::from([(2020, EmissionsPerEnergy(0.1))]),
                // No default to override
                ("DE".into(), "Elec".into()) => YearSeries::from([(2020, EmissionsPerEnergy(0.3))]),
            }),
            end_use_splits: Some(indexmap! {
                ("OFF".into(), ("Elec".into(), "Lighting".into())) => Dimensionless(0.3),
            }),
            ..Default::default()
        };
        let reference = reference_data.clone().with_overrides(overrides);

        assert_eq!(
            reference
                .emission_factor(&"UK".into(), &"Elec".into(), 2020)
                .unwrap(),
            EmissionsPerEnergy(0.1)
        );
        assert!(
            reference
                .emission_factor(&"DE".into(), &"Elec".into(), 2020)
                .is_err()
        );
        assert_eq!(
            reference.end_use_splits(&"OFF".into()).unwrap()
                [&(UtilityID::from("Elec"), EndUseID::from("Lighting"))],
            Dimensionless(0.3)
        );

        // Unrelated values are untouched
        assert_eq!(reference.target_pathways, reference_data.target_pathways);
        assert_eq!(
            reference.emission_factor(&"UK".into(), &"Gas".into(), 2020).unwrap(),
            reference_data
                .emission_factor(&"UK".into(), &"Gas".into(), 2020)
                .unwrap()
        );
    }
}
