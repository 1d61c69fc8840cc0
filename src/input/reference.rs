//! Code for reading reference data from CSV files.
use super::*;
use crate::id::{CountryID, EndUseID, InterventionTypeID, SectorID, UtilityID};
use crate::pathway::{EndUseKey, PathwayCode};
use crate::reference::{
    EfficiencyCoefficients, EmissionFactorMap, EndUseSplitMap, InterventionCategory,
    InterventionCategoryMap, ReassignmentRule, ReferenceData, ReferenceOverrides,
    TargetPathwayMap, default_intervention_categories,
};
use crate::units::{Dimensionless, EmissionsPerEnergy};
use indexmap::IndexMap;
use log::warn;
use serde::Deserialize;
use std::rc::Rc;

const INTERVENTION_TYPES_FILE_NAME: &str = "intervention_types.csv";
const TARGET_PATHWAYS_FILE_NAME: &str = "target_pathways.csv";
const EMISSION_FACTORS_FILE_NAME: &str = "emission_factors.csv";
const END_USE_SPLITS_FILE_NAME: &str = "end_use_splits.csv";
const EFFICIENCY_PARAMETERS_FILE_NAME: &str = "efficiency_parameters.csv";
const REASSIGNMENT_PARAMETERS_FILE_NAME: &str = "reassignment_parameters.csv";
const CUSTOM_TARGET_PATHWAYS_FILE_NAME: &str = "custom_target_pathways.csv";
const CUSTOM_EMISSION_FACTORS_FILE_NAME: &str = "custom_emission_factors.csv";
const CUSTOM_END_USE_SPLITS_FILE_NAME: &str = "custom_end_use_splits.csv";

#[derive(PartialEq, Debug, Deserialize)]
struct InterventionTypeRaw {
    intervention_type: InterventionTypeID,
    category: InterventionCategory,
}

#[derive(PartialEq, Debug, Deserialize)]
struct TargetPathwayRaw {
    sector: SectorID,
    country: CountryID,
    pathway_code: PathwayCode,
    year: u32,
    value: f64,
}

#[derive(PartialEq, Debug, Deserialize)]
struct EmissionFactorRaw {
    country: CountryID,
    utility: UtilityID,
    year: u32,
    factor: EmissionsPerEnergy,
}

#[derive(PartialEq, Debug, Deserialize)]
struct EndUseSplitRaw {
    sector: SectorID,
    utility: UtilityID,
    end_use: EndUseID,
    #[serde(deserialize_with = "deserialise_proportion")]
    fraction: Dimensionless,
}

#[derive(PartialEq, Debug, Deserialize)]
struct EfficiencyParameterRaw {
    intervention_type: InterventionTypeID,
    utility: UtilityID,
    end_use: EndUseID,
    #[serde(deserialize_with = "deserialise_proportion")]
    reduction: Dimensionless,
}

#[derive(PartialEq, Debug, Deserialize)]
struct ReassignmentParameterRaw {
    intervention_type: InterventionTypeID,
    from_utility: UtilityID,
    from_end_use: EndUseID,
    to_utility: UtilityID,
    to_end_use: EndUseID,
    cop: Dimensionless,
}

/// Read all reference data from the model directory, applying any custom overrides.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
pub fn read_reference_data(model_dir: &Path) -> Result<ReferenceData> {
    let intervention_categories = read_intervention_categories(model_dir)?;

    let file_path = model_dir.join(TARGET_PATHWAYS_FILE_NAME);
    let target_pathways = read_target_pathways_from_iter(read_csv(&file_path)?)
        .with_context(|| input_err_msg(&file_path))?;

    let file_path = model_dir.join(EMISSION_FACTORS_FILE_NAME);
    let emission_factors = read_emission_factors_from_iter(read_csv(&file_path)?)
        .with_context(|| input_err_msg(&file_path))?;

    let file_path = model_dir.join(END_USE_SPLITS_FILE_NAME);
    let end_use_splits = read_end_use_splits_from_iter(read_csv(&file_path)?)
        .with_context(|| input_err_msg(&file_path))?;

    let file_path = model_dir.join(EFFICIENCY_PARAMETERS_FILE_NAME);
    let efficiency_parameters = read_efficiency_parameters_from_iter(
        read_csv_optional(&file_path)?,
        &intervention_categories,
    )
    .with_context(|| input_err_msg(&file_path))?;

    let file_path = model_dir.join(REASSIGNMENT_PARAMETERS_FILE_NAME);
    let reassignment_rules = read_reassignment_rules_from_iter(
        read_csv_optional(&file_path)?,
        &intervention_categories,
    )
    .with_context(|| input_err_msg(&file_path))?;

    for (intervention_type, category) in &intervention_categories {
        let configured = match category {
            InterventionCategory::Efficiency => {
                efficiency_parameters.contains_key(intervention_type)
            }
            InterventionCategory::RelativeReassignment => {
                reassignment_rules.contains_key(intervention_type)
            }
        };
        if !configured {
            warn!("No parameters for intervention type {intervention_type}: it will have no effect");
        }
    }

    let reference = ReferenceData {
        intervention_categories,
        target_pathways,
        emission_factors,
        end_use_splits,
        efficiency_parameters,
        reassignment_rules,
    };

    Ok(reference.with_overrides(read_reference_overrides(model_dir)?))
}

/// Read the intervention type table, falling back to the built-in table if the file is absent
fn read_intervention_categories(model_dir: &Path) -> Result<InterventionCategoryMap> {
    let file_path = model_dir.join(INTERVENTION_TYPES_FILE_NAME);
    if !file_path.exists() {
        return Ok(default_intervention_categories());
    }

    read_intervention_categories_from_iter(read_csv(&file_path)?)
        .with_context(|| input_err_msg(&file_path))
}

fn read_intervention_categories_from_iter<I>(iter: I) -> Result<InterventionCategoryMap>
where
    I: Iterator<Item = InterventionTypeRaw>,
{
    let mut map = InterventionCategoryMap::new();
    for raw in iter {
        let id = raw.intervention_type;
        ensure!(
            map.insert(id.clone(), raw.category).is_none(),
            "Duplicate intervention type {id}"
        );
    }

    Ok(map)
}

/// Read any custom reference tables present in the model directory
fn read_reference_overrides(model_dir: &Path) -> Result<ReferenceOverrides> {
    let file_path = model_dir.join(CUSTOM_TARGET_PATHWAYS_FILE_NAME);
    let target_pathways = read_target_pathways_from_iter(read_csv_optional(&file_path)?)
        .with_context(|| input_err_msg(&file_path))?;

    let file_path = model_dir.join(CUSTOM_EMISSION_FACTORS_FILE_NAME);
    let emission_factors = read_emission_factors_from_iter(read_csv_optional(&file_path)?)
        .with_context(|| input_err_msg(&file_path))?;

    let file_path = model_dir.join(CUSTOM_END_USE_SPLITS_FILE_NAME);
    let end_use_splits = read_custom_end_use_splits_from_iter(read_csv_optional(&file_path)?)
        .with_context(|| input_err_msg(&file_path))?;

    Ok(ReferenceOverrides {
        target_pathways: (!target_pathways.is_empty()).then_some(target_pathways),
        emission_factors: (!emission_factors.is_empty()).then_some(emission_factors),
        end_use_splits: (!end_use_splits.is_empty()).then_some(end_use_splits),
    })
}

fn read_target_pathways_from_iter<I>(iter: I) -> Result<TargetPathwayMap>
where
    I: Iterator<Item = TargetPathwayRaw>,
{
    let mut map = TargetPathwayMap::new();
    for raw in iter {
        ensure!(
            raw.value.is_finite(),
            "Invalid target pathway value ({}) for sector {} and country {}",
            raw.value,
            raw.sector,
            raw.country
        );

        let series = map
            .entry((raw.sector.clone(), raw.country.clone(), raw.pathway_code))
            .or_default();
        ensure!(
            series.insert(raw.year, raw.value).is_none(),
            "Duplicate {} target for sector {} and country {} in {}",
            raw.pathway_code,
            raw.sector,
            raw.country,
            raw.year
        );
    }

    Ok(map)
}

fn read_emission_factors_from_iter<I>(iter: I) -> Result<EmissionFactorMap>
where
    I: Iterator<Item = EmissionFactorRaw>,
{
    let mut map = EmissionFactorMap::new();
    for raw in iter {
        ensure!(
            raw.factor.is_finite() && raw.factor >= EmissionsPerEnergy(0.0),
            "Invalid emissions factor ({}) for utility {} in country {}",
            raw.factor.value(),
            raw.utility,
            raw.country
        );

        let series = map
            .entry((raw.country.clone(), raw.utility.clone()))
            .or_default();
        ensure!(
            series.insert(raw.year, raw.factor).is_none(),
            "Duplicate emissions factor for utility {} in country {} in {}",
            raw.utility,
            raw.country,
            raw.year
        );
    }

    Ok(map)
}

fn read_end_use_splits_from_iter<I>(iter: I) -> Result<EndUseSplitMap>
where
    I: Iterator<Item = EndUseSplitRaw>,
{
    let mut map = EndUseSplitMap::new();
    for raw in iter {
        let key: EndUseKey = (raw.utility, raw.end_use);
        let splits = map.entry(raw.sector.clone()).or_default();
        ensure!(
            splits.insert(key.clone(), raw.fraction).is_none(),
            "Duplicate end-use split for sector {}, utility {}, end use {}",
            raw.sector,
            key.0,
            key.1
        );
    }

    Ok(map)
}

/// Custom end-use splits are flat, as each entry replaces a single default fraction
fn read_custom_end_use_splits_from_iter<I>(
    iter: I,
) -> Result<IndexMap<(SectorID, EndUseKey), Dimensionless>>
where
    I: Iterator<Item = EndUseSplitRaw>,
{
    let mut map = IndexMap::new();
    for (sector, splits) in read_end_use_splits_from_iter(iter)? {
        for (key, fraction) in splits {
            map.insert((sector.clone(), key), fraction);
        }
    }

    Ok(map)
}

/// Check that an intervention type is known and belongs to the expected category
fn check_category(
    intervention_type: &InterventionTypeID,
    expected: InterventionCategory,
    categories: &InterventionCategoryMap,
) -> Result<()> {
    let category = categories
        .get(intervention_type)
        .with_context(|| format!("Unknown intervention type: {intervention_type}"))?;
    ensure!(
        *category == expected,
        "Intervention type {intervention_type} is not in the {expected} category"
    );

    Ok(())
}

fn read_efficiency_parameters_from_iter<I>(
    iter: I,
    categories: &InterventionCategoryMap,
) -> Result<IndexMap<InterventionTypeID, Rc<EfficiencyCoefficients>>>
where
    I: Iterator<Item = EfficiencyParameterRaw>,
{
    let mut map: IndexMap<InterventionTypeID, EfficiencyCoefficients> = IndexMap::new();
    for raw in iter {
        check_category(
            &raw.intervention_type,
            InterventionCategory::Efficiency,
            categories,
        )?;

        let coefficients = map.entry(raw.intervention_type.clone()).or_default();
        ensure!(
            coefficients
                .insert((raw.utility.clone(), raw.end_use.clone()), raw.reduction)
                .is_none(),
            "Duplicate coefficient for intervention type {}, utility {}, end use {}",
            raw.intervention_type,
            raw.utility,
            raw.end_use
        );
    }

    Ok(map
        .into_iter()
        .map(|(id, coefficients)| (id, Rc::new(coefficients)))
        .collect())
}

fn read_reassignment_rules_from_iter<I>(
    iter: I,
    categories: &InterventionCategoryMap,
) -> Result<IndexMap<InterventionTypeID, Rc<Vec<ReassignmentRule>>>>
where
    I: Iterator<Item = ReassignmentParameterRaw>,
{
    let mut map: IndexMap<InterventionTypeID, Vec<ReassignmentRule>> = IndexMap::new();
    for raw in iter {
        check_category(
            &raw.intervention_type,
            InterventionCategory::RelativeReassignment,
            categories,
        )?;
        ensure!(
            raw.cop.is_finite() && raw.cop > Dimensionless(0.0),
            "CoP for intervention type {} must be a finite, positive number",
            raw.intervention_type
        );

        map.entry(raw.intervention_type).or_default().push(ReassignmentRule {
            from: (raw.from_utility, raw.from_end_use),
            to: (raw.to_utility, raw.to_end_use),
            cop: raw.cop,
        });
    }

    Ok(map
        .into_iter()
        .map(|(id, rules)| (id, Rc::new(rules)))
        .collect())
}
