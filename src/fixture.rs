//! Fixtures for tests

use crate::asset::{Asset, AssetMap};
use crate::id::{AssetID, CountryID, SectorID};
use crate::model::{ConsumptionRecord, Model, ModelParameters};
use crate::pathway::{EndUseKey, PathwayCode};
use crate::reference::{
    EfficiencyCoefficients, EmissionFactorMap, EndUseSplitMap, ReassignmentRule, ReferenceData,
    TargetPathwayMap, YearSeries, default_intervention_categories,
};
use crate::units::{Area, Dimensionless, EmissionsPerEnergy, Energy};
use indexmap::indexmap;
use itertools::iproduct;
use rstest::fixture;
use std::ops::RangeInclusive;
use std::rc::Rc;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

fn asset(id: &str, name: &str, sector: &str, country: &str, area: f64) -> (AssetID, Rc<Asset>) {
    let asset = Asset::new(
        id.into(),
        name.to_string(),
        sector.into(),
        country.into(),
        Area(area),
    )
    .unwrap();
    (asset.id.clone(), Rc::new(asset))
}

fn consumption(asset_id: &str, utility: &str, year: u32, value: f64) -> ConsumptionRecord {
    ConsumptionRecord {
        asset_id: asset_id.into(),
        utility: utility.into(),
        year,
        consumption: Energy(value),
    }
}

#[fixture]
pub fn assets() -> AssetMap {
    [
        asset("A1", "Alpha House", "OFF", "UK", 100.0),
        asset("A2", "Bravo Court", "OFF", "UK", 200.0),
        asset("A3", "Charlie Arcade", "RET", "UK", 150.0),
        asset("A4", "Delta Tower", "OFF", "FR", 120.0),
    ]
    .into_iter()
    .collect()
}

fn key(utility: &str, end_use: &str) -> EndUseKey {
    (utility.into(), end_use.into())
}

/// Reference data with emissions factors and target pathways defined for the given years
fn reference_data_for_years(years: RangeInclusive<u32>) -> ReferenceData {
    let factors = [
        ("UK", "Elec", 0.2),
        ("UK", "Gas", 0.18),
        ("FR", "Elec", 0.05),
        ("FR", "Gas", 0.18),
    ];
    let emission_factors: EmissionFactorMap = factors
        .into_iter()
        .map(|(country, utility, factor)| {
            let series: YearSeries<_> = years
                .clone()
                .map(|year| (year, EmissionsPerEnergy(factor)))
                .collect();
            ((country.into(), utility.into()), series)
        })
        .collect();

    let target_pathways: TargetPathwayMap = iproduct!(
        [("OFF", "UK"), ("RET", "UK"), ("OFF", "FR")],
        [PathwayCode::Emissions, PathwayCode::Energy]
    )
    .map(|((sector, country), code)| {
        let series: YearSeries<_> = years
            .clone()
            .map(|year| {
                let offset = f64::from(year - 2020);
                let value = match code {
                    PathwayCode::Emissions => 4.0 - 0.5 * offset,
                    PathwayCode::Energy => 20.0 - offset,
                };
                (year, value)
            })
            .collect();
        ((SectorID::from(sector), CountryID::from(country), code), series)
    })
    .collect();

    let end_use_splits: EndUseSplitMap = indexmap! {
        "OFF".into() => indexmap! {
            key("Elec", "Lighting") => Dimensionless(0.4),
            key("Elec", "Heating") => Dimensionless(0.1),
            key("Elec", "Other") => Dimensionless(0.5),
            key("Gas", "Heating") => Dimensionless(1.0),
        },
        "RET".into() => indexmap! {
            key("Elec", "Lighting") => Dimensionless(0.6),
            key("Elec", "Other") => Dimensionless(0.4),
            key("Gas", "Heating") => Dimensionless(0.8),
            key("Gas", "Hot Water") => Dimensionless(0.2),
        },
    };

    let led: EfficiencyCoefficients = indexmap! { key("Elec", "Lighting") => Dimensionless(0.5) };
    let roof: EfficiencyCoefficients = indexmap! { key("Gas", "Heating") => Dimensionless(0.25) };
    let heat_pump = vec![ReassignmentRule {
        from: key("Gas", "Heating"),
        to: key("Elec", "Heating"),
        cop: Dimensionless(3.0),
    }];

    ReferenceData {
        intervention_categories: default_intervention_categories(),
        target_pathways,
        emission_factors,
        end_use_splits,
        efficiency_parameters: indexmap! {
            "LED Lighting".into() => Rc::new(led),
            "Roof Insulation".into() => Rc::new(roof),
        },
        reassignment_rules: indexmap! { "Heat Pump".into() => Rc::new(heat_pump) },
    }
}

#[fixture]
pub fn reference_data() -> ReferenceData {
    reference_data_for_years(2020..=2025)
}

#[fixture]
pub fn model_parameters() -> ModelParameters {
    ModelParameters {
        base_year: 2020,
        horizon: 2025,
    }
}

#[fixture]
pub fn consumption_records() -> Vec<ConsumptionRecord> {
    vec![
        consumption("A1", "Elec", 2020, 1000.0),
        consumption("A1", "Gas", 2020, 900.0),
        consumption("A2", "Elec", 2020, 3000.0),
        consumption("A2", "Gas", 2020, 1500.0),
        consumption("A3", "Elec", 2020, 2000.0),
        consumption("A3", "Gas", 2020, 500.0),
        consumption("A4", "Elec", 2020, 500.0),
        consumption("A4", "Gas", 2020, 2100.0),
    ]
}

#[fixture]
pub fn model(
    model_parameters: ModelParameters,
    assets: AssetMap,
    consumption_records: Vec<ConsumptionRecord>,
    reference_data: ReferenceData,
) -> Model {
    Model::new(
        model_parameters,
        assets,
        &consumption_records,
        reference_data,
    )
    .unwrap()
}

/// A portfolio of ten UK offices, where asset `a<n>` uses `100 * n` kWh of electricity per year
#[fixture]
pub fn ranked_model() -> Model {
    let ids: Vec<String> = (1..=10).map(|i| format!("a{i}")).collect();

    // Register assets in a scrambled order so that ranking isn't just registry order
    let assets: AssetMap = [3, 9, 1, 10, 6, 2, 8, 5, 7, 4]
        .into_iter()
        .map(|i| asset(&ids[i - 1], "Office", "OFF", "UK", 100.0))
        .collect();
    let records: Vec<_> = ids
        .iter()
        .zip(1..=10_u32)
        .map(|(id, i)| consumption(id, "Elec", 2020, 100.0 * f64::from(i)))
        .collect();
    let parameters = ModelParameters {
        base_year: 2020,
        horizon: 2030,
    };

    Model::new(
        parameters,
        assets,
        &records,
        reference_data_for_years(2020..=2030),
    )
    .unwrap()
}
