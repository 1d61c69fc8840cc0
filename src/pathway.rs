//! Pathways are year-indexed matrices of energy or emissions quantities for a set of assets.
//!
//! Each row of a [`Pathway`] is identified by an asset ID and a sub-key (e.g. a utility, a
//! utility/end-use pair or a CRREM pathway code) and holds one value per year of the pathway.
//! All rows share the same, sorted year domain.
use crate::asset::AssetMap;
use crate::id::{AssetID, EndUseID, UtilityID};
use anyhow::{Context, Result, bail, ensure};
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};
use std::collections::{BTreeMap, BTreeSet};

/// A pathway of annual consumption for each asset and utility
pub type ConsumptionPathway = Pathway<UtilityID>;

/// Identifies a utility stream broken down by end use (e.g. gas used for heating)
pub type EndUseKey = (UtilityID, EndUseID);

/// A pathway of annual consumption for each asset, utility and end use
pub type SplitPathway = Pathway<EndUseKey>;

/// A pathway of total energy and emissions for each asset
pub type CrremPathway = Pathway<PathwayCode>;

/// The rows for a single asset
pub type AssetRows<S> = BTreeMap<S, Vec<f64>>;

/// The kind of quantity held in a row of a [`CrremPathway`]
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    SerializeLabeledStringEnum,
    DeserializeLabeledStringEnum,
)]
pub enum PathwayCode {
    /// Greenhouse gas emissions
    #[string = "GHG-Int"]
    Emissions,
    /// Energy consumption
    #[string = "kWh-Int"]
    Energy,
}

/// A year-indexed matrix of quantities, with rows keyed by asset and sub-key `S`
#[derive(Debug, Clone, PartialEq)]
pub struct Pathway<S> {
    years: Vec<u32>,
    rows: BTreeMap<AssetID, AssetRows<S>>,
}

impl<S: Ord + Clone> Pathway<S> {
    /// Create an empty pathway covering the given years.
    ///
    /// The years must be sorted and unique.
    pub fn new(years: Vec<u32>) -> Result<Self> {
        ensure!(
            years.is_sorted() && years.iter().collect::<BTreeSet<_>>().len() == years.len(),
            "Pathway years must be in order and unique"
        );

        Ok(Self {
            years,
            rows: BTreeMap::new(),
        })
    }

    /// Pivot record-form data into a pathway.
    ///
    /// The year domain is the set of all years appearing in the records. Cells with no
    /// corresponding record are zero.
    ///
    /// # Arguments
    ///
    /// * `records` - Iterator of (asset ID, sub-key, year, value) tuples
    pub fn from_records<I>(records: I) -> Result<Self>
    where
        I: IntoIterator<Item = (AssetID, S, u32, f64)>,
    {
        let mut cells = BTreeMap::new();
        for (asset_id, key, year, value) in records {
            if cells
                .insert((asset_id.clone(), key, year), value)
                .is_some()
            {
                bail!("Duplicate entry for asset {asset_id} in year {year}");
            }
        }

        let years: Vec<u32> = cells
            .keys()
            .map(|(_, _, year)| *year)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let mut pathway = Self::new(years)?;
        let num_years = pathway.years.len();
        for ((asset_id, key, year), value) in cells {
            let idx = pathway
                .year_index(year)
                .with_context(|| format!("Year {year} missing from pathway"))?;
            pathway
                .rows
                .entry(asset_id)
                .or_default()
                .entry(key)
                .or_insert_with(|| vec![0.0; num_years])[idx] = value;
        }

        Ok(pathway)
    }

    /// The years covered by this pathway, in ascending order
    pub fn years(&self) -> &[u32] {
        &self.years
    }

    /// Get the column index of the given year, if it is covered by this pathway
    pub fn year_index(&self, year: u32) -> Option<usize> {
        self.years.binary_search(&year).ok()
    }

    /// Whether the pathway has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterate over the IDs of assets with rows in this pathway
    pub fn iter_asset_ids(&self) -> impl Iterator<Item = &AssetID> {
        self.rows.keys()
    }

    /// Get all the rows for the given asset
    pub fn asset_rows(&self, asset_id: &AssetID) -> Option<&AssetRows<S>> {
        self.rows.get(asset_id)
    }

    /// Get all the rows for the given asset, mutably
    pub(crate) fn asset_rows_mut(&mut self, asset_id: &AssetID) -> Option<&mut AssetRows<S>> {
        self.rows.get_mut(asset_id)
    }

    /// Get the value in a single cell
    pub fn get(&self, asset_id: &AssetID, key: &S, year: u32) -> Option<f64> {
        let idx = self.year_index(year)?;
        Some(self.rows.get(asset_id)?.get(key)?[idx])
    }

    /// Insert a row, replacing any existing row with the same keys
    pub fn insert_row(&mut self, asset_id: AssetID, key: S, values: Vec<f64>) -> Result<()> {
        ensure!(
            values.len() == self.years.len(),
            "Row for asset {asset_id} has {} values but pathway covers {} years",
            values.len(),
            self.years.len()
        );
        self.rows.entry(asset_id).or_default().insert(key, values);

        Ok(())
    }

    /// Iterate over rows in index order
    pub fn iter_rows(&self) -> impl Iterator<Item = (&AssetID, &S, &[f64])> {
        self.rows.iter().flat_map(|(asset_id, rows)| {
            rows.iter()
                .map(move |(key, values)| (asset_id, key, values.as_slice()))
        })
    }

    /// Iterate over every cell in record form, i.e. (asset ID, sub-key, year, value)
    pub fn iter_records(&self) -> impl Iterator<Item = (&AssetID, &S, u32, f64)> {
        self.iter_rows().flat_map(|(asset_id, key, values)| {
            self.years
                .iter()
                .zip(values)
                .map(move |(year, value)| (asset_id, key, *year, *value))
        })
    }

    /// Extend the pathway out to `horizon`, holding values constant from the last known year.
    ///
    /// Any years missing between the first year and the horizon are also filled in from the
    /// preceding year, so that the resulting year domain is contiguous. If the horizon is before
    /// the last year, no years are added.
    ///
    /// A row with no value for a year which other rows have already holds zero for that year (see
    /// [`Pathway::from_records`]), and that zero is what gets carried forward.
    pub fn fill_to_horizon(self, horizon: u32) -> Self {
        let (Some(&first), Some(&last)) = (self.years.first(), self.years.last()) else {
            return self;
        };
        let years: Vec<u32> = (first..=last.max(horizon)).collect();

        let fill_row = |values: &[f64]| {
            let mut filled = Vec::with_capacity(years.len());
            let mut prev = 0.0;
            for year in &years {
                if let Some(idx) = self.year_index(*year) {
                    prev = values[idx];
                }
                filled.push(prev);
            }
            filled
        };

        let rows = self
            .rows
            .iter()
            .map(|(asset_id, rows)| {
                let rows = rows
                    .iter()
                    .map(|(key, values)| (key.clone(), fill_row(values)))
                    .collect();
                (asset_id.clone(), rows)
            })
            .collect();

        Self { years, rows }
    }

    /// Sum rows into groups given by mapping each sub-key to a new sub-key
    pub fn aggregate<T, F>(&self, f: F) -> Pathway<T>
    where
        T: Ord + Clone,
        F: Fn(&S) -> T,
    {
        let mut rows: BTreeMap<AssetID, AssetRows<T>> = BTreeMap::new();
        for (asset_id, key, values) in self.iter_rows() {
            let row = rows
                .entry(asset_id.clone())
                .or_default()
                .entry(f(key))
                .or_insert_with(|| vec![0.0; values.len()]);
            for (total, value) in row.iter_mut().zip(values) {
                *total += value;
            }
        }

        Pathway {
            years: self.years.clone(),
            rows,
        }
    }

    /// Divide each asset's rows by its floor area, converting absolute quantities to intensities
    pub fn normalise(&self, assets: &AssetMap) -> Result<Self> {
        self.scale_by_area(assets, |value, area| value / area)
    }

    /// Multiply each asset's rows by its floor area, converting intensities to absolute quantities
    pub fn denormalise(&self, assets: &AssetMap) -> Result<Self> {
        self.scale_by_area(assets, |value, area| value * area)
    }

    fn scale_by_area<F>(&self, assets: &AssetMap, f: F) -> Result<Self>
    where
        F: Fn(f64, f64) -> f64,
    {
        let mut out = self.clone();
        for (asset_id, rows) in &mut out.rows {
            let area = assets
                .get(asset_id)
                .with_context(|| format!("Unknown asset ID {asset_id}"))?
                .area
                .value();
            for value in rows.values_mut().flatten() {
                *value = f(*value, area);
            }
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, assets};
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    fn consumption() -> ConsumptionPathway {
        Pathway::from_records([
            ("A1".into(), "Elec".into(), 2019, 100.0),
            ("A1".into(), "Elec".into(), 2020, 110.0),
            ("A1".into(), "Gas".into(), 2019, 50.0),
            ("A2".into(), "Elec".into(), 2020, 30.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_from_records() {
        let pathway = consumption();
        assert_eq!(pathway.years(), [2019, 2020]);
        assert_eq!(pathway.get(&"A1".into(), &"Elec".into(), 2020), Some(110.0));

        // Missing cells are zero
        assert_eq!(pathway.get(&"A1".into(), &"Gas".into(), 2020), Some(0.0));
        assert_eq!(pathway.get(&"A2".into(), &"Elec".into(), 2019), Some(0.0));

        // Missing rows and years are absent
        assert_eq!(pathway.get(&"A2".into(), &"Gas".into(), 2020), None);
        assert_eq!(pathway.get(&"A1".into(), &"Elec".into(), 2021), None);
    }

    #[test]
    fn test_from_records_duplicate() {
        assert_error!(
            ConsumptionPathway::from_records([
                ("A1".into(), "Elec".into(), 2019, 100.0),
                ("A1".into(), "Elec".into(), 2019, 120.0),
            ]),
            "Duplicate entry for asset A1 in year 2019"
        );
    }

    #[rstest]
    #[case(vec![2020, 2021], true)]
    #[case(vec![], true)]
    #[case(vec![2021, 2020], false)]
    #[case(vec![2020, 2020], false)]
    fn test_new(#[case] years: Vec<u32>, #[case] valid: bool) {
        assert_eq!(ConsumptionPathway::new(years).is_ok(), valid);
    }

    #[test]
    fn test_fill_to_horizon() {
        let pathway = consumption().fill_to_horizon(2023);
        assert_eq!(pathway.years(), [2019, 2020, 2021, 2022, 2023]);
        for year in 2020..=2023 {
            assert_eq!(pathway.get(&"A1".into(), &"Elec".into(), year), Some(110.0));
            assert_eq!(pathway.get(&"A2".into(), &"Elec".into(), year), Some(30.0));
        }
        assert_eq!(pathway.get(&"A1".into(), &"Elec".into(), 2019), Some(100.0));

        // Filling to the same horizon again changes nothing
        assert_eq!(pathway.clone().fill_to_horizon(2023), pathway);
    }

    #[test]
    fn test_fill_to_horizon_fills_gaps() {
        let pathway = ConsumptionPathway::from_records([
            ("A1".into(), "Elec".into(), 2018, 10.0),
            ("A1".into(), "Elec".into(), 2020, 20.0),
        ])
        .unwrap()
        .fill_to_horizon(2021);
        assert_eq!(pathway.years(), [2018, 2019, 2020, 2021]);
        assert_eq!(
            pathway.asset_rows(&"A1".into()).unwrap()[&UtilityID::from("Elec")],
            [10.0, 10.0, 20.0, 20.0]
        );
    }

    #[test]
    fn test_fill_to_horizon_carries_missing_cell_as_zero() {
        let pathway = ConsumptionPathway::from_records([
            ("A1".into(), "Elec".into(), 2019, 10.0),
            ("A1".into(), "Elec".into(), 2020, 20.0),
            ("A1".into(), "Gas".into(), 2019, 5.0),
        ])
        .unwrap()
        .fill_to_horizon(2021);
        let rows = pathway.asset_rows(&"A1".into()).unwrap();
        assert_eq!(rows[&UtilityID::from("Elec")], [10.0, 20.0, 20.0]);
        assert_eq!(rows[&UtilityID::from("Gas")], [5.0, 0.0, 0.0]);
    }

    #[test]
    fn test_fill_to_horizon_before_last_year() {
        let pathway = consumption();
        assert_eq!(pathway.clone().fill_to_horizon(2010), pathway);
    }

    #[test]
    fn test_insert_row_wrong_length() {
        let mut pathway = consumption();
        assert!(pathway.insert_row("A3".into(), "Elec".into(), vec![1.0]).is_err());
        pathway
            .insert_row("A3".into(), "Elec".into(), vec![1.0, 2.0])
            .unwrap();
        assert!(pathway.asset_rows(&"A3".into()).is_some());
    }

    #[test]
    fn test_aggregate() {
        let split = SplitPathway::from_records([
            ("A1".into(), ("Elec".into(), "Heating".into()), 2020, 10.0),
            ("A1".into(), ("Elec".into(), "Lighting".into()), 2020, 5.0),
            ("A1".into(), ("Gas".into(), "Heating".into()), 2020, 7.0),
        ])
        .unwrap();
        let by_utility = split.aggregate(|(utility, _)| utility.clone());
        assert_eq!(by_utility.get(&"A1".into(), &"Elec".into(), 2020), Some(15.0));
        assert_eq!(by_utility.get(&"A1".into(), &"Gas".into(), 2020), Some(7.0));

        let totals = split.aggregate(|_| ());
        assert_eq!(totals.get(&"A1".into(), &(), 2020), Some(22.0));
    }

    #[rstest]
    fn test_normalise_denormalise(assets: AssetMap) {
        let pathway = consumption();
        let normalised = pathway.normalise(&assets).unwrap();
        let area = assets[&AssetID::from("A1")].area.value();
        assert_approx_eq!(
            f64,
            normalised.get(&"A1".into(), &"Elec".into(), 2019).unwrap(),
            100.0 / area
        );

        let restored = normalised.denormalise(&assets).unwrap();
        for ((_, _, _, a), (_, _, _, b)) in restored.iter_records().zip(pathway.iter_records()) {
            assert_approx_eq!(f64, a, b, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_pathway_code_order() {
        // Sorted the same way as the labels
        assert!(PathwayCode::Emissions < PathwayCode::Energy);
        assert_eq!(PathwayCode::Energy.to_string(), "kWh-Int");
    }
}
