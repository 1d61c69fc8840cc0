//! Assets are the individual buildings which make up a real-estate portfolio.
use crate::id::{AssetID, CountryID, SectorID};
use crate::units::Area;
use anyhow::{Result, ensure};
use indexmap::IndexMap;
use std::fmt;
use std::rc::Rc;

/// A map of [`Asset`]s, keyed by asset ID, in the order they were read
pub type AssetMap = IndexMap<AssetID, Rc<Asset>>;

/// A single building in the portfolio
#[derive(Debug, Clone, PartialEq)]
pub struct Asset {
    /// Unique identifier for the asset (e.g. "UK-0001")
    pub id: AssetID,
    /// Human-readable name
    pub name: String,
    /// CRREM sector code (e.g. "OFF" for offices)
    pub sector: SectorID,
    /// Country code (e.g. "UK")
    pub country: CountryID,
    /// Gross floor area
    pub area: Area,
}

impl Asset {
    /// Create a new [`Asset`], checking that the floor area is valid
    pub fn new(
        id: AssetID,
        name: String,
        sector: SectorID,
        country: CountryID,
        area: Area,
    ) -> Result<Self> {
        ensure!(
            area.is_finite() && area > Area(0.0),
            "Floor area for asset {id} must be a finite, positive number"
        );

        Ok(Self {
            id,
            name,
            sector,
            country,
            area,
        })
    }
}

/// A filter on one attribute of an asset, which either matches everything or a single value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope<T> {
    /// No restriction
    All,
    /// Only assets with the given value
    Only(T),
}

impl<T: PartialEq> Scope<T> {
    /// Whether the given value lies within this scope
    pub fn contains(&self, value: &T) -> bool {
        match self {
            Self::All => true,
            Self::Only(scope) => scope == value,
        }
    }
}

impl<T: From<String>> Scope<T> {
    /// Parse a scope from a string.
    ///
    /// "-" (or an empty string) means the scope is unrestricted.
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "" | "-" => Self::All,
            s => Self::Only(T::from(s.to_string())),
        }
    }
}

impl<T: fmt::Display> fmt::Display for Scope<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Only(value) => write!(f, "{value}"),
        }
    }
}

/// Iterate over the assets which lie within the given country and sector scopes
pub fn iter_assets_in_scope<'a>(
    assets: &'a AssetMap,
    country_scope: &'a Scope<CountryID>,
    sector_scope: &'a Scope<SectorID>,
) -> impl Iterator<Item = &'a Rc<Asset>> {
    assets
        .values()
        .filter(|asset| country_scope.contains(&asset.country) && sector_scope.contains(&asset.sector))
}
