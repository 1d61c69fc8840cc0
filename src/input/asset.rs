//! Code for reading [Asset]s from a CSV file.
use super::*;
use crate::asset::{Asset, AssetMap};
use crate::id::{AssetID, CountryID, SectorID};
use crate::units::Area;
use serde::Deserialize;
use std::rc::Rc;

const ASSETS_FILE_NAME: &str = "assets.csv";

#[derive(Deserialize, PartialEq)]
struct AssetRaw {
    id: AssetID,
    name: String,
    sector: SectorID,
    country: CountryID,
    area: Area,
}

/// Read assets CSV file from model directory.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
///
/// # Returns
///
/// An `AssetMap` with the assets in the order they appear in the file.
pub fn read_assets(model_dir: &Path) -> Result<AssetMap> {
    let file_path = model_dir.join(ASSETS_FILE_NAME);
    let assets_csv = read_csv(&file_path)?;
    read_assets_from_iter(assets_csv).with_context(|| input_err_msg(&file_path))
}

/// Process assets from an iterator.
fn read_assets_from_iter<I>(iter: I) -> Result<AssetMap>
where
    I: Iterator<Item = AssetRaw>,
{
    let mut assets = AssetMap::new();
    for raw in iter {
        let asset = Asset::new(raw.id, raw.name, raw.sector, raw.country, raw.area)?;
        let id = asset.id.clone();
        ensure!(
            assets.insert(id.clone(), Rc::new(asset)).is_none(),
            "Duplicate asset ID {id}"
        );
    }

    Ok(assets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn raw(id: &str, area: f64) -> AssetRaw {
        AssetRaw {
            id: id.into(),
            name: format!("Asset {id}"),
            sector: "OFF".into(),
            country: "UK".into(),
            area: Area(area),
        }
    }

    #[test]
    fn test_read_assets() {
        let dir = tempdir().unwrap();
        {
            let mut file = File::create(dir.path().join(ASSETS_FILE_NAME)).unwrap();
            writeln!(
                file,
                "id,name,sector,country,area
UK-2,Second,RET,UK,150
UK-1,First,OFF,UK,1000.5"
            )
            .unwrap();
        }

        let assets = read_assets(dir.path()).unwrap();
        let ids: Vec<_> = assets.keys().map(ToString::to_string).collect();
        assert_eq!(ids, ["UK-2", "UK-1"]);

        let asset = &assets[&AssetID::from("UK-1")];
        assert_eq!(asset.name, "First");
        assert_eq!(asset.sector, "OFF".into());
        assert_eq!(asset.country, "UK".into());
        assert_eq!(asset.area, Area(1000.5));
    }

    #[test]
    fn test_read_assets_from_iter_duplicate() {
        assert_error!(
            read_assets_from_iter([raw("A1", 10.0), raw("A1", 20.0)].into_iter()),
            "Duplicate asset ID A1"
        );
    }

    #[test]
    fn test_read_assets_from_iter_bad_area() {
        assert_error!(
            read_assets_from_iter([raw("A1", 0.0)].into_iter()),
            "Floor area for asset A1 must be a finite, positive number"
        );
    }
}
