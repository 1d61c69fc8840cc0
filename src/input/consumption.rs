//! Code for reading historical consumption from a CSV file.
use super::*;
use crate::model::ConsumptionRecord;

const CONSUMPTION_FILE_NAME: &str = "consumption.csv";

/// Read consumption records from the model directory.
///
/// Records are checked against the asset registry when the model is built, so no validation
/// beyond parsing happens here.
pub fn read_consumption(model_dir: &Path) -> Result<Vec<ConsumptionRecord>> {
    let file_path = model_dir.join(CONSUMPTION_FILE_NAME);
    Ok(read_csv(&file_path)?.collect())
}
