//! Code for writing metadata to file
use crate::model::{BAU_SCENARIO_NAME, ScenarioComparison, TARGET_SCENARIO_NAME};
use anyhow::{Result, anyhow};
use chrono::prelude::*;
use platform_info::{PlatformInfo, PlatformInfoAPI, UNameAPI};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// The output file name for metadata
const METADATA_FILE_NAME: &str = "metadata.toml";

/// Information about the program build via `built` crate
mod built_info {
    // The file has been placed there by the build script.
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

/// Get information about program version from git
fn get_git_hash() -> String {
    let Some(hash) = built_info::GIT_COMMIT_HASH_SHORT else {
        return "unknown".into();
    };

    if built_info::GIT_DIRTY == Some(true) {
        format!("{hash}-dirty")
    } else {
        hash.into()
    }
}

/// All metadata written alongside a model's results
#[derive(Serialize)]
struct Metadata<'a> {
    run: RunMetadata<'a>,
    program: ProgramMetadata<'a>,
    platform: PlatformMetadata,
}

/// Information about the model run
#[derive(Serialize)]
struct RunMetadata<'a> {
    /// Path to the model which was run
    model_path: &'a Path,
    /// The date and time on which the run started
    datetime: String,
    /// The scenarios which were run successfully
    scenarios: Vec<&'a str>,
    /// The scenarios which failed
    failed_scenarios: Vec<&'a str>,
}

impl<'a> RunMetadata<'a> {
    fn new(model_path: &'a Path, comparison: &'a ScenarioComparison) -> Self {
        let dt = Local::now();
        let is_baseline = |name: &str| [BAU_SCENARIO_NAME, TARGET_SCENARIO_NAME].contains(&name);
        Self {
            model_path,
            datetime: dt.to_rfc2822(),
            scenarios: comparison
                .pathways
                .keys()
                .map(|name| &*name.0)
                .filter(|name| !is_baseline(name))
                .collect(),
            failed_scenarios: comparison.failed.iter().map(|name| &*name.0).collect(),
        }
    }
}

#[derive(Serialize)]
struct ProgramMetadata<'a> {
    /// The program name
    name: &'a str,
    /// The program version as specified in Cargo.toml
    version: &'a str,
    /// The target architecture for the build (e.g. x86_64-unknown-linux-gnu)
    target: &'a str,
    /// Whether it is a debug build
    is_debug: bool,
    /// The version of rustc used for the build
    rustc_version: &'a str,
    /// When the program was built
    build_time_utc: &'a str,
    /// The git commit hash the program was built from (if known)
    git_commit_hash: String,
}

impl Default for ProgramMetadata<'_> {
    fn default() -> Self {
        Self {
            name: built_info::PKG_NAME,
            version: built_info::PKG_VERSION,
            target: built_info::TARGET,
            is_debug: built_info::DEBUG,
            rustc_version: built_info::RUSTC_VERSION,
            build_time_utc: built_info::BUILT_TIME_UTC,
            git_commit_hash: get_git_hash(),
        }
    }
}

/// Information about the platform on which the program is running.
///
/// The fields correspond to different data available from the [`PlatformInfo`] struct.
#[derive(Serialize)]
struct PlatformMetadata {
    sysname: String,
    nodename: String,
    release: String,
    version: String,
    machine: String,
    osname: String,
}

impl PlatformMetadata {
    fn new() -> Result<Self> {
        let info = PlatformInfo::new()
            .map_err(|err| anyhow!("Unable to determine platform info: {err}"))?;
        Ok(Self {
            sysname: info.sysname().to_string_lossy().into(),
            nodename: info.nodename().to_string_lossy().into(),
            release: info.release().to_string_lossy().into(),
            version: info.version().to_string_lossy().into(),
            machine: info.machine().to_string_lossy().into(),
            osname: info.osname().to_string_lossy().into(),
        })
    }
}

/// Write metadata to the specified output path in TOML format
pub fn write_metadata(
    output_path: &Path,
    model_path: &Path,
    comparison: &ScenarioComparison,
) -> Result<()> {
    let metadata = Metadata {
        run: RunMetadata::new(model_path, comparison),
        program: ProgramMetadata::default(),
        platform: PlatformMetadata::new()?,
    };
    let file_path = output_path.join(METADATA_FILE_NAME);
    fs::write(&file_path, toml::to_string(&metadata)?)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::model;
    use crate::model::Model;
    use crate::scenario::Scenario;
    use rstest::rstest;
    use tempfile::tempdir;

    #[rstest]
    fn test_write_metadata(model: Model) {
        let scenario = Scenario::new("Nothing".into(), Vec::new(), &[], &model).unwrap();
        let comparison = model.apply_interventions(&[scenario]).unwrap();
        let dir = tempdir().unwrap();
        write_metadata(dir.path(), Path::new("some/model"), &comparison).unwrap();

        let contents = fs::read_to_string(dir.path().join(METADATA_FILE_NAME)).unwrap();
        let value: toml::Table = toml::from_str(&contents).unwrap();
        let run = value["run"].as_table().unwrap();
        assert_eq!(run["model_path"].as_str(), Some("some/model"));
        assert_eq!(
            run["scenarios"].as_array().unwrap(),
            &vec![toml::Value::from("Nothing")]
        );
        assert!(run["failed_scenarios"].as_array().unwrap().is_empty());
        assert_eq!(
            value["program"]["name"].as_str(),
            Some(built_info::PKG_NAME)
        );
    }
}
