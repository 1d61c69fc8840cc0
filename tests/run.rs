//! Integration tests for the `run` command.
use crrem_sim::cli::{RunOpts, handle_run_command};
use crrem_sim::settings::Settings;
use std::fs::read_to_string;
use std::path::PathBuf;
use tempfile::tempdir;

/// Get the path to the example model.
fn get_model_dir() -> PathBuf {
    PathBuf::from("demos/simple")
}

/// An integration test for the `run` command.
#[test]
fn test_handle_run_command() {
    unsafe { std::env::set_var("CRREM_SIM_LOG_LEVEL", "off") };

    // Save results to non-existent directory to check that directory creation works
    let tempdir = tempdir().unwrap();
    let output_dir = tempdir.path().join("results");
    let opts = RunOpts {
        output_dir: Some(output_dir.clone()),
        overwrite: false,
    };
    handle_run_command(&get_model_dir(), &opts, Some(Settings::default())).unwrap();

    for file_name in [
        "pathways.csv",
        "scenario_consumption.csv",
        "impacts.csv",
        "metadata.toml",
        "crrem_sim_info.log",
        "crrem_sim_error.log",
    ] {
        assert!(output_dir.join(file_name).is_file(), "{file_name} missing");
    }

    let pathways = read_to_string(output_dir.join("pathways.csv")).unwrap();
    for scenario in ["BAU", "Target", "Quick Wins", "Deep Retrofit"] {
        assert!(pathways.contains(scenario), "No rows for {scenario}");
    }

    // Running again into the same folder fails unless overwriting is allowed
    assert!(handle_run_command(&get_model_dir(), &opts, Some(Settings::default())).is_err());
}
