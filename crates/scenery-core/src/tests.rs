use std::fs;

use crate::config::read_config_file;
use crate::error::SceneryError;
use crate::progress::{checkpoint, NoProgress, Progress, Ticker};
use crate::settings::PipelineConfig;

// ---- Table files ----

#[test]
fn test_include_resolves_relative_to_including_file() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("sub")).unwrap();
    fs::write(dir.path().join("sub/colors.txt"), "ENUM_COLOR lu_A FF0000\n").unwrap();
    fs::write(
        dir.path().join("main.txt"),
        "LU_IMPORT 1 lu_A\nINCLUDE sub/colors.txt\nLU_IMPORT 2 lu_B\n",
    )
    .unwrap();

    let lines = read_config_file(&dir.path().join("main.txt")).unwrap();
    let keys: Vec<&str> = lines.iter().map(|l| l.key()).collect();
    assert_eq!(keys, vec!["LU_IMPORT", "ENUM_COLOR", "LU_IMPORT"]);
    assert!(lines[1].file.ends_with("sub/colors.txt"));
}

#[test]
fn test_include_cycle_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), "INCLUDE a.txt\n").unwrap();
    let err = read_config_file(&dir.path().join("a.txt")).unwrap_err();
    assert!(matches!(err, SceneryError::Config { .. }), "Got {err:?}");
}

#[test]
fn test_missing_file_reports_path() {
    let err = read_config_file(std::path::Path::new("/nonexistent/table.txt")).unwrap_err();
    assert!(matches!(err, SceneryError::Io { .. }));
    assert!(err.to_string().contains("table.txt"));
}

// ---- Progress ----

#[test]
fn test_closure_progress_cancels() {
    let mut calls = 0;
    let mut cancel_at_half = |_: usize, _: usize, _: &str, f: f64| {
        calls += 1;
        f >= 0.5
    };
    assert!(checkpoint(&mut cancel_at_half, 0, 1, "x", 0.25).is_ok());
    assert!(matches!(
        checkpoint(&mut cancel_at_half, 0, 1, "x", 0.5),
        Err(SceneryError::Cancelled)
    ));
    assert_eq!(calls, 2);
}

#[test]
fn test_ticker_reports_sparsely() {
    let mut seen = Vec::new();
    let mut record = |_: usize, _: usize, _: &str, f: f64| {
        seen.push(f);
        false
    };
    let ticker = Ticker::new(1000);
    for i in 0..1000 {
        ticker.tick(&mut record, 0, 1, "items", i).unwrap();
    }
    assert_eq!(seen.len(), 100);
    assert!(!NoProgress.report(0, 1, "", 0.0));
}

// ---- Settings ----

#[test]
fn test_pipeline_config_partial_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pipeline.json");
    fs::write(&path, r#"{ "placement_buckets": 64, "strict_priority": true }"#).unwrap();
    let cfg = PipelineConfig::from_json_file(&path).unwrap();
    assert_eq!(cfg.placement_buckets, 64);
    assert!(cfg.strict_priority);
    assert_eq!(cfg.map_resolution, PipelineConfig::default().map_resolution);
}

#[test]
fn test_pipeline_config_rejects_bad_resolution() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pipeline.json");
    fs::write(&path, r#"{ "map_resolution": 0.0 }"#).unwrap();
    assert!(matches!(
        PipelineConfig::from_json_file(&path),
        Err(SceneryError::Format { .. })
    ));
}
