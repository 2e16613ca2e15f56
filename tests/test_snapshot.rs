// Copyright (C) Brian G. Milnes 2025

//! Tests for snapshot serialization and emission

use std::collections::BTreeMap;
use std::fs;

use module_snooper::layout::layout::create_date_dirs;
use module_snooper::record::record::{parse_file, parse_text, DelimitedParser};
use module_snooper::snapshot::snapshot::{
    logging_disabled, AlwaysReport, RankReporter, ReporterRole, Snapshot, DISABLE_VAR,
};

mod common;
use common::ts;

fn env(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

fn snapshot() -> Snapshot {
    Snapshot::new(ts(2021, 1, 5, 10, 0, 0, 123_456), "/usr/bin/python3", "nid00042", 4321)
        .with_argv(vec!["train.py".to_string(), "--epochs".to_string()])
        .with_search_paths(vec!["/opt/site-packages".to_string()])
        .with_env(&env(&[("COBALT_JOBID", "99"), ("HOME", "/home/u"), ("COBALT_PARTNAME", "nid0-3")]))
        .with_module("numpy", Some("/opt/site-packages/numpy/__init__.py"), Some("1.19.2"))
        .with_module("sys", None, None)
}

#[test]
fn test_with_env_keeps_only_scheduler_tags() {
    let snap = snapshot();
    assert_eq!(snap.env_tags.len(), 2);
    assert!(!snap.env_tags.contains_key("HOME"));
}

#[test]
fn test_json_is_read_back_by_parser() {
    let json = snapshot().to_json().unwrap();
    assert!(!json.contains('\n'));

    let parsed = parse_text(&json, "snap", &DelimitedParser::default());
    assert!(parsed.rejected.is_empty());
    let record = &parsed.records[0];
    assert_eq!(record.timestamp, ts(2021, 1, 5, 10, 0, 0, 123_456));
    assert_eq!(record.interpreter, "/usr/bin/python3");
    assert_eq!(record.search_paths, vec!["/opt/site-packages".to_string()]);
    assert_eq!(record.modules.get("sys"), Some(&None));
    assert_eq!(record.metadata.hostname.as_deref(), Some("nid00042"));
    assert_eq!(record.metadata.pid, Some(4321));
    assert_eq!(record.metadata.job_id.as_deref(), Some("99"));
    assert_eq!(record.metadata.versions.get("numpy").map(String::as_str), Some("1.19.2"));
}

#[test]
fn test_file_name_and_path() {
    let snap = snapshot();
    assert_eq!(snap.file_name(), "nid00042.4321.10.00.00.123456");
    let root = std::path::Path::new("/logs");
    assert_eq!(snap.log_path(root), root.join("2021/01/05/nid00042.4321.10.00.00.123456"));
}

#[test]
fn test_disable_flag() {
    assert!(logging_disabled(&env(&[(DISABLE_VAR, "1")])));
    assert!(!logging_disabled(&env(&[(DISABLE_VAR, "")])));
    assert!(!logging_disabled(&env(&[])));
}

#[test]
fn test_rank_reporter() {
    assert!(RankReporter::from_env(&env(&[])).is_designated_reporter());
    assert!(RankReporter::from_env(&env(&[("PMI_RANK", "0")])).is_designated_reporter());
    assert!(!RankReporter::from_env(&env(&[("OMPI_COMM_WORLD_RANK", "3")])).is_designated_reporter());
    assert_eq!(RankReporter::from_env(&env(&[("PMIX_RANK", "x")])).rank, None);
}

#[test]
fn test_emit_writes_one_line_under_day_dir() {
    let dir = tempfile::tempdir().unwrap();
    let snap = snapshot();
    create_date_dirs(dir.path(), snap.timestamp.date(), 1).unwrap();

    let path = snap.emit(dir.path(), &AlwaysReport, &env(&[])).unwrap().expect("log written");
    assert_eq!(path, snap.log_path(dir.path()));
    assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 1);

    let parsed = parse_file(&path, &DelimitedParser::default()).unwrap();
    assert_eq!(parsed.records.len(), 1);
}

#[test]
fn test_emit_skipped_when_disabled_or_not_reporter() {
    let dir = tempfile::tempdir().unwrap();
    let snap = snapshot();
    create_date_dirs(dir.path(), snap.timestamp.date(), 1).unwrap();

    assert!(snap.emit(dir.path(), &AlwaysReport, &env(&[(DISABLE_VAR, "1")])).unwrap().is_none());
    let worker = RankReporter { rank: Some(2) };
    assert!(snap.emit(dir.path(), &worker, &env(&[])).unwrap().is_none());
    assert!(!snap.log_path(dir.path()).exists());
}
