// Copyright (C) Brian G. Milnes 2025

//! Common test utilities for integration tests

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use module_snooper::dataset::dataset::DatasetRow;

/// Write `content` to `root/rel`, creating parent directories.
pub fn write_file(root: &Path, rel: &str, content: &str) -> PathBuf {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dirs");
    }
    fs::write(&path, content).expect("write test file");
    path
}

pub fn ts(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32, micro: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .and_then(|date| date.and_hms_micro_opt(h, min, s, micro))
        .expect("valid test timestamp")
}

/// A Format B document as the shutdown hook writes it.
pub fn json_record(timestamp: &str, hostname: &str, executable: &str, modules: &[(&str, Option<&str>)]) -> String {
    let modules: serde_json::Map<String, serde_json::Value> = modules
        .iter()
        .map(|(name, path)| {
            let value = match path {
                Some(p) => serde_json::Value::String(p.to_string()),
                None => serde_json::Value::Null,
            };
            (name.to_string(), value)
        })
        .collect();
    serde_json::json!({
        "timestamp": timestamp,
        "sys.executable": executable,
        "sys.argv": ["script.py"],
        "sys.path": [],
        "cobalt_envs": {"COBALT_JOBID": "4242"},
        "hostname": hostname,
        "pid": 1234,
        "modules": modules,
    })
    .to_string()
}

/// The two Format A lines of the basic counting scenario.
pub fn scenario_one_lines() -> String {
    [
        "SNOOPER;01-01-2021 00:00:00.000000;/usr/bin/python;py38;numpy;json",
        "SNOOPER;01-01-2021 00:00:01.000000;/usr/bin/python;py38;numpy;pandas",
    ]
    .join("\n")
}

pub fn row(hostname: &str, hpcname: &str, flags: &[(&str, bool)], source: &str, timestamp: NaiveDateTime, modules: &[&str]) -> DatasetRow {
    DatasetRow {
        hostname: hostname.to_string(),
        hpcname: hpcname.to_string(),
        machine_flags: flags.iter().map(|(n, b)| (n.to_string(), *b)).collect(),
        filename: format!("{hostname}.log"),
        source: source.to_string(),
        timestamp,
        modules: modules.iter().map(|m| m.to_string()).collect(),
        source_id: None,
    }
}
