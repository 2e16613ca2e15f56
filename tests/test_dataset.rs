// Copyright (C) Brian G. Milnes 2025

//! Tests for dataset rows, machine classification and gzip CSV output

use std::fs;
use std::io::Write;

use flate2::write::GzEncoder;
use flate2::Compression;
use module_snooper::dataset::dataset::{
    parse_module_list, write_source_map, Dataset, DatasetRow, SourceMap, SystemNodes, NO_MACHINE,
};
use module_snooper::error::error::SnoopError;
use module_snooper::exclusion::exclusion::ExclusionSet;
use module_snooper::normalize::normalize::SourceRewrite;
use module_snooper::record::record::{parse_json_record, DelimitedParser};

mod common;
use common::{json_record, row, ts};

fn nodes() -> SystemNodes {
    SystemNodes::parse(r#"{"thetaknl": ["nid"], "thetagpu": ["thetagpu"], "cooley": ["cc"]}"#).unwrap()
}

#[test]
fn test_class_order_follows_file() {
    assert_eq!(nodes().class_names(), vec!["thetaknl", "thetagpu", "cooley"]);
}

#[test]
fn test_classify_hostname() {
    let nodes = nodes();
    assert_eq!(nodes.classify("nid00412"), Some("thetaknl"));
    assert_eq!(nodes.classify("thetagpu12"), Some("thetagpu"));
    assert_eq!(nodes.classify("login1"), None);
}

#[test]
fn test_row_from_record() {
    let text = json_record(
        "01-05-2021 10:00:00.5",
        "thetagpu03",
        "/projects/env/bin/python3.8",
        &[("numpy", None), ("numpy.linalg", None), ("sys", None)],
    );
    let record = parse_json_record(&text, "t").unwrap();
    let row = DatasetRow::from_record(
        &record,
        "2021/01/05/thetagpu03.1",
        &nodes(),
        &SourceRewrite::default(),
        &ExclusionSet::from_names(["sys"]),
    )
    .unwrap();

    assert_eq!(row.hostname, "thetagpu03");
    assert_eq!(row.hpcname, "thetagpu");
    assert_eq!(
        row.machine_flags,
        vec![("thetaknl".to_string(), false), ("thetagpu".to_string(), true), ("cooley".to_string(), false)]
    );
    assert_eq!(row.source, "/lus/theta-fs0/projects/env/bin/python");
    assert_eq!(row.timestamp, ts(2021, 1, 5, 10, 0, 0, 500_000));
    assert_eq!(row.modules, vec!["numpy".to_string()]);
    assert_eq!(row.source_id, None);
}

#[test]
fn test_row_for_unknown_machine() {
    let text = json_record("01-05-2021 10:00:00.0", "login1", "py", &[]);
    let record = parse_json_record(&text, "t").unwrap();
    let row = DatasetRow::from_record(&record, "f", &nodes(), &SourceRewrite::none(), &ExclusionSet::empty()).unwrap();
    assert_eq!(row.hpcname, NO_MACHINE);
    assert!(row.machine_flags.iter().all(|(_, hit)| !hit));
}

#[test]
fn test_row_without_hostname_is_malformed() {
    let record = DelimitedParser::default()
        .parse_line("SNOOPER;01-01-2021 00:00:00.0;/usr/bin/python;py38;numpy", "t")
        .unwrap()
        .unwrap();
    let err = DatasetRow::from_record(&record, "f", &nodes(), &SourceRewrite::none(), &ExclusionSet::empty())
        .unwrap_err();
    assert!(matches!(err, SnoopError::MalformedRecord { .. }));
}

fn sample() -> Dataset {
    let flags = |knl: bool| [("thetaknl", knl), ("thetagpu", !knl)];
    Dataset::from_rows(vec![
        row("thetagpu01", "thetagpu", &flags(false), "/usr/bin/python", ts(2021, 1, 6, 9, 0, 0, 0), &["torch"]),
        row("nid00001", "thetaknl", &flags(true), "/soft/python", ts(2021, 1, 5, 9, 0, 0, 250), &["numpy", "scipy"]),
        row("nid00002", "thetaknl", &flags(true), "/usr/bin/python", ts(2021, 1, 5, 8, 0, 0, 0), &[]),
    ])
}

#[test]
fn test_sort_and_source_ids() {
    let mut dataset = sample();
    dataset.sort();
    let map = dataset.assign_source_ids();

    let hosts: Vec<&str> = dataset.rows().iter().map(|r| r.hostname.as_str()).collect();
    assert_eq!(hosts, vec!["nid00002", "nid00001", "thetagpu01"]);

    let expected: SourceMap = [("/soft/python".to_string(), 0), ("/usr/bin/python".to_string(), 1)].into();
    assert_eq!(map, expected);
    let ids: Vec<Option<usize>> = dataset.rows().iter().map(|r| r.source_id).collect();
    assert_eq!(ids, vec![Some(1), Some(0), Some(1)]);
}

#[test]
fn test_source_ids_do_not_depend_on_row_order() {
    let mut a = sample();
    let mut b = Dataset::from_rows(sample().rows().iter().rev().cloned().collect());
    assert_eq!(a.assign_source_ids(), b.assign_source_ids());
}

#[test]
fn test_csv_gz_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("2021-01-05.csv.gz");
    let mut dataset = sample();
    dataset.sort();
    dataset.assign_source_ids();

    dataset.write_csv_gz(&path).unwrap();
    assert!(!dir.path().join("2021-01-05.csv.gz.partial").exists());

    let back = Dataset::read_csv_gz(&path).unwrap();
    assert_eq!(back, dataset);
    assert_eq!(back.flag_columns(), vec!["thetaknl", "thetagpu"]);
}

#[test]
fn test_read_legacy_csv() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("2020-11-02.csv.gz");
    let csv = "hostname,hpcname,thetaknl,thetagpu,filename,source,timestamp,modules,source_id\n\
               nid1,thetaknl,1.0,0.0,a,/usr/bin/python,2020-11-02 10:00:00.000001,\"['numpy', 'mpi4py']\",3\n";
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(csv.as_bytes()).unwrap();
    fs::write(&path, encoder.finish().unwrap()).unwrap();

    let dataset = Dataset::read_csv_gz(&path).unwrap();
    assert_eq!(dataset.len(), 1);
    let row = &dataset.rows()[0];
    assert!(row.flag("thetaknl"));
    assert!(!row.flag("thetagpu"));
    assert_eq!(row.modules, vec!["numpy".to_string(), "mpi4py".to_string()]);
    assert_eq!(row.source_id, Some(3));
    assert_eq!(row.timestamp, ts(2020, 11, 2, 10, 0, 0, 1));
}

#[test]
fn test_parse_module_list() {
    assert_eq!(parse_module_list(r#"["a", "b"]"#), vec!["a".to_string(), "b".to_string()]);
    assert_eq!(parse_module_list("['a']"), vec!["a".to_string()]);
    assert!(parse_module_list("").is_empty());
    assert!(parse_module_list("not a list").is_empty());
}

#[test]
fn test_source_map_layout() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("source_map.json");
    let map: SourceMap = [("/b".to_string(), 1), ("/a".to_string(), 0)].into();
    write_source_map(&map, &path).unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), "{\n   \"/a\": 0,\n   \"/b\": 1\n}");
}

#[test]
fn test_system_nodes_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = SystemNodes::load(&dir.path().join("system_nodes.json")).unwrap_err();
    assert!(matches!(err, SnoopError::MissingInput(_)));
}
