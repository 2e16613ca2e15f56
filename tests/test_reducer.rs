// Copyright (C) Brian G. Milnes 2025

//! Tests for the parallel reducer and the per-file builders

use std::path::PathBuf;
use std::sync::Arc;

use module_snooper::dataset::dataset::{Dataset, SystemNodes};
use module_snooper::error::error::SnoopError;
use module_snooper::exclusion::exclusion::ExclusionSet;
use module_snooper::frequency::frequency::FrequencyTable;
use module_snooper::logging::logging::ToolLogger;
use module_snooper::normalize::normalize::{PathNormalizer, SourceRewrite};
use module_snooper::prefix::prefix::{PrefixTable, SharedPrefixTable};
use module_snooper::record::record::DelimitedParser;
use module_snooper::reducer::reducer::{
    build_rows, count_file, reduce, reduce_with, seed_prefixes, Aggregate, CountContext, RowContext,
};

mod common;
use common::{json_record, scenario_one_lines, write_file};

fn count_files(files: &[PathBuf], ignore: ExclusionSet, workers: usize) -> FrequencyTable {
    let logger = ToolLogger::new_disabled();
    let parser = DelimitedParser::default();
    let normalizer = PathNormalizer::new(4, Arc::new(ignore));
    let prefixes = SharedPrefixTable::new(PrefixTable::with_probe(|_| true));
    let ctx = CountContext {
        parser: &parser,
        normalizer: &normalizer,
        prefixes: &prefixes,
        logger: &logger,
    };
    let (table, _) = reduce(files, |path| count_file(path, &ctx), workers, &logger).unwrap();
    table
}

/// Six small log files in both formats plus one broken file.
fn corpus(root: &std::path::Path) -> Vec<PathBuf> {
    vec![
        write_file(root, "a.log", &scenario_one_lines()),
        write_file(root, "b.log", "SNOOPER;01-02-2021 00:00:00.0;/usr/bin/python;py38;numpy;scipy;sys\n"),
        write_file(
            root,
            "c.json",
            &json_record("01-03-2021 10:00:00.0", "nid1", "/usr/bin/python", &[("torch", None), ("sys", None)]),
        ),
        write_file(
            root,
            "d.json",
            &json_record("01-04-2021 10:00:00.0", "nid2", "/usr/bin/python", &[("numpy", None)]),
        ),
        write_file(root, "e.log", "nothing to see here\n"),
        write_file(root, "f.log", "SNOOPER;01-05-2021 00:00:00.0;/usr/bin/python;py38;pandas\n"),
        write_file(root, "broken.json", "{\"timestamp\": \"01-05-2021\""),
    ]
}

#[test]
fn test_two_delimited_records_are_counted() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_file(dir.path(), "snoop.log", &scenario_one_lines());
    let table = count_files(&[file], ExclusionSet::empty(), 2);

    assert_eq!(table.get("numpy"), 2);
    assert_eq!(table.get("json"), 1);
    assert_eq!(table.get("pandas"), 1);
    assert_eq!(table.len(), 3);
}

#[test]
fn test_union_equals_merge_of_parts() {
    let dir = tempfile::tempdir().unwrap();
    let files = corpus(dir.path());
    let (left, right) = files.split_at(3);

    let whole = count_files(&files, ExclusionSet::empty(), 4);
    let merged = count_files(right, ExclusionSet::empty(), 1).merge(count_files(left, ExclusionSet::empty(), 3));
    assert_eq!(whole, merged);

    let mut reversed = files.clone();
    reversed.reverse();
    assert_eq!(whole, count_files(&reversed, ExclusionSet::empty(), 2));
}

#[test]
fn test_excluded_names_never_counted() {
    let dir = tempfile::tempdir().unwrap();
    let files = corpus(dir.path());
    let table = count_files(&files, ExclusionSet::from_names(["sys", "numpy"]), 3);
    assert!(!table.contains("sys"));
    assert!(!table.contains("numpy"));
    assert_eq!(table.get("torch"), 1);
}

#[test]
fn test_failed_file_is_an_empty_contribution() {
    let dir = tempfile::tempdir().unwrap();
    let files = corpus(dir.path());
    let logger = ToolLogger::new_disabled();
    let parser = DelimitedParser::default();
    let normalizer = PathNormalizer::default();
    let prefixes = SharedPrefixTable::default();
    let ctx = CountContext {
        parser: &parser,
        normalizer: &normalizer,
        prefixes: &prefixes,
        logger: &logger,
    };

    assert!(matches!(count_file(&files[6], &ctx), Err(SnoopError::MalformedRecord { .. })));
    assert!(count_file(&files[4], &ctx).unwrap().is_empty());

    let (table, stats) = reduce(&files, |path| count_file(path, &ctx), 2, &logger).unwrap();
    assert_eq!(stats.files, 7);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.contributed, 5);
    assert_eq!(table.get("numpy"), 4);
}

#[test]
fn test_missing_file_does_not_abort_batch() {
    let dir = tempfile::tempdir().unwrap();
    let mut files = corpus(dir.path());
    files.push(dir.path().join("vanished.log"));
    let table = count_files(&files, ExclusionSet::empty(), 2);
    assert_eq!(table.get("pandas"), 2);
}

#[test]
fn test_reduce_with_explicit_merge() {
    let files: Vec<PathBuf> = (1..=20).map(|i| PathBuf::from(format!("{i}"))).collect();
    let logger = ToolLogger::new_disabled();
    let parse = |path: &std::path::Path| -> module_snooper::Result<u64> {
        Ok(path.to_string_lossy().parse::<u64>().unwrap_or(0))
    };
    let (sum, stats) = reduce_with(&files, parse, || 0u64, |a: u64, b: u64| a + b, |n: &u64| *n == 0, 4, &logger).unwrap();
    assert_eq!(sum, 210);
    assert_eq!(stats.contributed, 20);
}

#[test]
fn test_empty_file_list() {
    let table = count_files(&[], ExclusionSet::empty(), 2);
    assert!(table.is_empty());
}

#[test]
fn test_build_rows_and_merge() {
    let dir = tempfile::tempdir().unwrap();
    let files = vec![
        write_file(
            dir.path(),
            "2021/01/05/nid00010.1.10.00.00.000000",
            &json_record("01-05-2021 10:00:00.0", "nid00010", "/soft/bin/python3", &[("numpy", None)]),
        ),
        write_file(
            dir.path(),
            "2021/01/05/thetagpu04.2.10.00.01.000000",
            &json_record("01-05-2021 10:00:01.0", "thetagpu04", "/usr/bin/python", &[("torch", None)]),
        ),
        write_file(dir.path(), "2021/01/05/old.3", &scenario_one_lines()),
    ];
    let logger = ToolLogger::new_disabled();
    let parser = DelimitedParser::default();
    let nodes = SystemNodes::parse(r#"{"thetaknl": ["nid"], "thetagpu": ["thetagpu"]}"#).unwrap();
    let rewrite = SourceRewrite::default();
    let ignore = ExclusionSet::empty();
    let ctx = RowContext {
        parser: &parser,
        nodes: &nodes,
        rewrite: &rewrite,
        ignore: &ignore,
        logger: &logger,
    };

    let (mut dataset, _): (Dataset, _) = reduce(&files, |path| build_rows(path, &ctx), 3, &logger).unwrap();
    dataset.sort();

    // Format A records carry no hostname and produce no rows.
    assert_eq!(dataset.len(), 2);
    assert_eq!(dataset.rows()[0].hpcname, "thetaknl");
    assert_eq!(dataset.rows()[0].source, "/lus/theta-fs0/software/bin/python");
    assert!(dataset.rows()[1].flag("thetagpu"));
    assert_eq!(dataset.rows()[1].modules, vec!["torch".to_string()]);
}

#[test]
fn test_seed_prefixes_gives_sorted_order_aliases() {
    let dir = tempfile::tempdir().unwrap();
    let site_a = dir.path().join("a");
    let site_b = dir.path().join("b");
    std::fs::create_dir_all(&site_a).unwrap();
    std::fs::create_dir_all(&site_b).unwrap();
    let record = |paths: &[&std::path::Path]| {
        let search: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
        serde_json::json!({
            "timestamp": "01-05-2021 10:00:00.0",
            "sys.executable": "python",
            "sys.path": search,
            "modules": {},
        })
        .to_string()
    };
    let files = vec![
        write_file(dir.path(), "2.json", &record(&[site_a.as_path(), site_b.as_path()])),
        write_file(dir.path(), "1.json", &record(&[site_b.as_path()])),
    ];

    let prefixes = SharedPrefixTable::default();
    let added = seed_prefixes(&files, 10, &DelimitedParser::default(), &prefixes, 2, &ToolLogger::new_disabled()).unwrap();
    assert_eq!(added, 2);
    let table = prefixes.into_inner();
    assert_eq!(table.alias_of(&site_b.display().to_string()), Some("P0"));
    assert_eq!(table.alias_of(&site_a.display().to_string()), Some("P1"));
}

/// Three files whose search paths nest: `env`, `env/site` and `env/other`.
fn nested_corpus(root: &std::path::Path) -> Vec<PathBuf> {
    let env = root.join("env");
    let site = env.join("site");
    let other = env.join("other");
    std::fs::create_dir_all(&site).unwrap();
    std::fs::create_dir_all(&other).unwrap();
    let numpy = site.join("numpy/core/a.py").display().to_string();
    let scipy = other.join("scipy/linalg/b.py").display().to_string();
    let record = |search: Vec<String>, modules: serde_json::Value| {
        serde_json::json!({
            "timestamp": "01-05-2021 10:00:00.0",
            "sys.executable": "python",
            "sys.path": search,
            "modules": modules,
        })
        .to_string()
    };
    let path = |p: &std::path::Path| p.display().to_string();
    vec![
        write_file(root, "a.json", &record(vec![path(&env)], serde_json::json!({ "numpy.core": numpy }))),
        write_file(root, "b.json", &record(vec![path(&site)], serde_json::json!({ "numpy.core": numpy }))),
        write_file(
            root,
            "c.json",
            &record(vec![path(&other), path(&env)], serde_json::json!({ "scipy.linalg": scipy, "sys": null })),
        ),
    ]
}

fn count_seeded(seed: &[PathBuf], files: &[PathBuf], prefixes: &SharedPrefixTable, workers: usize) -> FrequencyTable {
    let logger = ToolLogger::new_disabled();
    let parser = DelimitedParser::default();
    let normalizer = PathNormalizer::default();
    seed_prefixes(seed, seed.len(), &parser, prefixes, workers, &logger).unwrap();
    let ctx = CountContext {
        parser: &parser,
        normalizer: &normalizer,
        prefixes,
        logger: &logger,
    };
    reduce(files, |path| count_file(path, &ctx), workers, &logger).unwrap().0
}

#[test]
fn test_nested_prefixes_do_not_depend_on_file_order() {
    let dir = tempfile::tempdir().unwrap();
    let files = nested_corpus(dir.path());
    let mut reversed = files.clone();
    reversed.reverse();

    let forward = count_seeded(&files, &files, &SharedPrefixTable::default(), 1);
    let backward = count_seeded(&reversed, &reversed, &SharedPrefixTable::default(), 1);
    assert_eq!(forward, backward);
    assert_eq!(forward.get("P0/site/numpy/core"), 2);
    assert_eq!(forward.get("P0/other/scipy/linalg"), 1);
    assert_eq!(forward.get("sys"), 1);

    let shared = SharedPrefixTable::default();
    let (left, right) = reversed.split_at(1);
    let merged = count_seeded(&reversed, right, &shared, 2).merge(count_seeded(&[], left, &shared, 3));
    assert_eq!(forward, merged);
    assert_eq!(shared.snapshot().len(), 3);
}
