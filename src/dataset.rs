// Copyright (C) Brian G. Milnes 2025

//! Tabular dataset: one row per parsed snooper file.
//!
//! Columns: `hostname, hpcname, <machine class flags...>, filename, source,
//! timestamp, modules, source_id`. Written as gzipped CSV, read back by the
//! summarize tool. Merging datasets is row concatenation.

pub mod dataset {
    use std::collections::{BTreeMap, HashSet};
    use std::fs::{self, File};
    use std::io::Write;
    use std::path::{Path, PathBuf};

    use chrono::NaiveDateTime;
    use flate2::read::GzDecoder;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use serde::Serialize;
    use serde_json::ser::PrettyFormatter;

    use crate::error::error::{Result, SnoopError};
    use crate::exclusion::exclusion::ExclusionSet;
    use crate::normalize::normalize::{package_names, SourceRewrite};
    use crate::record::record::{parse_timestamp, LogRecord};

    /// `hpcname` of a host that matches no machine class.
    pub const NO_MACHINE: &str = "NA";

    pub const TIMESTAMP_OUT_FMT: &str = "%Y-%m-%d %H:%M:%S%.6f";

    const FIXED_COLUMNS: &[&str] = &["hostname", "hpcname", "filename", "source", "timestamp", "modules", "source_id"];

    /// Machine classes keyed by name, each with hostname fragments that identify it.
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct SystemNodes {
        classes: Vec<(String, Vec<String>)>,
    }

    impl SystemNodes {
        pub fn new(classes: Vec<(String, Vec<String>)>) -> Self {
            SystemNodes { classes }
        }

        /// Parse `{"class": ["node-fragment", ...], ...}`; class order follows the file.
        pub fn parse(text: &str) -> Result<Self> {
            let map: serde_json::Map<String, serde_json::Value> = serde_json::from_str(text)?;
            let mut classes = Vec::new();
            for (name, nodes) in map {
                let nodes: Vec<String> = serde_json::from_value(nodes)?;
                classes.push((name, nodes));
            }
            Ok(SystemNodes { classes })
        }

        pub fn load(path: &Path) -> Result<Self> {
            if !path.is_file() {
                return Err(SnoopError::MissingInput(path.to_path_buf()));
            }
            SystemNodes::parse(&fs::read_to_string(path)?)
        }

        pub fn class_names(&self) -> Vec<String> {
            self.classes.iter().map(|(name, _)| name.clone()).collect()
        }

        /// First class with a node fragment contained in `hostname`.
        pub fn classify(&self, hostname: &str) -> Option<&str> {
            self.classes
                .iter()
                .find(|(_, nodes)| nodes.iter().any(|n| hostname.contains(n.as_str())))
                .map(|(name, _)| name.as_str())
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    pub struct DatasetRow {
        pub hostname: String,
        pub hpcname: String,
        /// One flag per machine class, in class order.
        pub machine_flags: Vec<(String, bool)>,
        pub filename: String,
        pub source: String,
        pub timestamp: NaiveDateTime,
        pub modules: Vec<String>,
        pub source_id: Option<usize>,
    }

    impl DatasetRow {
        /// Build a row from a parsed record. Records without a hostname are malformed.
        pub fn from_record(
            record: &LogRecord,
            filename: &str,
            nodes: &SystemNodes,
            rewrite: &SourceRewrite,
            ignore: &ExclusionSet,
        ) -> Result<Self> {
            let hostname = record
                .metadata
                .hostname
                .clone()
                .ok_or_else(|| SnoopError::malformed(filename, "record has no hostname"))?;
            let class = nodes.classify(&hostname);
            let machine_flags = nodes
                .class_names()
                .into_iter()
                .map(|name| {
                    let hit = class == Some(name.as_str());
                    (name, hit)
                })
                .collect();

            Ok(DatasetRow {
                hpcname: class.unwrap_or(NO_MACHINE).to_string(),
                hostname,
                machine_flags,
                filename: filename.to_string(),
                source: rewrite.commonize(&record.interpreter),
                timestamp: record.timestamp,
                modules: package_names(record, ignore),
                source_id: None,
            })
        }

        pub fn flag(&self, class: &str) -> bool {
            self.machine_flags.iter().any(|(name, hit)| name == class && *hit)
        }

        pub fn uses(&self, module: &str) -> bool {
            self.modules.iter().any(|m| m == module)
        }
    }

    /// Interpreter source label -> numeric id.
    pub type SourceMap = BTreeMap<String, usize>;

    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Dataset {
        rows: Vec<DatasetRow>,
    }

    impl Dataset {
        pub fn new() -> Self {
            Dataset::default()
        }

        pub fn from_rows(rows: Vec<DatasetRow>) -> Self {
            Dataset { rows }
        }

        pub fn push(&mut self, row: DatasetRow) {
            self.rows.push(row);
        }

        pub fn append(&mut self, other: Dataset) {
            self.rows.extend(other.rows);
        }

        pub fn rows(&self) -> &[DatasetRow] {
            &self.rows
        }

        pub fn len(&self) -> usize {
            self.rows.len()
        }

        pub fn is_empty(&self) -> bool {
            self.rows.is_empty()
        }

        /// Sort rows by timestamp, then filename, so output does not depend on scheduling.
        pub fn sort(&mut self) {
            self.rows
                .sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.filename.cmp(&b.filename)));
        }

        /// Number the distinct sources in sorted order and stamp every row.
        pub fn assign_source_ids(&mut self) -> SourceMap {
            let map: SourceMap = self
                .rows
                .iter()
                .map(|r| r.source.clone())
                .collect::<std::collections::BTreeSet<_>>()
                .into_iter()
                .enumerate()
                .map(|(id, source)| (source, id))
                .collect();
            for row in &mut self.rows {
                row.source_id = map.get(&row.source).copied();
            }
            map
        }

        /// Machine-class columns in first-seen order across rows.
        pub fn flag_columns(&self) -> Vec<String> {
            let mut seen = HashSet::new();
            let mut columns = Vec::new();
            for row in &self.rows {
                for (name, _) in &row.machine_flags {
                    if seen.insert(name.clone()) {
                        columns.push(name.clone());
                    }
                }
            }
            columns
        }

        /// Write gzipped CSV. The file appears only once fully written.
        pub fn write_csv_gz(&self, path: &Path) -> Result<()> {
            let partial = partial_path(path);
            {
                let file = File::create(&partial)?;
                let encoder = GzEncoder::new(file, Compression::default());
                let mut writer = csv::Writer::from_writer(encoder);

                let flags = self.flag_columns();
                let mut header: Vec<&str> = vec!["hostname", "hpcname"];
                header.extend(flags.iter().map(String::as_str));
                header.extend(["filename", "source", "timestamp", "modules", "source_id"]);
                writer.write_record(&header)?;

                for row in &self.rows {
                    let mut fields: Vec<String> = vec![row.hostname.clone(), row.hpcname.clone()];
                    fields.extend(flags.iter().map(|f| if row.flag(f) { "1" } else { "0" }.to_string()));
                    fields.push(row.filename.clone());
                    fields.push(row.source.clone());
                    fields.push(row.timestamp.format(TIMESTAMP_OUT_FMT).to_string());
                    fields.push(serde_json::to_string(&row.modules)?);
                    fields.push(row.source_id.map(|id| id.to_string()).unwrap_or_default());
                    writer.write_record(&fields)?;
                }

                let encoder = writer
                    .into_inner()
                    .map_err(|e| SnoopError::Io(e.into_error()))?;
                encoder.finish()?.flush()?;
            }
            fs::rename(&partial, path)?;
            Ok(())
        }

        /// Read a gzipped CSV written by `write_csv_gz` (or by the older pandas tooling).
        pub fn read_csv_gz(path: &Path) -> Result<Self> {
            let name = path.display().to_string();
            let file = File::open(path)?;
            let mut reader = csv::Reader::from_reader(GzDecoder::new(file));
            let headers = reader.headers()?.clone();
            let index: BTreeMap<&str, usize> = headers.iter().enumerate().map(|(i, h)| (h, i)).collect();
            let flag_columns: Vec<(usize, &str)> = headers
                .iter()
                .enumerate()
                .filter(|(_, h)| !FIXED_COLUMNS.contains(h) && !h.is_empty())
                .collect();

            let mut rows = Vec::new();
            for record in reader.records() {
                let record = record?;
                let field = |column: &str| -> Result<String> {
                    index
                        .get(column)
                        .and_then(|i| record.get(*i))
                        .map(str::to_string)
                        .ok_or_else(|| SnoopError::malformed(&name, format!("missing column '{column}'")))
                };
                let raw_timestamp = field("timestamp")?;
                let timestamp = parse_dataset_timestamp(&raw_timestamp).ok_or_else(|| {
                    SnoopError::malformed(&name, format!("bad timestamp '{raw_timestamp}'"))
                })?;

                rows.push(DatasetRow {
                    hostname: field("hostname")?,
                    hpcname: field("hpcname").unwrap_or_else(|_| NO_MACHINE.to_string()),
                    machine_flags: flag_columns
                        .iter()
                        .map(|(i, h)| (h.to_string(), is_truthy(record.get(*i).unwrap_or(""))))
                        .collect(),
                    filename: field("filename")?,
                    source: field("source")?,
                    timestamp,
                    modules: parse_module_list(&field("modules")?),
                    source_id: field("source_id").ok().and_then(|s| s.trim().parse().ok()),
                });
            }
            Ok(Dataset { rows })
        }
    }

    fn partial_path(path: &Path) -> PathBuf {
        let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".partial");
        path.with_file_name(name)
    }

    fn is_truthy(value: &str) -> bool {
        matches!(value.trim(), "1" | "1.0" | "true" | "True")
    }

    fn parse_dataset_timestamp(text: &str) -> Option<NaiveDateTime> {
        let text = text.trim();
        NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
            .ok()
            .or_else(|| parse_timestamp(text))
    }

    /// Module lists are JSON arrays; older files hold Python list reprs with single quotes.
    pub fn parse_module_list(text: &str) -> Vec<String> {
        let text = text.trim();
        if text.is_empty() {
            return Vec::new();
        }
        serde_json::from_str::<Vec<String>>(text)
            .or_else(|_| serde_json::from_str::<Vec<String>>(&text.replace('\'', "\"")))
            .unwrap_or_default()
    }

    /// Dump the source map with sorted keys and a 3-space indent.
    pub fn write_source_map(map: &SourceMap, path: &Path) -> Result<()> {
        let mut out = Vec::new();
        let mut serializer = serde_json::Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(b"   "));
        map.serialize(&mut serializer)?;
        fs::write(path, out)?;
        Ok(())
    }
}
