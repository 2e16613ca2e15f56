// Copyright (C) Brian G. Milnes 2025

//! Record parser for snooper log files
//!
//! Two wire formats exist in the log corpus:
//! - Format A (delimited): `SENTINEL;<timestamp>;<source-path>;<interpreter-id>;<mod1>;<mod2>;...`
//! - Format B (JSON): one object per process with `timestamp`, `sys.executable`,
//!   `sys.path`, `cobalt_envs`, `modules` and optional `hostname`, `pid`, `versions`
//!
//! Both decode into the same `LogRecord`. Parsing never mutates shared state.

pub mod record {
    use std::collections::BTreeMap;
    use std::path::Path;

    use chrono::NaiveDateTime;
    use serde::Deserialize;
    use serde_json::Value;

    use crate::error::error::{Result, SnoopError};

    /// Timestamp layout written by the shutdown hook (`MM-DD-YYYY HH:MM:SS.ffffff`).
    pub const TIME_FMT: &str = "%m-%d-%Y %H:%M:%S%.f";
    pub const TIME_WRITE_FMT: &str = "%m-%d-%Y %H:%M:%S%.6f";

    /// Sentinels accepted at the head of a Format A line.
    pub const DEFAULT_SENTINELS: &[&str] = &["PyModuleSnooper", "SNOOPER"];

    /// Environment variable holding the batch job id in `cobalt_envs`.
    pub const JOB_ID_VAR: &str = "COBALT_JOBID";

    /// Wire format of a record.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum RecordFormat {
        Delimited,
        Json,
    }

    impl RecordFormat {
        /// JSON when the first non-whitespace character opens an object.
        pub fn detect(text: &str) -> Self {
            match text.trim_start().chars().next() {
                Some('{') => RecordFormat::Json,
                _ => RecordFormat::Delimited,
            }
        }
    }

    /// Optional per-process details carried by some formats.
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct RecordMetadata {
        pub hostname: Option<String>,
        pub pid: Option<u64>,
        pub job_id: Option<String>,
        pub env_tags: BTreeMap<String, String>,
        /// Format A only
        pub interpreter_id: Option<String>,
        pub versions: BTreeMap<String, String>,
    }

    /// One snooper record, normalized across formats.
    #[derive(Debug, Clone, PartialEq)]
    pub struct LogRecord {
        pub format: RecordFormat,
        pub timestamp: NaiveDateTime,
        pub interpreter: String,
        pub search_paths: Vec<String>,
        /// Module name to backing file; `None` for builtins without a file.
        pub modules: BTreeMap<String, Option<String>>,
        pub metadata: RecordMetadata,
    }

    impl LogRecord {
        pub fn module_count(&self) -> usize {
            self.modules.len()
        }
    }

    /// Result of parsing one file: the records that decoded and the units that did not.
    #[derive(Debug, Default)]
    pub struct ParsedFile {
        pub records: Vec<LogRecord>,
        pub rejected: Vec<SnoopError>,
    }

    pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(text.trim(), TIME_FMT).ok()
    }

    /// Parser for Format A lines.
    #[derive(Debug, Clone)]
    pub struct DelimitedParser {
        sentinels: Vec<String>,
    }

    impl Default for DelimitedParser {
        fn default() -> Self {
            DelimitedParser::new(DEFAULT_SENTINELS.iter().map(|s| s.to_string()).collect())
        }
    }

    impl DelimitedParser {
        pub fn new(sentinels: Vec<String>) -> Self {
            DelimitedParser { sentinels }
        }

        pub fn sentinels(&self) -> &[String] {
            &self.sentinels
        }

        fn is_sentinel(&self, head: &str) -> bool {
            self.sentinels.iter().any(|s| s == head)
        }

        /// Parse one line.
        ///
        /// Lines without a sentinel are not snooper output and yield `Ok(None)`.
        /// A sentinel line missing its three leading fields, or carrying an
        /// unreadable timestamp, is a `MalformedRecord`.
        pub fn parse_line(&self, line: &str, source_name: &str) -> Result<Option<LogRecord>> {
            let line = line.trim_end_matches(&['\r', '\n'][..]);
            let mut fields = line.split(';');
            let head = fields.next().unwrap_or("");
            if !self.is_sentinel(head) {
                return Ok(None);
            }

            let (timestamp, source_path, interpreter_id) =
                match (fields.next(), fields.next(), fields.next()) {
                    (Some(t), Some(s), Some(i)) => (t, s, i),
                    _ => {
                        return Err(SnoopError::malformed(
                            source_name,
                            "expected timestamp, source path and interpreter id after sentinel",
                        ))
                    }
                };

            let timestamp = parse_timestamp(timestamp).ok_or_else(|| {
                SnoopError::malformed(source_name, format!("bad timestamp '{timestamp}'"))
            })?;

            let modules = fields
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(|m| (m.to_string(), Some(m.to_string())))
                .collect();

            Ok(Some(LogRecord {
                format: RecordFormat::Delimited,
                timestamp,
                interpreter: source_path.to_string(),
                search_paths: Vec::new(),
                modules,
                metadata: RecordMetadata {
                    interpreter_id: Some(interpreter_id.to_string()),
                    ..RecordMetadata::default()
                },
            }))
        }
    }

    /// Format B document as written by the shutdown hook.
    #[derive(Debug, Deserialize)]
    struct RawJsonRecord {
        timestamp: String,
        #[serde(rename = "sys.executable")]
        executable: Option<String>,
        #[serde(rename = "sys.path", default)]
        search_paths: Vec<String>,
        #[serde(default)]
        cobalt_envs: BTreeMap<String, Value>,
        modules: BTreeMap<String, Option<String>>,
        #[serde(default)]
        hostname: Option<String>,
        #[serde(default)]
        pid: Option<u64>,
        #[serde(default)]
        versions: BTreeMap<String, Value>,
    }

    fn value_text(value: Value) -> String {
        match value {
            Value::String(s) => s,
            other => other.to_string(),
        }
    }

    impl RawJsonRecord {
        fn into_record(self, source_name: &str) -> Result<LogRecord> {
            let timestamp = parse_timestamp(&self.timestamp).ok_or_else(|| {
                SnoopError::malformed(source_name, format!("bad timestamp '{}'", self.timestamp))
            })?;
            let env_tags: BTreeMap<String, String> = self
                .cobalt_envs
                .into_iter()
                .map(|(k, v)| (k, value_text(v)))
                .collect();
            let job_id = env_tags.get(JOB_ID_VAR).cloned();

            Ok(LogRecord {
                format: RecordFormat::Json,
                timestamp,
                interpreter: self.executable.unwrap_or_default(),
                search_paths: self.search_paths,
                modules: self.modules,
                metadata: RecordMetadata {
                    hostname: self.hostname,
                    pid: self.pid,
                    job_id,
                    env_tags,
                    interpreter_id: None,
                    versions: self
                        .versions
                        .into_iter()
                        .map(|(k, v)| (k, value_text(v)))
                        .collect(),
                },
            })
        }
    }

    /// Parse a single Format B document.
    pub fn parse_json_record(text: &str, source_name: &str) -> Result<LogRecord> {
        let raw: RawJsonRecord = serde_json::from_str(text)
            .map_err(|e| SnoopError::malformed(source_name, e.to_string()))?;
        raw.into_record(source_name)
    }

    /// Parse the full contents of one log file.
    ///
    /// JSON files may hold one document or several concatenated ones; decoding
    /// stops at the first broken document. Delimited files are parsed line by
    /// line and a bad line does not discard its neighbours.
    pub fn parse_text(text: &str, source_name: &str, parser: &DelimitedParser) -> ParsedFile {
        let mut parsed = ParsedFile::default();
        match RecordFormat::detect(text) {
            RecordFormat::Json => {
                let stream = serde_json::Deserializer::from_str(text).into_iter::<RawJsonRecord>();
                for item in stream {
                    match item {
                        Ok(raw) => match raw.into_record(source_name) {
                            Ok(record) => parsed.records.push(record),
                            Err(e) => parsed.rejected.push(e),
                        },
                        Err(e) => {
                            parsed.rejected.push(SnoopError::malformed(source_name, e.to_string()));
                            break;
                        }
                    }
                }
            }
            RecordFormat::Delimited => {
                for line in text.lines() {
                    match parser.parse_line(line, source_name) {
                        Ok(Some(record)) => parsed.records.push(record),
                        Ok(None) => {}
                        Err(e) => parsed.rejected.push(e),
                    }
                }
            }
        }
        parsed
    }

    /// Read and parse one log file. Only the read itself can fail here.
    pub fn parse_file(path: &Path, parser: &DelimitedParser) -> Result<ParsedFile> {
        let bytes = std::fs::read(path)?;
        let text = String::from_utf8_lossy(&bytes);
        Ok(parse_text(&text, &path.display().to_string(), parser))
    }
}
