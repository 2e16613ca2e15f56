// Copyright (C) Brian G. Milnes 2025

//! Snapshot of a process's loaded modules, and its Format B serialization.
//!
//! The shutdown hook builds a `Snapshot` from the interpreter state it sees
//! and hands it to `to_json`; nothing here reads process globals. Whether a
//! process should report at all is decided by a `ReporterRole` and the
//! `DISABLE_PYMODULE_LOG` switch, both passed in by the caller.

pub mod snapshot {
    use std::collections::BTreeMap;
    use std::fs::OpenOptions;
    use std::io::Write;
    use std::path::{Path, PathBuf};

    use chrono::NaiveDateTime;
    use serde::Serialize;

    use crate::error::error::Result;
    use crate::layout::layout::date_dir;
    use crate::record::record::TIME_WRITE_FMT;

    /// Set to any non-empty value to turn the hook off.
    pub const DISABLE_VAR: &str = "DISABLE_PYMODULE_LOG";

    pub const DEFAULT_LOG_ROOT: &str = "/lus/theta-fs0/logs/pythonlogging/module_usage";

    /// Environment variables with this prefix are kept as record tags.
    pub const ENV_TAG_PREFIX: &str = "COBALT_";

    const RANK_VARS: &[&str] = &["PMI_RANK", "OMPI_COMM_WORLD_RANK", "PMIX_RANK"];

    pub fn logging_disabled(env: &BTreeMap<String, String>) -> bool {
        env.get(DISABLE_VAR).is_some_and(|v| !v.is_empty())
    }

    /// Whether this process is the one that reports for its job.
    pub trait ReporterRole {
        fn is_designated_reporter(&self) -> bool;
    }

    pub struct AlwaysReport;

    impl ReporterRole for AlwaysReport {
        fn is_designated_reporter(&self) -> bool {
            true
        }
    }

    /// Only rank 0 of a parallel job reports; a process without a rank reports.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RankReporter {
        pub rank: Option<u64>,
    }

    impl RankReporter {
        pub fn from_env(env: &BTreeMap<String, String>) -> Self {
            let rank = RANK_VARS
                .iter()
                .find_map(|var| env.get(*var).and_then(|v| v.trim().parse::<u64>().ok()));
            RankReporter { rank }
        }
    }

    impl ReporterRole for RankReporter {
        fn is_designated_reporter(&self) -> bool {
            self.rank.map_or(true, |r| r == 0)
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    pub struct Snapshot {
        pub timestamp: NaiveDateTime,
        pub executable: String,
        pub argv: Vec<String>,
        pub search_paths: Vec<String>,
        pub env_tags: BTreeMap<String, String>,
        pub hostname: String,
        pub pid: u32,
        pub modules: BTreeMap<String, Option<String>>,
        pub versions: BTreeMap<String, Option<String>>,
    }

    #[derive(Serialize)]
    struct WireSnapshot<'a> {
        timestamp: String,
        #[serde(rename = "sys.executable")]
        executable: &'a str,
        #[serde(rename = "sys.argv")]
        argv: &'a [String],
        #[serde(rename = "sys.path")]
        search_paths: &'a [String],
        cobalt_envs: &'a BTreeMap<String, String>,
        hostname: &'a str,
        pid: u32,
        modules: &'a BTreeMap<String, Option<String>>,
        versions: &'a BTreeMap<String, Option<String>>,
    }

    impl Snapshot {
        pub fn new(timestamp: NaiveDateTime, executable: &str, hostname: &str, pid: u32) -> Self {
            Snapshot {
                timestamp,
                executable: executable.to_string(),
                argv: Vec::new(),
                search_paths: Vec::new(),
                env_tags: BTreeMap::new(),
                hostname: hostname.to_string(),
                pid,
                modules: BTreeMap::new(),
                versions: BTreeMap::new(),
            }
        }

        pub fn with_argv(mut self, argv: Vec<String>) -> Self {
            self.argv = argv;
            self
        }

        pub fn with_search_paths(mut self, search_paths: Vec<String>) -> Self {
            self.search_paths = search_paths;
            self
        }

        /// Keep only `COBALT_*` variables as tags.
        pub fn with_env(mut self, env: &BTreeMap<String, String>) -> Self {
            self.env_tags = env
                .iter()
                .filter(|(k, _)| k.starts_with(ENV_TAG_PREFIX))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            self
        }

        pub fn with_module(mut self, name: &str, path: Option<&str>, version: Option<&str>) -> Self {
            self.modules.insert(name.to_string(), path.map(str::to_string));
            self.versions.insert(name.to_string(), version.map(str::to_string));
            self
        }

        /// One Format B JSON line.
        pub fn to_json(&self) -> Result<String> {
            let wire = WireSnapshot {
                timestamp: self.timestamp.format(TIME_WRITE_FMT).to_string(),
                executable: &self.executable,
                argv: &self.argv,
                search_paths: &self.search_paths,
                cobalt_envs: &self.env_tags,
                hostname: &self.hostname,
                pid: self.pid,
                modules: &self.modules,
                versions: &self.versions,
            };
            Ok(serde_json::to_string(&wire)?)
        }

        /// `<hostname>.<pid>.<HH>.<MM>.<SS>.<microseconds>`
        pub fn file_name(&self) -> String {
            format!("{}.{}.{}", self.hostname, self.pid, self.timestamp.format("%H.%M.%S.%6f"))
        }

        pub fn log_path(&self, root: &Path) -> PathBuf {
            date_dir(root, self.timestamp.date()).join(self.file_name())
        }

        /// Append this snapshot under `root` unless disabled or not the reporter.
        ///
        /// The day directory must already exist.
        pub fn emit(
            &self,
            root: &Path,
            role: &dyn ReporterRole,
            env: &BTreeMap<String, String>,
        ) -> Result<Option<PathBuf>> {
            if logging_disabled(env) || !role.is_designated_reporter() {
                return Ok(None);
            }
            let path = self.log_path(root);
            let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
            writeln!(file, "{}", self.to_json()?)?;
            Ok(Some(path))
        }
    }
}
