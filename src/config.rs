// Copyright (C) Brian G. Milnes 2025

//! Run configuration shared by the snooper tools
//!
//! `AnalysisConfig` collects the knobs the parser and normalizer need;
//! `VerbosityArgs` is the logging flag group every binary flattens into its
//! clap arguments.

pub mod config {
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    use clap::Args;

    use crate::error::error::{Result, SnoopError};
    use crate::exclusion::exclusion::ExclusionSet;
    use crate::logging::logging::Level;
    use crate::normalize::normalize::{PathNormalizer, SourceRewrite, DEFAULT_DEPTH};
    use crate::record::record::{DelimitedParser, DEFAULT_SENTINELS};
    use crate::tool_runner::tool_runner::ToolConfig;

    /// 90% of the available CPUs, at least one.
    pub fn default_workers() -> usize {
        let cpus = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        ((cpus as f64 * 0.9) as usize).max(1)
    }

    #[derive(Debug, Clone)]
    pub struct AnalysisConfig {
        pub depth: usize,
        pub sentinels: Vec<String>,
        pub exclusions: Arc<ExclusionSet>,
        pub rewrite: SourceRewrite,
        pub workers: usize,
        /// Files pre-scanned for search paths before fan-out; `None` scans all.
        pub seed_sample: Option<usize>,
    }

    impl Default for AnalysisConfig {
        fn default() -> Self {
            AnalysisConfig {
                depth: DEFAULT_DEPTH,
                sentinels: DEFAULT_SENTINELS.iter().map(|s| s.to_string()).collect(),
                exclusions: Arc::new(ExclusionSet::empty()),
                rewrite: SourceRewrite::default(),
                workers: default_workers(),
                seed_sample: None,
            }
        }
    }

    impl AnalysisConfig {
        pub fn with_depth(mut self, depth: usize) -> Result<Self> {
            if depth == 0 {
                return Err(SnoopError::Config("depth must be at least 1".to_string()));
            }
            self.depth = depth;
            Ok(self)
        }

        pub fn with_workers(mut self, workers: usize) -> Result<Self> {
            if workers == 0 {
                return Err(SnoopError::Config("worker count must be at least 1".to_string()));
            }
            self.workers = workers;
            Ok(self)
        }

        pub fn with_sentinels(mut self, sentinels: Vec<String>) -> Self {
            if !sentinels.is_empty() {
                self.sentinels = sentinels;
            }
            self
        }

        pub fn with_exclusions(mut self, exclusions: ExclusionSet) -> Self {
            self.exclusions = Arc::new(exclusions);
            self
        }

        pub fn with_rewrite(mut self, rewrite: SourceRewrite) -> Self {
            self.rewrite = rewrite;
            self
        }

        pub fn with_seed_sample(mut self, seed_sample: Option<usize>) -> Self {
            self.seed_sample = seed_sample;
            self
        }

        /// Number of files the pre-scan covers out of `total`.
        pub fn seed_count(&self, total: usize) -> usize {
            self.seed_sample.map_or(total, |n| n.min(total))
        }

        pub fn parser(&self) -> DelimitedParser {
            DelimitedParser::new(self.sentinels.clone())
        }

        pub fn normalizer(&self) -> PathNormalizer {
            PathNormalizer::new(self.depth, Arc::clone(&self.exclusions))
        }
    }

    /// Load source rewrite rules from a JSON file, or use the built-in rules.
    pub fn load_rewrite(path: Option<&Path>) -> Result<SourceRewrite> {
        match path {
            None => Ok(SourceRewrite::default()),
            Some(path) if !path.is_file() => Err(SnoopError::MissingInput(path.to_path_buf())),
            Some(path) => Ok(serde_json::from_str(&fs::read_to_string(path)?)?),
        }
    }

    /// Logging flags shared by every tool.
    #[derive(Debug, Clone, Default, Args)]
    pub struct VerbosityArgs {
        /// Set logger to DEBUG
        #[arg(long)]
        pub debug: bool,

        /// Set logger to WARNING
        #[arg(long)]
        pub warning: bool,

        /// Set logger to ERROR
        #[arg(long)]
        pub error: bool,

        /// If set, logging information will go to this file
        #[arg(long)]
        pub logfilename: Option<PathBuf>,

        /// Keep a run log under logs/<tool>/<date>/
        #[arg(long)]
        pub runlog: bool,
    }

    impl VerbosityArgs {
        pub fn level(&self) -> Level {
            Level::from_flags(self.debug, self.warning, self.error)
        }

        pub fn tool_config(&self, tool_name: &str) -> ToolConfig {
            ToolConfig::new(tool_name)
                .with_level(self.level())
                .with_logfilename(self.logfilename.clone())
                .with_run_log(self.runlog)
        }
    }
}
