// Copyright (C) Brian G. Milnes 2025

//! Path normalization
//!
//! Turns machine-specific module file paths into portable, low-cardinality
//! keys: a registered search-path prefix is replaced by its alias and the
//! result is cut to a fixed number of `/` segments. Also holds the helpers the
//! tabular variant uses to reduce a record to top-level package names and to
//! commonize interpreter paths across mount points.

pub mod normalize {
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use serde::{Deserialize, Serialize};

    use crate::exclusion::exclusion::ExclusionSet;
    use crate::prefix::prefix::SharedPrefixTable;
    use crate::record::record::{LogRecord, RecordFormat};

    pub const DEFAULT_DEPTH: usize = 4;

    /// Modules loaded from here are scratch copies and never counted as packages.
    pub const TEMP_PREFIX: &str = "/tmp/";

    /// Keep the first `depth` `/`-separated segments.
    pub fn truncate_depth(path: &str, depth: usize) -> String {
        path.split('/').take(depth).collect::<Vec<_>>().join("/")
    }

    /// `numpy.core.multiarray` -> `numpy`
    pub fn top_level(module_name: &str) -> &str {
        module_name.split('.').next().unwrap_or(module_name)
    }

    #[derive(Debug, Clone)]
    pub struct PathNormalizer {
        depth: usize,
        ignore: Arc<ExclusionSet>,
    }

    impl Default for PathNormalizer {
        fn default() -> Self {
            PathNormalizer::new(DEFAULT_DEPTH, Arc::new(ExclusionSet::empty()))
        }
    }

    impl PathNormalizer {
        pub fn new(depth: usize, ignore: Arc<ExclusionSet>) -> Self {
            PathNormalizer { depth, ignore }
        }

        pub fn depth(&self) -> usize {
            self.depth
        }

        pub fn ignore(&self) -> &ExclusionSet {
            &self.ignore
        }

        /// Normalize one module's path.
        ///
        /// Returns `None` when the module is excluded. A module without a backing
        /// file is keyed by its name.
        pub fn normalize(
            &self,
            module_name: &str,
            module_path: Option<&str>,
            search_paths: &[String],
            table: &SharedPrefixTable,
        ) -> Option<String> {
            if self.ignore.contains(module_name) {
                return None;
            }
            table.load_prefixes(search_paths);
            Some(self.key_for(module_name, module_path, table))
        }

        fn key_for(&self, module_name: &str, module_path: Option<&str>, table: &SharedPrefixTable) -> String {
            match module_path {
                Some(path) => truncate_depth(&table.substitute(path), self.depth),
                None => module_name.to_string(),
            }
        }

        /// Distinct keys for every non-excluded module of a record.
        ///
        /// Delimited records carry no search paths, so their entries are
        /// counted verbatim rather than cut down to the interpreter directory.
        pub fn normalize_record(&self, record: &LogRecord, table: &SharedPrefixTable) -> BTreeSet<String> {
            let modules = record.modules.iter().filter(|(name, _)| !self.ignore.contains(name));
            match record.format {
                RecordFormat::Delimited => modules.map(|(name, _)| name.clone()).collect(),
                RecordFormat::Json => {
                    table.load_prefixes(&record.search_paths);
                    modules.map(|(name, path)| self.key_for(name, path.as_deref(), table)).collect()
                }
            }
        }
    }

    /// Top-level package names of a record, for the tabular dataset.
    ///
    /// A package is dropped when any of its modules was loaded from `/tmp/`,
    /// or when its name is excluded. Sorted and unique.
    pub fn package_names(record: &LogRecord, ignore: &ExclusionSet) -> Vec<String> {
        let mut names: BTreeSet<&str> = record.modules.keys().map(|m| top_level(m)).collect();
        for (name, path) in &record.modules {
            if path.as_deref().is_some_and(|p| p.starts_with(TEMP_PREFIX)) {
                names.remove(top_level(name));
            }
        }
        names
            .into_iter()
            .filter(|n| !ignore.contains(n))
            .map(str::to_string)
            .collect()
    }

    /// Rewrite rules that map interpreter paths seen on different mounts and
    /// versions onto one canonical source label.
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct SourceRewrite {
        /// Applied first; only the first matching prefix is rewritten.
        pub prefixes: Vec<(String, String)>,
        /// Then the first suffix the path ends with is replaced wherever it occurs.
        pub suffixes: Vec<(String, String)>,
    }

    impl Default for SourceRewrite {
        fn default() -> Self {
            let pair = |a: &str, b: &str| (a.to_string(), b.to_string());
            SourceRewrite {
                prefixes: vec![
                    pair("/soft/", "/lus/theta-fs0/software/"),
                    pair("/projects/", "/lus/theta-fs0/projects/"),
                    pair("/home/", "/gpfs/mira-home/"),
                ],
                suffixes: vec![
                    pair("python3.8", "python"),
                    pair("python3.7", "python"),
                    pair("python3", "python"),
                ],
            }
        }
    }

    impl SourceRewrite {
        pub fn none() -> Self {
            SourceRewrite {
                prefixes: Vec::new(),
                suffixes: Vec::new(),
            }
        }

        pub fn commonize(&self, source: &str) -> String {
            let mut out = source.to_string();
            if let Some((from, to)) = self.prefixes.iter().find(|(from, _)| out.starts_with(from.as_str())) {
                out = format!("{}{}", to, &out[from.len()..]);
            }
            if let Some((from, to)) = self.suffixes.iter().find(|(from, _)| out.ends_with(from.as_str())) {
                out = out.replace(from.as_str(), to);
            }
            out
        }
    }
}
