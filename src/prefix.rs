// Copyright (C) Brian G. Milnes 2025

//! Prefix alias table
//!
//! Maps interpreter search-path directories to short aliases (`P0`, `P1`, ...)
//! in first-seen order. The table only grows: an alias, once assigned, is never
//! reassigned or removed. Entries that are not real directories are remembered
//! so they are probed once.
//!
//! `SharedPrefixTable` is the single owner used by parallel workers.

pub mod prefix {
    use std::collections::HashSet;
    use std::fs;
    use std::path::Path;
    use std::sync::RwLock;

    use serde::{Deserialize, Serialize};

    use crate::error::error::Result;

    /// Decides whether a search-path entry may become a prefix.
    pub type DirProbe = fn(&str) -> bool;

    pub fn is_real_dir(path: &str) -> bool {
        Path::new(path).is_dir()
    }

    #[derive(Clone)]
    pub struct PrefixTable {
        prefixes: Vec<(String, String)>,
        not_prefixes: HashSet<String>,
        used: Vec<String>,
        probe: DirProbe,
    }

    impl Default for PrefixTable {
        fn default() -> Self {
            PrefixTable::with_probe(is_real_dir)
        }
    }

    impl std::fmt::Debug for PrefixTable {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("PrefixTable")
                .field("prefixes", &self.prefixes)
                .field("not_prefixes", &self.not_prefixes.len())
                .field("used", &self.used)
                .finish()
        }
    }

    /// On-disk form of the table, written at the end of a run.
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct PrefixDump {
        pub prefixes: Vec<(String, String)>,
        pub used: Vec<String>,
    }

    impl PrefixTable {
        pub fn new() -> Self {
            PrefixTable::default()
        }

        pub fn with_probe(probe: DirProbe) -> Self {
            PrefixTable {
                prefixes: Vec::new(),
                not_prefixes: HashSet::new(),
                used: Vec::new(),
                probe,
            }
        }

        pub fn len(&self) -> usize {
            self.prefixes.len()
        }

        pub fn is_empty(&self) -> bool {
            self.prefixes.is_empty()
        }

        pub fn alias_of(&self, prefix: &str) -> Option<&str> {
            self.prefixes
                .iter()
                .find(|(p, _)| p == prefix)
                .map(|(_, a)| a.as_str())
        }

        fn is_known(&self, path: &str) -> bool {
            self.not_prefixes.contains(path) || self.alias_of(path).is_some()
        }

        /// True when some entry of `paths` has not been classified yet.
        pub fn has_unknown(&self, paths: &[String]) -> bool {
            paths.iter().any(|p| !self.is_known(p))
        }

        /// Register every unseen directory in `paths`; returns how many were added.
        pub fn load_prefixes(&mut self, paths: &[String]) -> usize {
            let mut added = 0;
            for path in paths {
                if self.is_known(path) {
                    continue;
                }
                if (self.probe)(path) {
                    let alias = format!("P{}", self.prefixes.len());
                    self.prefixes.push((path.clone(), alias));
                    added += 1;
                } else {
                    self.not_prefixes.insert(path.clone());
                }
            }
            added
        }

        /// First registered prefix (insertion order) that `module_path` starts with.
        pub fn lookup(&self, module_path: &str) -> Option<(&str, &str)> {
            self.prefixes
                .iter()
                .find(|(prefix, _)| module_path.starts_with(prefix.as_str()))
                .map(|(p, a)| (p.as_str(), a.as_str()))
        }

        /// Substitute the first matching prefix with its alias.
        pub fn substitute(&mut self, module_path: &str) -> String {
            let (rewritten, prefix) = self.rewrite(module_path);
            if let Some(prefix) = prefix {
                self.mark_used(&prefix);
            }
            rewritten
        }

        fn rewrite(&self, module_path: &str) -> (String, Option<String>) {
            match self.lookup(module_path) {
                Some((prefix, alias)) => (
                    format!("{}{}", alias, &module_path[prefix.len()..]),
                    Some(prefix.to_string()),
                ),
                None => (module_path.to_string(), None),
            }
        }

        fn is_used(&self, prefix: &str) -> bool {
            self.used.iter().any(|u| u == prefix)
        }

        fn mark_used(&mut self, prefix: &str) {
            if !self.is_used(prefix) {
                self.used.push(prefix.to_string());
            }
        }

        /// Prefixes that took part in at least one substitution, with their aliases.
        pub fn used_prefixes(&self) -> Vec<(String, String)> {
            self.used
                .iter()
                .filter_map(|p| self.alias_of(p).map(|a| (p.clone(), a.to_string())))
                .collect()
        }

        pub fn entries(&self) -> &[(String, String)] {
            &self.prefixes
        }

        pub fn dump(&self) -> PrefixDump {
            PrefixDump {
                prefixes: self.prefixes.clone(),
                used: self.used.clone(),
            }
        }

        pub fn write_json(&self, path: &Path) -> Result<()> {
            let json = serde_json::to_string_pretty(&self.dump())?;
            fs::write(path, json)?;
            Ok(())
        }
    }

    /// Prefix table shared by all workers of a run.
    ///
    /// Lookups take the read lock. Registration takes the write lock and
    /// re-checks there, so concurrent discoverers of the same prefix agree on
    /// one alias.
    #[derive(Debug, Default)]
    pub struct SharedPrefixTable {
        inner: RwLock<PrefixTable>,
    }

    impl SharedPrefixTable {
        pub fn new(table: PrefixTable) -> Self {
            SharedPrefixTable {
                inner: RwLock::new(table),
            }
        }

        fn read(&self) -> std::sync::RwLockReadGuard<'_, PrefixTable> {
            self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
        }

        fn write(&self) -> std::sync::RwLockWriteGuard<'_, PrefixTable> {
            self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
        }

        pub fn load_prefixes(&self, paths: &[String]) -> usize {
            if !self.read().has_unknown(paths) {
                return 0;
            }
            self.write().load_prefixes(paths)
        }

        pub fn substitute(&self, module_path: &str) -> String {
            let (rewritten, newly_used) = {
                let table = self.read();
                let (rewritten, prefix) = table.rewrite(module_path);
                (rewritten, prefix.filter(|p| !table.is_used(p)))
            };
            if let Some(prefix) = newly_used {
                self.write().mark_used(&prefix);
            }
            rewritten
        }

        pub fn snapshot(&self) -> PrefixTable {
            self.read().clone()
        }

        pub fn into_inner(self) -> PrefixTable {
            self.inner.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner())
        }
    }
}
