// Copyright (C) Brian G. Milnes 2025

//! Module exclusion list
//!
//! Loaded once at startup and never mutated. Accepts either a JSON array of
//! module names or a plain list with one module per line.

pub mod exclusion {
    use std::collections::HashSet;
    use std::fs;
    use std::path::Path;

    use crate::error::error::{Result, SnoopError};

    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct ExclusionSet {
        names: HashSet<String>,
    }

    impl ExclusionSet {
        pub fn empty() -> Self {
            ExclusionSet::default()
        }

        pub fn from_names<I, S>(names: I) -> Self
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            ExclusionSet {
                names: names.into_iter().map(Into::into).collect(),
            }
        }

        /// Parse file contents: a JSON array, or one name per line.
        pub fn parse(text: &str) -> Result<Self> {
            if text.trim_start().starts_with('[') {
                let names: Vec<String> = serde_json::from_str(text)?;
                return Ok(ExclusionSet::from_names(names));
            }
            Ok(ExclusionSet::from_names(
                text.lines().map(str::trim).filter(|l| !l.is_empty()),
            ))
        }

        /// Load from a file that must exist.
        pub fn load(path: &Path) -> Result<Self> {
            if !path.is_file() {
                return Err(SnoopError::MissingInput(path.to_path_buf()));
            }
            let text = fs::read_to_string(path)?;
            ExclusionSet::parse(&text)
        }

        /// Load from a file if present, otherwise exclude nothing.
        pub fn load_optional(path: &Path) -> Result<Self> {
            if path.is_file() {
                ExclusionSet::load(path)
            } else {
                Ok(ExclusionSet::empty())
            }
        }

        pub fn contains(&self, module_name: &str) -> bool {
            self.names.contains(module_name)
        }

        pub fn len(&self) -> usize {
            self.names.len()
        }

        pub fn is_empty(&self) -> bool {
            self.names.is_empty()
        }
    }
}
