// Copyright (C) Brian G. Milnes 2025

//! Frequency table: normalized key -> occurrence count.
//!
//! Merging is counter addition, so partial tables from disjoint file sets can
//! be combined in any order.

pub mod frequency {
    use std::collections::HashMap;

    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct FrequencyTable {
        counts: HashMap<String, u64>,
    }

    impl FrequencyTable {
        pub fn new() -> Self {
            FrequencyTable::default()
        }

        pub fn add(&mut self, key: impl Into<String>, count: u64) {
            *self.counts.entry(key.into()).or_insert(0) += count;
        }

        /// Count each key once.
        pub fn add_all<I, S>(&mut self, keys: I)
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            for key in keys {
                self.add(key, 1);
            }
        }

        pub fn merge_from(&mut self, other: FrequencyTable) {
            for (key, count) in other.counts {
                self.add(key, count);
            }
        }

        pub fn get(&self, key: &str) -> u64 {
            self.counts.get(key).copied().unwrap_or(0)
        }

        pub fn contains(&self, key: &str) -> bool {
            self.counts.contains_key(key)
        }

        pub fn len(&self) -> usize {
            self.counts.len()
        }

        pub fn is_empty(&self) -> bool {
            self.counts.is_empty()
        }

        pub fn total(&self) -> u64 {
            self.counts.values().sum()
        }

        /// All entries, highest count first; ties by key.
        pub fn sorted(&self) -> Vec<(String, u64)> {
            let mut items: Vec<(String, u64)> =
                self.counts.iter().map(|(k, v)| (k.clone(), *v)).collect();
            items.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
            items
        }

        pub fn most_common(&self, n: usize) -> Vec<(String, u64)> {
            let mut items = self.sorted();
            items.truncate(n);
            items
        }

        pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
            self.counts.iter().map(|(k, v)| (k.as_str(), *v))
        }
    }

    impl<S: Into<String>> FromIterator<S> for FrequencyTable {
        fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
            let mut table = FrequencyTable::new();
            table.add_all(iter);
            table
        }
    }
}
