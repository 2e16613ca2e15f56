// Copyright (C) Brian G. Milnes 2025

//! Log file discovery
//!
//! Raw logs live under `<root>/<YYYY>/<MM>/<DD>/<hostname>.<pid>.<HH>.<MM>.<SS>.<micro>`.
//! Pre-aggregated datasets live flat in one directory as `YYYY-MM-DD*.csv.gz`.
//! Both listings honour a year/month/day filter and skip zero-byte files,
//! which are writes that never completed.

pub mod discovery {
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::sync::LazyLock;

    use regex::Regex;
    use walkdir::WalkDir;

    use crate::error::error::{Result, SnoopError};
    use crate::logging::logging::ToolLogger;

    pub const DATASET_SUFFIX: &str = ".csv.gz";

    static DATASET_DATE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^(\d{4})-(\d{1,2})-(\d{1,2})").expect("dataset date pattern"));

    /// Parse a comma-separated list of integers. An empty string is an empty list.
    pub fn parse_int_list(text: &str) -> Result<Vec<u32>> {
        text.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<u32>()
                    .map_err(|_| SnoopError::Config(format!("'{s}' is not a whole number")))
            })
            .collect()
    }

    /// Year, month and day filters; an empty list matches everything.
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct DateFilter {
        pub years: Vec<u32>,
        pub months: Vec<u32>,
        pub days: Vec<u32>,
    }

    impl DateFilter {
        pub fn all() -> Self {
            DateFilter::default()
        }

        pub fn parse(years: &str, months: &str, days: &str) -> Result<Self> {
            Ok(DateFilter {
                years: parse_int_list(years)?,
                months: parse_int_list(months)?,
                days: parse_int_list(days)?,
            })
        }

        pub fn matches(&self, year: u32, month: u32, day: u32) -> bool {
            fn admits(filter: &[u32], value: u32) -> bool {
                filter.is_empty() || filter.contains(&value)
            }
            admits(&self.years, year) && admits(&self.months, month) && admits(&self.days, day)
        }
    }

    /// Files of one `YYYY/MM/DD` directory.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct DayPartition {
        pub year: u32,
        pub month: u32,
        pub day: u32,
        pub dir: PathBuf,
        pub files: Vec<PathBuf>,
    }

    /// Decode `dir` as `<root>/<YYYY>/<MM>/<DD>`; any other shape is `None`.
    pub fn date_of_dir(root: &Path, dir: &Path) -> Option<(u32, u32, u32)> {
        let rel = dir.strip_prefix(root).ok()?;
        let parts: Vec<u32> = rel
            .components()
            .map(|c| c.as_os_str().to_str().and_then(|s| s.parse::<u32>().ok()))
            .collect::<Option<Vec<_>>>()?;
        match parts.as_slice() {
            [year, month, day] => Some((*year, *month, *day)),
            _ => None,
        }
    }

    fn is_non_empty_file(path: &Path) -> bool {
        fs::metadata(path).map(|m| m.is_file() && m.len() > 0).unwrap_or(false)
    }

    /// Matching day directories with their non-empty files, sorted by path.
    ///
    /// Entries the walk cannot read are skipped and reported at debug level.
    pub fn list_partitions(root: &Path, filter: &DateFilter, logger: &ToolLogger) -> Result<Vec<DayPartition>> {
        if !root.is_dir() {
            return Err(SnoopError::MissingInput(root.to_path_buf()));
        }

        let mut partitions: Vec<DayPartition> = Vec::new();
        for entry in WalkDir::new(root)
            .follow_links(true)
            .min_depth(3)
            .max_depth(3)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| match e {
                Ok(entry) => Some(entry),
                Err(err) => {
                    logger.debug(&format!("skipping unreadable entry under {}: {err}", root.display()));
                    None
                }
            })
            .filter(|e| e.file_type().is_dir())
        {
            let Some((year, month, day)) = date_of_dir(root, entry.path()) else {
                continue;
            };
            if !filter.matches(year, month, day) {
                continue;
            }

            let mut files: Vec<PathBuf> = fs::read_dir(entry.path())?
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| is_non_empty_file(p))
                .collect();
            files.sort();

            partitions.push(DayPartition {
                year,
                month,
                day,
                dir: entry.path().to_path_buf(),
                files,
            });
        }
        Ok(partitions)
    }

    /// Flattened list of candidate log files under a `YYYY/MM/DD` tree.
    pub fn list_files(root: &Path, filter: &DateFilter, logger: &ToolLogger) -> Result<Vec<PathBuf>> {
        Ok(list_partitions(root, filter, logger)?
            .into_iter()
            .flat_map(|p| p.files)
            .collect())
    }

    /// Date encoded at the start of a dataset file name (`2021-03-07.csv.gz`).
    pub fn date_of_dataset_name(name: &str) -> Option<(u32, u32, u32)> {
        let stem = name.strip_suffix(DATASET_SUFFIX)?;
        let caps = DATASET_DATE.captures(stem)?;
        let field = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());
        Some((field(1)?, field(2)?, field(3)?))
    }

    /// Pre-aggregated dataset files directly inside `dir`, sorted by path.
    pub fn list_dataset_files(dir: &Path, filter: &DateFilter) -> Result<Vec<PathBuf>> {
        if !dir.is_dir() {
            return Err(SnoopError::MissingInput(dir.to_path_buf()));
        }
        let mut files: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .and_then(date_of_dataset_name)
                    .is_some_and(|(y, m, d)| filter.matches(y, m, d))
            })
            .filter(|p| is_non_empty_file(p))
            .collect();
        files.sort();
        Ok(files)
    }
}
