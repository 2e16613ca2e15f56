// Copyright (C) Brian G. Milnes 2025

//! Module Snooper - aggregate Python module usage records
//!
//! A shutdown hook writes one record per Python process listing the modules
//! it had loaded. This library discovers those records in a date-partitioned
//! log tree, parses both record formats, normalizes module paths into
//! portable keys, and reduces everything in parallel into a frequency table
//! or a tabular dataset.

pub mod error;
pub mod record;
pub mod prefix;
pub mod exclusion;
pub mod normalize;
pub mod discovery;
pub mod frequency;
pub mod dataset;
pub mod reducer;
pub mod report;
pub mod snapshot;
pub mod layout;
pub mod config;
pub mod logging;
pub mod tool_runner;

// Re-export commonly used items
pub use error::error::{Result, SnoopError};
pub use record::record::{parse_file, parse_text, DelimitedParser, LogRecord, ParsedFile, RecordFormat};
pub use prefix::prefix::{PrefixTable, SharedPrefixTable};
pub use exclusion::exclusion::ExclusionSet;
pub use normalize::normalize::{truncate_depth, PathNormalizer, SourceRewrite, DEFAULT_DEPTH};
pub use discovery::discovery::{list_dataset_files, list_files, DateFilter};
pub use frequency::frequency::FrequencyTable;
pub use dataset::dataset::{Dataset, DatasetRow, SystemNodes};
pub use reducer::reducer::{reduce, reduce_with, Aggregate, ReduceStats};
pub use config::config::{AnalysisConfig, VerbosityArgs};
pub use logging::logging::{Level, ToolLogger};
pub use tool_runner::tool_runner::{run_tool, ToolConfig};
