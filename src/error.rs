// Copyright (C) Brian G. Milnes 2025

//! Error taxonomy shared by the snooper library modules.
//!
//! Per-file problems surface as `MalformedRecord` and are absorbed by the
//! reducer. Setup problems (`MissingInput`, unreadable roots, bad config files)
//! propagate to the binaries and end the run with a non-zero status.

pub mod error {
    use std::path::PathBuf;
    use thiserror::Error;

    /// Top-level error for snooper operations.
    #[derive(Debug, Error)]
    pub enum SnoopError {
        /// A line or file that could not be decoded as a snooper record.
        #[error("malformed record in {source_name}: {reason}")]
        MalformedRecord { source_name: String, reason: String },

        /// An input path given on the command line does not exist.
        #[error("{} is not a file", .0.display())]
        MissingInput(PathBuf),

        #[error("io error: {0}")]
        Io(#[from] std::io::Error),

        #[error("json error: {0}")]
        Json(#[from] serde_json::Error),

        #[error("csv error: {0}")]
        Csv(#[from] csv::Error),

        /// Invalid configuration value (filters, rule files, worker counts).
        #[error("config error: {0}")]
        Config(String),
    }

    impl SnoopError {
        pub fn malformed(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
            SnoopError::MalformedRecord {
                source_name: source_name.into(),
                reason: reason.into(),
            }
        }
    }

    pub type Result<T> = std::result::Result<T, SnoopError>;
}
