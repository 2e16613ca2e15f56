// Copyright (C) Brian G. Milnes 2025

//! Tool runner infrastructure for snooper binaries
//!
//! Provides a consistent wrapper for all snooper tools that handles:
//! - Argument parsing with a usage message and exit status 1 on bad arguments
//! - Timing measurement
//! - Logger lifecycle
//! - Standard error handling

pub mod tool_runner {
    use std::path::PathBuf;
    use std::time::Instant;

    use anyhow::Result;
    use clap::Parser;

    use crate::logging::logging::{Level, ToolLogger};

    /// Configuration for a tool run
    pub struct ToolConfig {
        /// Name of the tool (for log lines and the run log directory)
        pub tool_name: String,
        /// Keep a run log under logs/<tool-name>/
        pub enable_logging: bool,
        pub level: Level,
        /// Diagnostics go to this file instead of stderr
        pub logfilename: Option<PathBuf>,
    }

    impl ToolConfig {
        /// Create a basic config with just the tool name
        pub fn new(tool_name: &str) -> Self {
            ToolConfig {
                tool_name: tool_name.to_string(),
                enable_logging: false,
                level: Level::Info,
                logfilename: None,
            }
        }

        pub fn with_level(mut self, level: Level) -> Self {
            self.level = level;
            self
        }

        pub fn with_logfilename(mut self, logfilename: Option<PathBuf>) -> Self {
            self.logfilename = logfilename;
            self
        }

        pub fn with_run_log(mut self, enable: bool) -> Self {
            self.enable_logging = enable;
            self
        }

        pub fn build_logger(&self) -> Result<ToolLogger> {
            let logger = if self.enable_logging {
                ToolLogger::new(&self.tool_name)
            } else {
                ToolLogger::new_disabled().with_name(&self.tool_name)
            };
            let logger = logger.with_level(self.level);
            match &self.logfilename {
                Some(path) => logger.with_diagnostics_file(path),
                None => Ok(logger),
            }
        }
    }

    /// Parse arguments; on a usage error print it and exit with status 1.
    pub fn parse_args_or_exit<A: Parser>() -> A {
        match A::try_parse() {
            Ok(args) => args,
            Err(e) => {
                let _ = e.print();
                std::process::exit(if e.use_stderr() { 1 } else { 0 });
            }
        }
    }

    /// Run a tool with standard timing and logging
    ///
    /// Usage:
    /// ```no_run
    /// use module_snooper::tool_runner::tool_runner::{run_tool, ToolConfig};
    /// let config = ToolConfig::new("snooper-count");
    /// run_tool(config, |logger| {
    ///     logger.info("Starting analysis...");
    ///     Ok("Summary: 0 files".to_string())
    /// }).unwrap();
    /// ```
    pub fn run_tool<F>(config: ToolConfig, tool_fn: F) -> Result<()>
    where
        F: FnOnce(&ToolLogger) -> Result<String>,
    {
        let start = Instant::now();
        let logger = config.build_logger()?;

        let summary = match tool_fn(&logger) {
            Ok(summary) => summary,
            Err(e) => {
                logger.error(&format!("{e:#}"));
                return Err(e);
            }
        };

        println!();
        println!("{summary}");
        println!("Completed in {}ms", start.elapsed().as_millis());

        if config.enable_logging {
            logger.finalize(&summary);
        }

        Ok(())
    }
}
