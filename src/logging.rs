// Copyright (C) Brian G. Milnes 2025

//! Logging infrastructure for snooper tools
//!
//! Diagnostic lines are levelled and timestamped
//! (`2021-01-05 10:00:00 INFO:snooper-count:message`) and go to stderr, or to
//! a file chosen with `--logfilename`. Report lines from `log` go to stdout.
//! With run logging enabled every line is also kept under
//! `logs/<tool-name>/<date>/run-<timestamp>.log`.
//!
//! The logger is shared by worker threads, so all methods take `&self`.

pub mod logging {
    use std::fs;
    use std::io::Write;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    use anyhow::Result;
    use chrono::{DateTime, Local};

    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
    pub enum Level {
        Debug,
        Info,
        Warning,
        Error,
    }

    impl Level {
        /// Exactly one of the flags selects its level; anything else stays at Info.
        pub fn from_flags(debug: bool, warning: bool, error: bool) -> Self {
            match (debug, warning, error) {
                (true, false, false) => Level::Debug,
                (false, true, false) => Level::Warning,
                (false, false, true) => Level::Error,
                _ => Level::Info,
            }
        }

        pub fn label(self) -> &'static str {
            match self {
                Level::Debug => "DEBUG",
                Level::Info => "INFO",
                Level::Warning => "WARNING",
                Level::Error => "ERROR",
            }
        }
    }

    /// Logger for a snooper tool
    pub struct ToolLogger {
        tool_name: String,
        level: Level,
        /// Diagnostics go here instead of stderr when set.
        diag_file: Option<Mutex<fs::File>>,
        run_file: Option<Mutex<fs::File>>,
        log_path: Option<PathBuf>,
        start_time: DateTime<Local>,
    }

    impl ToolLogger {
        /// Create a logger without a run log file
        pub fn new_disabled() -> Self {
            ToolLogger {
                tool_name: String::new(),
                level: Level::Info,
                diag_file: None,
                run_file: None,
                log_path: None,
                start_time: Local::now(),
            }
        }

        /// Create a new logger for a tool with a run log file
        ///
        /// Creates log directory structure: logs/<tool-name>/<YYYY-MM-DD>/run-<HH-MM-SS>.log
        /// If log creation fails, continues without the run log
        pub fn new(tool_name: &str) -> Self {
            let start_time = Local::now();

            let (run_file, log_path) = match Self::create_log_file(tool_name, &start_time) {
                Ok((file, path)) => (Some(Mutex::new(file)), Some(path)),
                Err(e) => {
                    eprintln!("Warning: Could not create log file: {e}");
                    eprintln!("Continuing without logging...");
                    (None, None)
                }
            };

            ToolLogger {
                tool_name: tool_name.to_string(),
                level: Level::Info,
                diag_file: None,
                run_file,
                log_path,
                start_time,
            }
        }

        pub fn with_name(mut self, tool_name: &str) -> Self {
            self.tool_name = tool_name.to_string();
            self
        }

        pub fn with_level(mut self, level: Level) -> Self {
            self.level = level;
            self
        }

        /// Send diagnostics to `path` instead of stderr.
        pub fn with_diagnostics_file(mut self, path: &Path) -> Result<Self> {
            let file = fs::OpenOptions::new().create(true).append(true).open(path)?;
            self.diag_file = Some(Mutex::new(file));
            Ok(self)
        }

        /// Create the log file and directory structure
        fn create_log_file(tool_name: &str, start_time: &DateTime<Local>) -> Result<(fs::File, PathBuf)> {
            let date_str = start_time.format("%Y-%m-%d").to_string();
            let time_str = start_time.format("%H-%M-%S").to_string();

            let log_dir = PathBuf::from("logs").join(tool_name).join(&date_str);
            fs::create_dir_all(&log_dir)?;

            let log_path = log_dir.join(format!("run-{time_str}.log"));
            let log_file = fs::File::create(&log_path)?;

            Ok((log_file, log_path))
        }

        pub fn level(&self) -> Level {
            self.level
        }

        pub fn enabled(&self, level: Level) -> bool {
            level >= self.level
        }

        fn write_to(file: &Option<Mutex<fs::File>>, line: &str) {
            if let Some(file) = file {
                let mut file = file.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                let _ = writeln!(file, "{line}");
            }
        }

        fn emit(&self, level: Level, message: &str) {
            if !self.enabled(level) {
                return;
            }
            let line = format!(
                "{} {}:{}:{}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                level.label(),
                self.tool_name,
                message
            );
            if self.diag_file.is_some() {
                Self::write_to(&self.diag_file, &line);
            } else {
                eprintln!("{line}");
            }
            Self::write_to(&self.run_file, &line);
        }

        pub fn debug(&self, message: &str) {
            self.emit(Level::Debug, message);
        }

        pub fn info(&self, message: &str) {
            self.emit(Level::Info, message);
        }

        pub fn warn(&self, message: &str) {
            self.emit(Level::Warning, message);
        }

        pub fn error(&self, message: &str) {
            self.emit(Level::Error, message);
        }

        /// Log a report line to both stdout and the run log
        pub fn log(&self, message: &str) {
            println!("{message}");
            Self::write_to(&self.run_file, message);
        }

        /// Log without printing to stdout (run log only)
        pub fn log_silent(&self, message: &str) {
            Self::write_to(&self.run_file, message);
        }

        /// Get the path to the run log file (if enabled)
        pub fn log_path(&self) -> Option<&Path> {
            self.log_path.as_deref()
        }

        /// Finalize the run log with summary information
        pub fn finalize(&self, summary: &str) {
            let end_time = Local::now();
            let duration = end_time.signed_duration_since(self.start_time);

            self.log_silent("");
            self.log_silent("=== Run Summary ===");
            self.log_silent(summary);
            self.log_silent(&format!("Started: {}", self.start_time.format("%Y-%m-%d %H:%M:%S")));
            self.log_silent(&format!("Ended: {}", end_time.format("%Y-%m-%d %H:%M:%S")));
            self.log_silent(&format!("Duration: {}ms", duration.num_milliseconds()));

            if let Some(ref path) = self.log_path {
                self.info(&format!("Log saved to: {}", path.display()));
            }
        }
    }

    impl Drop for ToolLogger {
        fn drop(&mut self) {
            for file in [&self.diag_file, &self.run_file].into_iter().flatten() {
                if let Ok(mut file) = file.lock() {
                    let _ = file.flush();
                }
            }
        }
    }
}
