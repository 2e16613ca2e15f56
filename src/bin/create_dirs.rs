// Copyright (C) Brian G. Milnes 2025

//! Create the date-partitioned log directories for the next NUM_DAYS days
//!
//! Run ahead of time (e.g. from cron) so that the shutdown hook always finds
//! a writable day directory.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use module_snooper::config::config::VerbosityArgs;
use module_snooper::layout::layout::create_date_dirs;
use module_snooper::tool_runner::tool_runner::{parse_args_or_exit, run_tool};

#[derive(Parser)]
#[command(name = "snooper-create-dirs")]
#[command(about = "Create YYYY/MM/DD log directories for the next NUM_DAYS days", long_about = None)]
struct Args {
    /// Number of days, starting today
    #[arg(value_name = "NUM_DAYS")]
    num_days: u32,

    /// Log root under which the directories are created
    #[arg(long, default_value = ".")]
    root: PathBuf,

    #[command(flatten)]
    verbosity: VerbosityArgs,
}

fn main() -> Result<()> {
    let args: Args = parse_args_or_exit();

    run_tool(args.verbosity.tool_config("snooper-create-dirs"), |logger| {
        let today = Local::now().date_naive();
        let created = create_date_dirs(&args.root, today, args.num_days)
            .with_context(|| format!("Failed to create directories under {}", args.root.display()))?;
        for dir in &created {
            logger.debug(&format!("created {}", dir.display()));
        }
        Ok(format!("Summary: {} day directories from {}", created.len(), today))
    })
}
