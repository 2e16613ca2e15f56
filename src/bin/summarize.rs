// Copyright (C) Brian G. Milnes 2025

//! Summarize module usage from daily datasets
//!
//! Loads every `YYYY-MM-DD*.csv.gz` dataset in a directory that matches the
//! date filter, merges them and prints per-day tables of module and machine
//! usage plus the most used modules.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use module_snooper::config::config::{default_workers, VerbosityArgs};
use module_snooper::dataset::dataset::Dataset;
use module_snooper::discovery::discovery::{list_dataset_files, DateFilter};
use module_snooper::reducer::reducer::reduce;
use module_snooper::report::report::{
    coverage_title, machine_by_day, module_usage_by_day, most_used_modules, render_ranked, source_counts,
};
use module_snooper::tool_runner::tool_runner::{parse_args_or_exit, run_tool};

#[derive(Parser)]
#[command(name = "snooper-summarize")]
#[command(about = "Summarize module usage from daily snooper datasets", long_about = None)]
struct Args {
    /// Directory holding the daily datasets
    #[arg(short, long)]
    logdir: PathBuf,

    /// Number of worker threads used to load datasets
    #[arg(short, long, default_value_t = default_workers())]
    numprocs: usize,

    /// Years to include, separated by comma
    #[arg(short, long, default_value = "2021")]
    years: String,

    /// Months to include, separated by comma
    #[arg(short, long, default_value = "")]
    months: String,

    /// Days of the month to include, separated by comma
    #[arg(short, long, default_value = "")]
    days: String,

    /// Modules tracked per day
    #[arg(
        long,
        value_delimiter = ',',
        default_value = "balsam,tensorflow,torch,horovod,scipy,numpy,h5py,sklearn,keras"
    )]
    modules: Vec<String>,

    /// Machine classes tracked per day
    #[arg(long, value_delimiter = ',', default_value = "thetaknl,thetagpu")]
    machines: Vec<String>,

    /// Number of most used modules to print
    #[arg(short, long, default_value_t = 20)]
    top: usize,

    #[command(flatten)]
    verbosity: VerbosityArgs,
}

fn main() -> Result<()> {
    let args: Args = parse_args_or_exit();

    run_tool(args.verbosity.tool_config("snooper-summarize"), |logger| {
        let filter = DateFilter::parse(&args.years, &args.months, &args.days).context("Invalid date filter")?;
        let files = list_dataset_files(&args.logdir, &filter)
            .with_context(|| format!("Failed to list datasets in {}", args.logdir.display()))?;
        logger.info(&format!("{} dataset files", files.len()));

        let (mut dataset, stats): (Dataset, _) =
            reduce(&files, |path| Dataset::read_csv_gz(path), args.numprocs, logger)?;
        dataset.sort();
        let source_map = dataset.assign_source_ids();

        logger.log("Sources:");
        for (id, source, runs) in source_counts(&dataset) {
            let id = id.map_or_else(|| "-".to_string(), |id| id.to_string());
            logger.log(&format!("{id:>4} {runs:>8} {source}"));
        }

        logger.log("");
        logger.log(&coverage_title(&dataset));

        logger.log("");
        logger.log("Module usage by day:");
        for line in module_usage_by_day(&dataset, &args.modules).render() {
            logger.log(&line);
        }

        logger.log("");
        logger.log("Machine usage by day:");
        for line in machine_by_day(&dataset, &args.machines).render() {
            logger.log(&line);
        }

        logger.log("");
        logger.log(&format!("Top {} modules:", args.top));
        for line in render_ranked(&most_used_modules(&dataset, args.top)) {
            logger.log(&line);
        }

        Ok(format!(
            "Summary: {} datasets, {} failed, {} rows, {} sources",
            stats.files,
            stats.failed,
            dataset.len(),
            source_map.len()
        ))
    })
}
