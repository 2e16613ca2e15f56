// Copyright (C) Brian G. Milnes 2025

//! Build the tabular module usage dataset
//!
//! Walks the snooper log directory (`YYYY/MM/DD/*`), parses every log file in
//! parallel into one row per process and writes the rows as gzipped CSV. The
//! source map (interpreter label -> id) and the prefix table are dumped next
//! to it.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use module_snooper::config::config::{default_workers, load_rewrite, AnalysisConfig, VerbosityArgs};
use module_snooper::dataset::dataset::{write_source_map, Dataset, SystemNodes};
use module_snooper::discovery::discovery::{list_partitions, DateFilter};
use module_snooper::exclusion::exclusion::ExclusionSet;
use module_snooper::prefix::prefix::{PrefixTable, SharedPrefixTable};
use module_snooper::reducer::reducer::{build_rows, reduce, seed_prefixes, RowContext};
use module_snooper::tool_runner::tool_runner::{parse_args_or_exit, run_tool};

#[derive(Parser)]
#[command(name = "snooper-build-dataset")]
#[command(
    about = "Walk the snooper log directory structure, parse the JSON files therein, and dump a compressed dataset",
    long_about = None
)]
struct Args {
    /// Path to the snooper log files
    #[arg(short, long)]
    logdir: PathBuf,

    /// Number of worker threads used to parse log files
    #[arg(short, long, default_value_t = default_workers())]
    numprocs: usize,

    /// Years to include, separated by comma
    #[arg(short, long, default_value = "2020")]
    years: String,

    /// Months to include, separated by comma
    #[arg(short, long, default_value = "")]
    months: String,

    /// Days of the month to include, separated by comma
    #[arg(short, long, default_value = "")]
    days: String,

    /// Output data file name, written as gzipped CSV
    #[arg(short, long, default_value = "output.csv.gz")]
    output: PathBuf,

    /// JSON list of modules to exclude from the output
    #[arg(long, default_value = "exclude_modules.json")]
    excluded: PathBuf,

    /// JSON object mapping machine names to hostname fragments
    #[arg(long, default_value = "system_nodes.json")]
    sysnodes: PathBuf,

    /// Where to dump the source map that labels each python environment
    #[arg(long, default_value = "source_map.json")]
    srcmap: PathBuf,

    /// JSON rules for commonizing interpreter paths (built-in rules otherwise)
    #[arg(long)]
    rewrite: Option<PathBuf>,

    /// Where to dump the prefix table
    #[arg(long)]
    prefixes_out: Option<PathBuf>,

    /// Pre-scan only the first N files (by path) for search paths; all by default, 0 disables
    #[arg(long)]
    seed: Option<usize>,

    #[command(flatten)]
    verbosity: VerbosityArgs,
}

fn main() -> Result<()> {
    let args: Args = parse_args_or_exit();

    run_tool(args.verbosity.tool_config("snooper-build-dataset"), |logger| {
        let filter = DateFilter::parse(&args.years, &args.months, &args.days).context("Invalid date filter")?;

        logger.info(&format!("logdir     = {}", args.logdir.display()));
        logger.info(&format!("years      = {}", args.years));
        logger.info(&format!("months     = {}", args.months));
        logger.info(&format!("days       = {}", args.days));
        logger.info(&format!("output     = {}", args.output.display()));
        logger.info(&format!("numprocs   = {}", args.numprocs));
        logger.info(&format!("excluded   = {}", args.excluded.display()));
        logger.info(&format!("sysnodes   = {}", args.sysnodes.display()));

        let exclusions = ExclusionSet::load(&args.excluded)
            .with_context(|| format!("Failed to load exclusion list: {}", args.excluded.display()))?;
        let nodes = SystemNodes::load(&args.sysnodes)
            .with_context(|| format!("Failed to load system nodes: {}", args.sysnodes.display()))?;
        let rewrite = load_rewrite(args.rewrite.as_deref()).context("Failed to load rewrite rules")?;
        let config = AnalysisConfig::default()
            .with_workers(args.numprocs)?
            .with_exclusions(exclusions)
            .with_rewrite(rewrite)
            .with_seed_sample(args.seed);

        let partitions = list_partitions(&args.logdir, &filter, logger)
            .with_context(|| format!("Failed to list log directory: {}", args.logdir.display()))?;
        for p in &partitions {
            logger.info(&format!("{:04}-{:02}-{:02}", p.year, p.month, p.day));
            logger.debug(&format!("{} #files: {}", p.dir.display(), p.files.len()));
        }
        let files: Vec<PathBuf> = partitions.into_iter().flat_map(|p| p.files).collect();
        logger.info(&format!("{} files", files.len()));

        let parser = config.parser();
        let prefixes = SharedPrefixTable::new(PrefixTable::new());
        let seed_count = config.seed_count(files.len());
        if seed_count > 0 {
            let added = seed_prefixes(&files, seed_count, &parser, &prefixes, config.workers, logger)?;
            logger.info(&format!("seeded {added} prefixes from {seed_count} files"));
        }

        let ctx = RowContext {
            parser: &parser,
            nodes: &nodes,
            rewrite: &config.rewrite,
            ignore: &config.exclusions,
            logger,
        };
        let (mut dataset, stats): (Dataset, _) =
            reduce(&files, |path| build_rows(path, &ctx), config.workers, logger)?;

        dataset.sort();
        let source_map = dataset.assign_source_ids();
        logger.info(&format!("dataset created: {} rows", dataset.len()));

        dataset
            .write_csv_gz(&args.output)
            .with_context(|| format!("Failed to write dataset: {}", args.output.display()))?;
        write_source_map(&source_map, &args.srcmap)
            .with_context(|| format!("Failed to write source map: {}", args.srcmap.display()))?;
        if let Some(path) = &args.prefixes_out {
            prefixes
                .snapshot()
                .write_json(path)
                .with_context(|| format!("Failed to write prefix table: {}", path.display()))?;
        }

        logger.info(&format!("total run time: {:10.2}", stats.elapsed.as_secs_f64()));
        Ok(format!(
            "Summary: {} files, {} rows, {} failed, {} sources",
            stats.files,
            dataset.len(),
            stats.failed,
            source_map.len()
        ))
    })
}
