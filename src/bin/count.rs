// Copyright (C) Brian G. Milnes 2025

//! Count imported module paths in snooper log files
//!
//! Reads Format A (delimited) and Format B (JSON) logs, normalizes module
//! paths against the interpreters' search paths and prints the used prefix
//! aliases followed by the top N (or all) imports.

use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use module_snooper::config::config::{AnalysisConfig, VerbosityArgs};
use module_snooper::exclusion::exclusion::ExclusionSet;
use module_snooper::frequency::frequency::FrequencyTable;
use module_snooper::normalize::normalize::DEFAULT_DEPTH;
use module_snooper::prefix::prefix::{PrefixTable, SharedPrefixTable};
use module_snooper::reducer::reducer::{count_file, reduce, seed_prefixes, CountContext};
use module_snooper::report::report::render_ranked;
use module_snooper::tool_runner::tool_runner::{parse_args_or_exit, run_tool};

/// Exclusion list picked up from the working directory when none is given.
const DEFAULT_IGNORE_FILE: &str = "IGNORE_MODULES";

#[derive(Parser)]
#[command(name = "snooper-count")]
#[command(about = "Count imported module paths in snooper log files", long_about = None)]
struct Args {
    /// Snooper log files
    #[arg(required = true, value_name = "LOG_FILE")]
    files: Vec<PathBuf>,

    /// Number of most common imports to print
    #[arg(short, long, default_value_t = 25)]
    top: usize,

    /// Print every import instead of the top N
    #[arg(long)]
    all: bool,

    /// Module names to exclude (JSON list or one name per line)
    #[arg(long)]
    excluded: Option<PathBuf>,

    /// Path segments kept after prefix substitution
    #[arg(long, default_value_t = DEFAULT_DEPTH)]
    depth: usize,

    /// Number of worker threads
    #[arg(short, long)]
    numprocs: Option<usize>,

    /// Accepted Format A sentinel (repeatable)
    #[arg(long = "sentinel")]
    sentinels: Vec<String>,

    /// Pre-scan only the first N files (by path) for search paths; all by default, 0 disables
    #[arg(long)]
    seed: Option<usize>,

    /// Write the prefix table as JSON here at the end of the run
    #[arg(long)]
    prefixes_out: Option<PathBuf>,

    #[command(flatten)]
    verbosity: VerbosityArgs,
}

fn main() -> Result<()> {
    let args: Args = parse_args_or_exit();

    for file in &args.files {
        if !file.is_file() {
            eprintln!("{} is not a file", file.display());
            std::process::exit(1);
        }
    }

    run_tool(args.verbosity.tool_config("snooper-count"), |logger| {
        let exclusions = match &args.excluded {
            Some(path) => ExclusionSet::load(path),
            None => ExclusionSet::load_optional(&PathBuf::from(DEFAULT_IGNORE_FILE)),
        }
        .context("Failed to load exclusion list")?;

        let mut config = AnalysisConfig::default()
            .with_depth(args.depth)?
            .with_sentinels(args.sentinels.clone())
            .with_exclusions(exclusions)
            .with_seed_sample(args.seed);
        if let Some(n) = args.numprocs {
            config = config.with_workers(n)?;
        }

        let files: Vec<PathBuf> = args.files.iter().cloned().collect::<BTreeSet<_>>().into_iter().collect();
        logger.info(&format!("files      = {}", files.len()));
        logger.info(&format!("numprocs   = {}", config.workers));
        logger.info(&format!("depth      = {}", config.depth));
        logger.info(&format!("excluded   = {} modules", config.exclusions.len()));

        let parser = config.parser();
        let normalizer = config.normalizer();
        let prefixes = SharedPrefixTable::new(PrefixTable::new());
        let seed_count = config.seed_count(files.len());
        if seed_count > 0 {
            let added = seed_prefixes(&files, seed_count, &parser, &prefixes, config.workers, logger)?;
            logger.info(&format!("seeded {added} prefixes from {seed_count} files"));
        }

        let ctx = CountContext {
            parser: &parser,
            normalizer: &normalizer,
            prefixes: &prefixes,
            logger,
        };
        let (counts, stats): (FrequencyTable, _) =
            reduce(&files, |path| count_file(path, &ctx), config.workers, logger)?;

        let table = prefixes.into_inner();
        logger.log("Prefixes:");
        for (prefix, alias) in table.used_prefixes() {
            logger.log(&format!("  {alias} {prefix}"));
        }

        if args.all {
            logger.log("Imports:");
            for line in render_ranked(&counts.sorted()) {
                logger.log(&line);
            }
        } else {
            logger.log(&format!("Top {} imports:", args.top));
            for line in render_ranked(&counts.most_common(args.top)) {
                logger.log(&line);
            }
        }

        if let Some(path) = &args.prefixes_out {
            table
                .write_json(path)
                .with_context(|| format!("Failed to write prefix table: {}", path.display()))?;
            logger.info(&format!("prefix table written to {}", path.display()));
        }

        Ok(format!(
            "Summary: {} files, {} contributed, {} failed, {} distinct imports, {} total",
            stats.files,
            stats.contributed,
            stats.failed,
            counts.len(),
            counts.total()
        ))
    })
}
