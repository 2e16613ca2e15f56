// Copyright (C) Brian G. Milnes 2025

//! Parallel reducer
//!
//! Fans a file list out over a rayon pool, turns each file into a partial
//! aggregate and folds the partials together. Aggregates merge by counter
//! addition or row concatenation, so the result does not depend on which
//! worker handled which file. A file that fails is logged and counts as empty.

pub mod reducer {
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    use rayon::prelude::*;

    use crate::dataset::dataset::{Dataset, DatasetRow, SystemNodes};
    use crate::error::error::{Result, SnoopError};
    use crate::exclusion::exclusion::ExclusionSet;
    use crate::frequency::frequency::FrequencyTable;
    use crate::logging::logging::ToolLogger;
    use crate::normalize::normalize::{PathNormalizer, SourceRewrite};
    use crate::prefix::prefix::SharedPrefixTable;
    use crate::record::record::{parse_file, DelimitedParser, ParsedFile};

    /// A partial result that can be merged with another from a disjoint file set.
    pub trait Aggregate: Default + Send {
        fn merge(self, other: Self) -> Self;
        fn is_empty(&self) -> bool;
    }

    impl Aggregate for FrequencyTable {
        fn merge(mut self, other: Self) -> Self {
            self.merge_from(other);
            self
        }

        fn is_empty(&self) -> bool {
            FrequencyTable::is_empty(self)
        }
    }

    impl Aggregate for Dataset {
        fn merge(mut self, other: Self) -> Self {
            self.append(other);
            self
        }

        fn is_empty(&self) -> bool {
            Dataset::is_empty(self)
        }
    }

    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct ReduceStats {
        pub files: usize,
        pub contributed: usize,
        pub failed: usize,
        pub elapsed: Duration,
    }

    /// Logs percent done and throughput about once per 1% of files.
    struct Progress<'a> {
        total: usize,
        step: usize,
        done: AtomicUsize,
        start: Instant,
        logger: &'a ToolLogger,
    }

    impl<'a> Progress<'a> {
        fn new(total: usize, logger: &'a ToolLogger) -> Self {
            Progress {
                total,
                step: (total / 100).max(1),
                done: AtomicUsize::new(0),
                start: Instant::now(),
                logger,
            }
        }

        fn tick(&self) {
            let done = self.done.fetch_add(1, Ordering::Relaxed) + 1;
            if done % self.step != 0 {
                return;
            }
            let secs = self.start.elapsed().as_secs_f64().max(f64::EPSILON);
            self.logger.info(&format!(
                "percent done: {:3}%   files/second: {:10.2}",
                done * 100 / self.total,
                done as f64 / secs
            ));
        }
    }

    fn build_pool(workers: usize) -> Result<rayon::ThreadPool> {
        rayon::ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .build()
            .map_err(|e| SnoopError::Config(format!("cannot build worker pool: {e}")))
    }

    /// General form: explicit identity and merge functions.
    pub fn reduce_with<A, P, I, M>(
        files: &[PathBuf],
        parse_fn: P,
        identity: I,
        merge_fn: M,
        is_empty: fn(&A) -> bool,
        workers: usize,
        logger: &ToolLogger,
    ) -> Result<(A, ReduceStats)>
    where
        A: Send,
        P: Fn(&Path) -> Result<A> + Sync,
        I: Fn() -> A + Sync + Send,
        M: Fn(A, A) -> A + Sync + Send,
    {
        let pool = build_pool(workers)?;
        let progress = Progress::new(files.len(), logger);
        let failed = AtomicUsize::new(0);
        let contributed = AtomicUsize::new(0);

        logger.debug(&format!("reducing {} files on {} workers", files.len(), workers));
        let aggregate = pool.install(|| {
            files
                .par_iter()
                .filter_map(|file| {
                    let outcome = parse_fn(file);
                    progress.tick();
                    match outcome {
                        Ok(partial) if is_empty(&partial) => None,
                        Ok(partial) => {
                            contributed.fetch_add(1, Ordering::Relaxed);
                            Some(partial)
                        }
                        Err(e) => {
                            failed.fetch_add(1, Ordering::Relaxed);
                            logger.warn(&format!("failed to parse {}: {e}", file.display()));
                            None
                        }
                    }
                })
                .fold(&identity, &merge_fn)
                .reduce(&identity, &merge_fn)
        });

        let stats = ReduceStats {
            files: files.len(),
            contributed: contributed.into_inner(),
            failed: failed.into_inner(),
            elapsed: progress.start.elapsed(),
        };
        Ok((aggregate, stats))
    }

    /// Reduce with an `Aggregate` type's own merge.
    pub fn reduce<A, P>(files: &[PathBuf], parse_fn: P, workers: usize, logger: &ToolLogger) -> Result<(A, ReduceStats)>
    where
        A: Aggregate,
        P: Fn(&Path) -> Result<A> + Sync,
    {
        reduce_with(files, parse_fn, A::default, A::merge, |a: &A| a.is_empty(), workers, logger)
    }

    fn report_rejected(parsed: &mut ParsedFile, logger: &ToolLogger) {
        for rejected in parsed.rejected.drain(..) {
            logger.warn(&rejected.to_string());
        }
    }

    /// A file whose every unit was rejected fails as a whole.
    fn parse_or_fail(path: &Path, parser: &DelimitedParser, logger: &ToolLogger) -> Result<ParsedFile> {
        let mut parsed = parse_file(path, parser)?;
        if parsed.records.is_empty() && !parsed.rejected.is_empty() {
            return Err(parsed.rejected.remove(0));
        }
        report_rejected(&mut parsed, logger);
        Ok(parsed)
    }

    /// Everything a worker needs to count one file.
    pub struct CountContext<'a> {
        pub parser: &'a DelimitedParser,
        pub normalizer: &'a PathNormalizer,
        pub prefixes: &'a SharedPrefixTable,
        pub logger: &'a ToolLogger,
    }

    /// Frequency table for one log file; each record counts a key once.
    pub fn count_file(path: &Path, ctx: &CountContext<'_>) -> Result<FrequencyTable> {
        let parsed = parse_or_fail(path, ctx.parser, ctx.logger)?;
        let mut table = FrequencyTable::new();
        for record in &parsed.records {
            table.add_all(ctx.normalizer.normalize_record(record, ctx.prefixes));
        }
        Ok(table)
    }

    /// Everything a worker needs to turn one file into dataset rows.
    pub struct RowContext<'a> {
        pub parser: &'a DelimitedParser,
        pub nodes: &'a SystemNodes,
        pub rewrite: &'a SourceRewrite,
        pub ignore: &'a ExclusionSet,
        pub logger: &'a ToolLogger,
    }

    /// Dataset rows for one log file.
    pub fn build_rows(path: &Path, ctx: &RowContext<'_>) -> Result<Dataset> {
        let parsed = parse_or_fail(path, ctx.parser, ctx.logger)?;
        let filename = path.display().to_string();
        let mut dataset = Dataset::new();
        for record in &parsed.records {
            match DatasetRow::from_record(record, &filename, ctx.nodes, ctx.rewrite, ctx.ignore) {
                Ok(row) => dataset.push(row),
                Err(e) => ctx.logger.warn(&e.to_string()),
            }
        }
        Ok(dataset)
    }

    /// Register search paths before fan-out so workers see a settled table.
    ///
    /// Files are read in parallel but registered in sorted path order, taking
    /// the first `sample` of them. Aliases then depend only on the file set,
    /// not on scheduling. Returns how many prefixes were added.
    pub fn seed_prefixes(
        files: &[PathBuf],
        sample: usize,
        parser: &DelimitedParser,
        prefixes: &SharedPrefixTable,
        workers: usize,
        logger: &ToolLogger,
    ) -> Result<usize> {
        let mut ordered: Vec<&PathBuf> = files.iter().collect();
        ordered.sort();
        ordered.truncate(sample);

        let pool = build_pool(workers)?;
        let search_paths: Vec<Vec<Vec<String>>> = pool.install(|| {
            ordered
                .par_iter()
                .map(|file| match parse_file(file, parser) {
                    Ok(parsed) => parsed.records.into_iter().map(|r| r.search_paths).collect(),
                    Err(e) => {
                        logger.debug(&format!("seed pass skipped {}: {e}", file.display()));
                        Vec::new()
                    }
                })
                .collect()
        });

        let mut added = 0;
        for paths in search_paths.iter().flatten() {
            added += prefixes.load_prefixes(paths);
        }
        Ok(added)
    }
}
