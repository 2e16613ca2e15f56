// Copyright (C) Brian G. Milnes 2025

//! Summaries of a merged dataset, in the shape a plotting layer would draw:
//! module usage per day of month, machine usage per day of month, runs per
//! interpreter source, and the most used modules.

pub mod report {
    use std::collections::BTreeMap;

    use chrono::{Datelike, NaiveDate};

    use crate::dataset::dataset::{Dataset, DatasetRow};
    use crate::frequency::frequency::FrequencyTable;

    /// Counts per day of month, one column per tracked name.
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct DayTable {
        pub columns: Vec<String>,
        pub rows: BTreeMap<u32, Vec<u64>>,
    }

    impl DayTable {
        fn build<F>(dataset: &Dataset, columns: &[String], hit: F) -> Self
        where
            F: Fn(&DatasetRow, &str) -> bool,
        {
            let mut rows: BTreeMap<u32, Vec<u64>> = BTreeMap::new();
            for row in dataset.rows() {
                for (i, column) in columns.iter().enumerate() {
                    if hit(row, column) {
                        let counts = rows
                            .entry(row.timestamp.day())
                            .or_insert_with(|| vec![0; columns.len()]);
                        counts[i] += 1;
                    }
                }
            }
            DayTable {
                columns: columns.to_vec(),
                rows,
            }
        }

        pub fn get(&self, day: u32, column: &str) -> u64 {
            let Some(i) = self.columns.iter().position(|c| c == column) else {
                return 0;
            };
            self.rows.get(&day).map(|counts| counts[i]).unwrap_or(0)
        }

        pub fn render(&self) -> Vec<String> {
            let mut lines = Vec::new();
            let mut header = format!("{:>4}", "day");
            for column in &self.columns {
                header.push_str(&format!(" {:>12}", column));
            }
            lines.push(header);
            for (day, counts) in &self.rows {
                let mut line = format!("{day:>4}");
                for count in counts {
                    line.push_str(&format!(" {count:>12}"));
                }
                lines.push(line);
            }
            lines
        }
    }

    /// Rows using each module, per day of month.
    pub fn module_usage_by_day(dataset: &Dataset, modules: &[String]) -> DayTable {
        DayTable::build(dataset, modules, |row, module| row.uses(module))
    }

    /// Rows on each machine class, per day of month.
    pub fn machine_by_day(dataset: &Dataset, machines: &[String]) -> DayTable {
        DayTable::build(dataset, machines, |row, machine| row.flag(machine))
    }

    /// Module occurrence counts across all rows.
    pub fn module_counts(dataset: &Dataset) -> FrequencyTable {
        let mut table = FrequencyTable::new();
        for row in dataset.rows() {
            table.add_all(row.modules.iter().cloned());
        }
        table
    }

    pub fn most_used_modules(dataset: &Dataset, top_n: usize) -> Vec<(String, u64)> {
        module_counts(dataset).most_common(top_n)
    }

    /// `(source_id, source, runs)` ordered by source id.
    pub fn source_counts(dataset: &Dataset) -> Vec<(Option<usize>, String, u64)> {
        let mut counts: BTreeMap<(Option<usize>, String), u64> = BTreeMap::new();
        for row in dataset.rows() {
            *counts.entry((row.source_id, row.source.clone())).or_insert(0) += 1;
        }
        counts.into_iter().map(|((id, source), n)| (id, source, n)).collect()
    }

    /// First and last date covered by the dataset.
    pub fn coverage(dataset: &Dataset) -> Option<(NaiveDate, NaiveDate)> {
        let dates = dataset.rows().iter().map(|r| r.timestamp.date());
        let min = dates.clone().min()?;
        let max = dates.max()?;
        Some((min, max))
    }

    pub fn coverage_title(dataset: &Dataset) -> String {
        match coverage(dataset) {
            Some((min, max)) => format!("Covers {min} to {max}"),
            None => "Covers no records".to_string(),
        }
    }

    /// `count key` lines for a ranked list.
    pub fn render_ranked(items: &[(String, u64)]) -> Vec<String> {
        items.iter().map(|(key, count)| format!("{count:>8} {key}")).collect()
    }
}
