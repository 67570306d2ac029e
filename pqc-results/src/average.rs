//! Averaging of per-run tables into one table per machine and metric category.
//!
//! Run 1 decides the column layout. For every group key (an algorithm and operation,
//! a signature/KEM/reuse triple, ...) the matching rows of all runs are collected and
//! each metric column is reduced to the arithmetic mean of its numeric cells. Empty or
//! unparseable cells are skipped rather than counted as zero; a column without a
//! single sample stays empty in the output.

use std::fs;
use std::path::PathBuf;

use anyhow::{ensure, Context};
use log::{debug, info, warn};
use pqc_results_util::file::StoreValue;

use crate::config::MatchMode;
use crate::table::{MetricRow, Table};
use crate::Error;

/// The group keys to emit average rows for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Groups {
    /// Declared keys, one entry per key column each; output rows follow this order
    Keys(Vec<Vec<String>>),
    /// Every distinct key of the first run, in order of first appearance
    FromFirstRun,
}

impl Groups {
    /// The cartesian product of the given key column values, first column outermost
    pub fn product(columns: &[&[&str]]) -> Self {
        let mut keys: Vec<Vec<String>> = vec![vec![]];
        for column in columns {
            keys = keys
                .into_iter()
                .flat_map(|prefix| {
                    column.iter().map(move |v| {
                        let mut key = prefix.clone();
                        key.push((*v).to_owned());
                        key
                    })
                })
                .collect();
        }
        Groups::Keys(keys)
    }
}

/// One averaging task
#[derive(Debug, Clone)]
pub struct AverageJob {
    /// Run tables in run order; the first one must exist
    pub runs: Vec<PathBuf>,
    /// Where the average table is written
    pub output: PathBuf,
    pub key_width: usize,
    pub groups: Groups,
    /// Key columns always compared exactly, whatever the match mode
    pub flag_columns: Vec<usize>,
}

/// Format a mean the way the result files expect it: always with a decimal point
pub fn format_mean(v: f64) -> String {
    let s = v.to_string();
    match s.contains('.') || !v.is_finite() {
        true => s,
        false => format!("{s}.0"),
    }
}

fn row_matches(row: &MetricRow, key: &[String], mode: MatchMode, flag_columns: &[usize]) -> bool {
    key.iter().enumerate().all(|(i, declared)| {
        let Some(cell) = row.key(i) else {
            return false;
        };
        match flag_columns.contains(&i) {
            true => cell.trim() == declared.trim(),
            false => mode.matches(declared, cell),
        }
    })
}

fn distinct_keys(table: &Table) -> Vec<Vec<String>> {
    let mut keys: Vec<Vec<String>> = vec![];
    for row in table.rows() {
        if !keys.contains(&row.keys) {
            keys.push(row.keys.clone());
        }
    }
    keys
}

/// Compute the average table of already loaded runs
///
/// `runs[0]` supplies the header. Every row of every run that matches a group key
/// contributes to that group's means.
pub fn average_tables(
    runs: &[Table],
    groups: &Groups,
    mode: MatchMode,
    flag_columns: &[usize],
) -> Option<Table> {
    let first = runs.first()?;
    let keys = match groups {
        Groups::Keys(keys) => keys.clone(),
        Groups::FromFirstRun => distinct_keys(first),
    };

    let mut out = Table::new(first.header(), first.key_width());
    for key in keys.iter() {
        let rows: Vec<&MetricRow> = runs
            .iter()
            .flat_map(|t| t.rows())
            .filter(|r| row_matches(r, key, mode, flag_columns))
            .collect();
        if rows.is_empty() {
            warn!("no rows for {key:?}, writing empty cells");
        }

        let means = (0..first.metric_width()).map(|col| {
            let samples: Vec<f64> = rows.iter().filter_map(|r| r.numeric(col)).collect();
            match samples.is_empty() {
                true => String::new(),
                false => format_mean(samples.iter().sum::<f64>() / samples.len() as f64),
            }
        });
        out.push(MetricRow::new(key.iter().cloned(), means));
    }
    Some(out)
}

/// Run an averaging job and write its output file
///
/// With a single run the run table is copied byte for byte. A missing first run is
/// fatal ([Error::MissingSchema]); later runs that can not be read are skipped with a
/// warning.
pub fn average(job: &AverageJob, mode: MatchMode) -> anyhow::Result<()> {
    ensure!(!job.runs.is_empty(), "no runs to average for {:?}", job.output);
    let first = &job.runs[0];
    if !first.is_file() {
        return Err(Error::MissingSchema(first.clone()).into());
    }
    if let Some(dir) = job.output.parent() {
        fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
    }

    if job.runs.len() == 1 {
        debug!("single run, copying {first:?} to {:?}", job.output);
        fs::copy(first, &job.output).map_err(|e| Error::io(&job.output, e))?;
        return Ok(());
    }

    let schema = Table::load(first, job.key_width).map_err(|e| {
        warn!("{e}");
        Error::MissingSchema(first.clone())
    })?;
    let mut runs = vec![schema];
    for path in job.runs.iter().skip(1) {
        match Table::load(path, job.key_width) {
            Ok(table) => runs.push(table),
            Err(e) => warn!("skipping run: {e}"),
        }
    }

    let table = average_tables(&runs, &job.groups, mode, &job.flag_columns)
        .context("no run table loaded")?;
    table
        .store(&job.output)
        .with_context(|| format!("could not write average table {:?}", job.output))?;
    info!(
        "averaged {} of {} runs into {:?}",
        runs.len(),
        job.runs.len(),
        job.output
    );
    Ok(())
}
