//! Drives parsing and averaging over machines and runs.
//!
//! Machines are handled strictly one after another; within a machine every run is
//! normalized before any averaging starts.

pub mod liboqs;
pub mod provider;

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::Context as _;
use log::info;
use pqc_results_util::file::StoreValue;

use crate::algorithms::{LiboqsAlgorithms, ProviderAlgorithms};
use crate::config::ResultsConfig;
use crate::layout::{MachineId, ProjectRoot};
use crate::session::{operator_for, Operator};
use crate::table::Table;
use crate::Error;

/// Which benchmarking suite's results to process
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ToolSelection {
    Liboqs,
    OqsProvider,
    Both,
}

impl ToolSelection {
    pub fn liboqs(self) -> bool {
        matches!(self, ToolSelection::Liboqs | ToolSelection::Both)
    }

    pub fn provider(self) -> bool {
        matches!(self, ToolSelection::OqsProvider | ToolSelection::Both)
    }
}

/// How processing of a machine ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    /// Stopped on request, old results left untouched
    Aborted,
}

/// Everything a pipeline stage needs
pub struct Context {
    pub root: ProjectRoot,
    pub config: ResultsConfig,
    /// Number of runs per machine, at least 1
    pub total_runs: usize,
    pub operator: Box<dyn Operator>,
}

impl Context {
    pub fn new(root: ProjectRoot, config: ResultsConfig, total_runs: usize) -> Self {
        let operator = operator_for(
            config.collision,
            Duration::from_secs(config.poll_interval_secs),
        );
        Self::with_operator(root, config, total_runs, operator)
    }

    pub fn with_operator(
        root: ProjectRoot,
        config: ResultsConfig,
        total_runs: usize,
        operator: Box<dyn Operator>,
    ) -> Self {
        Self {
            root,
            config,
            total_runs,
            operator,
        }
    }

    /// Run numbers `1..=total_runs`
    pub fn runs(&self) -> impl Iterator<Item = usize> {
        1..=self.total_runs
    }
}

struct Lists {
    liboqs: Option<LiboqsAlgorithms>,
    provider: Option<ProviderAlgorithms>,
}

impl Lists {
    fn load(ctx: &Context, tools: ToolSelection) -> anyhow::Result<Self> {
        Ok(Self {
            liboqs: match tools.liboqs() {
                true => Some(LiboqsAlgorithms::load(&ctx.root)?),
                false => None,
            },
            provider: match tools.provider() {
                true => Some(ProviderAlgorithms::load(&ctx.root, &ctx.config.tls)?),
                false => None,
            },
        })
    }
}

/// Parse and average the results of every machine
///
/// Stops at the first machine whose processing was aborted.
pub fn parse(
    ctx: &mut Context,
    tools: ToolSelection,
    machines: &[MachineId],
) -> anyhow::Result<Outcome> {
    let lists = Lists::load(ctx, tools)?;
    for machine in machines {
        if let Some(algs) = lists.liboqs.as_ref() {
            info!("parsing liboqs results of machine-{machine}");
            if liboqs::parse_machine(ctx, algs, machine)? == Outcome::Aborted {
                return Ok(Outcome::Aborted);
            }
        }
        if let Some(algs) = lists.provider.as_ref() {
            info!("parsing oqs-provider results of machine-{machine}");
            if provider::parse_machine(ctx, algs, machine)? == Outcome::Aborted {
                return Ok(Outcome::Aborted);
            }
        }
    }
    Ok(Outcome::Completed)
}

/// Recompute the average tables from run tables parsed earlier
pub fn average_only(
    ctx: &Context,
    tools: ToolSelection,
    machines: &[MachineId],
) -> anyhow::Result<()> {
    let lists = Lists::load(ctx, tools)?;
    for machine in machines {
        if let Some(algs) = lists.liboqs.as_ref() {
            info!("averaging liboqs results of machine-{machine}");
            liboqs::average_machine(ctx, algs, machine)?;
        }
        if let Some(algs) = lists.provider.as_ref() {
            info!("averaging oqs-provider results of machine-{machine}");
            provider::average_machine(ctx, algs, machine)?;
        }
    }
    Ok(())
}

/// Write a run table, creating its directory if needed
fn store_table(table: &Table, path: &Path) -> anyhow::Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
    }
    table
        .store(path)
        .with_context(|| format!("could not write run table {path:?}"))?;
    log::debug!("wrote {} rows to {path:?}", table.len());
    Ok(())
}
