//! liboqs CPU speed and memory results of one machine.

use log::{info, warn};

use super::{store_table, Context, Outcome};
use crate::algorithms::{AlgClass, LiboqsAlgorithms};
use crate::average::{average, AverageJob, Groups};
use crate::extract::memory::{read_peak, PEAK_FIELDS};
use crate::extract::read_artifact;
use crate::extract::speed::liboqs_table;
use crate::layout::{LiboqsPaths, MachineId};
use crate::normalize;
use crate::session::{prepare_output_dirs, Prepared};
use crate::Error;

/// Normalize every run of `machine`, then average them
pub fn parse_machine(
    ctx: &mut Context,
    algs: &LiboqsAlgorithms,
    machine: &MachineId,
) -> anyhow::Result<Outcome> {
    let paths = ctx.root.liboqs(machine);
    let prepared = prepare_output_dirs(
        machine,
        &paths.machine_results,
        &paths.output_dirs(),
        ctx.operator.as_mut(),
    )?;
    if prepared == Prepared::Aborted {
        return Ok(Outcome::Aborted);
    }

    for run in ctx.runs() {
        for class in AlgClass::all() {
            speed_run(&paths, algs, class, run)?;
            memory_run(&paths, algs, class, run)?;
        }
        info!("normalized liboqs run {run} of machine-{machine}");
    }

    average_machine(ctx, algs, machine)?;
    Ok(Outcome::Completed)
}

fn speed_run(
    paths: &LiboqsPaths,
    algs: &LiboqsAlgorithms,
    class: AlgClass,
    run: usize,
) -> anyhow::Result<()> {
    let source = paths.raw_speed_report(class, run);
    let Some(report) = read_artifact(&source) else {
        warn!("no {} speed table for run {run}", class.name());
        return Ok(());
    };
    let raw = liboqs_table(&report).ok_or_else(|| Error::MissingHeader(source.clone()))?;
    let table = normalize::liboqs_speed(&raw, algs.get(class), class.operations(), &source)?;
    store_table(&table, &paths.speed_run(class, run))
}

fn memory_run(
    paths: &LiboqsPaths,
    algs: &LiboqsAlgorithms,
    class: AlgClass,
    run: usize,
) -> anyhow::Result<()> {
    let table = normalize::memory(class, algs.get(class), |alg, op_index| {
        read_peak(&paths.raw_mem_report(class, alg, op_index, run), PEAK_FIELDS)
    });
    store_table(&table, &paths.mem_run(class, run))
}

/// Average the memory and speed tables of `machine`
pub fn average_machine(
    ctx: &Context,
    algs: &LiboqsAlgorithms,
    machine: &MachineId,
) -> anyhow::Result<()> {
    let paths = ctx.root.liboqs(machine);
    for class in AlgClass::all() {
        let names: Vec<&str> = algs.get(class).iter().collect();
        let groups = Groups::product(&[names.as_slice(), class.operations()]);

        let memory = AverageJob {
            runs: ctx.runs().map(|r| paths.mem_run(class, r)).collect(),
            output: paths.mem_avg(class),
            key_width: 2,
            groups: groups.clone(),
            flag_columns: vec![],
        };
        average(&memory, ctx.config.match_mode)?;

        let speed = AverageJob {
            runs: ctx.runs().map(|r| paths.speed_run(class, r)).collect(),
            output: paths.speed_avg(class),
            key_width: 2,
            groups,
            flag_columns: vec![],
        };
        average(&speed, ctx.config.match_mode)?;
    }
    Ok(())
}
