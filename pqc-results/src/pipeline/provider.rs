//! OQS-Provider TLS handshake and `openssl speed` results of one machine.

use log::{info, warn};

use super::{store_table, Context, Outcome};
use crate::algorithms::{AlgClass, ProviderAlgorithms, TlsFamily};
use crate::average::{average, AverageJob, Groups};
use crate::extract::handshake::{read_session_metrics, Session};
use crate::extract::read_artifact;
use crate::extract::speed::openssl_rows;
use crate::layout::{MachineId, ProviderPaths};
use crate::normalize::{self, REUSE_FLAG_COLUMN};
use crate::session::{prepare_output_dirs, Prepared};

/// Normalize every run of `machine`, then average them
pub fn parse_machine(
    ctx: &mut Context,
    algs: &ProviderAlgorithms,
    machine: &MachineId,
) -> anyhow::Result<Outcome> {
    let paths = ctx.root.provider(machine);
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
        for family in TlsFamily::all() {
            handshake_run(ctx, &paths, algs, family, run)?;
        }
        classic_run(&paths, algs, run)?;
        for family in TlsFamily::all() {
            for class in AlgClass::all() {
                speed_run(&paths, family, class, run)?;
            }
        }
        info!("normalized oqs-provider run {run} of machine-{machine}");
    }

    average_machine(ctx, algs, machine)?;
    Ok(Outcome::Completed)
}

/// Base table of all signature/KEM pairs, then one table per signature
fn handshake_run(
    ctx: &Context,
    paths: &ProviderPaths,
    algs: &ProviderAlgorithms,
    family: TlsFamily,
    run: usize,
) -> anyhow::Result<()> {
    let base = normalize::handshake(algs.sigs(family), algs.kems(family), |sig, kem, session| {
        read_session_metrics(&paths.raw_handshake(family, run, sig, kem), session)
    });
    store_table(&base, &paths.base_run(family, run))?;

    for sig in algs.sigs(family).iter() {
        let table = normalize::split_by_key(&base, 0, sig, ctx.config.match_mode);
        store_table(&table, &paths.sig_run(family, sig, run))?;
    }
    Ok(())
}

fn classic_run(
    paths: &ProviderPaths,
    algs: &ProviderAlgorithms,
    run: usize,
) -> anyhow::Result<()> {
    let table =
        normalize::classic_handshake(&algs.ciphers, &algs.classic_algs, |cipher, alg, session| {
            read_session_metrics(&paths.raw_classic(run, cipher, alg), session)
        });
    store_table(&table, &paths.classic_run(run))
}

fn speed_run(
    paths: &ProviderPaths,
    family: TlsFamily,
    class: AlgClass,
    run: usize,
) -> anyhow::Result<()> {
    let rows = match read_artifact(&paths.raw_speed(family, class, run)) {
        Some(report) => openssl_rows(&report),
        None => {
            warn!(
                "no {} {} speed results for run {run}, writing an empty table",
                family.name(),
                class.name()
            );
            vec![]
        }
    };
    let table = normalize::tls_speed(rows, class);
    store_table(&table, &paths.speed_run(family, class, run))
}

/// Average the handshake and speed tables of `machine`
pub fn average_machine(
    ctx: &Context,
    algs: &ProviderAlgorithms,
    machine: &MachineId,
) -> anyhow::Result<()> {
    let paths = ctx.root.provider(machine);
    let mode = ctx.config.match_mode;
    let flags: Vec<&str> = Session::all().iter().map(|s| s.flag()).collect();

    for family in TlsFamily::all() {
        let kems: Vec<&str> = algs.kems(family).iter().collect();
        for sig in algs.sigs(family).iter() {
            let job = AverageJob {
                runs: ctx.runs().map(|r| paths.sig_run(family, sig, r)).collect(),
                output: paths.sig_avg(family, sig),
                key_width: 3,
                groups: Groups::product(&[&[sig], kems.as_slice(), flags.as_slice()]),
                flag_columns: vec![REUSE_FLAG_COLUMN],
            };
            average(&job, mode)?;
        }
    }

    let ciphers: Vec<&str> = algs.ciphers.iter().collect();
    let classic_algs: Vec<&str> = algs.classic_algs.iter().collect();
    let classic = AverageJob {
        runs: ctx.runs().map(|r| paths.classic_run(r)).collect(),
        output: paths.classic_avg(),
        key_width: 3,
        groups: Groups::product(&[
            ciphers.as_slice(),
            classic_algs.as_slice(),
            flags.as_slice(),
        ]),
        flag_columns: vec![REUSE_FLAG_COLUMN],
    };
    average(&classic, mode)?;

    for family in TlsFamily::all() {
        for class in AlgClass::all() {
            let job = AverageJob {
                runs: ctx
                    .runs()
                    .map(|r| paths.speed_run(family, class, r))
                    .collect(),
                output: paths.speed_avg(family, class),
                key_width: 1,
                groups: Groups::FromFirstRun,
                flag_columns: vec![],
            };
            average(&job, mode)?;
        }
    }
    Ok(())
}
