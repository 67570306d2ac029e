//! Generation of the algorithm list files from the installed libraries.
//!
//! The liboqs test binaries print their supported algorithms in the usage message
//! when started without arguments; the OQS provider is asked through
//! `openssl list -<kem|signature>-algorithms`.

use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{ensure, Context};
use log::{debug, info};
use pqc_results_util::file::write_file;

use crate::algorithms::{
    AlgClass, AlgorithmList, CLASSIC_KEM_ALGS_FILE, CLASSIC_SIG_ALGS_FILE, KEM_ALGS_FILE,
    SIG_ALGS_FILE, TLS_HYBRID_KEM_ALGS_FILE, TLS_HYBRID_SIG_ALGS_FILE, TLS_KEM_ALGS_FILE,
    TLS_SIG_ALGS_FILE, TLS_SPEED_KEM_ALGS_FILE, TLS_SPEED_SIG_ALGS_FILE,
};
use crate::config::TlsConfig;
use crate::layout::ProjectRoot;
use crate::pipeline::ToolSelection;
use crate::Error;

/// Curves used for the classic TLS key exchange tests
pub const CLASSIC_KEMS: [&str; 3] = ["prime256v1", "secp384r1", "secp521r1"];

/// Algorithms listed in the usage message of a liboqs test binary
pub fn liboqs_algorithms(usage: &str) -> AlgorithmList {
    let Some((_, list)) = usage.split_once("algname:") else {
        return AlgorithmList::default();
    };
    AlgorithmList::new(
        list.split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_owned),
    )
}

/// PQC and hybrid algorithms from `openssl list` output (`name @ provider` lines)
///
/// Hybrid names combine a classic and a PQC algorithm with an underscore.
pub fn provider_algorithms(listing: &str) -> (AlgorithmList, AlgorithmList) {
    let (hybrid, pqc): (Vec<&str>, Vec<&str>) = listing
        .lines()
        .map(|line| line.split(" @ ").next().unwrap_or_default().trim())
        .filter(|name| !name.is_empty())
        .partition(|name| name.contains('_'));
    (AlgorithmList::new(pqc), AlgorithmList::new(hybrid))
}

fn store_list(dir: &Path, file: &str, list: &AlgorithmList) -> anyhow::Result<()> {
    debug!("writing {} algorithms to {file}", list.len());
    write_file(dir.join(file), list.to_text().as_bytes())
}

/// Remove every file in the algorithm list directory, creating it if needed
fn clear_dir(dir: &Path) -> anyhow::Result<()> {
    if !dir.is_dir() {
        fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
        return Ok(());
    }
    for entry in fs::read_dir(dir).map_err(|e| Error::io(dir, e))? {
        let path = entry.map_err(|e| Error::io(dir, e))?.path();
        if path.is_file() {
            fs::remove_file(&path).map_err(|e| Error::io(&path, e))?;
        }
    }
    Ok(())
}

fn liboqs_lists(root: &ProjectRoot, dir: &Path) -> anyhow::Result<()> {
    for class in AlgClass::all() {
        let bin = root.liboqs_test_bins().join(format!("test_{}", class.name()));
        ensure!(bin.is_file(), "liboqs test binary {bin:?} not found");

        let out = Command::new(&bin)
            .output()
            .with_context(|| format!("could not run {bin:?}"))?;
        let list = liboqs_algorithms(&String::from_utf8_lossy(&out.stderr));
        ensure!(!list.is_empty(), "{bin:?} did not list any algorithms");

        let file = match class {
            AlgClass::Kem => KEM_ALGS_FILE,
            AlgClass::Sig => SIG_ALGS_FILE,
        };
        store_list(dir, file, &list)?;
        info!("found {} liboqs {} algorithms", list.len(), class.name());
    }
    Ok(())
}

/// `LD_LIBRARY_PATH` with the OpenSSL library directory in front
fn library_path(openssl: &Path) -> OsString {
    let lib64 = openssl.join("lib64");
    let lib: PathBuf = match lib64.is_dir() {
        true => lib64,
        false => openssl.join("lib"),
    };
    let mut value = lib.into_os_string();
    value.push(":");
    value.push(env::var_os("LD_LIBRARY_PATH").unwrap_or_default());
    value
}

fn provider_lists(root: &ProjectRoot, dir: &Path, tls: &TlsConfig) -> anyhow::Result<()> {
    let openssl_dir = root.openssl_dir();
    let openssl = openssl_dir.join("bin").join("openssl");
    ensure!(openssl.is_file(), "openssl binary {openssl:?} not found");

    for class in AlgClass::all() {
        let kind = match class {
            AlgClass::Kem => "kem",
            AlgClass::Sig => "signature",
        };
        let list_flag = format!("-{kind}-algorithms");
        let out = Command::new(&openssl)
            .args(["list", list_flag.as_str(), "-provider", "oqsprovider"])
            .env("LD_LIBRARY_PATH", library_path(&openssl_dir))
            .output()
            .with_context(|| format!("could not run {openssl:?}"))?;
        ensure!(
            out.status.success(),
            "listing the oqsprovider {kind} algorithms failed: {}",
            String::from_utf8_lossy(&out.stderr).trim()
        );

        let (pqc, hybrid) = provider_algorithms(&String::from_utf8_lossy(&out.stdout));
        let (pqc_file, speed_file, hybrid_file) = match class {
            AlgClass::Kem => (TLS_KEM_ALGS_FILE, TLS_SPEED_KEM_ALGS_FILE, TLS_HYBRID_KEM_ALGS_FILE),
            AlgClass::Sig => (TLS_SIG_ALGS_FILE, TLS_SPEED_SIG_ALGS_FILE, TLS_HYBRID_SIG_ALGS_FILE),
        };
        store_list(dir, pqc_file, &pqc)?;
        store_list(dir, speed_file, &pqc)?;
        store_list(dir, hybrid_file, &hybrid)?;
        info!(
            "found {} pqc and {} hybrid oqs-provider {kind} algorithms",
            pqc.len(),
            hybrid.len()
        );
    }

    store_list(dir, CLASSIC_KEM_ALGS_FILE, &AlgorithmList::new(CLASSIC_KEMS))?;
    store_list(
        dir,
        CLASSIC_SIG_ALGS_FILE,
        &AlgorithmList::new(tls.classic_algs.iter().cloned()),
    )?;
    Ok(())
}

/// Regenerate the algorithm lists for the installed tools
///
/// Existing list files are removed first.
pub fn generate(root: &ProjectRoot, tools: ToolSelection, tls: &TlsConfig) -> anyhow::Result<()> {
    let dir = root.alg_lists_dir();
    clear_dir(&dir)?;
    if tools.liboqs() {
        liboqs_lists(root, &dir)?;
    }
    if tools.provider() {
        provider_lists(root, &dir, tls)?;
    }
    info!("algorithm lists written to {dir:?}");
    Ok(())
}
