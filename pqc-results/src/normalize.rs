//! Assembly of the per-run result tables from extracted cells.
//!
//! Every table has a fixed column order per category and every cell is trimmed
//! (see [Table::push]).

use std::path::Path;

use crate::algorithms::{AlgClass, AlgorithmList};
use crate::config::MatchMode;
use crate::extract::handshake::{Session, SESSION_FIELDS};
use crate::extract::speed::RawSpeedTable;
use crate::table::{MetricRow, Table};
use crate::Error;

pub const MEMORY_HEADER: [&str; 7] = [
    "Algorithm",
    "Operation",
    "intits",
    "maxBytes",
    "maxHeap",
    "extHeap",
    "maxStack",
];

pub const HANDSHAKE_HEADER: [&str; 8] = [
    "Signing Algorithm",
    "KEM Algorithm",
    "Reused Session ID",
    "Connections in User Time",
    "User Time (s)",
    "Connections Per User Second",
    "Connections in Real Time",
    "Real Time (s)",
];

pub const CLASSIC_HEADER: [&str; 8] = [
    "Ciphersuite",
    "Classic Algorithm",
    "Reused Session ID",
    "Connections in User Time",
    "User Time (s)",
    "Connections Per User Second",
    "Connections in Real Time",
    "Real Time (s)",
];

/// Column of the session reuse flag in handshake tables
pub const REUSE_FLAG_COLUMN: usize = 2;

pub const TLS_SPEED_KEM_HEADER: [&str; 7] = [
    "Algorithm",
    "Keygen",
    "encaps",
    "decaps",
    "Keygen/s",
    "Encaps/s",
    "Decaps/s",
];

pub const TLS_SPEED_SIG_HEADER: [&str; 7] = [
    "Algorithm",
    "Keygen",
    "Signs",
    "Verify",
    "Keygen/s",
    "sign/s",
    "verify/s",
];

/// Turn a liboqs speed table into `Algorithm, Operation, ...` rows
///
/// The tool prints one row naming the algorithm followed by one row per operation.
/// The naming rows are dropped and the algorithm column is filled in from the
/// position of each operation block in `algorithms`, so the remaining row count
/// has to be exactly one block per listed algorithm.
pub fn liboqs_speed(
    raw: &RawSpeedTable,
    algorithms: &AlgorithmList,
    operations: &[&str],
    source: &Path,
) -> Result<Table, Error> {
    let op_rows: Vec<&Vec<String>> = raw
        .rows
        .iter()
        .filter(|row| {
            row.first()
                .is_some_and(|name| !algorithms.contains(name.trim()))
        })
        .collect();

    let expected = algorithms.len() * operations.len();
    if op_rows.len() != expected {
        return Err(Error::BlockMismatch {
            path: source.to_owned(),
            expected,
            actual: op_rows.len(),
            algorithms: algorithms.len(),
            operations: operations.len(),
        });
    }

    let mut header = vec!["Algorithm".to_owned()];
    header.extend(raw.header.iter().cloned());
    let mut table = Table::new(&header, 2);

    let block_algs = algorithms
        .iter()
        .flat_map(|alg| std::iter::repeat(alg).take(operations.len()));
    for (alg, row) in block_algs.zip(op_rows) {
        let mut cells = row.iter().cloned();
        let operation = cells.next().unwrap_or_default();
        table.push(MetricRow::new([alg.to_owned(), operation], cells));
    }
    Ok(table)
}

/// Build a memory table, `peak` supplies the metric cells of an algorithm and
/// operation index
pub fn memory<F>(class: AlgClass, algorithms: &AlgorithmList, mut peak: F) -> Table
where
    F: FnMut(&str, usize) -> Vec<String>,
{
    let mut table = Table::new(&MEMORY_HEADER, 2);
    for alg in algorithms.iter() {
        for (op_index, op) in class.operations().iter().enumerate() {
            table.push(MetricRow::new([alg, *op], peak(alg, op_index)));
        }
    }
    table
}

fn session_table<F>(
    header: &[&str],
    outer: &AlgorithmList,
    inner: &AlgorithmList,
    mut metrics: F,
) -> Table
where
    F: FnMut(&str, &str, Session) -> Vec<String>,
{
    let mut table = Table::new(header, 3);
    for a in outer.iter() {
        for b in inner.iter() {
            for session in Session::all() {
                let cells = metrics(a, b, session);
                debug_assert_eq!(cells.len(), SESSION_FIELDS);
                table.push(MetricRow::new([a, b, session.flag()], cells));
            }
        }
    }
    table
}

/// Handshake table of one run: for every signature and KEM a first-use row
/// followed by a reused session row
pub fn handshake<F>(sigs: &AlgorithmList, kems: &AlgorithmList, metrics: F) -> Table
where
    F: FnMut(&str, &str, Session) -> Vec<String>,
{
    session_table(&HANDSHAKE_HEADER, sigs, kems, metrics)
}

/// Same as [handshake] keyed by ciphersuite and classic algorithm
pub fn classic_handshake<F>(ciphers: &AlgorithmList, algs: &AlgorithmList, metrics: F) -> Table
where
    F: FnMut(&str, &str, Session) -> Vec<String>,
{
    session_table(&CLASSIC_HEADER, ciphers, algs, metrics)
}

/// Rows of `table` whose key `column` matches `value`
pub fn split_by_key(table: &Table, column: usize, value: &str, mode: MatchMode) -> Table {
    table.filtered(|row| row.key(column).is_some_and(|cell| mode.matches(value, cell)))
}

/// Table of `openssl speed` rows, the algorithm name first
pub fn tls_speed(rows: Vec<Vec<String>>, class: AlgClass) -> Table {
    let header = match class {
        AlgClass::Kem => TLS_SPEED_KEM_HEADER,
        AlgClass::Sig => TLS_SPEED_SIG_HEADER,
    };
    let mut table = Table::new(&header, 1);
    for mut row in rows {
        if row.len() != header.len() {
            log::warn!(
                "speed row {row:?} has {} cells, expected {}",
                row.len(),
                header.len()
            );
        }
        let values = row.split_off(1.min(row.len()));
        table.push(MetricRow::new(row, values));
    }
    table
}
