pub mod algorithms;
pub mod alg_lists;
pub mod average;
pub mod cli;
pub mod config;
pub mod extract;
pub mod layout;
pub mod normalize;
pub mod pipeline;
pub mod session;
pub mod table;

use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("could not find the project root marker {marker:?} in {start:?} or any of its parents")]
    RootNotFound { start: PathBuf, marker: &'static str },
    #[error("first run table {0:?} is missing, no column layout can be established")]
    MissingSchema(PathBuf),
    #[error("no `Operation` header line in speed report {0:?}")]
    MissingHeader(PathBuf),
    #[error("{path:?} holds {actual} operation rows, expected {expected} ({algorithms} algorithms with {operations} operations each)")]
    BlockMismatch {
        path: PathBuf,
        expected: usize,
        actual: usize,
        algorithms: usize,
        operations: usize,
    },
    #[error("i/o error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Helper to attach a path to an [std::io::Error]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
