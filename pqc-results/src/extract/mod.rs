//! Scraping of raw benchmark tool output.
//!
//! Extraction never fails past this module: a missing or malformed artifact turns into
//! empty cells so that every run table keeps the same number and order of rows.

pub mod handshake;
pub mod memory;
pub mod speed;

use std::fs;
use std::path::Path;

/// Read a raw artifact, logging and returning `None` if it can not be read
pub(crate) fn read_artifact(path: &Path) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(text) => Some(text),
        Err(e) => {
            log::warn!("missing file - {path:?} ({e})");
            None
        }
    }
}

/// `width` empty cells, the placeholder for a missing sample
pub(crate) fn empty_cells(width: usize) -> Vec<String> {
    vec![String::new(); width]
}

/// Pad with empty cells or truncate so exactly `width` cells remain
pub(crate) fn fit_cells(mut cells: Vec<String>, width: usize) -> Vec<String> {
    cells.resize(width, String::new());
    cells
}
