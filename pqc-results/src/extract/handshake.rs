//! Connection rates from `openssl s_time` transcripts.
//!
//! A transcript holds two blocks: full handshakes first, then (after a line mentioning
//! session id reuse) resumed handshakes. Each block ends with a user time line and a
//! real time line:
//!
//! ```text
//! 1234 connections in 1.23s; 1003.25 connections/user sec, bytes read 0
//! 1234 connections in 6 real seconds, 0 bytes read per connection
//! ```

use std::path::Path;

use super::{empty_cells, fit_cells, read_artifact};

/// Connections in user time, user time, connections per user second,
/// connections in real time, real time
pub const SESSION_FIELDS: usize = 5;

/// Which handshake block of a transcript to read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Session {
    FirstUse,
    Reused,
}

impl Session {
    /// Value of the `Reused Session ID` column for rows of this block
    pub fn flag(self) -> &'static str {
        match self {
            Session::FirstUse => "",
            Session::Reused => "*",
        }
    }

    pub fn all() -> [Session; 2] {
        [Session::FirstUse, Session::Reused]
    }
}

fn token(tokens: &[&str], i: usize) -> String {
    tokens.get(i).copied().unwrap_or_default().to_owned()
}

/// `1.23s;` -> `1.23`
fn drop_last_two(s: &str) -> String {
    let mut chars = s.chars();
    chars.next_back();
    chars.next_back();
    chars.as_str().to_owned()
}

/// Extract the five metrics of one block; missing values are empty cells
pub fn session_metrics(transcript: &str, session: Session) -> Vec<String> {
    let want_reused = session == Session::Reused;
    let mut in_reuse_block = false;
    let mut cells = Vec::with_capacity(SESSION_FIELDS);

    for line in transcript.lines() {
        if line.contains("reuse") {
            in_reuse_block = true;
        }
        if in_reuse_block != want_reused || !line.contains("connections") {
            continue;
        }

        let tokens: Vec<&str> = line.split_whitespace().collect();
        if line.contains("user") {
            cells.push(token(&tokens, 0));
            cells.push(drop_last_two(&token(&tokens, 3)));
            cells.push(token(&tokens, 4));
        } else if line.contains("real") {
            cells.push(token(&tokens, 0));
            cells.push(token(&tokens, 3));
            if session == Session::FirstUse {
                break;
            }
        }

        if cells.len() >= SESSION_FIELDS {
            break;
        }
    }

    fit_cells(cells, SESSION_FIELDS)
}

/// [session_metrics] of the transcript at `path`; a missing file gives empty cells
pub fn read_session_metrics(path: &Path, session: Session) -> Vec<String> {
    match read_artifact(path) {
        Some(transcript) => session_metrics(&transcript, session),
        None => empty_cells(SESSION_FIELDS),
    }
}
