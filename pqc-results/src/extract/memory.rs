//! Peak memory usage from valgrind massif reports (as printed by `ms_print`).

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use super::{empty_cells, fit_cells, read_artifact};

/// Number of metric cells taken from the peak snapshot line
/// (instructions, total bytes, useful heap, extra heap, stack)
pub const PEAK_FIELDS: usize = 5;

const SNAPSHOT_LIST_PREFIX: &str = " Detailed snapshots: [";

fn peak_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+) \(peak\)").expect("static regex is valid"))
}

/// Index of the peak snapshot as announced by the detailed snapshot list
fn peak_index(line: &str) -> Option<u64> {
    line.strip_prefix(SNAPSHOT_LIST_PREFIX)?;
    peak_regex()
        .captures(line)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Extract the metric fields of the peak snapshot
///
/// Thousands separators are removed and the leading snapshot number is dropped.
/// Returns `None` if the report names no peak or the peak snapshot line is absent.
pub fn peak_metrics(report: &str) -> Option<Vec<String>> {
    let mut peak = None;
    for line in report.lines() {
        if let Some(idx) = peak_index(line) {
            peak = Some(idx.to_string());
            continue;
        }
        let Some(ref idx) = peak else { continue };

        let cleaned = line.replace(',', "");
        let mut fields = cleaned.split_whitespace();
        if fields.next() == Some(idx.as_str()) {
            return Some(fields.map(str::to_owned).collect());
        }
    }
    None
}

/// Peak metrics of the report at `path`, always exactly `width` cells
///
/// A missing report or a report without a peak snapshot yields empty cells.
pub fn read_peak(path: &Path, width: usize) -> Vec<String> {
    let Some(report) = read_artifact(path) else {
        return empty_cells(width);
    };
    match peak_metrics(&report) {
        Some(cells) => {
            if cells.len() != width {
                log::warn!(
                    "peak snapshot in {path:?} has {} fields, expected {width}",
                    cells.len()
                );
            }
            fit_cells(cells, width)
        }
        None => {
            log::warn!("no peak snapshot found in {path:?}");
            empty_cells(width)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const REPORT: &str = "\
--------------------------------------------------------------------------------
Command:            ./test_kem_mem Kyber512 0
Massif arguments:   --stacks=yes
--------------------------------------------------------------------------------

    KB
3.758^                                                                      #
     |                                                                      #
   0 +----------------------------------------------------------------------->ki
     0                                                                   190.5

Number of snapshots: 14
 Detailed snapshots: [1, 5, 9 (peak), 13]

--------------------------------------------------------------------------------
  n        time(i)         total(B)   useful-heap(B) extra-heap(B)    stacks(B)
--------------------------------------------------------------------------------
  0              0                0                0             0            0
  1          1,204              488                0             0          488
  9        190,538            3,848            3,264           584            0
 10        190,600            3,000            2,000           584          416
";

    #[test]
    fn test_peak_metrics() {
        assert_eq!(
            peak_metrics(REPORT),
            Some(vec![
                "190538".into(),
                "3848".into(),
                "3264".into(),
                "584".into(),
                "0".into()
            ])
        );
    }

    #[test]
    fn test_peak_at_snapshot_zero() {
        let report = " Detailed snapshots: [0 (peak)]\n  0      12      1,000      900      100       0\n";
        assert_eq!(
            peak_metrics(report).map(|v| v.len()),
            Some(PEAK_FIELDS)
        );
    }

    #[test]
    fn test_multi_digit_peak_does_not_match_prefix() {
        let report = " Detailed snapshots: [9, 90 (peak)]\n  9  1  2  3  4  5\n 90  6  7  8  9  10\n";
        assert_eq!(
            peak_metrics(report),
            Some(vec!["6".into(), "7".into(), "8".into(), "9".into(), "10".into()])
        );
    }

    #[test]
    fn test_no_peak_marker() {
        assert_eq!(peak_metrics("  9  1  2  3  4  5\n"), None);
        assert_eq!(
            peak_metrics(" Detailed snapshots: [1, 5 (peak)]\n  1  1 2 3 4 5\n"),
            None
        );
    }

    #[test]
    fn test_read_peak_missing_file_gives_placeholders() {
        let cells = read_peak(Path::new("/nonexistent/Kyber512-0-1.txt"), PEAK_FIELDS);
        assert_eq!(cells, vec![String::new(); PEAK_FIELDS]);
    }
}
