//! Speed tables printed by the liboqs `speed_kem`/`speed_sig` tools and by
//! `openssl speed` with the OQS provider loaded.

use std::collections::HashMap;

/// A `|` separated liboqs speed table with its decoration removed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSpeedTable {
    /// Column names, trimmed; repeated names carry a `.1`, `.2`, ... suffix
    pub header: Vec<String>,
    /// Data rows, including the rows that only name an algorithm
    pub rows: Vec<Vec<String>>,
}

fn split_pipes(line: &str) -> Vec<String> {
    line.split('|').map(|c| c.trim().to_owned()).collect()
}

/// Make repeated column names unique, `pop. stdev` becomes `pop. stdev.1` the second time
fn dedup_header(header: Vec<String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    header
        .into_iter()
        .map(|name| {
            let count = seen.entry(name.clone()).or_insert(0);
            let unique = match *count {
                0 => name,
                n => format!("{name}.{n}"),
            };
            *count += 1;
            unique
        })
        .collect()
}

/// Parse the output of a liboqs speed tool
///
/// Configuration info before the `Operation` header line, the separator line after it
/// and a trailing `Ended at ...` line are dropped. Returns `None` if there is no
/// header line.
pub fn liboqs_table(report: &str) -> Option<RawSpeedTable> {
    let mut lines = report
        .lines()
        .skip_while(|l| !l.starts_with("Operation"));
    let header = dedup_header(split_pipes(lines.next()?));

    let mut body: Vec<&str> = lines.filter(|l| !l.trim().is_empty()).collect();
    if body
        .first()
        .is_some_and(|l| l.trim_start().starts_with("---"))
    {
        body.remove(0);
    }
    if body
        .last()
        .is_some_and(|l| l.trim_start().starts_with("Ended at"))
    {
        body.pop();
    }

    Some(RawSpeedTable {
        header,
        rows: body.into_iter().map(split_pipes).collect(),
    })
}

fn starts_table(line: &str) -> bool {
    line.contains("keygens/s") || (line.contains("sign") && line.contains("verify"))
}

/// Parse the result table of `openssl speed`
///
/// Everything after the table header line is a data row; cells after the first lose
/// their trailing `s` unit suffix (`0.000020s` becomes `0.000020`).
pub fn openssl_rows(report: &str) -> Vec<Vec<String>> {
    report
        .lines()
        .skip_while(|l| !starts_table(l))
        .skip(1)
        .filter(|l| !l.trim().is_empty())
        .map(|line| {
            line.split_whitespace()
                .enumerate()
                .map(|(i, cell)| match i {
                    0 => cell.to_owned(),
                    _ => cell.trim_end_matches('s').to_owned(),
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    const LIBOQS_KEM: &str = "\
Configuration info
==================
Target platform:  x86_64-Linux-6.5.0
Compiler:         gcc (13.2.0)
Started at 2024-03-01 10:00:00
Operation                            | Iterations | Total time (s) | Time (us): mean | pop. stdev | CPU cycles: mean | pop. stdev
------------------------------------ | ----------:| --------------:| ---------------:| ----------:| ----------------:| ----------:
Kyber512                             |            |                |                 |            |                  |
keygen                               |     115316 |          3.000 |          26.015 |     13.181 |            61802 |      30857
encaps                               |      95452 |          3.000 |          31.430 |      2.145 |            74667 |       5030
decaps                               |     120466 |          3.000 |          24.903 |      1.313 |            59149 |       3130
Ended at 2024-03-01 10:00:09
";

    #[test]
    fn test_liboqs_table() {
        let table = liboqs_table(LIBOQS_KEM).unwrap();
        assert_eq!(
            table.header,
            vec![
                "Operation",
                "Iterations",
                "Total time (s)",
                "Time (us): mean",
                "pop. stdev",
                "CPU cycles: mean",
                "pop. stdev.1"
            ]
        );
        assert_eq!(table.rows.len(), 4);
        assert_eq!(table.rows[0][0], "Kyber512");
        assert_eq!(table.rows[1][0], "keygen");
        assert_eq!(table.rows[3][6], "3130");
    }

    #[test]
    fn test_liboqs_table_without_footer_keeps_last_row() {
        let report = "Operation | Iterations\n--- | ---:\nKyber512 | |\nkeygen | 1\nencaps | 2\ndecaps | 3\n";
        let table = liboqs_table(report).unwrap();
        assert_eq!(table.rows.len(), 4);
        assert_eq!(table.rows[3], vec!["decaps", "3"]);
    }

    #[test]
    fn test_liboqs_table_without_header() {
        assert_eq!(liboqs_table("Started at noon\nEnded at noon\n"), None);
    }

    #[test]
    fn test_openssl_kem_rows() {
        let report = "\
version: 3.2.1
                               keygen    encaps    decaps keygens/s  encaps/s  decaps/s
                 mlkem512  0.000020s 0.000018s 0.000015s   50000.0   55555.6   66666.7
                 mlkem768  0.000030s 0.000025s 0.000022s   33333.3   40000.0   45454.5
";
        let rows = openssl_rows(report);
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0],
            vec!["mlkem512", "0.000020", "0.000018", "0.000015", "50000.0", "55555.6", "66666.7"]
        );
    }

    #[test]
    fn test_openssl_sig_rows_keep_algorithm_names() {
        let report = "\
                                   keygen     signs    verify keygens/s    sign/s  verify/s
                  falcon512s 0.005000s 0.000200s 0.000040s     200.0    5000.0   25000.0
";
        let rows = openssl_rows(report);
        assert_eq!(rows[0][0], "falcon512s");
        assert_eq!(rows[0][1], "0.005000");
    }

    #[test]
    fn test_openssl_sig_header_without_keygens() {
        let report = "          sign    verify    sign/s verify/s\n rsa2048 0.000500s 0.000020s 2000.0 50000.0\n";
        assert_eq!(openssl_rows(report).len(), 1);
    }
}
