//! Tabular benchmark results and their CSV representation.
//!
//! Every table produced by this crate has the same shape: a number of key columns
//! (algorithm, operation, session reuse flag, ...) followed by metric columns. A metric
//! cell is either numeric text or empty; an empty cell means the sample is missing.

use std::fs;
use std::path::Path;

use pqc_results_util::file::{write_file, StoreValue};

use crate::Error;

/// One row of a results table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricRow {
    /// Identifying columns, e.g. algorithm and operation
    pub keys: Vec<String>,
    /// Metric cells in column order; empty strings are missing samples
    pub values: Vec<String>,
}

impl MetricRow {
    pub fn new<K, V>(keys: K, values: V) -> Self
    where
        K: IntoIterator,
        K::Item: Into<String>,
        V: IntoIterator,
        V::Item: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn key(&self, column: usize) -> Option<&str> {
        self.keys.get(column).map(String::as_str)
    }

    /// Numeric value of a metric cell; empty and unparseable cells yield `None`
    pub fn numeric(&self, column: usize) -> Option<f64> {
        self.values
            .get(column)
            .and_then(|cell| cell.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite())
    }

    fn cells(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().chain(self.values.iter()).map(String::as_str)
    }
}

/// A run table or an average table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    header: Vec<String>,
    key_width: usize,
    rows: Vec<MetricRow>,
}

impl Table {
    /// Creates an empty table; the first `key_width` header entries name the key columns
    pub fn new<S: AsRef<str>>(header: &[S], key_width: usize) -> Self {
        assert!(
            key_width <= header.len(),
            "a table can not have more key columns than columns"
        );
        Self {
            header: header.iter().map(|h| h.as_ref().to_owned()).collect(),
            key_width,
            rows: vec![],
        }
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn key_width(&self) -> usize {
        self.key_width
    }

    pub fn metric_width(&self) -> usize {
        self.header.len() - self.key_width
    }

    pub fn rows(&self) -> &[MetricRow] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Append a row, trimming every cell and fitting it to the table's shape
    ///
    /// Missing key or metric cells are filled with empty strings, surplus cells are dropped,
    /// so every row of a table has exactly as many cells as the header.
    pub fn push(&mut self, row: MetricRow) {
        let fit = |cells: Vec<String>, width: usize| -> Vec<String> {
            let mut cells: Vec<String> = cells
                .into_iter()
                .take(width)
                .map(|c| c.trim().to_owned())
                .collect();
            cells.resize(width, String::new());
            cells
        };
        let width = self.metric_width();
        self.rows.push(MetricRow {
            keys: fit(row.keys, self.key_width),
            values: fit(row.values, width),
        });
    }

    /// A new table with the same header holding only the rows accepted by `pred`
    pub fn filtered<F: Fn(&MetricRow) -> bool>(&self, pred: F) -> Self {
        Self {
            header: self.header.clone(),
            key_width: self.key_width,
            rows: self.rows.iter().filter(|r| pred(r)).cloned().collect(),
        }
    }

    /// Parse CSV text; the first non-empty line is the header
    pub fn from_csv(text: &str, key_width: usize) -> Option<Self> {
        let mut lines = text
            .lines()
            .map(|l| l.trim_end_matches('\r'))
            .filter(|l| !l.trim().is_empty());
        let header = split_record(lines.next()?);
        if header.len() < key_width {
            return None;
        }
        let mut table = Self::new(&header, key_width);
        for line in lines {
            let mut cells = split_record(line);
            let values = cells.split_off(key_width.min(cells.len()));
            table.push(MetricRow {
                keys: cells,
                values,
            });
        }
        Some(table)
    }

    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        push_record(&mut out, self.header.iter().map(String::as_str));
        for row in self.rows.iter() {
            push_record(&mut out, row.cells());
        }
        out
    }

    /// Read a CSV file written by [Table::to_csv] (or any compatible tool)
    pub fn load<P: AsRef<Path>>(path: P, key_width: usize) -> Result<Self, Error> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_csv(&text, key_width).ok_or_else(|| {
            Error::io(
                path,
                std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "no header line with enough key columns",
                ),
            )
        })
    }
}

impl StoreValue for Table {
    type Error = anyhow::Error;

    fn store<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        write_file(path, self.to_csv().as_bytes())
    }
}

fn needs_quotes(cell: &str) -> bool {
    cell.contains([',', '"', '\n', '\r'])
}

fn push_record<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>) {
    for (i, cell) in cells.enumerate() {
        if i > 0 {
            out.push(',');
        }
        if needs_quotes(cell) {
            out.push('"');
            out.push_str(&cell.replace('"', "\"\""));
            out.push('"');
        } else {
            out.push_str(cell);
        }
    }
    out.push('\n');
}

/// Split one CSV line into its fields, honouring double quotes
fn split_record(line: &str) -> Vec<String> {
    let mut fields = vec![];
    let mut field = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match (c, quoted) {
            ('"', true) if chars.peek() == Some(&'"') => {
                chars.next();
                field.push('"');
            }
            ('"', true) => quoted = false,
            ('"', false) if field.is_empty() => quoted = true,
            (',', false) => fields.push(std::mem::take(&mut field)),
            (c, _) => field.push(c),
        }
    }
    fields.push(field);
    fields
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_csv_roundtrip_keeps_empty_cells() {
        let mut table = Table::new(&["Algorithm", "Operation", "a", "b"], 2);
        table.push(MetricRow::new(["Kyber512", "keygen"], ["1", ""]));
        table.push(MetricRow::new(["Kyber512", "encaps"], ["", "2.5"]));

        let csv = table.to_csv();
        assert_eq!(
            csv,
            "Algorithm,Operation,a,b\nKyber512,keygen,1,\nKyber512,encaps,,2.5\n"
        );
        assert_eq!(Table::from_csv(&csv, 2), Some(table));
    }

    #[test]
    fn test_quoting() {
        let mut table = Table::new(&["Name", "Value"], 1);
        table.push(MetricRow::new(["a, \"b\""], ["3"]));
        let csv = table.to_csv();
        assert_eq!(csv, "Name,Value\n\"a, \"\"b\"\"\",3\n");
        let back = Table::from_csv(&csv, 1).unwrap();
        assert_eq!(back.rows()[0].key(0), Some("a, \"b\""));
    }

    #[test]
    fn test_push_fits_rows_to_header() {
        let mut table = Table::new(&["Algorithm", "x", "y", "z"], 1);
        table.push(MetricRow::new(["  HQC-128 "], ["1"]));
        table.push(MetricRow::new(["HQC-192"], ["1", "2", "3", "4"]));

        assert_eq!(table.rows()[0], MetricRow::new(["HQC-128"], ["1", "", ""]));
        assert_eq!(table.rows()[1], MetricRow::new(["HQC-192"], ["1", "2", "3"]));
    }

    #[test]
    fn test_short_csv_rows_are_padded() {
        let table = Table::from_csv("A,B,C\r\nx,1\r\n\r\n", 1).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows()[0], MetricRow::new(["x"], ["1", ""]));
    }

    #[test]
    fn test_numeric() {
        let row = MetricRow::new(["x"], ["12.5", "", "abc", "NaN", " 7 "]);
        assert_eq!(row.numeric(0), Some(12.5));
        assert_eq!(row.numeric(1), None);
        assert_eq!(row.numeric(2), None);
        assert_eq!(row.numeric(3), None);
        assert_eq!(row.numeric(4), Some(7.0));
        assert_eq!(row.numeric(5), None);
    }
}
