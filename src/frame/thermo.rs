//! Thermodynamic log parsing and merging.
//!
//! Thermo logs are small relative to trajectory and bond dumps, so each
//! chunk's log is parsed whole-file: the table sits between the `Step` header
//! line and the trailing `Loop` footer, with the final row discarded as a
//! footer artifact of the source format. Per-chunk tables merge into one
//! [`ThermoSeries`] keyed by unique `Step` values.

use std::collections::HashSet;

use crate::ingest::error::IngestError;

/// One log file's thermo table, columns stored column-major.
#[derive(Debug, Clone, PartialEq)]
pub struct ThermoTable {
    /// Named numeric columns, `Step` excluded
    pub columns: Vec<String>,
    /// `Step` values, one per row
    pub steps: Vec<i64>,
    /// Column-major values, parallel to `columns`; every inner vector has
    /// `steps.len()` entries
    pub values: Vec<Vec<f64>>,
}

impl ThermoTable {
    /// Parse the thermo table out of one log file's text.
    ///
    /// Fails if the `Step` header or the `Loop` footer is missing, or if any
    /// data row's arity disagrees with the header.
    pub fn parse(text: &str) -> Result<Self, IngestError> {
        let mut lines = text.lines();

        let header: Vec<String> = loop {
            let line = lines.next().ok_or_else(|| {
                IngestError::shape(None, "log file has no thermo table (`Step` header not found)")
            })?;
            let mut tokens = line.split_whitespace();
            if tokens.next() == Some("Step") {
                break std::iter::once("Step".to_string())
                    .chain(tokens.map(|t| t.to_string()))
                    .collect();
            }
        };

        let mut steps: Vec<i64> = Vec::new();
        let mut rows: Vec<Vec<f64>> = Vec::new();
        let mut closed = false;
        for line in lines {
            if line.trim_start().starts_with("Loop") {
                closed = true;
                break;
            }
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.is_empty() {
                continue;
            }
            if tokens.len() != header.len() {
                return Err(IngestError::shape(
                    None,
                    format!(
                        "thermo row has {} fields but the header names {} columns",
                        tokens.len(),
                        header.len()
                    ),
                ));
            }
            steps.push(tokens[0].parse::<i64>().map_err(|_| IngestError::int(tokens[0]))?);
            let row = tokens[1..]
                .iter()
                .map(|t| t.parse::<f64>().map_err(|_| IngestError::float(t)))
                .collect::<Result<Vec<f64>, _>>()?;
            rows.push(row);
        }
        if !closed {
            return Err(IngestError::shape(
                None,
                "thermo table footer (`Loop` marker) not found",
            ));
        }

        // The row immediately before the footer is a non-data artifact.
        steps.pop();
        rows.pop();

        let columns: Vec<String> = header[1..].to_vec();
        let mut values = vec![Vec::with_capacity(rows.len()); columns.len()];
        for row in rows {
            for (column, value) in values.iter_mut().zip(row) {
                column.push(value);
            }
        }

        Ok(Self {
            columns,
            steps,
            values,
        })
    }

    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the table has no data rows.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Merged scalar diagnostics across a whole simulation
#[derive(Debug, Clone, PartialEq)]
pub struct ThermoSeries {
    columns: Vec<String>,
    steps: Vec<i64>,
    values: Vec<Vec<f64>>,
    boxtime: Vec<f64>,
}

impl ThermoSeries {
    /// Merge per-chunk tables (in ascending chunk order) into one series.
    ///
    /// Duplicate `Step` values collapse to the first occurrence encountered;
    /// rows are densely reindexed; `Boxtime = Step × step_size` is derived
    /// for every surviving row. All tables must agree on their columns.
    pub fn merge(tables: Vec<ThermoTable>, step_size: f64) -> Result<Self, IngestError> {
        let columns = match tables.first() {
            Some(table) => table.columns.clone(),
            None => Vec::new(),
        };

        let mut steps: Vec<i64> = Vec::new();
        let mut values: Vec<Vec<f64>> = vec![Vec::new(); columns.len()];
        let mut seen: HashSet<i64> = HashSet::new();

        for table in &tables {
            if table.columns != columns {
                return Err(IngestError::shape(
                    None,
                    format!(
                        "thermo column mismatch across chunks: {:?} vs {:?}",
                        columns, table.columns
                    ),
                ));
            }
            for (row, &step) in table.steps.iter().enumerate() {
                if !seen.insert(step) {
                    continue;
                }
                steps.push(step);
                for (column, source) in values.iter_mut().zip(&table.values) {
                    column.push(source[row]);
                }
            }
        }

        let boxtime = steps.iter().map(|&s| s as f64 * step_size).collect();
        Ok(Self {
            columns,
            steps,
            values,
            boxtime,
        })
    }

    /// Number of rows in the merged series.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the series has no rows.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Column names, `Step` and the derived `Boxtime` excluded.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// `Step` values, first-occurrence order, unique.
    pub fn steps(&self) -> &[i64] {
        &self.steps
    }

    /// Derived `Boxtime` column (`Step × step_size`).
    pub fn boxtime(&self) -> &[f64] {
        &self.boxtime
    }

    /// One named column's values, parallel to [`ThermoSeries::steps`].
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        let index = self.columns.iter().position(|c| c == name)?;
        Some(&self.values[index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOG: &str = "\
LAMMPS (2 Aug 2023)
units real
Step Temp Press
0 300.0 1.0
100 310.0 1.1
200 305.0 1.2
300 299.0 0.9
Loop time of 5.1 on 4 procs
Total wall time: 0:00:05
";

    #[test]
    fn parses_table_between_markers() {
        let table = ThermoTable::parse(LOG).unwrap();
        assert_eq!(table.columns, vec!["Temp", "Press"]);
        // Last row before Loop is a footer artifact and gets dropped.
        assert_eq!(table.steps, vec![0, 100, 200]);
        assert_eq!(table.values[0], vec![300.0, 310.0, 305.0]);
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn missing_header_fails() {
        let err = ThermoTable::parse("units real\n").expect_err("no Step header must fail");
        assert!(matches!(err, IngestError::ParseShape { .. }));
    }

    #[test]
    fn missing_footer_fails() {
        let err = ThermoTable::parse("Step Temp\n0 300.0\n")
            .expect_err("truncated log must fail");
        assert!(matches!(err, IngestError::ParseShape { .. }));
    }

    #[test]
    fn ragged_row_fails() {
        let err = ThermoTable::parse("Step Temp\n0 300.0 7.0\nLoop time\n")
            .expect_err("extra field must fail");
        assert!(matches!(err, IngestError::ParseShape { .. }));
    }

    #[test]
    fn merge_collapses_duplicate_steps() {
        let a = ThermoTable::parse("Step Temp\n0 300.0\n100 310.0\n200 320.0\nLoop\n").unwrap();
        let b = ThermoTable::parse("Step Temp\n100 999.0\n200 305.0\n300 299.0\nLoop\n").unwrap();
        let series = ThermoSeries::merge(vec![a, b], 0.5).unwrap();

        assert_eq!(series.steps(), &[0, 100, 200]);
        // First-seen wins: chunk 0's Temp at step 100 survives over 999.0.
        assert_eq!(series.column("Temp").unwrap(), &[300.0, 310.0, 305.0]);
        for (step, boxtime) in series.steps().iter().zip(series.boxtime()) {
            assert_eq!(*boxtime, *step as f64 * 0.5);
        }
    }

    #[test]
    fn merge_rejects_column_mismatch() {
        let a = ThermoTable::parse("Step Temp\n0 300.0\n1 1.0\nLoop\n").unwrap();
        let b = ThermoTable::parse("Step Press\n0 1.0\n1 1.0\nLoop\n").unwrap();
        let err = ThermoSeries::merge(vec![a, b], 1.0).expect_err("column mismatch must fail");
        assert!(matches!(err, IngestError::ParseShape { .. }));
    }

    #[test]
    fn merge_of_nothing_is_empty() {
        let series = ThermoSeries::merge(Vec::new(), 1.0).unwrap();
        assert!(series.is_empty());
        assert!(series.columns().is_empty());
    }
}
