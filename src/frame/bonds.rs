//! Bond-order dump parsing.
//!
//! Each segment of a ReaxFF bond dump describes the bond-order adjacency at
//! one timestep: one record per atom with at least one bonded neighbor. The
//! records accumulate into a sparse coordinate matrix of the full
//! `(n_atoms, n_atoms)` shape regardless of how many bonds were observed.

use ndarray::Array2;

use crate::ingest::error::IngestError;

// Record layout: id, type, k, k neighbor ids, 4 ignored fields
// (molecule id, abo, nlp, q), k bond orders.
const IGNORED_FIELDS: usize = 4;

/// Sparse coordinate-format matrix with `f64` entries.
///
/// Stores only `(row, col, value)` triples. Duplicate `(row, col)` pairs are
/// summed on materialization, following coordinate-format construction
/// convention; whether overlapping records should instead overwrite is
/// unresolved upstream, so summing is an assumption, not a guarantee.
#[derive(Debug, Clone, PartialEq)]
pub struct CooMatrix {
    shape: (usize, usize),
    rows: Vec<usize>,
    cols: Vec<usize>,
    values: Vec<f64>,
}

impl CooMatrix {
    /// Create an empty matrix of the given shape.
    pub fn new(shape: (usize, usize)) -> Self {
        Self {
            shape,
            rows: Vec::new(),
            cols: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Matrix shape as `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    /// Number of stored triples (duplicates counted separately).
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Append one `(row, col, value)` triple. Indices must lie inside the
    /// matrix shape; the parser guarantees this by validating atom ids.
    fn push(&mut self, row: usize, col: usize, value: f64) {
        debug_assert!(row < self.shape.0 && col < self.shape.1);
        self.rows.push(row);
        self.cols.push(col);
        self.values.push(value);
    }

    /// Iterate over the stored triples in insertion order.
    pub fn triplets(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.rows
            .iter()
            .zip(&self.cols)
            .zip(&self.values)
            .map(|((&r, &c), &v)| (r, c, v))
    }

    /// Entry at `(row, col)`, summing duplicate triples.
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.triplets()
            .filter(|&(r, c, _)| r == row && c == col)
            .map(|(_, _, v)| v)
            .sum()
    }

    /// Materialize into a dense array, summing duplicate triples.
    pub fn to_dense(&self) -> Array2<f64> {
        let mut dense = Array2::zeros(self.shape);
        for (row, col, value) in self.triplets() {
            dense[(row, col)] += value;
        }
        dense
    }
}

/// Bond-order adjacency at one timestep
#[derive(Debug, Clone, PartialEq)]
pub struct BondFrame {
    /// Simulation step this dump was written at
    pub timestep: i64,
    /// Sparse bond-order matrix, shape `(n_atoms, n_atoms)`, 0-indexed
    /// (`row = atom_id - 1`)
    pub bonds: CooMatrix,
}

fn atom_index(token: &str, n_atoms: usize, timestep: i64) -> Result<usize, IngestError> {
    let id = token.parse::<usize>().map_err(|_| IngestError::int(token))?;
    if id == 0 || id > n_atoms {
        return Err(IngestError::shape(
            Some(timestep),
            format!("atom id {id} outside 1..={n_atoms}"),
        ));
    }
    Ok(id - 1)
}

/// Parse one bond segment into a [`BondFrame`].
///
/// Comment and empty lines are dropped; the first remaining line is the
/// timestep. Each record's neighbor-id run and trailing bond-order run are
/// both counted by the record's own bond count, so a field-count mismatch is
/// detected before any values are sliced out. Bonds are directional in the
/// raw format; no symmetrization is applied.
pub fn parse_bond_segment(segment: &str, n_atoms: usize) -> Result<BondFrame, IngestError> {
    let mut lines = segment
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'));

    let step_line = lines
        .next()
        .ok_or_else(|| IngestError::shape(None, "bond segment is empty"))?;
    let timestep = step_line
        .parse::<i64>()
        .map_err(|_| IngestError::int(step_line))?;

    let mut bonds = CooMatrix::new((n_atoms, n_atoms));
    for line in lines {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() < 3 {
            return Err(IngestError::shape(
                Some(timestep),
                format!("bond record has only {} fields", tokens.len()),
            ));
        }
        let row = atom_index(tokens[0], n_atoms, timestep)?;
        let k = tokens[2]
            .parse::<usize>()
            .map_err(|_| IngestError::int(tokens[2]))?;

        let expected = 3 + k + IGNORED_FIELDS + k;
        if tokens.len() != expected {
            return Err(IngestError::shape(
                Some(timestep),
                format!(
                    "bond record for atom {} has {} fields, expected {expected} for {k} neighbors",
                    row + 1,
                    tokens.len()
                ),
            ));
        }

        let neighbors = &tokens[3..3 + k];
        let orders = &tokens[tokens.len() - k..];
        for (neighbor, order) in neighbors.iter().zip(orders) {
            let col = atom_index(neighbor, n_atoms, timestep)?;
            let value = order.parse::<f64>().map_err(|_| IngestError::float(order))?;
            bonds.push(row, col, value);
        }
    }

    Ok(BondFrame { timestep, bonds })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_record() {
        let segment = " 100\n1 1 2 2 3 0.0 0.0 0.0 0.0 0.9 0.8\n";
        let frame = parse_bond_segment(segment, 5).unwrap();

        assert_eq!(frame.timestep, 100);
        assert_eq!(frame.bonds.shape(), (5, 5));
        assert_eq!(frame.bonds.nnz(), 2);
        assert_eq!(frame.bonds.get(0, 1), 0.9);
        assert_eq!(frame.bonds.get(0, 2), 0.8);
        assert_eq!(frame.bonds.get(1, 0), 0.0);
    }

    #[test]
    fn comment_lines_are_ignored() {
        let segment = "\
 200
# Number of particles 3
# Max number of bonds per atom 2
1 1 1 2 0.0 0.0 0.0 0.0 0.5
2 1 1 1 0.0 0.0 0.0 0.0 0.5
";
        let frame = parse_bond_segment(segment, 3).unwrap();
        assert_eq!(frame.timestep, 200);
        assert_eq!(frame.bonds.nnz(), 2);
        assert_eq!(frame.bonds.get(0, 1), 0.5);
        assert_eq!(frame.bonds.get(1, 0), 0.5);
    }

    #[test]
    fn duplicate_entries_sum_in_dense_view() {
        let segment = " 1\n1 1 2 2 2 0.0 0.0 0.0 0.0 0.3 0.4\n";
        let frame = parse_bond_segment(segment, 2).unwrap();
        let dense = frame.bonds.to_dense();
        assert!((dense[(0, 1)] - 0.7).abs() < 1e-12);
        assert_eq!(frame.bonds.get(0, 1), 0.7);
    }

    #[test]
    fn rejects_field_count_mismatch() {
        // Claims 2 neighbors but carries tokens for 1.
        let segment = " 1\n1 1 2 2 0.0 0.0 0.0 0.0 0.9\n";
        let err = parse_bond_segment(segment, 3).expect_err("short record must fail");
        assert!(matches!(err, IngestError::ParseShape { timestep: Some(1), .. }));
    }

    #[test]
    fn rejects_out_of_range_neighbor() {
        let segment = " 1\n1 1 1 9 0.0 0.0 0.0 0.0 0.9\n";
        let err = parse_bond_segment(segment, 3).expect_err("neighbor 9 of 3 must fail");
        assert!(matches!(err, IngestError::ParseShape { .. }));
    }

    #[test]
    fn shape_is_metadata_sized_even_when_sparse() {
        let segment = " 1\n";
        let frame = parse_bond_segment(segment, 100).unwrap();
        assert_eq!(frame.bonds.shape(), (100, 100));
        assert_eq!(frame.bonds.nnz(), 0);
    }
}
