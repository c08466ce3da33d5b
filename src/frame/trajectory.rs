//! Trajectory dump parsing.
//!
//! One segment of a trajectory dump holds a single timestep: the leading
//! integer step number followed by labelled sub-blocks (`NUMBER OF ATOMS`,
//! `BOX BOUNDS`, `ATOMS`, `DIMENSIONS`). The parser is a small state machine
//! over those blocks; any other label means the dump was written with an
//! unsupported style and the whole ingestion call fails.

use crate::ingest::error::IngestError;

const ITEM_PREFIX: &str = "ITEM: ";

const VALID_ITEMS: [&str; 4] = ["NUMBER OF ATOMS", "BOX BOUNDS", "ATOMS", "DIMENSIONS"];

/// Simulation box description for one timestep
#[derive(Debug, Clone, PartialEq)]
pub struct BoxBounds {
    /// Per-axis boundary style flags (e.g. `pp` for periodic)
    pub style: Vec<String>,
    /// Per-axis `(lower, upper)` coordinates; one entry per spatial dimension
    pub bounds: Vec<(f64, f64)>,
}

impl BoxBounds {
    /// Spatial dimensionality of the box.
    pub fn dimensions(&self) -> usize {
        self.bounds.len()
    }

    /// Edge length along each axis.
    pub fn lengths(&self) -> Vec<f64> {
        self.bounds.iter().map(|(lo, hi)| hi - lo).collect()
    }

    /// Box volume in the dump's length units.
    pub fn volume(&self) -> f64 {
        self.bounds.iter().map(|(lo, hi)| hi - lo).product()
    }
}

/// Per-atom data for one timestep, column-major and sorted by atom id.
///
/// Columns are whatever the dump's `ATOMS` header declared (minus `id`,
/// which becomes the index). Values are `f64` regardless of the column's
/// logical type; `type` ids survive the round trip exactly.
#[derive(Debug, Clone, PartialEq)]
pub struct AtomTable {
    columns: Vec<String>,
    ids: Vec<i64>,
    values: Vec<Vec<f64>>,
}

impl AtomTable {
    /// Number of atoms (rows) in the table.
    pub fn n_atoms(&self) -> usize {
        self.ids.len()
    }

    /// Atom ids, ascending.
    pub fn ids(&self) -> &[i64] {
        &self.ids
    }

    /// Column names in dump header order, `id` excluded.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// One column's values, ordered by ascending atom id.
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        let index = self.columns.iter().position(|c| c == name)?;
        Some(&self.values[index])
    }

    /// Whether the table carries every one of `names`.
    pub fn has_columns(&self, names: &[&str]) -> bool {
        names
            .iter()
            .all(|name| self.columns.iter().any(|c| c == name))
    }
}

/// One parsed trajectory timestep
#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryFrame {
    /// Simulation step this frame was dumped at
    pub timestep: i64,
    /// Atom count declared by the `NUMBER OF ATOMS` block, when present
    pub n_atoms_declared: Option<usize>,
    /// Box bounds, when the segment carried a `BOX BOUNDS` block
    pub box_bounds: Option<BoxBounds>,
    /// Atom table, when the segment carried an `ATOMS` block
    pub atoms: Option<AtomTable>,
}

/// Mutable accumulator for a frame under construction; finalized into an
/// immutable [`TrajectoryFrame`] once every sub-block has been consumed.
struct FrameBuilder {
    timestep: i64,
    n_atoms_declared: Option<usize>,
    box_bounds: Option<BoxBounds>,
    atoms: Option<AtomTable>,
}

impl FrameBuilder {
    fn new(timestep: i64) -> Self {
        Self {
            timestep,
            n_atoms_declared: None,
            box_bounds: None,
            atoms: None,
        }
    }

    fn finish(self) -> Result<TrajectoryFrame, IngestError> {
        if let (Some(declared), Some(atoms)) = (self.n_atoms_declared, self.atoms.as_ref()) {
            if declared != atoms.n_atoms() {
                return Err(IngestError::shape(
                    Some(self.timestep),
                    format!(
                        "NUMBER OF ATOMS declares {declared} but the atom table has {} rows",
                        atoms.n_atoms()
                    ),
                ));
            }
        }
        Ok(TrajectoryFrame {
            timestep: self.timestep,
            n_atoms_declared: self.n_atoms_declared,
            box_bounds: self.box_bounds,
            atoms: self.atoms,
        })
    }
}

/// Strip the raw dump's `ITEM: ` marker if the line carries one.
fn strip_item_prefix(line: &str) -> &str {
    line.strip_prefix(ITEM_PREFIX).unwrap_or(line)
}

/// A line opens a new labelled sub-block when it starts with an uppercase
/// letter (body lines are numeric).
fn is_item_line(line: &str) -> bool {
    strip_item_prefix(line)
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_uppercase())
}

/// Split an item line into its label (leading all-uppercase tokens) and
/// header tokens (the rest of the line).
fn split_label(line: &str) -> (String, Vec<String>) {
    let stripped = strip_item_prefix(line);
    let tokens: Vec<&str> = stripped.split_whitespace().collect();
    let label_len = tokens
        .iter()
        .take_while(|t| t.chars().all(|c| c.is_ascii_uppercase()))
        .count();
    let label = tokens[..label_len].join(" ");
    let header = tokens[label_len..].iter().map(|t| t.to_string()).collect();
    (label, header)
}

fn parse_box_bounds(
    timestep: i64,
    header: Vec<String>,
    body: &[&str],
) -> Result<BoxBounds, IngestError> {
    let mut bounds = Vec::with_capacity(body.len());
    for line in body {
        let mut tokens = line.split_whitespace();
        let lo = tokens.next().ok_or_else(|| {
            IngestError::shape(Some(timestep), "box bounds line has no coordinates")
        })?;
        let hi = tokens.next().ok_or_else(|| {
            IngestError::shape(Some(timestep), "box bounds line has only one coordinate")
        })?;
        bounds.push((
            lo.parse::<f64>().map_err(|_| IngestError::float(lo))?,
            hi.parse::<f64>().map_err(|_| IngestError::float(hi))?,
        ));
    }
    Ok(BoxBounds {
        style: header,
        bounds,
    })
}

fn parse_atom_table(
    timestep: i64,
    header: Vec<String>,
    body: &[&str],
) -> Result<AtomTable, IngestError> {
    let id_index = header.iter().position(|c| c == "id").ok_or_else(|| {
        IngestError::shape(Some(timestep), "ATOMS header has no `id` column")
    })?;

    let mut rows: Vec<(i64, Vec<f64>)> = Vec::with_capacity(body.len());
    for line in body {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() != header.len() {
            return Err(IngestError::shape(
                Some(timestep),
                format!(
                    "atom row has {} fields but the header names {} columns",
                    tokens.len(),
                    header.len()
                ),
            ));
        }
        let id = tokens[id_index]
            .parse::<i64>()
            .map_err(|_| IngestError::int(tokens[id_index]))?;
        let mut row = Vec::with_capacity(header.len() - 1);
        for (index, token) in tokens.iter().enumerate() {
            if index == id_index {
                continue;
            }
            row.push(token.parse::<f64>().map_err(|_| IngestError::float(token))?);
        }
        rows.push((id, row));
    }

    rows.sort_by_key(|(id, _)| *id);
    for pair in rows.windows(2) {
        if pair[0].0 == pair[1].0 {
            return Err(IngestError::shape(
                Some(timestep),
                format!("duplicate atom id {}", pair[0].0),
            ));
        }
    }

    let columns: Vec<String> = header
        .iter()
        .enumerate()
        .filter(|(index, _)| *index != id_index)
        .map(|(_, name)| name.clone())
        .collect();

    let mut values = vec![Vec::with_capacity(rows.len()); columns.len()];
    let mut ids = Vec::with_capacity(rows.len());
    for (id, row) in rows {
        ids.push(id);
        for (column, value) in values.iter_mut().zip(row) {
            column.push(value);
        }
    }

    Ok(AtomTable {
        columns,
        ids,
        values,
    })
}

/// Parse one trajectory segment into a [`TrajectoryFrame`].
///
/// The segment's first non-empty line is the timestep; label lines may carry
/// the raw dump's `ITEM: ` marker or not. Unknown labels fail with
/// [`IngestError::InvalidItem`].
pub fn parse_trajectory_segment(segment: &str) -> Result<TrajectoryFrame, IngestError> {
    let mut lines = segment.lines().map(str::trim_end).peekable();

    let step_line = loop {
        match lines.next() {
            Some(line) if line.trim().is_empty() => continue,
            Some(line) => break line,
            None => {
                return Err(IngestError::shape(None, "trajectory segment is empty"));
            }
        }
    };
    let timestep = step_line
        .trim()
        .parse::<i64>()
        .map_err(|_| IngestError::int(step_line.trim()))?;

    let mut builder = FrameBuilder::new(timestep);

    while let Some(line) = lines.next() {
        if line.trim().is_empty() {
            continue;
        }
        if !is_item_line(line) {
            return Err(IngestError::shape(
                Some(timestep),
                format!("stray data line outside any item block: `{line}`"),
            ));
        }
        let (label, header) = split_label(line);
        if !VALID_ITEMS.contains(&label.as_str()) {
            let shown = if label.is_empty() {
                strip_item_prefix(line).to_string()
            } else {
                label
            };
            return Err(IngestError::InvalidItem(shown));
        }

        let mut body: Vec<&str> = Vec::new();
        while let Some(&next) = lines.peek() {
            if is_item_line(next) {
                break;
            }
            lines.next();
            if !next.trim().is_empty() {
                body.push(next);
            }
        }

        match label.as_str() {
            "NUMBER OF ATOMS" => {
                let token = body.first().map(|l| l.trim()).ok_or_else(|| {
                    IngestError::shape(Some(timestep), "NUMBER OF ATOMS block has no value")
                })?;
                builder.n_atoms_declared =
                    Some(token.parse::<usize>().map_err(|_| IngestError::int(token))?);
            }
            "BOX BOUNDS" => {
                builder.box_bounds = Some(parse_box_bounds(timestep, header, &body)?);
            }
            "ATOMS" => {
                builder.atoms = Some(parse_atom_table(timestep, header, &body)?);
            }
            // Grid output; recognized but unused in this domain.
            "DIMENSIONS" => {}
            _ => unreachable!("label was checked against VALID_ITEMS"),
        }
    }

    builder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEGMENT: &str = "\
100
BOX BOUNDS pp pp pp
0.0 10.0
0.0 10.0
0.0 10.0
ATOMS id type xu yu zu
1 1 0.5 0.5 0.5
2 1 1.5 1.5 1.5
";

    #[test]
    fn parses_bare_segment() {
        let frame = parse_trajectory_segment(SEGMENT).unwrap();
        assert_eq!(frame.timestep, 100);

        let bounds = frame.box_bounds.unwrap();
        assert_eq!(bounds.style, vec!["pp", "pp", "pp"]);
        assert_eq!(
            bounds.bounds,
            vec![(0.0, 10.0), (0.0, 10.0), (0.0, 10.0)]
        );
        assert_eq!(bounds.dimensions(), 3);

        let atoms = frame.atoms.unwrap();
        assert_eq!(atoms.n_atoms(), 2);
        assert_eq!(atoms.ids(), &[1, 2]);
        assert_eq!(atoms.column("xu").unwrap(), &[0.5, 1.5]);
        assert_eq!(atoms.column("type").unwrap(), &[1.0, 1.0]);
    }

    #[test]
    fn parses_item_prefixed_segment() {
        let segment = "\n200\nITEM: NUMBER OF ATOMS\n2\nITEM: BOX BOUNDS pp pp pp\n\
                       -1.0 1.0\n-1.0 1.0\n-1.0 1.0\nITEM: ATOMS id type xu yu zu q\n\
                       2 2 1.0 1.0 1.0 -0.8\n1 1 0.0 0.0 0.0 0.4\n";
        let frame = parse_trajectory_segment(segment).unwrap();
        assert_eq!(frame.timestep, 200);
        assert_eq!(frame.n_atoms_declared, Some(2));

        // Rows arrive unsorted and come back indexed by ascending id.
        let atoms = frame.atoms.unwrap();
        assert_eq!(atoms.ids(), &[1, 2]);
        assert_eq!(atoms.column("q").unwrap(), &[0.4, -0.8]);
        assert!(atoms.has_columns(&["xu", "yu", "zu", "q"]));
        assert!(!atoms.has_columns(&["vx"]));
    }

    #[test]
    fn rejects_unknown_label() {
        let segment = "100\nVELOCITIES id vx\n1 0.1\n";
        let err = parse_trajectory_segment(segment).expect_err("unknown label must fail");
        assert!(matches!(err, IngestError::InvalidItem(ref label) if label == "VELOCITIES"));
    }

    #[test]
    fn rejects_atom_count_mismatch() {
        let segment = "100\nNUMBER OF ATOMS\n3\nATOMS id type xu\n1 1 0.0\n2 1 1.0\n";
        let err = parse_trajectory_segment(segment).expect_err("count mismatch must fail");
        assert!(matches!(err, IngestError::ParseShape { timestep: Some(100), .. }));
    }

    #[test]
    fn rejects_duplicate_atom_id() {
        let segment = "100\nATOMS id type xu\n1 1 0.0\n1 1 1.0\n";
        let err = parse_trajectory_segment(segment).expect_err("duplicate id must fail");
        assert!(matches!(err, IngestError::ParseShape { .. }));
    }

    #[test]
    fn rejects_ragged_atom_row() {
        let segment = "100\nATOMS id type xu\n1 1\n";
        let err = parse_trajectory_segment(segment).expect_err("short row must fail");
        assert!(matches!(err, IngestError::ParseShape { .. }));
    }

    #[test]
    fn dimensions_block_is_skipped() {
        let segment = "100\nDIMENSIONS nx ny nz\n4 4 4\nNUMBER OF ATOMS\n0\n";
        let frame = parse_trajectory_segment(segment).unwrap();
        assert_eq!(frame.n_atoms_declared, Some(0));
        assert!(frame.atoms.is_none());
    }

    #[test]
    fn volume_is_product_of_edge_lengths() {
        let bounds = BoxBounds {
            style: vec!["pp".into(), "pp".into(), "pp".into()],
            bounds: vec![(0.0, 2.0), (0.0, 3.0), (-1.0, 1.0)],
        };
        assert_eq!(bounds.lengths(), vec![2.0, 3.0, 2.0]);
        assert!((bounds.volume() - 12.0).abs() < 1e-12);
    }
}
