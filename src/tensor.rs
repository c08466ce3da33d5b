//! Dense multi-axis view of a merged trajectory.
//!
//! Stacks per-timestep frames along a new leading step axis, producing
//! `ndarray` arrays with labelled, fixed-size axes: `(step, atom, component)`
//! for positions and velocities, `(step, atom)` for charges and types,
//! `(step, axis, lo/hi)` for box bounds. Assembly consumes an already-merged
//! series and produces an independent structure; the input frames are not
//! mutated.
//!
//! Every frame must agree on atom count, ascending `1..=n_atoms` atom ids,
//! and box dimensionality; any divergence would silently misalign the atom
//! axis, so it is a hard error instead.

use ndarray::{Array2, Array3};

use crate::frame::trajectory::{AtomTable, TrajectoryFrame};

const POSITION_COLUMNS: [&str; 3] = ["xu", "yu", "zu"];
const VELOCITY_COLUMNS: [&str; 3] = ["vx", "vy", "vz"];

/// Errors that can occur while stacking frames into a tensor
#[derive(Debug, thiserror::Error)]
pub enum TensorError {
    /// No frames to stack
    #[error("cannot assemble a tensor from an empty trajectory series")]
    EmptySeries,

    /// A frame has no atom table
    #[error("frame at timestep {timestep} has no atom table")]
    MissingAtoms {
        /// Timestep of the offending frame
        timestep: i64,
    },

    /// A frame has no box bounds
    #[error("frame at timestep {timestep} has no box bounds")]
    MissingBox {
        /// Timestep of the offending frame
        timestep: i64,
    },

    /// A frame's atom count disagrees with the fixed atom axis
    #[error("frame at timestep {timestep} has {found} atoms, expected {expected}")]
    AtomCountMismatch {
        /// Timestep of the offending frame
        timestep: i64,
        /// Atom count the tensor's atom axis was fixed to
        expected: usize,
        /// Atom count the frame actually carries
        found: usize,
    },

    /// A frame's atom ids are not exactly `1..=n_atoms` ascending
    #[error("frame at timestep {timestep} breaks ascending atom-id ordering")]
    MisorderedIds {
        /// Timestep of the offending frame
        timestep: i64,
    },

    /// A frame's box dimensionality disagrees with the rest of the series
    #[error("frame at timestep {timestep} has a {found}-dimensional box, expected {expected}")]
    BoxDimMismatch {
        /// Timestep of the offending frame
        timestep: i64,
        /// Dimensionality fixed by the first frame
        expected: usize,
        /// Dimensionality the frame actually carries
        found: usize,
    },

    /// A column present in the first frame is missing from a later one
    #[error("frame at timestep {timestep} is missing column `{column}`")]
    MissingColumn {
        /// Timestep of the offending frame
        timestep: i64,
        /// The absent column
        column: String,
    },
}

/// Dense stacked view of a merged trajectory series
#[derive(Debug, Clone)]
pub struct TrajectoryTensor {
    steps: Vec<i64>,
    positions: Array3<f64>,
    velocities: Option<Array3<f64>>,
    charges: Option<Array2<f64>>,
    types: Option<Array2<f64>>,
    box_bounds: Array3<f64>,
}

impl TrajectoryTensor {
    /// Stack a merged trajectory series into dense arrays.
    ///
    /// `n_atoms` fixes the atom axis (metadata's box size). Unwrapped
    /// positions (`xu`/`yu`/`zu`) are required in every frame; velocities,
    /// charges, and types are included when the first frame carries them and
    /// must then be present in every frame.
    pub fn assemble(frames: &[TrajectoryFrame], n_atoms: usize) -> Result<Self, TensorError> {
        let first = frames.first().ok_or(TensorError::EmptySeries)?;
        let first_atoms = checked_atoms(first, n_atoms)?;
        let dim = first
            .box_bounds
            .as_ref()
            .ok_or(TensorError::MissingBox {
                timestep: first.timestep,
            })?
            .dimensions();

        let with_velocities = first_atoms.has_columns(&VELOCITY_COLUMNS);
        let with_charges = first_atoms.column("q").is_some();
        let with_types = first_atoms.column("type").is_some();

        let n_steps = frames.len();
        let mut steps = Vec::with_capacity(n_steps);
        let mut positions = Array3::zeros((n_steps, n_atoms, 3));
        let mut velocities = with_velocities.then(|| Array3::zeros((n_steps, n_atoms, 3)));
        let mut charges = with_charges.then(|| Array2::zeros((n_steps, n_atoms)));
        let mut types = with_types.then(|| Array2::zeros((n_steps, n_atoms)));
        let mut box_bounds = Array3::zeros((n_steps, dim, 2));

        for (step_index, frame) in frames.iter().enumerate() {
            let atoms = checked_atoms(frame, n_atoms)?;
            let bounds = frame.box_bounds.as_ref().ok_or(TensorError::MissingBox {
                timestep: frame.timestep,
            })?;
            if bounds.dimensions() != dim {
                return Err(TensorError::BoxDimMismatch {
                    timestep: frame.timestep,
                    expected: dim,
                    found: bounds.dimensions(),
                });
            }

            steps.push(frame.timestep);
            for (axis, &(lo, hi)) in bounds.bounds.iter().enumerate() {
                box_bounds[(step_index, axis, 0)] = lo;
                box_bounds[(step_index, axis, 1)] = hi;
            }

            for (component, name) in POSITION_COLUMNS.iter().enumerate() {
                let column = required_column(atoms, frame.timestep, name)?;
                for (atom, &value) in column.iter().enumerate() {
                    positions[(step_index, atom, component)] = value;
                }
            }
            if let Some(velocities) = velocities.as_mut() {
                for (component, name) in VELOCITY_COLUMNS.iter().enumerate() {
                    let column = required_column(atoms, frame.timestep, name)?;
                    for (atom, &value) in column.iter().enumerate() {
                        velocities[(step_index, atom, component)] = value;
                    }
                }
            }
            if let Some(charges) = charges.as_mut() {
                let column = required_column(atoms, frame.timestep, "q")?;
                for (atom, &value) in column.iter().enumerate() {
                    charges[(step_index, atom)] = value;
                }
            }
            if let Some(types) = types.as_mut() {
                let column = required_column(atoms, frame.timestep, "type")?;
                for (atom, &value) in column.iter().enumerate() {
                    types[(step_index, atom)] = value;
                }
            }
        }

        Ok(Self {
            steps,
            positions,
            velocities,
            charges,
            types,
            box_bounds,
        })
    }

    /// Number of stacked timesteps.
    pub fn n_steps(&self) -> usize {
        self.steps.len()
    }

    /// Size of the fixed atom axis.
    pub fn n_atoms(&self) -> usize {
        self.positions.shape()[1]
    }

    /// Timesteps along the leading axis, in stack order.
    pub fn steps(&self) -> &[i64] {
        &self.steps
    }

    /// Unwrapped positions, shape `(n_steps, n_atoms, 3)`.
    pub fn positions(&self) -> &Array3<f64> {
        &self.positions
    }

    /// Velocities, shape `(n_steps, n_atoms, 3)`, when the dump carried them.
    pub fn velocities(&self) -> Option<&Array3<f64>> {
        self.velocities.as_ref()
    }

    /// Per-atom charges, shape `(n_steps, n_atoms)`, when the dump carried them.
    pub fn charges(&self) -> Option<&Array2<f64>> {
        self.charges.as_ref()
    }

    /// Per-atom type ids, shape `(n_steps, n_atoms)`, when the dump carried them.
    pub fn types(&self) -> Option<&Array2<f64>> {
        self.types.as_ref()
    }

    /// Box bounds, shape `(n_steps, dim, 2)` with `lo`/`hi` on the last axis.
    pub fn box_bounds(&self) -> &Array3<f64> {
        &self.box_bounds
    }
}

fn checked_atoms(frame: &TrajectoryFrame, n_atoms: usize) -> Result<&AtomTable, TensorError> {
    let atoms = frame.atoms.as_ref().ok_or(TensorError::MissingAtoms {
        timestep: frame.timestep,
    })?;
    if atoms.n_atoms() != n_atoms {
        return Err(TensorError::AtomCountMismatch {
            timestep: frame.timestep,
            expected: n_atoms,
            found: atoms.n_atoms(),
        });
    }
    // Parsing sorts by id; ids must additionally be exactly 1..=n_atoms for
    // the atom axis to mean the same thing in every frame.
    let aligned = atoms
        .ids()
        .iter()
        .enumerate()
        .all(|(index, &id)| id == index as i64 + 1);
    if !aligned {
        return Err(TensorError::MisorderedIds {
            timestep: frame.timestep,
        });
    }
    Ok(atoms)
}

fn required_column<'a>(
    atoms: &'a AtomTable,
    timestep: i64,
    name: &str,
) -> Result<&'a [f64], TensorError> {
    atoms.column(name).ok_or_else(|| TensorError::MissingColumn {
        timestep,
        column: name.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::parse_trajectory_segment;

    fn frame(timestep: i64, rows: &str) -> TrajectoryFrame {
        let segment = format!(
            "{timestep}\nBOX BOUNDS pp pp pp\n0.0 10.0\n0.0 10.0\n0.0 10.0\n\
             ATOMS id type xu yu zu q\n{rows}"
        );
        parse_trajectory_segment(&segment).unwrap()
    }

    #[test]
    fn stacks_positions_and_charges() {
        let frames = vec![
            frame(0, "1 1 0.0 0.0 0.0 0.4\n2 1 1.0 1.0 1.0 -0.4\n"),
            frame(10, "1 1 0.5 0.0 0.0 0.4\n2 1 1.5 1.0 1.0 -0.4\n"),
        ];
        let tensor = TrajectoryTensor::assemble(&frames, 2).unwrap();

        assert_eq!(tensor.n_steps(), 2);
        assert_eq!(tensor.n_atoms(), 2);
        assert_eq!(tensor.steps(), &[0, 10]);
        assert_eq!(tensor.positions().shape(), &[2, 2, 3]);
        assert_eq!(tensor.positions()[(1, 0, 0)], 0.5);
        assert_eq!(tensor.positions()[(1, 1, 0)], 1.5);

        let charges = tensor.charges().expect("q column present");
        assert_eq!(charges[(0, 0)], 0.4);
        assert_eq!(charges[(0, 1)], -0.4);

        assert_eq!(tensor.box_bounds().shape(), &[2, 3, 2]);
        assert_eq!(tensor.box_bounds()[(0, 2, 1)], 10.0);
        assert!(tensor.velocities().is_none());
    }

    #[test]
    fn fails_on_atom_count_mismatch() {
        let frames = vec![
            frame(0, "1 1 0.0 0.0 0.0 0.4\n2 1 1.0 1.0 1.0 -0.4\n"),
            frame(10, "1 1 0.5 0.0 0.0 0.4\n"),
        ];
        let err = TrajectoryTensor::assemble(&frames, 2).expect_err("count change must fail");
        assert!(matches!(
            err,
            TensorError::AtomCountMismatch {
                timestep: 10,
                expected: 2,
                found: 1
            }
        ));
    }

    #[test]
    fn fails_on_gapped_atom_ids() {
        // Two atoms but ids {1, 3}: the atom axis would misalign.
        let frames = vec![frame(0, "1 1 0.0 0.0 0.0 0.4\n3 1 1.0 1.0 1.0 -0.4\n")];
        let err = TrajectoryTensor::assemble(&frames, 2).expect_err("gapped ids must fail");
        assert!(matches!(err, TensorError::MisorderedIds { timestep: 0 }));
    }

    #[test]
    fn fails_on_empty_series() {
        let err = TrajectoryTensor::assemble(&[], 2).expect_err("empty series must fail");
        assert!(matches!(err, TensorError::EmptySeries));
    }

    #[test]
    fn fails_when_column_disappears_mid_series() {
        let with_q = frame(0, "1 1 0.0 0.0 0.0 0.4\n");
        let without_q = parse_trajectory_segment(
            "10\nBOX BOUNDS pp pp pp\n0.0 1.0\n0.0 1.0\n0.0 1.0\nATOMS id type xu yu zu\n1 1 0.0 0.0 0.0\n",
        )
        .unwrap();
        let err = TrajectoryTensor::assemble(&[with_q, without_q], 1)
            .expect_err("vanishing q column must fail");
        assert!(matches!(
            err,
            TensorError::MissingColumn { timestep: 10, ref column } if column == "q"
        ));
    }
}
