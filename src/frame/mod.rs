//! Typed per-timestep frames and their parsers, one submodule per data kind.
//!
//! Each parser is a pure function from one text segment (or, for thermo, one
//! whole log file) to an immutable frame value. Parsers never perform I/O and
//! never repair malformed input; a bad segment surfaces as a typed error.

pub mod bonds;
pub mod species;
pub mod thermo;
pub mod trajectory;

pub use bonds::{parse_bond_segment, BondFrame, CooMatrix};
pub use species::{parse_species_segment, SpeciesFrame};
pub use thermo::{ThermoSeries, ThermoTable};
pub use trajectory::{parse_trajectory_segment, AtomTable, BoxBounds, TrajectoryFrame};
