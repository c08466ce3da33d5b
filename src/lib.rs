//! # mdframe - Chunked Molecular Dynamics Ingestion
//!
//! `mdframe` turns the raw chunked output of a reactive molecular dynamics
//! run into typed, timestep-indexed data structures. Long runs are executed
//! as a sequence of restarts, each writing its own directory of output files;
//! this crate resolves those per-chunk files, splits them into per-timestep
//! segments, parses each segment, and merges the chunks back into one
//! continuous series with restart-boundary duplicates collapsed.
//!
//! ## Key Features
//!
//! - **Four data kinds**: atomic trajectory dumps, ReaxFF bond-order dumps,
//!   chemical species censuses, and thermodynamic logs, each with its own
//!   parser and frame type.
//!
//! - **Bounded memory**: chunk files are segmented through fixed-size block
//!   reads; a whole file is never held in memory at once.
//!
//! - **Lazy or eager**: stream frames one at a time through a
//!   [`ingest::FrameStream`], or materialize everything with the chunk-parallel
//!   `read_*` methods.
//!
//! - **Dense tensor view**: a merged trajectory can be stacked into
//!   `ndarray` arrays with a leading step axis for numerical post-processing.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mdframe::prelude::*;
//!
//! // Metadata names the data directory, the chunk partition, and the box.
//! let sim = Simulation::open("prelim.toml")?;
//!
//! // Eager: parse all chunks in parallel and merge.
//! let thermo = sim.read_thermo()?;
//! println!("{} thermo rows", thermo.len());
//!
//! // Lazy: stream frames, stop whenever.
//! for frame in sim.species_frames()?.take(5) {
//!     let frame = frame?;
//!     println!("step {}: {} molecules", frame.timestep, frame.no_moles);
//! }
//!
//! // Dense view for numerics.
//! let tensor = sim.read_trajectory_tensor()?;
//! println!("positions shape {:?}", tensor.positions().shape());
//! # Ok::<(), mdframe::ingest::IngestError>(())
//! ```
//!
//! ## Data Layout
//!
//! One simulation named `prelim` with `n_chunks = 2` lives on disk as:
//!
//! ```text
//! data_path/
//! ├── 0/
//! │   ├── dat_trajectory_prelim_0.dump
//! │   ├── dat_bonds_prelim_0.reaxff
//! │   ├── dat_species_prelim_0.out
//! │   └── log_out_prelim_0
//! └── 1/
//!     └── ...
//! ```
//!
//! ## Architecture
//!
//! - [`metadata`]: the validated TOML document that drives ingestion
//! - [`ingest`]: path resolution, segmentation, streaming, and the
//!   [`ingest::Simulation`] façade
//! - [`frame`]: per-kind segment parsers and frame types
//! - [`tensor`]: dense stacked view of a merged trajectory

// Documentation lints - enforce complete documentation for publication
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]

pub mod frame;
pub mod ingest;
pub mod metadata;
pub mod tensor;

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::frame::{
        AtomTable, BondFrame, BoxBounds, CooMatrix, SpeciesFrame, ThermoSeries, ThermoTable,
        TrajectoryFrame,
    };
    pub use crate::ingest::{
        DataKind, FrameStream, IngestConfig, IngestError, Simulation, TrajectoryFormat,
        TrajectoryOutput,
    };
    pub use crate::metadata::{MetadataError, SimulationMetadata};
    pub use crate::tensor::{TensorError, TrajectoryTensor};
}
