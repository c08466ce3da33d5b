//! # Chunked Ingestion Pipeline
//!
//! This module wires path resolution, segmentation, parsing, and merging into
//! the [`Simulation`] façade. Every stage is lazy; the caller picks one of
//! two evaluation modes:
//!
//! - **Lazy**: `trajectory_frames()` / `bond_frames()` / `species_frames()`
//!   return a [`FrameStream`] that parses one segment at a time as it is
//!   driven. Dropping the stream parses nothing further.
//! - **Eager**: `read_trajectory()` / `read_bonds()` / `read_species()` /
//!   `read_thermo()` run an embarrassingly parallel map over chunks (one
//!   rayon task per chunk file) and merge the results in ascending chunk
//!   order. The merge is the only synchronization point.
//!
//! ## Example
//!
//! ```rust,no_run
//! use mdframe::ingest::Simulation;
//!
//! let sim = Simulation::open("prelim.toml")?;
//! let thermo = sim.read_thermo()?;
//! println!("{} thermo rows", thermo.len());
//!
//! // Stream trajectory frames without materializing the whole run.
//! for frame in sim.trajectory_frames()?.take(10) {
//!     println!("timestep {}", frame?.timestep);
//! }
//! # Ok::<(), mdframe::ingest::IngestError>(())
//! ```

pub mod error;
pub mod paths;
pub mod segment;
pub mod stream;


pub use error::IngestError;
pub use paths::{resolve_chunk_paths, DataKind};
pub use segment::{FileSegments, SegmentStream, DEFAULT_BLOCK_SIZE};
pub use stream::{merge_chunks, FrameStream, Timestamped};

use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::{info, warn};
use rayon::prelude::*;

use crate::frame::{
    parse_bond_segment, parse_species_segment, parse_trajectory_segment, BondFrame, SpeciesFrame,
    ThermoSeries, ThermoTable, TrajectoryFrame,
};
use crate::metadata::SimulationMetadata;
use crate::tensor::TrajectoryTensor;

/// Output projection for trajectory data, resolved once per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrajectoryFormat {
    /// An ordered sequence of per-timestep frames
    Frames,
    /// One dense stacked tensor
    Tensor,
}

impl FromStr for TrajectoryFormat {
    type Err = IngestError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag {
            "frame" | "frames" => Ok(Self::Frames),
            "tensor" => Ok(Self::Tensor),
            other => Err(IngestError::InvalidFormat(other.to_string())),
        }
    }
}

/// Result of [`Simulation::read_trajectory_as`]
#[derive(Debug)]
pub enum TrajectoryOutput {
    /// Merged per-timestep frames
    Frames(Vec<TrajectoryFrame>),
    /// Dense stacked tensor
    Tensor(TrajectoryTensor),
}

/// Tuning knobs for one ingestion session
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Chunk subset to ingest; `None` means every chunk in the metadata
    pub chunks: Option<Vec<usize>>,
    /// Read block size for segmentation, in bytes
    pub block_size: usize,
    /// Whether trajectory merging deduplicates timesteps. Disabling trades
    /// restart-boundary dedup for bounded memory on ultra-high-frequency
    /// dumps; bonds and species always deduplicate.
    pub dedup_trajectory: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            chunks: None,
            block_size: DEFAULT_BLOCK_SIZE,
            dedup_trajectory: true,
        }
    }
}

/// Handle on one simulation's chunked output
///
/// Owns the validated, immutable [`SimulationMetadata`] and an
/// [`IngestConfig`]; every read method is a pure function of those two plus
/// the files on disk.
pub struct Simulation {
    meta: SimulationMetadata,
    config: IngestConfig,
}

impl Simulation {
    /// Wrap already-loaded metadata with the default configuration.
    pub fn new(meta: SimulationMetadata) -> Self {
        Self::with_config(meta, IngestConfig::default())
    }

    /// Wrap already-loaded metadata with an explicit configuration.
    pub fn with_config(meta: SimulationMetadata, config: IngestConfig) -> Self {
        Self { meta, config }
    }

    /// Load, validate, and wrap a metadata document from a TOML file.
    pub fn open<P: AsRef<Path>>(meta_path: P) -> Result<Self, IngestError> {
        Ok(Self::new(SimulationMetadata::load(meta_path)?))
    }

    /// The simulation's metadata.
    pub fn metadata(&self) -> &SimulationMetadata {
        &self.meta
    }

    /// The session configuration.
    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Resolve this session's chunk files for one data kind.
    pub fn chunk_paths(&self, kind: DataKind) -> Result<Vec<PathBuf>, IngestError> {
        resolve_chunk_paths(&self.meta, None, kind, self.config.chunks.as_deref())
    }

    // Lazy pipelines

    /// Lazy stream of trajectory frames across the session's chunks.
    ///
    /// Deduplicated by timestep unless [`IngestConfig::dedup_trajectory`] is
    /// off, in which case the skip is logged and duplicates flow through.
    pub fn trajectory_frames(&self) -> Result<FrameStream<TrajectoryFrame>, IngestError> {
        let stream = self
            .segments(DataKind::Trajectory)?
            .map(|segment| segment.and_then(|s| parse_trajectory_segment(&s)));
        let stream = FrameStream::new(stream);
        if self.config.dedup_trajectory {
            Ok(stream.dedup_by_timestep())
        } else {
            warn!(
                "{}: trajectory dedup disabled; restart-boundary duplicates are preserved",
                self.meta.sim_id
            );
            Ok(stream)
        }
    }

    /// Lazy stream of bond frames across the session's chunks, deduplicated
    /// by timestep.
    pub fn bond_frames(&self) -> Result<FrameStream<BondFrame>, IngestError> {
        let n_atoms = self.meta.sim_box.n_atoms;
        let stream = self
            .segments(DataKind::Bonds)?
            .map(move |segment| segment.and_then(|s| parse_bond_segment(&s, n_atoms)));
        Ok(FrameStream::new(stream).dedup_by_timestep())
    }

    /// Lazy stream of species frames across the session's chunks,
    /// deduplicated by timestep.
    pub fn species_frames(&self) -> Result<FrameStream<SpeciesFrame>, IngestError> {
        let stream = self
            .segments(DataKind::Species)?
            .map(|segment| segment.and_then(|s| parse_species_segment(&s)));
        Ok(FrameStream::new(stream).dedup_by_timestep())
    }

    // Eager, chunk-parallel reads

    /// Parse every trajectory chunk in parallel and merge into one series.
    pub fn read_trajectory(&self) -> Result<Vec<TrajectoryFrame>, IngestError> {
        let per_chunk =
            self.parse_chunks(DataKind::Trajectory, |s| parse_trajectory_segment(s))?;
        if !self.config.dedup_trajectory {
            warn!(
                "{}: trajectory dedup disabled; restart-boundary duplicates are preserved",
                self.meta.sim_id
            );
        }
        let frames = merge_chunks(per_chunk, self.config.dedup_trajectory);
        info!("{}: {} trajectory frames", self.meta.sim_id, frames.len());
        Ok(frames)
    }

    /// Parse every bond chunk in parallel and merge into one series.
    pub fn read_bonds(&self) -> Result<Vec<BondFrame>, IngestError> {
        let n_atoms = self.meta.sim_box.n_atoms;
        let per_chunk = self.parse_chunks(DataKind::Bonds, |s| parse_bond_segment(s, n_atoms))?;
        let frames = merge_chunks(per_chunk, true);
        info!("{}: {} bond frames", self.meta.sim_id, frames.len());
        Ok(frames)
    }

    /// Parse every species chunk in parallel and merge into one series.
    pub fn read_species(&self) -> Result<Vec<SpeciesFrame>, IngestError> {
        let per_chunk = self.parse_chunks(DataKind::Species, |s| parse_species_segment(s))?;
        let frames = merge_chunks(per_chunk, true);
        info!("{}: {} species frames", self.meta.sim_id, frames.len());
        Ok(frames)
    }

    /// Parse every chunk's thermo log and merge into one deduplicated table
    /// with the derived `Boxtime` column.
    pub fn read_thermo(&self) -> Result<ThermoSeries, IngestError> {
        let paths = self.chunk_paths(DataKind::Thermo)?;
        info!(
            "{}: reading {} thermo log(s)",
            self.meta.sim_id,
            paths.len()
        );
        let tables: Vec<ThermoTable> = paths
            .par_iter()
            .map(|path| {
                let text = std::fs::read_to_string(path)?;
                ThermoTable::parse(&text)
            })
            .collect::<Result<_, _>>()?;
        let series = ThermoSeries::merge(tables, self.meta.partition.step_size)?;
        info!("{}: {} thermo rows", self.meta.sim_id, series.len());
        Ok(series)
    }

    /// Read the whole trajectory and stack it into a dense tensor.
    ///
    /// The tensor requires a merged series, so timestep deduplication is
    /// applied here regardless of [`IngestConfig::dedup_trajectory`].
    pub fn read_trajectory_tensor(&self) -> Result<TrajectoryTensor, IngestError> {
        let per_chunk =
            self.parse_chunks(DataKind::Trajectory, |s| parse_trajectory_segment(s))?;
        let frames = merge_chunks(per_chunk, true);
        let tensor = TrajectoryTensor::assemble(&frames, self.meta.sim_box.n_atoms)?;
        info!(
            "{}: stacked {} steps x {} atoms",
            self.meta.sim_id,
            tensor.n_steps(),
            tensor.n_atoms()
        );
        Ok(tensor)
    }

    /// Read trajectory data in the requested output projection.
    pub fn read_trajectory_as(
        &self,
        format: TrajectoryFormat,
    ) -> Result<TrajectoryOutput, IngestError> {
        match format {
            TrajectoryFormat::Frames => Ok(TrajectoryOutput::Frames(self.read_trajectory()?)),
            TrajectoryFormat::Tensor => Ok(TrajectoryOutput::Tensor(self.read_trajectory_tensor()?)),
        }
    }

    // Plumbing

    fn segments(&self, kind: DataKind) -> Result<SegmentStream, IngestError> {
        SegmentStream::for_kind(self.chunk_paths(kind)?, kind, self.config.block_size)
    }

    /// Segment and parse each chunk file independently, one rayon task per
    /// chunk; results come back in ascending chunk order.
    fn parse_chunks<T, F>(&self, kind: DataKind, parse: F) -> Result<Vec<Vec<T>>, IngestError>
    where
        T: Send,
        F: Fn(&str) -> Result<T, IngestError> + Sync,
    {
        let paths = self.chunk_paths(kind)?;
        info!(
            "{}: reading {} {:?} chunk(s)",
            self.meta.sim_id,
            paths.len(),
            kind
        );
        paths
            .par_iter()
            .map(|path| {
                SegmentStream::for_kind(vec![path.clone()], kind, self.config.block_size)?
                    .map(|segment| segment.and_then(|s| parse(&s)))
                    .collect()
            })
            .collect()
    }
}
