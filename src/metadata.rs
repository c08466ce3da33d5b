//! # Simulation Metadata
//!
//! Loads and validates the per-simulation metadata document that drives
//! ingestion: where the chunked output lives, how the timeline is partitioned,
//! how large the simulation box is, and at which step intervals each data kind
//! was written.
//!
//! The document is TOML:
//!
//! ```toml
//! sim_id = "prelim"
//! sim_desc = "NaCl solution, 300K"
//! data_path = "/data/sims"
//! exec_times = [["2026-01-10T08:00:00Z", "2026-01-12T19:30:00Z"]]
//!
//! [partition]
//! step_size = 0.25      # femtoseconds per step
//! chunk_size = 100000   # steps per chunk
//! n_chunks = 4
//!
//! [box]
//! n_atoms = 1200
//! elements = [[1, "H"], [2, "O"]]
//!
//! [output]
//! trajectory = 10
//! bonds = 100
//! species = 100
//! thermo = 50
//! ```
//!
//! Once [`SimulationMetadata::load`] returns, the value is read-only for the
//! rest of the process; every ingestion component receives it by shared
//! reference.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Errors that can occur while loading or validating metadata
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    /// I/O error reading the metadata file
    #[error("failed to read metadata file: {0}")]
    IoError(#[from] std::io::Error),

    /// TOML deserialization error
    #[error("metadata parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// A field violated its validity constraint
    #[error("invalid metadata field `{field}`: {reason}")]
    InvalidField {
        /// Dotted path of the offending field
        field: &'static str,
        /// Why the value was rejected
        reason: String,
    },

    /// `data_path` does not exist on disk
    #[error("data path does not exist: {0}")]
    MissingDataPath(PathBuf),

    /// An element symbol is not on the periodic table
    #[error("unknown element symbol `{0}` in box.elements")]
    UnknownElement(String),
}

// IUPAC symbols, atomic number order.
#[rustfmt::skip]
const VALID_ELEMENTS: [&str; 118] = [
    "H","He",
    "Li","Be","B","C","N","O","F","Ne",
    "Na","Mg","Al","Si","P","S","Cl","Ar",
    "K","Ca","Sc","Ti","V","Cr","Mn","Fe","Co","Ni","Cu","Zn","Ga","Ge","As","Se","Br","Kr",
    "Rb","Sr","Y","Zr","Nb","Mo","Tc","Ru","Rh","Pd","Ag","Cd","In","Sn","Sb","Te","I","Xe",
    "Cs","Ba",
    "La","Ce","Pr","Nd","Pm","Sm","Eu","Gd","Tb","Dy","Ho","Er","Tm","Yb",
    "Lu","Hf","Ta","W","Re","Os","Ir","Pt","Au","Hg","Tl","Pb","Bi","Po","At","Rn",
    "Fr","Ra","Ac","Th","Pa","U","Np","Pu","Am","Cm","Bk","Cf","Es","Fm","Md","No",
    "Lr","Rf","Db","Sg","Bh","Hs","Mt","Ds","Rg","Cn","Nh","Fl","Mc","Lv","Ts","Og",
];

/// Timeline partitioning of one simulation run
#[derive(Debug, Clone, Deserialize)]
pub struct MetaPartition {
    /// Femtoseconds per simulation step
    pub step_size: f64,
    /// Steps per chunk
    pub chunk_size: u64,
    /// Chunks in the simulation
    pub n_chunks: usize,
}

/// Step intervals at which each output kind was written
#[derive(Debug, Clone, Deserialize)]
pub struct MetaOutput {
    /// Trajectory dump interval
    pub trajectory: u64,
    /// Bond-order dump interval
    pub bonds: u64,
    /// Species census interval
    pub species: u64,
    /// Thermo log interval
    pub thermo: u64,
    /// Intervals for any auxiliary outputs
    #[serde(default)]
    pub other: HashMap<String, u64>,
}

/// Simulation box contents
#[derive(Debug, Clone, Deserialize)]
pub struct MetaBox {
    /// Number of atoms in the box (constant over the run)
    pub n_atoms: usize,
    /// Mapping of LAMMPS type id to element symbol
    #[serde(default)]
    pub elements: Vec<(u32, String)>,
}

/// Validated, immutable metadata for one simulation run
#[derive(Debug, Clone, Deserialize)]
pub struct SimulationMetadata {
    /// Unique simulation identifier, used in output file names
    pub sim_id: String,
    /// Free-form description
    #[serde(default)]
    pub sim_desc: Option<String>,
    /// Wall-clock (start, end) pairs for each execution of the run
    #[serde(default)]
    pub exec_times: Vec<(DateTime<Utc>, DateTime<Utc>)>,
    /// Base directory holding the per-chunk output directories
    pub data_path: PathBuf,
    /// Timeline partitioning
    pub partition: MetaPartition,
    /// Box contents
    #[serde(rename = "box")]
    pub sim_box: MetaBox,
    /// Output intervals
    pub output: MetaOutput,
}

impl SimulationMetadata {
    /// Load and validate a metadata document from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, MetadataError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Parse and validate a metadata document from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, MetadataError> {
        let meta: Self = toml::from_str(text)?;
        meta.validate()?;
        Ok(meta)
    }

    /// Check every validity constraint; called by the loaders.
    pub fn validate(&self) -> Result<(), MetadataError> {
        fn positive(field: &'static str, ok: bool) -> Result<(), MetadataError> {
            if ok {
                Ok(())
            } else {
                Err(MetadataError::InvalidField {
                    field,
                    reason: "must be positive".to_string(),
                })
            }
        }

        if self.sim_id.is_empty() {
            return Err(MetadataError::InvalidField {
                field: "sim_id",
                reason: "must be non-empty".to_string(),
            });
        }
        positive(
            "partition.step_size",
            self.partition.step_size.is_finite() && self.partition.step_size > 0.0,
        )?;
        positive("partition.chunk_size", self.partition.chunk_size > 0)?;
        positive("partition.n_chunks", self.partition.n_chunks > 0)?;
        positive("box.n_atoms", self.sim_box.n_atoms > 0)?;
        positive("output.trajectory", self.output.trajectory > 0)?;
        positive("output.bonds", self.output.bonds > 0)?;
        positive("output.species", self.output.species > 0)?;
        positive("output.thermo", self.output.thermo > 0)?;
        for (name, interval) in &self.output.other {
            if *interval == 0 {
                return Err(MetadataError::InvalidField {
                    field: "output.other",
                    reason: format!("interval for `{name}` must be positive"),
                });
            }
        }

        if !self.data_path.exists() {
            return Err(MetadataError::MissingDataPath(self.data_path.clone()));
        }

        for (_, symbol) in &self.sim_box.elements {
            if !VALID_ELEMENTS.contains(&symbol.as_str()) {
                return Err(MetadataError::UnknownElement(symbol.clone()));
            }
        }

        Ok(())
    }

    /// All chunk indices declared by the partition, in ascending order.
    pub fn all_chunks(&self) -> Vec<usize> {
        (0..self.partition.n_chunks).collect()
    }
}
