//! Ingestion error taxonomy.

use std::path::PathBuf;

/// Errors that can occur while resolving, segmenting, or parsing chunk output
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// I/O error reading a chunk file
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Metadata failed to load or validate
    #[error("metadata error: {0}")]
    MetadataError(#[from] crate::metadata::MetadataError),

    /// A requested chunk index lies outside the metadata's declared range
    #[error("invalid chunk {requested}: simulation declares chunks 0..{n_chunks}")]
    InvalidChunks {
        /// The offending chunk index
        requested: usize,
        /// Number of chunks declared by the metadata
        n_chunks: usize,
    },

    /// A resolved chunk file does not exist on disk
    #[error("chunk file not found: {0}")]
    FileNotFound(PathBuf),

    /// An unrecognized item label appeared in a trajectory segment
    #[error("not a valid dump item label: `{0}`")]
    InvalidItem(String),

    /// The caller requested an unsupported output projection
    #[error("not a valid output format: `{0}`")]
    InvalidFormat(String),

    /// Row/column arity of a segment disagrees with its own declaration
    #[error("malformed segment at timestep {timestep:?}: {reason}")]
    ParseShape {
        /// Timestep of the offending segment, when known
        timestep: Option<i64>,
        /// What disagreed
        reason: String,
    },

    /// A token failed numeric conversion
    #[error("invalid {expected} token `{token}`")]
    ParseValue {
        /// The raw token
        token: String,
        /// What it was expected to parse as
        expected: &'static str,
    },

    /// Tensor assembly failed on a merged trajectory series
    #[error("tensor assembly error: {0}")]
    TensorError(#[from] crate::tensor::TensorError),
}

impl IngestError {
    pub(crate) fn shape(timestep: Option<i64>, reason: impl Into<String>) -> Self {
        Self::ParseShape {
            timestep,
            reason: reason.into(),
        }
    }

    pub(crate) fn int(token: &str) -> Self {
        Self::ParseValue {
            token: token.to_string(),
            expected: "integer",
        }
    }

    pub(crate) fn float(token: &str) -> Self {
        Self::ParseValue {
            token: token.to_string(),
            expected: "float",
        }
    }
}
