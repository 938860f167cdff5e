// error.rs - Error taxonomy for the scanning core

use thiserror::Error;

/// Broad category of a [`MutationScanError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input data; recoverable per (genome, gene) pair
    Input,
    /// Programming-contract violation; fatal for the pair it occurred in
    InvariantViolation,
    /// Scoring matrix could not be allocated; aborts the batch
    ResourceExhausted,
    /// Invalid configuration
    Config,
}

#[derive(Error, Debug)]
pub enum MutationScanError {
    #[error("Invalid residue '{residue}' at position {position} in {context}")]
    InvalidAlphabet {
        context: String,
        residue: char,
        position: usize,
    },

    #[error("Manifest entry for gene '{0}' has no alignment data")]
    EmptyManifestEntry(String),

    #[error("No alignment source for gene '{gene}' in genome '{genome_id}'")]
    MissingAlignmentSource { gene: String, genome_id: String },

    #[error("Sequence not found: {0}")]
    MissingSequence(String),

    #[error("Failed to parse {context}: {message}")]
    Parse { context: String, message: String },

    #[error("Aligned strings differ in length (reference {reference_len}, query {query_len})")]
    AlignmentMismatch {
        reference_len: usize,
        query_len: usize,
    },

    #[error("Aligned column {column} is a gap on both strands")]
    InvalidAlignmentColumn { column: usize },

    #[error("Reference coordinate would be negative at column {column}")]
    NegativeCoordinate { column: usize },

    #[error("Scoring matrix of {cells} cells exceeds the limit of {limit} cells")]
    ResourceExhausted { cells: usize, limit: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),

    #[error(transparent)]
    TomlSer(#[from] toml::ser::Error),

    #[error(transparent)]
    Regex(#[from] regex::Error),
}

impl MutationScanError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MutationScanError::AlignmentMismatch { .. }
            | MutationScanError::InvalidAlignmentColumn { .. }
            | MutationScanError::NegativeCoordinate { .. } => ErrorKind::InvariantViolation,
            MutationScanError::ResourceExhausted { .. } => ErrorKind::ResourceExhausted,
            MutationScanError::InvalidConfig(_)
            | MutationScanError::TomlSer(_)
            | MutationScanError::Regex(_) => ErrorKind::Config,
            _ => ErrorKind::Input,
        }
    }

    pub fn is_invariant_violation(&self) -> bool {
        self.kind() == ErrorKind::InvariantViolation
    }

    /// True when the error must abort the whole batch rather than a single pair
    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::ResourceExhausted
    }
}

pub type Result<T> = std::result::Result<T, MutationScanError>;
