//! Error types for trajectory PCA operations.
//!
//! Every failure in the crate is fail-fast: errors propagate with `?` up to
//! the caller and abort the run. Nothing is retried and no partial output is
//! produced.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for trajectory PCA operations.
#[derive(Error, Debug)]
pub enum PcaError {
    /// Malformed trajectory text.
    #[error("Parse error at byte {position}: {reason}")]
    Parse { position: usize, reason: String },

    /// A data record could not be parsed.
    #[error("Record {index}: {source}")]
    Record {
        index: usize,
        #[source]
        source: Box<PcaError>,
    },

    /// A trajectory disagrees with the dataset's established dimension.
    #[error("Dimension mismatch at record {index}: expected {expected}, got {actual}")]
    DimensionMismatch {
        index: usize,
        expected: usize,
        actual: usize,
    },

    /// No trajectories available to fit.
    #[error("Dataset is empty: no trajectories to fit")]
    EmptyDataset,

    /// Transform requested before any batch was ingested.
    #[error("Model is not fitted: ingest at least one batch before transforming")]
    NotFitted,

    /// Path extension does not match the expected kind.
    #[error("{role} must be a {expected} file: {path}")]
    FileFormat {
        role: &'static str,
        expected: &'static str,
        path: PathBuf,
    },

    /// Source missing or unreadable, destination unwritable.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Decomposition failed or produced non-finite values.
    #[error("Numerical error: {context}")]
    Numerical { context: String },

    /// Configuration validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Output cardinality differs from the dataset.
    #[error("Expected {expected} embeddings, got {actual}")]
    CardinalityMismatch { expected: usize, actual: usize },

    /// Output container could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Fitting was aborted before all batches were ingested.
    #[error("Fit cancelled after {batches_ingested} batches; partial model discarded")]
    Cancelled { batches_ingested: usize },
}

/// Result type alias for trajectory PCA operations.
pub type Result<T> = std::result::Result<T, PcaError>;

impl PcaError {
    /// Create a parse error at a byte offset.
    #[must_use]
    pub fn parse(position: usize, reason: impl Into<String>) -> Self {
        Self::Parse {
            position,
            reason: reason.into(),
        }
    }

    /// Attach the data record index to an error.
    #[must_use]
    pub fn at_record(self, index: usize) -> Self {
        Self::Record {
            index,
            source: Box::new(self),
        }
    }

    /// Create a dimension mismatch error.
    #[must_use]
    pub const fn dimension_mismatch(index: usize, expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch {
            index,
            expected,
            actual,
        }
    }

    /// Create a file format error.
    #[must_use]
    pub fn file_format(
        role: &'static str,
        expected: &'static str,
        path: impl Into<PathBuf>,
    ) -> Self {
        Self::FileFormat {
            role,
            expected,
            path: path.into(),
        }
    }

    /// Create an I/O error bound to a path.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a numerical error.
    #[must_use]
    pub fn numerical(context: impl Into<String>) -> Self {
        Self::Numerical {
            context: context.into(),
        }
    }

    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Whether the error stems from user input rather than an internal failure.
    #[must_use]
    pub fn is_user_error(&self) -> bool {
        match self {
            Self::Parse { .. }
            | Self::DimensionMismatch { .. }
            | Self::EmptyDataset
            | Self::FileFormat { .. }
            | Self::Io { .. }
            | Self::InvalidConfig(_) => true,
            Self::Record { source, .. } => source.is_user_error(),
            _ => false,
        }
    }
}
