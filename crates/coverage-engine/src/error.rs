//! Error types for coverage queries and provider setup.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use projection::ProjectionError;

/// Result type for coverage queries.
pub type QueryResult<T> = std::result::Result<T, QueryError>;

/// Errors returned by a coverage query. None of them carry partial output.
#[derive(Error, Debug)]
pub enum QueryError {
    /// Conflicting or malformed subset parameters.
    #[error("{0}")]
    InvalidSubset(String),

    /// The bbox could not be brought into the native CRS.
    #[error("failed to reproject bbox into native coordinates: {0}")]
    Reprojection(#[from] ProjectionError),

    /// The datetime does not parse or matches no file.
    #[error("Datetime value invalid or out of time domain: {value}")]
    DatetimeOutOfDomain { value: String },

    /// A resolved file could not be opened or decoded.
    #[error("failed to open raster for {timestep} at {path:?}: {message}")]
    FileOpen {
        timestep: String,
        path: PathBuf,
        message: String,
    },

    /// Requested band does not exist in the dataset.
    #[error("band {requested} out of range (dataset has {available} bands)")]
    BandOutOfRange { requested: usize, available: usize },

    /// A timestep's crop differs in shape from the first one.
    #[error("stack shape mismatch at {timestep}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        timestep: String,
        expected: (usize, usize),
        actual: (usize, usize),
    },

    /// The clip polygon does not overlap the raster.
    #[error("clip geometry does not overlap the raster")]
    ClipOutsideRaster,

    /// The requested output format is not served.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// File resolution failed.
    #[error("file resolution failed: {0}")]
    Resolver(String),

    /// Output serialization failed.
    #[error("encoding failed: {0}")]
    Encoding(String),
}

/// Machine-readable error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryErrorKind {
    InvalidSubsetSpecification,
    ReprojectionFailure,
    DatetimeOutOfDomain,
    FileOpenFailure,
    BandIndexOutOfRange,
    ShapeMismatchInStack,
    ClipOutsideRaster,
    UnsupportedFormat,
    Resolver,
    Encoding,
}

impl QueryError {
    /// Create an InvalidSubset error.
    pub fn invalid_subset(msg: impl Into<String>) -> Self {
        Self::InvalidSubset(msg.into())
    }

    /// Create a FileOpen error.
    pub fn file_open(timestep: impl Into<String>, path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::FileOpen {
            timestep: timestep.into(),
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub fn resolver(msg: impl Into<String>) -> Self {
        Self::Resolver(msg.into())
    }

    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }

    pub fn kind(&self) -> QueryErrorKind {
        match self {
            QueryError::InvalidSubset(_) => QueryErrorKind::InvalidSubsetSpecification,
            QueryError::Reprojection(_) => QueryErrorKind::ReprojectionFailure,
            QueryError::DatetimeOutOfDomain { .. } => QueryErrorKind::DatetimeOutOfDomain,
            QueryError::FileOpen { .. } => QueryErrorKind::FileOpenFailure,
            QueryError::BandOutOfRange { .. } => QueryErrorKind::BandIndexOutOfRange,
            QueryError::ShapeMismatch { .. } => QueryErrorKind::ShapeMismatchInStack,
            QueryError::ClipOutsideRaster => QueryErrorKind::ClipOutsideRaster,
            QueryError::UnsupportedFormat(_) => QueryErrorKind::UnsupportedFormat,
            QueryError::Resolver(_) => QueryErrorKind::Resolver,
            QueryError::Encoding(_) => QueryErrorKind::Encoding,
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            QueryErrorKind::InvalidSubsetSpecification
            | QueryErrorKind::ReprojectionFailure
            | QueryErrorKind::BandIndexOutOfRange
            | QueryErrorKind::ClipOutsideRaster
            | QueryErrorKind::UnsupportedFormat => 400,
            QueryErrorKind::DatetimeOutOfDomain => 404,
            QueryErrorKind::FileOpenFailure
            | QueryErrorKind::ShapeMismatchInStack
            | QueryErrorKind::Resolver
            | QueryErrorKind::Encoding => 500,
        }
    }

    /// Convert to a QueryException.
    pub fn to_exception(&self) -> QueryException {
        QueryException {
            kind: self.kind(),
            status: self.status_code(),
            message: self.to_string(),
        }
    }
}

/// Structured error returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryException {
    pub kind: QueryErrorKind,
    pub status: u16,
    pub message: String,
}

/// Errors raised while constructing a provider.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The dataset could not be reached or described at startup.
    #[error("provider connection error: {0}")]
    Connection(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ProviderError {
    pub fn connection(msg: impl ToString) -> Self {
        Self::Connection(msg.to_string())
    }

    pub fn config(msg: impl ToString) -> Self {
        Self::Config(msg.to_string())
    }
}
