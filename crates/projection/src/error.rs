//! Projection error types.

use thiserror::Error;

/// Result type for projection operations.
pub type ProjectionResult<T> = Result<T, ProjectionError>;

/// Errors raised while parsing a CRS or transforming coordinates.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProjectionError {
    /// The CRS definition could not be understood.
    #[error("Invalid CRS definition: {0}")]
    InvalidCrs(String),

    /// The projection is recognised but not implemented.
    #[error("Unsupported projection: {0}")]
    Unsupported(String),

    /// A PROJ parameter is missing or malformed.
    #[error("Invalid projection parameter '{name}': {message}")]
    InvalidParameter { name: String, message: String },

    /// Coordinate outside the valid domain of the transform.
    #[error("Coordinate ({x}, {y}) is outside the projection domain")]
    OutOfDomain { x: f64, y: f64 },
}

impl ProjectionError {
    pub fn invalid_parameter(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            message: message.into(),
        }
    }
}
