//! Error types for raster I/O.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for raster operations.
pub type RasterResult<T> = Result<T, RasterError>;

/// Errors that can occur while reading or writing rasters.
#[derive(Error, Debug)]
pub enum RasterError {
    /// The file could not be opened.
    #[error("failed to open raster {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// I/O error while writing.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The TIFF codec rejected the data.
    #[error("TIFF error: {0}")]
    Tiff(String),

    /// The raster has no usable georeferencing.
    #[error("missing georeferencing: {0}")]
    MissingGeoreference(String),

    /// The layout is valid TIFF but not something this crate handles.
    #[error("unsupported raster layout: {0}")]
    Unsupported(String),

    /// Pixel data or dimensions are inconsistent.
    #[error("invalid raster data: {0}")]
    InvalidData(String),

    /// Requested band does not exist.
    #[error("band {requested} out of range (raster has {available} bands)")]
    BandOutOfRange { requested: usize, available: usize },
}

impl RasterError {
    pub fn invalid_data(msg: impl Into<String>) -> Self {
        Self::InvalidData(msg.into())
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }
}

impl From<tiff::TiffError> for RasterError {
    fn from(err: tiff::TiffError) -> Self {
        Self::Tiff(err.to_string())
    }
}
