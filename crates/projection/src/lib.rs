//! Coordinate reference system transformations.
//!
//! Implements the rotated-pole (`ob_tran`) projection from scratch without
//! external dependencies, along with PROJ-string parsing so that a CRS
//! written into a raster can be read back and reused for reprojection.

pub mod crs;
pub mod error;
pub mod rotated_pole;

pub use crs::{transform_point, Crs};
pub use error::{ProjectionError, ProjectionResult};
pub use rotated_pole::RotatedPole;
