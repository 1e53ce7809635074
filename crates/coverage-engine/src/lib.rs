//! Coverage query engine for rotated-pole analysis archives.
//!
//! A [`CoverageProvider`] serves spatial and temporal subsets of one
//! archived variable, either as CoverageJSON (single timestep, single band)
//! or as a GeoTIFF rebuilt in memory (any number of timesteps).
//!
//! # Architecture
//!
//! ```text
//! CoverageQuery
//!      │
//!      ▼
//! SubsetRequest::validate        (rejects before any I/O)
//!      │
//!      ├─► clip_geometry          bbox corners → native polygon
//!      │
//!      ├─► FileResolver::resolve  (variable, time) → [(valid_time, path)]
//!      │
//!      ├─► RasterReader           single file: window + mask + bands
//!      │   TemporalStacker        range: band per timestep, rayon reads
//!      │
//!      └─► Serializer             CoverageJSON | GeoTIFF bytes
//! ```
//!
//! # Example
//!
//! ```ignore
//! use coverage_engine::{CoverageProvider, CoverageQuery, CoverageResponse, ProviderConfig};
//!
//! let provider = CoverageProvider::from_config(ProviderConfig::from_yaml_file("rdpa.yaml")?)?;
//! let query = CoverageQuery::new()
//!     .bbox([-100.0, 40.0, -90.0, 50.0])
//!     .datetime("2023-06-01T00Z/2023-06-03T00Z")
//!     .format("GTiff");
//!
//! if let CoverageResponse::Native(tiff) = provider.query(&query)? {
//!     std::fs::write("subset.tif", &tiff.bytes)?;
//! }
//! ```

pub mod config;
pub mod covjson;
pub mod descriptor;
pub mod error;
pub mod geometry;
pub mod provider;
pub mod reader;
pub mod request;
pub mod resolver;
pub mod serializer;
pub mod stacker;
pub mod types;

// Re-export commonly used types at crate root
pub use config::{ProviderConfig, StackPolicy};
pub use covjson::CoverageJson;
pub use descriptor::{CoverageDescriptor, DomainSet, RangeType};
pub use error::{ProviderError, QueryError, QueryErrorKind, QueryException, QueryResult};
pub use geometry::{clip_geometry, reproject_bbox};
pub use provider::{CoverageProvider, CoverageResponse};
pub use reader::{clip_window, RasterReader};
pub use request::{CoverageQuery, OutputMode, SpatialSubset, SubsetRequest, TimeQuery};
pub use resolver::{DirectoryResolver, FileResolver, TimeSeriesEntry};
pub use serializer::{produced_bbox, NativeCoverage, Serializer};
pub use stacker::TemporalStacker;
pub use types::{ClipGeometry, RasterBlock};
