//! GeoTIFF raster container support.
//!
//! This crate reads single- and multi-band GeoTIFF files into memory and
//! encodes new GeoTIFF files into owned byte buffers, without GDAL.
//!
//! Georeferencing is carried with the standard GeoTIFF tags
//! (ModelPixelScale/ModelTiepoint or ModelTransformation) and the CRS is
//! stored as a PROJ string in GeoAsciiParams. Nodata, units and free-form
//! metadata items use the GDAL private tags so other tools can read them.

pub mod error;
pub mod geotiff;
pub mod geotransform;
pub mod metadata;

pub use error::{RasterError, RasterResult};
pub use geotiff::{DataType, GeoTiffWriter, RasterFile};
pub use geotransform::{GeoTransform, Window};
pub use metadata::GdalMetadata;
