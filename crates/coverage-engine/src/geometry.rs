//! Geographic bbox → native clip polygon.

use coverage_common::BoundingBox;
use projection::{transform_point, Crs, ProjectionError};
use tracing::debug;

use crate::error::QueryResult;
use crate::request::SpatialSubset;
use crate::types::ClipGeometry;

/// Reproject an EPSG:4326 bbox into the native CRS.
///
/// Each corner is transformed on its own, so the result is a general
/// quadrilateral rather than the envelope of the reprojected box.
pub fn reproject_bbox(bbox: &BoundingBox, native: &Crs) -> QueryResult<ClipGeometry> {
    let mut corners = [(0.0, 0.0); 4];
    for (slot, (lon, lat)) in corners.iter_mut().zip(bbox.corners()) {
        let (x, y) = transform_point(&Crs::Geographic, native, lon, lat)?;
        if !x.is_finite() || !y.is_finite() {
            return Err(ProjectionError::OutOfDomain { x: lon, y: lat }.into());
        }
        *slot = (x, y);
    }

    debug!(
        source = ?bbox.to_array(),
        destination = ?corners,
        "Reprojected bbox into native coordinates"
    );

    Ok(ClipGeometry::from_corners(corners))
}

/// Clip polygon for a validated spatial subset, if any.
pub fn clip_geometry(spatial: &SpatialSubset, native: &Crs) -> QueryResult<Option<ClipGeometry>> {
    match spatial {
        SpatialSubset::None => Ok(None),
        SpatialSubset::Bbox(bbox) => reproject_bbox(bbox, native).map(Some),
        SpatialSubset::Axes(ranges) => {
            debug!(ranges = ?ranges.to_array(), "Creating spatial subset from native axes");
            Ok(Some(ClipGeometry::rectangle(ranges)))
        }
    }
}
