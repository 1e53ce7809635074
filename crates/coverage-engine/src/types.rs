//! Core types flowing through a coverage query.

use coverage_common::BoundingBox;
use geo::{BoundingRect, Coord, Intersects, LineString, Polygon, Rect};
use raster_io::GeoTransform;

/// A closed clipping polygon in native coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipGeometry {
    polygon: Polygon<f64>,
}

impl ClipGeometry {
    /// Close a ring of four corners in the order given.
    pub fn from_corners(corners: [(f64, f64); 4]) -> Self {
        Self {
            polygon: Polygon::new(LineString::from(corners.to_vec()), Vec::new()),
        }
    }

    /// Axis-aligned rectangle, traversed (min,min) → (min,max) → (max,max)
    /// → (max,min).
    pub fn rectangle(bbox: &BoundingBox) -> Self {
        Self::from_corners(bbox.corners())
    }

    /// Vertices including the closing one.
    pub fn vertices(&self) -> Vec<(f64, f64)> {
        self.polygon.exterior().coords().map(|c| (c.x, c.y)).collect()
    }

    /// Envelope of the polygon.
    pub fn envelope(&self) -> BoundingBox {
        let rect: Option<Rect<f64>> = self.polygon.bounding_rect().into();
        // a ring built from corners always has vertices
        rect.map_or_else(
            || BoundingBox::new(0.0, 0.0, 0.0, 0.0),
            |r| BoundingBox::new(r.min().x, r.min().y, r.max().x, r.max().y),
        )
    }

    /// Whether a point lies inside the polygon or on its edge.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.polygon.intersects(&Coord { x, y })
    }
}

/// Pixel planes for one request, with validity and georeferencing.
///
/// Planes are row-major, `width * height` long. A `false` in `valid` marks a
/// pixel outside the clip polygon or equal to the source nodata value.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterBlock {
    pub width: usize,
    pub height: usize,
    pub geotransform: GeoTransform,
    pub planes: Vec<Vec<f32>>,
    pub valid: Vec<Vec<bool>>,
    /// Identifier of each plane: the band number for band selections, the
    /// valid time for temporal stacks.
    pub band_ids: Vec<String>,
}

impl RasterBlock {
    /// Empty block ready to receive planes.
    pub fn new(width: usize, height: usize, geotransform: GeoTransform) -> Self {
        Self {
            width,
            height,
            geotransform,
            planes: Vec::new(),
            valid: Vec::new(),
            band_ids: Vec::new(),
        }
    }

    pub fn push_plane(&mut self, id: impl Into<String>, plane: Vec<f32>, valid: Vec<bool>) {
        self.band_ids.push(id.into());
        self.planes.push(plane);
        self.valid.push(valid);
    }

    pub fn band_count(&self) -> usize {
        self.planes.len()
    }

    /// `(bands, height, width)`
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.band_count(), self.height, self.width)
    }

    /// Values of a plane (0-based) with masked pixels as `None`.
    pub fn masked_values(&self, plane: usize) -> Vec<Option<f32>> {
        self.planes[plane]
            .iter()
            .zip(&self.valid[plane])
            .map(|(&v, &ok)| ok.then_some(v))
            .collect()
    }

    /// Values of a plane (0-based) with masked pixels replaced by `fill`.
    pub fn filled_values(&self, plane: usize, fill: f32) -> Vec<f32> {
        self.planes[plane]
            .iter()
            .zip(&self.valid[plane])
            .map(|(&v, &ok)| if ok { v } else { fill })
            .collect()
    }

    /// Extent covered by the block in native coordinates.
    pub fn bounds(&self) -> BoundingBox {
        let (min_x, min_y, max_x, max_y) = self.geotransform.bounds(self.width, self.height);
        BoundingBox::new(min_x, min_y, max_x, max_y)
    }

    /// Pixel-center coordinates along the x axis.
    pub fn x_centers(&self) -> Vec<f64> {
        (0..self.width).map(|col| self.geotransform.pixel_center(col, 0).0).collect()
    }

    /// Pixel-center coordinates along the y axis.
    pub fn y_centers(&self) -> Vec<f64> {
        (0..self.height).map(|row| self.geotransform.pixel_center(0, row).1).collect()
    }
}
