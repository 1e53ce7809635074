//! Affine pixel ⇄ CRS mapping.

use serde::{Deserialize, Serialize};

/// Affine transform from pixel (col, row) to CRS (x, y), in GDAL order.
///
/// ```text
/// x = origin_x + col * pixel_width + row * row_rotation
/// y = origin_y + col * col_rotation + row * pixel_height
/// ```
///
/// `(col, row) = (0, 0)` is the top-left corner of the top-left pixel, so
/// pixel centers sit at half-integer positions. For north-up grids
/// `pixel_height` is negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub pixel_width: f64,
    pub row_rotation: f64,
    pub origin_y: f64,
    pub col_rotation: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    /// North-up transform without rotation.
    pub fn north_up(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            pixel_width,
            row_rotation: 0.0,
            origin_y,
            col_rotation: 0.0,
            pixel_height,
        }
    }

    /// Build from the six GDAL coefficients.
    pub fn from_gdal(c: [f64; 6]) -> Self {
        Self {
            origin_x: c[0],
            pixel_width: c[1],
            row_rotation: c[2],
            origin_y: c[3],
            col_rotation: c[4],
            pixel_height: c[5],
        }
    }

    /// The six GDAL coefficients.
    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.origin_x,
            self.pixel_width,
            self.row_rotation,
            self.origin_y,
            self.col_rotation,
            self.pixel_height,
        ]
    }

    pub fn is_rotated(&self) -> bool {
        self.row_rotation != 0.0 || self.col_rotation != 0.0
    }

    /// Map fractional pixel coordinates to CRS coordinates.
    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.origin_x + col * self.pixel_width + row * self.row_rotation,
            self.origin_y + col * self.col_rotation + row * self.pixel_height,
        )
    }

    /// CRS coordinates of the center of pixel `(col, row)`.
    pub fn pixel_center(&self, col: usize, row: usize) -> (f64, f64) {
        self.apply(col as f64 + 0.5, row as f64 + 0.5)
    }

    /// Map CRS coordinates to fractional pixel coordinates.
    ///
    /// Returns `None` for a degenerate (non-invertible) transform.
    pub fn to_pixel(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let det = self.pixel_width * self.pixel_height - self.row_rotation * self.col_rotation;
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let dx = x - self.origin_x;
        let dy = y - self.origin_y;
        let col = (dx * self.pixel_height - dy * self.row_rotation) / det;
        let row = (dy * self.pixel_width - dx * self.col_rotation) / det;
        Some((col, row))
    }

    /// Transform for a window of this grid; the origin moves to the window's
    /// top-left corner and pixel sizes are unchanged.
    pub fn for_window(&self, window: &Window) -> Self {
        let (origin_x, origin_y) = self.apply(window.col_off as f64, window.row_off as f64);
        Self {
            origin_x,
            origin_y,
            ..*self
        }
    }

    /// Extent `(min_x, min_y, max_x, max_y)` covered by a `width` × `height`
    /// grid.
    pub fn bounds(&self, width: usize, height: usize) -> (f64, f64, f64, f64) {
        let corners = [
            self.apply(0.0, 0.0),
            self.apply(width as f64, 0.0),
            self.apply(0.0, height as f64),
            self.apply(width as f64, height as f64),
        ];
        let mut min_x = f64::INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut max_y = f64::NEG_INFINITY;
        for (x, y) in corners {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
        (min_x, min_y, max_x, max_y)
    }
}

/// A rectangular pixel window of a raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub col_off: usize,
    pub row_off: usize,
    pub width: usize,
    pub height: usize,
}

impl Window {
    pub fn new(col_off: usize, row_off: usize, width: usize, height: usize) -> Self {
        Self {
            col_off,
            row_off,
            width,
            height,
        }
    }

    /// The window covering an entire raster.
    pub fn full(width: usize, height: usize) -> Self {
        Self::new(0, 0, width, height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn len(&self) -> usize {
        self.width * self.height
    }

    /// Whether this window lies entirely inside a `width` × `height` raster.
    pub fn fits_within(&self, width: usize, height: usize) -> bool {
        self.col_off + self.width <= width && self.row_off + self.height <= height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gdal_roundtrip() {
        let c = [-20.0, 0.5, 0.0, 10.0, 0.0, -0.5];
        assert_eq!(GeoTransform::from_gdal(c).to_gdal(), c);
    }

    #[test]
    fn test_apply_and_invert() {
        let gt = GeoTransform::north_up(-20.0, 10.0, 0.5, -0.5);
        let (x, y) = gt.apply(4.0, 6.0);
        assert_eq!((x, y), (-18.0, 7.0));

        let (col, row) = gt.to_pixel(x, y).unwrap();
        assert!((col - 4.0).abs() < 1e-12);
        assert!((row - 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_invert_rotated() {
        let gt = GeoTransform::from_gdal([100.0, 2.0, 0.5, 50.0, 0.25, -2.0]);
        let (x, y) = gt.apply(3.5, 7.25);
        let (col, row) = gt.to_pixel(x, y).unwrap();
        assert!((col - 3.5).abs() < 1e-9);
        assert!((row - 7.25).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_transform() {
        let gt = GeoTransform::north_up(0.0, 0.0, 0.0, -1.0);
        assert!(gt.to_pixel(1.0, 1.0).is_none());
    }

    #[test]
    fn test_for_window_moves_origin() {
        let gt = GeoTransform::north_up(-20.0, 10.0, 0.5, -0.5);
        let sub = gt.for_window(&Window::new(10, 4, 3, 3));
        assert_eq!(sub.origin_x, -15.0);
        assert_eq!(sub.origin_y, 8.0);
        assert_eq!(sub.pixel_width, 0.5);
        assert_eq!(sub.pixel_height, -0.5);
    }

    #[test]
    fn test_bounds_north_up() {
        let gt = GeoTransform::north_up(-20.0, 10.0, 0.5, -0.5);
        assert_eq!(gt.bounds(80, 80), (-20.0, -30.0, 20.0, 10.0));
    }
}
