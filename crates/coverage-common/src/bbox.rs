//! Bounding box types and operations.

use serde::{Deserialize, Serialize};

/// A geographic or projected bounding box.
///
/// For geographic CRS (EPSG:4326), coordinates are in degrees.
/// For the rotated-pole native grid, coordinates are rotated degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Build a bbox from a `[minx, miny, maxx, maxy]` slice.
    ///
    /// Rejects slices of the wrong length, non-finite values and inverted
    /// extents.
    pub fn from_slice(values: &[f64]) -> Result<Self, BboxParseError> {
        let [min_x, min_y, max_x, max_y] = values else {
            return Err(BboxParseError::InvalidFormat(format!("{:?}", values)));
        };

        if values.iter().any(|v| !v.is_finite()) {
            return Err(BboxParseError::InvalidNumber(format!("{:?}", values)));
        }

        if min_x > max_x || min_y > max_y {
            return Err(BboxParseError::Inverted(format!("{:?}", values)));
        }

        Ok(Self::new(*min_x, *min_y, *max_x, *max_y))
    }

    /// The four corners in ring order:
    /// (min,min) → (min,max) → (max,max) → (max,min).
    pub fn corners(&self) -> [(f64, f64); 4] {
        [
            (self.min_x, self.min_y),
            (self.min_x, self.max_y),
            (self.max_x, self.max_y),
            (self.max_x, self.min_y),
        ]
    }

    /// The bbox as `[minx, miny, maxx, maxy]`.
    pub fn to_array(&self) -> [f64; 4] {
        [self.min_x, self.min_y, self.max_x, self.max_y]
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BboxParseError {
    #[error("Invalid bbox format: {0}. Expected [minx, miny, maxx, maxy]")]
    InvalidFormat(String),

    #[error("Invalid number in bbox: {0}")]
    InvalidNumber(String),

    #[error("Inverted bbox (min greater than max): {0}")]
    Inverted(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corners_ring_order() {
        let bbox = BoundingBox::new(0.0, 1.0, 2.0, 3.0);
        assert_eq!(
            bbox.corners(),
            [(0.0, 1.0), (0.0, 3.0), (2.0, 3.0), (2.0, 1.0)]
        );
    }
}
