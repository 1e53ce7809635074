//! Common test fixtures for coverage tests.
//!
//! This module provides pre-defined test data that represents common
//! scenarios for rotated-pole precipitation analyses.

/// Common bounding box definitions for testing, in EPSG:4326 order
/// `[min_lon, min_lat, max_lon, max_lat]`.
pub mod bbox {
    /// Central plains, well inside the fixture grid
    pub const PLAINS: [f64; 4] = [-100.0, 40.0, -90.0, 50.0];

    /// A small box around Winnipeg
    pub const WINNIPEG: [f64; 4] = [-98.0, 49.0, -96.0, 51.0];

    /// Southern hemisphere, nowhere near the rotated grid
    pub const TASMAN_SEA: [f64; 4] = [150.0, -45.0, 160.0, -35.0];

    /// Invalid bbox (min > max)
    pub const INVALID: [f64; 4] = [10.0, 10.0, 5.0, 5.0];
}

/// Rotated-pole grid specifications for testing.
pub mod grid {
    use raster_io::GeoTransform;

    /// 80x80 half-degree grid centred on the rotated prime meridian.
    ///
    /// Rotated extent is x -20..20, y -30..10, which covers the central
    /// plains of North America under the RDPA rotation.
    pub const RDPA_TEST: RotatedGridSpec = RotatedGridSpec {
        width: 80,
        height: 80,
        origin_x: -20.0,
        origin_y: 10.0,
        resolution: 0.5,
    };

    /// Simple 8x6 grid for tests that only care about layout
    pub const SMALL_8X6: RotatedGridSpec = RotatedGridSpec {
        width: 8,
        height: 6,
        origin_x: 0.0,
        origin_y: 0.0,
        resolution: 1.0,
    };

    /// North-up grid in rotated degrees.
    #[derive(Debug, Clone, Copy)]
    pub struct RotatedGridSpec {
        pub width: usize,
        pub height: usize,
        /// Rotated longitude of the top-left corner
        pub origin_x: f64,
        /// Rotated latitude of the top-left corner
        pub origin_y: f64,
        /// Square pixel size in rotated degrees
        pub resolution: f64,
    }

    impl RotatedGridSpec {
        pub fn geotransform(&self) -> GeoTransform {
            GeoTransform::north_up(self.origin_x, self.origin_y, self.resolution, -self.resolution)
        }

        /// Returns the extent as (min_x, min_y, max_x, max_y).
        pub fn bounds(&self) -> (f64, f64, f64, f64) {
            (
                self.origin_x,
                self.origin_y - self.height as f64 * self.resolution,
                self.origin_x + self.width as f64 * self.resolution,
                self.origin_y,
            )
        }
    }
}

/// Common time values for testing.
pub mod time {
    /// First valid time of the synthetic archive
    pub const ARCHIVE_START: &str = "2023-06-01T00Z";

    /// Daily accumulation interval
    pub const STEP_HOURS: i64 = 24;

    /// Three consecutive daily analyses
    pub const THREE_DAY_RANGE: &str = "2023-06-01T00Z/2023-06-03T00Z";

    /// Two consecutive daily analyses
    pub const TWO_DAY_RANGE: &str = "2023-06-01T00Z/2023-06-02T00Z";

    /// Before anything in the archive
    pub const BEFORE_ARCHIVE: &str = "1999-01-01T00Z";
}

/// Common CRS identifiers.
pub mod crs {
    /// RDPA rotated-pole grid as a PROJ string
    pub const RDPA_PROJ: &str =
        "+proj=ob_tran +o_proj=longlat +o_lon_p=0 +o_lat_p=31.758312 +lon_0=-92.402969 +R=6371229 +no_defs";
}

/// Archive naming.
pub mod naming {
    /// 24-hour accumulation variable
    pub const VARIABLE: &str = "Accum24h";

    /// File name pattern with `{time}` and `{variable}` placeholders
    pub const FILE_PATTERN: &str = "{time}_MSC_RDPA_APCP-{variable}_Sfc_RLatLon0.09_PT0H.tif";

    /// Stamp embedded in file names
    pub const TIME_FORMAT: &str = "%Y%m%dT%HZ";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_spec_bounds_match_geotransform() {
        let spec = grid::RDPA_TEST;
        assert_eq!(spec.bounds(), (-20.0, -30.0, 20.0, 10.0));
        assert_eq!(spec.geotransform().bounds(spec.width, spec.height), spec.bounds());
    }
}
