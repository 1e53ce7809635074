//! Rotated-pole (oblique transformation) projection.
//!
//! Regional analyses such as RDPA are stored on a latitude/longitude grid
//! whose pole has been moved so that the domain sits near the rotated
//! equator, which keeps grid cells close to equal-area. This is the PROJ
//! `+proj=ob_tran +o_proj=longlat` projection.
//!
//! The projection parameters are:
//! - `o_lat_p`: latitude of the rotated north pole
//! - `o_lon_p`: longitude of the rotated north pole in the rotated system
//! - `lon_0`: central meridian applied before rotation
//! - `R`: sphere radius (carried for the CRS definition; native coordinates
//!   are rotated degrees so it does not enter the transform)
//!
//! Formulas follow Snyder, "Map Projections: A Working Manual", (5-7) through
//! (5-10b).

use std::f64::consts::PI;

use crate::error::{ProjectionError, ProjectionResult};

/// Rotated-pole projection parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct RotatedPole {
    /// Latitude of the rotated pole (degrees)
    pub o_lat_p: f64,
    /// Longitude of the rotated pole in the rotated system (degrees)
    pub o_lon_p: f64,
    /// Central meridian (degrees)
    pub lon_0: f64,
    /// Sphere radius (meters)
    pub radius: f64,
    sin_phip: f64,
    cos_phip: f64,
}

impl RotatedPole {
    /// Create a new rotated-pole projection.
    ///
    /// `o_lat_p` must be strictly between -90 and 90 and not zero; PROJ treats
    /// a zero pole latitude as the transverse case which is not supported here.
    pub fn new(o_lat_p: f64, o_lon_p: f64, lon_0: f64, radius: f64) -> ProjectionResult<Self> {
        if !o_lat_p.is_finite() || o_lat_p.abs() >= 90.0 || o_lat_p.abs() < 1e-10 {
            return Err(ProjectionError::invalid_parameter(
                "o_lat_p",
                format!("{} is not a usable pole latitude", o_lat_p),
            ));
        }
        if !o_lon_p.is_finite() {
            return Err(ProjectionError::invalid_parameter("o_lon_p", "not finite"));
        }
        if !lon_0.is_finite() {
            return Err(ProjectionError::invalid_parameter("lon_0", "not finite"));
        }
        if !radius.is_finite() || radius <= 0.0 {
            return Err(ProjectionError::invalid_parameter("R", "must be positive"));
        }

        let phip = o_lat_p.to_radians();
        Ok(Self {
            o_lat_p,
            o_lon_p,
            lon_0,
            radius,
            sin_phip: phip.sin(),
            cos_phip: phip.cos(),
        })
    }

    /// The Regional Deterministic Precipitation Analysis rotated grid.
    ///
    /// `+proj=ob_tran +o_proj=longlat +o_lon_p=0 +o_lat_p=31.758312
    /// +lon_0=-92.402969 +R=6371229`
    pub fn rdpa() -> Self {
        let phip = 31.758312_f64.to_radians();
        Self {
            o_lat_p: 31.758312,
            o_lon_p: 0.0,
            lon_0: -92.402969,
            radius: 6371229.0,
            sin_phip: phip.sin(),
            cos_phip: phip.cos(),
        }
    }

    /// Convert geographic coordinates (lon/lat in degrees) to rotated
    /// coordinates (rotated lon/lat in degrees).
    pub fn forward(&self, lon_deg: f64, lat_deg: f64) -> ProjectionResult<(f64, f64)> {
        check_geographic(lon_deg, lat_deg)?;

        let lam = (lon_deg - self.lon_0).to_radians();
        let phi = lat_deg.to_radians();

        let (sin_lam, cos_lam) = lam.sin_cos();
        let (sin_phi, cos_phi) = phi.sin_cos();

        // (5-8b)
        let x = adjlon(
            (cos_phi * sin_lam).atan2(self.sin_phip * cos_phi * cos_lam + self.cos_phip * sin_phi)
                + self.o_lon_p.to_radians(),
        );
        // (5-7)
        let y = aasin(self.sin_phip * sin_phi - self.cos_phip * cos_phi * cos_lam);

        Ok((x.to_degrees(), y.to_degrees()))
    }

    /// Convert rotated coordinates (degrees) back to geographic lon/lat
    /// (degrees).
    pub fn inverse(&self, x_deg: f64, y_deg: f64) -> ProjectionResult<(f64, f64)> {
        if !x_deg.is_finite() || !y_deg.is_finite() || y_deg.abs() > 90.0 {
            return Err(ProjectionError::OutOfDomain { x: x_deg, y: y_deg });
        }

        let lam = (x_deg - self.o_lon_p).to_radians();
        let phi = y_deg.to_radians();

        let (sin_lam, cos_lam) = lam.sin_cos();
        let (sin_phi, cos_phi) = phi.sin_cos();

        // (5-9)
        let lat = aasin(self.sin_phip * sin_phi + self.cos_phip * cos_phi * cos_lam);
        // (5-10b)
        let lon = (cos_phi * sin_lam).atan2(self.sin_phip * cos_phi * cos_lam - self.cos_phip * sin_phi);

        Ok((adjlon(lon + self.lon_0.to_radians()).to_degrees(), lat.to_degrees()))
    }
}

fn check_geographic(lon: f64, lat: f64) -> ProjectionResult<()> {
    if !lon.is_finite() || !lat.is_finite() || lat.abs() > 90.0 || lon.abs() > 540.0 {
        return Err(ProjectionError::OutOfDomain { x: lon, y: lat });
    }
    Ok(())
}

/// Arcsine clamped against rounding just outside [-1, 1].
fn aasin(v: f64) -> f64 {
    v.clamp(-1.0, 1.0).asin()
}

/// Normalize a longitude in radians to [-π, π].
fn adjlon(mut lon: f64) -> f64 {
    while lon > PI {
        lon -= 2.0 * PI;
    }
    while lon < -PI {
        lon += 2.0 * PI;
    }
    lon
}
