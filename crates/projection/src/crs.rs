//! Coordinate reference system definitions.
//!
//! A [`Crs`] is either plain geographic WGS84 (EPSG:4326, lon/lat order) or
//! a rotated-pole grid. Rotated-pole systems have no EPSG code, so they are
//! exchanged as PROJ strings; [`Crs::to_proj_string`] output is always
//! accepted by [`Crs::from_proj_string`].

use std::collections::HashMap;
use std::fmt;

use crate::error::{ProjectionError, ProjectionResult};
use crate::rotated_pole::RotatedPole;

/// Supported coordinate reference systems.
#[derive(Debug, Clone, PartialEq)]
pub enum Crs {
    /// WGS84 geographic, longitude/latitude in degrees
    Geographic,
    /// Rotated-pole latitude/longitude grid
    RotatedPole(RotatedPole),
}

impl Crs {
    /// Parse a PROJ string such as
    /// `+proj=ob_tran +o_proj=longlat +o_lon_p=0 +o_lat_p=31.758312 +lon_0=-92.402969 +R=6371229 +no_defs`.
    pub fn from_proj_string(s: &str) -> ProjectionResult<Self> {
        let params = parse_proj_params(s)?;

        let proj = params
            .get("proj")
            .and_then(|v| v.as_deref())
            .ok_or_else(|| ProjectionError::InvalidCrs(format!("missing +proj in '{}'", s)))?;

        match proj {
            "longlat" | "lonlat" | "latlong" | "latlon" => Ok(Crs::Geographic),
            "ob_tran" => {
                let o_proj = params.get("o_proj").and_then(|v| v.as_deref()).unwrap_or("");
                if !matches!(o_proj, "longlat" | "lonlat" | "latlong" | "latlon") {
                    return Err(ProjectionError::Unsupported(format!(
                        "ob_tran with o_proj='{}'",
                        o_proj
                    )));
                }

                let o_lat_p = required_f64(&params, "o_lat_p")?;
                let o_lon_p = optional_f64(&params, "o_lon_p")?.unwrap_or(0.0);
                let lon_0 = optional_f64(&params, "lon_0")?.unwrap_or(0.0);
                let radius = optional_f64(&params, "R")?.unwrap_or(6371229.0);

                Ok(Crs::RotatedPole(RotatedPole::new(o_lat_p, o_lon_p, lon_0, radius)?))
            }
            other => Err(ProjectionError::Unsupported(other.to_string())),
        }
    }

    /// Render this CRS as a PROJ string.
    pub fn to_proj_string(&self) -> String {
        match self {
            Crs::Geographic => "+proj=longlat +datum=WGS84 +no_defs".to_string(),
            Crs::RotatedPole(rp) => format!(
                "+proj=ob_tran +o_proj=longlat +o_lon_p={} +o_lat_p={} +lon_0={} +R={} +no_defs",
                rp.o_lon_p, rp.o_lat_p, rp.lon_0, rp.radius
            ),
        }
    }

    /// Check if this is plain geographic lon/lat.
    pub fn is_geographic(&self) -> bool {
        matches!(self, Crs::Geographic)
    }

    /// Convert geographic lon/lat (degrees) into this CRS.
    pub fn forward(&self, lon: f64, lat: f64) -> ProjectionResult<(f64, f64)> {
        match self {
            Crs::Geographic => {
                if !lon.is_finite() || !lat.is_finite() || lat.abs() > 90.0 {
                    return Err(ProjectionError::OutOfDomain { x: lon, y: lat });
                }
                Ok((lon, lat))
            }
            Crs::RotatedPole(rp) => rp.forward(lon, lat),
        }
    }

    /// Convert coordinates in this CRS to geographic lon/lat (degrees).
    pub fn inverse(&self, x: f64, y: f64) -> ProjectionResult<(f64, f64)> {
        match self {
            Crs::Geographic => {
                if !x.is_finite() || !y.is_finite() || y.abs() > 90.0 {
                    return Err(ProjectionError::OutOfDomain { x, y });
                }
                Ok((x, y))
            }
            Crs::RotatedPole(rp) => rp.inverse(x, y),
        }
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Crs::Geographic => write!(f, "EPSG:4326"),
            Crs::RotatedPole(_) => write!(f, "{}", self.to_proj_string()),
        }
    }
}

/// Transform a point between two reference systems, pivoting through
/// geographic coordinates.
pub fn transform_point(src: &Crs, dst: &Crs, x: f64, y: f64) -> ProjectionResult<(f64, f64)> {
    if src == dst {
        return Ok((x, y));
    }
    let (lon, lat) = src.inverse(x, y)?;
    dst.forward(lon, lat)
}

fn parse_proj_params(s: &str) -> ProjectionResult<HashMap<String, Option<String>>> {
    let mut params = HashMap::new();
    for token in s.split_whitespace() {
        let token = token
            .strip_prefix('+')
            .ok_or_else(|| ProjectionError::InvalidCrs(format!("unexpected token '{}'", token)))?;
        match token.split_once('=') {
            Some((key, value)) => params.insert(key.to_string(), Some(value.to_string())),
            None => params.insert(token.to_string(), None),
        };
    }
    Ok(params)
}

fn optional_f64(params: &HashMap<String, Option<String>>, name: &str) -> ProjectionResult<Option<f64>> {
    match params.get(name) {
        None => Ok(None),
        Some(None) => Err(ProjectionError::invalid_parameter(name, "missing value")),
        Some(Some(raw)) => raw
            .parse::<f64>()
            .map(Some)
            .map_err(|_| ProjectionError::invalid_parameter(name, format!("'{}' is not a number", raw))),
    }
}

fn required_f64(params: &HashMap<String, Option<String>>, name: &str) -> ProjectionResult<f64> {
    optional_f64(params, name)?.ok_or_else(|| ProjectionError::invalid_parameter(name, "required"))
}
