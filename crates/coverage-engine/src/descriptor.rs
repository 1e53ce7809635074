//! Coverage description built once from a representative file.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use coverage_common::{format_hourly, BoundingBox};
use projection::Crs;
use raster_io::{GeoTransform, RasterFile};
use serde::Serialize;

use crate::error::ProviderError;

/// Immutable description of a coverage's grid and fields.
///
/// Every file of the collection is assumed to share this grid.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageDescriptor {
    pub crs: Crs,
    pub geotransform: GeoTransform,
    pub width: usize,
    pub height: usize,
    pub x_axis_label: String,
    pub y_axis_label: String,
    pub band_count: usize,
    /// Field identifiers `"1"..="N"`
    pub fields: Vec<String>,
    /// Extent in native coordinates
    pub bbox: BoundingBox,
    pub units: Option<String>,
    pub nodata: Option<f64>,
    /// Sample type of the source files
    pub data_type: String,
    /// File the description was read from
    pub source: Option<PathBuf>,
}

impl CoverageDescriptor {
    /// Describe a decoded raster.
    pub fn from_raster(raster: &RasterFile) -> Result<Self, ProviderError> {
        let proj = raster
            .crs()
            .ok_or_else(|| ProviderError::connection("raster carries no CRS definition"))?;
        let crs = Crs::from_proj_string(proj).map_err(ProviderError::connection)?;

        let (x_axis_label, y_axis_label) = if crs.is_geographic() {
            ("Long", "Lat")
        } else {
            ("x", "y")
        };

        let band_count = raster.band_count();
        if band_count == 0 {
            return Err(ProviderError::connection("raster has no bands"));
        }

        let (min_x, min_y, max_x, max_y) = raster.bounds();

        Ok(Self {
            crs,
            geotransform: *raster.geotransform(),
            width: raster.width(),
            height: raster.height(),
            x_axis_label: x_axis_label.to_string(),
            y_axis_label: y_axis_label.to_string(),
            band_count,
            fields: (1..=band_count).map(|n| n.to_string()).collect(),
            bbox: BoundingBox::new(min_x, min_y, max_x, max_y),
            units: raster.units().map(str::to_string),
            nodata: raster.nodata(),
            data_type: raster.sample_type().to_string(),
            source: raster.path().map(|p| p.to_path_buf()),
        })
    }

    /// Pixel size as positive `(x, y)` resolution.
    pub fn resolution(&self) -> (f64, f64) {
        (self.geotransform.pixel_width.abs(), self.geotransform.pixel_height.abs())
    }

    /// Domain set with a time axis over the available valid times.
    pub fn domain_set(&self, times: &[DateTime<Utc>]) -> DomainSet {
        let (res_x, res_y) = self.resolution();
        let uom = if self.crs.is_geographic() { "deg" } else { "rotated deg" };

        let spatial = |label: &str, lower: f64, upper: f64, resolution: f64| {
            DomainAxis::Regular(RegularAxis {
                type_: "RegularAxisType".to_string(),
                axis_label: label.to_string(),
                lower_bound: lower,
                upper_bound: upper,
                uom_label: uom.to_string(),
                resolution,
            })
        };

        let axis = vec![
            spatial(&self.x_axis_label, self.bbox.min_x, self.bbox.max_x, res_x),
            spatial(&self.y_axis_label, self.bbox.min_y, self.bbox.max_y, res_y),
            DomainAxis::Temporal(TemporalAxis::from_times(times)),
        ];

        DomainSet {
            type_: "DomainSetType".to_string(),
            general_grid: GeneralGrid {
                type_: "GeneralGridCoverageType".to_string(),
                srs_name: self.crs.to_proj_string(),
                axis_labels: vec![
                    self.x_axis_label.clone(),
                    self.y_axis_label.clone(),
                    "time".to_string(),
                ],
                axis,
                grid_limits: GridLimits {
                    type_: "GridLimitsType".to_string(),
                    srs_name: "http://www.opengis.net/def/crs/OGC/0/Index2D".to_string(),
                    axis_labels: vec!["i".to_string(), "j".to_string()],
                    axis: vec![
                        IndexAxis::new("i", self.width),
                        IndexAxis::new("j", self.height),
                    ],
                },
            },
        }
    }

    /// One quantity field per band.
    pub fn range_type(&self, variable: &str) -> RangeType {
        let field = self
            .fields
            .iter()
            .map(|id| RangeField {
                id: id.clone(),
                type_: "QuantityType".to_string(),
                name: if self.band_count == 1 {
                    variable.to_string()
                } else {
                    format!("{} band {}", variable, id)
                },
                definition: self.data_type.clone(),
                nodata: self.nodata,
                uom: self.units.as_ref().map(|units| UnitReference {
                    id: format!("http://www.opengis.net/def/uom/UCUM/{}", units),
                    type_: "UnitReference".to_string(),
                    code: units.clone(),
                }),
            })
            .collect();

        RangeType {
            type_: "DataRecordType".to_string(),
            field,
        }
    }
}

/// Grid and time axes of a coverage.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DomainSet {
    #[serde(rename = "type")]
    pub type_: String,
    pub general_grid: GeneralGrid,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GeneralGrid {
    #[serde(rename = "type")]
    pub type_: String,
    pub srs_name: String,
    pub axis_labels: Vec<String>,
    pub axis: Vec<DomainAxis>,
    pub grid_limits: GridLimits,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum DomainAxis {
    Regular(RegularAxis),
    Temporal(TemporalAxis),
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RegularAxis {
    #[serde(rename = "type")]
    pub type_: String,
    pub axis_label: String,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub uom_label: String,
    pub resolution: f64,
}

/// Time axis listing every available valid time.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TemporalAxis {
    #[serde(rename = "type")]
    pub type_: String,
    pub axis_label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lower_bound: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upper_bound: Option<String>,
    pub uom_label: String,
    /// ISO 8601 duration, present when the steps are uniform
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    pub values: Vec<String>,
}

impl TemporalAxis {
    fn from_times(times: &[DateTime<Utc>]) -> Self {
        let steps: Vec<i64> = times
            .windows(2)
            .map(|pair| (pair[1] - pair[0]).num_hours())
            .collect();
        let resolution = match steps.split_first() {
            Some((first, rest)) if rest.iter().all(|s| s == first) => Some(format!("PT{}H", first)),
            _ => None,
        };

        Self {
            type_: "RegularAxisType".to_string(),
            axis_label: "time".to_string(),
            lower_bound: times.first().map(format_hourly),
            upper_bound: times.last().map(format_hourly),
            uom_label: "ISO 8601".to_string(),
            resolution,
            values: times.iter().map(format_hourly).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GridLimits {
    #[serde(rename = "type")]
    pub type_: String,
    pub srs_name: String,
    pub axis_labels: Vec<String>,
    pub axis: Vec<IndexAxis>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IndexAxis {
    #[serde(rename = "type")]
    pub type_: String,
    pub axis_label: String,
    pub lower_bound: usize,
    pub upper_bound: usize,
}

impl IndexAxis {
    fn new(label: &str, size: usize) -> Self {
        Self {
            type_: "IndexAxisType".to_string(),
            axis_label: label.to_string(),
            lower_bound: 0,
            upper_bound: size,
        }
    }
}

/// Field descriptions of a coverage.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RangeType {
    #[serde(rename = "type")]
    pub type_: String,
    pub field: Vec<RangeField>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RangeField {
    pub id: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub name: String,
    pub definition: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nodata: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uom: Option<UnitReference>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UnitReference {
    pub id: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub code: String,
}
