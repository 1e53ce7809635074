//! Query parameters and their validated form.
//!
//! A [`CoverageQuery`] carries the parameters as received. Validation turns
//! it into a [`SubsetRequest`], a closed sum of output mode, time selection
//! and spatial selection, before any file is touched.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use coverage_common::{BoundingBox, DatetimeSpec, TimeInterval};
use serde::{Deserialize, Serialize};

use crate::descriptor::CoverageDescriptor;
use crate::error::{QueryError, QueryResult};

/// Format name selecting structured (CoverageJSON) output.
pub const STRUCTURED_FORMAT: &str = "json";

/// Subset key for the temporal axis, which is selected with `datetime` instead.
const TIME_AXIS: &str = "time";

/// Coverage query parameters as received.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverageQuery {
    /// Band identifiers; empty selects every band
    pub properties: Vec<String>,
    /// Axis label → `[min, max]` in native coordinates
    pub subsets: BTreeMap<String, [f64; 2]>,
    /// `[minx, miny, maxx, maxy]` in EPSG:4326; empty for none
    pub bbox: Vec<f64>,
    /// Instant or `start/end` interval
    pub datetime: Option<String>,
    /// `json` or the native driver name; absent means `json`
    pub format: Option<String>,
}

impl CoverageQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn properties<I, S>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.properties = properties.into_iter().map(Into::into).collect();
        self
    }

    pub fn subset(mut self, axis: &str, min: f64, max: f64) -> Self {
        self.subsets.insert(axis.to_string(), [min, max]);
        self
    }

    pub fn bbox(mut self, bbox: [f64; 4]) -> Self {
        self.bbox = bbox.to_vec();
        self
    }

    pub fn datetime(mut self, datetime: &str) -> Self {
        self.datetime = Some(datetime.to_string());
        self
    }

    pub fn format(mut self, format: &str) -> Self {
        self.format = Some(format.to_string());
        self
    }
}

/// Output encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// CoverageJSON, single timestep and single band
    Structured,
    /// Encoded raster in the configured native format
    Native,
}

/// Which file(s) of the time series a request reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeQuery {
    /// The most recent file
    Latest,
    /// The file valid at exactly this time
    Instant(DateTime<Utc>),
    /// Every file valid inside the interval
    Range(TimeInterval),
}

/// Spatial selection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpatialSubset {
    /// Full raster extent
    None,
    /// Geographic bbox, reprojected per corner
    Bbox(BoundingBox),
    /// Native-axis ranges, used as-is
    Axes(BoundingBox),
}

/// A validated request.
#[derive(Debug, Clone, PartialEq)]
pub struct SubsetRequest {
    /// 1-based band indices, never empty
    pub bands: Vec<usize>,
    pub spatial: SpatialSubset,
    pub time: TimeQuery,
    pub output: OutputMode,
}

impl SubsetRequest {
    /// Validate a query against the coverage.
    ///
    /// Every rejection here happens before file resolution.
    pub fn validate(
        query: &CoverageQuery,
        descriptor: &CoverageDescriptor,
        native_format: &str,
    ) -> QueryResult<Self> {
        let spatial = parse_spatial(query, descriptor)?;
        let time = parse_time(query.datetime.as_deref())?;
        let output = parse_output(query.format.as_deref(), native_format)?;
        let bands = parse_bands(&query.properties, descriptor.band_count)?;

        if output == OutputMode::Structured {
            if bands.len() > 1 {
                return Err(QueryError::invalid_subset(
                    "CoverageJSON output supports a single band; select one property",
                ));
            }
            if matches!(time, TimeQuery::Range(_)) {
                return Err(QueryError::invalid_subset(
                    "Date range not yet supported for CovJSON output",
                ));
            }
        }

        Ok(Self {
            bands,
            spatial,
            time,
            output,
        })
    }

    /// Band read from each file of a temporal stack: the first selected one.
    pub fn stack_band(&self) -> usize {
        self.bands.first().copied().unwrap_or(1)
    }
}

fn parse_spatial(query: &CoverageQuery, descriptor: &CoverageDescriptor) -> QueryResult<SpatialSubset> {
    let x_range = query.subsets.get(&descriptor.x_axis_label);
    let y_range = query.subsets.get(&descriptor.y_axis_label);

    if query.subsets.contains_key(TIME_AXIS) {
        return Err(QueryError::invalid_subset(
            "subsetting by time is not supported; use datetime",
        ));
    }
    if let Some(label) = query
        .subsets
        .keys()
        .find(|k| **k != descriptor.x_axis_label && **k != descriptor.y_axis_label)
    {
        return Err(QueryError::invalid_subset(format!("unknown subset axis '{}'", label)));
    }

    if !query.bbox.is_empty() {
        if x_range.is_some() && y_range.is_some() {
            return Err(QueryError::invalid_subset(
                "bbox and subsetting by coordinates are exclusive",
            ));
        }
        let bbox = BoundingBox::from_slice(&query.bbox)
            .map_err(|e| QueryError::invalid_subset(e.to_string()))?;
        return Ok(SpatialSubset::Bbox(bbox));
    }

    match (x_range, y_range) {
        (Some(x), Some(y)) => {
            let bbox = BoundingBox::from_slice(&[x[0], y[0], x[1], y[1]])
                .map_err(|e| QueryError::invalid_subset(e.to_string()))?;
            Ok(SpatialSubset::Axes(bbox))
        }
        (None, None) => Ok(SpatialSubset::None),
        _ => Err(QueryError::invalid_subset(format!(
            "spatial subsetting needs both '{}' and '{}'",
            descriptor.x_axis_label, descriptor.y_axis_label
        ))),
    }
}

fn parse_time(datetime: Option<&str>) -> QueryResult<TimeQuery> {
    let Some(value) = datetime.filter(|d| !d.trim().is_empty()) else {
        return Ok(TimeQuery::Latest);
    };

    match DatetimeSpec::parse(value) {
        Ok(DatetimeSpec::Instant(t)) => Ok(TimeQuery::Instant(t)),
        Ok(DatetimeSpec::Interval(interval)) => Ok(TimeQuery::Range(interval)),
        Err(_) => Err(QueryError::DatetimeOutOfDomain {
            value: value.to_string(),
        }),
    }
}

fn parse_output(format: Option<&str>, native_format: &str) -> QueryResult<OutputMode> {
    match format {
        None => Ok(OutputMode::Structured),
        Some(f) if f.eq_ignore_ascii_case(STRUCTURED_FORMAT) => Ok(OutputMode::Structured),
        Some(f) if f.eq_ignore_ascii_case(native_format) => Ok(OutputMode::Native),
        Some(f) => Err(QueryError::UnsupportedFormat(format!(
            "'{}' (expected '{}' or '{}')",
            f, STRUCTURED_FORMAT, native_format
        ))),
    }
}

fn parse_bands(properties: &[String], available: usize) -> QueryResult<Vec<usize>> {
    if properties.is_empty() {
        return Ok((1..=available).collect());
    }

    properties
        .iter()
        .map(|p| {
            let requested: usize = p
                .trim()
                .parse()
                .map_err(|_| QueryError::invalid_subset(format!("invalid band identifier '{}'", p)))?;
            if requested == 0 || requested > available {
                return Err(QueryError::BandOutOfRange { requested, available });
            }
            Ok(requested)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use coverage_common::BoundingBox;
    use projection::{Crs, RotatedPole};
    use raster_io::GeoTransform;

    use crate::error::QueryErrorKind;

    fn descriptor(bands: usize) -> CoverageDescriptor {
        CoverageDescriptor {
            crs: Crs::RotatedPole(RotatedPole::rdpa()),
            geotransform: GeoTransform::north_up(-20.0, 10.0, 0.5, -0.5),
            width: 80,
            height: 80,
            x_axis_label: "x".to_string(),
            y_axis_label: "y".to_string(),
            band_count: bands,
            fields: (1..=bands).map(|n| n.to_string()).collect(),
            bbox: BoundingBox::new(-20.0, -30.0, 20.0, 10.0),
            units: Some("mm".to_string()),
            nodata: None,
            data_type: "float32".to_string(),
            source: None,
        }
    }

    fn validate(query: CoverageQuery) -> QueryResult<SubsetRequest> {
        SubsetRequest::validate(&query, &descriptor(1), "GTiff")
    }

    #[test]
    fn test_defaults() {
        let req = validate(CoverageQuery::new()).unwrap();
        assert_eq!(req.bands, vec![1]);
        assert_eq!(req.spatial, SpatialSubset::None);
        assert_eq!(req.time, TimeQuery::Latest);
        assert_eq!(req.output, OutputMode::Structured);
    }

    #[test]
    fn test_bbox_and_axes_exclusive() {
        let query = CoverageQuery::new()
            .bbox([-100.0, 40.0, -90.0, 50.0])
            .subset("x", -5.0, 0.0)
            .subset("y", -15.0, -10.0);
        let err = validate(query).unwrap_err();
        assert_eq!(err.kind(), QueryErrorKind::InvalidSubsetSpecification);
        assert_eq!(err.to_string(), "bbox and subsetting by coordinates are exclusive");
    }

    #[test]
    fn test_axes_subset() {
        let query = CoverageQuery::new().subset("x", -5.0, 0.0).subset("y", -15.0, -10.0);
        let req = validate(query).unwrap();
        assert_eq!(req.spatial, SpatialSubset::Axes(BoundingBox::new(-5.0, -15.0, 0.0, -10.0)));
    }

    #[test]
    fn test_single_axis_rejected() {
        let query = CoverageQuery::new().subset("x", -5.0, 0.0);
        assert!(matches!(validate(query), Err(QueryError::InvalidSubset(_))));

        let query = CoverageQuery::new().subset("lat", -5.0, 0.0);
        assert!(matches!(validate(query), Err(QueryError::InvalidSubset(_))));
    }

    #[test]
    fn test_malformed_bbox() {
        let query = CoverageQuery { bbox: vec![1.0, 2.0, 3.0], ..Default::default() };
        assert!(matches!(validate(query), Err(QueryError::InvalidSubset(_))));

        let query = CoverageQuery::new().bbox([10.0, 10.0, 5.0, 5.0]);
        assert!(matches!(validate(query), Err(QueryError::InvalidSubset(_))));
    }

    #[test]
    fn test_datetime_forms() {
        let req = validate(CoverageQuery::new().datetime("2023-06-02T00Z")).unwrap();
        assert_eq!(
            req.time,
            TimeQuery::Instant(Utc.with_ymd_and_hms(2023, 6, 2, 0, 0, 0).unwrap())
        );

        let req = validate(CoverageQuery::new().format("GTiff").datetime("2023-06-01T00Z/..")).unwrap();
        assert!(matches!(req.time, TimeQuery::Range(TimeInterval { end: None, .. })));

        let err = validate(CoverageQuery::new().datetime("last tuesday")).unwrap_err();
        assert_eq!(err.kind(), QueryErrorKind::DatetimeOutOfDomain);
    }

    #[test]
    fn test_format_selection() {
        assert_eq!(validate(CoverageQuery::new().format("JSON")).unwrap().output, OutputMode::Structured);
        assert_eq!(validate(CoverageQuery::new().format("gtiff")).unwrap().output, OutputMode::Native);
        assert!(matches!(
            validate(CoverageQuery::new().format("NetCDF")),
            Err(QueryError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_band_validation() {
        let desc = descriptor(3);
        let req = SubsetRequest::validate(&CoverageQuery::new().format("GTiff"), &desc, "GTiff").unwrap();
        assert_eq!(req.bands, vec![1, 2, 3]);

        let query = CoverageQuery::new().format("GTiff").properties(["3", "1"]);
        assert_eq!(SubsetRequest::validate(&query, &desc, "GTiff").unwrap().bands, vec![3, 1]);

        let query = CoverageQuery::new().properties(["4"]);
        assert!(matches!(
            SubsetRequest::validate(&query, &desc, "GTiff"),
            Err(QueryError::BandOutOfRange { requested: 4, available: 3 })
        ));

        let query = CoverageQuery::new().properties(["0"]);
        assert!(matches!(
            SubsetRequest::validate(&query, &desc, "GTiff"),
            Err(QueryError::BandOutOfRange { requested: 0, .. })
        ));

        let query = CoverageQuery::new().properties(["precip"]);
        assert!(matches!(
            SubsetRequest::validate(&query, &desc, "GTiff"),
            Err(QueryError::InvalidSubset(_))
        ));
    }

    #[test]
    fn test_structured_rejects_multiple_bands_idempotently() {
        let desc = descriptor(2);
        let query = CoverageQuery::new().format("json");
        for _ in 0..3 {
            let err = SubsetRequest::validate(&query, &desc, "GTiff").unwrap_err();
            assert_eq!(err.kind(), QueryErrorKind::InvalidSubsetSpecification);
        }
    }

    #[test]
    fn test_structured_rejects_range() {
        let query = CoverageQuery::new().format("json").datetime("2023-06-01T00Z/2023-06-02T00Z");
        let err = validate(query).unwrap_err();
        assert_eq!(err.kind(), QueryErrorKind::InvalidSubsetSpecification);
    }

    #[test]
    fn test_range_stack_band() {
        let desc = descriptor(3);
        let query = CoverageQuery::new().format("GTiff").datetime("2023-06-01T00Z/2023-06-03T00Z");
        let req = SubsetRequest::validate(&query, &desc, "GTiff").unwrap();
        assert_eq!(req.stack_band(), 1);

        let query = query.properties(["2"]);
        let req = SubsetRequest::validate(&query, &desc, "GTiff").unwrap();
        assert_eq!(req.stack_band(), 2);

        let query = CoverageQuery::new()
            .format("GTiff")
            .datetime("2023-06-01T00Z/2023-06-03T00Z")
            .properties(["3", "2"]);
        let req = SubsetRequest::validate(&query, &desc, "GTiff").unwrap();
        assert_eq!(req.bands, vec![3, 2]);
        assert_eq!(req.stack_band(), 3);
    }

    #[test]
    fn test_time_subset_rejected() {
        let query = CoverageQuery::new().subset("time", 0.0, 1.0);
        let err = validate(query).unwrap_err();
        assert_eq!(err.kind(), QueryErrorKind::InvalidSubsetSpecification);

        // Rejected alongside valid spatial axes as well
        let query = CoverageQuery::new()
            .format("GTiff")
            .subset("x", -5.0, 0.0)
            .subset("y", -15.0, -10.0)
            .subset("time", 0.0, 1.0);
        assert!(matches!(validate(query), Err(QueryError::InvalidSubset(_))));
    }
}
