//! Output encoding: CoverageJSON or an in-memory GeoTIFF.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use coverage_common::{format_hourly, BoundingBox};
use raster_io::{DataType, GeoTiffWriter};
use tracing::debug;

use crate::config::ProviderConfig;
use crate::covjson::{Axis, CovJsonParameter, CoverageJson, Domain, NdArray};
use crate::descriptor::CoverageDescriptor;
use crate::error::{QueryError, QueryResult};
use crate::request::SpatialSubset;
use crate::types::RasterBlock;

/// Nodata written into 16-bit output when the source value does not fit.
pub const UINT16_NODATA: f64 = u16::MAX as f64;

/// An encoded raster and what it covers.
#[derive(Debug, Clone, PartialEq)]
pub struct NativeCoverage {
    pub bytes: Bytes,
    /// The region the caller asked for, or the full native extent.
    pub bbox: BoundingBox,
    pub band_count: usize,
    pub width: usize,
    pub height: usize,
}

/// Encodes raster blocks for one coverage.
#[derive(Debug, Clone, Copy)]
pub struct Serializer<'a> {
    descriptor: &'a CoverageDescriptor,
    config: &'a ProviderConfig,
}

impl<'a> Serializer<'a> {
    pub fn new(descriptor: &'a CoverageDescriptor, config: &'a ProviderConfig) -> Self {
        Self { descriptor, config }
    }

    /// CoverageJSON for the first plane of a block.
    pub fn structured(
        &self,
        block: &RasterBlock,
        valid_time: Option<DateTime<Utc>>,
    ) -> QueryResult<CoverageJson> {
        let Some(band_id) = block.band_ids.first() else {
            return Err(QueryError::encoding("no band to encode"));
        };

        let x = block.x_centers();
        let y = block.y_centers();
        let regular = |values: &[f64]| Axis::Regular {
            start: values.first().copied().unwrap_or_default(),
            stop: values.last().copied().unwrap_or_default(),
            num: values.len(),
        };

        let domain = Domain::grid(
            &self.descriptor.x_axis_label,
            regular(&x),
            &self.descriptor.y_axis_label,
            regular(&y),
            &self.descriptor.crs.to_proj_string(),
            valid_time.as_ref().map(format_hourly),
        );

        let mut parameter = CovJsonParameter::new(&self.config.variable)
            .with_description(format!("{} band {}", self.config.variable, band_id));
        if let Some(units) = &self.descriptor.units {
            parameter = parameter.with_unit(units);
        }

        let values = NdArray::with_missing(
            block.masked_values(0),
            vec![block.height, block.width],
            vec![
                self.descriptor.y_axis_label.clone(),
                self.descriptor.x_axis_label.clone(),
            ],
        );

        let mut coverage = CoverageJson::new(domain).with_parameter(band_id, parameter, values);
        coverage.bbox = Some(block.bounds().to_array());

        debug!(
            band = %band_id,
            width = block.width,
            height = block.height,
            "Encoded CoverageJSON"
        );

        Ok(coverage)
    }

    /// GeoTIFF with one band per plane, encoded at the configured depth.
    pub fn native(&self, block: &RasterBlock, bbox: BoundingBox) -> QueryResult<NativeCoverage> {
        let depth = self.config.pixel_depth;
        let nodata = output_nodata(depth, self.descriptor.nodata);

        // 16-bit quantization maps NaN to the nodata value
        let fill = match (depth, nodata) {
            (DataType::Float32, Some(n)) => n as f32,
            _ => f32::NAN,
        };

        let mut writer = GeoTiffWriter::new(block.width, block.height, block.geotransform)
            .crs(self.descriptor.crs.to_proj_string())
            .nodata(nodata)
            .units(self.descriptor.units.clone())
            .data_type(depth);
        for (name, value) in &self.config.options {
            writer = writer.metadata_item(name, value);
        }
        for plane in 0..block.band_count() {
            writer = writer.band(block.filled_values(plane, fill));
        }

        let bytes = writer
            .to_bytes()
            .map_err(|e| QueryError::encoding(e.to_string()))?;

        debug!(
            bands = block.band_count(),
            width = block.width,
            height = block.height,
            depth = %depth,
            size = bytes.len(),
            "Encoded GeoTIFF"
        );

        Ok(NativeCoverage {
            bytes,
            bbox,
            band_count: block.band_count(),
            width: block.width,
            height: block.height,
        })
    }
}

/// Bounding box reported with native output.
pub fn produced_bbox(spatial: &SpatialSubset, descriptor: &CoverageDescriptor) -> BoundingBox {
    match spatial {
        SpatialSubset::Bbox(bbox) | SpatialSubset::Axes(bbox) => *bbox,
        SpatialSubset::None => descriptor.bbox,
    }
}

/// Nodata value representable at the output depth.
fn output_nodata(depth: DataType, source: Option<f64>) -> Option<f64> {
    match depth {
        DataType::Float32 => source,
        DataType::UInt16 => match source {
            Some(n) if n.fract() == 0.0 && (0.0..=UINT16_NODATA).contains(&n) => Some(n),
            _ => Some(UINT16_NODATA),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use projection::{Crs, RotatedPole};
    use raster_io::{GeoTransform, RasterFile};
    use std::path::PathBuf;

    fn descriptor(nodata: Option<f64>) -> CoverageDescriptor {
        let geotransform = GeoTransform::north_up(-20.0, 10.0, 0.5, -0.5);
        CoverageDescriptor {
            crs: Crs::RotatedPole(RotatedPole::rdpa()),
            geotransform,
            width: 80,
            height: 80,
            x_axis_label: "x".to_string(),
            y_axis_label: "y".to_string(),
            band_count: 1,
            fields: vec!["1".to_string()],
            bbox: BoundingBox::new(-20.0, -30.0, 20.0, 10.0),
            units: Some("mm".to_string()),
            nodata,
            data_type: "float32".to_string(),
            source: Some(PathBuf::from("/data/rdpa/latest.tif")),
        }
    }

    fn block() -> RasterBlock {
        let mut block = RasterBlock::new(3, 2, GeoTransform::north_up(-1.0, -10.0, 0.5, -0.5));
        block.push_plane(
            "1",
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            vec![true, false, true, true, true, true],
        );
        block
    }

    #[test]
    fn test_structured_grid_domain() {
        let descriptor = descriptor(Some(-9999.0));
        let config = ProviderConfig::default();
        let cov = Serializer::new(&descriptor, &config)
            .structured(&block(), None)
            .unwrap();

        assert_eq!(cov.domain.axes["x"], Axis::Regular { start: -0.75, stop: 0.25, num: 3 });
        assert_eq!(cov.domain.axes["y"], Axis::Regular { start: -10.25, stop: -10.75, num: 2 });
        assert!(!cov.domain.axes.contains_key("t"));
        assert_eq!(cov.bbox, Some([-1.0, -11.0, 0.5, -10.0]));

        let range = &cov.ranges["1"];
        assert_eq!(range.shape, vec![2, 3]);
        assert_eq!(range.values[0], Some(1.0));
        assert_eq!(range.values[1], None);
        assert_eq!(cov.parameters["1"].unit.as_ref().unwrap().symbol, "mm");
    }

    #[test]
    fn test_structured_empty_block_is_encoding_error() {
        let descriptor = descriptor(None);
        let config = ProviderConfig::default();
        let empty = RasterBlock::new(3, 2, GeoTransform::north_up(0.0, 0.0, 1.0, -1.0));
        assert!(matches!(
            Serializer::new(&descriptor, &config).structured(&empty, None),
            Err(QueryError::Encoding(_))
        ));
    }

    #[test]
    fn test_native_uint16_masks_to_nodata() {
        let descriptor = descriptor(Some(-9999.0));
        let config = ProviderConfig::default();
        let out = Serializer::new(&descriptor, &config)
            .native(&block(), descriptor.bbox)
            .unwrap();

        let raster = RasterFile::from_bytes(&out.bytes).unwrap();
        assert_eq!((raster.width(), raster.height(), raster.band_count()), (3, 2, 1));
        assert_eq!(raster.nodata(), Some(UINT16_NODATA));
        let values = raster.read_band(1).unwrap();
        assert_eq!(values[0], 1.0);
        assert_eq!(values[1], 65535.0);
        assert_eq!(raster.units(), Some("mm"));
        assert_eq!(
            Crs::from_proj_string(raster.crs().unwrap()).unwrap(),
            descriptor.crs
        );
    }

    #[test]
    fn test_native_uint16_refuses_lossy_values() {
        let descriptor = descriptor(Some(-9999.0));
        let config = ProviderConfig::default();
        let mut fractional = RasterBlock::new(3, 1, GeoTransform::north_up(0.0, 0.0, 1.0, -1.0));
        fractional.push_plane("1", vec![0.4, 2.6, -1.0], vec![true; 3]);

        let result = Serializer::new(&descriptor, &config).native(&fractional, descriptor.bbox);
        assert!(matches!(result, Err(QueryError::Encoding(_))));

        // 65535 is the output nodata here, so a valid 65535 cannot be written
        let mut colliding = RasterBlock::new(2, 1, GeoTransform::north_up(0.0, 0.0, 1.0, -1.0));
        colliding.push_plane("1", vec![1.0, 65535.0], vec![true; 2]);
        let result = Serializer::new(&descriptor, &config).native(&colliding, descriptor.bbox);
        assert!(matches!(result, Err(QueryError::Encoding(_))));

        // The same values survive at float depth
        let mut config = ProviderConfig::default();
        config.pixel_depth = DataType::Float32;
        let out = Serializer::new(&descriptor, &config)
            .native(&fractional, descriptor.bbox)
            .unwrap();
        let raster = RasterFile::from_bytes(&out.bytes).unwrap();
        assert_eq!(raster.read_band(1).unwrap(), &[0.4, 2.6, -1.0]);
    }

    #[test]
    fn test_native_float32_keeps_source_nodata_and_options() {
        let descriptor = descriptor(Some(-9999.0));
        let mut config = ProviderConfig::default();
        config.pixel_depth = DataType::Float32;
        config.options.insert("PRODUCT".to_string(), "RDPA".to_string());

        let out = Serializer::new(&descriptor, &config)
            .native(&block(), descriptor.bbox)
            .unwrap();
        let raster = RasterFile::from_bytes(&out.bytes).unwrap();

        assert_eq!(raster.nodata(), Some(-9999.0));
        assert_eq!(raster.read_band(1).unwrap()[1], -9999.0);
        assert_eq!(raster.metadata().items.get("PRODUCT").map(String::as_str), Some("RDPA"));
    }

    #[test]
    fn test_output_nodata_fits_depth() {
        assert_eq!(output_nodata(DataType::UInt16, Some(0.0)), Some(0.0));
        assert_eq!(output_nodata(DataType::UInt16, Some(-9999.0)), Some(UINT16_NODATA));
        assert_eq!(output_nodata(DataType::UInt16, None), Some(UINT16_NODATA));
        assert_eq!(output_nodata(DataType::Float32, None), None);
    }

    #[test]
    fn test_produced_bbox() {
        let descriptor = descriptor(None);
        let bbox = BoundingBox::new(-100.0, 40.0, -90.0, 50.0);
        assert_eq!(produced_bbox(&SpatialSubset::Bbox(bbox), &descriptor), bbox);
        assert_eq!(produced_bbox(&SpatialSubset::None, &descriptor), descriptor.bbox);
    }
}
