//! GeoTIFF reading and in-memory encoding.
//!
//! Files are decoded completely on open and the handle is closed before
//! [`RasterFile::open`] returns, so no file descriptor outlives the call on
//! any path. Multi-band data is written band-separate (one strip per band);
//! both band-separate and pixel-interleaved files are read.

use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, Write};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tiff::decoder::{ChunkType, Decoder, DecodingResult};
use tiff::encoder::{DirectoryEncoder, TiffEncoder, TiffKind};
use tiff::tags::Tag;
use tracing::debug;

use crate::error::{RasterError, RasterResult};
use crate::geotransform::{GeoTransform, Window};
use crate::metadata::GdalMetadata;

// GeoTIFF tag IDs
const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const MODEL_TRANSFORMATION: u16 = 34264;
const GEO_KEY_DIRECTORY: u16 = 34735;
const GEO_ASCII_PARAMS: u16 = 34737;

// GDAL private tags
const GDAL_METADATA: u16 = 42112;
const GDAL_NODATA: u16 = 42113;

// GeoKey IDs
const GT_MODEL_TYPE_GEO_KEY: u16 = 1024;
const GT_RASTER_TYPE_GEO_KEY: u16 = 1025;
const GT_CITATION_GEO_KEY: u16 = 1026;

// GeoKey values
const MODEL_TYPE_USER_DEFINED: u16 = 32767;
const RASTER_PIXEL_IS_AREA: u16 = 1;

/// Sample type of encoded pixel data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// 16-bit unsigned integer; only whole values in range are accepted
    #[default]
    UInt16,
    /// 32-bit IEEE float; lossless for decoded data
    Float32,
}

impl DataType {
    pub fn bits(&self) -> u16 {
        match self {
            DataType::UInt16 => 16,
            DataType::Float32 => 32,
        }
    }

    /// TIFF SampleFormat value (1 = unsigned int, 3 = IEEE float).
    fn sample_format(&self) -> u16 {
        match self {
            DataType::UInt16 => 1,
            DataType::Float32 => 3,
        }
    }

    /// Parse from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "uint16" | "u16" | "16" => Some(Self::UInt16),
            "float32" | "f32" | "32" => Some(Self::Float32),
            _ => None,
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataType::UInt16 => write!(f, "uint16"),
            DataType::Float32 => write!(f, "float32"),
        }
    }
}

/// A decoded GeoTIFF held in memory, one plane per band.
#[derive(Debug, Clone)]
pub struct RasterFile {
    path: Option<PathBuf>,
    width: usize,
    height: usize,
    geotransform: GeoTransform,
    crs: Option<String>,
    nodata: Option<f64>,
    metadata: GdalMetadata,
    sample_type: &'static str,
    bands: Vec<Vec<f32>>,
}

impl RasterFile {
    /// Open and decode a GeoTIFF file.
    pub fn open(path: impl AsRef<Path>) -> RasterResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| RasterError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        let mut raster = Self::from_reader(BufReader::new(file))?;
        raster.path = Some(path.to_path_buf());

        debug!(
            path = %path.display(),
            width = raster.width,
            height = raster.height,
            bands = raster.band_count(),
            "Opened raster"
        );

        Ok(raster)
    }

    /// Decode a GeoTIFF from an in-memory buffer.
    pub fn from_bytes(data: &[u8]) -> RasterResult<Self> {
        Self::from_reader(Cursor::new(data))
    }

    /// Decode a GeoTIFF from any seekable reader.
    pub fn from_reader<R: Read + Seek>(reader: R) -> RasterResult<Self> {
        let mut decoder = Decoder::new(reader)?;

        let (width, height) = decoder.dimensions()?;
        let (width, height) = (width as usize, height as usize);

        if width == 0 || height == 0 {
            return Err(RasterError::invalid_data("raster has zero dimensions"));
        }

        let samples = match decoder.find_tag(Tag::SamplesPerPixel)? {
            Some(value) => value.into_u16()? as usize,
            None => 1,
        };
        let planar = match decoder.find_tag(Tag::PlanarConfiguration)? {
            Some(value) => value.into_u16()? == 2,
            None => false,
        };

        let geotransform = read_geotransform(&mut decoder)?;

        let crs = match decoder.find_tag(geo_tag(GEO_ASCII_PARAMS))? {
            Some(value) => {
                let text = value.into_string()?;
                let text = text.trim_end_matches('\0').trim_end_matches('|').trim();
                (!text.is_empty()).then(|| text.to_string())
            }
            None => None,
        };

        let nodata = match decoder.find_tag(geo_tag(GDAL_NODATA))? {
            Some(value) => {
                let text = value.into_string()?;
                let text = text.trim_end_matches('\0').trim();
                Some(text.parse::<f64>().map_err(|_| {
                    RasterError::invalid_data(format!("unparseable nodata value '{}'", text))
                })?)
            }
            None => None,
        };

        let metadata = match decoder.find_tag(geo_tag(GDAL_METADATA))? {
            Some(value) => GdalMetadata::from_xml(&value.into_string()?),
            None => GdalMetadata::default(),
        };

        let (sample_type, bands) = if planar && samples > 1 {
            read_separate(&mut decoder, width, height, samples)?
        } else {
            read_interleaved(&mut decoder, width, height, samples)?
        };

        Ok(Self {
            path: None,
            width,
            height,
            geotransform,
            crs,
            nodata,
            metadata,
            sample_type,
            bands,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    pub fn geotransform(&self) -> &GeoTransform {
        &self.geotransform
    }

    /// CRS as a PROJ string, if the file carries one.
    pub fn crs(&self) -> Option<&str> {
        self.crs.as_deref()
    }

    pub fn nodata(&self) -> Option<f64> {
        self.nodata
    }

    pub fn units(&self) -> Option<&str> {
        self.metadata.units.as_deref()
    }

    pub fn metadata(&self) -> &GdalMetadata {
        &self.metadata
    }

    /// Sample type as stored in the file, e.g. `uint16` or `float32`.
    /// Band data is always widened to f32 on decode.
    pub fn sample_type(&self) -> &str {
        self.sample_type
    }

    /// Extent `(min_x, min_y, max_x, max_y)` in CRS units.
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        self.geotransform.bounds(self.width, self.height)
    }

    /// Full plane of a 1-based band index.
    pub fn read_band(&self, band: usize) -> RasterResult<&[f32]> {
        if band == 0 || band > self.bands.len() {
            return Err(RasterError::BandOutOfRange {
                requested: band,
                available: self.bands.len(),
            });
        }
        Ok(&self.bands[band - 1])
    }

    /// Copy a window of a 1-based band, row-major.
    pub fn read_window(&self, band: usize, window: &Window) -> RasterResult<Vec<f32>> {
        let plane = self.read_band(band)?;
        if !window.fits_within(self.width, self.height) {
            return Err(RasterError::invalid_data(format!(
                "window {:?} exceeds raster {}x{}",
                window, self.width, self.height
            )));
        }

        let mut out = Vec::with_capacity(window.len());
        for row in window.row_off..window.row_off + window.height {
            let start = row * self.width + window.col_off;
            out.extend_from_slice(&plane[start..start + window.width]);
        }
        Ok(out)
    }
}

/// Tag for a numeric ID, resolved to the named variant when the codec knows it.
fn geo_tag(id: u16) -> Tag {
    Tag::from_u16_exhaustive(id)
}

/// Decode pixel-interleaved samples and split them into planes.
fn read_interleaved<R: Read + Seek>(
    decoder: &mut Decoder<R>,
    width: usize,
    height: usize,
    samples: usize,
) -> RasterResult<(&'static str, Vec<Vec<f32>>)> {
    let decoded = decoder.read_image()?;
    let sample_type = sample_type_name(&decoded);
    let interleaved = to_f32(decoded);
    if samples == 0 || interleaved.len() != width * height * samples {
        return Err(RasterError::invalid_data(format!(
            "decoded {} samples, expected {}x{}x{}",
            interleaved.len(),
            width,
            height,
            samples
        )));
    }

    let mut bands = vec![Vec::with_capacity(width * height); samples];
    for pixel in interleaved.chunks_exact(samples) {
        for (band, value) in bands.iter_mut().zip(pixel) {
            band.push(*value);
        }
    }
    Ok((sample_type, bands))
}

/// Decode band-separate strips, band by band.
fn read_separate<R: Read + Seek>(
    decoder: &mut Decoder<R>,
    width: usize,
    height: usize,
    samples: usize,
) -> RasterResult<(&'static str, Vec<Vec<f32>>)> {
    if decoder.get_chunk_type() != ChunkType::Strip {
        return Err(RasterError::unsupported("tiled band-separate layout"));
    }

    let rows_per_strip = decoder
        .find_tag_unsigned::<u32>(Tag::RowsPerStrip)?
        .map_or(height, |rows| rows as usize)
        .clamp(1, height);
    let strips_per_band = (height - 1) / rows_per_strip + 1;

    let mut sample_type = "";
    let mut bands = Vec::with_capacity(samples);
    for band in 0..samples {
        let mut plane = Vec::with_capacity(width * height);
        for strip in 0..strips_per_band {
            let index = u32::try_from(band * strips_per_band + strip)
                .map_err(|_| RasterError::invalid_data("strip index exceeds TIFF limits"))?;
            let decoded = decoder.read_chunk(index)?;
            sample_type = sample_type_name(&decoded);
            plane.extend(to_f32(decoded));
        }
        if plane.len() != width * height {
            return Err(RasterError::invalid_data(format!(
                "band {} decoded {} samples, expected {}x{}",
                band + 1,
                plane.len(),
                width,
                height
            )));
        }
        bands.push(plane);
    }
    Ok((sample_type, bands))
}

fn read_geotransform<R: Read + Seek>(decoder: &mut Decoder<R>) -> RasterResult<GeoTransform> {
    if let Some(value) = decoder.find_tag(geo_tag(MODEL_TRANSFORMATION))? {
        let m = value.into_f64_vec()?;
        if m.len() < 8 {
            return Err(RasterError::MissingGeoreference(format!(
                "ModelTransformation has {} values",
                m.len()
            )));
        }
        return Ok(GeoTransform::from_gdal([m[3], m[0], m[1], m[7], m[4], m[5]]));
    }

    let scale = decoder
        .find_tag(geo_tag(MODEL_PIXEL_SCALE))?
        .map(|v| v.into_f64_vec())
        .transpose()?;
    let tiepoint = decoder
        .find_tag(geo_tag(MODEL_TIEPOINT))?
        .map(|v| v.into_f64_vec())
        .transpose()?;

    match (scale, tiepoint) {
        (Some(scale), Some(tie)) if scale.len() >= 2 && tie.len() >= 6 => {
            // tiepoint ties raster (i, j) to model (x, y)
            let (sx, sy) = (scale[0], scale[1]);
            Ok(GeoTransform::north_up(
                tie[3] - tie[0] * sx,
                tie[4] + tie[1] * sy,
                sx,
                -sy,
            ))
        }
        _ => Err(RasterError::MissingGeoreference(
            "no ModelTransformation or ModelPixelScale/ModelTiepoint".to_string(),
        )),
    }
}

fn sample_type_name(result: &DecodingResult) -> &'static str {
    match result {
        DecodingResult::U8(_) => "uint8",
        DecodingResult::U16(_) => "uint16",
        DecodingResult::U32(_) => "uint32",
        DecodingResult::U64(_) => "uint64",
        DecodingResult::I8(_) => "int8",
        DecodingResult::I16(_) => "int16",
        DecodingResult::I32(_) => "int32",
        DecodingResult::I64(_) => "int64",
        DecodingResult::F16(_) => "float16",
        DecodingResult::F32(_) => "float32",
        DecodingResult::F64(_) => "float64",
    }
}

fn to_f32(result: DecodingResult) -> Vec<f32> {
    match result {
        DecodingResult::U8(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U32(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::U64(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::I8(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::I16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::I32(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::I64(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::F16(v) => v.into_iter().map(|x| x.to_f32()).collect(),
        DecodingResult::F32(v) => v,
        DecodingResult::F64(v) => v.into_iter().map(|x| x as f32).collect(),
    }
}

/// Builder for encoding a multi-band GeoTIFF.
///
/// # Example
///
/// ```rust
/// use raster_io::{DataType, GeoTiffWriter, GeoTransform};
///
/// let gt = GeoTransform::north_up(-20.0, 10.0, 0.5, -0.5);
/// let bytes = GeoTiffWriter::new(2, 2, gt)
///     .crs("+proj=longlat +datum=WGS84 +no_defs")
///     .data_type(DataType::Float32)
///     .band(vec![1.0, 2.0, 3.0, 4.0])
///     .to_bytes()
///     .unwrap();
/// assert!(!bytes.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct GeoTiffWriter {
    width: usize,
    height: usize,
    geotransform: GeoTransform,
    crs: Option<String>,
    nodata: Option<f64>,
    metadata: GdalMetadata,
    data_type: DataType,
    bands: Vec<Vec<f32>>,
}

impl GeoTiffWriter {
    pub fn new(width: usize, height: usize, geotransform: GeoTransform) -> Self {
        Self {
            width,
            height,
            geotransform,
            crs: None,
            nodata: None,
            metadata: GdalMetadata::default(),
            data_type: DataType::default(),
            bands: Vec::new(),
        }
    }

    /// Set the CRS as a PROJ string.
    #[must_use]
    pub fn crs(mut self, proj: impl Into<String>) -> Self {
        self.crs = Some(proj.into());
        self
    }

    #[must_use]
    pub fn nodata(mut self, nodata: Option<f64>) -> Self {
        self.nodata = nodata;
        self
    }

    #[must_use]
    pub fn units(mut self, units: Option<String>) -> Self {
        self.metadata.units = units;
        self
    }

    #[must_use]
    pub fn metadata_item(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.items.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn data_type(mut self, data_type: DataType) -> Self {
        self.data_type = data_type;
        self
    }

    /// Append one band plane (row-major, `width * height` values).
    #[must_use]
    pub fn band(mut self, plane: Vec<f32>) -> Self {
        self.bands.push(plane);
        self
    }

    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    /// Encode into an owned buffer.
    pub fn to_bytes(&self) -> RasterResult<Bytes> {
        let mut cursor = Cursor::new(Vec::new());
        self.write_to(&mut cursor)?;
        Ok(Bytes::from(cursor.into_inner()))
    }

    /// Encode to a file path.
    pub fn write_file(&self, path: impl AsRef<Path>) -> RasterResult<()> {
        let mut file = File::create(path)?;
        self.write_to(&mut file)?;
        file.flush()?;
        Ok(())
    }

    /// Encode to any writer that implements Write + Seek.
    pub fn write_to<W: Write + Seek>(&self, writer: W) -> RasterResult<()> {
        self.validate()?;

        let bands = self.bands.len();
        let width = u32::try_from(self.width)
            .map_err(|_| RasterError::invalid_data("width exceeds TIFF limits"))?;
        let height = u32::try_from(self.height)
            .map_err(|_| RasterError::invalid_data("height exceeds TIFF limits"))?;

        // Quantize up front so a rejected sample never leaves a partial file
        let quantized = match self.data_type {
            DataType::UInt16 => Some(self.quantize_planes()?),
            DataType::Float32 => None,
        };

        let mut encoder = TiffEncoder::new(writer)?;
        let mut dir = encoder.image_directory()?;

        dir.write_tag(Tag::ImageWidth, width)?;
        dir.write_tag(Tag::ImageLength, height)?;

        let bits_per_sample: Vec<u16> = vec![self.data_type.bits(); bands];
        dir.write_tag(Tag::BitsPerSample, bits_per_sample.as_slice())?;

        // No compression
        dir.write_tag(Tag::Compression, 1u16)?;
        // BlackIsZero; bands are not colour channels
        dir.write_tag(Tag::PhotometricInterpretation, 1u16)?;
        dir.write_tag(Tag::SamplesPerPixel, bands as u16)?;

        let sample_format: Vec<u16> = vec![self.data_type.sample_format(); bands];
        dir.write_tag(Tag::SampleFormat, sample_format.as_slice())?;

        // Band-separate, one strip per band
        dir.write_tag(Tag::PlanarConfiguration, 2u16)?;
        dir.write_tag(Tag::RowsPerStrip, height)?;

        if bands > 1 {
            let extra_samples: Vec<u16> = vec![0; bands - 1];
            dir.write_tag(Tag::ExtraSamples, extra_samples.as_slice())?;
        }

        self.write_georeference(&mut dir)?;

        if let Some(nodata) = self.nodata {
            dir.write_tag(geo_tag(GDAL_NODATA), format_nodata(nodata).as_str())?;
        }
        if !self.metadata.is_empty() {
            dir.write_tag(geo_tag(GDAL_METADATA), self.metadata.to_xml(bands).as_str())?;
        }

        let mut strip_offsets = Vec::with_capacity(bands);
        let mut strip_bytes = Vec::with_capacity(bands);
        for (index, plane) in self.bands.iter().enumerate() {
            let (offset, len) = match &quantized {
                Some(planes) => (dir.write_data(planes[index].as_slice())?, plane.len() * 2),
                None => (dir.write_data(plane.as_slice())?, plane.len() * 4),
            };
            strip_offsets.push(
                u32::try_from(offset)
                    .map_err(|_| RasterError::invalid_data("strip offset exceeds TIFF limits"))?,
            );
            strip_bytes.push(
                u32::try_from(len)
                    .map_err(|_| RasterError::invalid_data("strip size exceeds TIFF limits"))?,
            );
        }
        dir.write_tag(Tag::StripOffsets, strip_offsets.as_slice())?;
        dir.write_tag(Tag::StripByteCounts, strip_bytes.as_slice())?;

        dir.finish()?;
        Ok(())
    }

    /// Convert every plane to 16-bit samples, NaN becoming the nodata value.
    fn quantize_planes(&self) -> RasterResult<Vec<Vec<u16>>> {
        let nodata = self.nodata.map(nodata_u16).transpose()?;
        self.bands
            .iter()
            .enumerate()
            .map(|(index, plane)| {
                plane
                    .iter()
                    .map(|&value| quantize_u16(value, nodata))
                    .collect::<RasterResult<Vec<u16>>>()
                    .map_err(|e| match e {
                        RasterError::InvalidData(msg) => {
                            RasterError::invalid_data(format!("band {}: {}", index + 1, msg))
                        }
                        other => other,
                    })
            })
            .collect()
    }

    fn validate(&self) -> RasterResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(RasterError::invalid_data("raster has zero dimensions"));
        }
        if self.bands.is_empty() {
            return Err(RasterError::invalid_data("raster has no bands"));
        }
        if self.bands.len() > u16::MAX as usize {
            return Err(RasterError::invalid_data("too many bands"));
        }
        let expected = self.width * self.height;
        if let Some((index, plane)) = self
            .bands
            .iter()
            .enumerate()
            .find(|(_, plane)| plane.len() != expected)
        {
            return Err(RasterError::invalid_data(format!(
                "band {} has {} values, expected {}",
                index + 1,
                plane.len(),
                expected
            )));
        }
        Ok(())
    }

    fn write_georeference<W: Write + Seek, K: TiffKind>(
        &self,
        dir: &mut DirectoryEncoder<'_, W, K>,
    ) -> RasterResult<()> {
        let gt = &self.geotransform;

        if gt.is_rotated() {
            let matrix = [
                gt.pixel_width,
                gt.row_rotation,
                0.0,
                gt.origin_x,
                gt.col_rotation,
                gt.pixel_height,
                0.0,
                gt.origin_y,
                0.0,
                0.0,
                0.0,
                0.0,
                0.0,
                0.0,
                0.0,
                1.0,
            ];
            dir.write_tag(geo_tag(MODEL_TRANSFORMATION), matrix.as_slice())?;
        } else {
            // ModelPixelScale: [ScaleX, ScaleY, ScaleZ]; ScaleY is positive for north-up
            let pixel_scale = [gt.pixel_width, -gt.pixel_height, 0.0];
            dir.write_tag(geo_tag(MODEL_PIXEL_SCALE), pixel_scale.as_slice())?;

            // ModelTiepoint: [I, J, K, X, Y, Z] ties pixel (0, 0) to the origin
            let tiepoint = [0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
            dir.write_tag(geo_tag(MODEL_TIEPOINT), tiepoint.as_slice())?;
        }

        let mut keys: Vec<u16> = vec![
            1, // KeyDirectoryVersion
            1, // KeyRevision
            0, // MinorRevision
            2, // NumberOfKeys
            GT_MODEL_TYPE_GEO_KEY,
            0,
            1,
            MODEL_TYPE_USER_DEFINED,
            GT_RASTER_TYPE_GEO_KEY,
            0,
            1,
            RASTER_PIXEL_IS_AREA,
        ];

        if let Some(crs) = &self.crs {
            // GeoAsciiParams entries are '|' terminated
            let ascii = format!("{}|", crs);
            keys[3] = 3;
            keys.extend_from_slice(&[GT_CITATION_GEO_KEY, GEO_ASCII_PARAMS, ascii.len() as u16, 0]);
            dir.write_tag(geo_tag(GEO_KEY_DIRECTORY), keys.as_slice())?;
            dir.write_tag(geo_tag(GEO_ASCII_PARAMS), ascii.as_str())?;
        } else {
            dir.write_tag(geo_tag(GEO_KEY_DIRECTORY), keys.as_slice())?;
        }

        Ok(())
    }
}

/// A 16-bit sample for `value`; values must be whole, in range and distinct
/// from the nodata code.
fn quantize_u16(value: f32, nodata: Option<u16>) -> RasterResult<u16> {
    if value.is_nan() {
        return nodata
            .ok_or_else(|| RasterError::invalid_data("missing sample with no 16-bit nodata value"));
    }
    if value.fract() != 0.0 || !(0.0..=u16::MAX as f32).contains(&value) {
        return Err(RasterError::invalid_data(format!(
            "{} is not representable as uint16",
            value
        )));
    }
    let sample = value as u16;
    if nodata == Some(sample) {
        return Err(RasterError::invalid_data(format!(
            "valid sample {} collides with the nodata value",
            sample
        )));
    }
    Ok(sample)
}

fn nodata_u16(nodata: f64) -> RasterResult<u16> {
    if nodata.fract() == 0.0 && (0.0..=u16::MAX as f64).contains(&nodata) {
        Ok(nodata as u16)
    } else {
        Err(RasterError::invalid_data(format!(
            "nodata {} is not representable as uint16",
            nodata
        )))
    }
}

fn format_nodata(nodata: f64) -> String {
    if nodata.fract() == 0.0 && nodata.abs() < 1e15 {
        format!("{}", nodata as i64)
    } else {
        format!("{}", nodata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_writer() -> GeoTiffWriter {
        GeoTiffWriter::new(3, 2, GeoTransform::north_up(-1.5, 1.0, 1.0, -1.0))
            .crs("+proj=ob_tran +o_proj=longlat +o_lon_p=0 +o_lat_p=31.758312 +lon_0=-92.402969 +R=6371229 +no_defs")
            .nodata(Some(65535.0))
            .units(Some("mm".to_string()))
            .metadata_item("PRODUCT", "RDPA")
    }

    #[test]
    fn test_uint16_roundtrip() {
        let bytes = sample_writer()
            .band(vec![0.0, 1.0, f32::NAN, 3.0, 4.0, 65534.0])
            .to_bytes()
            .unwrap();

        let raster = RasterFile::from_bytes(&bytes).unwrap();
        assert_eq!(raster.width(), 3);
        assert_eq!(raster.height(), 2);
        assert_eq!(raster.band_count(), 1);
        assert_eq!(raster.sample_type(), "uint16");
        assert_eq!(raster.read_band(1).unwrap(), &[0.0, 1.0, 65535.0, 3.0, 4.0, 65534.0]);
        assert_eq!(raster.nodata(), Some(65535.0));
        assert_eq!(raster.units(), Some("mm"));
        assert_eq!(raster.metadata().items.get("PRODUCT").map(String::as_str), Some("RDPA"));
        assert!(raster.crs().unwrap().starts_with("+proj=ob_tran"));
    }

    #[test]
    fn test_uint16_rejects_lossy_samples() {
        for value in [0.4, 2.6, -1.0, 70000.0, 65535.0] {
            let result = sample_writer()
                .band(vec![0.0, 1.0, 2.0, 3.0, 4.0, value])
                .to_bytes();
            assert!(
                matches!(result, Err(RasterError::InvalidData(_))),
                "{} should be rejected",
                value
            );
        }

        // NaN needs a nodata code to land on
        let result = GeoTiffWriter::new(1, 1, GeoTransform::north_up(0.0, 0.0, 1.0, -1.0))
            .band(vec![f32::NAN])
            .to_bytes();
        assert!(matches!(result, Err(RasterError::InvalidData(_))));

        let result = sample_writer().nodata(Some(-9999.0)).band(vec![0.0; 6]).to_bytes();
        assert!(matches!(result, Err(RasterError::InvalidData(_))));
    }

    #[test]
    fn test_uint16_multiband_roundtrip() {
        let bytes = sample_writer()
            .band(vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0])
            .band(vec![10.0, 11.0, 12.0, 13.0, 14.0, 15.0])
            .band(vec![20.0, 21.0, 22.0, 23.0, f32::NAN, 25.0])
            .to_bytes()
            .unwrap();

        let raster = RasterFile::from_bytes(&bytes).unwrap();
        assert_eq!(raster.band_count(), 3);
        assert_eq!(raster.read_band(2).unwrap(), &[10.0, 11.0, 12.0, 13.0, 14.0, 15.0]);
        assert_eq!(raster.read_band(3).unwrap()[4], 65535.0);
    }

    #[test]
    fn test_read_interleaved_multiband() {
        // Two-sample pixel-interleaved image, as other tools write it
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut encoder = TiffEncoder::new(&mut cursor).unwrap();
            let mut dir = encoder.image_directory().unwrap();
            dir.write_tag(Tag::ImageWidth, 2u32).unwrap();
            dir.write_tag(Tag::ImageLength, 1u32).unwrap();
            dir.write_tag(Tag::BitsPerSample, [16u16, 16].as_slice()).unwrap();
            dir.write_tag(Tag::Compression, 1u16).unwrap();
            dir.write_tag(Tag::PhotometricInterpretation, 1u16).unwrap();
            dir.write_tag(Tag::SamplesPerPixel, 2u16).unwrap();
            dir.write_tag(Tag::PlanarConfiguration, 1u16).unwrap();
            dir.write_tag(Tag::RowsPerStrip, 1u32).unwrap();
            dir.write_tag(Tag::ExtraSamples, [0u16].as_slice()).unwrap();
            dir.write_tag(geo_tag(MODEL_PIXEL_SCALE), [1.0f64, 1.0, 0.0].as_slice())
                .unwrap();
            dir.write_tag(geo_tag(MODEL_TIEPOINT), [0.0f64, 0.0, 0.0, 5.0, 6.0, 0.0].as_slice())
                .unwrap();
            let samples: [u16; 4] = [1, 100, 2, 200];
            let offset = dir.write_data(samples.as_slice()).unwrap();
            dir.write_tag(Tag::StripOffsets, offset as u32).unwrap();
            dir.write_tag(Tag::StripByteCounts, 8u32).unwrap();
            dir.finish().unwrap();
        }

        let raster = RasterFile::from_bytes(cursor.get_ref()).unwrap();
        assert_eq!(raster.band_count(), 2);
        assert_eq!(raster.read_band(1).unwrap(), &[1.0, 2.0]);
        assert_eq!(raster.read_band(2).unwrap(), &[100.0, 200.0]);
        assert_eq!(raster.geotransform(), &GeoTransform::north_up(5.0, 6.0, 1.0, -1.0));
    }

    #[test]
    fn test_read_separate_multistrip() {
        // 2x3 image, two bands, two strips per band (the last one short)
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut encoder = TiffEncoder::new(&mut cursor).unwrap();
            let mut dir = encoder.image_directory().unwrap();
            dir.write_tag(Tag::ImageWidth, 2u32).unwrap();
            dir.write_tag(Tag::ImageLength, 3u32).unwrap();
            dir.write_tag(Tag::BitsPerSample, [16u16, 16].as_slice()).unwrap();
            dir.write_tag(Tag::Compression, 1u16).unwrap();
            dir.write_tag(Tag::PhotometricInterpretation, 1u16).unwrap();
            dir.write_tag(Tag::SamplesPerPixel, 2u16).unwrap();
            dir.write_tag(Tag::PlanarConfiguration, 2u16).unwrap();
            dir.write_tag(Tag::RowsPerStrip, 2u32).unwrap();
            dir.write_tag(Tag::ExtraSamples, [0u16].as_slice()).unwrap();
            dir.write_tag(geo_tag(MODEL_PIXEL_SCALE), [1.0f64, 1.0, 0.0].as_slice())
                .unwrap();
            dir.write_tag(geo_tag(MODEL_TIEPOINT), [0.0f64, 0.0, 0.0, 0.0, 0.0, 0.0].as_slice())
                .unwrap();

            let strips: [&[u16]; 4] = [&[1, 2, 3, 4], &[5, 6], &[11, 12, 13, 14], &[15, 16]];
            let mut offsets = Vec::new();
            let mut counts = Vec::new();
            for strip in strips {
                offsets.push(dir.write_data(strip).unwrap() as u32);
                counts.push((strip.len() * 2) as u32);
            }
            dir.write_tag(Tag::StripOffsets, offsets.as_slice()).unwrap();
            dir.write_tag(Tag::StripByteCounts, counts.as_slice()).unwrap();
            dir.finish().unwrap();
        }

        let raster = RasterFile::from_bytes(cursor.get_ref()).unwrap();
        assert_eq!(raster.band_count(), 2);
        assert_eq!(raster.read_band(1).unwrap(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(raster.read_band(2).unwrap(), &[11.0, 12.0, 13.0, 14.0, 15.0, 16.0]);
    }

    #[test]
    fn test_geo_tags_resolve_to_named_variants() {
        assert_eq!(geo_tag(MODEL_PIXEL_SCALE), Tag::ModelPixelScaleTag);
        assert_eq!(geo_tag(MODEL_TIEPOINT), Tag::ModelTiepointTag);
        assert_eq!(geo_tag(GEO_ASCII_PARAMS), Tag::GeoAsciiParamsTag);
        assert_eq!(geo_tag(GDAL_NODATA), Tag::GdalNodata);
    }

    #[test]
    fn test_float32_multiband_roundtrip() {
        let a = vec![0.25, -1.5, 2.0, 3.5, f32::MAX, 0.0];
        let b = vec![9.0, 8.0, 7.0, 6.0, 5.0, 4.0];
        let bytes = sample_writer()
            .data_type(DataType::Float32)
            .band(a.clone())
            .band(b.clone())
            .to_bytes()
            .unwrap();

        let raster = RasterFile::from_bytes(&bytes).unwrap();
        assert_eq!(raster.band_count(), 2);
        assert_eq!(raster.read_band(1).unwrap(), a.as_slice());
        assert_eq!(raster.read_band(2).unwrap(), b.as_slice());
        assert_eq!(
            raster.geotransform(),
            &GeoTransform::north_up(-1.5, 1.0, 1.0, -1.0)
        );
    }

    #[test]
    fn test_rotated_transform_roundtrip() {
        let gt = GeoTransform::from_gdal([10.0, 1.0, 0.25, 20.0, 0.5, -1.0]);
        let bytes = GeoTiffWriter::new(2, 2, gt)
            .data_type(DataType::Float32)
            .band(vec![1.0, 2.0, 3.0, 4.0])
            .to_bytes()
            .unwrap();

        let raster = RasterFile::from_bytes(&bytes).unwrap();
        assert_eq!(raster.geotransform(), &gt);
        assert!(raster.crs().is_none());
    }

    #[test]
    fn test_read_window() {
        let bytes = sample_writer()
            .data_type(DataType::Float32)
            .band(vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0])
            .to_bytes()
            .unwrap();
        let raster = RasterFile::from_bytes(&bytes).unwrap();

        assert_eq!(raster.read_window(1, &Window::new(1, 0, 2, 2)).unwrap(), vec![1.0, 2.0, 4.0, 5.0]);
        assert!(raster.read_window(1, &Window::new(2, 0, 2, 1)).is_err());
        assert!(matches!(
            raster.read_window(2, &Window::new(0, 0, 1, 1)),
            Err(RasterError::BandOutOfRange { requested: 2, available: 1 })
        ));
    }

    #[test]
    fn test_writer_rejects_bad_planes() {
        let result = sample_writer().band(vec![1.0, 2.0]).to_bytes();
        assert!(matches!(result, Err(RasterError::InvalidData(_))));

        let result = sample_writer().to_bytes();
        assert!(matches!(result, Err(RasterError::InvalidData(_))));
    }

    #[test]
    fn test_quantize_u16() {
        assert_eq!(quantize_u16(3.0, None).unwrap(), 3);
        assert_eq!(quantize_u16(f32::NAN, Some(65535)).unwrap(), 65535);
        assert!(quantize_u16(-3.0, None).is_err());
        assert!(quantize_u16(2.5, None).is_err());
        assert!(quantize_u16(f32::INFINITY, None).is_err());
        assert!(quantize_u16(0.0, Some(0)).is_err());
        assert!(nodata_u16(-9999.0).is_err());
        assert_eq!(nodata_u16(65535.0).unwrap(), 65535);
    }

    #[test]
    fn test_data_type_from_str() {
        assert_eq!(DataType::parse("UInt16"), Some(DataType::UInt16));
        assert_eq!(DataType::parse("float32"), Some(DataType::Float32));
        assert_eq!(DataType::parse("int8"), None);
    }
}
