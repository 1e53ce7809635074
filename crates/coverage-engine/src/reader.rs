//! Raster reading with band selection and polygon clipping.
//!
//! Clipping crops to the smallest pixel window enclosing the polygon and
//! masks every pixel whose center falls outside it. Pixels touched by the
//! polygon edge but with an outside center are masked; a center exactly on
//! the edge is kept.

use std::path::Path;

use projection::ProjectionError;
use raster_io::{GeoTransform, RasterError, RasterFile, Window};
use tracing::{debug, error};

use crate::error::{QueryError, QueryResult};
use crate::types::{ClipGeometry, RasterBlock};

// pixel coordinates this close to an integer are treated as on the edge
const PIXEL_SNAP: f64 = 1e-9;

/// Reads a band selection from files, optionally clipped.
#[derive(Debug, Clone, Copy)]
pub struct RasterReader<'a> {
    bands: &'a [usize],
    clip: Option<&'a ClipGeometry>,
}

impl<'a> RasterReader<'a> {
    /// `bands` are 1-based indices in output order.
    pub fn new(bands: &'a [usize], clip: Option<&'a ClipGeometry>) -> Self {
        Self { bands, clip }
    }

    /// Open a file, labelling failures with the timestep it stands for.
    ///
    /// The file handle is closed before this returns.
    pub fn open(&self, timestep: &str, path: &Path) -> QueryResult<RasterFile> {
        RasterFile::open(path).map_err(|e| {
            error!(timestep = %timestep, path = %path.display(), error = %e, "Failed to open raster");
            QueryError::file_open(timestep, path, e)
        })
    }

    /// Open and read in one step.
    pub fn read_path(&self, timestep: &str, path: &Path) -> QueryResult<RasterBlock> {
        let raster = self.open(timestep, path)?;
        self.read(timestep, &raster)
    }

    /// Read the band selection from a decoded raster.
    ///
    /// `timestep` labels read failures the same way [`Self::open`] does.
    pub fn read(&self, timestep: &str, raster: &RasterFile) -> QueryResult<RasterBlock> {
        let (window, inside) = match self.clip {
            Some(clip) => {
                let window = clip_window(clip, raster.geotransform(), raster.width(), raster.height())?;
                let inside = inside_mask(clip, raster.geotransform(), &window);
                (window, Some(inside))
            }
            None => (Window::full(raster.width(), raster.height()), None),
        };

        let geotransform = raster.geotransform().for_window(&window);
        let mut block = RasterBlock::new(window.width, window.height, geotransform);
        let nodata = raster.nodata();

        for &band in self.bands {
            let values = raster
                .read_window(band, &window)
                .map_err(|e| read_error(timestep, raster, e))?;

            let valid = values
                .iter()
                .enumerate()
                .map(|(i, &v)| {
                    inside.as_ref().map_or(true, |mask| mask[i]) && !is_nodata(v, nodata)
                })
                .collect();

            block.push_plane(band.to_string(), values, valid);
        }

        debug!(
            window = ?window,
            bands = block.band_count(),
            "Read raster block"
        );

        Ok(block)
    }
}

fn read_error(timestep: &str, raster: &RasterFile, err: RasterError) -> QueryError {
    match err {
        RasterError::BandOutOfRange { requested, available } => {
            QueryError::BandOutOfRange { requested, available }
        }
        other => {
            let path = raster.path().unwrap_or_else(|| Path::new("<memory>"));
            error!(timestep = %timestep, path = %path.display(), error = %other, "Failed to read raster window");
            QueryError::file_open(timestep, path, other)
        }
    }
}

/// Smallest pixel window enclosing a polygon, limited to the raster.
pub fn clip_window(
    clip: &ClipGeometry,
    geotransform: &GeoTransform,
    width: usize,
    height: usize,
) -> QueryResult<Window> {
    let mut min_col = f64::INFINITY;
    let mut min_row = f64::INFINITY;
    let mut max_col = f64::NEG_INFINITY;
    let mut max_row = f64::NEG_INFINITY;

    for (x, y) in clip.vertices() {
        let (col, row) = geotransform.to_pixel(x, y).ok_or_else(|| {
            ProjectionError::invalid_parameter("geotransform", "not invertible")
        })?;
        min_col = min_col.min(col);
        min_row = min_row.min(row);
        max_col = max_col.max(col);
        max_row = max_row.max(row);
    }

    let col_start = snap(min_col).floor().max(0.0);
    let row_start = snap(min_row).floor().max(0.0);
    let col_end = snap(max_col).ceil().min(width as f64);
    let row_end = snap(max_row).ceil().min(height as f64);

    if !(col_start < col_end && row_start < row_end) {
        return Err(QueryError::ClipOutsideRaster);
    }

    Ok(Window::new(
        col_start as usize,
        row_start as usize,
        (col_end - col_start) as usize,
        (row_end - row_start) as usize,
    ))
}

/// Row-major flags: pixel center inside the polygon.
fn inside_mask(clip: &ClipGeometry, geotransform: &GeoTransform, window: &Window) -> Vec<bool> {
    let mut mask = Vec::with_capacity(window.len());
    for row in window.row_off..window.row_off + window.height {
        for col in window.col_off..window.col_off + window.width {
            let (x, y) = geotransform.pixel_center(col, row);
            mask.push(clip.contains(x, y));
        }
    }
    mask
}

fn snap(v: f64) -> f64 {
    if (v - v.round()).abs() < PIXEL_SNAP {
        v.round()
    } else {
        v
    }
}

fn is_nodata(value: f32, nodata: Option<f64>) -> bool {
    if value.is_nan() {
        return true;
    }
    nodata.is_some_and(|n| value == n as f32)
}
