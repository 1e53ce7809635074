//! Synthetic on-disk analysis archives.
//!
//! Writes a daily series of rotated-pole GeoTIFF files into a temporary
//! directory, named the way the operational archive names them, so resolver
//! and provider tests run against real files.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, TimeZone, Utc};
use raster_io::{DataType, GeoTiffWriter, RasterResult};
use tempfile::TempDir;

use crate::fixtures::{crs, grid::RotatedGridSpec, naming};
use crate::generators::create_fixture_band;

/// Nodata value written into fixture files.
pub const FIXTURE_NODATA: f64 = -9999.0;

/// A written archive; the directory is removed on drop.
pub struct SyntheticArchive {
    dir: TempDir,
    spec: RotatedGridSpec,
    entries: Vec<(DateTime<Utc>, PathBuf)>,
}

impl SyntheticArchive {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn spec(&self) -> RotatedGridSpec {
        self.spec
    }

    /// Valid times and paths, oldest first.
    pub fn entries(&self) -> &[(DateTime<Utc>, PathBuf)] {
        &self.entries
    }

    pub fn times(&self) -> Vec<DateTime<Utc>> {
        self.entries.iter().map(|(t, _)| *t).collect()
    }

    /// Delete the file for one timestep, leaving a gap in the series.
    pub fn remove_timestep(&self, index: usize) -> std::io::Result<()> {
        std::fs::remove_file(&self.entries[index].1)
    }
}

/// Builder for [`SyntheticArchive`].
///
/// # Example
///
/// ```
/// use test_utils::{fixtures::grid, ArchiveBuilder};
///
/// let archive = ArchiveBuilder::new(grid::SMALL_8X6).timesteps(2).build().unwrap();
/// assert_eq!(archive.entries().len(), 2);
/// ```
pub struct ArchiveBuilder {
    spec: RotatedGridSpec,
    variable: String,
    start: DateTime<Utc>,
    step_hours: i64,
    timesteps: usize,
    bands: usize,
    nodata_at: Vec<(usize, usize)>,
    units: Option<String>,
    decoys: bool,
    odd_one_out: Option<(usize, RotatedGridSpec)>,
}

impl ArchiveBuilder {
    pub fn new(spec: RotatedGridSpec) -> Self {
        let start = Utc
            .with_ymd_and_hms(2023, 6, 1, 0, 0, 0)
            .single()
            .expect("fixed archive start is a valid time");
        Self {
            spec,
            variable: naming::VARIABLE.to_string(),
            start,
            step_hours: crate::fixtures::time::STEP_HOURS,
            timesteps: 3,
            bands: 1,
            nodata_at: Vec::new(),
            units: Some("mm".to_string()),
            decoys: false,
            odd_one_out: None,
        }
    }

    pub fn variable(mut self, variable: &str) -> Self {
        self.variable = variable.to_string();
        self
    }

    pub fn start(mut self, start: DateTime<Utc>) -> Self {
        self.start = start;
        self
    }

    pub fn step_hours(mut self, hours: i64) -> Self {
        self.step_hours = hours;
        self
    }

    pub fn timesteps(mut self, count: usize) -> Self {
        self.timesteps = count;
        self
    }

    pub fn bands(mut self, count: usize) -> Self {
        self.bands = count;
        self
    }

    /// Write the nodata value at these `(col, row)` positions in every band.
    pub fn nodata_at(mut self, positions: &[(usize, usize)]) -> Self {
        self.nodata_at = positions.to_vec();
        self
    }

    pub fn units(mut self, units: Option<&str>) -> Self {
        self.units = units.map(str::to_string);
        self
    }

    /// Also write files that must not be picked up: another variable, a
    /// name with an unparseable stamp and a sidecar text file.
    pub fn with_decoys(mut self) -> Self {
        self.decoys = true;
        self
    }

    /// Write timestep `index` on a different grid.
    pub fn mismatched_grid_at(mut self, index: usize, spec: RotatedGridSpec) -> Self {
        self.odd_one_out = Some((index, spec));
        self
    }

    pub fn build(self) -> RasterResult<SyntheticArchive> {
        let dir = tempfile::Builder::new().prefix("rdpa_archive").tempdir()?;
        let mut entries = Vec::with_capacity(self.timesteps);

        for timestep in 0..self.timesteps {
            let valid_time = self.start + Duration::hours(self.step_hours * timestep as i64);
            let path = dir.path().join(file_name(&self.variable, &valid_time));

            let spec = match self.odd_one_out {
                Some((index, spec)) if index == timestep => spec,
                _ => self.spec,
            };
            self.write_file(&path, spec, timestep)?;
            entries.push((valid_time, path));
        }

        if self.decoys {
            if let Some((valid_time, _)) = entries.first() {
                let other = dir.path().join(file_name("Accum6h", valid_time));
                self.write_file(&other, self.spec, 0)?;
            }
            let garbled = naming::FILE_PATTERN
                .replace("{variable}", &self.variable)
                .replace("{time}", "latest");
            std::fs::write(dir.path().join(garbled), b"not a raster")?;
            std::fs::write(dir.path().join("README.txt"), b"synthetic archive")?;
        }

        Ok(SyntheticArchive {
            dir,
            spec: self.spec,
            entries,
        })
    }

    fn write_file(&self, path: &Path, spec: RotatedGridSpec, timestep: usize) -> RasterResult<()> {
        let mut writer = GeoTiffWriter::new(spec.width, spec.height, spec.geotransform())
            .crs(crs::RDPA_PROJ)
            .nodata(Some(FIXTURE_NODATA))
            .units(self.units.clone())
            .data_type(DataType::Float32);

        for band in 1..=self.bands {
            let mut plane = create_fixture_band(spec.width, spec.height, timestep, band);
            for &(col, row) in &self.nodata_at {
                if col < spec.width && row < spec.height {
                    plane[row * spec.width + col] = FIXTURE_NODATA as f32;
                }
            }
            writer = writer.band(plane);
        }

        writer.write_file(path)
    }
}

/// Archive file name for a variable and valid time.
pub fn file_name(variable: &str, valid_time: &DateTime<Utc>) -> String {
    naming::FILE_PATTERN
        .replace("{variable}", variable)
        .replace("{time}", &valid_time.format(naming::TIME_FORMAT).to_string())
}
