//! Temporal stacking of a time series into one multi-band block.
//!
//! Timestep `i` of the series always lands in output band `i + 1`. Reads may
//! run on the rayon pool; the indexed collect keeps every result in its
//! slot, so parallel and sequential stacking produce identical blocks.

use coverage_common::format_hourly;
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::config::StackPolicy;
use crate::error::{QueryError, QueryResult};
use crate::reader::RasterReader;
use crate::resolver::TimeSeriesEntry;
use crate::types::{ClipGeometry, RasterBlock};

/// Stacks one band of each file in a series.
#[derive(Debug, Clone, Copy)]
pub struct TemporalStacker<'a> {
    band: usize,
    clip: Option<&'a ClipGeometry>,
    policy: StackPolicy,
    parallel: bool,
}

impl<'a> TemporalStacker<'a> {
    pub fn new(band: usize, clip: Option<&'a ClipGeometry>, policy: StackPolicy) -> Self {
        Self {
            band,
            clip,
            policy,
            parallel: true,
        }
    }

    #[must_use]
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Read and stack the series in chronological order.
    pub fn stack(&self, series: &[TimeSeriesEntry]) -> QueryResult<RasterBlock> {
        let bands = [self.band];
        let reader = RasterReader::new(&bands, self.clip);

        let read = |entry: &TimeSeriesEntry| {
            reader.read_path(&format_hourly(&entry.valid_time), &entry.path)
        };

        let slots: Vec<QueryResult<RasterBlock>> = if self.parallel {
            series.par_iter().map(read).collect()
        } else {
            series.iter().map(read).collect()
        };

        self.assemble(series, slots)
    }

    fn assemble(
        &self,
        series: &[TimeSeriesEntry],
        slots: Vec<QueryResult<RasterBlock>>,
    ) -> QueryResult<RasterBlock> {
        // Shape and georeferencing come from the first readable timestep
        let reference = slots
            .iter()
            .find_map(|slot| slot.as_ref().ok().map(|b| (b.width, b.height, b.geotransform)));
        let Some((width, height, geotransform)) = reference else {
            return match slots.into_iter().next() {
                Some(Err(e)) => Err(e),
                _ => Err(QueryError::resolver("empty time series")),
            };
        };
        let mut stacked = RasterBlock::new(width, height, geotransform);

        for (entry, slot) in series.iter().zip(slots) {
            let timestep = format_hourly(&entry.valid_time);
            match slot {
                Ok(mut block) => {
                    if (block.height, block.width) != (height, width) {
                        return Err(QueryError::ShapeMismatch {
                            timestep,
                            expected: (height, width),
                            actual: (block.height, block.width),
                        });
                    }
                    let plane = block.planes.swap_remove(0);
                    let valid = block.valid.swap_remove(0);
                    stacked.push_plane(timestep, plane, valid);
                }
                Err(QueryError::FileOpen { path, message, .. })
                    if self.policy == StackPolicy::FillNodata =>
                {
                    warn!(
                        timestep = %timestep,
                        path = %path.display(),
                        error = %message,
                        "Filling unreadable timestep with nodata"
                    );
                    let len = width * height;
                    stacked.push_plane(timestep, vec![f32::NAN; len], vec![false; len]);
                }
                Err(e) => return Err(e),
            }
        }

        debug!(
            timesteps = stacked.band_count(),
            width,
            height,
            "Stacked time series"
        );

        Ok(stacked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coverage_common::BoundingBox;
    use test_utils::{fixture_value, fixtures::grid, ArchiveBuilder, SyntheticArchive};

    use crate::error::QueryErrorKind;

    fn series(archive: &SyntheticArchive) -> Vec<TimeSeriesEntry> {
        archive
            .entries()
            .iter()
            .map(|(t, p)| TimeSeriesEntry::new(*t, p.clone()))
            .collect()
    }

    #[test]
    fn test_stack_band_per_timestep() {
        let archive = ArchiveBuilder::new(grid::SMALL_8X6).timesteps(3).build().unwrap();
        let block = TemporalStacker::new(1, None, StackPolicy::Fail)
            .stack(&series(&archive))
            .unwrap();

        assert_eq!(block.shape(), (3, 6, 8));
        assert_eq!(block.band_ids, vec!["2023-06-01T00Z", "2023-06-02T00Z", "2023-06-03T00Z"]);
        for t in 0..3 {
            assert_eq!(block.planes[t][2 * 8 + 5], fixture_value(t, 1, 5, 2));
        }
    }

    #[test]
    fn test_stack_matches_single_file_crops() {
        let archive = ArchiveBuilder::new(grid::SMALL_8X6).timesteps(3).bands(2).build().unwrap();
        let clip = ClipGeometry::rectangle(&BoundingBox::new(1.2, -4.5, 6.0, -1.0));
        let entries = series(&archive);

        let stacked = TemporalStacker::new(2, Some(&clip), StackPolicy::Fail)
            .stack(&entries)
            .unwrap();

        for (i, entry) in entries.iter().enumerate() {
            let single = RasterReader::new(&[2], Some(&clip))
                .read_path("single", &entry.path)
                .unwrap();
            assert_eq!(stacked.planes[i], single.planes[0]);
            assert_eq!(stacked.valid[i], single.valid[0]);
            assert_eq!(stacked.geotransform, single.geotransform);
        }
    }

    #[test]
    fn test_parallel_equals_sequential() {
        let archive = ArchiveBuilder::new(grid::SMALL_8X6).timesteps(5).build().unwrap();
        let entries = series(&archive);
        let stacker = TemporalStacker::new(1, None, StackPolicy::Fail);

        let parallel = stacker.parallel(true).stack(&entries).unwrap();
        let sequential = stacker.parallel(false).stack(&entries).unwrap();
        assert_eq!(parallel, sequential);
    }

    #[test]
    fn test_missing_file_fails_by_default() {
        let archive = ArchiveBuilder::new(grid::SMALL_8X6).timesteps(3).build().unwrap();
        archive.remove_timestep(1).unwrap();

        let err = TemporalStacker::new(1, None, StackPolicy::Fail)
            .stack(&series(&archive))
            .unwrap_err();
        assert_eq!(err.kind(), QueryErrorKind::FileOpenFailure);
        assert!(err.to_string().contains("2023-06-02T00Z"));
    }

    #[test]
    fn test_missing_file_filled_with_nodata() {
        let archive = ArchiveBuilder::new(grid::SMALL_8X6).timesteps(3).build().unwrap();
        archive.remove_timestep(0).unwrap();

        let block = TemporalStacker::new(1, None, StackPolicy::FillNodata)
            .stack(&series(&archive))
            .unwrap();
        assert_eq!(block.band_count(), 3);
        assert!(block.valid[0].iter().all(|&v| !v));
        assert!(block.valid[1].iter().all(|&v| v));
        assert_eq!(block.planes[2][0], fixture_value(2, 1, 0, 0));
    }

    #[test]
    fn test_shape_mismatch_is_fatal() {
        let archive = ArchiveBuilder::new(grid::SMALL_8X6)
            .timesteps(3)
            .mismatched_grid_at(2, grid::RotatedGridSpec { width: 4, ..grid::SMALL_8X6 })
            .build()
            .unwrap();

        let err = TemporalStacker::new(1, None, StackPolicy::FillNodata)
            .stack(&series(&archive))
            .unwrap_err();
        match err {
            QueryError::ShapeMismatch { expected, actual, .. } => {
                assert_eq!(expected, (6, 8));
                assert_eq!(actual, (6, 4));
            }
            other => panic!("Expected ShapeMismatch, got {:?}", other),
        }
    }
}
