//! The coverage provider: one collection, queried many times.
//!
//! A query runs validate → reproject → resolve → read/stack → serialize.
//! Validation and reprojection both finish before the resolver is called,
//! so a malformed request never touches the archive.

use std::sync::Arc;

use coverage_common::format_hourly;
use raster_io::RasterFile;
use tracing::{debug, info, instrument, warn};

use crate::config::ProviderConfig;
use crate::covjson::CoverageJson;
use crate::descriptor::{CoverageDescriptor, DomainSet, RangeType};
use crate::error::{ProviderError, QueryError, QueryResult};
use crate::geometry::clip_geometry;
use crate::reader::RasterReader;
use crate::request::{CoverageQuery, OutputMode, SubsetRequest, TimeQuery};
use crate::resolver::{DirectoryResolver, FileResolver};
use crate::serializer::{produced_bbox, NativeCoverage, Serializer};
use crate::stacker::TemporalStacker;

/// Result of a successful query.
#[derive(Debug, Clone, PartialEq)]
pub enum CoverageResponse {
    Structured(CoverageJson),
    Native(NativeCoverage),
    /// The time selection matched no file.
    NoData,
}

/// Serves subset queries against one archived variable.
pub struct CoverageProvider {
    config: ProviderConfig,
    resolver: Arc<dyn FileResolver>,
    descriptor: CoverageDescriptor,
}

impl std::fmt::Debug for CoverageProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoverageProvider")
            .field("config", &self.config)
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

impl CoverageProvider {
    /// Build a provider, describing the coverage from its newest file.
    pub fn new(config: ProviderConfig, resolver: Arc<dyn FileResolver>) -> Result<Self, ProviderError> {
        config.validate().map_err(ProviderError::config)?;

        let latest = resolver
            .resolve(&config.variable, &TimeQuery::Latest)
            .map_err(ProviderError::connection)?;
        let entry = latest.last().ok_or_else(|| {
            ProviderError::connection(format!("no files found for variable {}", config.variable))
        })?;

        let raster = RasterFile::open(&entry.path).map_err(ProviderError::connection)?;
        let descriptor = CoverageDescriptor::from_raster(&raster)?;

        info!(
            variable = %config.variable,
            source = %entry.path.display(),
            crs = %descriptor.crs,
            width = descriptor.width,
            height = descriptor.height,
            bands = descriptor.band_count,
            "Coverage provider ready"
        );

        Ok(Self {
            config,
            resolver,
            descriptor,
        })
    }

    /// Build a provider over the configured archive directory.
    pub fn from_config(config: ProviderConfig) -> Result<Self, ProviderError> {
        let resolver = Arc::new(DirectoryResolver::from_config(&config));
        Self::new(config, resolver)
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn descriptor(&self) -> &CoverageDescriptor {
        &self.descriptor
    }

    /// Grid and time axes, listing every valid time in the archive.
    pub fn domain_set(&self) -> QueryResult<DomainSet> {
        let times = self.resolver.available_times(&self.config.variable)?;
        Ok(self.descriptor.domain_set(&times))
    }

    pub fn range_type(&self) -> RangeType {
        self.descriptor.range_type(&self.config.variable)
    }

    /// Run one query.
    #[instrument(skip(self), fields(variable = %self.config.variable))]
    pub fn query(&self, query: &CoverageQuery) -> QueryResult<CoverageResponse> {
        let request = SubsetRequest::validate(query, &self.descriptor, &self.config.native_format)
            .map_err(|e| {
                warn!(error = %e, "Rejected coverage query");
                e
            })?;
        debug!(request = ?request, "Validated request");

        let clip = clip_geometry(&request.spatial, &self.descriptor.crs)?;

        let series = self.resolver.resolve(&self.config.variable, &request.time)?;
        if series.is_empty() {
            if let TimeQuery::Instant(_) = request.time {
                return Err(QueryError::DatetimeOutOfDomain {
                    value: query.datetime.clone().unwrap_or_default(),
                });
            }
            debug!("No files matched the time selection");
            return Ok(CoverageResponse::NoData);
        }

        let serializer = Serializer::new(&self.descriptor, &self.config);
        let bbox = produced_bbox(&request.spatial, &self.descriptor);

        if let TimeQuery::Range(_) = request.time {
            if request.output == OutputMode::Structured {
                return Err(QueryError::invalid_subset(
                    "Date range not yet supported for CovJSON output",
                ));
            }
            let block = TemporalStacker::new(request.stack_band(), clip.as_ref(), self.config.stack_policy)
                .parallel(self.config.parallel_reads)
                .stack(&series)?;
            return serializer.native(&block, bbox).map(CoverageResponse::Native);
        }

        // Latest and Instant resolve to exactly one file
        let entry = &series[0];
        let block = RasterReader::new(&request.bands, clip.as_ref())
            .read_path(&format_hourly(&entry.valid_time), &entry.path)?;

        match request.output {
            OutputMode::Structured => serializer
                .structured(&block, Some(entry.valid_time))
                .map(CoverageResponse::Structured),
            OutputMode::Native => serializer.native(&block, bbox).map(CoverageResponse::Native),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{fixtures::grid, fixtures::naming, ArchiveBuilder};

    fn config_for(dir: &std::path::Path) -> ProviderConfig {
        ProviderConfig {
            data_dir: dir.to_path_buf(),
            variable: naming::VARIABLE.to_string(),
            ..ProviderConfig::default()
        }
    }

    #[test]
    fn test_provider_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CoverageProvider>();
    }

    #[test]
    fn test_descriptor_from_newest_file() {
        let archive = ArchiveBuilder::new(grid::SMALL_8X6).timesteps(2).build().unwrap();
        let provider = CoverageProvider::from_config(config_for(archive.path())).unwrap();

        let descriptor = provider.descriptor();
        assert_eq!((descriptor.width, descriptor.height), (8, 6));
        assert_eq!(descriptor.source.as_deref(), Some(archive.entries()[1].1.as_path()));
        assert_eq!(descriptor.units.as_deref(), Some("mm"));
        assert_eq!(descriptor.data_type, "float32");
        assert_eq!(provider.range_type().field[0].definition, "float32");
    }

    #[test]
    fn test_empty_archive_is_connection_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = CoverageProvider::from_config(config_for(dir.path())).unwrap_err();
        assert!(matches!(err, ProviderError::Connection(_)));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = ProviderConfig {
            file_pattern: "no-time-field.tif".to_string(),
            ..config_for(dir.path())
        };
        assert!(matches!(
            CoverageProvider::from_config(config),
            Err(ProviderError::Config(_))
        ));
    }

    #[test]
    fn test_domain_set_lists_archive_times() {
        let archive = ArchiveBuilder::new(grid::SMALL_8X6).timesteps(3).build().unwrap();
        let provider = CoverageProvider::from_config(config_for(archive.path())).unwrap();

        let json = serde_json::to_value(provider.domain_set().unwrap()).unwrap();
        let time_axis = &json["generalGrid"]["axis"][2];
        assert_eq!(time_axis["lowerBound"], "2023-06-01T00Z");
        assert_eq!(time_axis["upperBound"], "2023-06-03T00Z");
    }
}
