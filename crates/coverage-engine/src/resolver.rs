//! Mapping from `(variable, time)` to archive files.
//!
//! The archive is a flat directory whose file names embed the valid time,
//! e.g. `20230601T00Z_MSC_RDPA_APCP-Accum24h_Sfc_RLatLon0.09_PT0H.tif`.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use coverage_common::{parse_with_format, TimeInterval};
use tracing::{debug, error, warn};
use walkdir::WalkDir;

use crate::config::ProviderConfig;
use crate::error::{QueryError, QueryResult};
use crate::request::TimeQuery;

/// One file of a time series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeSeriesEntry {
    pub valid_time: DateTime<Utc>,
    pub path: PathBuf,
}

impl TimeSeriesEntry {
    pub fn new(valid_time: DateTime<Utc>, path: impl Into<PathBuf>) -> Self {
        Self {
            valid_time,
            path: path.into(),
        }
    }
}

/// Locates the files backing a time selection.
///
/// Results are in strictly increasing valid time. An empty list means the
/// selection matched nothing, which is not an error.
pub trait FileResolver: Send + Sync {
    fn resolve(&self, variable: &str, time: &TimeQuery) -> QueryResult<Vec<TimeSeriesEntry>>;

    /// Every valid time on offer for a variable.
    fn available_times(&self, variable: &str) -> QueryResult<Vec<DateTime<Utc>>> {
        let all = TimeQuery::Range(TimeInterval::new(None, None));
        Ok(self
            .resolve(variable, &all)?
            .into_iter()
            .map(|entry| entry.valid_time)
            .collect())
    }
}

/// Resolves files by listing a single archive directory.
#[derive(Debug, Clone)]
pub struct DirectoryResolver {
    root: PathBuf,
    pattern: String,
    time_format: String,
}

impl DirectoryResolver {
    /// `pattern` holds `{time}` once and optionally `{variable}`; the
    /// `{time}` part is parsed with the strftime `time_format`.
    pub fn new(
        root: impl Into<PathBuf>,
        pattern: impl Into<String>,
        time_format: impl Into<String>,
    ) -> Self {
        Self {
            root: root.into(),
            pattern: pattern.into(),
            time_format: time_format.into(),
        }
    }

    pub fn from_config(config: &ProviderConfig) -> Self {
        Self::new(
            config.data_dir.clone(),
            config.file_pattern.clone(),
            config.time_format.clone(),
        )
    }

    /// All files for a variable, oldest first.
    fn list(&self, variable: &str) -> QueryResult<Vec<TimeSeriesEntry>> {
        let pattern = self.pattern.replace("{variable}", variable);
        let (prefix, suffix) = pattern.split_once("{time}").ok_or_else(|| {
            QueryError::resolver(format!("file pattern has no {{time}} field: {}", self.pattern))
        })?;

        let mut entries = Vec::new();
        for entry in WalkDir::new(&self.root).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| {
                error!(root = %self.root.display(), error = %e, "Failed to list archive");
                QueryError::resolver(format!("failed to list {}: {}", self.root.display(), e))
            })?;

            if !entry.file_type().is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str() else {
                continue;
            };
            let Some(stamp) = name
                .strip_prefix(prefix)
                .and_then(|rest| rest.strip_suffix(suffix))
            else {
                continue;
            };

            match parse_with_format(stamp, &self.time_format) {
                Some(valid_time) => entries.push(TimeSeriesEntry::new(valid_time, entry.path())),
                None => debug!(file = %name, "Skipping file with unparseable timestamp"),
            }
        }

        entries.sort_by(|a, b| a.valid_time.cmp(&b.valid_time).then_with(|| a.path.cmp(&b.path)));
        let before = entries.len();
        entries.dedup_by_key(|entry| entry.valid_time);
        if entries.len() != before {
            warn!(
                variable = %variable,
                duplicates = before - entries.len(),
                "Archive has several files for one valid time; keeping the first"
            );
        }

        Ok(entries)
    }
}

impl FileResolver for DirectoryResolver {
    fn resolve(&self, variable: &str, time: &TimeQuery) -> QueryResult<Vec<TimeSeriesEntry>> {
        let mut entries = self.list(variable)?;

        let selected: Vec<TimeSeriesEntry> = match time {
            TimeQuery::Latest => entries.pop().into_iter().collect(),
            TimeQuery::Instant(t) => entries.into_iter().filter(|e| e.valid_time == *t).collect(),
            TimeQuery::Range(interval) => entries
                .into_iter()
                .filter(|e| interval.contains(&e.valid_time))
                .collect(),
        };

        debug!(
            variable = %variable,
            time = ?time,
            matched = selected.len(),
            "Resolved files"
        );

        Ok(selected)
    }
}
