//! Configuration for the coverage provider.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use raster_io::DataType;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// Configuration for one coverage collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Directory holding the archive files.
    pub data_dir: PathBuf,

    /// Variable name substituted for `{variable}` in the file pattern.
    pub variable: String,

    /// File name pattern with `{variable}` and `{time}` placeholders.
    pub file_pattern: String,

    /// strftime format of the `{time}` stamp.
    pub time_format: String,

    /// Native output driver name; requests must name it to get raster output.
    pub native_format: String,

    /// Sample type of native output.
    pub pixel_depth: DataType,

    /// What to do when a file in a time range cannot be read.
    pub stack_policy: StackPolicy,

    /// Read timesteps of a range in parallel.
    pub parallel_reads: bool,

    /// Extra metadata items written into native output.
    pub options: BTreeMap<String, String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("/data/rdpa"),
            variable: "Accum24h".to_string(),
            file_pattern: "{time}_MSC_RDPA_APCP-{variable}_Sfc_RLatLon0.09_PT0H.tif".to_string(),
            time_format: "%Y%m%dT%HZ".to_string(),
            native_format: "GTiff".to_string(),
            pixel_depth: DataType::UInt16,
            stack_policy: StackPolicy::Fail,
            parallel_reads: true,
            options: BTreeMap::new(),
        }
    }
}

impl ProviderConfig {
    /// Load configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ProviderError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ProviderError::config(format!("failed to read {}: {}", path.display(), e)))?;
        Self::from_yaml_str(&contents)
    }

    /// Parse configuration from YAML text. Missing keys keep their defaults.
    pub fn from_yaml_str(contents: &str) -> Result<Self, ProviderError> {
        serde_yaml::from_str(contents).map_err(ProviderError::config)
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply `COVERAGE_*` environment variables on top of this configuration.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from a key lookup (environment-variable names).
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(val) = lookup("COVERAGE_DATA_DIR") {
            self.data_dir = PathBuf::from(val);
        }

        if let Some(val) = lookup("COVERAGE_VARIABLE") {
            self.variable = val;
        }

        if let Some(val) = lookup("COVERAGE_FILE_PATTERN") {
            self.file_pattern = val;
        }

        if let Some(val) = lookup("COVERAGE_TIME_FORMAT") {
            self.time_format = val;
        }

        if let Some(val) = lookup("COVERAGE_NATIVE_FORMAT") {
            self.native_format = val;
        }

        if let Some(val) = lookup("COVERAGE_PIXEL_DEPTH") {
            if let Some(depth) = DataType::parse(&val) {
                self.pixel_depth = depth;
            }
        }

        if let Some(val) = lookup("COVERAGE_STACK_POLICY") {
            self.stack_policy = StackPolicy::from_str(&val);
        }

        if let Some(val) = lookup("COVERAGE_PARALLEL_READS") {
            self.parallel_reads = val.to_lowercase() == "true" || val == "1";
        }

        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.variable.is_empty() {
            return Err("variable must not be empty".to_string());
        }

        if self.file_pattern.matches("{time}").count() != 1 {
            return Err("file_pattern must contain exactly one {time} placeholder".to_string());
        }

        if self.time_format.is_empty() {
            return Err("time_format must not be empty".to_string());
        }

        if self.native_format.is_empty() {
            return Err("native_format must not be empty".to_string());
        }

        if self.native_format.eq_ignore_ascii_case("json") {
            return Err("native_format cannot be 'json'; that name selects structured output".to_string());
        }

        Ok(())
    }
}

/// Handling of unreadable files inside a time range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StackPolicy {
    /// Abort the request with a file-open error.
    #[default]
    Fail,
    /// Write the band fully masked and log a warning.
    FillNodata,
}

impl StackPolicy {
    /// Parse from string (case-insensitive). Unknown values fall back to `Fail`.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().replace('_', "-").as_str() {
            "fill-nodata" | "fill" => Self::FillNodata,
            _ => Self::Fail,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fail => "fail",
            Self::FillNodata => "fill-nodata",
        }
    }
}

impl std::fmt::Display for StackPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
