//! Coverage query command-line harness.
//!
//! Loads a provider configuration, builds the provider against the archive
//! and runs a single query, writing the response to a file or stdout.
//! Logs go to stderr so raster output can be piped.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use coverage_engine::{CoverageProvider, CoverageQuery, CoverageResponse, ProviderConfig};

#[derive(Parser, Debug)]
#[command(name = "coverage-cli")]
#[command(about = "Query spatial and temporal subsets of a rotated-pole analysis archive")]
struct Args {
    /// Provider configuration file (YAML); COVERAGE_* variables override it
    #[arg(short, long, env = "COVERAGE_CONFIG")]
    config: Option<PathBuf>,

    /// Archive directory, overriding the configuration
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Geographic bbox: minx,miny,maxx,maxy
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    bbox: Vec<f64>,

    /// Native-axis subset, e.g. `x=-5:0` (repeatable)
    #[arg(long = "subset", allow_hyphen_values = true)]
    subsets: Vec<String>,

    /// Instant or start/end interval, e.g. 2023-06-01T00Z/2023-06-03T00Z
    #[arg(long)]
    datetime: Option<String>,

    /// Band identifiers, comma separated
    #[arg(long, value_delimiter = ',')]
    properties: Vec<String>,

    /// `json` or the native format name (default json)
    #[arg(short, long)]
    format: Option<String>,

    /// Output file (default stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the domain set and range type instead of querying
    #[arg(long)]
    describe: bool,

    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,
}

fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .json()
        .init();

    let mut config = match &args.config {
        Some(path) => ProviderConfig::from_yaml_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?
            .with_env_overrides(),
        None => ProviderConfig::from_env(),
    };
    if let Some(dir) = &args.data_dir {
        config.data_dir = dir.clone();
    }

    info!(
        data_dir = %config.data_dir.display(),
        variable = %config.variable,
        native_format = %config.native_format,
        "Loaded configuration"
    );

    let provider = CoverageProvider::from_config(config).context("Failed to initialize coverage provider")?;

    if args.describe {
        let mut description = serde_json::Map::new();
        description.insert("domainset".to_string(), serde_json::to_value(provider.domain_set()?)?);
        description.insert("rangetype".to_string(), serde_json::to_value(provider.range_type())?);
        return write_output(args.output.as_ref(), &serde_json::to_vec_pretty(&description)?);
    }

    let query = build_query(&args)?;
    let response = match provider.query(&query) {
        Ok(response) => response,
        Err(e) => {
            let exception = e.to_exception();
            bail!("{}", serde_json::to_string(&exception)?);
        }
    };

    match response {
        CoverageResponse::Structured(coverage) => {
            write_output(args.output.as_ref(), &serde_json::to_vec_pretty(&coverage)?)
        }
        CoverageResponse::Native(native) => {
            info!(
                bands = native.band_count,
                width = native.width,
                height = native.height,
                bbox = ?native.bbox.to_array(),
                "Query produced raster"
            );
            write_output(args.output.as_ref(), &native.bytes)
        }
        CoverageResponse::NoData => {
            warn!("No data matched the query");
            Ok(())
        }
    }
}

/// Turn command-line arguments into a query; the provider validates it.
fn build_query(args: &Args) -> Result<CoverageQuery> {
    let mut query = CoverageQuery::new().properties(args.properties.iter().cloned());
    query.bbox = args.bbox.clone();
    query.datetime = args.datetime.clone();
    query.format = args.format.clone();

    for subset in &args.subsets {
        let (axis, range) = subset
            .split_once('=')
            .with_context(|| format!("Subset '{}' is not of the form axis=min:max", subset))?;
        let (min, max) = range
            .split_once(':')
            .with_context(|| format!("Subset '{}' is not of the form axis=min:max", subset))?;
        let min: f64 = min.trim().parse().with_context(|| format!("Invalid subset minimum in '{}'", subset))?;
        let max: f64 = max.trim().parse().with_context(|| format!("Invalid subset maximum in '{}'", subset))?;
        query = query.subset(axis.trim(), min, max);
    }

    Ok(query)
}

fn write_output(path: Option<&PathBuf>, data: &[u8]) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, data).with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), size = data.len(), "Wrote response");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(data)?;
            stdout.flush()?;
        }
    }
    Ok(())
}
