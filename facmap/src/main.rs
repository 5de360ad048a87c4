//! facmap - facility spreadsheet to interactive map
//!
//! Reads facility rows, geocodes their addresses through a persistent cache
//! and writes a Leaflet map page plus a report of rows that could not be
//! placed.

use anyhow::{Context, Result};
use clap::Parser;
use facmap::config::{default_toml_config, parse_regions, CliOverrides, RunSettings};
use facmap::services::load_records;
use facmap_common::config::{self as common_config, GeocodeStrategy, LoggingConfig, TomlConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "facmap")]
#[command(
    about = "Geocode a facility spreadsheet and render it as an interactive map",
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_HASH"), ", built ", env!("BUILD_TIMESTAMP"), ")")
)]
struct Args {
    /// Config file (default: ./facmap.toml, then the per-user config dir)
    #[arg(long, env = "FACMAP_CONFIG")]
    config: Option<PathBuf>,

    /// Input spreadsheet (.xlsx, .xls, .ods or .csv)
    #[arg(long, env = "FACMAP_EXCEL")]
    excel: Option<PathBuf>,

    /// Sheet name or 0-based index
    #[arg(long, env = "FACMAP_SHEET")]
    sheet: Option<String>,

    /// Geocode cache file
    #[arg(long, env = "FACMAP_CACHE")]
    cache: Option<PathBuf>,

    /// Output map page
    #[arg(long, env = "FACMAP_OUTPUT")]
    output: Option<PathBuf>,

    /// Unresolved-address report (.xlsx or .csv)
    #[arg(long, env = "FACMAP_REPORT")]
    report: Option<PathBuf>,

    /// Geocoder API key (also read from FACMAP_API_KEY)
    #[arg(long)]
    key: Option<String>,

    /// Comma-separated region names used to qualify template queries
    #[arg(long, env = "FACMAP_REGIONS")]
    regions: Option<String>,

    /// Geocoding strategy: templates or progressive
    #[arg(long, env = "FACMAP_STRATEGY")]
    strategy: Option<GeocodeStrategy>,

    /// Retry addresses remembered as not found
    #[arg(long, env = "FACMAP_FLUSH")]
    flush: bool,

    /// Log filter, e.g. "debug" or "facmap=trace" (overrides RUST_LOG)
    #[arg(long, env = "FACMAP_LOG_LEVEL")]
    log_level: Option<String>,

    /// Write a config file with every default spelled out, then exit
    #[arg(long, value_name = "PATH")]
    write_default_config: Option<PathBuf>,
}

impl Args {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            excel: self.excel.clone(),
            sheet: self.sheet.clone(),
            cache: self.cache.clone(),
            output: self.output.clone(),
            report: self.report.clone(),
            key: self.key.clone(),
            regions: self.regions.as_deref().map(parse_regions),
            strategy: self.strategy,
            flush: self.flush,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Config is read before logging is set up; its warnings go to stderr.
    let bootstrap = fmt().with_writer(std::io::stderr).finish();
    let loaded = tracing::subscriber::with_default(bootstrap, || {
        common_config::load_or_default(args.config.as_deref())
    });
    let (toml_config, config_path) = match loaded {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("facmap: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_logging(&toml_config.logging, args.log_level.as_deref()) {
        eprintln!("facmap: failed to initialize logging: {:#}", e);
        return ExitCode::FAILURE;
    }

    info!(
        "Starting facmap {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH")
    );
    match &config_path {
        Some(path) => info!("Config: {}", path.display()),
        None => info!("Config: compiled defaults"),
    }

    match run(&args, &toml_config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Filter priority: `--log-level`, then `RUST_LOG`, then `[logging].level`
fn init_logging(logging: &LoggingConfig, cli_level: Option<&str>) -> Result<()> {
    let filter = match cli_level {
        Some(level) => EnvFilter::try_new(level)
            .with_context(|| format!("Invalid log filter '{}'", level))?,
        None => match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::try_new(&logging.level)
                .with_context(|| format!("Invalid log filter '{}'", logging.level))?,
        },
    };

    let registry = tracing_subscriber::registry().with(filter);
    match &logging.log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            registry
                .with(fmt::layer().with_writer(Arc::new(file)).with_ansi(false))
                .try_init()?;
        }
        None => {
            registry
                .with(fmt::layer().with_writer(std::io::stderr))
                .try_init()?;
        }
    }
    Ok(())
}

async fn run(args: &Args, toml_config: &TomlConfig) -> Result<()> {
    if let Some(path) = &args.write_default_config {
        common_config::write_toml_config(&default_toml_config(), path)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        info!("Default config written to {}", path.display());
        return Ok(());
    }

    let settings = RunSettings::resolve(&args.overrides(), toml_config);
    info!(
        strategy = %settings.strategy,
        backends = ?settings.backends,
        cache = %settings.cache_path.display(),
        "Reading {}",
        settings.excel.display()
    );

    let records = load_records(&settings.excel, &settings.sheet)
        .with_context(|| format!("Failed to read {}", settings.excel.display()))?;
    info!("Loaded {} rows", records.len());

    let mut map_run = settings
        .build_run()
        .context("Failed to set up geocoding")?;
    let outcome = map_run.execute(&records).await?;

    info!("{}", outcome.statistics);
    info!(
        "Map with {} markers saved to {}",
        outcome.markers,
        settings.run.output.display()
    );
    match &outcome.report {
        Some(path) => info!(
            "{} unresolved addresses listed in {}",
            outcome.misses.len(),
            path.display()
        ),
        None => info!("All addresses resolved"),
    }

    Ok(())
}
