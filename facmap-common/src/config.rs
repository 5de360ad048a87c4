//! TOML configuration schema, discovery and atomic write-back
//!
//! Resolution priority for every setting is:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`FACMAP_*`, handled by the CLI parser)
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! This module owns tier 3: the file schema, where the file is looked up and
//! how it is written. Missing config files are not an error; the caller
//! falls back to compiled defaults.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, warn};

/// File name looked up in the working directory and the user config dir
pub const CONFIG_FILE_NAME: &str = "facmap.toml";

/// Geocoding strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeocodeStrategy {
    /// One backend, many template-generated query variants
    Templates,
    /// Backend chain with house → street → city fallback
    Progressive,
}

/// Geocoding backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Yandex,
    Nominatim,
    Photon,
}

/// Which precision tiers are stored as positive cache hits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheTiers {
    /// Every resolved result is cached
    All,
    /// Only house-precision results are cached; coarser ones are retried next run
    HouseOnly,
}

/// When the geocode cache is written to disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CachePersistence {
    /// Rewrite the file after every update
    WriteThrough,
    /// Write once at the end of a successful run
    Batched,
}

macro_rules! string_enum {
    ($ty:ty, $what:literal, { $($variant:path => $name:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($variant => $name),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
                match normalized.as_str() {
                    $($name => Ok($variant),)+
                    _ => Err(Error::InvalidInput(format!(
                        "unknown {} '{}' (expected one of: {})",
                        $what,
                        s,
                        [$($name),+].join(", ")
                    ))),
                }
            }
        }
    };
}

string_enum!(GeocodeStrategy, "geocoding strategy", {
    GeocodeStrategy::Templates => "templates",
    GeocodeStrategy::Progressive => "progressive",
});

string_enum!(BackendKind, "geocoding backend", {
    BackendKind::Yandex => "yandex",
    BackendKind::Nominatim => "nominatim",
    BackendKind::Photon => "photon",
});

string_enum!(CacheTiers, "cache tier policy", {
    CacheTiers::All => "all",
    CacheTiers::HouseOnly => "house_only",
});

string_enum!(CachePersistence, "cache persistence mode", {
    CachePersistence::WriteThrough => "write_through",
    CachePersistence::Batched => "batched",
});

/// `[input]` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputSection {
    /// Spreadsheet with facility records
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Sheet name or 0-based index
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheet: Option<String>,
}

/// `[cache]` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persistence: Option<CachePersistence>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tiers: Option<CacheTiers>,
}

/// `[geocoder]` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocoderSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<GeocodeStrategy>,
    /// Backends in query order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backends: Option<Vec<BackendKind>>,
    /// Yandex Geocoder API key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Region names appended by the templates strategy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regions: Option<Vec<String>>,
    /// Response language (`ru_RU` for Yandex, `ru` for Nominatim)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    /// ISO country codes passed to Nominatim (`countrycodes`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_codes: Option<String>,
    /// Per-request timeout in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Regex removing the trailing house-number token for the street tier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street_strip_pattern: Option<String>,
    /// Minimum comma segments before the city tier is attempted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city_min_segments: Option<usize>,
    /// Leading segments kept for the city tier (country + locality)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city_keep_segments: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yandex_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nominatim_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photon_url: Option<String>,
}

/// One regex substitution applied while expanding abbreviations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbbreviationRule {
    pub pattern: String,
    pub replacement: String,
}

/// `[normalizer]` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerSection {
    /// Country prefix of every canonical query
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code_pattern: Option<String>,
    /// Extra rules, applied before the built-in ones
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub abbreviations: Vec<AbbreviationRule>,
    /// Words from which the rest of the address is dropped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_words: Option<Vec<String>>,
    /// Words marking region/district segments skipped before the city
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_words: Option<Vec<String>>,
}

/// `[map]` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zoom: Option<u8>,
    /// Fixed `[lat, lon]` view center; the mean of all points when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub center: Option<[f64; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tile_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tile_attribution: Option<String>,
    /// Column whose value selects the marker color
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_column: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legend_title: Option<String>,
    /// Columns shown in the marker popup, in order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub popup_fields: Option<Vec<String>>,
}

/// `[report]` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Header of the single report column
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
}

/// `[logging]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is not set
    pub level: String,
    /// Append log output to this file instead of stderr
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_file: None,
        }
    }
}

/// Complete `facmap.toml` contents
///
/// Every section is optional; an empty file is a valid configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub input: InputSection,
    pub cache: CacheSection,
    pub geocoder: GeocoderSection,
    pub normalizer: NormalizerSection,
    pub map: MapSection,
    pub report: ReportSection,
    pub logging: LoggingConfig,
}

/// Per-user config file (`~/.config/facmap/facmap.toml` on Linux)
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("facmap").join(CONFIG_FILE_NAME))
}

/// Locate the config file to load
///
/// An explicit path is returned as-is (even if missing, so the caller can
/// report it). Otherwise `./facmap.toml` then the per-user file are tried.
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return Some(local);
    }

    user_config_path().filter(|p| p.exists())
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;

    #[cfg(unix)]
    {
        if config.geocoder.api_key.is_some() && check_toml_permissions_loose(path).unwrap_or(false) {
            warn!(
                "Config file {} contains an API key and is readable by other users (chmod 600 recommended)",
                path.display()
            );
        }
    }

    Ok(config)
}

/// Load the config file, falling back to defaults when none exists
///
/// An explicitly requested file must exist; a discovered one is optional.
pub fn load_or_default(explicit: Option<&Path>) -> Result<(TomlConfig, Option<PathBuf>)> {
    match resolve_config_path(explicit) {
        Some(path) if path.exists() => {
            debug!("Loading config from {}", path.display());
            let config = load_toml_config(&path)?;
            Ok((config, Some(path)))
        }
        Some(path) => Err(Error::Config(format!(
            "Config file not found: {}",
            path.display()
        ))),
        None => {
            warn!("No {} found, using compiled defaults", CONFIG_FILE_NAME);
            Ok((TomlConfig::default(), None))
        }
    }
}

/// Write config atomically (temp file + rename, 0600 on unix)
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;
    crate::fs::write_atomic_private(path, content.as_bytes())
}

/// True when group or other users can read the file
#[cfg(unix)]
pub fn check_toml_permissions_loose(path: &Path) -> Result<bool> {
    use std::os::unix::fs::PermissionsExt;
    let mode = std::fs::metadata(path)?.permissions().mode();
    Ok(mode & 0o077 != 0)
}
