//! Configuration resolution for facmap
//!
//! Every setting resolves as CLI → environment → TOML → compiled default.
//! clap folds the CLI and `FACMAP_*` environment tiers into `CliOverrides`;
//! the API key is the exception and is resolved here tier by tier, so a key
//! present in several places can be reported.

use crate::error::{FacmapError, FacmapResult};
use crate::services::address_normalizer::{AddressNormalizer, DEFAULT_COUNTRY};
use crate::services::geocode_cache::GeocodeCache;
use crate::services::geocoder::{
    FallbackStrategy, Geocoder, DEFAULT_CITY_KEEP_SEGMENTS, DEFAULT_CITY_MIN_SEGMENTS,
    DEFAULT_STREET_STRIP_PATTERN,
};
use crate::services::http::{ClientOptions, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT};
use crate::services::map_builder::MapSettings;
use crate::services::nominatim_client::NominatimClient;
use crate::services::photon_client::PhotonClient;
use crate::services::report_emitter::DEFAULT_REPORT_COLUMN;
use crate::services::workbook_loader::SheetSelector;
use crate::services::yandex_client::YandexClient;
use crate::types::GeocodingBackend;
use crate::workflow::{MapRun, RunOptions};
use facmap_common::config::{
    BackendKind, CachePersistence, CacheSection, CacheTiers, GeocodeStrategy, GeocoderSection,
    InputSection, LoggingConfig, MapSection, NormalizerSection, ReportSection, TomlConfig,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

pub const DEFAULT_EXCEL: &str = "data/map.xlsx";
pub const DEFAULT_SHEET: &str = "0";
pub const DEFAULT_CACHE: &str = "cache_geocode.json";
pub const DEFAULT_OUTPUT: &str = "index.html";
pub const DEFAULT_REPORT: &str = "missed_addresses.xlsx";
pub const DEFAULT_REGIONS: [&str; 2] = ["Саратовская", "Пензенская"];
pub const DEFAULT_LANG: &str = "ru_RU";
pub const DEFAULT_COUNTRY_CODES: &str = "ru";

/// Environment variable holding the Yandex Geocoder key
pub const API_KEY_ENV: &str = "FACMAP_API_KEY";

/// Values given on the command line or through `FACMAP_*` variables
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliOverrides {
    pub excel: Option<PathBuf>,
    pub sheet: Option<String>,
    pub cache: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub report: Option<PathBuf>,
    /// `--key` only; `FACMAP_API_KEY` is read by `resolve_api_key`
    pub key: Option<String>,
    pub regions: Option<Vec<String>>,
    pub strategy: Option<GeocodeStrategy>,
    pub flush: bool,
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Split a comma separated region list, dropping blanks
pub fn parse_regions(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .collect()
}

/// Resolve the Yandex API key
///
/// **Priority:** CLI → ENV → TOML
pub fn resolve_api_key(cli_key: Option<&str>, toml_config: &TomlConfig) -> Option<String> {
    let env_key = std::env::var(API_KEY_ENV).ok();
    let toml_key = toml_config.geocoder.api_key.as_deref();

    let candidates = [
        ("command line", cli_key),
        ("environment", env_key.as_deref()),
        ("TOML", toml_key),
    ];
    let sources: Vec<&str> = candidates
        .iter()
        .filter(|(_, key)| key.is_some_and(is_valid_key))
        .map(|(source, _)| *source)
        .collect();

    if sources.len() > 1 {
        warn!(
            "API key found in multiple sources: {}. Using {} (highest priority).",
            sources.join(", "),
            sources[0]
        );
    }

    let (source, key) = candidates
        .into_iter()
        .find(|(_, key)| key.is_some_and(is_valid_key))?;
    info!("API key loaded from {}", source);
    key.map(|k| k.trim().to_string())
}

/// Service endpoint overrides
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Endpoints {
    pub yandex: Option<String>,
    pub nominatim: Option<String>,
    pub photon: Option<String>,
}

/// Fully resolved settings for one run
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub excel: PathBuf,
    pub sheet: SheetSelector,
    pub cache_path: PathBuf,
    pub cache_persistence: CachePersistence,
    pub cache_tiers: CacheTiers,
    pub strategy: GeocodeStrategy,
    pub backends: Vec<BackendKind>,
    pub api_key: Option<String>,
    pub regions: Vec<String>,
    pub country: String,
    pub lang: String,
    pub country_codes: Option<String>,
    pub timeout: Duration,
    pub user_agent: String,
    pub street_strip_pattern: String,
    pub city_min_segments: usize,
    pub city_keep_segments: usize,
    pub endpoints: Endpoints,
    pub normalizer: NormalizerSection,
    pub map: MapSettings,
    pub run: RunOptions,
}

impl RunSettings {
    /// Merge CLI overrides, the TOML file and compiled defaults
    pub fn resolve(cli: &CliOverrides, toml_config: &TomlConfig) -> Self {
        let geocoder = &toml_config.geocoder;

        let strategy = cli
            .strategy
            .or(geocoder.strategy)
            .unwrap_or(GeocodeStrategy::Templates);

        let backends = match &geocoder.backends {
            Some(backends) if !backends.is_empty() => backends.clone(),
            _ => default_backends(strategy),
        };

        let cache_tiers = toml_config.cache.tiers.unwrap_or(match strategy {
            GeocodeStrategy::Templates => CacheTiers::All,
            GeocodeStrategy::Progressive => CacheTiers::HouseOnly,
        });

        let regions = cli
            .regions
            .clone()
            .or_else(|| geocoder.regions.clone())
            .unwrap_or_else(|| DEFAULT_REGIONS.iter().map(|r| r.to_string()).collect());

        let mut normalizer = toml_config.normalizer.clone();
        let country = normalizer
            .country
            .get_or_insert_with(|| DEFAULT_COUNTRY.to_string())
            .clone();

        let map = MapSettings::from_section(&toml_config.map);

        let run = RunOptions {
            output: cli
                .output
                .clone()
                .or_else(|| toml_config.map.output.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT)),
            report: cli
                .report
                .clone()
                .or_else(|| toml_config.report.path.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_REPORT)),
            report_column: toml_config
                .report
                .column
                .clone()
                .unwrap_or_else(|| DEFAULT_REPORT_COLUMN.to_string()),
            flush: cli.flush,
        };

        Self {
            excel: cli
                .excel
                .clone()
                .or_else(|| toml_config.input.path.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_EXCEL)),
            sheet: SheetSelector::parse(
                cli.sheet
                    .as_deref()
                    .or(toml_config.input.sheet.as_deref())
                    .unwrap_or(DEFAULT_SHEET),
            ),
            cache_path: cli
                .cache
                .clone()
                .or_else(|| toml_config.cache.path.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE)),
            cache_persistence: toml_config
                .cache
                .persistence
                .unwrap_or(CachePersistence::WriteThrough),
            cache_tiers,
            strategy,
            backends,
            api_key: resolve_api_key(cli.key.as_deref(), toml_config),
            regions,
            country,
            lang: geocoder.lang.clone().unwrap_or_else(|| DEFAULT_LANG.to_string()),
            country_codes: Some(
                geocoder
                    .country_codes
                    .clone()
                    .unwrap_or_else(|| DEFAULT_COUNTRY_CODES.to_string()),
            ),
            timeout: geocoder
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_TIMEOUT),
            user_agent: geocoder
                .user_agent
                .clone()
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            street_strip_pattern: geocoder
                .street_strip_pattern
                .clone()
                .unwrap_or_else(|| DEFAULT_STREET_STRIP_PATTERN.to_string()),
            city_min_segments: geocoder.city_min_segments.unwrap_or(DEFAULT_CITY_MIN_SEGMENTS),
            city_keep_segments: geocoder
                .city_keep_segments
                .unwrap_or(DEFAULT_CITY_KEEP_SEGMENTS),
            endpoints: Endpoints {
                yandex: geocoder.yandex_url.clone(),
                nominatim: geocoder.nominatim_url.clone(),
                photon: geocoder.photon_url.clone(),
            },
            normalizer,
            map,
            run,
        }
    }

    fn client_options(&self, base_url: Option<String>) -> ClientOptions {
        ClientOptions {
            user_agent: self.user_agent.clone(),
            timeout: self.timeout,
            lang: self.lang.clone(),
            base_url,
        }
    }

    /// Construct the configured backends in query order
    pub fn build_backends(&self) -> FacmapResult<Vec<Box<dyn GeocodingBackend>>> {
        let mut backends: Vec<Box<dyn GeocodingBackend>> = Vec::with_capacity(self.backends.len());
        for kind in &self.backends {
            let backend: Box<dyn GeocodingBackend> = match kind {
                BackendKind::Yandex => {
                    let key = self.api_key.clone().ok_or_else(|| {
                        FacmapError::Geocoder(format!(
                            "Yandex Geocoder API key not configured. Please configure using one of:\n\
                             1. Command line: --key your-key\n\
                             2. Environment: {}=your-key\n\
                             3. TOML config: [geocoder] api_key = \"your-key\"",
                            API_KEY_ENV
                        ))
                    })?;
                    let options = self.client_options(self.endpoints.yandex.clone());
                    Box::new(
                        YandexClient::new(key, &options)
                            .map_err(|e| FacmapError::Geocoder(format!("yandex: {}", e)))?,
                    )
                }
                BackendKind::Nominatim => {
                    let options = self.client_options(self.endpoints.nominatim.clone());
                    Box::new(
                        NominatimClient::new(&options, self.country_codes.clone())
                            .map_err(|e| FacmapError::Geocoder(format!("nominatim: {}", e)))?,
                    )
                }
                BackendKind::Photon => {
                    let options = self.client_options(self.endpoints.photon.clone());
                    Box::new(
                        PhotonClient::new(&options)
                            .map_err(|e| FacmapError::Geocoder(format!("photon: {}", e)))?,
                    )
                }
            };
            backends.push(backend);
        }
        Ok(backends)
    }

    pub fn fallback_strategy(&self) -> FacmapResult<FallbackStrategy> {
        match self.strategy {
            GeocodeStrategy::Templates => Ok(FallbackStrategy::templates(
                self.regions.clone(),
                self.country.clone(),
            )),
            GeocodeStrategy::Progressive => FallbackStrategy::progressive(
                &self.street_strip_pattern,
                self.city_min_segments,
                self.city_keep_segments,
            ),
        }
    }

    /// Wire normalizer, geocoder and cache into a run
    pub fn build_run(&self) -> FacmapResult<MapRun> {
        let normalizer = AddressNormalizer::from_config(&self.normalizer)?;
        let geocoder = Geocoder::new(self.build_backends()?, self.fallback_strategy()?);
        let cache = GeocodeCache::load(&self.cache_path, self.cache_persistence, self.cache_tiers);

        info!(
            strategy = %self.strategy,
            tiers = %self.cache_tiers,
            persistence = %self.cache_persistence,
            "Geocoder configured"
        );

        Ok(MapRun::new(
            normalizer,
            geocoder,
            cache,
            self.map.clone(),
            self.run.clone(),
        ))
    }
}

/// Compiled defaults spelled out, for `--write-default-config`
///
/// Strategy-dependent values (backends, cache tiers) stay unset so that
/// switching `strategy` keeps its own defaults.
pub fn default_toml_config() -> TomlConfig {
    let map = MapSettings::default();
    TomlConfig {
        input: InputSection {
            path: Some(PathBuf::from(DEFAULT_EXCEL)),
            sheet: Some(DEFAULT_SHEET.to_string()),
        },
        cache: CacheSection {
            path: Some(PathBuf::from(DEFAULT_CACHE)),
            persistence: Some(CachePersistence::WriteThrough),
            tiers: None,
        },
        geocoder: GeocoderSection {
            strategy: Some(GeocodeStrategy::Templates),
            regions: Some(DEFAULT_REGIONS.iter().map(|r| r.to_string()).collect()),
            lang: Some(DEFAULT_LANG.to_string()),
            country_codes: Some(DEFAULT_COUNTRY_CODES.to_string()),
            timeout_secs: Some(DEFAULT_TIMEOUT.as_secs()),
            user_agent: Some(DEFAULT_USER_AGENT.to_string()),
            street_strip_pattern: Some(DEFAULT_STREET_STRIP_PATTERN.to_string()),
            city_min_segments: Some(DEFAULT_CITY_MIN_SEGMENTS),
            city_keep_segments: Some(DEFAULT_CITY_KEEP_SEGMENTS),
            ..Default::default()
        },
        normalizer: NormalizerSection {
            country: Some(DEFAULT_COUNTRY.to_string()),
            ..Default::default()
        },
        map: MapSection {
            output: Some(PathBuf::from(DEFAULT_OUTPUT)),
            title: Some(map.title),
            zoom: Some(map.zoom),
            center: None,
            tile_url: Some(map.tile_url),
            tile_attribution: Some(map.tile_attribution),
            group_column: Some(map.group_column),
            legend_title: Some(map.legend_title),
            popup_fields: Some(map.popup_fields),
        },
        report: ReportSection {
            path: Some(PathBuf::from(DEFAULT_REPORT)),
            column: Some(DEFAULT_REPORT_COLUMN.to_string()),
        },
        logging: LoggingConfig::default(),
    }
}

fn default_backends(strategy: GeocodeStrategy) -> Vec<BackendKind> {
    match strategy {
        GeocodeStrategy::Templates => vec![BackendKind::Yandex],
        GeocodeStrategy::Progressive => vec![BackendKind::Nominatim, BackendKind::Photon],
    }
}
