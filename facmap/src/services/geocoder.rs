//! Geocoder with query fallback
//!
//! Drives one or more `GeocodingBackend`s through a list of attempts built
//! from an `AddressQuery`, stopping at the first hit.
//!
//! # Strategies
//! - **Templates**: one backend, many query variants (locality + address,
//!   flattened address, raw address) each combined with every region and
//!   the country. The achieved tier is whatever the backend reports.
//! - **Progressive**: every backend is tried per tier, fine to coarse:
//!   1. house: the canonical query
//!   2. street: canonical query with the trailing house number stripped
//!   3. city: the first comma segments (country + locality)
//!
//!   The achieved tier is never finer than the tier of the attempt.
//!
//! # Error Handling
//! Backend errors are logged and count as a miss for that attempt. A row
//! where any request failed ends as `GeocodeOutcome::Failed` rather than
//! `NotFound`, so callers can avoid remembering it as a permanent miss.

use crate::error::{FacmapError, FacmapResult};
use crate::types::{AddressQuery, GeoPoint, GeocodingBackend, PrecisionTier};
use regex::Regex;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Trailing house number, optionally introduced by "дом" (e.g. ", дом 5А", " 12/3")
pub const DEFAULT_STREET_STRIP_PATTERN: &str = r",?\s*(?:дом\s*)?\d+[\p{L}\d/\-]*\s*$";
pub const DEFAULT_CITY_MIN_SEGMENTS: usize = 3;
pub const DEFAULT_CITY_KEEP_SEGMENTS: usize = 2;

/// Suffix appended to region names in template queries
const REGION_SUFFIX: &str = "область";

/// How attempts are generated from an address
#[derive(Debug, Clone)]
pub enum FallbackStrategy {
    Templates {
        regions: Vec<String>,
        country: String,
    },
    Progressive {
        street_strip: Regex,
        city_min_segments: usize,
        city_keep_segments: usize,
    },
}

/// One query to send, with the tier it can at best achieve
///
/// `tier == None` means the backend's reported tier is taken as is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub query: String,
    pub tier: Option<PrecisionTier>,
}

impl FallbackStrategy {
    pub fn templates(regions: Vec<String>, country: impl Into<String>) -> Self {
        FallbackStrategy::Templates {
            regions,
            country: country.into(),
        }
    }

    pub fn progressive(
        street_strip_pattern: &str,
        city_min_segments: usize,
        city_keep_segments: usize,
    ) -> FacmapResult<Self> {
        let street_strip = Regex::new(street_strip_pattern)
            .map_err(|e| FacmapError::pattern(street_strip_pattern, e))?;
        Ok(FallbackStrategy::Progressive {
            street_strip,
            city_min_segments,
            city_keep_segments,
        })
    }

    /// Ordered, deduplicated attempts for one address
    pub fn attempts(&self, query: &AddressQuery) -> Vec<Attempt> {
        let candidates = match self {
            FallbackStrategy::Templates { regions, country } => {
                template_queries(query, regions, country)
                    .into_iter()
                    .map(|q| Attempt { query: q, tier: None })
                    .collect::<Vec<_>>()
            }
            FallbackStrategy::Progressive {
                street_strip,
                city_min_segments,
                city_keep_segments,
            } => progressive_attempts(
                &query.canonical,
                street_strip,
                *city_min_segments,
                *city_keep_segments,
            ),
        };

        let mut seen = HashSet::new();
        candidates
            .into_iter()
            .filter_map(|attempt| {
                let trimmed = attempt.query.trim();
                if trimmed.is_empty() || !seen.insert(trimmed.to_string()) {
                    return None;
                }
                Some(Attempt {
                    query: trimmed.to_string(),
                    tier: attempt.tier,
                })
            })
            .collect()
    }
}

fn template_queries(query: &AddressQuery, regions: &[String], country: &str) -> Vec<String> {
    let mut variants = Vec::with_capacity(3);
    let locality = query.locality.trim();
    if !locality.is_empty()
        && !query
            .flattened
            .to_lowercase()
            .contains(&locality.to_lowercase())
    {
        variants.push(format!("{}, {}", locality, query.flattened));
    }
    variants.push(query.flattened.clone());
    variants.push(query.raw.clone());

    let areas: Vec<&str> = regions
        .iter()
        .map(String::as_str)
        .chain(std::iter::once(country))
        .filter(|r| !r.trim().is_empty())
        .collect();

    let mut queries = Vec::new();
    for variant in variants.iter().filter(|v| !v.trim().is_empty()) {
        for area in &areas {
            queries.push(format!("{}, {} {}", variant, area, REGION_SUFFIX));
            queries.push(format!("{}, {}", variant, area));
        }
        queries.push(variant.clone());
    }
    queries
}

fn progressive_attempts(
    canonical: &str,
    street_strip: &Regex,
    city_min_segments: usize,
    city_keep_segments: usize,
) -> Vec<Attempt> {
    let mut attempts = vec![Attempt {
        query: canonical.to_string(),
        tier: Some(PrecisionTier::House),
    }];

    let street = street_strip.replace(canonical, "");
    let street = street.trim().trim_end_matches(',').trim_end();
    if street != canonical && !street.is_empty() {
        attempts.push(Attempt {
            query: street.to_string(),
            tier: Some(PrecisionTier::Street),
        });
    }

    let segments: Vec<&str> = canonical
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    if city_keep_segments > 0 && segments.len() >= city_min_segments {
        let keep = city_keep_segments.min(segments.len());
        attempts.push(Attempt {
            query: segments[..keep].join(", "),
            tier: Some(PrecisionTier::City),
        });
    }

    attempts
}

/// Result of resolving one address
#[derive(Debug, Clone, PartialEq)]
pub enum GeocodeOutcome {
    Resolved(GeoPoint),
    /// Every backend answered and none found the address
    NotFound,
    /// Nothing found, and at least one request failed
    Failed { errors: usize },
}

/// Fallback geocoder over a set of backends
pub struct Geocoder {
    backends: Vec<Box<dyn GeocodingBackend>>,
    strategy: FallbackStrategy,
}

impl Geocoder {
    pub fn new(backends: Vec<Box<dyn GeocodingBackend>>, strategy: FallbackStrategy) -> Self {
        Self { backends, strategy }
    }

    pub fn backend_names(&self) -> Vec<&'static str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    pub fn strategy(&self) -> &FallbackStrategy {
        &self.strategy
    }

    /// Resolve one address; never fails, see `GeocodeOutcome`
    pub async fn resolve(&self, query: &AddressQuery) -> GeocodeOutcome {
        let mut errors = 0;

        for attempt in self.strategy.attempts(query) {
            for backend in &self.backends {
                match backend.lookup(&attempt.query).await {
                    Ok(Some(hit)) => {
                        let tier = match (attempt.tier, hit.reported_tier) {
                            (Some(attempted), Some(reported)) => attempted.coarser(reported),
                            (Some(attempted), None) => attempted,
                            (None, reported) => reported.unwrap_or_default(),
                        };
                        debug!(
                            backend = backend.name(),
                            query = %attempt.query,
                            tier = %tier,
                            "Geocoded"
                        );
                        return GeocodeOutcome::Resolved(GeoPoint {
                            lat: hit.lat,
                            lon: hit.lon,
                            tier,
                            full_name: hit.full_name,
                            source: Some(backend.name().to_string()),
                        });
                    }
                    Ok(None) => {
                        debug!(backend = backend.name(), query = %attempt.query, "No match");
                    }
                    Err(e) => {
                        errors += 1;
                        warn!(
                            backend = backend.name(),
                            query = %attempt.query,
                            "Geocoding request failed: {}",
                            e
                        );
                    }
                }
            }
        }

        if errors > 0 {
            GeocodeOutcome::Failed { errors }
        } else {
            GeocodeOutcome::NotFound
        }
    }
}
