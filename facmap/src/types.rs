//! Core types and the geocoding backend trait
//!
//! - `PrecisionTier` / `GeoPoint`: what a geocode resolves to, and what the
//!   cache stores
//! - `AddressQuery`: the normalized forms of one facility address
//! - `GeocodingBackend`: one remote geocoding service

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// ============================================================================
// Geocode results
// ============================================================================

/// Coarseness of a geocode match, ordered fine → coarse
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrecisionTier {
    /// Exact building; also assumed for cache entries written before tiers were tracked
    #[default]
    House,
    /// Street without a house number
    Street,
    /// Settlement center
    City,
}

impl PrecisionTier {
    pub const ALL: [PrecisionTier; 3] = [PrecisionTier::House, PrecisionTier::Street, PrecisionTier::City];

    pub fn as_str(&self) -> &'static str {
        match self {
            PrecisionTier::House => "house",
            PrecisionTier::Street => "street",
            PrecisionTier::City => "city",
        }
    }

    /// The less precise of two tiers
    pub fn coarser(self, other: PrecisionTier) -> PrecisionTier {
        self.max(other)
    }
}

impl fmt::Display for PrecisionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved coordinates, as stored in the geocode cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub tier: PrecisionTier,
    /// Formatted address reported by the backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    /// Backend that produced the point
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64, tier: PrecisionTier) -> Self {
        Self {
            lat,
            lon,
            tier,
            full_name: None,
            source: None,
        }
    }
}

/// One backend answer before the geocoder assigns the achieved tier
#[derive(Debug, Clone, PartialEq)]
pub struct BackendHit {
    pub lat: f64,
    pub lon: f64,
    /// Tier the backend reports for its match, if it reports one
    pub reported_tier: Option<PrecisionTier>,
    pub full_name: Option<String>,
}

// ============================================================================
// Address queries
// ============================================================================

/// Normalized forms of one facility address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressQuery {
    /// Address cell as read from the spreadsheet
    pub raw: String,
    /// Locality cell as read from the spreadsheet
    pub locality: String,
    /// `"{country}, {locality}, {street}, {house}"`; also the cache key
    pub canonical: String,
    /// Single-line form with abbreviations expanded and commas removed
    pub flattened: String,
}

// ============================================================================
// Backend trait
// ============================================================================

/// Errors from a single backend request
///
/// The geocoder logs these and moves on to the next attempt.
#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Parse error: {0}")]
    Parse(String),
}

/// A remote geocoding service
///
/// `Ok(None)` means the service answered but found nothing.
///
/// # Example
/// ```rust,ignore
/// use facmap::types::{BackendHit, GeocodeError, GeocodingBackend};
///
/// struct Fixed;
///
/// #[async_trait::async_trait]
/// impl GeocodingBackend for Fixed {
///     fn name(&self) -> &'static str { "fixed" }
///
///     async fn lookup(&self, _query: &str) -> Result<Option<BackendHit>, GeocodeError> {
///         Ok(Some(BackendHit { lat: 51.53, lon: 46.03, reported_tier: None, full_name: None }))
///     }
/// }
/// ```
#[async_trait::async_trait]
pub trait GeocodingBackend: Send + Sync {
    /// Backend name for logs and cache provenance
    fn name(&self) -> &'static str;

    /// Resolve one free-text query
    async fn lookup(&self, query: &str) -> Result<Option<BackendHit>, GeocodeError>;
}
