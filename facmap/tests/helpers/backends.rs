//! Offline geocoding backends

use async_trait::async_trait;
use facmap::types::{BackendHit, GeocodeError, GeocodingBackend, PrecisionTier};
use std::sync::{Arc, Mutex};

/// Answers queries containing one of the registered fragments
///
/// Every query is logged so tests can assert on what was sent.
#[derive(Clone, Default)]
pub struct ScriptedBackend {
    places: Vec<(String, f64, f64, Option<PrecisionTier>)>,
    queries: Arc<Mutex<Vec<String>>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve any query containing `fragment`
    pub fn place(mut self, fragment: &str, lat: f64, lon: f64) -> Self {
        self.places.push((fragment.to_string(), lat, lon, None));
        self
    }

    /// Same as `place`, with a backend-reported precision
    pub fn place_with_tier(mut self, fragment: &str, lat: f64, lon: f64, tier: PrecisionTier) -> Self {
        self.places.push((fragment.to_string(), lat, lon, Some(tier)));
        self
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }

    pub fn query_count(&self) -> usize {
        self.queries.lock().unwrap().len()
    }
}

#[async_trait]
impl GeocodingBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn lookup(&self, query: &str) -> Result<Option<BackendHit>, GeocodeError> {
        self.queries.lock().unwrap().push(query.to_string());

        Ok(self
            .places
            .iter()
            .find(|(fragment, ..)| query.contains(fragment.as_str()))
            .map(|(_, lat, lon, tier)| BackendHit {
                lat: *lat,
                lon: *lon,
                reported_tier: *tier,
                full_name: Some(query.to_string()),
            }))
    }
}

/// Fails every request, like a backend with a revoked key
pub struct FailingBackend;

#[async_trait]
impl GeocodingBackend for FailingBackend {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn lookup(&self, _query: &str) -> Result<Option<BackendHit>, GeocodeError> {
        Err(GeocodeError::InvalidApiKey)
    }
}
