//! Nominatim (OpenStreetMap) client
//!
//! Public service; the usage policy requires an identifying User-Agent and
//! at most one request per second.
//!
//! # API Reference
//! - Endpoint: https://nominatim.openstreetmap.org/search
//! - Documentation: https://nominatim.org/release-docs/latest/api/Search/

use super::http::{build_http_client, rate_limiter, status_error, BackendRateLimiter, ClientOptions};
use crate::types::{BackendHit, GeocodeError, GeocodingBackend, PrecisionTier};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const NOMINATIM_SEARCH_URL: &str = "https://nominatim.openstreetmap.org/search";
const MIN_REQUEST_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    place_rank: Option<u8>,
}

/// Tier of a Nominatim `place_rank` (30 = building, 26-27 = street)
fn tier_from_rank(rank: u8) -> PrecisionTier {
    match rank {
        28..=u8::MAX => PrecisionTier::House,
        26..=27 => PrecisionTier::Street,
        _ => PrecisionTier::City,
    }
}

/// Parse a `format=jsonv2` search response; the first place wins
pub fn parse_response(body: &str) -> Result<Option<BackendHit>, GeocodeError> {
    let places: Vec<NominatimPlace> =
        serde_json::from_str(body).map_err(|e| GeocodeError::Parse(e.to_string()))?;

    let Some(place) = places.into_iter().next() else {
        return Ok(None);
    };

    let lat = place
        .lat
        .parse::<f64>()
        .map_err(|e| GeocodeError::Parse(format!("lat '{}': {}", place.lat, e)))?;
    let lon = place
        .lon
        .parse::<f64>()
        .map_err(|e| GeocodeError::Parse(format!("lon '{}': {}", place.lon, e)))?;

    Ok(Some(BackendHit {
        lat,
        lon,
        reported_tier: place.place_rank.map(tier_from_rank),
        full_name: place.display_name,
    }))
}

/// Nominatim search client
pub struct NominatimClient {
    http_client: reqwest::Client,
    rate_limiter: BackendRateLimiter,
    base_url: String,
    lang: String,
    country_codes: Option<String>,
}

impl NominatimClient {
    pub fn new(options: &ClientOptions, country_codes: Option<String>) -> Result<Self, GeocodeError> {
        Ok(Self {
            http_client: build_http_client(options)?,
            rate_limiter: rate_limiter(MIN_REQUEST_INTERVAL),
            base_url: options
                .base_url
                .clone()
                .unwrap_or_else(|| NOMINATIM_SEARCH_URL.to_string()),
            lang: options.short_lang().to_string(),
            country_codes: country_codes.filter(|c| !c.trim().is_empty()),
        })
    }
}

#[async_trait]
impl GeocodingBackend for NominatimClient {
    fn name(&self) -> &'static str {
        "nominatim"
    }

    async fn lookup(&self, query: &str) -> Result<Option<BackendHit>, GeocodeError> {
        self.rate_limiter.until_ready().await;

        debug!(query = %query, "Querying Nominatim");

        let mut params: Vec<(&str, &str)> = vec![
            ("q", query),
            ("format", "jsonv2"),
            ("limit", "1"),
            ("accept-language", self.lang.as_str()),
        ];
        if let Some(codes) = &self.country_codes {
            params.push(("countrycodes", codes.as_str()));
        }

        let response = self
            .http_client
            .get(&self.base_url)
            .query(&params)
            .send()
            .await
            .map_err(|e| GeocodeError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let body = response
            .text()
            .await
            .map_err(|e| GeocodeError::Network(e.to_string()))?;
        parse_response(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_building() {
        let body = r#"[{
            "place_id": 1234,
            "lat": "51.5335570",
            "lon": "46.0342570",
            "category": "building",
            "type": "yes",
            "place_rank": 30,
            "addresstype": "building",
            "display_name": "5, Московская улица, Саратов, Россия"
        }]"#;
        let hit = parse_response(body).unwrap().unwrap();
        assert!((hit.lat - 51.533557).abs() < 1e-9);
        assert_eq!(hit.reported_tier, Some(PrecisionTier::House));
        assert_eq!(hit.full_name.as_deref(), Some("5, Московская улица, Саратов, Россия"));
    }

    #[test]
    fn test_parse_street_and_city_ranks() {
        let street = r#"[{"lat": "51.5", "lon": "46.0", "place_rank": 26}]"#;
        let city = r#"[{"lat": "51.5", "lon": "46.0", "place_rank": 16}]"#;
        assert_eq!(
            parse_response(street).unwrap().unwrap().reported_tier,
            Some(PrecisionTier::Street)
        );
        assert_eq!(
            parse_response(city).unwrap().unwrap().reported_tier,
            Some(PrecisionTier::City)
        );
    }

    #[test]
    fn test_parse_no_results() {
        assert_eq!(parse_response("[]").unwrap(), None);
    }

    #[test]
    fn test_parse_bad_coordinate() {
        let body = r#"[{"lat": "north", "lon": "46.0"}]"#;
        assert!(matches!(parse_response(body), Err(GeocodeError::Parse(_))));
    }

    #[test]
    fn test_client_uses_short_language() {
        let client = NominatimClient::new(&ClientOptions::default(), Some("ru".to_string())).unwrap();
        assert_eq!(client.lang, "ru");
        assert_eq!(client.name(), "nominatim");
    }
}
