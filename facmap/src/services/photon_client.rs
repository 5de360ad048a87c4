//! Photon (komoot) client
//!
//! Public OpenStreetMap-based geocoder returning GeoJSON. Photon only knows
//! a handful of response languages; anything else falls back to local names.
//!
//! # API Reference
//! - Endpoint: https://photon.komoot.io/api/
//! - Documentation: https://github.com/komoot/photon

use super::http::{build_http_client, rate_limiter, status_error, BackendRateLimiter, ClientOptions};
use crate::types::{BackendHit, GeocodeError, GeocodingBackend, PrecisionTier};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const PHOTON_API_URL: &str = "https://photon.komoot.io/api/";
const MIN_REQUEST_INTERVAL: Duration = Duration::from_secs(1);
const SUPPORTED_LANGUAGES: [&str; 4] = ["default", "en", "de", "fr"];

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    geometry: Geometry,
    #[serde(default)]
    properties: Properties,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    /// [lon, lat]
    coordinates: Vec<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct Properties {
    #[serde(rename = "type")]
    kind: Option<String>,
    name: Option<String>,
    street: Option<String>,
    housenumber: Option<String>,
    city: Option<String>,
    state: Option<String>,
    country: Option<String>,
}

impl Properties {
    fn tier(&self) -> Option<PrecisionTier> {
        if self.housenumber.is_some() {
            return Some(PrecisionTier::House);
        }
        self.kind.as_deref().map(|kind| match kind {
            "house" => PrecisionTier::House,
            "street" => PrecisionTier::Street,
            _ => PrecisionTier::City,
        })
    }

    fn full_name(&self) -> Option<String> {
        let street = match (&self.street, &self.housenumber) {
            (Some(street), Some(number)) => Some(format!("{}, {}", street, number)),
            (Some(street), None) => Some(street.clone()),
            (None, _) => None,
        };
        let parts: Vec<&str> = [
            self.country.as_deref(),
            self.state.as_deref(),
            self.city.as_deref(),
            street.as_deref().or(self.name.as_deref()),
        ]
        .into_iter()
        .flatten()
        .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }
}

/// Parse a GeoJSON response; the first feature wins
pub fn parse_response(body: &str) -> Result<Option<BackendHit>, GeocodeError> {
    let collection: FeatureCollection =
        serde_json::from_str(body).map_err(|e| GeocodeError::Parse(e.to_string()))?;

    let Some(feature) = collection.features.into_iter().next() else {
        return Ok(None);
    };

    let (lon, lat) = match feature.geometry.coordinates.as_slice() {
        [lon, lat, ..] => (*lon, *lat),
        other => {
            return Err(GeocodeError::Parse(format!(
                "expected [lon, lat], got {:?}",
                other
            )))
        }
    };

    Ok(Some(BackendHit {
        lat,
        lon,
        reported_tier: feature.properties.tier(),
        full_name: feature.properties.full_name(),
    }))
}

/// Photon search client
pub struct PhotonClient {
    http_client: reqwest::Client,
    rate_limiter: BackendRateLimiter,
    base_url: String,
    lang: Option<String>,
}

impl PhotonClient {
    pub fn new(options: &ClientOptions) -> Result<Self, GeocodeError> {
        let lang = options.short_lang();
        Ok(Self {
            http_client: build_http_client(options)?,
            rate_limiter: rate_limiter(MIN_REQUEST_INTERVAL),
            base_url: options
                .base_url
                .clone()
                .unwrap_or_else(|| PHOTON_API_URL.to_string()),
            lang: SUPPORTED_LANGUAGES
                .contains(&lang)
                .then(|| lang.to_string()),
        })
    }
}

#[async_trait]
impl GeocodingBackend for PhotonClient {
    fn name(&self) -> &'static str {
        "photon"
    }

    async fn lookup(&self, query: &str) -> Result<Option<BackendHit>, GeocodeError> {
        self.rate_limiter.until_ready().await;

        debug!(query = %query, "Querying Photon");

        let mut params: Vec<(&str, &str)> = vec![("q", query), ("limit", "1")];
        if let Some(lang) = &self.lang {
            params.push(("lang", lang.as_str()));
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
    fn test_parse_house_feature() {
        let body = r#"{
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "geometry": {"type": "Point", "coordinates": [45.0178, 53.1959]},
                "properties": {
                    "osm_id": 1,
                    "type": "house",
                    "street": "Московская улица",
                    "housenumber": "1",
                    "city": "Пенза",
                    "state": "Пензенская область",
                    "country": "Россия"
                }
            }]
        }"#;
        let hit = parse_response(body).unwrap().unwrap();
        assert!((hit.lat - 53.1959).abs() < 1e-9);
        assert!((hit.lon - 45.0178).abs() < 1e-9);
        assert_eq!(hit.reported_tier, Some(PrecisionTier::House));
        assert_eq!(
            hit.full_name.as_deref(),
            Some("Россия, Пензенская область, Пенза, Московская улица, 1")
        );
    }

    #[test]
    fn test_parse_city_feature() {
        let body = r#"{"features": [{
            "geometry": {"coordinates": [45.0, 53.2]},
            "properties": {"type": "city", "name": "Пенза", "country": "Россия"}
        }]}"#;
        let hit = parse_response(body).unwrap().unwrap();
        assert_eq!(hit.reported_tier, Some(PrecisionTier::City));
        assert_eq!(hit.full_name.as_deref(), Some("Россия, Пенза"));
    }

    #[test]
    fn test_parse_empty_collection() {
        assert_eq!(parse_response(r#"{"features": []}"#).unwrap(), None);
    }

    #[test]
    fn test_parse_short_coordinates() {
        let body = r#"{"features": [{"geometry": {"coordinates": [45.0]}}]}"#;
        assert!(matches!(parse_response(body), Err(GeocodeError::Parse(_))));
    }

    #[test]
    fn test_unsupported_language_is_omitted() {
        let client = PhotonClient::new(&ClientOptions::default()).unwrap();
        assert_eq!(client.lang, None);

        let options = ClientOptions {
            lang: "en_US".to_string(),
            ..Default::default()
        };
        let client = PhotonClient::new(&options).unwrap();
        assert_eq!(client.lang.as_deref(), Some("en"));
    }
}
