//! Yandex Geocoder client
//!
//! Commercial API, authenticated by an `apikey` query parameter.
//!
//! # API Reference
//! - Endpoint: https://geocode-maps.yandex.ru/1.x/
//! - Documentation: https://yandex.ru/dev/geocode/doc/en/

use super::http::{build_http_client, rate_limiter, status_error, BackendRateLimiter, ClientOptions};
use crate::types::{BackendHit, GeocodeError, GeocodingBackend, PrecisionTier};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const YANDEX_GEOCODER_URL: &str = "https://geocode-maps.yandex.ru/1.x/";
const MIN_REQUEST_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Deserialize)]
struct YandexResponse {
    response: YandexBody,
}

#[derive(Debug, Deserialize)]
struct YandexBody {
    #[serde(rename = "GeoObjectCollection")]
    collection: GeoObjectCollection,
}

#[derive(Debug, Deserialize)]
struct GeoObjectCollection {
    #[serde(rename = "featureMember", default)]
    feature_member: Vec<FeatureMember>,
}

#[derive(Debug, Deserialize)]
struct FeatureMember {
    #[serde(rename = "GeoObject")]
    geo_object: GeoObject,
}

#[derive(Debug, Deserialize)]
struct GeoObject {
    #[serde(rename = "Point")]
    point: YandexPoint,
    #[serde(rename = "metaDataProperty")]
    meta: MetaDataProperty,
}

#[derive(Debug, Deserialize)]
struct YandexPoint {
    /// "lon lat"
    pos: String,
}

#[derive(Debug, Deserialize)]
struct MetaDataProperty {
    #[serde(rename = "GeocoderMetaData")]
    geocoder: GeocoderMetaData,
}

#[derive(Debug, Deserialize)]
struct GeocoderMetaData {
    text: String,
    #[serde(default)]
    kind: Option<String>,
}

/// Tier of a Yandex toponym kind
fn tier_from_kind(kind: &str) -> PrecisionTier {
    match kind {
        "house" | "entrance" => PrecisionTier::House,
        "street" => PrecisionTier::Street,
        _ => PrecisionTier::City,
    }
}

/// Parse a geocoder response body; the first feature member wins
pub fn parse_response(body: &str) -> Result<Option<BackendHit>, GeocodeError> {
    let response: YandexResponse =
        serde_json::from_str(body).map_err(|e| GeocodeError::Parse(e.to_string()))?;

    let Some(member) = response.response.collection.feature_member.into_iter().next() else {
        return Ok(None);
    };
    let object = member.geo_object;

    let mut coords = object.point.pos.split_whitespace().map(str::parse::<f64>);
    let (lon, lat) = match (coords.next(), coords.next()) {
        (Some(Ok(lon)), Some(Ok(lat))) => (lon, lat),
        _ => {
            return Err(GeocodeError::Parse(format!(
                "invalid Point.pos '{}'",
                object.point.pos
            )))
        }
    };

    Ok(Some(BackendHit {
        lat,
        lon,
        reported_tier: object.meta.geocoder.kind.as_deref().map(tier_from_kind),
        full_name: Some(object.meta.geocoder.text),
    }))
}

/// Yandex Geocoder client
pub struct YandexClient {
    http_client: reqwest::Client,
    rate_limiter: BackendRateLimiter,
    api_key: String,
    base_url: String,
    lang: String,
}

impl YandexClient {
    pub fn new(api_key: String, options: &ClientOptions) -> Result<Self, GeocodeError> {
        if !crate::config::is_valid_key(&api_key) {
            return Err(GeocodeError::InvalidApiKey);
        }
        Ok(Self {
            http_client: build_http_client(options)?,
            rate_limiter: rate_limiter(MIN_REQUEST_INTERVAL),
            api_key,
            base_url: options
                .base_url
                .clone()
                .unwrap_or_else(|| YANDEX_GEOCODER_URL.to_string()),
            lang: options.lang.clone(),
        })
    }
}

#[async_trait]
impl GeocodingBackend for YandexClient {
    fn name(&self) -> &'static str {
        "yandex"
    }

    async fn lookup(&self, query: &str) -> Result<Option<BackendHit>, GeocodeError> {
        self.rate_limiter.until_ready().await;

        debug!(query = %query, "Querying Yandex Geocoder");

        let response = self
            .http_client
            .get(&self.base_url)
            .query(&[
                ("apikey", self.api_key.as_str()),
                ("geocode", query),
                ("format", "json"),
                ("lang", self.lang.as_str()),
                ("results", "1"),
            ])
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

    const HOUSE_RESPONSE: &str = r#"{
      "response": {
        "GeoObjectCollection": {
          "metaDataProperty": {"GeocoderResponseMetaData": {"request": "Саратов, Московская 5", "found": "1"}},
          "featureMember": [
            {
              "GeoObject": {
                "metaDataProperty": {
                  "GeocoderMetaData": {
                    "precision": "exact",
                    "text": "Россия, Саратов, Московская улица, 5",
                    "kind": "house"
                  }
                },
                "name": "Московская улица, 5",
                "Point": {"pos": "46.034257 51.533557"}
              }
            }
          ]
        }
      }
    }"#;

    #[test]
    fn test_parse_house_response() {
        let hit = parse_response(HOUSE_RESPONSE).unwrap().unwrap();
        assert!((hit.lat - 51.533557).abs() < 1e-9);
        assert!((hit.lon - 46.034257).abs() < 1e-9);
        assert_eq!(hit.reported_tier, Some(PrecisionTier::House));
        assert_eq!(hit.full_name.as_deref(), Some("Россия, Саратов, Московская улица, 5"));
    }

    #[test]
    fn test_parse_empty_collection() {
        let body = r#"{"response": {"GeoObjectCollection": {"featureMember": []}}}"#;
        assert_eq!(parse_response(body).unwrap(), None);
    }

    #[test]
    fn test_parse_locality_is_city_tier() {
        let body = HOUSE_RESPONSE.replace(r#""kind": "house""#, r#""kind": "locality""#);
        let hit = parse_response(&body).unwrap().unwrap();
        assert_eq!(hit.reported_tier, Some(PrecisionTier::City));
    }

    #[test]
    fn test_parse_rejects_malformed_position() {
        let body = HOUSE_RESPONSE.replace("46.034257 51.533557", "46.03");
        assert!(matches!(parse_response(&body), Err(GeocodeError::Parse(_))));
    }

    #[test]
    fn test_empty_key_rejected() {
        let result = YandexClient::new("   ".to_string(), &ClientOptions::default());
        assert!(matches!(result, Err(GeocodeError::InvalidApiKey)));
    }

    #[test]
    fn test_client_creation() {
        let client = YandexClient::new("test-key".to_string(), &ClientOptions::default()).unwrap();
        assert_eq!(client.name(), "yandex");
        assert_eq!(client.base_url, YANDEX_GEOCODER_URL);
    }
}
