//! Shared HTTP plumbing for the geocoding clients

use crate::types::GeocodeError;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = concat!("facmap/", env!("CARGO_PKG_VERSION"));
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Direct (unkeyed) limiter owned by one client
pub type BackendRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Settings common to every geocoding client
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub user_agent: String,
    pub timeout: Duration,
    /// Response language, e.g. `ru_RU`
    pub lang: String,
    /// Override of the service endpoint
    pub base_url: Option<String>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: DEFAULT_TIMEOUT,
            lang: "ru_RU".to_string(),
            base_url: None,
        }
    }
}

impl ClientOptions {
    /// Two-letter language code (`ru_RU` → `ru`)
    pub fn short_lang(&self) -> &str {
        self.lang.split(&['_', '-'][..]).next().unwrap_or("ru")
    }
}

pub fn build_http_client(options: &ClientOptions) -> Result<reqwest::Client, GeocodeError> {
    reqwest::Client::builder()
        .user_agent(options.user_agent.as_str())
        .timeout(options.timeout)
        .build()
        .map_err(|e| GeocodeError::Network(e.to_string()))
}

/// Limiter allowing one request per `min_interval`, without bursts
pub fn rate_limiter(min_interval: Duration) -> BackendRateLimiter {
    let quota = Quota::with_period(min_interval)
        .unwrap_or_else(|| Quota::per_second(NonZeroU32::MIN));
    RateLimiter::direct(quota)
}

/// Map a non-success status to a backend error
pub async fn status_error(response: reqwest::Response) -> GeocodeError {
    let status = response.status();
    match status.as_u16() {
        401 | 403 => GeocodeError::InvalidApiKey,
        429 => GeocodeError::RateLimited,
        code => {
            let body = response.text().await.unwrap_or_default();
            GeocodeError::Api(code, body)
        }
    }
}
