//! Reverse geocoding of apartment coordinates.
//!
//! The default backend is a Nominatim-compatible HTTP service. Calls are
//! serialized and spaced by `min_interval_ms` to respect the service's rate
//! limit; transient failures are retried with exponential backoff.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Default Nominatim API URL.
pub const DEFAULT_NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";

/// Geocoding failures, classified by whether a retry can help.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GeocodeError {
    #[error("transient geocoding failure: {0}")]
    Transient(String),

    #[error("geocoding request rejected: {0}")]
    Permanent(String),

    #[error("invalid geocoding response: {0}")]
    InvalidResponse(String),
}

impl GeocodeError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Reverse lookup from a coordinate pair to a place label.
///
/// `Ok(None)` means the service answered but knows no place there.
#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    async fn reverse(&self, lat: f64, lon: f64) -> Result<Option<String>, GeocodeError>;
}

/// Geocoder settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeocoderConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    pub min_interval_ms: u64,
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_consecutive_failures: u32,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_NOMINATIM_URL.to_string(),
            user_agent: "address_converter".to_string(),
            timeout_secs: 10,
            min_interval_ms: 1000,
            max_retries: 3,
            initial_backoff_ms: 500,
            max_consecutive_failures: 5,
        }
    }
}

impl GeocoderConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_consecutive_failures: self.max_consecutive_failures,
        }
    }
}

/// How the address pass reacts to failing lookups.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Extra attempts after the first transient failure.
    pub max_retries: u32,
    pub initial_backoff: Duration,
    /// Consecutive coordinate pairs that may exhaust their retries before the
    /// service is declared unavailable.
    pub max_consecutive_failures: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        GeocoderConfig::default().retry_policy()
    }
}

/// Look up a label, retrying transient failures with doubling backoff.
pub async fn reverse_with_retry(
    geocoder: &dyn ReverseGeocoder,
    lat: f64,
    lon: f64,
    policy: &RetryPolicy,
) -> Result<Option<String>, GeocodeError> {
    let mut delay = policy.initial_backoff;
    let mut attempt = 0;

    loop {
        match geocoder.reverse(lat, lon).await {
            Ok(label) => return Ok(label),
            Err(e) if e.is_transient() && attempt < policy.max_retries => {
                attempt += 1;
                debug!(lat, lon, attempt, error = %e, "Retrying reverse geocoding");
                tokio::time::sleep(delay).await;
                delay = next_backoff(delay);
            }
            Err(e) => return Err(e),
        }
    }
}

/// Double the backoff, saturating at `Duration::MAX`.
fn next_backoff(delay: Duration) -> Duration {
    delay.saturating_mul(2)
}

#[derive(Deserialize)]
struct ReverseResponse {
    display_name: Option<String>,
    error: Option<String>,
}

/// Nominatim reverse-geocoding client.
pub struct NominatimClient {
    base_url: String,
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
    client: reqwest::Client,
}

impl NominatimClient {
    /// Create a new client from config.
    pub fn new(config: &GeocoderConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            min_interval: Duration::from_millis(config.min_interval_ms),
            last_request: Mutex::new(None),
            client,
        })
    }

    /// Wait until the rate-limit interval since the last request has passed.
    async fn throttle(&self) -> tokio::sync::MutexGuard<'_, Option<Instant>> {
        let guard = self.last_request.lock().await;
        if let Some(last) = *guard {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        guard
    }
}

fn classify_request_error(e: reqwest::Error) -> GeocodeError {
    if e.is_timeout() || e.is_connect() || e.is_request() {
        GeocodeError::Transient(e.to_string())
    } else {
        GeocodeError::Permanent(e.to_string())
    }
}

fn classify_status(status: reqwest::StatusCode) -> Option<GeocodeError> {
    if status.is_success() {
        None
    } else if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        Some(GeocodeError::Transient(format!("HTTP {}", status)))
    } else {
        Some(GeocodeError::Permanent(format!("HTTP {}", status)))
    }
}

/// Turn a reverse response into a usable label. Empty labels count as none.
fn label_from_response(response: ReverseResponse) -> Option<String> {
    if let Some(error) = response.error {
        debug!(error = %error, "No place found for coordinates");
        return None;
    }
    response
        .display_name
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
}

#[async_trait]
impl ReverseGeocoder for NominatimClient {
    async fn reverse(&self, lat: f64, lon: f64) -> Result<Option<String>, GeocodeError> {
        let mut last_request = self.throttle().await;

        let result = self.client
            .get(format!("{}/reverse", self.base_url))
            .query(&[
                ("format", "jsonv2".to_string()),
                ("lat", lat.to_string()),
                ("lon", lon.to_string()),
            ])
            .send()
            .await;
        *last_request = Some(Instant::now());
        drop(last_request);

        let response = result.map_err(classify_request_error)?;
        if let Some(err) = classify_status(response.status()) {
            warn!(lat, lon, error = %err, "Reverse geocoding failed");
            return Err(err);
        }

        let body: ReverseResponse = response
            .json()
            .await
            .map_err(|e| GeocodeError::InvalidResponse(e.to_string()))?;

        Ok(label_from_response(body))
    }
}
