//! Upstream client for the Visual Crossing timeline API.
//!
//! One GET per call, bounded by the client timeout. Every outcome is
//! classified into a [`Forecast`] or a [`ForecastFailure`]; nothing here
//! touches the cache.

use reqwest::{Client, StatusCode};
use std::sync::Arc;
use std::time::Duration;

use crate::error::WeatherError;
use crate::types::{Forecast, ForecastFailure};

pub const DEFAULT_BASE_URL: &str =
    "https://weather.visualcrossing.com/VisualCrossingWebServices/rest/services/timeline";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const USER_AGENT: &str = concat!("forecast/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct WeatherProvider {
    client: Arc<Client>,
    base_url: String,
    api_key: String,
}

impl WeatherProvider {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client: Arc::new(client),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    /// Full request URL for `location`, API key included.
    pub fn forecast_url(&self, location: &str) -> String {
        self.url_with_key(location, &self.api_key)
    }

    /// Request URL safe for logs.
    fn redacted_url(&self, location: &str) -> String {
        self.url_with_key(location, "REDACTED")
    }

    fn url_with_key(&self, location: &str, key: &str) -> String {
        format!(
            "{}/{}/next7days?unitGroup=us&key={}&include=days&contentType=json",
            self.base_url,
            urlencoding::encode(location),
            urlencoding::encode(key),
        )
    }

    /// Fetch and classify the 7-day forecast for `location`.
    pub async fn fetch_forecast(&self, location: &str) -> Result<Forecast, ForecastFailure> {
        tracing::debug!("GET {}", self.redacted_url(location));

        let response = self
            .client
            .get(self.forecast_url(location))
            .send()
            .await
            .map_err(transport_failure)?;

        let status = response.status();
        let body = response.text().await.map_err(transport_failure)?;

        classify_response(status, &body)
    }
}

/// Turn an HTTP status and body into a forecast or a failure record.
pub fn classify_response(status: StatusCode, body: &str) -> Result<Forecast, ForecastFailure> {
    if !status.is_success() {
        return Err(ForecastFailure::http(
            status.as_u16(),
            provider_message(status, body),
        ));
    }

    serde_json::from_str(body).map_err(|e| {
        tracing::debug!("Forecast body did not parse: {}", e);
        ForecastFailure::parse(status.as_u16(), body)
    })
}

/// Message for a non-success answer: a JSON `message` field, else the
/// reason phrase, else the raw body.
fn provider_message(status: StatusCode, body: &str) -> String {
    let json_message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_owned))
        .filter(|m| !m.trim().is_empty());

    json_message
        .or_else(|| status.canonical_reason().map(str::to_owned))
        .unwrap_or_else(|| body.trim().to_string())
}

fn transport_failure(error: reqwest::Error) -> ForecastFailure {
    // reqwest embeds the URL (and with it the key) in its Display output
    let error = error.without_url();
    let message = if error.is_timeout() {
        format!("Request timed out: {}", error)
    } else if error.is_connect() {
        format!("Connection failed: {}", error)
    } else {
        error.to_string()
    };
    ForecastFailure::transport(message)
}
