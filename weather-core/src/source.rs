use std::fmt::Debug;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::{
    config::{Config, Units},
    decode::decode,
    model::DecodeOutcome,
};

/// OpenWeather current-weather endpoint.
pub const OPENWEATHER_CURRENT_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

/// Supplies raw response bodies for the decoder.
#[async_trait]
pub trait WeatherSource: Send + Sync + Debug {
    /// Fetches current weather for `location`, returned as a JSON array
    /// holding the API's record.
    async fn fetch_current(&self, location: &str) -> Result<Vec<u8>>;
}

#[derive(Debug, Clone)]
pub struct OpenWeatherSource {
    api_key: String,
    endpoint: String,
    units: Units,
    http: Client,
}

impl OpenWeatherSource {
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config.api_key()?.to_owned();
        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            api_key,
            endpoint: config.endpoint.clone().unwrap_or_else(|| OPENWEATHER_CURRENT_URL.to_string()),
            units: config.units,
            http,
        })
    }
}

#[async_trait]
impl WeatherSource for OpenWeatherSource {
    async fn fetch_current(&self, location: &str) -> Result<Vec<u8>> {
        debug!(location, endpoint = %self.endpoint, "requesting current weather");

        let res = self
            .http
            .get(&self.endpoint)
            .query(&[
                ("q", location),
                ("appid", self.api_key.as_str()),
                ("units", self.units.as_str()),
            ])
            .send()
            .await
            .context("Failed to send request to OpenWeather (current weather)")?;

        let status = res.status();
        let body = res
            .bytes()
            .await
            .context("Failed to read OpenWeather current response body")?;

        if !status.is_success() {
            return Err(anyhow!(
                "OpenWeather current request failed with status {}: {}",
                status,
                truncate_body(&String::from_utf8_lossy(&body)),
            ));
        }

        debug!(bytes = body.len(), "current weather received");
        Ok(wrap_as_array(&body))
    }
}

/// Fetches current weather for `location` and decodes it.
pub async fn current_weather(source: &dyn WeatherSource, location: &str) -> Result<DecodeOutcome> {
    let body = source.fetch_current(location).await?;

    decode(body.as_slice())
        .with_context(|| format!("Failed to decode weather response for '{location}'"))
}

/// OpenWeather answers with a bare object; the decoder expects it wrapped
/// in a root array. Bodies that already are arrays pass through.
pub fn wrap_as_array(body: &[u8]) -> Vec<u8> {
    let first = body.iter().find(|b| !b.is_ascii_whitespace());
    if first == Some(&b'[') {
        return body.to_vec();
    }

    let mut wrapped = Vec::with_capacity(body.len() + 2);
    wrapped.push(b'[');
    wrapped.extend_from_slice(body);
    wrapped.push(b']');
    wrapped
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
