//! Shared outbound HTTP context for the lookup tools

use std::collections::HashMap;
use std::time::Duration;

use reqwest::Client;

use crate::config::{Secrets, ToolsConfig};
use crate::error::{ChatError, Result};

/// HTTP client, endpoints and keys used by the price, weather and news tools
pub struct ToolHttp {
    pub client: Client,
    pub price_url: String,
    pub weather_url: String,
    pub news_url: String,
    pub weather_api_key: String,
    pub news_api_key: String,
    pub news_page_size: u32,
    /// Keys are lowercase
    pub location_aliases: HashMap<String, String>,
    pub timeout: Duration,
}

impl ToolHttp {
    pub fn new(config: &ToolsConfig, secrets: &Secrets) -> Result<Self> {
        let timeout = Duration::from_millis(config.timeout_ms);
        // NewsAPI rejects requests that carry no User-Agent
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ChatError::Config(format!("Failed to create tool HTTP client: {}", e)))?;

        let location_aliases = config
            .location_aliases
            .iter()
            .map(|(from, to)| (from.trim().to_lowercase(), to.clone()))
            .collect();

        Ok(Self {
            client,
            price_url: config.price_url.clone(),
            weather_url: config.weather_url.clone(),
            news_url: config.news_url.clone(),
            weather_api_key: secrets.weather_api_key.clone(),
            news_api_key: secrets.news_api_key.clone(),
            news_page_size: config.news_page_size,
            location_aliases,
            timeout,
        })
    }
}

impl std::fmt::Debug for ToolHttp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolHttp")
            .field("price_url", &self.price_url)
            .field("weather_url", &self.weather_url)
            .field("news_url", &self.news_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Context whose endpoints all point at `base` (an httpmock server)
#[cfg(test)]
pub(crate) fn test_http(base: &str) -> std::sync::Arc<ToolHttp> {
    let config = ToolsConfig {
        timeout_ms: 5_000,
        price_url: format!("{}/api/v3/simple/price", base),
        weather_url: format!("{}/v1/current.json", base),
        news_url: format!("{}/v2/top-headlines", base),
        ..Default::default()
    };
    let secrets = Secrets::from_lookup(|key| Some(format!("{}-test", key.to_lowercase()))).unwrap();
    std::sync::Arc::new(ToolHttp::new(&config, &secrets).unwrap())
}
