//! getWeather - current conditions for a place

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::{ParamKind, ParamSpec, Tool, ToolDescriptor, ToolFailure, ToolHttp, ToolName, ToolOutcome};

const NO_LOCATION: &str = "Error: No location name was given.";
const NETWORK_ERROR: &str = "Error: A network error occurred while fetching weather data.";

pub struct WeatherTool {
    http: Arc<ToolHttp>,
}

impl WeatherTool {
    pub fn new(http: Arc<ToolHttp>) -> Self {
        Self { http }
    }

    /// Apply the alias table (case-insensitive) to a non-blank location
    pub fn resolve_location(&self, location: &str) -> String {
        let trimmed = location.trim();
        self.http
            .location_aliases
            .get(&trimmed.to_lowercase())
            .cloned()
            .unwrap_or_else(|| trimmed.to_string())
    }
}

#[async_trait]
impl Tool for WeatherTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: ToolName::GetWeather,
            description: "Returns the current weather for any city.",
            params: vec![
                ParamSpec::required("location", ParamKind::String)
                    .with_description("Name of the city, e.g. 'Mumbai'."),
            ],
        }
    }

    async fn execute(&self, args: &Value) -> ToolOutcome {
        let location = args["location"].as_str().unwrap_or_default();
        if location.trim().is_empty() {
            return Err(ToolFailure::invalid(NO_LOCATION));
        }

        let resolved = self.resolve_location(location);
        log::info!("[Weather] Fetching weather for: {} (original: {})", resolved, location);

        let response = self
            .http
            .client
            .get(&self.http.weather_url)
            .query(&[
                ("key", self.http.weather_api_key.as_str()),
                ("q", resolved.as_str()),
                ("aqi", "no"),
            ])
            .send()
            .await
            .map_err(|e| ToolFailure::transport(NETWORK_ERROR, e))?;

        let status = response.status();
        let body: Option<Value> = response.json().await.ok();
        let upstream_error = body.as_ref().and_then(|b| b.get("error")).filter(|e| !e.is_null());

        if !status.is_success() || upstream_error.is_some() {
            let message = upstream_error
                .and_then(|e| e["message"].as_str())
                .map(str::to_string)
                .unwrap_or_else(|| format!("HTTP error! status: {}", status.as_u16()));
            log::warn!("[Weather] API error for {}: {}", resolved, message);
            return Err(ToolFailure::upstream(
                format!("Error: Could not get weather for '{}'. The API said: {}", resolved, message),
                Some(status.as_u16()),
            ));
        }

        body.as_ref()
            .and_then(format_weather)
            .ok_or_else(|| ToolFailure::transport(NETWORK_ERROR, "unexpected weather response shape"))
    }
}

fn format_weather(body: &Value) -> Option<String> {
    let name = body["location"]["name"].as_str()?;
    let country = body["location"]["country"].as_str()?;
    let current = &body["current"];
    let temp_c = current["temp_c"].as_f64()?;
    let condition = current["condition"]["text"].as_str()?;
    let humidity = current["humidity"].as_f64()?;

    Some(format!(
        "{}, {}: currently {}°C, {}. Humidity is {}%.",
        name, country, temp_c, condition, humidity
    ))
}
