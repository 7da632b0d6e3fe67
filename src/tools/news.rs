//! getTopHeadlines - top news headlines by country and category

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::{ParamKind, ParamSpec, Tool, ToolDescriptor, ToolFailure, ToolHttp, ToolName, ToolOutcome, string_arg};

/// Categories accepted by the headlines endpoint
pub const NEWS_CATEGORIES: [&str; 7] = [
    "business",
    "entertainment",
    "general",
    "health",
    "science",
    "sports",
    "technology",
];

const DEFAULT_COUNTRY: &str = "in";
const DEFAULT_CATEGORY: &str = "general";
const CONNECT_FAILED: &str = "Error: Could not connect to the news API.";

pub struct NewsTool {
    http: Arc<ToolHttp>,
}

impl NewsTool {
    pub fn new(http: Arc<ToolHttp>) -> Self {
        Self { http }
    }
}

/// Country and category after defaults and validation
fn resolve_query(args: &Value) -> Result<(String, String), ToolFailure> {
    let country = string_arg(args, "country").unwrap_or(DEFAULT_COUNTRY).to_lowercase();
    if country.len() != 2 || !country.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ToolFailure::invalid(format!(
            "Error: '{}' is not a 2-letter country code.",
            country
        )));
    }

    let category = string_arg(args, "category").unwrap_or(DEFAULT_CATEGORY).to_lowercase();
    if !NEWS_CATEGORIES.contains(&category.as_str()) {
        return Err(ToolFailure::invalid(format!(
            "Error: Unknown news category '{}'. Use one of: {}.",
            category,
            NEWS_CATEGORIES.join(", ")
        )));
    }

    Ok((country, category))
}

#[async_trait]
impl Tool for NewsTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: ToolName::GetTopHeadlines,
            description: "Fetches the top 5 news headlines for a country and category, e.g. business, technology, sports.",
            params: vec![
                ParamSpec::optional("country", ParamKind::String).with_description(
                    "2-letter ISO country code, e.g. 'in' for India, 'us' for USA. Use 'in' if the user does not give one.",
                ),
                ParamSpec::optional("category", ParamKind::String).with_description(
                    "News category: business, entertainment, general, health, science, sports, technology. Use 'general' if the user does not give one.",
                ),
            ],
        }
    }

    async fn execute(&self, args: &Value) -> ToolOutcome {
        let (country, category) = resolve_query(args)?;
        log::info!("[News] Fetching news for country={}, category={}", country, category);

        let page_size = self.http.news_page_size.to_string();
        let response = self
            .http
            .client
            .get(&self.http.news_url)
            .query(&[
                ("country", country.as_str()),
                ("category", category.as_str()),
                ("apiKey", self.http.news_api_key.as_str()),
                ("pageSize", page_size.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ToolFailure::transport(CONNECT_FAILED, e))?;

        let status = response.status().as_u16();
        let body: Value = response
            .json()
            .await
            .map_err(|e| ToolFailure::transport(CONNECT_FAILED, e))?;

        if body["status"].as_str() != Some("ok") {
            let message = body["message"].as_str().unwrap_or("An unknown API error occurred.");
            log::warn!("[News] API error: {}", message);
            return Err(ToolFailure::upstream(
                format!("Error: Failed to fetch news: {}", message),
                Some(status),
            ));
        }

        let articles = body["articles"].as_array().map(Vec::as_slice).unwrap_or_default();
        if articles.is_empty() {
            log::info!("[News] No articles found for country={}, category={}", country, category);
            return Ok(format!(
                "No news found for category ({}) in country ({}).",
                category, country
            ));
        }

        let headlines: Vec<String> = articles
            .iter()
            .enumerate()
            .map(|(i, article)| format!("{}. {}", i + 1, article["title"].as_str().unwrap_or("(untitled)")))
            .collect();

        log::info!("[News] Found {} articles", articles.len());
        Ok(format!(
            "Here are the top {} headlines:\n{}",
            articles.len(),
            headlines.join("\n")
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::http::test_http;
    use httpmock::prelude::*;
    use serde_json::json;

    #[test]
    fn test_defaults_when_no_arguments() {
        assert_eq!(resolve_query(&json!({})).unwrap(), ("in".to_string(), "general".to_string()));
    }

    #[test]
    fn test_arguments_are_normalized() {
        let query = resolve_query(&json!({"country": "US", "category": "Technology"})).unwrap();
        assert_eq!(query, ("us".to_string(), "technology".to_string()));
    }

    #[test]
    fn test_invalid_arguments_rejected() {
        assert!(resolve_query(&json!({"country": "india"})).is_err());
        assert!(resolve_query(&json!({"category": "politics"})).is_err());
    }

    #[tokio::test]
    async fn test_default_query_sent_upstream() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/v2/top-headlines")
                .query_param("country", "in")
                .query_param("category", "general")
                .query_param("pageSize", "5")
                .query_param("apiKey", "news_api_key-test");
            then.status(200).json_body(json!({
                "status": "ok",
                "articles": [{"title": "First headline"}, {"title": "Second headline"}]
            }));
        });

        let tool = NewsTool::new(test_http(&server.base_url()));
        let text = tool.execute(&json!({})).await.unwrap();

        mock.assert();
        assert_eq!(text, "Here are the top 2 headlines:\n1. First headline\n2. Second headline");
    }

    #[tokio::test]
    async fn test_empty_result_names_category_and_country() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/v2/top-headlines");
            then.status(200).json_body(json!({"status": "ok", "totalResults": 0, "articles": []}));
        });

        let tool = NewsTool::new(test_http(&server.base_url()));
        let text = tool
            .execute(&json!({"country": "us", "category": "science"}))
            .await
            .unwrap();

        assert_eq!(text, "No news found for category (science) in country (us).");
    }

    #[tokio::test]
    async fn test_upstream_error_status() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/v2/top-headlines");
            then.status(401).json_body(json!({
                "status": "error",
                "code": "apiKeyInvalid",
                "message": "Your API key is invalid."
            }));
        });

        let tool = NewsTool::new(test_http(&server.base_url()));
        let failure = tool.execute(&json!({})).await.unwrap_err();

        assert!(matches!(failure, ToolFailure::Upstream { status: Some(401), .. }));
        assert_eq!(failure.model_text(), "Error: Failed to fetch news: Your API key is invalid.");
    }

    #[tokio::test]
    async fn test_invalid_category_makes_no_request() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/v2/top-headlines");
            then.status(200).json_body(json!({"status": "ok", "articles": []}));
        });

        let tool = NewsTool::new(test_http(&server.base_url()));
        let failure = tool.execute(&json!({"category": "gossip"})).await.unwrap_err();

        assert!(matches!(failure, ToolFailure::InvalidInput { .. }));
        assert_eq!(mock.hits(), 0);
    }

    #[tokio::test]
    async fn test_transport_failure() {
        let tool = NewsTool::new(test_http("http://127.0.0.1:9"));
        let failure = tool.execute(&json!({})).await.unwrap_err();
        assert_eq!(failure.model_text(), CONNECT_FAILED);
    }
}
