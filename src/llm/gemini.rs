//! Gemini API client implementation
//!
//! Implements the LlmClient trait over the `generateContent` REST endpoint
//! with function calling enabled.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};

use crate::error::{ChatError, Result};
use crate::llm::client::LlmClient;
use crate::llm::types::{FunctionDeclaration, ModelReply, TokenUsage, ToolCall, Turn};

/// Gemini API base URL
const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default model to use
const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Persona and tool-usage guidance sent with every request
pub const DEFAULT_SYSTEM_INSTRUCTION: &str = r#"You are an expert AI assistant. Your role is to be a friendly Hinglish tutor.
You have access to tools for math, Bitcoin prices, weather, and news.
- For weather questions like 'Delhi mein mausam kaisa hai?', use the 'getWeather' function.
- For news questions like 'Bharat ki top business news batao', use the 'getTopHeadlines' function. Identify the country and category from the user's prompt. For 'US', use country code 'us'. For 'India', use 'in'.
IMPORTANT: After you receive the results from the tool(s), directly combine all information into a single, coherent response. Do not describe your process."#;

/// Configuration for the Gemini client
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
    pub system_instruction: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: GEMINI_API_URL.to_string(),
            timeout: Duration::from_secs(60),
            system_instruction: DEFAULT_SYSTEM_INSTRUCTION.to_string(),
        }
    }
}

impl GeminiConfig {
    /// Build from the `llm` section of the YAML config
    pub fn from_config(llm: &crate::config::LlmConfig) -> Self {
        Self {
            model: llm.model.clone(),
            base_url: llm.base_url.clone(),
            timeout: Duration::from_millis(llm.timeout_ms),
            system_instruction: llm
                .system_instruction
                .clone()
                .unwrap_or_else(|| DEFAULT_SYSTEM_INSTRUCTION.to_string()),
        }
    }
}

/// Gemini API client
pub struct GeminiClient {
    client: Client,
    api_key: String,
    config: GeminiConfig,
    usage: Arc<Mutex<TokenUsage>>,
}

impl GeminiClient {
    /// Create a client with an explicit API key
    pub fn new(api_key: impl Into<String>, config: GeminiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ChatError::Llm(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            config,
            usage: Arc::new(Mutex::new(TokenUsage::default())),
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    /// Build the request body for the generateContent API
    fn build_request(&self, history: &[Turn], tools: &[FunctionDeclaration]) -> Value {
        let contents: Vec<Value> = history.iter().map(turn_to_content).collect();

        let mut body = json!({ "contents": contents });

        if !self.config.system_instruction.is_empty() {
            body["systemInstruction"] = json!({
                "parts": [{ "text": self.config.system_instruction }]
            });
        }

        if !tools.is_empty() {
            body["tools"] = json!([{ "functionDeclarations": tools }]);
        }

        body
    }

    /// Parse the API response into a ModelReply
    fn parse_response(&self, body: Value) -> Result<ModelReply> {
        if let Some(meta) = body.get("usageMetadata") {
            let usage = TokenUsage::new(
                meta["promptTokenCount"].as_u64().unwrap_or(0),
                meta["candidatesTokenCount"].as_u64().unwrap_or(0),
            );
            let mut total = self.usage.lock().unwrap_or_else(|e| e.into_inner());
            total.add(&usage);
        }

        let candidate = match body["candidates"].as_array().and_then(|c| c.first()) {
            Some(candidate) => candidate,
            None => {
                let reason = body["promptFeedback"]["blockReason"].as_str();
                return Err(ChatError::Llm(match reason {
                    Some(reason) => format!("Model returned no candidates (blocked: {})", reason),
                    None => "Model returned no candidates".to_string(),
                }));
            }
        };

        let mut text = String::new();
        let mut calls = Vec::new();

        if let Some(parts) = candidate["content"]["parts"].as_array() {
            for part in parts {
                if let Some(call) = part.get("functionCall") {
                    let name = call["name"]
                        .as_str()
                        .ok_or_else(|| ChatError::Llm("Function call without a name".to_string()))?;
                    calls.push(ToolCall::new(name, call["args"].clone()));
                } else if let Some(fragment) = part["text"].as_str() {
                    text.push_str(fragment);
                }
            }
        }

        if !calls.is_empty() {
            if !text.is_empty() {
                log::debug!("Dropping text that accompanied {} function call(s)", calls.len());
            }
            return Ok(ModelReply::ToolCalls(calls));
        }

        match candidate["finishReason"].as_str() {
            Some(reason) if text.is_empty() && reason != "STOP" => Err(ChatError::Llm(format!(
                "Model stopped without an answer (finish reason: {})",
                reason
            ))),
            _ => Ok(ModelReply::Answer(text)),
        }
    }

    /// Send a request to the Gemini API
    async fn send_request(&self, body: Value) -> Result<Value> {
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChatError::Llm(format!("Request failed: {}", e)))?;

        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<Value>(&error_body)
                .ok()
                .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
                .unwrap_or(error_body);

            if status.as_u16() == 429 {
                return Err(ChatError::Llm(format!("Rate limited: {}", message)));
            }
            return Err(ChatError::Llm(format!("API error {}: {}", status, message)));
        }

        response
            .json()
            .await
            .map_err(|e| ChatError::Llm(format!("Failed to parse response: {}", e)))
    }

    /// Get cumulative token usage
    pub fn total_usage(&self) -> TokenUsage {
        *self.usage.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn turn_to_content(turn: &Turn) -> Value {
    match turn {
        Turn::User { text } => json!({ "role": "user", "parts": [{ "text": text }] }),
        Turn::ModelText { text } => json!({ "role": "model", "parts": [{ "text": text }] }),
        Turn::ToolRequests { calls } => {
            let parts: Vec<Value> = calls
                .iter()
                .map(|c| json!({ "functionCall": { "name": c.name, "args": c.args } }))
                .collect();
            json!({ "role": "model", "parts": parts })
        }
        Turn::ToolResults { results } => {
            let parts: Vec<Value> = results
                .iter()
                .map(|r| {
                    json!({
                        "functionResponse": {
                            "name": r.name,
                            "response": { "name": r.name, "content": r.content }
                        }
                    })
                })
                .collect();
            json!({ "role": "user", "parts": parts })
        }
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn generate(&self, history: &[Turn], tools: &[FunctionDeclaration]) -> Result<ModelReply> {
        let body = self.build_request(history, tools);
        let response = self.send_request(body).await?;
        let reply = self.parse_response(response)?;
        log::debug!("Gemini tokens used so far: {}", self.total_usage().total());
        Ok(reply)
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("model", &self.config.model)
            .field("base_url", &self.config.base_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::types::ToolResponse;
    use httpmock::prelude::*;

    fn client() -> GeminiClient {
        GeminiClient::new("test-key", GeminiConfig::default()).unwrap()
    }

    #[test]
    fn test_config_default() {
        let config = GeminiConfig::default();
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.base_url, GEMINI_API_URL);
        assert!(config.system_instruction.contains("getWeather"));
    }

    #[test]
    fn test_config_from_yaml_section_override_instruction() {
        let llm = crate::config::LlmConfig {
            system_instruction: Some("Be terse.".to_string()),
            ..Default::default()
        };
        let config = GeminiConfig::from_config(&llm);
        assert_eq!(config.system_instruction, "Be terse.");
        assert_eq!(config.timeout, Duration::from_millis(llm.timeout_ms));
    }

    #[test]
    fn test_build_request_maps_roles() {
        let history = vec![
            Turn::user("2 plus 2"),
            Turn::ToolRequests {
                calls: vec![ToolCall::new("add", json!({"a": 2, "b": 2}))],
            },
            Turn::ToolResults {
                results: vec![ToolResponse::new("add", "4")],
            },
            Turn::model_text("2 + 2 = 4"),
        ];

        let body = client().build_request(&history, &[]);
        let contents = body["contents"].as_array().unwrap();

        assert_eq!(contents.len(), 4);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[0]["parts"][0]["text"], "2 plus 2");
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[1]["parts"][0]["functionCall"]["name"], "add");
        assert_eq!(contents[1]["parts"][0]["functionCall"]["args"]["a"], 2);
        assert_eq!(contents[2]["role"], "user");
        assert_eq!(contents[2]["parts"][0]["functionResponse"]["name"], "add");
        assert_eq!(contents[2]["parts"][0]["functionResponse"]["response"]["content"], "4");
        assert_eq!(contents[3]["role"], "model");
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn test_build_request_batches_tool_results_in_one_content() {
        let history = vec![Turn::ToolResults {
            results: vec![ToolResponse::new("add", "4"), ToolResponse::new("getBitcoinPrice", "price")],
        }];
        let body = client().build_request(&history, &[]);
        assert_eq!(body["contents"].as_array().unwrap().len(), 1);
        assert_eq!(body["contents"][0]["parts"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_build_request_with_tools_and_instruction() {
        let decl = FunctionDeclaration {
            name: "add".to_string(),
            description: "Adds two numbers.".to_string(),
            parameters: json!({"type": "OBJECT", "properties": {}}),
        };
        let body = client().build_request(&[Turn::user("hi")], &[decl]);

        assert_eq!(body["tools"][0]["functionDeclarations"][0]["name"], "add");
        assert!(
            body["systemInstruction"]["parts"][0]["text"]
                .as_str()
                .unwrap()
                .contains("Hinglish")
        );
    }

    #[test]
    fn test_parse_response_text_only() {
        let reply = client()
            .parse_response(json!({
                "candidates": [{
                    "content": { "role": "model", "parts": [{ "text": "Namaste! " }, { "text": "Kaise ho?" }] },
                    "finishReason": "STOP"
                }],
                "usageMetadata": { "promptTokenCount": 10, "candidatesTokenCount": 5 }
            }))
            .unwrap();

        assert_eq!(reply, ModelReply::Answer("Namaste! Kaise ho?".to_string()));
    }

    #[test]
    fn test_parse_response_function_calls_win_over_text() {
        let reply = client()
            .parse_response(json!({
                "candidates": [{
                    "content": { "role": "model", "parts": [
                        { "text": "Let me check" },
                        { "functionCall": { "name": "getWeather", "args": { "location": "Delhi" } } },
                        { "functionCall": { "name": "getBitcoinPrice" } }
                    ]}
                }]
            }))
            .unwrap();

        match reply {
            ModelReply::ToolCalls(calls) => {
                assert_eq!(calls.len(), 2);
                assert_eq!(calls[0].name, "getWeather");
                assert_eq!(calls[0].args["location"], "Delhi");
                assert_eq!(calls[1].args, json!({}));
            }
            other => panic!("expected tool calls, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_response_blocked_prompt() {
        let err = client()
            .parse_response(json!({ "promptFeedback": { "blockReason": "SAFETY" } }))
            .unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn test_parse_response_empty_non_stop_finish() {
        let err = client()
            .parse_response(json!({ "candidates": [{ "finishReason": "SAFETY" }] }))
            .unwrap_err();
        assert!(err.to_string().contains("finish reason: SAFETY"));
    }

    #[test]
    fn test_usage_accumulates() {
        let client = client();
        let response = json!({
            "candidates": [{ "content": { "parts": [{ "text": "ok" }] }, "finishReason": "STOP" }],
            "usageMetadata": { "promptTokenCount": 100, "candidatesTokenCount": 50 }
        });
        client.parse_response(response.clone()).unwrap();
        client.parse_response(response).unwrap();

        let total = client.total_usage();
        assert_eq!(total.prompt_tokens, 200);
        assert_eq!(total.output_tokens, 100);
    }

    #[test]
    fn test_debug_impl_hides_key() {
        let debug_str = format!("{:?}", client());
        assert!(debug_str.contains("GeminiClient"));
        assert!(debug_str.contains(DEFAULT_MODEL));
        assert!(!debug_str.contains("test-key"));
    }

    #[test]
    fn test_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<GeminiClient>();
    }

    #[tokio::test]
    async fn test_generate_against_mock_server() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/models/test-model:generateContent")
                .header("x-goog-api-key", "test-key");
            then.status(200).json_body(json!({
                "candidates": [{ "content": { "parts": [{ "text": "4" }] }, "finishReason": "STOP" }]
            }));
        });

        let config = GeminiConfig {
            model: "test-model".to_string(),
            base_url: server.base_url(),
            ..Default::default()
        };
        let client = GeminiClient::new("test-key", config).unwrap();
        let reply = client.generate(&[Turn::user("2+2")], &[]).await.unwrap();

        mock.assert();
        assert_eq!(reply, ModelReply::Answer("4".to_string()));
    }

    #[tokio::test]
    async fn test_generate_surfaces_upstream_error_message() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/models/test-model:generateContent");
            then.status(400)
                .json_body(json!({ "error": { "code": 400, "message": "API key not valid" } }));
        });

        let config = GeminiConfig {
            model: "test-model".to_string(),
            base_url: server.base_url(),
            ..Default::default()
        };
        let client = GeminiClient::new("bad", config).unwrap();
        let err = client.generate(&[Turn::user("hi")], &[]).await.unwrap_err();

        assert!(matches!(err, ChatError::Llm(_)));
        assert!(err.to_string().contains("API key not valid"));
    }
}
