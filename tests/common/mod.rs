//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use httpmock::prelude::*;
use serde_json::{Value, json};
use toolchat::config::{Secrets, ToolsConfig};
use toolchat::llm::MockLlmClient;
use toolchat::runner::TurnRunner;
use toolchat::session::SessionStore;
use toolchat::tools::{ToolHttp, ToolRegistry};

/// Tool HTTP context whose endpoints all live on `server`
pub fn tool_http(server: &MockServer) -> Arc<ToolHttp> {
    let config = ToolsConfig {
        timeout_ms: 5_000,
        price_url: server.url("/api/v3/simple/price"),
        weather_url: server.url("/v1/current.json"),
        news_url: server.url("/v2/top-headlines"),
        ..Default::default()
    };
    let secrets = Secrets::from_lookup(|key| Some(format!("{}-test", key))).unwrap();
    Arc::new(ToolHttp::new(&config, &secrets).unwrap())
}

/// Runner with the standard registry wired to `server` and the given scripted model
pub fn runner(server: &MockServer, llm: MockLlmClient) -> (Arc<MockLlmClient>, Arc<TurnRunner<MockLlmClient>>) {
    let llm = Arc::new(llm);
    let registry = ToolRegistry::standard(tool_http(server));
    registry.verify().unwrap();
    let sessions = Arc::new(SessionStore::new(Duration::from_secs(600)));
    let runner = Arc::new(TurnRunner::new(llm.clone(), Arc::new(registry), sessions));
    (llm, runner)
}

pub fn weather_body(name: &str) -> Value {
    json!({
        "location": { "name": name, "country": "India" },
        "current": { "temp_c": 29.0, "humidity": 70, "condition": { "text": "Mist" } }
    })
}
