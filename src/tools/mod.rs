//! Tool System - descriptors, the Tool trait, and the executors the model may call
//!
//! Tool identity is a closed enum; the only way a name can fail to resolve is
//! the model asking for something that was never advertised.

mod arithmetic;
pub(crate) mod http;
mod news;
mod price;
mod registry;
mod weather;

pub use arithmetic::{ArithmeticOp, ArithmeticTool};
pub use http::ToolHttp;
pub use news::{NEWS_CATEGORIES, NewsTool};
pub use price::PriceTool;
pub use registry::ToolRegistry;
pub use weather::WeatherTool;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value, json};

use crate::error::ChatError;
use crate::llm::FunctionDeclaration;

/// Every tool the assistant can run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ToolName {
    Add,
    Subtract,
    Multiply,
    Divide,
    GetBitcoinPrice,
    GetWeather,
    GetTopHeadlines,
}

impl ToolName {
    /// All tools, in manifest order
    pub const ALL: [ToolName; 7] = [
        ToolName::Add,
        ToolName::Subtract,
        ToolName::Multiply,
        ToolName::Divide,
        ToolName::GetBitcoinPrice,
        ToolName::GetWeather,
        ToolName::GetTopHeadlines,
    ];

    /// Name as advertised to the model
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::Add => "add",
            ToolName::Subtract => "subtract",
            ToolName::Multiply => "multiply",
            ToolName::Divide => "divide",
            ToolName::GetBitcoinPrice => "getBitcoinPrice",
            ToolName::GetWeather => "getWeather",
            ToolName::GetTopHeadlines => "getTopHeadlines",
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = ChatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ToolName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| ChatError::UnknownTool(s.to_string()))
    }
}

/// Primitive parameter types the model can supply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Number,
    String,
}

impl ParamKind {
    fn schema_type(&self) -> &'static str {
        match self {
            ParamKind::Number => "NUMBER",
            ParamKind::String => "STRING",
        }
    }
}

/// One declared parameter of a tool
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
    pub description: Option<&'static str>,
}

impl ParamSpec {
    pub fn required(name: &'static str, kind: ParamKind) -> Self {
        Self {
            name,
            kind,
            required: true,
            description: None,
        }
    }

    pub fn optional(name: &'static str, kind: ParamKind) -> Self {
        Self {
            name,
            kind,
            required: false,
            description: None,
        }
    }

    pub fn with_description(mut self, description: &'static str) -> Self {
        self.description = Some(description);
        self
    }
}

/// Name, description and parameter schema of a tool
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDescriptor {
    pub name: ToolName,
    pub description: &'static str,
    pub params: Vec<ParamSpec>,
}

impl ToolDescriptor {
    /// Schema advertised to the model
    pub fn declaration(&self) -> FunctionDeclaration {
        let mut properties = Map::new();
        for param in &self.params {
            let mut schema = json!({ "type": param.kind.schema_type() });
            if let Some(description) = param.description {
                schema["description"] = json!(description);
            }
            properties.insert(param.name.to_string(), schema);
        }

        let mut parameters = json!({ "type": "OBJECT", "properties": properties });
        let required: Vec<&str> = self.params.iter().filter(|p| p.required).map(|p| p.name).collect();
        if !required.is_empty() {
            parameters["required"] = json!(required);
        }

        FunctionDeclaration {
            name: self.name.as_str().to_string(),
            description: self.description.to_string(),
            parameters,
        }
    }
}

/// Why a tool could not produce its normal result
///
/// Every variant still carries the text the model is shown, so a failure is
/// never fatal to the turn.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ToolFailure {
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    #[error("transport failure: {detail}")]
    Transport { message: String, detail: String },

    #[error("upstream error (status {status:?}): {message}")]
    Upstream { message: String, status: Option<u16> },

    #[error("timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
}

impl ToolFailure {
    pub fn invalid(message: impl Into<String>) -> Self {
        ToolFailure::InvalidInput {
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>, detail: impl fmt::Display) -> Self {
        ToolFailure::Transport {
            message: message.into(),
            detail: detail.to_string(),
        }
    }

    pub fn upstream(message: impl Into<String>, status: Option<u16>) -> Self {
        ToolFailure::Upstream {
            message: message.into(),
            status,
        }
    }

    /// Natural-language text handed to the model in place of a result
    pub fn model_text(&self) -> String {
        match self {
            ToolFailure::InvalidInput { message }
            | ToolFailure::Transport { message, .. }
            | ToolFailure::Upstream { message, .. } => message.clone(),
            ToolFailure::Timeout(after) => format!(
                "Error: The service took too long to respond (over {} seconds).",
                after.as_secs_f64()
            ),
        }
    }
}

/// Result of a single tool execution
pub type ToolOutcome = Result<String, ToolFailure>;

/// A tool that can be called by the model
#[async_trait]
pub trait Tool: Send + Sync {
    fn descriptor(&self) -> ToolDescriptor;

    /// Run with the model-supplied arguments; failures come back as `ToolFailure`, never panics
    async fn execute(&self, args: &Value) -> ToolOutcome;
}

/// Read a numeric argument; numeric strings are accepted since models sometimes quote numbers
pub(crate) fn number_arg(args: &Value, name: &str) -> Result<f64, ToolFailure> {
    let value = match &args[name] {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    value
        .filter(|v| v.is_finite())
        .ok_or_else(|| ToolFailure::invalid(format!("Error: argument '{}' must be a number.", name)))
}

/// Read an optional string argument, treating blank as absent
pub(crate) fn string_arg<'a>(args: &'a Value, name: &str) -> Option<&'a str> {
    args[name].as_str().map(str::trim).filter(|s| !s.is_empty())
}
