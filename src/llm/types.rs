//! Dialogue types shared by the orchestration loop and model clients
//!
//! These are provider-neutral; `gemini.rs` maps them onto the wire format.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One entry in a session's dialogue history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Turn {
    /// Text typed by the user
    User { text: String },
    /// Final natural-language answer from the model
    ModelText { text: String },
    /// Tool invocations the model asked for in one round
    ToolRequests { calls: Vec<ToolCall> },
    /// Results for every request of the preceding round, batched
    ToolResults { results: Vec<ToolResponse> },
}

impl Turn {
    /// Create a user turn
    pub fn user(text: impl Into<String>) -> Self {
        Turn::User { text: text.into() }
    }

    /// Create a model answer turn
    pub fn model_text(text: impl Into<String>) -> Self {
        Turn::ModelText { text: text.into() }
    }

    pub fn is_user(&self) -> bool {
        matches!(self, Turn::User { .. })
    }
}

/// A tool call requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    #[serde(default = "empty_args")]
    pub args: Value,
}

fn empty_args() -> Value {
    Value::Object(Default::default())
}

impl ToolCall {
    /// Create a new tool call
    pub fn new(name: impl Into<String>, args: Value) -> Self {
        Self {
            name: name.into(),
            args: if args.is_null() { empty_args() } else { args },
        }
    }
}

/// Text result of one tool call, paired with the originating tool name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResponse {
    pub name: String,
    pub content: String,
}

impl ToolResponse {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// Tool declaration advertised to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// What the model produced for one request: an answer or tool calls, never both
#[derive(Debug, Clone, PartialEq)]
pub enum ModelReply {
    Answer(String),
    ToolCalls(Vec<ToolCall>),
}

/// Token usage statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub output_tokens: u64,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u64, output_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            output_tokens,
        }
    }

    /// Calculate total tokens
    pub fn total(&self) -> u64 {
        self.prompt_tokens + self.output_tokens
    }

    /// Accumulate usage from another instance
    pub fn add(&mut self, other: &TokenUsage) {
        self.prompt_tokens += other.prompt_tokens;
        self.output_tokens += other.output_tokens;
    }
}
