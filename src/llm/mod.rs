//! LLM Client Layer - Gemini function-calling integration
//!
//! This module provides:
//! - Dialogue types shared with the session store
//! - LlmClient trait for API abstraction
//! - GeminiClient implementation
//! - MockLlmClient for tests

pub mod client;
pub mod gemini;
pub mod types;

pub use client::{LlmClient, MockLlmClient};
pub use gemini::{DEFAULT_SYSTEM_INSTRUCTION, GeminiClient, GeminiConfig};
pub use types::{FunctionDeclaration, ModelReply, TokenUsage, ToolCall, ToolResponse, Turn};
