//! Toolchat - a conversational assistant with model-driven tool calling
//!
//! A user message goes to a hosted model together with a tool manifest. When
//! the model asks for tools, the orchestration loop runs them and feeds the
//! results back until the model produces a plain-text answer.

pub mod config;
pub mod error;
pub mod id;
pub mod llm;
pub mod runner;
pub mod server;
pub mod session;
pub mod tools;

pub use error::{ChatError, Result};
