//! Core LLM client trait and a scripted mock for tests

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::types::{FunctionDeclaration, ModelReply, Turn};
use crate::error::{ChatError, Result};

/// A chat model that can request tool calls
///
/// Each call receives the full dialogue so far; the client keeps no conversation state.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Submit the history (ending with a user message or a batch of tool results)
    async fn generate(&self, history: &[Turn], tools: &[FunctionDeclaration]) -> Result<ModelReply>;

    /// Model identifier, for logging and health output
    fn model(&self) -> &str;
}

/// Scripted client: replies are returned in order and every request is recorded
#[derive(Debug, Default)]
pub struct MockLlmClient {
    script: Mutex<VecDeque<std::result::Result<ModelReply, String>>>,
    requests: Mutex<Vec<Vec<Turn>>>,
}

impl MockLlmClient {
    pub fn new(replies: Vec<ModelReply>) -> Self {
        Self {
            script: Mutex::new(replies.into_iter().map(Ok).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a reply
    pub fn push_reply(&self, reply: ModelReply) {
        self.lock_script().push_back(Ok(reply));
    }

    /// Queue a communication failure
    pub fn push_error(&self, message: impl Into<String>) {
        self.lock_script().push_back(Err(message.into()));
    }

    /// Histories received so far, one per `generate` call
    pub fn requests(&self) -> Vec<Vec<Turn>> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn lock_script(&self) -> std::sync::MutexGuard<'_, VecDeque<std::result::Result<ModelReply, String>>> {
        self.script.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn generate(&self, history: &[Turn], _tools: &[FunctionDeclaration]) -> Result<ModelReply> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(history.to_vec());

        match self.lock_script().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(ChatError::Llm(message)),
            None => Err(ChatError::Llm("mock script exhausted".to_string())),
        }
    }

    fn model(&self) -> &str {
        "mock-model"
    }
}
