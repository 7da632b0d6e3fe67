//! TurnRunner - drives one user message to a final answer
//!
//! States per message: AwaitingModel -> (ToolsRequested -> ExecutingTools ->
//! AwaitingModel)* -> Done. Work happens on a copy of the session history and
//! is committed only when the model produces its answer.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;

use crate::config::Config;
use crate::error::{ChatError, Result};
use crate::id::generate_turn_id;
use crate::llm::{FunctionDeclaration, LlmClient, ModelReply, ToolCall, ToolResponse, Turn};
use crate::session::SessionStore;
use crate::tools::{ToolFailure, ToolRegistry};

/// Limits applied to every turn
#[derive(Debug, Clone, PartialEq)]
pub struct RunnerConfig {
    /// Model round-trips allowed before the turn fails
    pub max_rounds: u32,
    pub turn_timeout: Duration,
    /// Per tool call
    pub tool_timeout: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_rounds: 5,
            turn_timeout: Duration::from_secs(120),
            tool_timeout: Duration::from_secs(15),
        }
    }
}

impl RunnerConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_rounds: config.llm.max_tool_rounds.max(1),
            turn_timeout: Duration::from_millis(config.llm.turn_timeout_ms),
            tool_timeout: Duration::from_millis(config.tools.timeout_ms),
        }
    }
}

/// Final answer for one user message
#[derive(Debug, Clone, PartialEq)]
pub struct TurnReply {
    pub turn_id: String,
    pub text: String,
    /// Model round-trips used, including the one that answered
    pub rounds: u32,
    /// Every tool executed, in request order
    pub tools_used: Vec<String>,
}

/// The orchestration loop; the session store is injected, never ambient
pub struct TurnRunner<L: LlmClient> {
    llm: Arc<L>,
    registry: Arc<ToolRegistry>,
    sessions: Arc<SessionStore>,
    declarations: Vec<FunctionDeclaration>,
    config: RunnerConfig,
}

impl<L: LlmClient> TurnRunner<L> {
    pub fn new(llm: Arc<L>, registry: Arc<ToolRegistry>, sessions: Arc<SessionStore>) -> Self {
        Self::with_config(llm, registry, sessions, RunnerConfig::default())
    }

    pub fn with_config(
        llm: Arc<L>,
        registry: Arc<ToolRegistry>,
        sessions: Arc<SessionStore>,
        config: RunnerConfig,
    ) -> Self {
        let declarations = registry.declarations();
        Self {
            llm,
            registry,
            sessions,
            declarations,
            config,
        }
    }

    pub fn model(&self) -> &str {
        self.llm.model()
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Tool manifest advertised to the model on every request
    pub fn declarations(&self) -> &[FunctionDeclaration] {
        &self.declarations
    }

    /// Answer `message` within the session `session_key`
    ///
    /// The session lock is held for the whole turn, and waiting for it counts
    /// against the turn timeout. On any error the session is left exactly as
    /// it was before the call; a session this turn created is forgotten again.
    pub async fn run_turn(&self, session_key: &str, message: &str) -> Result<TurnReply> {
        let message = message.trim();
        if message.is_empty() {
            return Err(ChatError::InvalidRequest("Message is required.".to_string()));
        }

        let turn_id = generate_turn_id();
        let deadline = tokio::time::Instant::now() + self.config.turn_timeout;
        let handle = self.sessions.get_or_create(session_key).await;
        let Ok(mut session) = tokio::time::timeout_at(deadline, handle.lock()).await else {
            let err = self.turn_timeout_error();
            log::error!(
                "[{}] Turn failed waiting for session '{}': {}",
                turn_id,
                session_key,
                err
            );
            return Err(err);
        };
        log::info!(
            "[{}] Turn started for session '{}' ({} prior entries)",
            turn_id,
            session_key,
            session.history.len()
        );

        let started = Instant::now();
        let outcome = match tokio::time::timeout_at(deadline, self.drive(&turn_id, &session.history, message)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(self.turn_timeout_error()),
        };
        handle.touch();

        match outcome {
            Ok((turns, reply)) => {
                session.commit_turn(turns);
                log::info!(
                    "[{}] Turn complete in {:?}: {} round(s), tools: [{}]",
                    turn_id,
                    started.elapsed(),
                    reply.rounds,
                    reply.tools_used.join(", ")
                );
                Ok(reply)
            }
            Err(e) => {
                log::error!("[{}] Turn failed: {}", turn_id, e);
                if session.is_empty() {
                    self.sessions.discard_if_unused(session_key, &handle).await;
                }
                Err(e)
            }
        }
    }

    fn turn_timeout_error(&self) -> ChatError {
        ChatError::Timeout(format!(
            "no answer within {} seconds",
            self.config.turn_timeout.as_secs_f64()
        ))
    }

    /// Run model rounds until an answer; returns the new dialogue entries and the reply
    async fn drive(&self, turn_id: &str, history: &[Turn], message: &str) -> Result<(Vec<Turn>, TurnReply)> {
        let mut dialogue = history.to_vec();
        let committed = dialogue.len();
        dialogue.push(Turn::user(message));

        let mut tools_used = Vec::new();

        for round in 1..=self.config.max_rounds {
            log::debug!("[{}] Round {}: awaiting model", turn_id, round);

            match self.llm.generate(&dialogue, &self.declarations).await? {
                ModelReply::Answer(text) => {
                    dialogue.push(Turn::model_text(text.clone()));
                    let turns = dialogue.split_off(committed);
                    let reply = TurnReply {
                        turn_id: turn_id.to_string(),
                        text,
                        rounds: round,
                        tools_used,
                    };
                    return Ok((turns, reply));
                }
                ModelReply::ToolCalls(calls) => {
                    if calls.is_empty() {
                        return Err(ChatError::Llm("model returned an empty tool call list".to_string()));
                    }
                    if round == self.config.max_rounds {
                        log::warn!(
                            "[{}] Round limit reached, {} requested tool call(s) not run",
                            turn_id,
                            calls.len()
                        );
                        return Err(ChatError::RoundLimitExceeded(self.config.max_rounds));
                    }
                    let results = self.execute_round(turn_id, round, &calls).await?;
                    tools_used.extend(calls.iter().map(|call| call.name.clone()));
                    dialogue.push(Turn::ToolRequests { calls });
                    dialogue.push(Turn::ToolResults { results });
                }
            }
        }

        Err(ChatError::RoundLimitExceeded(self.config.max_rounds))
    }

    /// Execute every call of one round concurrently and collect all results
    ///
    /// Names are resolved before anything runs, so an unknown tool fails the
    /// round without side effects.
    async fn execute_round(&self, turn_id: &str, round: u32, calls: &[ToolCall]) -> Result<Vec<ToolResponse>> {
        let resolved = calls
            .iter()
            .map(|call| {
                self.registry
                    .lookup(&call.name)
                    .map(|tool| (call, tool))
                    .ok_or_else(|| ChatError::UnknownTool(call.name.clone()))
            })
            .collect::<Result<Vec<_>>>()?;

        log::info!("[{}] Round {}: executing {} tool call(s)", turn_id, round, resolved.len());

        let tool_timeout = self.config.tool_timeout;
        let executions = resolved.into_iter().map(|(call, tool)| {
            let call = call.clone();
            let turn_id = turn_id.to_string();
            async move {
                log::debug!("[{}] Calling {} with {}", turn_id, call.name, call.args);

                let outcome = match tokio::time::timeout(tool_timeout, tool.execute(&call.args)).await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(ToolFailure::Timeout(tool_timeout)),
                };

                let content = match outcome {
                    Ok(text) => text,
                    Err(failure) => {
                        log::warn!("[{}] Tool {} failed: {}", turn_id, call.name, failure);
                        failure.model_text()
                    }
                };
                ToolResponse::new(call.name, content)
            }
        });

        Ok(join_all(executions).await)
    }
}
