//! Orchestration loop - mediates between the model and tool execution

mod turn_runner;

pub use turn_runner::{RunnerConfig, TurnReply, TurnRunner};
