//! Conversation Store - per-key dialogue state
//!
//! Each session sits behind its own async mutex. The orchestration loop holds
//! that lock for a whole turn, so turns for one key are applied strictly in
//! the order they acquire it while different keys proceed independently.

mod store;

pub use store::{SessionHandle, SessionStore};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::llm::Turn;

/// One conversation thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    /// Append-only dialogue; only complete turns are ever committed
    pub history: Vec<Turn>,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
    pub turns_completed: u64,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            history: Vec::new(),
            created_at: now,
            last_active: now,
            turns_completed: 0,
        }
    }

    /// Append every turn produced while answering one user message
    pub fn commit_turn(&mut self, turns: Vec<Turn>) {
        debug_assert!(turns.first().is_some_and(Turn::is_user));
        self.history.extend(turns);
        self.turns_completed += 1;
        self.last_active = Utc::now();
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}
