//! Per-session conversational state
//!
//! A session is an append-only turn history plus a context-attribute map
//! that specialist agents grow as they learn facts about the student
//! (major, year, interests). Turns are never deleted or reordered;
//! attributes are only merged, never cleared by the engine. Retention and
//! expiry are external policy.

pub mod store;

pub use store::{FileSessionStore, MemorySessionStore, SessionStore};

use crate::category::Category;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One query/response exchange within a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnRecord {
    /// The student's question as received
    pub query: String,
    /// When the turn completed
    pub timestamp: DateTime<Utc>,
    /// Categories that contributed to the answer
    pub categories: Vec<Category>,
    /// Final synthesized answer text
    pub answer: String,
    /// All dispatched agents failed; answer is the fallback text
    #[serde(default)]
    pub failed: bool,
    /// Some dispatched agents failed but at least one succeeded
    #[serde(default)]
    pub partial: bool,
}

/// Mutable per-session state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Opaque identifier, unique per conversation
    pub id: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Ordered turn history, append-only
    pub turns: Vec<TurnRecord>,
    /// Context attributes accumulated by agents (major, year, interests)
    pub context: BTreeMap<String, String>,
}

impl Session {
    /// Create an empty session for the given identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            created_at: Utc::now(),
            turns: Vec::new(),
            context: BTreeMap::new(),
        }
    }

    /// Append a completed turn; history is append-only
    pub fn append_turn(&mut self, turn: TurnRecord) {
        self.turns.push(turn);
    }

    /// Merge new context attributes; existing keys are overwritten
    pub fn merge_context(&mut self, attrs: &BTreeMap<String, String>) {
        for (key, value) in attrs {
            self.context.insert(key.clone(), value.clone());
        }
    }

    /// Render context attributes for agent and router prompts
    ///
    /// `"major: Welding | year: Freshman"`, or a fixed placeholder when
    /// nothing is known yet.
    pub fn context_summary(&self) -> String {
        if self.context.is_empty() {
            return "No prior context".to_string();
        }

        self.context
            .iter()
            .map(|(k, v)| format!("{}: {}", k, v))
            .collect::<Vec<_>>()
            .join(" | ")
    }

    /// Render the last `n` turns for prompt context
    ///
    /// Answers are truncated per turn to keep prompts bounded.
    pub fn recent_history(&self, n: usize) -> String {
        if self.turns.is_empty() {
            return "No prior conversation".to_string();
        }

        let start = self.turns.len().saturating_sub(n);
        let mut lines = Vec::new();
        for turn in &self.turns[start..] {
            lines.push(format!("Student: {}", truncate(&turn.query, 200)));
            lines.push(format!("Advisor: {}", truncate(&turn.answer, 300)));
        }
        lines.join("\n")
    }

    /// Number of completed turns
    pub fn turn_count(&self) -> usize {
        self.turns.len()
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max).collect();
        format!("{}...", cut)
    }
}
