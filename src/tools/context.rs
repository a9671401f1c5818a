//! Transactional state handle given to tools
//!
//! Reads see the session state plus the tool's own pending writes. Writes are
//! buffered and only reach the store when the invocation succeeds; a faulting
//! tool leaves the state untouched.

use serde_json::Value;

use crate::state::{StateDelta, StateSnapshot, StateStore};

/// State access for one tool invocation
#[derive(Debug)]
pub struct ToolContext {
    agent: String,
    tool: String,
    state: StateStore,
    pending: StateDelta,
}

impl ToolContext {
    pub fn new(agent: impl Into<String>, tool: impl Into<String>, state: StateStore) -> Self {
        Self {
            agent: agent.into(),
            tool: tool.into(),
            state,
            pending: StateDelta::new(),
        }
    }

    /// Agent that invoked the tool
    pub fn agent(&self) -> &str {
        &self.agent
    }

    /// Name of the running tool
    pub fn tool(&self) -> &str {
        &self.tool
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.pending
            .get(key)
            .cloned()
            .or_else(|| self.state.get(key))
    }

    pub fn get_or(&self, key: &str, default: impl Into<Value>) -> Value {
        self.get(key).unwrap_or_else(|| default.into())
    }

    pub fn get_str(&self, key: &str) -> Option<String> {
        self.get(key).and_then(|v| v.as_str().map(str::to_string))
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.pending.set(key, value);
    }

    /// Committed state as of now, without pending writes
    pub fn snapshot(&self) -> StateSnapshot {
        self.state.snapshot()
    }

    pub fn pending(&self) -> &StateDelta {
        &self.pending
    }

    /// Apply pending writes to the store and return them
    pub fn commit(self) -> StateDelta {
        self.state.apply(&self.pending);
        self.pending
    }

    /// Drop pending writes
    pub fn discard(self) {}
}
