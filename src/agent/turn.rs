//! Agent turn state
//!
//! Tracks the decision steps of one agent turn and the observations collected
//! from its tool calls.

use serde::{Deserialize, Serialize};

use crate::core::ToolResult;

/// State of one agent turn
#[derive(Debug, Clone)]
pub struct TurnState {
    /// Current decision step (0-indexed)
    pub step: usize,
    /// Maximum decisions before the turn is abandoned
    pub max_steps: usize,
    /// Tool observations gathered this turn
    pub observations: Vec<Observation>,
}

impl TurnState {
    /// Create a new turn state with the given step limit
    pub fn new(max_steps: usize) -> Self {
        Self {
            step: 0,
            max_steps,
            observations: Vec::new(),
        }
    }

    /// Check if another decision may be taken
    pub fn should_continue(&self) -> bool {
        self.step < self.max_steps
    }

    pub fn add_observation(&mut self, observation: Observation) {
        self.observations.push(observation);
    }

    /// Increment the step counter
    pub fn next_step(&mut self) {
        self.step += 1;
    }
}

/// What an agent learned from one tool call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Name of the tool that produced this observation
    pub tool_name: String,
    /// Whether the tool reported success
    pub success: bool,
    /// Serialised tool result
    pub output: String,
    /// Structured tool result
    pub result: ToolResult,
}

impl Observation {
    pub fn new(tool_name: impl Into<String>, result: ToolResult) -> Self {
        Self {
            tool_name: tool_name.into(),
            success: result.is_success(),
            output: result.to_value().to_string(),
            result,
        }
    }
}
