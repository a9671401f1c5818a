//! Custom error types for agentflow
//!
//! Provides a unified error handling system across all modules. Every error
//! maps onto a [`FaultKind`], which is what a failed run reports to callers.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for workflow operations
#[derive(Error, Debug)]
pub enum FlowError {
    /// Malformed workflow definition
    #[error("Configuration error: {0}")]
    Config(String),

    /// An agent invoked a tool it does not declare
    #[error("Agent '{agent}' has no tool named '{tool}'")]
    UnknownTool { agent: String, tool: String },

    /// A transfer or route referenced an agent missing from the workflow
    #[error("No agent named '{0}' in this workflow")]
    UnknownAgent(String),

    /// Unexpected tool failure (bug, I/O, timeout)
    #[error("Tool '{tool}' failed: {message}")]
    Tool { tool: String, message: String },

    /// Classifier output matched no route and no fallback exists
    #[error("Router '{router}' could not route result '{result}'")]
    Routing { router: String, result: String },

    /// The decision procedure failed, timed out, or never reached a turn boundary
    #[error("Model binding for agent '{agent}' failed: {message}")]
    ModelBinding { agent: String, message: String },

    /// A sequential flow finished without its completion flag
    #[error("Workflow '{flow}' finished without setting '{key}'")]
    Incomplete { flow: String, key: String },

    /// One or more parallel branches failed
    #[error("Parallel flow '{flow}' had failing branches: {}", failed.join(", "))]
    Parallel {
        flow: String,
        failed: Vec<String>,
        #[source]
        first: Box<FlowError>,
    },

    /// Session lookup failed
    #[error("Session '{session_id}' not found for user '{user_id}'")]
    SessionNotFound { user_id: String, session_id: String },

    /// Session id already taken
    #[error("Session '{0}' already exists")]
    SessionExists(String),

    /// The event consumer went away
    #[error("Run cancelled")]
    Cancelled,

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error for other cases
    #[error("{0}")]
    Other(String),
}

/// Convenience Result type for workflow operations
pub type Result<T> = std::result::Result<T, FlowError>;

/// Coarse classification of a run failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    Configuration,
    Tool,
    Routing,
    ModelBinding,
    Incomplete,
    Cancelled,
    Internal,
}

impl std::fmt::Display for FaultKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FaultKind::Configuration => "configuration",
            FaultKind::Tool => "tool",
            FaultKind::Routing => "routing",
            FaultKind::ModelBinding => "model_binding",
            FaultKind::Incomplete => "incomplete",
            FaultKind::Cancelled => "cancelled",
            FaultKind::Internal => "internal",
        };
        write!(f, "{}", name)
    }
}

impl FlowError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a tool fault
    pub fn tool(tool: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Tool {
            tool: tool.into(),
            message: msg.into(),
        }
    }

    /// Create a model binding fault
    pub fn binding(agent: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::ModelBinding {
            agent: agent.into(),
            message: msg.into(),
        }
    }

    /// Fault classification reported on the run's terminal event
    pub fn kind(&self) -> FaultKind {
        match self {
            FlowError::Config(_) | FlowError::UnknownTool { .. } | FlowError::UnknownAgent(_) => {
                FaultKind::Configuration
            }
            FlowError::Tool { .. } => FaultKind::Tool,
            FlowError::Routing { .. } => FaultKind::Routing,
            FlowError::ModelBinding { .. } => FaultKind::ModelBinding,
            FlowError::Incomplete { .. } => FaultKind::Incomplete,
            FlowError::Parallel { first, .. } => first.kind(),
            FlowError::Cancelled => FaultKind::Cancelled,
            FlowError::SessionNotFound { .. }
            | FlowError::SessionExists(_)
            | FlowError::Json(_)
            | FlowError::Io(_)
            | FlowError::Other(_) => FaultKind::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(FlowError::config("dup").kind(), FaultKind::Configuration);
        assert_eq!(
            FlowError::UnknownTool {
                agent: "a".into(),
                tool: "t".into()
            }
            .kind(),
            FaultKind::Configuration
        );
        assert_eq!(FlowError::tool("t", "boom").kind(), FaultKind::Tool);
        assert_eq!(FlowError::Cancelled.kind(), FaultKind::Cancelled);
    }

    #[test]
    fn test_parallel_kind_follows_first_failure() {
        let err = FlowError::Parallel {
            flow: "fan".into(),
            failed: vec!["b".into()],
            first: Box::new(FlowError::tool("t", "boom")),
        };
        assert_eq!(err.kind(), FaultKind::Tool);
        assert!(err.to_string().contains("fan"));
        assert!(err.to_string().contains("b"));
    }
}
