//! Shared types used across agentflow modules
//!
//! Contains message structures, tool definitions, and tool results.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A message in a rendered conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender (user, assistant, tool)
    pub role: String,
    /// Content of the message
    pub content: String,
    /// Agent or tool that produced the message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Message {
    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
            name: None,
        }
    }

    /// Create a new assistant message attributed to an agent
    pub fn assistant(agent: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
            name: Some(agent.into()),
        }
    }

    /// Create a new tool message
    pub fn tool(tool: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: "tool".to_string(),
            content: content.into(),
            name: Some(tool.into()),
        }
    }
}

/// A tool call requested by a decision procedure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Name of the tool to invoke
    pub name: String,
    /// JSON arguments for the tool
    pub arguments: Value,
}

impl ToolCall {
    /// Create a new tool call
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }

    /// Get a string argument by key
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.arguments
            .get(key)
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
    }

    /// Get a boolean argument by key
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.arguments.get(key).and_then(|v| v.as_bool())
    }
}

/// Definition of a tool that can be offered to a decision procedure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Type of tool (always "function" for now)
    #[serde(rename = "type")]
    pub tool_type: String,
    /// Function details
    pub function: FunctionDefinition,
}

/// Function definition within a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    /// Name of the function
    pub name: String,
    /// Description of what the function does
    pub description: String,
    /// JSON Schema for the parameters
    pub parameters: Value,
}

impl ToolDefinition {
    /// Create a new function tool definition
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
    ) -> Self {
        Self {
            tool_type: "function".to_string(),
            function: FunctionDefinition {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }

    /// Tool name
    pub fn name(&self) -> &str {
        &self.function.name
    }
}

/// Outcome reported by a tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    Success,
    Error,
}

/// Result of executing a tool
///
/// Serialises flat: `{"status": "success", ...data}`. A `status` of `error`
/// is an expected domain failure and is handed back to the agent; it never
/// aborts a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Whether the tool succeeded in its own terms
    pub status: ToolStatus,
    /// Structured payload
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

impl ToolResult {
    /// Create a successful result with no payload
    pub fn success() -> Self {
        Self {
            status: ToolStatus::Success,
            data: Map::new(),
        }
    }

    /// Create a failed result carrying an `error_message`
    pub fn error(message: impl Into<String>) -> Self {
        let mut data = Map::new();
        data.insert("error_message".to_string(), Value::String(message.into()));
        Self {
            status: ToolStatus::Error,
            data,
        }
    }

    /// Add a payload field
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Whether the tool reported success
    pub fn is_success(&self) -> bool {
        self.status == ToolStatus::Success
    }

    /// Look up a payload field
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Serialise to a JSON value
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_result_serialises_flat() {
        let result = ToolResult::success().with("message", "done");
        assert_eq!(result.to_value(), json!({"status": "success", "message": "done"}));
    }

    #[test]
    fn test_tool_result_error() {
        let result = ToolResult::error("no data for 'Paris'");
        assert!(!result.is_success());
        assert_eq!(
            result.get("error_message"),
            Some(&json!("no data for 'Paris'"))
        );
        let parsed: ToolResult =
            serde_json::from_value(json!({"status": "error", "error_message": "x"})).unwrap();
        assert_eq!(parsed.status, ToolStatus::Error);
    }

    #[test]
    fn test_tool_call_args() {
        let call = ToolCall::new("get_weather", json!({"city": "London", "metric": true}));
        assert_eq!(call.get_string("city").as_deref(), Some("London"));
        assert_eq!(call.get_bool("metric"), Some(true));
        assert!(call.get_string("missing").is_none());
    }
}
