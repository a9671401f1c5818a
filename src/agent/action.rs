//! Decisions a model binding can return

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::ToolCall;

/// What an agent does next
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// End the turn with text
    EmitText { text: String },
    /// Call one of the agent's tools, then decide again
    InvokeTool(ToolCall),
    /// Hand control to another agent of the workflow
    TransferTo { agent: String },
}

impl Action {
    pub fn text(text: impl Into<String>) -> Self {
        Self::EmitText { text: text.into() }
    }

    pub fn tool(name: impl Into<String>, args: Value) -> Self {
        Self::InvokeTool(ToolCall::new(name, args))
    }

    pub fn transfer(agent: impl Into<String>) -> Self {
        Self::TransferTo {
            agent: agent.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tagged_serialisation() {
        assert_eq!(
            serde_json::to_value(Action::text("hi")).unwrap(),
            json!({"type": "emit_text", "text": "hi"})
        );
        assert_eq!(
            serde_json::to_value(Action::tool("get_weather", json!({"city": "London"}))).unwrap(),
            json!({"type": "invoke_tool", "name": "get_weather", "arguments": {"city": "London"}})
        );
        let parsed: Action =
            serde_json::from_value(json!({"type": "transfer_to", "agent": "LeftAgent"})).unwrap();
        assert_eq!(parsed, Action::transfer("LeftAgent"));
    }
}
