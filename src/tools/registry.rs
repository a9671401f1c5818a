//! Tool registry - manages and dispatches tool calls
//!
//! Each agent owns a registry of the tools it declares. A shared registry can
//! also act as a catalogue that agents pick tools from by name.

use std::collections::HashMap;
use std::time::Duration;

use crate::core::{FlowError, Result, ToolCall, ToolDefinition, ToolResult};
use crate::tools::builtin;
use crate::tools::context::ToolContext;
use crate::tools::tool::Tool;

/// Registry of available tools
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    /// Tools indexed by name
    tools: HashMap<String, Tool>,
    /// Registration order, for stable definition listings
    order: Vec<String>,
}

impl ToolRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in tools
    pub fn with_builtins() -> Result<Self> {
        let mut registry = Self::new();
        for tool in builtin::all() {
            registry.register(tool)?;
        }
        Ok(registry)
    }

    /// Register a tool; names must be unique
    pub fn register(&mut self, tool: Tool) -> Result<()> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(FlowError::config(format!(
                "Tool '{}' registered twice",
                name
            )));
        }
        self.order.push(name.clone());
        self.tools.insert(name, tool);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.tools.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Tool names in registration order
    pub fn names(&self) -> Vec<&str> {
        self.order.iter().map(String::as_str).collect()
    }

    /// Get all tool definitions in registration order
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| tool.definition().clone())
            .collect()
    }

    /// Pick tools by name, failing on the first unknown name
    pub fn select(&self, names: &[&str]) -> Result<Vec<Tool>> {
        names
            .iter()
            .map(|name| {
                self.tools.get(*name).cloned().ok_or_else(|| {
                    FlowError::config(format!("Tool '{}' is not registered", name))
                })
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Execute a tool call against the context's buffered state
    ///
    /// Calling a name this registry does not hold is a configuration fault.
    pub async fn execute(
        &self,
        call: &ToolCall,
        ctx: &mut ToolContext,
        timeout: Option<Duration>,
    ) -> Result<ToolResult> {
        let tool = self.tools.get(&call.name).ok_or_else(|| FlowError::UnknownTool {
            agent: ctx.agent().to_string(),
            tool: call.name.clone(),
        })?;
        tool.invoke(call, ctx, timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::StateStore;
    use serde_json::json;

    fn noop(name: &str) -> Tool {
        Tool::from_fn(name, "does nothing", |_, _| Ok(ToolResult::success()))
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = ToolRegistry::new();
        registry.register(noop("a")).unwrap();
        let err = registry.register(noop("a")).unwrap_err();
        assert!(matches!(err, FlowError::Config(_)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_definitions_keep_registration_order() {
        let mut registry = ToolRegistry::new();
        registry.register(noop("b")).unwrap();
        registry.register(noop("a")).unwrap();
        let names: Vec<String> = registry
            .definitions()
            .into_iter()
            .map(|d| d.function.name)
            .collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn test_select_unknown_name() {
        let registry = ToolRegistry::with_builtins().unwrap();
        assert!(registry.select(&["complete_workflow"]).is_ok());
        assert!(registry.select(&["missing"]).is_err());
    }

    #[tokio::test]
    async fn test_execute_unknown_tool_is_fault() {
        let registry = ToolRegistry::new();
        let mut ctx = ToolContext::new("AgentStep1", "ghost", StateStore::new());
        let err = registry
            .execute(&ToolCall::new("ghost", json!({})), &mut ctx, None)
            .await
            .unwrap_err();
        match err {
            FlowError::UnknownTool { agent, tool } => {
                assert_eq!(agent, "AgentStep1");
                assert_eq!(tool, "ghost");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_with_builtins_holds_every_builtin() {
        let registry = ToolRegistry::with_builtins().unwrap();
        assert_eq!(registry.len(), builtin::all().len());
        assert!(registry.contains("complete_workflow"));
    }
}
