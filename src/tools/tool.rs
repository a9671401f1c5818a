//! Tool definition and handler trait

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::core::{FlowError, Result, ToolCall, ToolDefinition, ToolResult};
use crate::tools::context::ToolContext;

/// Executes a tool against a transactional state handle
///
/// Return `Ok(ToolResult::error(..))` for expected failures the agent should
/// see. Return `Err` only for faults; the invocation's writes are then
/// discarded and the owning branch fails.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, args: &Value, ctx: &mut ToolContext) -> Result<ToolResult>;
}

struct FnHandler<F>(F);

#[async_trait]
impl<F> ToolHandler for FnHandler<F>
where
    F: Fn(&Value, &mut ToolContext) -> Result<ToolResult> + Send + Sync,
{
    async fn call(&self, args: &Value, ctx: &mut ToolContext) -> Result<ToolResult> {
        (self.0)(args, ctx)
    }
}

/// A named callable agents can invoke
#[derive(Clone)]
pub struct Tool {
    definition: ToolDefinition,
    handler: Arc<dyn ToolHandler>,
}

impl Tool {
    /// Create a tool from a definition and a handler
    pub fn new(definition: ToolDefinition, handler: impl ToolHandler + 'static) -> Self {
        Self {
            definition,
            handler: Arc::new(handler),
        }
    }

    /// Create a tool from a synchronous closure, taking no declared parameters
    pub fn from_fn<F>(name: impl Into<String>, description: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Value, &mut ToolContext) -> Result<ToolResult> + Send + Sync + 'static,
    {
        Self::new(
            ToolDefinition::function(
                name,
                description,
                json!({ "type": "object", "properties": {} }),
            ),
            FnHandler(f),
        )
    }

    /// Replace the JSON schema of the parameters
    pub fn with_parameters(mut self, parameters: Value) -> Self {
        self.definition.function.parameters = parameters;
        self
    }

    pub fn name(&self) -> &str {
        self.definition.name()
    }

    pub fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    /// Run the handler, turning an expired timeout into a tool fault
    pub async fn invoke(
        &self,
        call: &ToolCall,
        ctx: &mut ToolContext,
        timeout: Option<Duration>,
    ) -> Result<ToolResult> {
        let fut = self.handler.call(&call.arguments, ctx);
        match timeout {
            Some(limit) => tokio::time::timeout(limit, fut).await.map_err(|_| {
                FlowError::tool(self.name(), format!("timed out after {:?}", limit))
            })?,
            None => fut.await,
        }
    }
}

impl std::fmt::Debug for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name())
            .finish_non_exhaustive()
    }
}
