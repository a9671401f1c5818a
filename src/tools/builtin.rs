//! Built-in tools

use crate::core::ToolResult;
use crate::tools::tool::Tool;

/// State key set by [`complete_workflow`]
pub const WORKFLOW_COMPLETE: &str = "workflow_complete";

/// Every built-in tool
pub fn all() -> Vec<Tool> {
    vec![complete_workflow()]
}

/// Marks the workflow as finished
///
/// Sets `workflow_complete = true` in state, which a sequential flow using
/// `CompletionPolicy::StateFlag` treats as its terminal signal.
pub fn complete_workflow() -> Tool {
    Tool::from_fn(
        "complete_workflow",
        "Mark the current workflow as complete",
        |_, ctx| {
            ctx.set(WORKFLOW_COMPLETE, true);
            Ok(ToolResult::success().with(WORKFLOW_COMPLETE, true))
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ToolCall;
    use crate::state::StateStore;
    use crate::tools::ToolContext;

    #[tokio::test]
    async fn test_complete_workflow_sets_flag() {
        let store = StateStore::new();
        let mut ctx = ToolContext::new("final", "complete_workflow", store.clone());
        let result = complete_workflow()
            .invoke(
                &ToolCall::new("complete_workflow", serde_json::json!({})),
                &mut ctx,
                None,
            )
            .await
            .unwrap();
        ctx.commit();

        assert!(result.is_success());
        assert!(store.is_truthy(WORKFLOW_COMPLETE));
    }
}
