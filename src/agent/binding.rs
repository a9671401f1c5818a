//! Model binding trait for abstracting decision procedures
//!
//! A binding maps what an agent knows (instruction, history, tools, state) to
//! its next [`Action`]. The engine treats it as opaque: it may be a language
//! model client, a rule table, or a script.

use async_trait::async_trait;

use crate::agent::action::Action;
use crate::agent::turn::Observation;
use crate::core::{Event, FlowError, Message, Result, ToolDefinition};
use crate::state::StateSnapshot;

/// Everything a binding sees when asked for a decision
#[derive(Debug, Clone)]
pub struct DecisionRequest {
    /// Deciding agent
    pub agent: String,
    pub instruction: String,
    /// Message that started the run
    pub user_message: String,
    /// Session events so far, this turn included
    pub history: Vec<Event>,
    /// Tools the agent may invoke
    pub tools: Vec<ToolDefinition>,
    /// Agents this one may transfer to (empty means any)
    pub transfer_targets: Vec<String>,
    /// Committed state at decision time
    pub state: StateSnapshot,
    /// Tool results gathered earlier in this turn
    pub observations: Vec<Observation>,
    /// Decision index within the turn (0-indexed)
    pub step: usize,
}

impl DecisionRequest {
    /// History rendered as chat messages
    pub fn conversation(&self) -> Vec<Message> {
        self.history.iter().filter_map(Event::to_message).collect()
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.iter().any(|t| t.name() == name)
    }

    /// Most recent observation of this turn
    pub fn last_observation(&self) -> Option<&Observation> {
        self.observations.last()
    }
}

/// Trait for decision procedures
#[async_trait]
pub trait ModelBinding: Send + Sync {
    /// Choose the agent's next action
    async fn decide(&self, request: &DecisionRequest) -> Result<Action>;

    /// Get the binding name
    fn name(&self) -> &str {
        "binding"
    }
}

/// Replays a fixed action per decision step
///
/// Step `n` of every turn returns the `n`-th action, so the same binding can
/// serve repeated turns and shared agents.
#[derive(Debug, Clone)]
pub struct ScriptedBinding {
    actions: Vec<Action>,
}

impl ScriptedBinding {
    pub fn new(actions: Vec<Action>) -> Self {
        Self { actions }
    }

    /// A binding that immediately answers with `text`
    pub fn reply(text: impl Into<String>) -> Self {
        Self::new(vec![Action::text(text)])
    }
}

#[async_trait]
impl ModelBinding for ScriptedBinding {
    async fn decide(&self, request: &DecisionRequest) -> Result<Action> {
        self.actions.get(request.step).cloned().ok_or_else(|| {
            FlowError::binding(
                &request.agent,
                format!("script exhausted at step {}", request.step),
            )
        })
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Decides with a closure over the request
pub struct FnBinding<F> {
    f: F,
}

impl<F> FnBinding<F>
where
    F: Fn(&DecisionRequest) -> Result<Action> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F> ModelBinding for FnBinding<F>
where
    F: Fn(&DecisionRequest) -> Result<Action> + Send + Sync,
{
    async fn decide(&self, request: &DecisionRequest) -> Result<Action> {
        (self.f)(request)
    }

    fn name(&self) -> &str {
        "fn"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(step: usize) -> DecisionRequest {
        DecisionRequest {
            agent: "AgentStep1".into(),
            instruction: "Use the tool".into(),
            user_message: "start".into(),
            history: vec![Event::user_message("inv", "start")],
            tools: vec![],
            transfer_targets: vec![],
            state: StateSnapshot::default(),
            observations: vec![],
            step,
        }
    }

    #[tokio::test]
    async fn test_scripted_binding_follows_step() {
        let binding = ScriptedBinding::new(vec![
            Action::tool("process_step_1", json!({})),
            Action::text("done"),
        ]);
        assert_eq!(
            binding.decide(&request(0)).await.unwrap(),
            Action::tool("process_step_1", json!({}))
        );
        assert_eq!(binding.decide(&request(1)).await.unwrap(), Action::text("done"));
        assert!(matches!(
            binding.decide(&request(2)).await,
            Err(FlowError::ModelBinding { .. })
        ));
    }

    #[tokio::test]
    async fn test_fn_binding_sees_request() {
        let binding = FnBinding::new(|req: &DecisionRequest| {
            Ok(Action::text(format!("{} saw {} messages", req.agent, req.conversation().len())))
        });
        assert_eq!(
            binding.decide(&request(0)).await.unwrap(),
            Action::text("AgentStep1 saw 1 messages")
        );
    }
}
