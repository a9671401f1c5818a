//! Agent definition and turn loop
//!
//! An [`Agent`] is immutable once built and may be shared by several flows.
//! All mutable execution state lives in the session the turn runs against.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::agent::action::Action;
use crate::agent::binding::{DecisionRequest, ModelBinding, ScriptedBinding};
use crate::agent::turn::{Observation, TurnState};
use crate::core::{Event, FlowError, Result, ToolCall};
use crate::state::StateDelta;
use crate::tools::{Tool, ToolContext, ToolRegistry};
use crate::workflow::RunContext;

/// How an agent turn ended
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// The agent answered
    Text(String),
    /// The agent handed control to the named agent
    Transfer(String),
}

/// A named unit bound to an instruction, tools, and a decision procedure
pub struct Agent {
    name: String,
    description: String,
    instruction: String,
    tools: ToolRegistry,
    binding: Arc<dyn ModelBinding>,
    /// State key that receives the agent's final text
    output_key: Option<String>,
    /// Allowed transfer targets (empty = any agent of the workflow)
    transfer_targets: Vec<String>,
    /// Agents reachable from this one by transfer only
    sub_agents: Vec<Arc<Agent>>,
    max_steps: Option<usize>,
    decision_timeout: Option<Duration>,
    tool_timeout: Option<Duration>,
}

/// Builder for creating Agents
pub struct AgentBuilder {
    name: String,
    description: String,
    instruction: String,
    tools: Vec<Tool>,
    missing_tools: Vec<String>,
    binding: Option<Arc<dyn ModelBinding>>,
    output_key: Option<String>,
    transfer_targets: Vec<String>,
    sub_agents: Vec<Arc<Agent>>,
    max_steps: Option<usize>,
    decision_timeout: Option<Duration>,
    tool_timeout: Option<Duration>,
}

impl AgentBuilder {
    /// Create a new builder with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            instruction: String::new(),
            tools: Vec::new(),
            missing_tools: Vec::new(),
            binding: None,
            output_key: None,
            transfer_targets: Vec::new(),
            sub_agents: Vec::new(),
            max_steps: None,
            decision_timeout: None,
            tool_timeout: None,
        }
    }

    pub fn instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = instruction.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Declare a tool
    pub fn tool(mut self, tool: Tool) -> Self {
        self.tools.push(tool);
        self
    }

    /// Declare tools picked by name from a shared registry
    pub fn tools_from(mut self, registry: &ToolRegistry, names: &[&str]) -> Self {
        for name in names {
            match registry.get(name) {
                Some(tool) => self.tools.push(tool.clone()),
                None => self.missing_tools.push(name.to_string()),
            }
        }
        self
    }

    /// Set the decision procedure
    pub fn binding(mut self, binding: impl ModelBinding + 'static) -> Self {
        self.binding = Some(Arc::new(binding));
        self
    }

    /// Share an existing decision procedure
    pub fn shared_binding(mut self, binding: Arc<dyn ModelBinding>) -> Self {
        self.binding = Some(binding);
        self
    }

    /// Shorthand for a [`ScriptedBinding`]
    pub fn scripted(self, actions: Vec<Action>) -> Self {
        self.binding(ScriptedBinding::new(actions))
    }

    /// Write the agent's final text to this state key
    pub fn output_key(mut self, key: impl Into<String>) -> Self {
        self.output_key = Some(key.into());
        self
    }

    /// Allow transfers to the named agent
    pub fn transfer_to(mut self, agent: impl Into<String>) -> Self {
        self.transfer_targets.push(agent.into());
        self
    }

    /// Attach an agent that this one can transfer to
    ///
    /// Sub-agents belong to the workflow without being steps of any flow.
    pub fn sub_agent(mut self, agent: Arc<Agent>) -> Self {
        self.transfer_targets.push(agent.name().to_string());
        self.sub_agents.push(agent);
        self
    }

    /// Set maximum decisions per turn
    pub fn max_steps(mut self, max: usize) -> Self {
        self.max_steps = Some(max);
        self
    }

    pub fn decision_timeout(mut self, timeout: Duration) -> Self {
        self.decision_timeout = Some(timeout);
        self
    }

    pub fn tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = Some(timeout);
        self
    }

    /// Build the Agent
    pub fn build(self) -> Result<Arc<Agent>> {
        if self.name.trim().is_empty() {
            return Err(FlowError::config("Agent name must not be empty"));
        }
        if let Some(missing) = self.missing_tools.first() {
            return Err(FlowError::config(format!(
                "Agent '{}' references unregistered tool '{}'",
                self.name, missing
            )));
        }
        let binding = self.binding.ok_or_else(|| {
            FlowError::config(format!("Agent '{}' has no model binding", self.name))
        })?;

        let mut tools = ToolRegistry::new();
        for tool in self.tools {
            if tools.contains(tool.name()) {
                return Err(FlowError::config(format!(
                    "Agent '{}' declares tool '{}' twice",
                    self.name,
                    tool.name()
                )));
            }
            tools.register(tool)?;
        }

        Ok(Arc::new(Agent {
            name: self.name,
            description: self.description,
            instruction: self.instruction,
            tools,
            binding,
            output_key: self.output_key,
            transfer_targets: self.transfer_targets,
            sub_agents: self.sub_agents,
            max_steps: self.max_steps,
            decision_timeout: self.decision_timeout,
            tool_timeout: self.tool_timeout,
        }))
    }
}

impl Agent {
    /// Create a builder
    pub fn builder(name: impl Into<String>) -> AgentBuilder {
        AgentBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn output_key(&self) -> Option<&str> {
        self.output_key.as_deref()
    }

    pub fn transfer_targets(&self) -> &[String] {
        &self.transfer_targets
    }

    pub fn sub_agents(&self) -> &[Arc<Agent>] {
        &self.sub_agents
    }

    /// Whether this agent may hand control to `target`
    pub fn may_transfer_to(&self, target: &str) -> bool {
        self.transfer_targets.is_empty() || self.transfer_targets.iter().any(|t| t == target)
    }

    /// Run one turn: decide, call tools, and stop at text or a transfer
    ///
    /// Each tool call commits its writes before the next decision, so later
    /// steps (and later agents) see them. A fault leaves the current tool's
    /// writes uncommitted.
    pub async fn run_turn(&self, ctx: &RunContext) -> Result<TurnOutcome> {
        let max_steps = self.max_steps.unwrap_or(ctx.config().max_steps);
        let mut turn = TurnState::new(max_steps);

        debug!(agent = %self.name, binding = self.binding.name(), "turn started");

        while turn.should_continue() {
            let request = self.request(ctx, &turn);
            let action = self.decide(ctx, &request).await?;
            debug!(agent = %self.name, step = turn.step, ?action, "decision");

            match action {
                Action::EmitText { text } => {
                    let mut delta = StateDelta::new();
                    if let Some(key) = &self.output_key {
                        delta.set(key.clone(), text.clone());
                        ctx.state().apply(&delta);
                    }
                    ctx.emit(Event::agent_turn(
                        ctx.invocation_id(),
                        &self.name,
                        &text,
                        &delta,
                    ))
                    .await?;
                    return Ok(TurnOutcome::Text(text));
                }
                Action::InvokeTool(call) => {
                    let observation = self.call_tool(ctx, &call).await?;
                    turn.add_observation(observation);
                }
                Action::TransferTo { agent } => {
                    if !self.may_transfer_to(&agent) {
                        return Err(FlowError::config(format!(
                            "Agent '{}' may not transfer to '{}'",
                            self.name, agent
                        )));
                    }
                    ctx.emit(Event::transfer(ctx.invocation_id(), &self.name, &agent))
                        .await?;
                    return Ok(TurnOutcome::Transfer(agent));
                }
            }

            turn.next_step();
        }

        Err(FlowError::binding(
            &self.name,
            format!("no turn boundary after {} steps", max_steps),
        ))
    }

    fn request(&self, ctx: &RunContext, turn: &TurnState) -> DecisionRequest {
        DecisionRequest {
            agent: self.name.clone(),
            instruction: self.instruction.clone(),
            user_message: ctx.user_message().to_string(),
            history: ctx.history().snapshot(),
            tools: self.tools.definitions(),
            transfer_targets: self.transfer_targets.clone(),
            state: ctx.state().snapshot(),
            observations: turn.observations.clone(),
            step: turn.step,
        }
    }

    /// Ask the binding for the next action, honouring timeout and cancellation
    async fn decide(&self, ctx: &RunContext, request: &DecisionRequest) -> Result<Action> {
        let timeout = self.decision_timeout.or(ctx.config().decision_timeout());

        let result = tokio::select! {
            result = self.decide_within(request, timeout) => result,
            _ = ctx.cancelled() => return Err(FlowError::Cancelled),
        };

        result.map_err(|err| match err {
            err @ (FlowError::ModelBinding { .. } | FlowError::Cancelled) => err,
            other => FlowError::binding(&self.name, other.to_string()),
        })
    }

    async fn decide_within(
        &self,
        request: &DecisionRequest,
        timeout: Option<Duration>,
    ) -> Result<Action> {
        match timeout {
            Some(limit) => match tokio::time::timeout(limit, self.binding.decide(request)).await {
                Ok(result) => result,
                Err(_) => Err(FlowError::binding(
                    &self.name,
                    format!("decision timed out after {:?}", limit),
                )),
            },
            None => self.binding.decide(request).await,
        }
    }

    /// Invoke a tool transactionally and record call and result events
    async fn call_tool(&self, ctx: &RunContext, call: &ToolCall) -> Result<Observation> {
        ctx.emit(Event::tool_call(ctx.invocation_id(), &self.name, call))
            .await?;

        let mut tool_ctx = ToolContext::new(&self.name, &call.name, ctx.state().clone());
        let timeout = self.tool_timeout.or(ctx.config().tool_timeout());

        let result = tokio::select! {
            result = self.tools.execute(call, &mut tool_ctx, timeout) => result,
            _ = ctx.cancelled() => Err(FlowError::Cancelled),
        };

        let result = match result {
            Ok(result) => result,
            Err(err) => {
                warn!(agent = %self.name, tool = %call.name, error = %err, "tool faulted");
                tool_ctx.discard();
                return Err(err);
            }
        };

        let delta = tool_ctx.commit();
        debug!(
            agent = %self.name,
            tool = %call.name,
            success = result.is_success(),
            writes = delta.len(),
            "tool finished"
        );

        ctx.emit(Event::tool_result(
            ctx.invocation_id(),
            &self.name,
            &call.name,
            &result,
            &delta,
        ))
        .await?;

        Ok(Observation::new(&call.name, result))
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("tools", &self.tools.names())
            .field("output_key", &self.output_key)
            .field(
                "sub_agents",
                &self.sub_agents.iter().map(|a| a.name()).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{EventKind, ToolResult};
    use serde_json::json;

    #[test]
    fn test_agent_builder() {
        let agent = Agent::builder("AgentStep1")
            .instruction("You initiate the pipeline.")
            .description("First step agent.")
            .tool(Tool::from_fn("process_step_1", "Step 1", |_, _| {
                Ok(ToolResult::success())
            }))
            .scripted(vec![Action::text("ok")])
            .max_steps(3)
            .build()
            .unwrap();

        assert_eq!(agent.name(), "AgentStep1");
        assert_eq!(agent.tools().names(), vec!["process_step_1"]);
        assert_eq!(agent.max_steps, Some(3));
        assert!(agent.may_transfer_to("anyone"));
    }

    #[test]
    fn test_builder_requires_binding() {
        let err = Agent::builder("lonely").build().unwrap_err();
        assert!(matches!(err, FlowError::Config(_)));
    }

    #[test]
    fn test_builder_rejects_duplicate_tools() {
        let tool = Tool::from_fn("t", "t", |_, _| Ok(ToolResult::success()));
        let err = Agent::builder("a")
            .tool(tool.clone())
            .tool(tool)
            .scripted(vec![])
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("declares tool 't' twice"));
    }

    #[test]
    fn test_tools_from_unknown_name() {
        let registry = ToolRegistry::with_builtins().unwrap();
        let err = Agent::builder("a")
            .tools_from(&registry, &["complete_workflow", "nope"])
            .scripted(vec![])
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn test_transfer_targets_restrict() {
        let agent = Agent::builder("OrchestratorAgent")
            .transfer_to("ResultAgent")
            .scripted(vec![Action::transfer("ResultAgent")])
            .build()
            .unwrap();
        assert!(agent.may_transfer_to("ResultAgent"));
        assert!(!agent.may_transfer_to("LeftAgent"));
    }

    #[tokio::test]
    async fn test_run_turn_commits_tool_writes_and_output() {
        let agent = Agent::builder("writer")
            .tool(Tool::from_fn("save", "Save", |args, ctx| {
                ctx.set("saved", args["value"].clone());
                Ok(ToolResult::success())
            }))
            .scripted(vec![
                Action::tool("save", json!({"value": 42})),
                Action::text("saved it"),
            ])
            .output_key("writer_output")
            .build()
            .unwrap();

        let (ctx, mut rx) = RunContext::detached("start");
        let outcome = agent.run_turn(&ctx).await.unwrap();
        assert_eq!(outcome, TurnOutcome::Text("saved it".into()));
        assert_eq!(ctx.state().get("saved"), Some(json!(42)));
        assert_eq!(ctx.state().get_str("writer_output").as_deref(), Some("saved it"));

        let mut kinds = Vec::new();
        while let Ok(event) = rx.try_recv() {
            kinds.push(event.kind);
        }
        assert_eq!(
            kinds,
            vec![EventKind::ToolCall, EventKind::ToolResult, EventKind::AgentTurn]
        );
    }

    #[tokio::test]
    async fn test_domain_failure_is_fed_back() {
        let binding = crate::agent::FnBinding::new(|req: &DecisionRequest| {
            Ok(match req.last_observation() {
                None => Action::tool("lookup", json!({})),
                Some(obs) if !obs.success => Action::text("sorry, lookup failed"),
                Some(_) => Action::text("found"),
            })
        });
        let agent = Agent::builder("asker")
            .tool(Tool::from_fn("lookup", "Lookup", |_, _| {
                Ok(ToolResult::error("not found"))
            }))
            .binding(binding)
            .build()
            .unwrap();

        let (ctx, _rx) = RunContext::detached("where?");
        let outcome = agent.run_turn(&ctx).await.unwrap();
        assert_eq!(outcome, TurnOutcome::Text("sorry, lookup failed".into()));
    }

    #[tokio::test]
    async fn test_faulting_tool_discards_writes() {
        let agent = Agent::builder("breaker")
            .tool(Tool::from_fn("explode", "Fails", |_, ctx| {
                ctx.set("half_written", true);
                Err(FlowError::tool("explode", "disk on fire"))
            }))
            .scripted(vec![Action::tool("explode", json!({}))])
            .build()
            .unwrap();

        let (ctx, _rx) = RunContext::detached("go");
        let err = agent.run_turn(&ctx).await.unwrap_err();
        assert!(matches!(err, FlowError::Tool { .. }));
        assert!(!ctx.state().contains("half_written"));
    }

    #[tokio::test]
    async fn test_undeclared_tool_is_configuration_fault() {
        let agent = Agent::builder("confused")
            .scripted(vec![Action::tool("not_mine", json!({}))])
            .build()
            .unwrap();

        let (ctx, _rx) = RunContext::detached("go");
        let err = agent.run_turn(&ctx).await.unwrap_err();
        assert!(matches!(err, FlowError::UnknownTool { .. }));
    }

    #[tokio::test]
    async fn test_step_limit() {
        let agent = Agent::builder("looper")
            .tool(Tool::from_fn("noop", "Nothing", |_, _| Ok(ToolResult::success())))
            .binding(crate::agent::FnBinding::new(|_: &DecisionRequest| {
                Ok(Action::tool("noop", json!({})))
            }))
            .max_steps(3)
            .build()
            .unwrap();

        let (ctx, _rx) = RunContext::detached("go");
        let err = agent.run_turn(&ctx).await.unwrap_err();
        assert!(matches!(err, FlowError::ModelBinding { .. }));
    }
}
