//! Workflow nodes and their dispatch

use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use tracing::debug;

use crate::agent::{Agent, TurnOutcome};
use crate::core::{FlowError, Result};
use crate::workflow::context::RunContext;
use crate::workflow::parallel::ParallelFlow;
use crate::workflow::router::RouterFlow;
use crate::workflow::sequential::SequentialFlow;

/// One step of a workflow tree
#[derive(Debug, Clone)]
pub enum Node {
    Agent(Arc<Agent>),
    Sequential(Arc<SequentialFlow>),
    Parallel(Arc<ParallelFlow>),
    Router(Arc<RouterFlow>),
}

impl Node {
    pub fn name(&self) -> &str {
        match self {
            Node::Agent(agent) => agent.name(),
            Node::Sequential(flow) => flow.name(),
            Node::Parallel(flow) => flow.name(),
            Node::Router(flow) => flow.name(),
        }
    }
}

impl From<Arc<Agent>> for Node {
    fn from(agent: Arc<Agent>) -> Self {
        Node::Agent(agent)
    }
}

impl From<SequentialFlow> for Node {
    fn from(flow: SequentialFlow) -> Self {
        Node::Sequential(Arc::new(flow))
    }
}

impl From<ParallelFlow> for Node {
    fn from(flow: ParallelFlow) -> Self {
        Node::Parallel(Arc::new(flow))
    }
}

impl From<RouterFlow> for Node {
    fn from(flow: RouterFlow) -> Self {
        Node::Router(Arc::new(flow))
    }
}

/// What a node produced when it finished
#[derive(Debug, Clone, PartialEq)]
pub struct NodeOutput {
    /// Agent or flow the text comes from
    pub source: String,
    pub text: String,
}

/// Run a node to completion against `ctx`
pub(crate) fn execute_node<'a>(
    node: &'a Node,
    ctx: &'a RunContext,
) -> BoxFuture<'a, Result<NodeOutput>> {
    async move {
        debug!(node = node.name(), "entering node");
        match node {
            Node::Agent(agent) => run_agent(agent, ctx).await,
            Node::Sequential(flow) => flow.run(ctx).await,
            Node::Parallel(flow) => flow.run(ctx).await,
            Node::Router(flow) => flow.run(ctx).await,
        }
    }
    .boxed()
}

/// Run an agent, following transfers until some agent answers
async fn run_agent(agent: &Arc<Agent>, ctx: &RunContext) -> Result<NodeOutput> {
    let max_transfers = ctx.config().max_transfers;
    let mut current = Arc::clone(agent);
    let mut transfers = 0;

    loop {
        match current.run_turn(ctx).await? {
            TurnOutcome::Text(text) => {
                return Ok(NodeOutput {
                    source: current.name().to_string(),
                    text,
                });
            }
            TurnOutcome::Transfer(target) => {
                transfers += 1;
                if transfers > max_transfers {
                    return Err(FlowError::binding(
                        current.name(),
                        format!("more than {} transfers in one run", max_transfers),
                    ));
                }
                debug!(from = current.name(), to = %target, "following transfer");
                current = ctx
                    .agent(&target)
                    .ok_or_else(|| FlowError::UnknownAgent(target.clone()))?;
            }
        }
    }
}
