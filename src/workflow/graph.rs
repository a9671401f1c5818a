//! Validated workflow definitions

use std::collections::HashMap;
use std::sync::Arc;

use crate::agent::Agent;
use crate::core::{FlowError, Result};
use crate::workflow::node::Node;
use crate::workflow::router::Fallback;

/// An immutable, validated tree of nodes
///
/// Construction walks the whole tree and rejects malformed definitions
/// before any run starts.
#[derive(Debug, Clone)]
pub struct Workflow {
    name: String,
    root: Node,
    agents: Arc<HashMap<String, Arc<Agent>>>,
}

impl Workflow {
    pub fn new(name: impl Into<String>, root: impl Into<Node>) -> Result<Self> {
        let root = root.into();
        let mut agents = HashMap::new();
        collect_agents(&root, &mut agents)?;

        for agent in agents.values() {
            for target in agent.transfer_targets() {
                if !agents.contains_key(target) {
                    return Err(FlowError::config(format!(
                        "Agent '{}' transfers to unknown agent '{}'",
                        agent.name(),
                        target
                    )));
                }
            }
        }

        Ok(Self {
            name: name.into(),
            root,
            agents: Arc::new(agents),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn agent(&self, name: &str) -> Option<&Arc<Agent>> {
        self.agents.get(name)
    }

    /// Agent names, sorted
    pub fn agent_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.agents.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub(crate) fn agents(&self) -> Arc<HashMap<String, Arc<Agent>>> {
        Arc::clone(&self.agents)
    }
}

/// Register an agent and, the first time it is seen, its sub-agents
fn collect_agent(agent: &Arc<Agent>, agents: &mut HashMap<String, Arc<Agent>>) -> Result<()> {
    match agents.get(agent.name()) {
        // The same agent may appear in several places
        Some(existing) if Arc::ptr_eq(existing, agent) => Ok(()),
        Some(_) => Err(FlowError::config(format!(
            "Duplicate agent name '{}'",
            agent.name()
        ))),
        None => {
            agents.insert(agent.name().to_string(), Arc::clone(agent));
            agent
                .sub_agents()
                .iter()
                .try_for_each(|sub| collect_agent(sub, agents))
        }
    }
}

/// Gather every agent of the tree, checking structural rules on the way
fn collect_agents(node: &Node, agents: &mut HashMap<String, Arc<Agent>>) -> Result<()> {
    match node {
        Node::Agent(agent) => collect_agent(agent, agents),
        Node::Sequential(flow) => {
            if flow.children().is_empty() {
                return Err(FlowError::config(format!(
                    "Sequential flow '{}' is empty",
                    flow.name()
                )));
            }
            flow.children()
                .iter()
                .try_for_each(|child| collect_agents(child, agents))
        }
        Node::Parallel(flow) => {
            if flow.branches().is_empty() {
                return Err(FlowError::config(format!(
                    "Parallel flow '{}' has no branches",
                    flow.name()
                )));
            }
            flow.branches()
                .iter()
                .try_for_each(|branch| collect_agents(branch, agents))
        }
        Node::Router(flow) => {
            if flow.routes().is_empty() && flow.fallback_policy().is_none() {
                return Err(FlowError::config(format!(
                    "Router '{}' has no routes and no fallback",
                    flow.name()
                )));
            }
            collect_agents(flow.classifier(), agents)?;
            for (_, target) in flow.routes() {
                collect_agents(target, agents)?;
            }
            if let Some(Fallback::Node(node)) = flow.fallback_policy() {
                collect_agents(node, agents)?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Action;
    use crate::workflow::{ParallelFlow, RoutePredicate, RouterFlow, SequentialFlow};

    fn agent(name: &str) -> Arc<Agent> {
        Agent::builder(name)
            .scripted(vec![Action::text(name)])
            .build()
            .unwrap()
    }

    #[test]
    fn test_shared_agent_is_allowed() {
        let shared = agent("Shared");
        let flow = SequentialFlow::new("twice")
            .then(shared.clone())
            .then(shared);
        let workflow = Workflow::new("wf", flow).unwrap();
        assert_eq!(workflow.agent_names(), vec!["Shared"]);
    }

    #[test]
    fn test_duplicate_agent_names_rejected() {
        let flow = ParallelFlow::new("fan")
            .branch(agent("Twin"))
            .branch(agent("Twin"));
        let err = Workflow::new("wf", flow).unwrap_err();
        assert!(err.to_string().contains("Duplicate agent name 'Twin'"));
    }

    #[test]
    fn test_empty_flows_rejected() {
        assert!(Workflow::new("wf", SequentialFlow::new("empty")).is_err());
        assert!(Workflow::new("wf", ParallelFlow::new("empty")).is_err());
    }

    #[test]
    fn test_router_without_routes_or_fallback_rejected() {
        let err = Workflow::new("wf", RouterFlow::new("router", agent("Classifier"))).unwrap_err();
        assert_eq!(err.kind(), crate::core::FaultKind::Configuration);

        let ok = RouterFlow::new("router", agent("Classifier"))
            .route(RoutePredicate::contains("a"), agent("A"));
        assert!(Workflow::new("wf", ok).is_ok());
    }

    #[test]
    fn test_unknown_transfer_target_rejected() {
        let orchestrator = Agent::builder("OrchestratorAgent")
            .transfer_to("ResultAgent")
            .scripted(vec![Action::transfer("ResultAgent")])
            .build()
            .unwrap();
        assert!(Workflow::new("wf", orchestrator.clone()).is_err());

        let flow = SequentialFlow::new("pair")
            .then(orchestrator)
            .then(agent("ResultAgent"));
        assert!(Workflow::new("wf", flow).is_ok());
    }

    #[test]
    fn test_sub_agents_are_transfer_targets() {
        let result_agent = agent("ResultAgent");
        let orchestrator = Agent::builder("OrchestratorAgent")
            .sub_agent(result_agent.clone())
            .scripted(vec![Action::transfer("ResultAgent")])
            .build()
            .unwrap();
        assert!(orchestrator.may_transfer_to("ResultAgent"));
        assert!(!orchestrator.may_transfer_to("LeftAgent"));

        let workflow = Workflow::new("wf", orchestrator).unwrap();
        assert_eq!(workflow.agent_names(), vec!["OrchestratorAgent", "ResultAgent"]);
        assert!(Arc::ptr_eq(workflow.agent("ResultAgent").unwrap(), &result_agent));
    }

    #[test]
    fn test_sub_agent_names_must_be_unique() {
        let orchestrator = Agent::builder("OrchestratorAgent")
            .sub_agent(agent("Twin"))
            .scripted(vec![Action::text("hi")])
            .build()
            .unwrap();
        let flow = SequentialFlow::new("pair")
            .then(orchestrator)
            .then(agent("Twin"));
        let err = Workflow::new("wf", flow).unwrap_err();
        assert!(err.to_string().contains("Duplicate agent name 'Twin'"));
    }
}
