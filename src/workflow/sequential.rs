//! Sequential orchestration
//!
//! Children run one after another against the same state and history, so
//! every child observes the writes of the ones before it.

use tracing::debug;

use crate::core::{FlowError, Result};
use crate::workflow::context::RunContext;
use crate::workflow::node::{execute_node, Node, NodeOutput};

/// When a sequential flow is done
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CompletionPolicy {
    /// After the last child's turn
    #[default]
    LastChild,
    /// As soon as a child of this flow writes a truthy value to the key
    ///
    /// Fails as incomplete if every child ran without doing so.
    StateFlag(String),
}

/// Runs children in declared order
#[derive(Debug)]
pub struct SequentialFlow {
    name: String,
    children: Vec<Node>,
    policy: CompletionPolicy,
}

impl SequentialFlow {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
            policy: CompletionPolicy::default(),
        }
    }

    /// Append a child
    pub fn then(mut self, node: impl Into<Node>) -> Self {
        self.children.push(node.into());
        self
    }

    pub fn with_policy(mut self, policy: CompletionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Stop once `key` becomes truthy
    pub fn until_flag(self, key: impl Into<String>) -> Self {
        self.with_policy(CompletionPolicy::StateFlag(key.into()))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn policy(&self) -> &CompletionPolicy {
        &self.policy
    }

    pub(crate) async fn run(&self, ctx: &RunContext) -> Result<NodeOutput> {
        // Only writes made by this flow count; a flag left over from an
        // earlier run neither stops nor completes this one
        let start = ctx.history().len();
        let flag_set = |key: &str| {
            ctx.history().wrote_since(start, key) && ctx.state().is_truthy(key)
        };

        let mut last = None;
        for (index, child) in self.children.iter().enumerate() {
            debug!(flow = %self.name, step = index, child = child.name(), "running child");
            last = Some(execute_node(child, ctx).await?);

            if let CompletionPolicy::StateFlag(key) = &self.policy {
                if flag_set(key) {
                    debug!(flow = %self.name, key = %key, "completion flag set");
                    break;
                }
            }
        }

        let output = last
            .ok_or_else(|| FlowError::config(format!("Sequential flow '{}' is empty", self.name)))?;

        if let CompletionPolicy::StateFlag(key) = &self.policy {
            if !flag_set(key) {
                return Err(FlowError::Incomplete {
                    flow: self.name.clone(),
                    key: key.clone(),
                });
            }
        }

        Ok(output)
    }
}
