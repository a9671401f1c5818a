//! Parallel orchestration
//!
//! Each branch runs as its own task against a journaled copy of the state.
//! Branch events are forwarded as they arrive. At fan-in the journals of the
//! successful branches are applied in declaration order, so for a key written
//! by several branches the last-declared writer wins regardless of timing.

use std::collections::{BTreeSet, HashMap};

use serde_json::json;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::core::{Event, FlowError, Result};
use crate::state::StateDelta;
use crate::workflow::context::RunContext;
use crate::workflow::node::{execute_node, Node, NodeOutput};

/// Runs branches concurrently and merges their writes
#[derive(Debug)]
pub struct ParallelFlow {
    name: String,
    branches: Vec<Node>,
}

type BranchOutcome = Result<(NodeOutput, StateDelta)>;

impl ParallelFlow {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            branches: Vec::new(),
        }
    }

    /// Add a branch
    pub fn branch(mut self, node: impl Into<Node>) -> Self {
        self.branches.push(node.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn branches(&self) -> &[Node] {
        &self.branches
    }

    pub(crate) async fn run(&self, ctx: &RunContext) -> Result<NodeOutput> {
        if self.branches.is_empty() {
            return Err(FlowError::config(format!(
                "Parallel flow '{}' has no branches",
                self.name
            )));
        }

        let (tx, mut rx) = mpsc::channel(ctx.config().event_buffer.max(1));
        let mut tasks: JoinSet<BranchOutcome> = JoinSet::new();
        let mut task_index = HashMap::new();

        for (index, node) in self.branches.iter().enumerate() {
            let node = node.clone();
            let branch_ctx = ctx.branch(tx.clone());
            let handle = tasks.spawn(async move {
                let output = execute_node(&node, &branch_ctx).await?;
                Ok::<_, FlowError>((output, branch_ctx.state().take_journal()))
            });
            task_index.insert(handle.id(), index);
        }
        drop(tx);

        let mut outcomes: Vec<Option<BranchOutcome>> =
            (0..self.branches.len()).map(|_| None).collect();
        let mut completion_order = Vec::new();
        let mut events_open = true;

        // Dropping `tasks` on an early return aborts every branch
        while events_open || !tasks.is_empty() {
            tokio::select! {
                biased;
                _ = ctx.cancelled() => return Err(FlowError::Cancelled),
                event = rx.recv(), if events_open => match event {
                    Some(event) => ctx.emit(event).await?,
                    None => events_open = false,
                },
                joined = tasks.join_next_with_id(), if !tasks.is_empty() => {
                    let (id, outcome) = match joined {
                        Some(Ok((id, outcome))) => (id, outcome),
                        Some(Err(err)) => {
                            let id = err.id();
                            (id, Err(FlowError::Other(format!("branch task failed: {}", err))))
                        }
                        None => continue,
                    };
                    let Some(&index) = task_index.get(&id) else {
                        continue;
                    };
                    let branch = self.branches[index].name();
                    match &outcome {
                        Ok(_) => debug!(flow = %self.name, branch, "branch finished"),
                        Err(err) => warn!(flow = %self.name, branch, error = %err, "branch failed"),
                    }
                    completion_order.push(branch.to_string());
                    outcomes[index] = Some(outcome);
                }
            }
        }

        self.merge(ctx, outcomes, completion_order).await
    }

    /// Apply successful journals in declaration order and report the merge
    async fn merge(
        &self,
        ctx: &RunContext,
        outcomes: Vec<Option<BranchOutcome>>,
        completion_order: Vec<String>,
    ) -> Result<NodeOutput> {
        let mut merged = StateDelta::new();
        let mut keys = BTreeSet::new();
        let mut order = Vec::new();
        let mut texts = Vec::new();
        let mut failed = Vec::new();
        let mut first_error = None;

        for (node, outcome) in self.branches.iter().zip(outcomes) {
            let outcome = outcome.unwrap_or_else(|| {
                Err(FlowError::Other(format!("branch '{}' never reported", node.name())))
            });
            match outcome {
                Ok((output, journal)) => {
                    keys.extend(journal.keys().map(str::to_string));
                    merged.extend(journal);
                    order.push(node.name().to_string());
                    texts.push(output.text);
                }
                Err(err) => {
                    failed.push(node.name().to_string());
                    first_error.get_or_insert(err);
                }
            }
        }

        ctx.state().apply(&merged);
        ctx.emit(Event::state_merge(
            ctx.invocation_id(),
            &self.name,
            json!({
                "order": order,
                "completion_order": completion_order,
                "keys": keys,
                "discarded": failed,
            }),
        ))
        .await?;

        if let Some(first) = first_error {
            return Err(FlowError::Parallel {
                flow: self.name.clone(),
                failed,
                first: Box::new(first),
            });
        }

        Ok(NodeOutput {
            source: self.name.clone(),
            text: texts.join("\n"),
        })
    }
}
