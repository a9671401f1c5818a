//! Conditional routing
//!
//! A router runs its classifier, matches the classifier's text against an
//! ordered routing table, and dispatches to exactly one target. The first
//! matching route wins.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use crate::core::{Event, FlowError, Result};
use crate::state::StateDelta;
use crate::workflow::context::RunContext;
use crate::workflow::node::{execute_node, Node, NodeOutput};

/// Reply used by [`Fallback::inform`] when no route matches
pub const UNCATEGORIZED: &str = "The request could not be categorized.";

/// Test applied to the classifier's text
#[derive(Clone)]
pub enum RoutePredicate {
    /// Text contains the needle
    Contains(String),
    /// Trimmed text equals the value
    Equals(String),
    /// Trimmed text starts with the prefix
    StartsWith(String),
    Custom(Arc<dyn Fn(&str) -> bool + Send + Sync>),
}

impl RoutePredicate {
    pub fn contains(needle: impl Into<String>) -> Self {
        Self::Contains(needle.into())
    }

    pub fn equals(value: impl Into<String>) -> Self {
        Self::Equals(value.into())
    }

    pub fn starts_with(prefix: impl Into<String>) -> Self {
        Self::StartsWith(prefix.into())
    }

    pub fn custom(f: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        Self::Custom(Arc::new(f))
    }

    pub fn matches(&self, result: &str) -> bool {
        match self {
            Self::Contains(needle) => result.contains(needle.as_str()),
            Self::Equals(value) => result.trim() == value.trim(),
            Self::StartsWith(prefix) => result.trim().starts_with(prefix.as_str()),
            Self::Custom(f) => f(result),
        }
    }
}

impl fmt::Debug for RoutePredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Contains(s) => f.debug_tuple("Contains").field(s).finish(),
            Self::Equals(s) => f.debug_tuple("Equals").field(s).finish(),
            Self::StartsWith(s) => f.debug_tuple("StartsWith").field(s).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// What happens when no route matches
#[derive(Debug, Clone)]
pub enum Fallback {
    /// Answer with this text on behalf of the router
    Inform(String),
    /// Dispatch to this node
    Node(Box<Node>),
}

impl Fallback {
    /// Tell the caller the request could not be categorized
    pub fn inform() -> Self {
        Self::Inform(UNCATEGORIZED.to_string())
    }
}

/// Classifier followed by a single dispatch
#[derive(Debug)]
pub struct RouterFlow {
    name: String,
    classifier: Node,
    routes: Vec<(RoutePredicate, Node)>,
    fallback: Option<Fallback>,
}

impl RouterFlow {
    pub fn new(name: impl Into<String>, classifier: impl Into<Node>) -> Self {
        Self {
            name: name.into(),
            classifier: classifier.into(),
            routes: Vec::new(),
            fallback: None,
        }
    }

    /// Append a route; earlier routes take precedence
    pub fn route(mut self, predicate: RoutePredicate, target: impl Into<Node>) -> Self {
        self.routes.push((predicate, target.into()));
        self
    }

    pub fn fallback(mut self, fallback: Fallback) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Fall back to the default "could not be categorized" reply
    pub fn fallback_inform(self) -> Self {
        self.fallback(Fallback::inform())
    }

    pub fn fallback_to(self, node: impl Into<Node>) -> Self {
        self.fallback(Fallback::Node(Box::new(node.into())))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn classifier(&self) -> &Node {
        &self.classifier
    }

    pub fn routes(&self) -> &[(RoutePredicate, Node)] {
        &self.routes
    }

    pub fn fallback_policy(&self) -> Option<&Fallback> {
        self.fallback.as_ref()
    }

    /// First route whose predicate accepts `result`
    pub fn select(&self, result: &str) -> Option<&Node> {
        self.routes
            .iter()
            .find(|(predicate, _)| predicate.matches(result))
            .map(|(_, node)| node)
    }

    pub(crate) async fn run(&self, ctx: &RunContext) -> Result<NodeOutput> {
        let classified = execute_node(&self.classifier, ctx).await?;
        debug!(router = %self.name, result = %classified.text, "classified");

        if let Some(target) = self.select(&classified.text) {
            return self.dispatch(ctx, target).await;
        }

        match &self.fallback {
            Some(Fallback::Inform(text)) => {
                info!(router = %self.name, result = %classified.text, "no route matched");
                ctx.emit(Event::agent_turn(
                    ctx.invocation_id(),
                    &self.name,
                    text,
                    &StateDelta::new(),
                ))
                .await?;
                Ok(NodeOutput {
                    source: self.name.clone(),
                    text: text.clone(),
                })
            }
            Some(Fallback::Node(node)) => self.dispatch(ctx, node).await,
            None => Err(FlowError::Routing {
                router: self.name.clone(),
                result: classified.text,
            }),
        }
    }

    async fn dispatch(&self, ctx: &RunContext, target: &Node) -> Result<NodeOutput> {
        debug!(router = %self.name, target = target.name(), "dispatching");
        ctx.emit(Event::transfer(ctx.invocation_id(), &self.name, target.name()))
            .await?;
        execute_node(target, ctx).await
    }
}
