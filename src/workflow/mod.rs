//! Workflow module - composing agents and running them
//!
//! A [`Workflow`] is a validated tree of [`Node`]s: agents, sequential and
//! parallel flows, and routers. A [`Runner`] executes it against a session
//! and hands back an [`EventStream`].

pub mod context;
pub mod graph;
pub mod node;
pub mod parallel;
pub mod router;
pub mod runner;
pub mod sequential;
pub mod stream;

pub use context::RunContext;
pub use graph::Workflow;
pub use node::{Node, NodeOutput};
pub use parallel::ParallelFlow;
pub use router::{Fallback, RoutePredicate, RouterFlow, UNCATEGORIZED};
pub use runner::Runner;
pub use sequential::{CompletionPolicy, SequentialFlow};
pub use stream::{EventStream, RunReport, RunStatus};
