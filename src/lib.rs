//! agentflow - Workflow Orchestration for Tool-Using Agents
//!
//! Coordinates agents into multi-step workflows over a shared session state.
//! Agents decide through a pluggable [`agent::ModelBinding`], call tools that
//! write state transactionally, and hand control to each other by transfer.
//!
//! # Architecture
//!
//! - **Core**: Shared types, events, configuration, and error handling
//! - **State**: The session state store and its write buffers
//! - **Tools**: Tool type, registry, and built-in tools
//! - **Agent**: Agents, actions, and the per-turn decision loop
//! - **Workflow**: Sequential, parallel and router flows, the runner, and the event stream
//! - **Session**: Sessions and their in-memory or file storage
//! - **CLI**: Demo workflows and the REPL
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use agentflow::agent::{Action, Agent};
//! use agentflow::session::{InMemorySessionService, SessionService};
//! use agentflow::workflow::{Runner, SequentialFlow, Workflow};
//!
//! #[tokio::main]
//! async fn main() -> agentflow::Result<()> {
//!     let greeter = Agent::builder("Greeter")
//!         .scripted(vec![Action::text("Hello!")])
//!         .build()?;
//!     let workflow = Workflow::new("hello", SequentialFlow::new("main").then(greeter))?;
//!
//!     let sessions = Arc::new(InMemorySessionService::new());
//!     let session = sessions.create("demo", "user", None).await?;
//!     let runner = Runner::new(workflow, sessions);
//!
//!     let report = runner.run_to_end(&session, "Hi").await;
//!     println!("{}", report.final_text().unwrap_or_default());
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod cli;
pub mod core;
pub mod session;
pub mod state;
pub mod tools;
pub mod workflow;

// Re-export commonly used items
pub use agent::{Action, Agent};
pub use crate::core::{Config, Event, EventKind, FaultKind, FlowError, Result};
pub use session::{Session, SessionService};
pub use state::StateStore;
pub use tools::Tool;
pub use workflow::{EventStream, Node, RunReport, RunStatus, Runner, Workflow};
