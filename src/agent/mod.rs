//! Agent module - agents, their decision procedures, and the turn loop
//!
//! An agent asks its [`ModelBinding`] for an [`Action`], executes tool calls
//! against session state, and ends its turn with text or a transfer.

pub mod action;
pub mod binding;
pub mod definition;
pub mod turn;

pub use action::Action;
pub use binding::{DecisionRequest, FnBinding, ModelBinding, ScriptedBinding};
pub use definition::{Agent, AgentBuilder, TurnOutcome};
pub use turn::{Observation, TurnState};
