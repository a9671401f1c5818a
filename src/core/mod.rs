//! Core module - shared infrastructure for agentflow
//!
//! This module contains foundational types, events, configuration, and error
//! handling used throughout the crate.

pub mod config;
pub mod error;
pub mod event;
pub mod types;

pub use config::Config;
pub use error::{FaultKind, FlowError, Result};
pub use event::{Event, EventKind, EventLog};
pub use types::*;
