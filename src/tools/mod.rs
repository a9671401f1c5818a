//! Tools module - callables agents invoke against session state
//!
//! Contains the tool type, its transactional state handle, the registry, and
//! built-in tools.

pub mod builtin;
pub mod context;
pub mod registry;
pub mod tool;

pub use context::ToolContext;
pub use registry::ToolRegistry;
pub use tool::{Tool, ToolHandler};
