//! CLI module - command-line interface
//!
//! Contains the demo workflows, the REPL, command parsing, and logging setup.

pub mod commands;
pub mod demo;
pub mod repl;

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::core::config::{LoggingConfig, StorageBackend, StorageConfig};
use crate::core::{Event, EventKind};
use crate::session::{FileSessionService, InMemorySessionService, SessionService};

pub use demo::DemoWorkflow;
pub use repl::Repl;

/// Install the global tracing subscriber; logs go to stderr
///
/// `RUST_LOG` wins over the configured level. Calling this twice is harmless.
pub fn init_logging(config: &LoggingConfig) {
    let default_level = if config.debug {
        "agentflow=debug,warn".to_string()
    } else {
        config.level.clone()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry().with(filter);
    let result = if config.json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    };

    if let Err(e) = result {
        eprintln!("Logging already initialised: {}", e);
    }
}

/// Session service for the configured backend
pub fn session_service(config: &StorageConfig) -> Arc<dyn SessionService> {
    match config.backend {
        StorageBackend::Memory => Arc::new(InMemorySessionService::new()),
        StorageBackend::File => Arc::new(FileSessionService::new(config.dir.clone())),
    }
}

/// One-line rendering of an event for the terminal
pub fn format_event(event: &Event) -> String {
    let payload = &event.payload;
    match event.kind {
        EventKind::UserMessage => format!("[user] {}", event.text().unwrap_or_default()),
        EventKind::AgentTurn => format!("[{}] {}", event.source, event.text().unwrap_or_default()),
        EventKind::ToolCall => format!(
            "[{}] -> {}({})",
            event.source,
            event.tool_name().unwrap_or("?"),
            payload.get("args").map(|a| a.to_string()).unwrap_or_default()
        ),
        EventKind::ToolResult => format!(
            "[{}] <- {}: {}",
            event.source,
            event.tool_name().unwrap_or("?"),
            payload.get("result").map(|r| r.to_string()).unwrap_or_default()
        ),
        EventKind::Transfer => format!(
            "[{}] transfer -> {}",
            event.source,
            payload.get("to").and_then(|t| t.as_str()).unwrap_or("?")
        ),
        EventKind::StateMerge => format!(
            "[{}] merged {} in order {}",
            event.source,
            payload.get("keys").map(|k| k.to_string()).unwrap_or_default(),
            payload.get("order").map(|o| o.to_string()).unwrap_or_default()
        ),
        EventKind::FinalResponse => format!("[{}] FINAL: {}", event.source, event.text().unwrap_or_default()),
        EventKind::Fault => format!(
            "[{}] FAULT ({}): {}",
            event.source,
            payload.get("kind").and_then(|k| k.as_str()).unwrap_or("?"),
            payload.get("message").and_then(|m| m.as_str()).unwrap_or_default()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::FaultKind;

    #[test]
    fn test_format_event() {
        assert_eq!(
            format_event(&Event::final_response("inv", "LeftAgent", "done")),
            "[LeftAgent] FINAL: done"
        );
        assert_eq!(
            format_event(&Event::fault("inv", "wf", FaultKind::Routing, "no route")),
            "[wf] FAULT (routing): no route"
        );
        assert_eq!(
            format_event(&Event::transfer("inv", "router", "LeftAgent")),
            "[router] transfer -> LeftAgent"
        );
    }
}
