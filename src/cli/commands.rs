//! CLI commands
//!
//! Special commands that can be executed in the REPL.

use crate::cli::demo::DemoWorkflow;
use crate::core::EventKind;
use crate::session::Session;

/// Result of parsing a command
#[derive(Debug, PartialEq)]
pub enum CommandResult {
    /// Continue processing as normal input
    Continue(String),
    /// Command was handled, show output
    Handled(String),
    /// Switch to another demo workflow
    SwitchWorkflow(DemoWorkflow),
    /// Start a fresh session
    NewSession,
    /// Exit the REPL
    Exit,
}

/// Parse and handle special commands
pub fn handle_command(input: &str, session: &Session) -> CommandResult {
    let input = input.trim();
    let mut parts = input.splitn(2, ' ');
    let cmd = parts.next().unwrap_or_default().to_lowercase();
    let args = parts.next().map(str::trim).unwrap_or("");

    match cmd.as_str() {
        "exit" | "quit" | "q" => CommandResult::Exit,

        "help" | "?" => CommandResult::Handled(help_text()),

        "new" | "reset" => CommandResult::NewSession,

        "state" => CommandResult::Handled(format_state(session)),

        "history" => CommandResult::Handled(format_history(session)),

        "workflow" => {
            if args.is_empty() {
                return CommandResult::Handled(
                    "Usage: workflow <pipeline|router|parallel|weather>".to_string(),
                );
            }
            match DemoWorkflow::parse(args) {
                Some(demo) => CommandResult::SwitchWorkflow(demo),
                None => CommandResult::Handled(format!(
                    "Unknown workflow: {}. Available: pipeline, router, parallel, weather",
                    args
                )),
            }
        }

        _ => {
            // Not a command, treat as normal input
            if input.starts_with('/') {
                CommandResult::Handled(format!(
                    "Unknown command: {}. Type 'help' for available commands.",
                    cmd
                ))
            } else {
                CommandResult::Continue(input.to_string())
            }
        }
    }
}

fn format_state(session: &Session) -> String {
    let snapshot = session.state.snapshot();
    if snapshot.is_empty() {
        return "State is empty.".to_string();
    }

    let mut keys: Vec<_> = snapshot.iter().collect();
    keys.sort_by(|a, b| a.0.cmp(b.0));

    let mut output = format!("Session {} state:\n", session.id);
    for (key, value) in keys {
        output.push_str(&format!("  {} = {}\n", key, value));
    }
    output
}

fn format_history(session: &Session) -> String {
    let events = session.history.snapshot();
    if events.is_empty() {
        return "No events yet.".to_string();
    }

    let finals = events.iter().filter(|e| e.kind == EventKind::FinalResponse).count();
    let mut output = format!("{} events, {} final responses:\n", events.len(), finals);
    for event in &events {
        output.push_str(&format!("  {}\n", crate::cli::format_event(event)));
    }
    output
}

/// Generate help text
fn help_text() -> String {
    r#"agentflow Commands:
─────────────────────────────────────────────
  help, ?            Show this help message
  exit, quit, q      Exit agentflow
  state              Show the session state
  history            Show the session's events
  workflow <name>    Switch demo workflow
                     (pipeline, router, parallel, weather)
  new, reset         Start a fresh session

Anything else is sent to the current workflow.
─────────────────────────────────────────────"#
        .to_string()
}
