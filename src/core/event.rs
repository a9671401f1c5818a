//! Run events and the append-only event log
//!
//! Every observable step of a run is an [`Event`]. The log a session keeps is
//! the run's audit trail; it is only ever appended to.

use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::core::error::FaultKind;
use crate::core::types::{Message, ToolCall, ToolResult};
use crate::state::StateDelta;

/// What an event records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// The message that started the run
    UserMessage,
    /// An agent reached a turn boundary with text
    AgentTurn,
    /// An agent asked for a tool
    ToolCall,
    /// A tool finished (successfully or with a domain failure)
    ToolResult,
    /// Control handed to another agent or route target
    Transfer,
    /// Parallel branch writes applied to the parent state
    StateMerge,
    /// The run's answer
    FinalResponse,
    /// The run failed
    Fault,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EventKind::UserMessage => "user_message",
            EventKind::AgentTurn => "agent_turn",
            EventKind::ToolCall => "tool_call",
            EventKind::ToolResult => "tool_result",
            EventKind::Transfer => "transfer",
            EventKind::StateMerge => "state_merge",
            EventKind::FinalResponse => "final_response",
            EventKind::Fault => "fault",
        };
        write!(f, "{}", name)
    }
}

/// One observable step in a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    /// Groups the events of one `Runner::run` call
    pub invocation_id: String,
    pub kind: EventKind,
    /// Agent, flow, tool caller or `user`
    pub source: String,
    pub payload: Value,
    pub is_final: bool,
    pub timestamp: DateTime<Utc>,
}

impl Event {
    fn new(invocation_id: &str, kind: EventKind, source: &str, payload: Value) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            invocation_id: invocation_id.to_string(),
            kind,
            source: source.to_string(),
            payload,
            is_final: false,
            timestamp: Utc::now(),
        }
    }

    pub fn user_message(invocation_id: &str, text: &str) -> Self {
        Self::new(invocation_id, EventKind::UserMessage, "user", json!({ "text": text }))
    }

    pub fn agent_turn(invocation_id: &str, agent: &str, text: &str, delta: &StateDelta) -> Self {
        let mut payload = json!({ "text": text });
        if !delta.is_empty() {
            payload["state_delta"] = delta.to_value();
        }
        Self::new(invocation_id, EventKind::AgentTurn, agent, payload)
    }

    pub fn tool_call(invocation_id: &str, agent: &str, call: &ToolCall) -> Self {
        Self::new(
            invocation_id,
            EventKind::ToolCall,
            agent,
            json!({ "tool": call.name, "args": call.arguments }),
        )
    }

    pub fn tool_result(
        invocation_id: &str,
        agent: &str,
        tool: &str,
        result: &ToolResult,
        delta: &StateDelta,
    ) -> Self {
        let mut payload = json!({ "tool": tool, "result": result.to_value() });
        if !delta.is_empty() {
            payload["state_delta"] = delta.to_value();
        }
        Self::new(invocation_id, EventKind::ToolResult, agent, payload)
    }

    pub fn transfer(invocation_id: &str, from: &str, to: &str) -> Self {
        Self::new(
            invocation_id,
            EventKind::Transfer,
            from,
            json!({ "from": from, "to": to }),
        )
    }

    pub fn state_merge(invocation_id: &str, flow: &str, payload: Value) -> Self {
        Self::new(invocation_id, EventKind::StateMerge, flow, payload)
    }

    pub fn final_response(invocation_id: &str, source: &str, text: &str) -> Self {
        let mut event = Self::new(
            invocation_id,
            EventKind::FinalResponse,
            source,
            json!({ "text": text }),
        );
        event.is_final = true;
        event
    }

    pub fn fault(invocation_id: &str, source: &str, kind: FaultKind, message: &str) -> Self {
        Self::new(
            invocation_id,
            EventKind::Fault,
            source,
            json!({ "kind": kind, "message": message }),
        )
    }

    /// Text carried by turn, message and final events
    pub fn text(&self) -> Option<&str> {
        self.payload.get("text").and_then(Value::as_str)
    }

    /// Tool name for tool call/result events
    pub fn tool_name(&self) -> Option<&str> {
        self.payload.get("tool").and_then(Value::as_str)
    }

    /// State writes committed by this event, if any
    pub fn state_delta(&self) -> Option<&Value> {
        self.payload.get("state_delta")
    }

    /// Render the event as a conversation message, if it has one
    pub fn to_message(&self) -> Option<Message> {
        match self.kind {
            EventKind::UserMessage => self.text().map(Message::user),
            EventKind::AgentTurn | EventKind::FinalResponse => self
                .text()
                .map(|text| Message::assistant(self.source.clone(), text)),
            EventKind::ToolResult => {
                let tool = self.tool_name()?;
                let result = self.payload.get("result")?;
                Some(Message::tool(tool, result.to_string()))
            }
            _ => None,
        }
    }
}

/// Shared append-only event history
///
/// Clones share the same storage. [`EventLog::fork`] makes an independent
/// copy for a parallel branch.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<RwLock<Vec<Event>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_events(events: Vec<Event>) -> Self {
        Self {
            events: Arc::new(RwLock::new(events)),
        }
    }

    pub fn push(&self, event: Event) {
        self.events
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }

    pub fn snapshot(&self) -> Vec<Event> {
        self.events
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.events
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Independent copy with the same events so far
    pub fn fork(&self) -> Self {
        Self::from_events(self.snapshot())
    }

    /// Whether an event appended at or after `start` committed a write to `key`
    pub fn wrote_since(&self, start: usize, key: &str) -> bool {
        self.events
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .skip(start)
            .filter_map(Event::state_delta)
            .any(|delta| delta.get(key).is_some())
    }

    /// Most recent text emitted by `source`
    pub fn last_text_from(&self, source: &str) -> Option<String> {
        self.events
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .rev()
            .filter(|e| e.source == source && e.kind == EventKind::AgentTurn)
            .find_map(|e| e.text().map(str::to_string))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_final_response_is_only_final_kind() {
        let delta = StateDelta::new();
        assert!(Event::final_response("inv", "a", "done").is_final);
        assert!(!Event::agent_turn("inv", "a", "hi", &delta).is_final);
        assert!(!Event::fault("inv", "a", FaultKind::Tool, "boom").is_final);
    }

    #[test]
    fn test_fork_is_independent() {
        let log = EventLog::new();
        log.push(Event::user_message("inv", "hello"));

        let fork = log.fork();
        fork.push(Event::transfer("inv", "a", "b"));

        assert_eq!(log.len(), 1);
        assert_eq!(fork.len(), 2);
    }

    #[test]
    fn test_last_text_from() {
        let log = EventLog::new();
        let delta = StateDelta::new();
        log.push(Event::agent_turn("inv", "a", "first", &delta));
        log.push(Event::agent_turn("inv", "b", "other", &delta));
        log.push(Event::agent_turn("inv", "a", "second", &delta));
        assert_eq!(log.last_text_from("a").as_deref(), Some("second"));
        assert!(log.last_text_from("c").is_none());
    }

    #[test]
    fn test_wrote_since_only_counts_later_events() {
        let log = EventLog::new();
        let mut delta = StateDelta::new();
        delta.set("workflow_complete", true);
        log.push(Event::agent_turn("inv", "a", "early", &delta));
        let start = log.len();
        log.push(Event::agent_turn("inv", "b", "late", &StateDelta::new()));

        assert!(log.wrote_since(0, "workflow_complete"));
        assert!(!log.wrote_since(start, "workflow_complete"));

        log.push(Event::agent_turn("inv", "c", "again", &delta));
        assert!(log.wrote_since(start, "workflow_complete"));
    }

    #[test]
    fn test_to_message() {
        let event = Event::user_message("inv", "start");
        assert_eq!(event.to_message(), Some(Message::user("start")));
        assert!(Event::transfer("inv", "a", "b").to_message().is_none());
    }
}
