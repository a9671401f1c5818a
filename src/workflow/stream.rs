//! Lazy event stream handed to callers of a run

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio_stream::wrappers::ReceiverStream;

use crate::core::{Event, EventKind, FaultKind};

/// Lifecycle of one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Done,
    Failed { kind: FaultKind, message: String },
    Cancelled,
}

impl RunStatus {
    pub fn is_done(&self) -> bool {
        matches!(self, RunStatus::Done)
    }

    pub fn is_finished(&self) -> bool {
        !matches!(self, RunStatus::Running)
    }

    /// Fault kind of a failed run
    pub fn fault_kind(&self) -> Option<FaultKind> {
        match self {
            RunStatus::Failed { kind, .. } => Some(*kind),
            RunStatus::Cancelled => Some(FaultKind::Cancelled),
            _ => None,
        }
    }
}

/// Events of a run, produced as the consumer pulls them
///
/// The engine runs at most one event ahead of the consumer. Dropping the
/// stream cancels the run.
pub struct EventStream {
    invocation_id: String,
    events: ReceiverStream<Event>,
    status: watch::Receiver<RunStatus>,
}

impl EventStream {
    pub(crate) fn new(
        invocation_id: String,
        events: ReceiverStream<Event>,
        status: watch::Receiver<RunStatus>,
    ) -> Self {
        Self {
            invocation_id,
            events,
            status,
        }
    }

    pub fn invocation_id(&self) -> &str {
        &self.invocation_id
    }

    /// Current status; settles once the stream is exhausted
    pub fn status(&self) -> RunStatus {
        self.status.borrow().clone()
    }

    /// Drain the remaining events and wait for the run to settle
    pub async fn finish(mut self) -> RunReport {
        let mut events = Vec::new();
        while let Some(event) = self.next().await {
            events.push(event);
        }

        let status = match self.status.wait_for(RunStatus::is_finished).await {
            Ok(status) => status.clone(),
            // Driver vanished without reporting
            Err(_) => RunStatus::Cancelled,
        };

        RunReport {
            invocation_id: self.invocation_id,
            events,
            status,
        }
    }
}

impl Stream for EventStream {
    type Item = Event;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.events).poll_next(cx)
    }
}

impl std::fmt::Debug for EventStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStream")
            .field("invocation_id", &self.invocation_id)
            .field("status", &*self.status.borrow())
            .finish_non_exhaustive()
    }
}

/// Everything a finished run produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub invocation_id: String,
    pub events: Vec<Event>,
    pub status: RunStatus,
}

impl RunReport {
    /// The event marked final, present only for completed runs
    pub fn final_response(&self) -> Option<&Event> {
        self.events.iter().find(|e| e.is_final)
    }

    pub fn final_text(&self) -> Option<&str> {
        self.final_response().and_then(Event::text)
    }

    /// Terminal fault event of a failed run
    pub fn fault(&self) -> Option<&Event> {
        self.events.iter().rev().find(|e| e.kind == EventKind::Fault)
    }

    pub fn events_of(&self, kind: EventKind) -> impl Iterator<Item = &Event> {
        self.events.iter().filter(move |e| e.kind == kind)
    }

    /// Sources of agent turns, in order
    pub fn turn_sources(&self) -> Vec<&str> {
        self.events_of(EventKind::AgentTurn)
            .map(|e| e.source.as_str())
            .collect()
    }
}
