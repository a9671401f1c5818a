//! Per-invocation execution context
//!
//! A [`RunContext`] carries everything a node needs while running: session
//! identity, the state handle, the history, and the event channel. Parallel
//! branches get their own context via [`RunContext::branch`].

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::agent::Agent;
use crate::core::config::RunnerConfig;
use crate::core::{Event, EventLog, FlowError, Result};
use crate::state::StateStore;

/// Execution context handed to every node of a run
#[derive(Clone)]
pub struct RunContext {
    invocation_id: String,
    session_id: String,
    app_name: String,
    user_id: String,
    user_message: String,
    state: StateStore,
    history: EventLog,
    tx: mpsc::Sender<Event>,
    agents: Arc<HashMap<String, Arc<Agent>>>,
    config: Arc<RunnerConfig>,
}

/// Identity of the session a run belongs to
#[derive(Debug, Clone)]
pub(crate) struct RunIdentity {
    pub invocation_id: String,
    pub session_id: String,
    pub app_name: String,
    pub user_id: String,
    pub user_message: String,
}

impl RunContext {
    pub(crate) fn new(
        identity: RunIdentity,
        state: StateStore,
        history: EventLog,
        tx: mpsc::Sender<Event>,
        agents: Arc<HashMap<String, Arc<Agent>>>,
        config: Arc<RunnerConfig>,
    ) -> Self {
        Self {
            invocation_id: identity.invocation_id,
            session_id: identity.session_id,
            app_name: identity.app_name,
            user_id: identity.user_id,
            user_message: identity.user_message,
            state,
            history,
            tx,
            agents,
            config,
        }
    }

    /// Record an event in the history and hand it to the consumer
    ///
    /// Suspends until the consumer has room. A closed channel means the
    /// consumer went away, which cancels the run.
    pub async fn emit(&self, event: Event) -> Result<()> {
        self.history.push(event.clone());
        self.tx.send(event).await.map_err(|_| FlowError::Cancelled)
    }

    /// Resolves once the consumer of this context's events is gone
    pub async fn cancelled(&self) {
        self.tx.closed().await
    }

    /// Context for a parallel branch
    ///
    /// The branch writes into a journaled copy of the state, sees a fork of
    /// the history, and sends its events to `tx`.
    pub(crate) fn branch(&self, tx: mpsc::Sender<Event>) -> Self {
        Self {
            state: self.state.branch(),
            history: self.history.fork(),
            tx,
            ..self.clone()
        }
    }

    pub fn invocation_id(&self) -> &str {
        &self.invocation_id
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Message that started the run
    pub fn user_message(&self) -> &str {
        &self.user_message
    }

    pub fn state(&self) -> &StateStore {
        &self.state
    }

    pub fn history(&self) -> &EventLog {
        &self.history
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Look up an agent of the workflow by name
    pub fn agent(&self, name: &str) -> Option<Arc<Agent>> {
        self.agents.get(name).cloned()
    }

    /// Standalone context for unit tests; events land in the returned receiver
    #[cfg(test)]
    pub(crate) fn detached(user_message: &str) -> (Self, mpsc::Receiver<Event>) {
        let (tx, rx) = mpsc::channel(64);
        let identity = RunIdentity {
            invocation_id: "test-invocation".to_string(),
            session_id: "test-session".to_string(),
            app_name: "agentflow".to_string(),
            user_id: "tester".to_string(),
            user_message: user_message.to_string(),
        };
        let ctx = Self::new(
            identity,
            StateStore::new(),
            EventLog::new(),
            tx,
            Arc::new(HashMap::new()),
            Arc::new(RunnerConfig::default()),
        );
        (ctx, rx)
    }
}

impl std::fmt::Debug for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("invocation_id", &self.invocation_id)
            .field("session_id", &self.session_id)
            .field("state_keys", &self.state.len())
            .field("history", &self.history.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_emit_records_history() {
        let (ctx, mut rx) = RunContext::detached("hello");
        ctx.emit(Event::user_message(ctx.invocation_id(), "hello"))
            .await
            .unwrap();

        assert_eq!(ctx.history().len(), 1);
        assert_eq!(rx.recv().await.unwrap().text(), Some("hello"));
    }

    #[tokio::test]
    async fn test_emit_after_consumer_drop_is_cancelled() {
        let (ctx, rx) = RunContext::detached("hello");
        drop(rx);
        let err = ctx
            .emit(Event::user_message(ctx.invocation_id(), "hello"))
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::Cancelled));
        ctx.cancelled().await;
    }

    #[tokio::test]
    async fn test_branch_isolates_state_and_history() {
        let (ctx, _rx) = RunContext::detached("hello");
        ctx.state().set("shared", 1);

        let (branch_tx, _branch_rx) = mpsc::channel(4);
        let branch = ctx.branch(branch_tx);
        branch.state().set("local", 2);
        branch.history().push(Event::user_message("x", "y"));

        assert_eq!(branch.state().get("shared"), Some(serde_json::json!(1)));
        assert!(!ctx.state().contains("local"));
        assert!(ctx.history().is_empty());
        assert_eq!(branch.state().take_journal().len(), 1);
    }
}
