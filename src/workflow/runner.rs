//! Runner - drives a workflow against a session
//!
//! Each run is spawned onto the runtime and reports through an
//! [`EventStream`]. The session is saved once the run settles, whatever the
//! outcome.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::core::config::RunnerConfig;
use crate::core::{Event, FlowError, Result};
use crate::session::{Session, SessionService};
use crate::workflow::context::{RunContext, RunIdentity};
use crate::workflow::graph::Workflow;
use crate::workflow::node::execute_node;
use crate::workflow::stream::{EventStream, RunReport, RunStatus};

/// Executes one workflow on behalf of many sessions
#[derive(Clone)]
pub struct Runner {
    workflow: Arc<Workflow>,
    sessions: Arc<dyn SessionService>,
    config: Arc<RunnerConfig>,
}

impl Runner {
    pub fn new(workflow: Workflow, sessions: Arc<dyn SessionService>) -> Self {
        Self::with_config(workflow, sessions, RunnerConfig::default())
    }

    pub fn with_config(
        workflow: Workflow,
        sessions: Arc<dyn SessionService>,
        config: RunnerConfig,
    ) -> Self {
        Self {
            workflow: Arc::new(workflow),
            sessions,
            config: Arc::new(config),
        }
    }

    pub fn workflow(&self) -> &Workflow {
        &self.workflow
    }

    pub fn sessions(&self) -> &Arc<dyn SessionService> {
        &self.sessions
    }

    /// Start a run for `message` and return its event stream
    ///
    /// Must be called from within a tokio runtime.
    pub fn run(&self, session: &Session, message: impl Into<String>) -> EventStream {
        let invocation_id = Uuid::new_v4().to_string();
        let (tx, rx) = mpsc::channel(self.config.event_buffer.max(1));
        let (status_tx, status_rx) = watch::channel(RunStatus::Running);

        let identity = RunIdentity {
            invocation_id: invocation_id.clone(),
            session_id: session.id.clone(),
            app_name: session.app_name.clone(),
            user_id: session.user_id.clone(),
            user_message: message.into(),
        };
        let ctx = RunContext::new(
            identity,
            session.state.clone(),
            session.history.clone(),
            tx,
            self.workflow.agents(),
            Arc::clone(&self.config),
        );

        let span = info_span!(
            "run",
            workflow = %self.workflow.name(),
            session = %session.id,
            invocation = %invocation_id,
        );
        let workflow = Arc::clone(&self.workflow);
        let sessions = Arc::clone(&self.sessions);
        let session = session.clone();

        tokio::spawn(
            async move {
                let status = drive(&workflow, &ctx).await;
                if let Err(err) = sessions.save(&session).await {
                    warn!(error = %err, "failed to save session");
                }
                info!(?status, "run settled");
                let _ = status_tx.send(status);
                // Closing the channel ends the stream after the status is set
                drop(ctx);
            }
            .instrument(span),
        );

        EventStream::new(invocation_id, ReceiverStream::new(rx), status_rx)
    }

    /// Run to completion and collect every event
    pub async fn run_to_end(&self, session: &Session, message: impl Into<String>) -> RunReport {
        self.run(session, message).finish().await
    }

    /// Load a session from the service and run against it
    pub async fn run_session(
        &self,
        user_id: &str,
        session_id: &str,
        message: impl Into<String>,
    ) -> Result<EventStream> {
        let session = self.sessions.get(user_id, session_id).await?;
        Ok(self.run(&session, message))
    }
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("workflow", &self.workflow.name())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Run the workflow and turn its outcome into a status
async fn drive(workflow: &Workflow, ctx: &RunContext) -> RunStatus {
    match execute(workflow, ctx).await {
        Ok(()) => RunStatus::Done,
        Err(FlowError::Cancelled) => {
            info!("consumer went away, run cancelled");
            RunStatus::Cancelled
        }
        Err(err) => {
            let kind = err.kind();
            let message = err.to_string();
            warn!(%kind, error = %message, "run failed");
            let fault = Event::fault(ctx.invocation_id(), workflow.name(), kind, &message);
            if ctx.emit(fault).await.is_err() {
                return RunStatus::Cancelled;
            }
            RunStatus::Failed { kind, message }
        }
    }
}

async fn execute(workflow: &Workflow, ctx: &RunContext) -> Result<()> {
    ctx.emit(Event::user_message(ctx.invocation_id(), ctx.user_message()))
        .await?;
    let output = execute_node(workflow.root(), ctx).await?;
    ctx.emit(Event::final_response(
        ctx.invocation_id(),
        &output.source,
        &output.text,
    ))
    .await
}
