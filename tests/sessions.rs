//! Session persistence integration tests
//!
//! Runs the demo workflows against in-memory and file-backed session
//! services and checks what survives between runs.

use std::sync::Arc;

use serde_json::{json, Map};
use tokio_test::{assert_err, assert_ok};

use agentflow::cli::DemoWorkflow;
use agentflow::core::config::{Config, StorageBackend};
use agentflow::session::{FileSessionService, InMemorySessionService, SessionService};
use agentflow::{EventKind, Runner};

#[tokio::test]
async fn test_pipeline_demo_with_file_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let sessions: Arc<dyn SessionService> = Arc::new(FileSessionService::new(dir.path()));
    let session = sessions
        .create("stateful_pipeline_app", "user123", Some("sessionABC"))
        .await
        .unwrap();

    let runner = Runner::new(DemoWorkflow::Pipeline.build().unwrap(), Arc::clone(&sessions));
    let report = runner
        .run_to_end(&session, DemoWorkflow::Pipeline.sample_prompt())
        .await;
    assert!(report.status.is_done());

    let reloaded = sessions.get("user123", "sessionABC").await.unwrap();
    assert_eq!(
        reloaded.state.get("final_result"),
        Some(json!("Finalized: Processed: Initial data processed"))
    );
    assert_eq!(reloaded.state.get("workflow_complete"), Some(json!(true)));
    assert_eq!(reloaded.history.len(), report.events.len());
    assert_eq!(
        reloaded.history.snapshot().last().map(|e| e.kind),
        Some(EventKind::FinalResponse)
    );
}

#[tokio::test]
async fn test_history_accumulates_across_runs() {
    let sessions = Arc::new(InMemorySessionService::new());
    let session = sessions.create("app", "u", Some("s")).await.unwrap();
    let runner = Runner::new(DemoWorkflow::Router.build().unwrap(), sessions.clone());

    let first = runner.run_to_end(&session, "Process query for option A").await;
    let second = runner.run_to_end(&session, "Process query for option B").await;

    assert_ne!(first.invocation_id, second.invocation_id);
    assert_eq!(
        session.history.len(),
        first.events.len() + second.events.len()
    );

    let finals: Vec<String> = session
        .history
        .snapshot()
        .into_iter()
        .filter(|e| e.is_final)
        .map(|e| e.source)
        .collect();
    assert_eq!(finals, vec!["LeftAgent", "RightAgent"]);
}

#[tokio::test]
async fn test_run_session_by_id() {
    let sessions = Arc::new(InMemorySessionService::new());
    let mut state = Map::new();
    state.insert("user_name".into(), json!("Ada"));
    assert_ok!(
        sessions
            .create_with_state("app", "u", Some("seeded"), state)
            .await
    );

    let runner = Runner::new(DemoWorkflow::Parallel.build().unwrap(), sessions.clone());
    let stream = assert_ok!(runner.run_session("u", "seeded", "Run both tasks.").await);
    let report = stream.finish().await;
    assert!(report.status.is_done());

    let session = sessions.get("u", "seeded").await.unwrap();
    assert_eq!(session.state.get("user_name"), Some(json!("Ada")));
    assert_eq!(session.state.get("task_a_result"), Some(json!("Task A result")));
    assert_eq!(session.state.get("task_b_result"), Some(json!("Task B result")));
    assert_eq!(session.state.get("task_b_summary"), Some(json!("Task B finished.")));
    // Both branches write it; B is declared last
    assert_eq!(session.state.get("last_task"), Some(json!("B")));

    assert_err!(runner.run_session("u", "missing", "hi").await);
}

#[test]
fn test_config_round_trip_and_storage_choice() {
    let mut config = Config::default();
    config.storage.backend = StorageBackend::File;
    config.runner.max_transfers = 2;

    let text = toml::to_string_pretty(&config).unwrap();
    let parsed = Config::from_toml(&text).unwrap();
    assert_eq!(parsed.storage.backend, StorageBackend::File);
    assert_eq!(parsed.runner.max_transfers, 2);
}
