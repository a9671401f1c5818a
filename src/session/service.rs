//! Session services - where sessions live between runs

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::debug;

use crate::core::{FlowError, Result};
use crate::session::session::Session;

/// Backing store for sessions
#[async_trait]
pub trait SessionService: Send + Sync {
    /// Create an empty session
    async fn create(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: Option<&str>,
    ) -> Result<Session> {
        self.create_with_state(app_name, user_id, session_id, Map::new())
            .await
    }

    /// Create a session seeded with initial state
    async fn create_with_state(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: Option<&str>,
        state: Map<String, Value>,
    ) -> Result<Session>;

    async fn get(&self, user_id: &str, session_id: &str) -> Result<Session>;

    /// Persist the session's current state and history
    async fn save(&self, session: &Session) -> Result<()>;

    async fn delete(&self, user_id: &str, session_id: &str) -> Result<()>;

    /// Session ids of a user, sorted
    async fn list(&self, user_id: &str) -> Result<Vec<String>>;
}

/// Keeps sessions in process memory
///
/// `get` hands out the live session, so its state is shared with every run
/// using it.
#[derive(Debug, Clone, Default)]
pub struct InMemorySessionService {
    sessions: Arc<RwLock<HashMap<(String, String), Session>>>,
}

impl InMemorySessionService {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionService for InMemorySessionService {
    async fn create_with_state(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: Option<&str>,
        state: Map<String, Value>,
    ) -> Result<Session> {
        let session = Session::new(app_name, user_id, session_id, state);
        let key = (user_id.to_string(), session.id.clone());

        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&key) {
            return Err(FlowError::SessionExists(session.id));
        }
        debug!(user = user_id, session = %session.id, "session created");
        sessions.insert(key, session.clone());
        Ok(session)
    }

    async fn get(&self, user_id: &str, session_id: &str) -> Result<Session> {
        self.sessions
            .read()
            .await
            .get(&(user_id.to_string(), session_id.to_string()))
            .cloned()
            .ok_or_else(|| FlowError::SessionNotFound {
                user_id: user_id.to_string(),
                session_id: session_id.to_string(),
            })
    }

    async fn save(&self, session: &Session) -> Result<()> {
        self.sessions.write().await.insert(
            (session.user_id.clone(), session.id.clone()),
            session.clone(),
        );
        Ok(())
    }

    async fn delete(&self, user_id: &str, session_id: &str) -> Result<()> {
        self.sessions
            .write()
            .await
            .remove(&(user_id.to_string(), session_id.to_string()))
            .map(|_| ())
            .ok_or_else(|| FlowError::SessionNotFound {
                user_id: user_id.to_string(),
                session_id: session_id.to_string(),
            })
    }

    async fn list(&self, user_id: &str) -> Result<Vec<String>> {
        let mut ids: Vec<String> = self
            .sessions
            .read()
            .await
            .keys()
            .filter(|(user, _)| user == user_id)
            .map(|(_, id)| id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_create_get_shares_state() {
        let service = InMemorySessionService::new();
        let created = service
            .create("agentflow", "user_123", Some("session_456"))
            .await
            .unwrap();
        created.state.set("step1_data", "X");

        let fetched = service.get("user_123", "session_456").await.unwrap();
        assert_eq!(fetched.state.get("step1_data"), Some(json!("X")));
        assert!(fetched.state.same_store(&created.state));
    }

    #[tokio::test]
    async fn test_duplicate_and_missing() {
        let service = InMemorySessionService::new();
        service.create("app", "u", Some("s")).await.unwrap();
        assert!(matches!(
            service.create("app", "u", Some("s")).await,
            Err(FlowError::SessionExists(_))
        ));
        assert!(matches!(
            service.get("other", "s").await,
            Err(FlowError::SessionNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_initial_state_list_and_delete() {
        let service = InMemorySessionService::new();
        let mut state = Map::new();
        state.insert("user_name".into(), json!("Ada"));
        let session = service
            .create_with_state("app", "u", Some("b"), state)
            .await
            .unwrap();
        service.create("app", "u", Some("a")).await.unwrap();

        assert_eq!(session.state.get_str("user_name").as_deref(), Some("Ada"));
        assert_eq!(service.list("u").await.unwrap(), vec!["a", "b"]);

        service.delete("u", "a").await.unwrap();
        assert_eq!(service.list("u").await.unwrap(), vec!["b"]);
        assert!(service.delete("u", "a").await.is_err());
    }
}
