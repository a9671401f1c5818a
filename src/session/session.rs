//! Session - identity, state and history of one conversation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::core::{Event, EventLog};
use crate::state::StateStore;

/// Run-scoped bundle of identity, state and event history
///
/// Clones share the same state store and history.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub app_name: String,
    pub user_id: String,
    pub state: StateStore,
    pub history: EventLog,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// New session; a fresh id is generated when none is given
    pub fn new(
        app_name: impl Into<String>,
        user_id: impl Into<String>,
        session_id: Option<&str>,
        state: Map<String, Value>,
    ) -> Self {
        Self {
            id: session_id
                .map(str::to_string)
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            app_name: app_name.into(),
            user_id: user_id.into(),
            state: StateStore::from_map(state),
            history: EventLog::new(),
            created_at: Utc::now(),
        }
    }

    /// Serialisable copy of the session as it is now
    pub fn to_record(&self) -> SessionRecord {
        SessionRecord {
            id: self.id.clone(),
            app_name: self.app_name.clone(),
            user_id: self.user_id.clone(),
            state: self.state.snapshot().to_map(),
            events: self.history.snapshot(),
            created_at: self.created_at,
            updated_at: Utc::now(),
        }
    }

    pub fn from_record(record: SessionRecord) -> Self {
        Self {
            id: record.id,
            app_name: record.app_name,
            user_id: record.user_id,
            state: StateStore::from_map(record.state),
            history: EventLog::from_events(record.events),
            created_at: record.created_at,
        }
    }
}

/// Persisted form of a [`Session`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,
    pub app_name: String,
    pub user_id: String,
    #[serde(default)]
    pub state: Map<String, Value>,
    #[serde(default)]
    pub events: Vec<Event>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_round_trip_keeps_state_and_history() {
        let session = Session::new("agentflow", "user_123", Some("s1"), Map::new());
        session.state.set("step1_data", "X");
        session.history.push(Event::user_message("inv", "start"));

        let restored = Session::from_record(session.to_record());
        assert_eq!(restored.id, "s1");
        assert_eq!(restored.state.get("step1_data"), Some(json!("X")));
        assert_eq!(restored.history.len(), 1);
        assert!(!restored.state.same_store(&session.state));
    }

    #[test]
    fn test_generated_id() {
        let session = Session::new("agentflow", "u", None, Map::new());
        assert!(Uuid::parse_str(&session.id).is_ok());
    }
}
