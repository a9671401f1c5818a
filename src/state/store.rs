//! Session state store
//!
//! A [`StateStore`] is a handle: clones share the same map, so every agent,
//! tool and nested flow of one session reads and writes a single source of
//! truth. Parallel branches get a journaled copy via [`StateStore::branch`]
//! and only their journal is merged back.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::state::delta::StateDelta;

#[derive(Debug, Default)]
struct Inner {
    values: Map<String, Value>,
    /// Writes made since the store was branched
    journal: Option<StateDelta>,
}

/// Shared key/value state for one session
#[derive(Debug, Clone, Default)]
pub struct StateStore {
    inner: Arc<RwLock<Inner>>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(values: Map<String, Value>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                values,
                journal: None,
            })),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.read().values.get(key).cloned()
    }

    /// Value for `key`, or `default` when unset
    pub fn get_or(&self, key: &str, default: impl Into<Value>) -> Value {
        self.get(key).unwrap_or_else(|| default.into())
    }

    pub fn get_str(&self, key: &str) -> Option<String> {
        self.get(key).and_then(|v| v.as_str().map(str::to_string))
    }

    /// Whether `key` holds a truthy value (`true`, non-zero, non-empty)
    pub fn is_truthy(&self, key: &str) -> bool {
        match self.read().values.get(key) {
            None | Some(Value::Null) => false,
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
            Some(Value::String(s)) => !s.is_empty(),
            Some(Value::Array(a)) => !a.is_empty(),
            Some(Value::Object(o)) => !o.is_empty(),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.read().values.contains_key(key)
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        let mut inner = self.write();
        if let Some(journal) = inner.journal.as_mut() {
            journal.set(key.clone(), value.clone());
        }
        inner.values.insert(key, value);
    }

    /// Apply every write in `delta` under one lock acquisition
    pub fn apply(&self, delta: &StateDelta) {
        if delta.is_empty() {
            return;
        }
        let mut inner = self.write();
        for (key, value) in delta.iter() {
            if let Some(journal) = inner.journal.as_mut() {
                journal.set(key.clone(), value.clone());
            }
            inner.values.insert(key.clone(), value.clone());
        }
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            values: self.read().values.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.read().values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Independent copy that records its own writes
    pub fn branch(&self) -> StateStore {
        StateStore {
            inner: Arc::new(RwLock::new(Inner {
                values: self.read().values.clone(),
                journal: Some(StateDelta::new()),
            })),
        }
    }

    /// Drain the writes recorded since [`StateStore::branch`]
    pub fn take_journal(&self) -> StateDelta {
        self.write()
            .journal
            .as_mut()
            .map(std::mem::take)
            .unwrap_or_default()
    }

    /// Whether two handles point at the same store
    pub fn same_store(&self, other: &StateStore) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Immutable copy of the state at one point in time
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateSnapshot {
    values: Map<String, Value>,
}

impl StateSnapshot {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    pub fn to_map(&self) -> Map<String, Value> {
        self.values.clone()
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.to_map())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_is_idempotent() {
        let store = StateStore::new();
        store.set("k", "v");
        assert_eq!(store.get("k"), store.get("k"));
        assert_eq!(store.get_or("missing", "fallback"), json!("fallback"));
    }

    #[test]
    fn test_clones_share_storage() {
        let store = StateStore::new();
        let handle = store.clone();
        handle.set("step1_data", "X");
        assert_eq!(store.get_str("step1_data").as_deref(), Some("X"));
        assert!(store.same_store(&handle));
    }

    #[test]
    fn test_snapshot_does_not_follow_later_writes() {
        let store = StateStore::new();
        store.set("k", 1);
        let snap = store.snapshot();
        store.set("k", 2);
        assert_eq!(snap.get("k"), Some(&json!(1)));
        assert_eq!(store.get("k"), Some(json!(2)));
    }

    #[test]
    fn test_branch_journals_only_its_writes() {
        let store = StateStore::new();
        store.set("seed", "s");

        let branch = store.branch();
        assert_eq!(branch.get_str("seed").as_deref(), Some("s"));
        branch.set("result", "Ra");
        store.set("late", true);

        assert!(!branch.contains("late"));
        assert!(!store.contains("result"));

        let journal = branch.take_journal();
        assert_eq!(journal.keys().collect::<Vec<_>>(), vec!["result"]);
        assert!(branch.take_journal().is_empty());
        assert!(store.take_journal().is_empty());
    }

    #[test]
    fn test_truthiness() {
        let store = StateStore::new();
        store.set("yes", true);
        store.set("no", false);
        store.set("zero", 0);
        store.set("text", "done");
        assert!(store.is_truthy("yes"));
        assert!(!store.is_truthy("no"));
        assert!(!store.is_truthy("zero"));
        assert!(store.is_truthy("text"));
        assert!(!store.is_truthy("absent"));
    }
}
