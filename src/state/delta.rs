//! Buffered state writes

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An ordered buffer of state writes
///
/// Writing the same key twice keeps the later value. Used by tool contexts,
/// parallel branch journals and merge events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateDelta {
    writes: Map<String, Value>,
}

impl StateDelta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.writes.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.writes.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.writes.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.writes.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.writes.iter()
    }

    /// Fold `other` into this buffer; `other` wins on shared keys
    pub fn extend(&mut self, other: StateDelta) {
        for (key, value) in other.writes {
            self.writes.insert(key, value);
        }
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.writes.clone())
    }
}

impl From<Map<String, Value>> for StateDelta {
    fn from(writes: Map<String, Value>) -> Self {
        Self { writes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_later_write_wins() {
        let mut delta = StateDelta::new();
        delta.set("k", "first");
        delta.set("k", "second");
        assert_eq!(delta.len(), 1);
        assert_eq!(delta.get("k"), Some(&json!("second")));
    }

    #[test]
    fn test_extend_prefers_other() {
        let mut a = StateDelta::new();
        a.set("shared", 1);
        a.set("only_a", true);
        let mut b = StateDelta::new();
        b.set("shared", 2);

        a.extend(b);
        assert_eq!(a.get("shared"), Some(&json!(2)));
        assert!(a.contains("only_a"));
    }
}
