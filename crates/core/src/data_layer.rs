//! The data layer: a page-wide, append-only log of plain records.
//!
//! The hosting page and every tag-manager tracker share one [`DataLayer`].
//! Entries are never mutated or removed, so readers only ever observe the log
//! growing between polls.

use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::error::{BeaconError, BeaconResult};
use crate::types::Record;

/// Cloneable handle over the shared log.
#[derive(Debug, Clone, Default)]
pub struct DataLayer {
    entries: Arc<RwLock<Vec<Record>>>,
}

impl DataLayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record. Returns the new length of the log.
    pub fn push(&self, record: Record) -> usize {
        let event = event_name(&record).unwrap_or("");
        let mut entries = self.entries.write();
        debug!(
            event,
            position = entries.len(),
            "data layer push"
        );
        entries.push(record);
        entries.len()
    }

    /// Append an arbitrary JSON value; only objects are accepted.
    pub fn push_value(&self, value: Value) -> BeaconResult<usize> {
        match value {
            Value::Object(record) => Ok(self.push(record)),
            other => Err(BeaconError::Type(format!(
                "data layer entries must be objects, got {other}"
            ))),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Copy of the current log contents.
    pub fn snapshot(&self) -> Vec<Record> {
        self.entries.read().clone()
    }

    /// True if any entry's `event` field equals `name`.
    pub fn has_event(&self, name: &str) -> bool {
        self.entries.read().iter().any(|entry| event_name(entry) == Some(name))
    }

    /// True if any entry carries `key`, whatever its value.
    pub fn has_key(&self, key: &str) -> bool {
        self.entries.read().iter().any(|entry| entry.contains_key(key))
    }

    /// Most recent entry whose `event` field equals `name`.
    pub fn last_event(&self, name: &str) -> Option<Record> {
        self.entries
            .read()
            .iter()
            .rev()
            .find(|entry| event_name(entry) == Some(name))
            .cloned()
    }

    /// All entries whose `event` field equals `name`, oldest first.
    pub fn events_named(&self, name: &str) -> Vec<Record> {
        self.entries
            .read()
            .iter()
            .filter(|entry| event_name(entry) == Some(name))
            .cloned()
            .collect()
    }

    pub fn count_event(&self, name: &str) -> usize {
        self.entries
            .read()
            .iter()
            .filter(|entry| event_name(entry) == Some(name))
            .count()
    }
}

fn event_name(entry: &Record) -> Option<&str> {
    entry.get("event").and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_push_and_lookup() {
        let layer = DataLayer::new();
        assert!(layer.is_empty());

        layer.push(record(json!({"event": "gtm.js"})));
        layer.push(record(json!({"event": "pageview", "page": 1})));
        layer.push(record(json!({"login_session_id": "s-1"})));
        layer.push(record(json!({"event": "pageview", "page": 2})));

        assert_eq!(layer.len(), 4);
        assert!(layer.has_event("pageview"));
        assert!(!layer.has_event("gtm.load"));
        assert!(layer.has_key("login_session_id"));
        assert!(!layer.has_event("login_session_id"));
        assert_eq!(layer.last_event("pageview").unwrap()["page"], 2);
        assert_eq!(layer.count_event("pageview"), 2);
        assert_eq!(layer.events_named("pageview")[0]["page"], 1);
    }

    #[test]
    fn test_clones_share_entries() {
        let layer = DataLayer::new();
        let host = layer.clone();
        host.push(record(json!({"event": "gtm.load"})));
        assert!(layer.has_event("gtm.load"));
    }

    #[test]
    fn test_push_value_rejects_non_objects() {
        let layer = DataLayer::new();
        assert!(layer.push_value(json!("gtm.load")).is_err());
        assert_eq!(layer.push_value(json!({"event": "gtm.load"})).unwrap(), 1);
    }

    #[test]
    fn test_push_records_without_string_event() {
        let layer = DataLayer::new();
        assert_eq!(layer.push(record(json!({"login_session_id": "s-1"}))), 1);
        assert_eq!(layer.push(record(json!({"event": 7}))), 2);
        assert!(layer.has_key("login_session_id"));
        assert!(!layer.has_event("7"));
    }
}
