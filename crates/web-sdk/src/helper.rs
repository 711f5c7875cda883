//! Stateless helpers shared by the dispatcher and the trackers.

use chrono::{DateTime, Local, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::constants::{CURRENT_NAV_SELECTOR, NAV_LABEL_ATTRIBUTE};
use crate::dom::Document;
use beacon_core::Record;

/// Timestamp pair attached to every record the trackers produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyticsTime {
    /// Local wall-clock time, `YYYY-MM-DDTHH:mm:ss.SSS`.
    pub transaction_local_dt: String,
    /// ISO-8601 UTC instant with millisecond precision.
    pub transaction_dt: String,
}

impl AnalyticsTime {
    pub fn insert_into(&self, record: &mut Record) {
        record.insert(
            "transaction_local_dt".into(),
            Value::String(self.transaction_local_dt.clone()),
        );
        record.insert("transaction_dt".into(), Value::String(self.transaction_dt.clone()));
    }
}

/// Label of the current navigation element, if the page has one.
pub fn find_label(document: &Document) -> Option<String> {
    let node = document.query_selector(None, CURRENT_NAV_SELECTOR).ok()??;
    document
        .element(node)?
        .attribute(NAV_LABEL_ATTRIBUTE)
        .map(str::to_string)
}

pub fn get_analytics_time() -> AnalyticsTime {
    analytics_time_at(Utc::now())
}

/// Format both halves of the timestamp pair from one instant.
pub fn analytics_time_at(instant: DateTime<Utc>) -> AnalyticsTime {
    let local = instant.with_timezone(&Local);
    AnalyticsTime {
        transaction_local_dt: local.format("%Y-%m-%dT%H:%M:%S%.3f").to_string(),
        transaction_dt: instant.to_rfc3339_opts(SecondsFormat::Millis, true),
    }
}

/// Random (version 4) UUID drawn from the operating system's CSPRNG.
pub fn uuidv4() -> String {
    Uuid::new_v4().to_string()
}

/// Canonicalize a boolean-like value to "0" or "1".
///
/// Accepts booleans, numbers (zero is false) and the strings "0", "1",
/// "true" and "false" in any case. Anything else is "0".
pub fn convert_boolean_values_to_string(value: &Value) -> &'static str {
    let truthy = match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => s == "1" || s.eq_ignore_ascii_case("true"),
        _ => false,
    };
    if truthy {
        "1"
    } else {
        "0"
    }
}

/// True if `value` is not an object or is an object without keys.
pub fn is_empty_object(value: &Value) -> bool {
    value.as_object().map_or(true, |object| object.is_empty())
}
