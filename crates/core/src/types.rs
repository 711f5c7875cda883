//! Normalized hit descriptors passed from the dispatcher to trackers.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::error::{BeaconError, BeaconResult};

/// A plain key/value record, the unit stored in the data layer.
pub type Record = Map<String, Value>;

/// The kind of hit a tracker is asked to send.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum HitType {
    #[serde(rename = "event")]
    Event,
    #[serde(rename = "pageview")]
    PageView,
    #[serde(rename = "initData")]
    InitData,
}

impl HitType {
    pub fn as_str(&self) -> &'static str {
        match self {
            HitType::Event => "event",
            HitType::PageView => "pageview",
            HitType::InitData => "initData",
        }
    }
}

impl fmt::Display for HitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HitType {
    type Err = BeaconError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "event" => Ok(HitType::Event),
            "pageview" => Ok(HitType::PageView),
            "initData" => Ok(HitType::InitData),
            other => Err(BeaconError::Usage(format!(
                "unsupported hitType '{other}', expected one of initData, pageview, event"
            ))),
        }
    }
}

/// Hit descriptor built fresh for every fired event and discarded after
/// dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub hit_type: HitType,
    pub category: Option<String>,
    pub action: Option<String>,
    pub label: Option<String>,
    pub value: Option<f64>,
    pub content_id: Option<Value>,
    pub content_id_type: Option<Value>,
    pub custom_dimension: Record,
    /// Free-form payload; carries the user data of `initData` hits.
    pub fields: Record,
}

impl Hit {
    pub fn new(hit_type: HitType) -> Self {
        Self {
            hit_type,
            category: None,
            action: None,
            label: None,
            value: None,
            content_id: None,
            content_id_type: None,
            custom_dimension: Record::new(),
            fields: Record::new(),
        }
    }

    pub fn event(
        category: impl Into<String>,
        action: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            category: Some(category.into()),
            action: Some(action.into()),
            label: Some(label.into()),
            ..Self::new(HitType::Event)
        }
    }

    pub fn page_view() -> Self {
        Self::new(HitType::PageView)
    }

    pub fn init_data(fields: Record) -> Self {
        Self {
            fields,
            ..Self::new(HitType::InitData)
        }
    }

    pub fn with_value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_custom_dimension(mut self, dimensions: Record) -> Self {
        self.custom_dimension = dimensions;
        self
    }

    pub fn with_content(mut self, content_id: impl Into<Value>, content_id_type: impl Into<Value>) -> Self {
        self.content_id = Some(content_id.into());
        self.content_id_type = Some(content_id_type.into());
        self
    }

    /// Parse a hit from a loosely-typed JSON object such as the ones found
    /// in replay scripts.
    ///
    /// Known keys (`hitType`, `category`, `action`, `label`, `value`,
    /// `content_id`, `content_id_type`, `customDimension`) populate the typed
    /// fields; everything else lands in [`Hit::fields`].
    pub fn from_value(value: &Value) -> BeaconResult<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| BeaconError::Type("hit parameters must be an object".into()))?;

        let hit_type = match object.get("hitType") {
            Some(Value::String(s)) => s.parse::<HitType>()?,
            Some(other) => {
                return Err(BeaconError::Usage(format!(
                    "hitType must be a string, got {other}"
                )))
            }
            None => return Err(BeaconError::Usage("hitType is required".into())),
        };

        let mut hit = Hit::new(hit_type);
        for (key, value) in object {
            match key.as_str() {
                "hitType" => {}
                "category" => hit.category = text(value),
                "action" => hit.action = text(value),
                "label" => hit.label = text(value),
                "value" => hit.value = value.as_f64(),
                "content_id" => hit.content_id = Some(value.clone()).filter(|v| !v.is_null()),
                "content_id_type" => {
                    hit.content_id_type = Some(value.clone()).filter(|v| !v.is_null())
                }
                "customDimension" | "custom_dimension" => match value {
                    Value::Object(dims) => hit.custom_dimension = dims.clone(),
                    Value::Null => {}
                    _ => {
                        return Err(BeaconError::Type(
                            "customDimension must be an object".into(),
                        ))
                    }
                },
                _ => {
                    hit.fields.insert(key.clone(), value.clone());
                }
            }
        }
        Ok(hit)
    }
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
