//! Event descriptors: declarative bindings from a DOM event on some target
//! to the category/action/label of an analytics hit.

use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use beacon_core::{BeaconError, BeaconResult, Record};

use crate::dom::{DomEvent, ElementRef};

/// Where a descriptor listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Listen directly on every element matching the selector.
    Selector(String),
    /// Listen on each `parent` match and accept events whose target lies in
    /// one of its `element` descendants.
    Delegated { element: String, parent: String },
}

impl Target {
    pub fn selector(selector: impl Into<String>) -> Self {
        Target::Selector(selector.into())
    }

    pub fn delegated(element: impl Into<String>, parent: impl Into<String>) -> Self {
        Target::Delegated {
            element: element.into(),
            parent: parent.into(),
        }
    }

    pub fn is_bubbling(&self) -> bool {
        matches!(self, Target::Delegated { .. })
    }

    /// Selector resolved when the descriptor is attached.
    pub fn root_selector(&self) -> &str {
        match self {
            Target::Selector(selector) => selector,
            Target::Delegated { parent, .. } => parent,
        }
    }

    fn from_json(value: &Value) -> BeaconResult<Self> {
        match value {
            Value::String(selector) => Ok(Target::Selector(selector.clone())),
            Value::Object(object) => {
                let element = object.get("element").and_then(Value::as_str);
                let parent = object.get("parent").and_then(Value::as_str);
                match (element, parent) {
                    (Some(element), Some(parent)) => Ok(Target::delegated(element, parent)),
                    _ => Err(BeaconError::Type(
                        "delegated target needs string 'element' and 'parent'".into(),
                    )),
                }
            }
            other => Err(BeaconError::Type(format!("invalid target {other}"))),
        }
    }
}

pub type ComputeFn<T> = Arc<dyn Fn(&DomEvent, &ElementRef, usize) -> T + Send + Sync>;
pub type Condition = Arc<dyn Fn(&DomEvent, &ElementRef, usize) -> bool + Send + Sync>;
pub type DimensionFn = Arc<dyn Fn(&DomEvent, &ElementRef, usize) -> Record + Send + Sync>;

/// A descriptor field fixed at declaration time or computed when the event
/// fires.
pub enum Field<T> {
    Literal(T),
    Computed(ComputeFn<T>),
}

impl<T: Clone> Field<T> {
    pub fn computed<F>(f: F) -> Self
    where
        F: Fn(&DomEvent, &ElementRef, usize) -> T + Send + Sync + 'static,
    {
        Field::Computed(Arc::new(f))
    }

    pub fn resolve(&self, event: &DomEvent, element: &ElementRef, index: usize) -> T {
        match self {
            Field::Literal(value) => value.clone(),
            Field::Computed(f) => f(event, element, index),
        }
    }
}

impl<T: Clone> Clone for Field<T> {
    fn clone(&self) -> Self {
        match self {
            Field::Literal(value) => Field::Literal(value.clone()),
            Field::Computed(f) => Field::Computed(Arc::clone(f)),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Field<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Field::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

impl From<&str> for Field<String> {
    fn from(value: &str) -> Self {
        Field::Literal(value.to_string())
    }
}

impl From<String> for Field<String> {
    fn from(value: String) -> Self {
        Field::Literal(value)
    }
}

impl From<f64> for Field<f64> {
    fn from(value: f64) -> Self {
        Field::Literal(value)
    }
}

/// Binding of one DOM event type on a target to an analytics hit.
#[derive(Clone)]
pub struct EventDescriptor {
    pub target: Target,
    pub event_type: String,
    pub category: Field<String>,
    pub action: Field<String>,
    pub label: Field<String>,
    pub value: Option<Field<f64>>,
    pub send_condition: Option<Condition>,
    pub custom_dimension: Option<DimensionFn>,
}

impl EventDescriptor {
    pub fn new(
        target: Target,
        event_type: impl Into<String>,
        category: impl Into<Field<String>>,
        action: impl Into<Field<String>>,
        label: impl Into<Field<String>>,
    ) -> Self {
        Self {
            target,
            event_type: event_type.into(),
            category: category.into(),
            action: action.into(),
            label: label.into(),
            value: None,
            send_condition: None,
            custom_dimension: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<Field<f64>>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Only send when `condition` holds for the matched element.
    pub fn when<F>(mut self, condition: F) -> Self
    where
        F: Fn(&DomEvent, &ElementRef, usize) -> bool + Send + Sync + 'static,
    {
        self.send_condition = Some(Arc::new(condition));
        self
    }

    pub fn with_custom_dimension<F>(mut self, dimensions: F) -> Self
    where
        F: Fn(&DomEvent, &ElementRef, usize) -> Record + Send + Sync + 'static,
    {
        self.custom_dimension = Some(Arc::new(dimensions));
        self
    }

    /// Build a descriptor from configuration JSON. Only literal fields can
    /// be expressed this way.
    pub fn from_json(value: &Value) -> BeaconResult<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| BeaconError::Type("event descriptor must be an object".into()))?;
        let target = Target::from_json(
            object
                .get("target")
                .ok_or_else(|| BeaconError::Type("event descriptor needs a target".into()))?,
        )?;
        let event_type = object
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| BeaconError::Type("event descriptor needs a string type".into()))?;
        let text = |key: &str| {
            object
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        let mut descriptor =
            Self::new(target, event_type, text("category"), text("action"), text("label"));
        if let Some(value) = object.get("value").and_then(Value::as_f64) {
            descriptor = descriptor.with_value(value);
        }
        Ok(descriptor)
    }
}

impl fmt::Debug for EventDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDescriptor")
            .field("target", &self.target)
            .field("event_type", &self.event_type)
            .field("category", &self.category)
            .field("action", &self.action)
            .field("label", &self.label)
            .field("value", &self.value)
            .field("send_condition", &self.send_condition.is_some())
            .field("custom_dimension", &self.custom_dimension.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{Document, Element};
    use serde_json::json;

    fn fired(doc: &Document) -> (DomEvent, ElementRef) {
        let node = doc
            .append(doc.body(), Element::new("button").with_attribute("data-name", "save"))
            .unwrap();
        let event = DomEvent {
            event_type: "click".into(),
            target: node,
            current_target: node,
        };
        (event, doc.element(node).unwrap())
    }

    #[test]
    fn test_literal_and_computed_fields() {
        let doc = Document::new();
        let (event, element) = fired(&doc);

        let literal: Field<String> = "nav".into();
        assert_eq!(literal.resolve(&event, &element, 0), "nav");

        let computed = Field::computed(|_: &DomEvent, el: &ElementRef, index: usize| {
            format!("{}-{index}", el.attribute("data-name").unwrap_or(""))
        });
        assert_eq!(computed.resolve(&event, &element, 3), "save-3");
    }

    #[test]
    fn test_from_json() {
        let descriptor = EventDescriptor::from_json(&json!({
            "target": {"element": ".item", "parent": "#list"},
            "type": "click",
            "category": "list",
            "action": "open",
            "value": 2
        }))
        .unwrap();
        assert!(descriptor.target.is_bubbling());
        assert_eq!(descriptor.target.root_selector(), "#list");
        assert_eq!(descriptor.event_type, "click");
        assert!(matches!(descriptor.label, Field::Literal(ref l) if l.is_empty()));
        assert!(matches!(descriptor.value, Some(Field::Literal(v)) if v == 2.0));
    }

    #[test]
    fn test_from_json_rejects_malformed() {
        assert!(EventDescriptor::from_json(&json!("#btn")).is_err());
        assert!(EventDescriptor::from_json(&json!({"type": "click"})).is_err());
        assert!(EventDescriptor::from_json(&json!({"target": "#btn"})).is_err());
        assert!(EventDescriptor::from_json(&json!({"target": {"element": ".x"}, "type": "click"})).is_err());
    }
}
