//! Analytics dispatcher — the façade pages talk to.
//!
//! Holds the registered trackers, fans `init`/`send`/`set_dimensions` out to
//! them, and turns DOM events into hits through attached
//! [`EventDescriptor`]s.

use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use beacon_core::config::TrackerSettings;
use beacon_core::{BeaconError, BeaconResult, Hit, Record};

use crate::descriptor::{EventDescriptor, Target};
use crate::dom::{Document, DomEvent, ElementRef, Listener, NodeId, Selector};
use crate::trackers::Tracker;

#[derive(Default)]
pub struct AnalyticsDispatcher {
    /// Registration order is fan-out order.
    trackers: Vec<(String, Arc<dyn Tracker>)>,
}

impl AnalyticsDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tracker(mut self, name: impl Into<String>, tracker: Arc<dyn Tracker>) -> Self {
        self.register(name, tracker);
        self
    }

    /// Register `tracker` under `name`, replacing any tracker already
    /// registered under that name in place.
    pub fn register(&mut self, name: impl Into<String>, tracker: Arc<dyn Tracker>) {
        let name = name.into();
        match self.trackers.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = tracker,
            None => self.trackers.push((name, tracker)),
        }
    }

    pub fn tracker(&self, name: &str) -> Option<&Arc<dyn Tracker>> {
        self.trackers
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, tracker)| tracker)
    }

    pub fn tracker_names(&self) -> Vec<&str> {
        self.trackers.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Initialize every registered tracker that has settings. All of them
    /// are attempted; the first failure is returned afterwards.
    pub fn init(&self, settings: &BTreeMap<String, TrackerSettings>) -> BeaconResult<()> {
        for name in settings.keys() {
            if self.tracker(name).is_none() {
                debug!(tracker = %name, "settings for unregistered tracker ignored");
            }
        }

        let mut first_error = None;
        for (name, tracker) in &self.trackers {
            let Some(tracker_settings) = settings.get(name) else {
                continue;
            };
            match tracker.init(tracker_settings) {
                Ok(()) => info!(tracker = %name, "tracker ready"),
                Err(e) => {
                    warn!(tracker = %name, error = %e, "tracker failed to initialize");
                    first_error.get_or_insert(BeaconError::TrackerInit {
                        tracker: name.clone(),
                        source: Box::new(e),
                    });
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Send `hit` to `selected` only, or to every initialized tracker.
    pub fn send(&self, hit: &Hit, selected: Option<&str>) -> BeaconResult<()> {
        self.fan_out(selected, |tracker| tracker.send(hit))
    }

    pub fn set_dimensions(&self, dimensions: &Record, selected: Option<&str>) -> BeaconResult<()> {
        self.fan_out(selected, |tracker| tracker.set_dimensions(dimensions))
    }

    fn fan_out<F>(&self, selected: Option<&str>, op: F) -> BeaconResult<()>
    where
        F: Fn(&dyn Tracker) -> BeaconResult<()>,
    {
        if let Some(name) = selected {
            return match self.tracker(name) {
                Some(tracker) if tracker.is_initialized() => op(tracker.as_ref()),
                _ => {
                    debug!(tracker = name, "selected tracker unknown or not initialized");
                    Ok(())
                }
            };
        }

        let mut first_error = None;
        for (name, tracker) in &self.trackers {
            if !tracker.is_initialized() {
                continue;
            }
            if let Err(e) = op(tracker.as_ref()) {
                warn!(tracker = %name, error = %e, "tracker rejected call");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Attach every descriptor. Descriptors are independent: a failing one
    /// does not stop the rest, and the first failure is returned at the end.
    /// Returns the number of listeners registered.
    pub fn attach_events_to_elements(
        self: &Arc<Self>,
        document: &Document,
        descriptors: Vec<EventDescriptor>,
    ) -> BeaconResult<usize> {
        let mut attached = 0;
        let mut first_error = None;
        for descriptor in descriptors {
            match self.attach_event_to_element(document, descriptor) {
                Ok(count) => attached += count,
                Err(e) => {
                    warn!(error = %e, "event descriptor not attached");
                    first_error.get_or_insert(e);
                }
            }
        }
        first_error.map_or(Ok(attached), Err)
    }

    /// Attach descriptors read from configuration JSON, which must be an
    /// array.
    pub fn attach_events_from_json(
        self: &Arc<Self>,
        document: &Document,
        descriptors: &Value,
    ) -> BeaconResult<usize> {
        let Value::Array(items) = descriptors else {
            return Err(BeaconError::Type(
                "event descriptors must be supplied as an array".into(),
            ));
        };

        let mut attached = 0;
        let mut first_error = None;
        for item in items {
            match EventDescriptor::from_json(item)
                .and_then(|descriptor| self.attach_event_to_element(document, descriptor))
            {
                Ok(count) => attached += count,
                Err(e) => {
                    warn!(error = %e, "event descriptor not attached");
                    first_error.get_or_insert(e);
                }
            }
        }
        first_error.map_or(Ok(attached), Err)
    }

    /// Register one listener per resolved root of `descriptor.target`.
    pub fn attach_event_to_element(
        self: &Arc<Self>,
        document: &Document,
        descriptor: EventDescriptor,
    ) -> BeaconResult<usize> {
        let bubbling = descriptor.target.is_bubbling();
        if let Target::Delegated { element, .. } = &descriptor.target {
            Selector::parse(element)?;
        }
        let roots = Self::get_targets(document, &descriptor.target, bubbling)?;

        let descriptor = Arc::new(descriptor);
        for (index, root) in roots.iter().enumerate() {
            let listener = self.create_event_callback(Arc::clone(&descriptor), *root, index, bubbling);
            document.add_event_listener(*root, descriptor.event_type.clone(), listener);
        }

        debug!(
            target = descriptor.target.root_selector(),
            event_type = %descriptor.event_type,
            bubbling,
            listeners = roots.len(),
            "event descriptor attached"
        );
        Ok(roots.len())
    }

    /// Listener for one root. In bubbling mode the event target is matched
    /// against the delegated elements when the event fires.
    pub fn create_event_callback(
        self: &Arc<Self>,
        descriptor: Arc<EventDescriptor>,
        root: NodeId,
        index: usize,
        bubbling: bool,
    ) -> Listener {
        let dispatcher = Arc::clone(self);
        Arc::new(move |document: &Document, event: &DomEvent| {
            let matched = if bubbling {
                Self::get_bubbled_target(document, event, &descriptor, root)
            } else {
                document.element(root).map(|element| (element, index))
            };
            let Some((element, index)) = matched else {
                debug!(event_type = %event.event_type, "event target outside delegated elements");
                return;
            };
            let Some(hit) = Self::build_hit(&descriptor, event, &element, index) else {
                return;
            };
            if let Err(e) = dispatcher.send(&hit, None) {
                warn!(error = %e, "analytics hit could not be sent");
            }
        })
    }

    /// The nearest delegated element at or above the event target, below
    /// `root`, with its position among the current matches.
    pub fn get_bubbled_target(
        document: &Document,
        event: &DomEvent,
        descriptor: &EventDescriptor,
        root: NodeId,
    ) -> Option<(ElementRef, usize)> {
        let Target::Delegated { element, .. } = &descriptor.target else {
            return None;
        };
        let candidates = document.query_selector_all(Some(root), element).ok()?;

        let mut current = Some(event.target);
        while let Some(node) = current {
            if node == root {
                return None;
            }
            if let Some(index) = candidates.iter().position(|candidate| *candidate == node) {
                return document.element(node).map(|element| (element, index));
            }
            current = document.parent(node);
        }
        None
    }

    /// Resolve the nodes listeners are attached to: the delegation parents
    /// when bubbling, the target elements otherwise.
    pub fn get_targets(document: &Document, target: &Target, bubbling: bool) -> BeaconResult<Vec<NodeId>> {
        let selector = match target {
            Target::Selector(selector) => selector,
            Target::Delegated { parent, .. } if bubbling => parent,
            Target::Delegated { element, .. } => element,
        };
        document.query_selector_all(None, selector)
    }

    fn build_hit(
        descriptor: &EventDescriptor,
        event: &DomEvent,
        element: &ElementRef,
        index: usize,
    ) -> Option<Hit> {
        if let Some(condition) = &descriptor.send_condition {
            if !condition(event, element, index) {
                debug!(event_type = %event.event_type, index, "send condition false, hit suppressed");
                return None;
            }
        }

        let mut hit = Hit::event(
            descriptor.category.resolve(event, element, index),
            descriptor.action.resolve(event, element, index),
            descriptor.label.resolve(event, element, index),
        );
        if let Some(value) = &descriptor.value {
            let value = value.resolve(event, element, index);
            if value.is_finite() && value >= 0.0 {
                hit.value = Some(value);
            } else {
                debug!(value, "negative or non-finite hit value discarded");
            }
        }
        if let Some(dimensions) = &descriptor.custom_dimension {
            hit.custom_dimension = dimensions(event, element, index);
        }
        Some(hit)
    }
}
