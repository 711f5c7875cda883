//! Browser-side analytics dispatch: declarative DOM event bindings,
//! normalization into vendor payloads and fan-out to pluggable trackers.
//!
//! # Modules
//!
//! - [`helper`] — Label lookup, timestamps, UUIDs and value canonicalization
//! - [`constants`] — Dimension mapping, event names and other fixed tables
//! - [`dimensions`] — Renaming of vendor dimension keys
//! - [`dom`] — In-memory document, selector engine and event bubbling
//! - [`descriptor`] — Event descriptors binding DOM events to hits
//! - [`storage`] — Page-local session storage
//! - [`trackers`] — Tracker contract plus tag-manager and SDK trackers
//! - [`dispatcher`] — Fan-out façade and DOM attachment

pub mod constants;
pub mod descriptor;
pub mod dimensions;
pub mod dispatcher;
pub mod dom;
pub mod helper;
pub mod storage;
pub mod trackers;

pub use descriptor::{EventDescriptor, Field, Target};
pub use dispatcher::AnalyticsDispatcher;
pub use dom::{Document, DomEvent, Element, ElementRef, NodeId};
pub use storage::{MemoryStorage, SessionStorage};
pub use trackers::gtm::TagManagerTracker;
pub use trackers::sdk::{CaptureTransport, NoOpTransport, SdkTracker, SdkTransport};
pub use trackers::Tracker;
