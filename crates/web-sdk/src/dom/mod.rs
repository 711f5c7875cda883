//! Minimal document model standing in for the hosting page: an element
//! arena, a CSS selector engine and bubbling event dispatch.

mod document;
mod selector;

pub use document::{Document, DomEvent, Element, ElementRef, Listener, NodeId};
pub use selector::Selector;
