use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use beacon_core::{BeaconError, BeaconResult};

use super::selector::Selector;

/// Position of an element in the document arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Tag name and attributes of an element. `id` and `class` are ordinary
/// attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    tag: String,
    attributes: BTreeMap<String, String>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_id(self, id: impl Into<String>) -> Self {
        self.with_attribute("id", id)
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        let class = class.into();
        let entry = self.attributes.entry("class".into()).or_default();
        if !entry.is_empty() {
            entry.push(' ');
        }
        entry.push_str(&class);
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn id(&self) -> Option<&str> {
        self.attribute("id")
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attribute("class").unwrap_or("").split_whitespace()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }
}

/// Snapshot of an element together with its position in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementRef {
    node: NodeId,
    element: Element,
}

impl ElementRef {
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn element(&self) -> &Element {
        &self.element
    }

    pub fn tag(&self) -> &str {
        self.element.tag()
    }

    pub fn id(&self) -> Option<&str> {
        self.element.id()
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.element.attribute(name)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.element.has_class(class)
    }
}

/// An event travelling from its target up to the document root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomEvent {
    pub event_type: String,
    pub target: NodeId,
    pub current_target: NodeId,
}

/// Event listener. Receives the document so it can re-query the tree at
/// fire time.
pub type Listener = Arc<dyn Fn(&Document, &DomEvent) + Send + Sync>;

struct Node {
    element: Element,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

struct Registration {
    node: NodeId,
    event_type: String,
    listener: Listener,
}

/// In-memory document. Starts with an `html` root holding a `body`.
pub struct Document {
    nodes: RwLock<Vec<Node>>,
    listeners: RwLock<Vec<Registration>>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("nodes", &self.nodes.read().len())
            .field("listeners", &self.listeners.read().len())
            .finish()
    }
}

impl Document {
    pub fn new() -> Self {
        let root = Node {
            element: Element::new("html"),
            parent: None,
            children: vec![NodeId(1)],
        };
        let body = Node {
            element: Element::new("body"),
            parent: Some(NodeId(0)),
            children: Vec::new(),
        };
        Self {
            nodes: RwLock::new(vec![root, body]),
            listeners: RwLock::new(Vec::new()),
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn body(&self) -> NodeId {
        NodeId(1)
    }

    /// Append `element` as the last child of `parent`.
    pub fn append(&self, parent: NodeId, element: Element) -> BeaconResult<NodeId> {
        let mut nodes = self.nodes.write();
        if parent.0 >= nodes.len() {
            return Err(BeaconError::Type(format!("unknown parent node {}", parent.0)));
        }
        let node = NodeId(nodes.len());
        nodes.push(Node {
            element,
            parent: Some(parent),
            children: Vec::new(),
        });
        nodes[parent.0].children.push(node);
        Ok(node)
    }

    pub fn element(&self, node: NodeId) -> Option<ElementRef> {
        self.nodes.read().get(node.0).map(|n| ElementRef {
            node,
            element: n.element.clone(),
        })
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.read().get(node.0).and_then(|n| n.parent)
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes
            .read()
            .get(node.0)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    /// True if `node` is `ancestor` or lies beneath it.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let nodes = self.nodes.read();
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = nodes.get(id.0).and_then(|n| n.parent);
        }
        false
    }

    /// Descendants of `scope` (or of the whole document) in document order.
    fn descendants(&self, scope: Option<NodeId>) -> Vec<NodeId> {
        let nodes = self.nodes.read();
        let mut ordered = Vec::new();
        let mut stack: Vec<NodeId> = match scope {
            Some(scope) => match nodes.get(scope.0) {
                Some(node) => node.children.iter().rev().copied().collect(),
                None => return ordered,
            },
            None => vec![NodeId(0)],
        };
        while let Some(id) = stack.pop() {
            ordered.push(id);
            stack.extend(nodes[id.0].children.iter().rev().copied());
        }
        ordered
    }

    /// Elements matching `selector` beneath `scope` in document order. The
    /// scope element itself is never part of the result.
    pub fn query_selector_all(&self, scope: Option<NodeId>, selector: &str) -> BeaconResult<Vec<NodeId>> {
        let selector = Selector::parse(selector)?;
        Ok(self
            .descendants(scope)
            .into_iter()
            .filter(|node| selector.matches(self, *node))
            .collect())
    }

    pub fn query_selector(&self, scope: Option<NodeId>, selector: &str) -> BeaconResult<Option<NodeId>> {
        Ok(self.query_selector_all(scope, selector)?.into_iter().next())
    }

    pub fn add_event_listener(&self, node: NodeId, event_type: impl Into<String>, listener: Listener) {
        self.listeners.write().push(Registration {
            node,
            event_type: event_type.into(),
            listener,
        });
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// Fire `event_type` at `target` and let it bubble to the root.
    /// Returns the number of listeners invoked.
    pub fn dispatch_event(&self, target: NodeId, event_type: &str) -> usize {
        let mut path = Vec::new();
        let mut current = Some(target);
        while let Some(node) = current {
            path.push(node);
            current = self.parent(node);
        }

        let mut invoked = 0;
        for node in path {
            let listeners: Vec<Listener> = self
                .listeners
                .read()
                .iter()
                .filter(|r| r.node == node && r.event_type == event_type)
                .map(|r| Arc::clone(&r.listener))
                .collect();

            let event = DomEvent {
                event_type: event_type.to_string(),
                target,
                current_target: node,
            };
            for listener in listeners {
                listener(self, &event);
                invoked += 1;
            }
        }
        debug!(event_type, target = target.0, invoked, "dom event dispatched");
        invoked
    }
}
