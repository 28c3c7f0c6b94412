//! In-memory host document.
//!
//! Nodes live in a slab with a free-slot pool; handles of released nodes are
//! reused. Every structural or attribute write is appended to an operation log
//! so tests can assert exactly what the reconciler did.
//!
//! # Example
//!
//! ```ignore
//! let host = Rc::new(RefCell::new(MemoryHost::new()));
//! let root = host.borrow_mut().create_root();
//! let handle = render(&rt, view, host.clone(), root)?;
//! assert_eq!(host.borrow().inner_html(root), "<p>Count: 0</p>");
//! MemoryHost::click(&host, button);
//! ```

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::trace;

use super::Host;
use super::markup::{self, MarkupNode};
use crate::error::HostError;
use crate::template::escape_html;
use crate::types::{Event, EventHandler, ListenerId, NodeId, PropValue, style_text};

// =============================================================================
// Node Storage
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum NodeKind {
    Element(String),
    Text(String),
    Anchor(String),
    Fragment,
}

struct MemNode {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    attributes: IndexMap<String, String>,
    properties: HashMap<String, PropValue>,
    styles: IndexMap<String, String>,
    listeners: Vec<(ListenerId, String, EventHandler)>,
}

impl MemNode {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
            attributes: IndexMap::new(),
            properties: HashMap::new(),
            styles: IndexMap::new(),
            listeners: Vec::new(),
        }
    }
}

/// One logged host operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostOp {
    Create(NodeId),
    /// A detached node was inserted.
    Insert { parent: NodeId, child: NodeId },
    /// An attached node was moved.
    Move { parent: NodeId, child: NodeId },
    Remove { parent: NodeId, child: NodeId },
    Release(NodeId),
    SetText(NodeId),
    SetAttribute(NodeId, String),
    RemoveAttribute(NodeId, String),
    SetProperty(NodeId, String),
    SetStyle(NodeId, String),
    AddListener(NodeId, String),
    RemoveListener(NodeId),
    InjectStylesheet(String),
}

/// In-memory [`Host`] implementation.
#[derive(Default)]
pub struct MemoryHost {
    nodes: Vec<Option<MemNode>>,
    free: Vec<usize>,
    next_listener: usize,
    ops: Vec<HostOp>,
    stylesheets: IndexMap<String, String>,
    focused: Option<NodeId>,
    selections: HashMap<NodeId, (usize, usize)>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a detached `<div>` to render into.
    pub fn create_root(&mut self) -> NodeId {
        let root = self.create_element("div");
        self.ops.clear();
        root
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let node = MemNode::new(kind);
        let id = match self.free.pop() {
            Some(index) => {
                self.nodes[index] = Some(node);
                NodeId(index)
            }
            None => {
                self.nodes.push(Some(node));
                NodeId(self.nodes.len() - 1)
            }
        };
        self.ops.push(HostOp::Create(id));
        id
    }

    fn node(&self, id: NodeId) -> Option<&MemNode> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut MemNode> {
        self.nodes.get_mut(id.0).and_then(Option::as_mut)
    }

    fn detach(&mut self, child: NodeId) {
        let Some(parent) = self.node(child).and_then(|n| n.parent) else {
            return;
        };
        if let Some(p) = self.node_mut(parent) {
            p.children.retain(|c| *c != child);
        }
        if let Some(c) = self.node_mut(child) {
            c.parent = None;
        }
    }

    fn build(&mut self, parsed: &MarkupNode, parent: NodeId) {
        let id = match parsed {
            MarkupNode::Text(text) => self.alloc(NodeKind::Text(text.clone())),
            MarkupNode::Comment(text) => self.alloc(NodeKind::Anchor(text.clone())),
            MarkupNode::Element { tag, attrs, children } => {
                let id = self.alloc(NodeKind::Element(tag.clone()));
                if let Some(node) = self.node_mut(id) {
                    node.attributes.extend(attrs.iter().cloned());
                }
                for child in children {
                    self.build(child, id);
                }
                id
            }
        };
        self.link(parent, id, None);
    }

    fn link(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
        let Some(p) = self.node_mut(parent) else {
            return;
        };
        let at = reference
            .and_then(|r| p.children.iter().position(|c| *c == r))
            .unwrap_or(p.children.len());
        p.children.insert(at, child);
        if let Some(c) = self.node_mut(child) {
            c.parent = Some(parent);
        }
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Operations logged since the last [`clear_ops`](Self::clear_ops).
    pub fn ops(&self) -> &[HostOp] {
        &self.ops
    }

    pub fn clear_ops(&mut self) {
        self.ops.clear();
    }

    /// Number of nodes currently alive.
    pub fn node_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.node(node).is_some()
    }

    pub fn stylesheets(&self) -> &IndexMap<String, String> {
        &self.stylesheets
    }

    pub fn listener_count(&self, node: NodeId) -> usize {
        self.node(node).map_or(0, |n| n.listeners.len())
    }

    /// Element children only.
    pub fn element_children(&self, node: NodeId) -> Vec<NodeId> {
        self.children(node)
            .into_iter()
            .filter(|c| self.tag_name(*c).is_some())
            .collect()
    }

    /// Concatenated text of the subtree.
    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(node, &mut out);
        out
    }

    fn collect_text(&self, node: NodeId, out: &mut String) {
        let Some(n) = self.node(node) else { return };
        match &n.kind {
            NodeKind::Text(text) => out.push_str(text),
            NodeKind::Anchor(_) => {}
            _ => {
                for child in &n.children {
                    self.collect_text(*child, out);
                }
            }
        }
    }

    /// Serialized children of `node`.
    pub fn inner_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        if let Some(n) = self.node(node) {
            for child in &n.children {
                self.write_html(*child, &mut out);
            }
        }
        out
    }

    /// Serialized `node`, anchors included as comments.
    pub fn outer_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_html(node, &mut out);
        out
    }

    fn write_html(&self, node: NodeId, out: &mut String) {
        let Some(n) = self.node(node) else { return };
        match &n.kind {
            NodeKind::Text(text) => out.push_str(&escape_html(text)),
            NodeKind::Anchor(label) => {
                out.push_str("<!--");
                out.push_str(label);
                out.push_str("-->");
            }
            NodeKind::Fragment => {
                for child in &n.children {
                    self.write_html(*child, out);
                }
            }
            NodeKind::Element(tag) => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in &n.attributes {
                    if name == "style" && !n.styles.is_empty() {
                        continue;
                    }
                    out.push_str(&format!(" {name}=\"{}\"", escape_html(value)));
                }
                if !n.styles.is_empty() {
                    out.push_str(&format!(" style=\"{}\"", escape_html(&style_text(&n.styles))));
                }
                out.push('>');
                for child in &n.children {
                    self.write_html(*child, out);
                }
                out.push_str(&format!("</{tag}>"));
            }
        }
    }

    /// Inline style declaration set through [`Host::set_style`].
    pub fn style(&self, node: NodeId, name: &str) -> Option<String> {
        self.node(node).and_then(|n| n.styles.get(name).cloned())
    }

    // =========================================================================
    // Event Dispatch
    // =========================================================================

    /// Dispatch `event` at its target and bubble it up the ancestors.
    ///
    /// Listeners are collected first and called after the host borrow is
    /// released, so handlers may trigger re-renders that mutate the host.
    /// `mouseenter`, `mouseleave`, `focus` and `blur` do not bubble.
    pub fn dispatch(host: &Rc<RefCell<MemoryHost>>, event: Event) {
        let listeners = {
            let host = host.borrow();
            let bubbles = !matches!(event.name.as_str(), "mouseenter" | "mouseleave" | "focus" | "blur");
            let mut collected: Vec<EventHandler> = Vec::new();
            let mut current = Some(event.target);
            while let Some(id) = current {
                let Some(node) = host.node(id) else { break };
                collected.extend(
                    node.listeners
                        .iter()
                        .filter(|(_, name, _)| *name == event.name)
                        .map(|(_, _, handler)| handler.clone()),
                );
                current = if bubbles { node.parent } else { None };
            }
            collected
        };
        trace!(event = %event.name, target = event.target.0, listeners = listeners.len(), "dispatch");
        for listener in listeners {
            listener(&event);
        }
    }

    pub fn click(host: &Rc<RefCell<MemoryHost>>, node: NodeId) {
        Self::dispatch(host, Event::new("click", node));
    }

    /// Set the live `value` and dispatch `input`.
    pub fn input(host: &Rc<RefCell<MemoryHost>>, node: NodeId, value: &str) {
        host.borrow_mut()
            .set_property(node, "value", PropValue::Str(value.to_string()));
        Self::dispatch(host, Event::new("input", node).with_value(value));
    }

    /// Move focus to `node`, dispatching `blur` and `focus`.
    pub fn focus_node(host: &Rc<RefCell<MemoryHost>>, node: NodeId) {
        let previous = host.borrow().focused;
        if previous == Some(node) {
            return;
        }
        if let Some(previous) = previous {
            Self::dispatch(host, Event::new("blur", previous));
        }
        host.borrow_mut().focus(node);
        Self::dispatch(host, Event::new("focus", node));
    }

    pub fn hover(host: &Rc<RefCell<MemoryHost>>, node: NodeId, entered: bool) {
        let name = if entered { "mouseenter" } else { "mouseleave" };
        Self::dispatch(host, Event::new(name, node));
    }

    // =========================================================================
    // Selectors
    // =========================================================================

    fn matches(&self, node: NodeId, selector: &Selector) -> bool {
        let Some(n) = self.node(node) else { return false };
        let NodeKind::Element(tag) = &n.kind else {
            return false;
        };
        if selector.tag.as_ref().is_some_and(|t| t != tag) {
            return false;
        }
        if selector
            .id
            .as_ref()
            .is_some_and(|id| n.attributes.get("id") != Some(id))
        {
            return false;
        }
        let classes: HashSet<&str> = n
            .attributes
            .get("class")
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default();
        selector.classes.iter().all(|c| classes.contains(c.as_str()))
            && selector.attrs.iter().all(|a| n.attributes.contains_key(a))
    }

    fn descendants(&self, root: NodeId, out: &mut Vec<NodeId>) {
        if let Some(n) = self.node(root) {
            for child in &n.children {
                out.push(*child);
                self.descendants(*child, out);
            }
        }
    }
}

/// Compound simple selector: `tag`, `#id`, `.class`, `[attr]` in any mix.
#[derive(Debug, Default, PartialEq, Eq)]
struct Selector {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<String>,
}

impl Selector {
    fn parse(input: &str) -> Self {
        let mut selector = Selector::default();
        let input = input.trim();
        let mut rest = input;
        let split = |s: &str| s.find(['.', '#', '[']).unwrap_or(s.len());

        let end = split(rest);
        if end > 0 {
            selector.tag = Some(rest[..end].to_ascii_lowercase());
        }
        rest = &rest[end..];
        while let Some(c) = rest.chars().next() {
            let body = &rest[1..];
            match c {
                '[' => {
                    let end = body.find(']').unwrap_or(body.len());
                    selector.attrs.push(body[..end].trim().to_ascii_lowercase());
                    rest = body.get(end + 1..).unwrap_or("");
                }
                _ => {
                    let end = split(body);
                    let name = body[..end].to_string();
                    if c == '#' {
                        selector.id = Some(name);
                    } else {
                        selector.classes.push(name);
                    }
                    rest = &body[end..];
                }
            }
        }
        selector
    }
}

// =============================================================================
// Host Implementation
// =============================================================================

impl Host for MemoryHost {
    fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc(NodeKind::Element(tag.to_ascii_lowercase()))
    }

    fn create_text(&mut self, text: &str) -> NodeId {
        self.alloc(NodeKind::Text(text.to_string()))
    }

    fn create_anchor(&mut self, label: &str) -> NodeId {
        self.alloc(NodeKind::Anchor(label.to_string()))
    }

    fn create_fragment(&mut self) -> NodeId {
        self.alloc(NodeKind::Fragment)
    }

    fn parse_markup(&mut self, markup: &str) -> Result<NodeId, HostError> {
        let parsed = markup::parse(markup)?;
        let fragment = self.create_fragment();
        for node in &parsed {
            self.build(node, fragment);
        }
        Ok(fragment)
    }

    fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
        if reference == Some(child) {
            return;
        }
        if self.node(child).is_some_and(|n| n.kind == NodeKind::Fragment) {
            for grandchild in self.children(child) {
                self.insert_before(parent, grandchild, reference);
            }
            return;
        }
        let attached = self.node(child).and_then(|n| n.parent).is_some();
        self.detach(child);
        self.link(parent, child, reference);
        self.ops.push(if attached {
            HostOp::Move { parent, child }
        } else {
            HostOp::Insert { parent, child }
        });
    }

    fn remove_child(&mut self, parent: NodeId, child: NodeId) {
        if self.node(child).and_then(|n| n.parent) != Some(parent) {
            return;
        }
        self.detach(child);
        self.ops.push(HostOp::Remove { parent, child });
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).and_then(|n| n.parent)
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.node(node).map(|n| n.children.clone()).unwrap_or_default()
    }

    fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.parent(node)?;
        let siblings = &self.node(parent)?.children;
        let at = siblings.iter().position(|c| *c == node)?;
        siblings.get(at + 1).copied()
    }

    fn tag_name(&self, node: NodeId) -> Option<String> {
        match &self.node(node)?.kind {
            NodeKind::Element(tag) => Some(tag.clone()),
            _ => None,
        }
    }

    fn set_text(&mut self, node: NodeId, text: &str) {
        if let Some(n) = self.node_mut(node) {
            match &mut n.kind {
                NodeKind::Text(current) | NodeKind::Anchor(current) => *current = text.to_string(),
                _ => return,
            }
            self.ops.push(HostOp::SetText(node));
        }
    }

    fn release(&mut self, node: NodeId) {
        self.detach(node);
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            if let Some(n) = self.nodes.get_mut(id.0).and_then(Option::take) {
                stack.extend(n.children);
                self.free.push(id.0);
                self.selections.remove(&id);
                if self.focused == Some(id) {
                    self.focused = None;
                }
            }
        }
        self.ops.push(HostOp::Release(node));
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.node(node).and_then(|n| n.attributes.get(name).cloned())
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        if let Some(n) = self.node_mut(node) {
            n.attributes.insert(name.to_string(), value.to_string());
            self.ops.push(HostOp::SetAttribute(node, name.to_string()));
        }
    }

    fn remove_attribute(&mut self, node: NodeId, name: &str) {
        if let Some(n) = self.node_mut(node) {
            if n.attributes.shift_remove(name).is_some() {
                self.ops.push(HostOp::RemoveAttribute(node, name.to_string()));
            }
        }
    }

    fn property(&self, node: NodeId, name: &str) -> Option<PropValue> {
        self.node(node).and_then(|n| n.properties.get(name).cloned())
    }

    fn set_property(&mut self, node: NodeId, name: &str, value: PropValue) {
        if let Some(n) = self.node_mut(node) {
            n.properties.insert(name.to_string(), value);
            self.ops.push(HostOp::SetProperty(node, name.to_string()));
        }
    }

    fn set_style(&mut self, node: NodeId, name: &str, value: Option<&str>) {
        if let Some(n) = self.node_mut(node) {
            match value {
                Some(value) => {
                    n.styles.insert(name.to_string(), value.to_string());
                }
                None => {
                    n.styles.shift_remove(name);
                }
            }
            self.ops.push(HostOp::SetStyle(node, name.to_string()));
        }
    }

    fn add_listener(&mut self, node: NodeId, event: &str, listener: EventHandler) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        if let Some(n) = self.node_mut(node) {
            n.listeners.push((id, event.to_string(), listener));
            self.ops.push(HostOp::AddListener(node, event.to_string()));
        }
        id
    }

    fn remove_listener(&mut self, node: NodeId, listener: ListenerId) {
        if let Some(n) = self.node_mut(node) {
            n.listeners.retain(|(id, _, _)| *id != listener);
            self.ops.push(HostOp::RemoveListener(node));
        }
    }

    fn query_selector_all(&self, root: NodeId, selector: &str) -> Vec<NodeId> {
        let selector = Selector::parse(selector);
        let mut all = Vec::new();
        self.descendants(root, &mut all);
        all.into_iter().filter(|n| self.matches(*n, &selector)).collect()
    }

    fn find_by_id(&self, root: NodeId, id: &str) -> Option<NodeId> {
        if self.attribute(root, "id").as_deref() == Some(id) {
            return Some(root);
        }
        let mut all = Vec::new();
        self.descendants(root, &mut all);
        all.into_iter()
            .find(|n| self.attribute(*n, "id").as_deref() == Some(id))
    }

    fn inject_stylesheet(&mut self, id: &str, css: &str) {
        self.stylesheets.insert(id.to_string(), css.to_string());
        self.ops.push(HostOp::InjectStylesheet(id.to_string()));
    }

    fn focused(&self) -> Option<NodeId> {
        self.focused
    }

    fn focus(&mut self, node: NodeId) {
        if self.contains(node) {
            self.focused = Some(node);
        }
    }

    fn selection_range(&self, node: NodeId) -> Option<(usize, usize)> {
        self.selections.get(&node).copied()
    }

    fn set_selection_range(&mut self, node: NodeId, start: usize, end: usize) {
        if self.contains(node) {
            self.selections.insert(node, (start, end));
        }
    }
}
