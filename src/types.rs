//! Core types - keys, prop values, events, node handles.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::Value as Json;

use crate::reactive::{Observed, Reactive};
use crate::vdom::View;

// =============================================================================
// Host Handles
// =============================================================================

/// Handle to a live node owned by a [`Host`](crate::host::Host).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// Handle to a registered event listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub usize);

// =============================================================================
// Key
// =============================================================================

/// Identity token used to match list items across renders.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Int(i64),
    Str(Rc<str>),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Int(n) => write!(f, "{n}"),
            Key::Str(s) => f.write_str(s),
        }
    }
}

macro_rules! key_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for Key {
            fn from(value: $t) -> Self {
                Key::Int(value as i64)
            }
        })*
    };
}

key_from_int!(i32, i64, u32, u64, usize);

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key::Str(value.into())
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Key::Str(value.into())
    }
}

impl From<Observed> for Key {
    fn from(value: Observed) -> Self {
        match value {
            Observed::Value(Json::Number(n)) if n.is_i64() => Key::Int(n.as_i64().unwrap_or(0)),
            other => Key::Str(other.to_string().into()),
        }
    }
}

// =============================================================================
// Events
// =============================================================================

/// Event delivered to handlers.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Event name without the `on` prefix, lowercase (`"click"`, `"input"`).
    pub name: String,
    /// Node the event was dispatched on.
    pub target: NodeId,
    /// Current `value` of the target, for input-like events.
    pub value: Option<String>,
}

impl Event {
    pub fn new(name: impl Into<String>, target: NodeId) -> Self {
        Self {
            name: name.into(),
            target,
            value: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

/// Event handler (Rc so it can be shared between the prop map and listeners).
pub type EventHandler = Rc<dyn Fn(&Event)>;

// =============================================================================
// NodeRef
// =============================================================================

/// External binding to a mounted node, set on mount and cleared on unmount.
#[derive(Clone, Default)]
pub struct NodeRef(Rc<Cell<Option<NodeId>>>);

impl NodeRef {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<NodeId> {
        self.0.get()
    }

    pub fn is_bound(&self) -> bool {
        self.0.get().is_some()
    }

    pub(crate) fn bind(&self, node: Option<NodeId>) {
        self.0.set(node);
    }

    pub fn ptr_eq(&self, other: &NodeRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NodeRef").field(&self.0.get()).finish()
    }
}

// =============================================================================
// Prop Values
// =============================================================================

/// Inline style declarations, property name to value.
pub type StyleMap = IndexMap<String, String>;

/// Property map of a node, in author order.
pub type PropMap = IndexMap<String, PropValue>;

/// A single property value.
#[derive(Clone)]
pub enum PropValue {
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    Style(StyleMap),
    /// Event handler; keys start with `on`.
    Handler(EventHandler),
    /// Bound to the node's live handle while mounted.
    Ref(NodeRef),
    /// Two-way binding of `value` to a reactive field.
    Model(Reactive, String),
    /// Children passed to a function component.
    Children(Rc<Vec<View>>),
}

impl PropValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_style(&self) -> Option<&StyleMap> {
        match self {
            PropValue::Style(style) => Some(style),
            _ => None,
        }
    }

    pub fn is_handler(&self) -> bool {
        matches!(self, PropValue::Handler(_))
    }

    /// Text form used for attributes and template placeholders.
    ///
    /// `None` means "absent": null, `false`, handlers, refs and children.
    pub fn to_text(&self) -> Option<String> {
        match self {
            PropValue::Str(s) => Some(s.clone()),
            PropValue::Number(n) => Some(format_number(*n)),
            PropValue::Bool(true) => Some(String::new()),
            PropValue::Style(style) => Some(style_text(style)),
            PropValue::Null
            | PropValue::Bool(false)
            | PropValue::Handler(_)
            | PropValue::Ref(_)
            | PropValue::Model(..)
            | PropValue::Children(_) => None,
        }
    }

    /// Equality as far as rendering is concerned.
    ///
    /// Handlers and children always compare equal (they are refreshed without
    /// touching the host); styles compare structurally; refs and models by
    /// identity.
    pub fn same_render(&self, other: &PropValue) -> bool {
        match (self, other) {
            (PropValue::Null, PropValue::Null) => true,
            (PropValue::Bool(a), PropValue::Bool(b)) => a == b,
            (PropValue::Number(a), PropValue::Number(b)) => a == b,
            (PropValue::Str(a), PropValue::Str(b)) => a == b,
            (PropValue::Style(a), PropValue::Style(b)) => a == b,
            (PropValue::Handler(_), PropValue::Handler(_)) => true,
            (PropValue::Children(_), PropValue::Children(_)) => true,
            (PropValue::Ref(a), PropValue::Ref(b)) => a.ptr_eq(b),
            (PropValue::Model(a, fa), PropValue::Model(b, fb)) => a.ptr_eq(b) && fa == fb,
            _ => false,
        }
    }
}

impl fmt::Debug for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropValue::Null => f.write_str("Null"),
            PropValue::Bool(b) => write!(f, "Bool({b})"),
            PropValue::Number(n) => write!(f, "Number({n})"),
            PropValue::Str(s) => write!(f, "Str({s:?})"),
            PropValue::Style(style) => f.debug_tuple("Style").field(style).finish(),
            PropValue::Handler(_) => f.write_str("Handler(..)"),
            PropValue::Ref(r) => write!(f, "{r:?}"),
            PropValue::Model(r, field) => write!(f, "Model({:?}, {field:?})", r.id()),
            PropValue::Children(c) => write!(f, "Children({})", c.len()),
        }
    }
}

/// Integral numbers print without a fractional part.
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// `color: red; width: 10px`
pub fn style_text(style: &StyleMap) -> String {
    style
        .iter()
        .map(|(k, v)| format!("{k}: {v}"))
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        PropValue::Str(value.to_string())
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        PropValue::Str(value)
    }
}

impl From<&String> for PropValue {
    fn from(value: &String) -> Self {
        PropValue::Str(value.clone())
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        PropValue::Bool(value)
    }
}

macro_rules! prop_from_number {
    ($($t:ty),*) => {
        $(impl From<$t> for PropValue {
            fn from(value: $t) -> Self {
                PropValue::Number(value as f64)
            }
        })*
    };
}

prop_from_number!(i32, i64, u32, u64, usize, f32, f64);

impl From<StyleMap> for PropValue {
    fn from(value: StyleMap) -> Self {
        PropValue::Style(value)
    }
}

impl From<NodeRef> for PropValue {
    fn from(value: NodeRef) -> Self {
        PropValue::Ref(value)
    }
}

impl From<Json> for PropValue {
    fn from(value: Json) -> Self {
        match value {
            Json::Null => PropValue::Null,
            Json::Bool(b) => PropValue::Bool(b),
            Json::Number(n) => PropValue::Number(n.as_f64().unwrap_or(0.0)),
            Json::String(s) => PropValue::Str(s),
            other => PropValue::Str(other.to_string()),
        }
    }
}

impl From<Observed> for PropValue {
    fn from(value: Observed) -> Self {
        match value {
            Observed::Value(json) => json.into(),
            Observed::Reactive(r) => PropValue::Str(r.snapshot().to_string()),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
