//! Raw view descriptions.
//!
//! A [`View`] is whatever a view function returns before normalization. It
//! may freely mix text, numbers, JSON values, lists, closures, element and
//! template descriptions, and function components.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::Value as Json;

use crate::reactive::Observed;
use crate::types::{EventHandler, Key, PropMap, format_number};

/// Produce-canonical-form hook for user types.
pub trait Render {
    fn render(&self) -> View;
}

/// Function component body: receives its props (with `children`) and returns
/// a view.
pub type ComponentFn = Rc<dyn Fn(&PropMap) -> View>;

/// Selector -> event name -> handler.
pub type SelectorListeners = IndexMap<String, IndexMap<String, EventHandler>>;

/// Element description.
#[derive(Clone, Debug)]
pub struct ElementDesc {
    pub tag: String,
    pub props: PropMap,
    pub children: Vec<View>,
    pub key: Option<Key>,
}

/// Template component description.
#[derive(Clone)]
pub struct TemplateDesc {
    /// Registered template identity.
    pub name: String,
    pub props: PropMap,
    pub children: Vec<View>,
    pub key: Option<Key>,
    /// Explicit placeholder values; override same-named props.
    pub substitutions: IndexMap<String, String>,
    pub listeners: SelectorListeners,
}

impl fmt::Debug for TemplateDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateDesc")
            .field("name", &self.name)
            .field("props", &self.props)
            .field("children", &self.children)
            .field("key", &self.key)
            .field("substitutions", &self.substitutions)
            .field("listeners", &self.listeners.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Function component description.
#[derive(Clone)]
pub struct ComponentDesc {
    /// Name used in diagnostics only.
    pub name: String,
    pub func: ComponentFn,
    pub props: PropMap,
    pub children: Vec<View>,
    pub key: Option<Key>,
}

impl fmt::Debug for ComponentDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDesc")
            .field("name", &self.name)
            .field("props", &self.props)
            .field("children", &self.children)
            .field("key", &self.key)
            .finish()
    }
}

/// A raw view description.
#[derive(Clone, Default)]
pub enum View {
    /// Renders nothing.
    #[default]
    Empty,
    /// Renders nothing (conditional rendering leftovers).
    Bool(bool),
    Text(String),
    Number(f64),
    /// Plain data: null/bool render nothing, strings/numbers render text,
    /// arrays render a fragment, objects cannot be rendered.
    Json(Json),
    List(Vec<View>),
    Element(ElementDesc),
    Template(TemplateDesc),
    Component(ComponentDesc),
    /// Deferred view, called during normalization.
    Thunk(Rc<dyn Fn() -> View>),
    /// User value with its own render hook.
    Renderable(Rc<dyn Render>),
}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            View::Empty => f.write_str("Empty"),
            View::Bool(b) => write!(f, "Bool({b})"),
            View::Text(s) => write!(f, "Text({s:?})"),
            View::Number(n) => write!(f, "Number({n})"),
            View::Json(j) => write!(f, "Json({j})"),
            View::List(items) => f.debug_tuple("List").field(items).finish(),
            View::Element(e) => e.fmt(f),
            View::Template(t) => t.fmt(f),
            View::Component(c) => c.fmt(f),
            View::Thunk(_) => f.write_str("Thunk(..)"),
            View::Renderable(_) => f.write_str("Renderable(..)"),
        }
    }
}

impl View {
    /// Wrap a closure so it is evaluated during normalization.
    pub fn thunk(f: impl Fn() -> View + 'static) -> Self {
        View::Thunk(Rc::new(f))
    }

    /// Wrap a value implementing [`Render`].
    pub fn renderable(value: impl Render + 'static) -> Self {
        View::Renderable(Rc::new(value))
    }
}

// =============================================================================
// Conversions
// =============================================================================

impl From<&str> for View {
    fn from(value: &str) -> Self {
        View::Text(value.to_string())
    }
}

impl From<String> for View {
    fn from(value: String) -> Self {
        View::Text(value)
    }
}

impl From<&String> for View {
    fn from(value: &String) -> Self {
        View::Text(value.clone())
    }
}

impl From<bool> for View {
    fn from(value: bool) -> Self {
        View::Bool(value)
    }
}

macro_rules! view_from_number {
    ($($t:ty),*) => {
        $(impl From<$t> for View {
            fn from(value: $t) -> Self {
                View::Number(value as f64)
            }
        })*
    };
}

view_from_number!(i32, i64, u32, u64, usize, f32, f64);

impl From<Json> for View {
    fn from(value: Json) -> Self {
        View::Json(value)
    }
}

impl From<Observed> for View {
    fn from(value: Observed) -> Self {
        View::Json(value.into_json())
    }
}

impl<T: Into<View>> From<Vec<T>> for View {
    fn from(value: Vec<T>) -> Self {
        View::List(value.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<View>> From<Option<T>> for View {
    fn from(value: Option<T>) -> Self {
        value.map_or(View::Empty, Into::into)
    }
}

impl<T: Into<View>> FromIterator<T> for View {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        View::List(iter.into_iter().map(Into::into).collect())
    }
}

/// Text of a number as rendered in text nodes.
pub(crate) fn number_text(n: f64) -> String {
    format_number(n)
}
