//! Fluent builders for view descriptions.
//!
//! ```ignore
//! el("button")
//!     .attr("class", "btn")
//!     .attr("hover:class", "btn btn-hot")
//!     .on("click", move |_| state.update("count", |n| json!(n.as_i64().unwrap_or(0) + 1)))
//!     .child("Add")
//! ```

use std::rc::Rc;

use indexmap::IndexMap;

use super::view::{ComponentDesc, ElementDesc, TemplateDesc, View};
use crate::reactive::Reactive;
use crate::types::{Event, Key, NodeRef, PropMap, PropValue, StyleMap};

/// `"click"` -> `"onClick"`.
fn handler_key(event: &str) -> String {
    let mut chars = event.chars();
    match chars.next() {
        Some(first) => format!("on{}{}", first.to_ascii_uppercase(), chars.as_str()),
        None => "on".to_string(),
    }
}

fn push_style(props: &mut PropMap, name: impl Into<String>, value: impl Into<String>) {
    let entry = props
        .entry("style".to_string())
        .or_insert_with(|| PropValue::Style(StyleMap::new()));
    if !matches!(entry, PropValue::Style(_)) {
        *entry = PropValue::Style(StyleMap::new());
    }
    if let PropValue::Style(style) = entry {
        style.insert(name.into(), value.into());
    }
}

// =============================================================================
// Element
// =============================================================================

/// Start an element description.
pub fn el(tag: impl Into<String>) -> ElementBuilder {
    ElementBuilder {
        desc: ElementDesc {
            tag: tag.into(),
            props: PropMap::new(),
            children: Vec::new(),
            key: None,
        },
    }
}

/// Text view.
pub fn text(content: impl Into<String>) -> View {
    View::Text(content.into())
}

/// List view; flattened into the parent's children.
pub fn fragment<I, T>(items: I) -> View
where
    I: IntoIterator<Item = T>,
    T: Into<View>,
{
    items.into_iter().collect()
}

#[derive(Clone, Debug)]
pub struct ElementBuilder {
    desc: ElementDesc,
}

impl ElementBuilder {
    /// Set a prop. Keys may carry responsive modifiers (`md:class`).
    pub fn attr(mut self, key: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.desc.props.insert(key.into(), value.into());
        self
    }

    /// Add one inline style declaration.
    pub fn style(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        push_style(&mut self.desc.props, name, value);
        self
    }

    /// Attach an event handler (`on("click", ..)` is stored as `onClick`).
    pub fn on(mut self, event: &str, handler: impl Fn(&Event) + 'static) -> Self {
        self.desc
            .props
            .insert(handler_key(event), PropValue::Handler(Rc::new(handler)));
        self
    }

    /// Bind an external reference to the mounted node.
    pub fn node_ref(self, node_ref: &NodeRef) -> Self {
        self.attr("ref", node_ref.clone())
    }

    /// Two-way bind `value` to `state[field]`.
    pub fn model(mut self, state: &Reactive, field: impl Into<String>) -> Self {
        self.desc
            .props
            .insert("model".to_string(), PropValue::Model(state.clone(), field.into()));
        self
    }

    pub fn key(mut self, key: impl Into<Key>) -> Self {
        self.desc.key = Some(key.into());
        self
    }

    pub fn child(mut self, child: impl Into<View>) -> Self {
        self.desc.children.push(child.into());
        self
    }

    pub fn children<I, T>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<View>,
    {
        self.desc.children.extend(children.into_iter().map(Into::into));
        self
    }

    pub fn build(self) -> View {
        View::Element(self.desc)
    }
}

impl From<ElementBuilder> for View {
    fn from(builder: ElementBuilder) -> Self {
        builder.build()
    }
}

// =============================================================================
// Template
// =============================================================================

/// Start a template component description for a registered template.
pub fn template(name: impl Into<String>) -> TemplateBuilder {
    TemplateBuilder {
        desc: TemplateDesc {
            name: name.into(),
            props: PropMap::new(),
            children: Vec::new(),
            key: None,
            substitutions: IndexMap::new(),
            listeners: IndexMap::new(),
        },
    }
}

#[derive(Clone, Debug)]
pub struct TemplateBuilder {
    desc: TemplateDesc,
}

impl TemplateBuilder {
    /// Set a prop. Props named like a placeholder fill it; the rest are
    /// applied to the instance root.
    pub fn attr(mut self, key: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.desc.props.insert(key.into(), value.into());
        self
    }

    /// Fill a placeholder explicitly (case-insensitive).
    pub fn substitute(mut self, placeholder: &str, value: impl Into<String>) -> Self {
        self.desc
            .substitutions
            .insert(placeholder.trim().to_uppercase(), value.into());
        self
    }

    /// Attach a handler on every instance element matching `selector`.
    pub fn listen(mut self, selector: impl Into<String>, event: &str, handler: impl Fn(&Event) + 'static) -> Self {
        self.desc
            .listeners
            .entry(selector.into())
            .or_default()
            .insert(event.to_ascii_lowercase(), Rc::new(handler));
        self
    }

    pub fn on(mut self, event: &str, handler: impl Fn(&Event) + 'static) -> Self {
        self.desc
            .props
            .insert(handler_key(event), PropValue::Handler(Rc::new(handler)));
        self
    }

    pub fn key(mut self, key: impl Into<Key>) -> Self {
        self.desc.key = Some(key.into());
        self
    }

    pub fn child(mut self, child: impl Into<View>) -> Self {
        self.desc.children.push(child.into());
        self
    }

    pub fn children<I, T>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<View>,
    {
        self.desc.children.extend(children.into_iter().map(Into::into));
        self
    }

    pub fn build(self) -> View {
        View::Template(self.desc)
    }
}

impl From<TemplateBuilder> for View {
    fn from(builder: TemplateBuilder) -> Self {
        builder.build()
    }
}

// =============================================================================
// Function components
// =============================================================================

/// Start a function component description.
///
/// The function receives the props plus a `children` entry holding the
/// component's children.
pub fn component(name: impl Into<String>, func: impl Fn(&PropMap) -> View + 'static) -> ComponentBuilder {
    ComponentBuilder {
        desc: ComponentDesc {
            name: name.into(),
            func: Rc::new(func),
            props: PropMap::new(),
            children: Vec::new(),
            key: None,
        },
    }
}

#[derive(Clone, Debug)]
pub struct ComponentBuilder {
    desc: ComponentDesc,
}

impl ComponentBuilder {
    pub fn attr(mut self, key: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.desc.props.insert(key.into(), value.into());
        self
    }

    pub fn key(mut self, key: impl Into<Key>) -> Self {
        self.desc.key = Some(key.into());
        self
    }

    pub fn child(mut self, child: impl Into<View>) -> Self {
        self.desc.children.push(child.into());
        self
    }

    pub fn children<I, T>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<View>,
    {
        self.desc.children.extend(children.into_iter().map(Into::into));
        self
    }

    pub fn build(self) -> View {
        View::Component(self.desc)
    }
}

impl From<ComponentBuilder> for View {
    fn from(builder: ComponentBuilder) -> Self {
        builder.build()
    }
}

/// Children passed to a function component, as a list view.
pub fn children_of(props: &PropMap) -> View {
    match props.get("children") {
        Some(PropValue::Children(children)) => View::List(children.as_ref().clone()),
        _ => View::Empty,
    }
}
