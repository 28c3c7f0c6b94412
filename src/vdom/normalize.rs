//! View normalization.
//!
//! Converts an arbitrary [`View`] into the canonical tree:
//!
//! - empty values and booleans render nothing
//! - strings and numbers become text nodes
//! - lists become fragments, and fragments nested in a child list are
//!   flattened into that list
//! - closures and [`Render`](super::Render) values are evaluated and their
//!   result normalized
//! - function components are called with their props (plus `children`); a
//!   component's key carries over to a result that has none
//! - template components are looked up by name
//!
//! Normalization runs inside the render effect, so every reactive read made
//! by closures and components is tracked.

use std::rc::Rc;

use serde_json::Value as Json;
use tracing::warn;

use super::node::{TemplateNode, VKind, VNode};
use super::view::{View, number_text};
use crate::error::SparkError;
use crate::template::TemplateSource;
use crate::types::{Event, PropMap, PropValue};

/// Normalize a view. `None` means the view renders nothing.
pub fn normalize(view: View, templates: &dyn TemplateSource) -> Result<Option<VNode>, SparkError> {
    match view {
        View::Empty | View::Bool(_) => Ok(None),
        View::Text(text) => Ok(Some(VNode::text(text))),
        View::Number(n) => Ok(Some(VNode::text(number_text(n)))),
        View::Json(json) => normalize_json(json, templates),
        View::List(items) => {
            let mut children = Vec::with_capacity(items.len());
            normalize_into(items, templates, &mut children)?;
            Ok(Some(VNode::fragment(children)))
        }
        View::Element(desc) => {
            let mut children = Vec::with_capacity(desc.children.len());
            normalize_into(desc.children, templates, &mut children)?;
            let props = bind_model(desc.props);
            Ok(Some(VNode::element(desc.tag, props, children).with_key(desc.key)))
        }
        View::Template(desc) => {
            let asset = templates
                .lookup(&desc.name)
                .ok_or_else(|| SparkError::ComponentNotFound {
                    name: desc.name.clone(),
                })?;
            let mut children = Vec::with_capacity(desc.children.len());
            normalize_into(desc.children, templates, &mut children)?;
            let mut node = VNode::new(VKind::Template(TemplateNode {
                name: desc.name,
                asset,
                substitutions: desc.substitutions,
                listeners: desc.listeners,
            }));
            node.key = desc.key;
            node.raw_props = desc.props;
            node.children = children;
            Ok(Some(node))
        }
        View::Component(desc) => {
            let mut props = desc.props;
            props.insert("children".to_string(), PropValue::Children(Rc::new(desc.children)));
            let output = (desc.func)(&props);
            let mut node = normalize(output, templates)?;
            if let (Some(node), Some(key)) = (node.as_mut(), desc.key) {
                node.key.get_or_insert(key);
            }
            Ok(node)
        }
        View::Thunk(f) => normalize(f(), templates),
        View::Renderable(value) => normalize(value.render(), templates),
    }
}

fn normalize_json(json: Json, templates: &dyn TemplateSource) -> Result<Option<VNode>, SparkError> {
    match json {
        Json::Null | Json::Bool(_) => Ok(None),
        Json::String(s) => Ok(Some(VNode::text(s))),
        Json::Number(n) => Ok(Some(VNode::text(
            n.as_f64().map(number_text).unwrap_or_else(|| n.to_string()),
        ))),
        Json::Array(items) => normalize(View::List(items.into_iter().map(View::Json).collect()), templates),
        Json::Object(_) => {
            warn!("plain object cannot be rendered; dropping it");
            Ok(None)
        }
    }
}

/// Normalize `items` into `out`, splicing fragment children in place.
fn normalize_into(items: Vec<View>, templates: &dyn TemplateSource, out: &mut Vec<VNode>) -> Result<(), SparkError> {
    for item in items {
        match normalize(item, templates)? {
            Some(node) if node.is_fragment() => out.extend(node.children),
            Some(node) => out.push(node),
            None => {}
        }
    }
    Ok(())
}

/// Expand a `model` binding into a `value` prop and an `onInput` handler that
/// writes back and then calls any user handler.
fn bind_model(mut props: PropMap) -> PropMap {
    let Some(PropValue::Model(state, field)) = props.get("model").cloned() else {
        return props;
    };
    let current = state.get(&field);
    let value = if current.is_null() {
        String::new()
    } else {
        current.to_string()
    };
    props.insert("value".to_string(), PropValue::Str(value));

    let user = match props.get("onInput") {
        Some(PropValue::Handler(handler)) => Some(handler.clone()),
        _ => None,
    };
    let handler = move |event: &Event| {
        if let Some(value) = &event.value {
            state.set(&field, value.as_str());
        }
        if let Some(user) = &user {
            user(event);
        }
    };
    props.insert("onInput".to_string(), PropValue::Handler(Rc::new(handler)));
    props
}
