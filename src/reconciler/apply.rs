//! Applying resolved props to a live node.
//!
//! | Prop                         | Host operation                         |
//! |------------------------------|----------------------------------------|
//! | `on<Event>` with a handler   | handler table + one listener per event |
//! | `style` (style map)          | per-declaration `set_style`            |
//! | `value`, `checked`, `disabled` | live property                        |
//! | `ref`                        | bind the node reference                |
//! | `children`, `model`, `key`   | not applied                            |
//! | anything else                | attribute (`true` = empty, `false`/null = removed) |
//!
//! Only props whose value changed since the last application touch the host.

use super::Mounted;
use crate::host::Host;
use crate::types::{PropMap, PropValue, StyleMap};

/// Props consumed by the runtime itself.
const RESERVED: &[&str] = &["children", "model", "key"];

/// Props set as live properties instead of attributes.
pub const LIVE_PROPERTIES: &[&str] = &["value", "checked", "disabled"];

/// `onClick` -> `click`.
pub fn event_name(key: &str) -> Option<String> {
    key.strip_prefix("on")
        .filter(|rest| !rest.is_empty())
        .map(str::to_ascii_lowercase)
}

fn cleared_property(name: &str) -> PropValue {
    match name {
        "value" => PropValue::Str(String::new()),
        _ => PropValue::Bool(false),
    }
}

/// Apply `next` to the mounted node, diffing against what was last applied.
pub(crate) fn apply_props<H: Host + ?Sized>(host: &mut H, mounted: &Mounted, next: &PropMap) {
    let previous = mounted.applied.replace(PropMap::new());
    let mut applied = PropMap::with_capacity(next.len());

    for (key, value) in next {
        if RESERVED.contains(&key.as_str()) || mounted.consumed.contains(&key.to_uppercase()) {
            continue;
        }
        if let (Some(event), PropValue::Handler(handler)) = (event_name(key), value) {
            mounted.set_handler(host, &event, handler.clone());
        } else {
            apply_one(host, mounted, key, previous.get(key), value);
        }
        applied.insert(key.clone(), value.clone());
    }

    for (key, old) in &previous {
        if !applied.contains_key(key) {
            remove_one(host, mounted, key, old);
        }
    }
    *mounted.applied.borrow_mut() = applied;
}

fn apply_one<H: Host + ?Sized>(
    host: &mut H,
    mounted: &Mounted,
    key: &str,
    old: Option<&PropValue>,
    value: &PropValue,
) {
    let node = mounted.handle;
    match (key, value) {
        ("style", PropValue::Style(style)) => {
            let old_style = old.and_then(PropValue::as_style);
            if old.is_some() && old_style.is_none() {
                host.remove_attribute(node, "style");
            }
            apply_style(host, mounted, old_style, style);
        }
        ("ref", PropValue::Ref(node_ref)) => {
            let mut bound = mounted.node_ref.borrow_mut();
            if let Some(previous) = bound.as_ref() {
                if !previous.ptr_eq(node_ref) {
                    previous.bind(None);
                }
            }
            node_ref.bind(Some(node));
            *bound = Some(node_ref.clone());
        }
        (key, value) if LIVE_PROPERTIES.contains(&key) => {
            // Unchanged props leave user edits to the live value alone.
            let unchanged = match old {
                Some(old) => old.same_render(value),
                None => host.property(node, key).is_some_and(|current| current.same_render(value)),
            };
            if !unchanged {
                host.set_property(node, key, value.clone());
            }
        }
        (key, value) => {
            if old.is_some_and(|old| old.same_render(value)) {
                return;
            }
            if key == "style" {
                if let Some(old_style) = old.and_then(PropValue::as_style) {
                    apply_style(host, mounted, Some(old_style), &StyleMap::new());
                }
            }
            match value.to_text() {
                Some(text) => host.set_attribute(node, key, &text),
                None => host.remove_attribute(node, key),
            }
        }
    }
}

fn apply_style<H: Host + ?Sized>(host: &mut H, mounted: &Mounted, old: Option<&StyleMap>, new: &StyleMap) {
    let node = mounted.handle;
    for (name, value) in new {
        if old.and_then(|s| s.get(name)) != Some(value) {
            host.set_style(node, name, Some(value));
        }
    }
    if let Some(old) = old {
        for name in old.keys().filter(|name| !new.contains_key(*name)) {
            host.set_style(node, name, None);
        }
    }
}

fn remove_one<H: Host + ?Sized>(host: &mut H, mounted: &Mounted, key: &str, old: &PropValue) {
    let node = mounted.handle;
    if let (Some(event), true) = (event_name(key), old.is_handler()) {
        mounted.remove_handler(host, &event);
        return;
    }
    match (key, old) {
        ("style", PropValue::Style(style)) => apply_style(host, mounted, Some(style), &StyleMap::new()),
        ("ref", _) => mounted.unbind_ref(),
        (key, _) if LIVE_PROPERTIES.contains(&key) => host.set_property(node, key, cleared_property(key)),
        (key, _) => host.remove_attribute(node, key),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::host::{HostOp, MemoryHost};
    use crate::types::{Event, NodeRef};

    fn setup() -> (MemoryHost, Mounted) {
        let mut host = MemoryHost::new();
        let root = host.create_root();
        let div = host.create_element("div");
        host.append_child(root, div);
        host.clear_ops();
        (host, Mounted::new(div))
    }

    fn props(pairs: Vec<(&str, PropValue)>) -> PropMap {
        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    #[test]
    fn test_event_name() {
        assert_eq!(event_name("onClick").as_deref(), Some("click"));
        assert_eq!(event_name("onMouseEnter").as_deref(), Some("mouseenter"));
        assert_eq!(event_name("on"), None);
        assert_eq!(event_name("title"), None);
    }

    #[test]
    fn test_attributes_and_booleans() {
        let (mut host, mounted) = setup();
        let node = mounted.handle;
        apply_props(
            &mut host,
            &mounted,
            &props(vec![("class", "a".into()), ("hidden", true.into()), ("open", false.into())]),
        );
        assert_eq!(host.attribute(node, "class").as_deref(), Some("a"));
        assert_eq!(host.attribute(node, "hidden").as_deref(), Some(""));
        assert_eq!(host.attribute(node, "open"), None);

        apply_props(&mut host, &mounted, &props(vec![("class", "a".into())]));
        assert_eq!(host.attribute(node, "hidden"), None);
    }

    #[test]
    fn test_unchanged_props_skip_host() {
        let (mut host, mounted) = setup();
        let map = props(vec![("class", "a".into()), ("title", "t".into())]);
        apply_props(&mut host, &mounted, &map);
        host.clear_ops();
        apply_props(&mut host, &mounted, &map);
        assert!(host.ops().is_empty());
    }

    #[test]
    fn test_style_declarations_diffed() {
        let (mut host, mounted) = setup();
        let node = mounted.handle;
        let style = |pairs: &[(&str, &str)]| -> PropValue {
            PropValue::Style(pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect())
        };
        apply_props(
            &mut host,
            &mounted,
            &props(vec![("style", style(&[("color", "red"), ("width", "1px")]))]),
        );
        host.clear_ops();
        apply_props(&mut host, &mounted, &props(vec![("style", style(&[("color", "red")]))]));
        assert_eq!(host.ops(), &[HostOp::SetStyle(node, "width".to_string())]);
        assert_eq!(host.style(node, "color").as_deref(), Some("red"));
        assert_eq!(host.style(node, "width"), None);
    }

    #[test]
    fn test_live_properties() {
        let (mut host, mounted) = setup();
        let node = mounted.handle;
        apply_props(&mut host, &mounted, &props(vec![("value", "x".into()), ("disabled", true.into())]));
        assert_eq!(host.property(node, "value").and_then(|v| v.as_str().map(str::to_string)).as_deref(), Some("x"));
        assert_eq!(host.attribute(node, "value"), None);

        apply_props(&mut host, &mounted, &props(vec![("value", "x".into())]));
        assert_eq!(host.property(node, "disabled").and_then(|v| v.as_bool()), Some(false));
    }

    #[test]
    fn test_unchanged_live_property_keeps_user_edit() {
        let (mut host, mounted) = setup();
        let node = mounted.handle;
        let value = |host: &MemoryHost| host.property(node, "value").and_then(|v| v.as_str().map(str::to_string));

        apply_props(&mut host, &mounted, &props(vec![("value", "".into())]));
        host.set_property(node, "value", PropValue::Str("typed".to_string()));
        host.clear_ops();

        apply_props(&mut host, &mounted, &props(vec![("value", "".into())]));
        assert!(host.ops().is_empty());
        assert_eq!(value(&host).as_deref(), Some("typed"));

        apply_props(&mut host, &mounted, &props(vec![("value", "reset".into())]));
        assert_eq!(value(&host).as_deref(), Some("reset"));
    }

    #[test]
    fn test_handlers_swap_without_relistening() {
        let (mut host, mounted) = setup();
        let node = mounted.handle;
        let hits = Rc::new(Cell::new(0));

        let first = hits.clone();
        let handler = move |_: &Event| first.set(first.get() + 1);
        apply_props(&mut host, &mounted, &props(vec![("onClick", PropValue::Handler(Rc::new(handler)))]));
        assert_eq!(host.listener_count(node), 1);

        let second = hits.clone();
        let handler = move |_: &Event| second.set(second.get() + 10);
        apply_props(&mut host, &mounted, &props(vec![("onClick", PropValue::Handler(Rc::new(handler)))]));
        assert_eq!(host.listener_count(node), 1);

        let host = Rc::new(std::cell::RefCell::new(host));
        MemoryHost::click(&host, node);
        assert_eq!(hits.get(), 10);

        apply_props(&mut *host.borrow_mut(), &mounted, &PropMap::new());
        assert_eq!(host.borrow().listener_count(node), 0);
    }

    #[test]
    fn test_ref_bound_and_cleared() {
        let (mut host, mounted) = setup();
        let node_ref = NodeRef::new();
        apply_props(&mut host, &mounted, &props(vec![("ref", node_ref.clone().into())]));
        assert_eq!(node_ref.get(), Some(mounted.handle));
        apply_props(&mut host, &mounted, &PropMap::new());
        assert!(!node_ref.is_bound());
    }
}
