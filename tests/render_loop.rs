//! End-to-end render loop behavior against the in-memory host.

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::json;
use spark_dom::{
    Host, MemoryHost, NodeId, NodeRef, PropValue, Runtime, SparkError, TemplateAsset, component, el, fragment,
    render, template,
};

fn setup() -> (Rc<RefCell<MemoryHost>>, NodeId) {
    let host = Rc::new(RefCell::new(MemoryHost::new()));
    let root = host.borrow_mut().create_root();
    (host, root)
}

fn increment(state: &spark_dom::Reactive, field: &str) {
    state.update(field, |current| json!(current.as_i64().unwrap_or(0) + 1));
}

#[test]
fn test_counter_renders_once_per_write() {
    let rt = Runtime::default();
    let state = rt.create_reactive(json!({ "count": 0, "unrelated": 0 })).unwrap();
    let (host, root) = setup();

    let s = state.clone();
    let handle = render(&rt, move || el("p").child(format!("Count: {}", s.get("count"))), host.clone(), root).unwrap();
    assert_eq!(handle.render_count(), 1);
    assert_eq!(host.borrow().inner_html(root), "<p>Count: 0</p>");

    for _ in 0..3 {
        increment(&state, "count");
    }
    assert_eq!(handle.render_count(), 4);
    assert_eq!(host.borrow().text_content(root), "Count: 3");

    // Same value and unread fields do not re-render.
    state.set("count", 3);
    state.set("unrelated", 1);
    assert_eq!(handle.render_count(), 4);
}

#[test]
fn test_click_handler_drives_rerender() {
    let rt = Runtime::default();
    let state = rt.create_reactive(json!({ "count": 0 })).unwrap();
    let (host, root) = setup();

    let s = state.clone();
    let handle = render(
        &rt,
        move || {
            let writer = s.clone();
            el("button")
                .on("click", move |_| increment(&writer, "count"))
                .child(format!("Clicked {}", s.get("count")))
        },
        host.clone(),
        root,
    )
    .unwrap();

    let button = handle.root_handle().unwrap();
    MemoryHost::click(&host, button);
    MemoryHost::click(&host, button);
    assert_eq!(handle.root_handle(), Some(button));
    assert_eq!(host.borrow().text_content(root), "Clicked 2");
    // One listener regardless of how many handler closures were rendered.
    assert_eq!(host.borrow().listener_count(button), 1);
}

#[test]
fn test_keyed_removal_keeps_surviving_nodes() {
    let rt = Runtime::default();
    let state = rt.create_reactive(json!({ "items": [1, 2, 3] })).unwrap();
    let (host, root) = setup();

    let s = state.clone();
    let handle = render(
        &rt,
        move || {
            let items = s.get("items");
            let list = items.as_reactive().map(|r| r.iter()).unwrap_or_default();
            el("ul").children(list.into_iter().map(|item| el("li").key(item.clone()).child(item)))
        },
        host.clone(),
        root,
    )
    .unwrap();

    let ul = handle.root_handle().unwrap();
    let before = host.borrow().element_children(ul);

    let items = state.get("items");
    items.as_reactive().unwrap().remove_index(1);

    let after = host.borrow().element_children(ul);
    assert_eq!(after, vec![before[0], before[2]]);
    assert_eq!(host.borrow().inner_html(ul), "<li>1</li><li>3</li>");
    assert!(!host.borrow().contains(before[1]));
}

#[test]
fn test_nested_fragments_are_transparent() {
    let rt = Runtime::default();
    let (host, root) = setup();
    let _handle = render(
        &rt,
        || {
            el("ul").child(el("li").child("a")).child(fragment(vec![
                el("li").child("b").into(),
                fragment(vec![el("li").child("c")]),
            ]))
        },
        host.clone(),
        root,
    )
    .unwrap();
    assert_eq!(host.borrow().inner_html(root), "<ul><li>a</li><li>b</li><li>c</li></ul>");
}

#[test]
fn test_viewport_tier_switch_rerenders() {
    let rt = Runtime::default();
    let (host, root) = setup();
    let handle = render(
        &rt,
        || el("p").attr("class", "narrow").attr("md:class", "wide"),
        host.clone(),
        root,
    )
    .unwrap();
    let p = handle.root_handle().unwrap();
    assert_eq!(host.borrow().attribute(p, "class").as_deref(), Some("wide"));

    rt.set_viewport_width(500.0);
    assert_eq!(handle.render_count(), 2);
    assert_eq!(host.borrow().attribute(p, "class").as_deref(), Some("narrow"));

    // Width change inside the same tier is not a dependency of the view.
    rt.set_viewport_width(520.0);
    assert_eq!(handle.render_count(), 2);
}

#[test]
fn test_hover_state_survives_rerender() {
    let rt = Runtime::default();
    let state = rt.create_reactive(json!({ "label": "go" })).unwrap();
    let (host, root) = setup();

    let s = state.clone();
    let handle = render(
        &rt,
        move || {
            el("button")
                .attr("class", "btn")
                .attr("hover:class", "btn lit")
                .child(s.get("label"))
        },
        host.clone(),
        root,
    )
    .unwrap();
    let button = handle.root_handle().unwrap();

    MemoryHost::hover(&host, button, true);
    assert_eq!(host.borrow().attribute(button, "class").as_deref(), Some("btn lit"));

    state.set("label", "stop");
    assert_eq!(host.borrow().attribute(button, "class").as_deref(), Some("btn lit"));
    assert_eq!(host.borrow().text_content(button), "stop");

    MemoryHost::hover(&host, button, false);
    assert_eq!(host.borrow().attribute(button, "class").as_deref(), Some("btn"));
}

#[test]
fn test_model_binding_round_trip() {
    let rt = Runtime::default();
    let state = rt.create_reactive(json!({ "name": "Ada" })).unwrap();
    let (host, root) = setup();

    let s = state.clone();
    let handle = render(&rt, move || el("input").attr("id", "name").model(&s, "name"), host.clone(), root).unwrap();
    let input = handle.root_handle().unwrap();
    assert_eq!(
        host.borrow().property(input, "value").and_then(|v| v.as_str().map(str::to_string)),
        Some("Ada".to_string())
    );

    MemoryHost::input(&host, input, "Grace");
    assert_eq!(state.peek("name").as_str(), Some("Grace"));

    state.set("name", "Linus");
    assert_eq!(
        host.borrow().property(input, "value").and_then(|v| v.as_str().map(str::to_string)),
        Some("Linus".to_string())
    );
}

#[test]
fn test_focus_restored_after_replacement() {
    let rt = Runtime::default();
    let state = rt.create_reactive(json!({ "boxed": false })).unwrap();
    let (host, root) = setup();

    let s = state.clone();
    let _handle = render(
        &rt,
        move || {
            let wrapper = if s.get("boxed").as_bool() == Some(true) { "section" } else { "div" };
            el(wrapper).child(el("input").attr("id", "search"))
        },
        host.clone(),
        root,
    )
    .unwrap();

    let first = host.borrow().find_by_id(root, "search").unwrap();
    host.borrow_mut().focus(first);
    host.borrow_mut().set_selection_range(first, 1, 3);

    state.set("boxed", true);
    let second = host.borrow().find_by_id(root, "search").unwrap();
    assert_ne!(first, second);
    assert_eq!(host.borrow().focused(), Some(second));
    assert_eq!(host.borrow().selection_range(second), Some((1, 3)));
}

#[test]
fn test_component_receives_props_and_children() {
    let rt = Runtime::default();
    let (host, root) = setup();
    let greeting = |props: &spark_dom::PropMap| {
        let name = props.get("name").and_then(PropValue::as_str).unwrap_or("nobody").to_string();
        el("h1").child(format!("Hello {name}")).child(spark_dom::children_of(props)).build()
    };
    let _handle = render(
        &rt,
        move || component("Greeting", greeting).attr("name", "Ada").child("!"),
        host.clone(),
        root,
    )
    .unwrap();
    assert_eq!(host.borrow().inner_html(root), "<h1>Hello Ada!</h1>");
}

#[test]
fn test_template_listener_survives_reinstantiation() {
    let rt = Runtime::default();
    rt.register_template(
        "stepper",
        TemplateAsset::new(r#"<div class="stepper"><button class="inc">+</button><span>{{COUNT}}</span></div>"#),
    );
    let state = rt.create_reactive(json!({ "count": 0 })).unwrap();
    let (host, root) = setup();

    let s = state.clone();
    let _handle = render(
        &rt,
        move || {
            let writer = s.clone();
            template("stepper")
                .substitute("count", s.get("count").to_string())
                .listen(".inc", "click", move |_| increment(&writer, "count"))
        },
        host.clone(),
        root,
    )
    .unwrap();

    for expected in ["1", "2"] {
        let button = host.borrow().query_selector_all(root, ".inc")[0];
        MemoryHost::click(&host, button);
        let span = host.borrow().query_selector_all(root, "span")[0];
        assert_eq!(host.borrow().text_content(span), expected);
    }
}

#[test]
fn test_ref_tracks_mounted_node() {
    let rt = Runtime::default();
    let state = rt.create_reactive(json!({ "show": true })).unwrap();
    let (host, root) = setup();
    let node_ref = NodeRef::new();

    let s = state.clone();
    let r = node_ref.clone();
    let _handle = render(
        &rt,
        move || {
            let show = s.get("show").as_bool() == Some(true);
            el("div").child(show.then(|| el("canvas").node_ref(&r)))
        },
        host.clone(),
        root,
    )
    .unwrap();
    let canvas = node_ref.get().unwrap();
    assert_eq!(host.borrow().tag_name(canvas).as_deref(), Some("canvas"));

    state.set("show", false);
    assert!(!node_ref.is_bound());
}

#[test]
fn test_missing_template_fails_first_pass() {
    let rt = Runtime::default();
    let (host, root) = setup();
    let result = render(&rt, || template("nowhere"), host.clone(), root);
    assert!(matches!(result, Err(SparkError::ComponentNotFound { ref name }) if name == "nowhere"));
    assert_eq!(host.borrow().inner_html(root), "");
}

#[test]
fn test_later_pass_error_keeps_previous_tree() {
    let rt = Runtime::default();
    let state = rt.create_reactive(json!({ "broken": false })).unwrap();
    let (host, root) = setup();

    let s = state.clone();
    let handle = render(
        &rt,
        move || {
            if s.get("broken").as_bool() == Some(true) {
                template("nowhere").build()
            } else {
                el("p").child("fine").build()
            }
        },
        host.clone(),
        root,
    )
    .unwrap();

    state.set("broken", true);
    assert!(handle.has_error());
    assert!(matches!(handle.take_error(), Some(SparkError::ComponentNotFound { .. })));
    assert_eq!(host.borrow().inner_html(root), "<p>fine</p>");

    // Still reactive: recovering renders again.
    state.set("broken", false);
    assert_eq!(host.borrow().inner_html(root), "<p>fine</p>");
    assert!(!handle.has_error());
}

#[test]
fn test_missing_view_and_target() {
    let rt = Runtime::default();
    let (host, root) = setup();

    let no_view = rt.root::<MemoryHost>().target(host.clone(), root).render();
    assert!(matches!(no_view, Err(SparkError::MissingView)));

    let no_target = rt.root::<MemoryHost>().view(|| "x").render();
    assert!(matches!(no_target, Err(SparkError::MissingTarget)));
}

#[test]
fn test_unmount_stops_rendering() {
    let rt = Runtime::default();
    let state = rt.create_reactive(json!({ "n": 1 })).unwrap();
    let (host, root) = setup();

    let s = state.clone();
    let handle = render(&rt, move || el("p").child(s.get("n")), host.clone(), root).unwrap();
    assert!(handle.is_active());
    handle.unmount();
    assert_eq!(host.borrow().inner_html(root), "");

    state.set("n", 2);
    assert_eq!(host.borrow().inner_html(root), "");
    assert_eq!(host.borrow().node_count(), 1);
}

#[test]
fn test_uncontrolled_input_keeps_typed_value() {
    let rt = Runtime::default();
    let state = rt.create_reactive(json!({ "label": "a" })).unwrap();
    let (host, root) = setup();

    let s = state.clone();
    let handle = render(
        &rt,
        move || el("div").child(el("input").attr("value", "")).child(el("span").child(s.get("label"))),
        host.clone(),
        root,
    )
    .unwrap();
    let div = handle.root_handle().unwrap();
    let input = host.borrow().element_children(div)[0];

    MemoryHost::input(&host, input, "typed");
    state.set("label", "b");

    assert_eq!(host.borrow().text_content(div), "b");
    assert_eq!(
        host.borrow().property(input, "value").and_then(|v| v.as_str().map(str::to_string)),
        Some("typed".to_string())
    );
}

#[test]
fn test_template_rebuild_keeps_hover_and_slot_children() {
    let rt = Runtime::default();
    rt.register_template("badge", TemplateAsset::new(r#"<span class="badge">{{N}} {{SLOT}}</span>"#));
    let state = rt.create_reactive(json!({ "n": 0 })).unwrap();
    let (host, root) = setup();

    let s = state.clone();
    let handle = render(
        &rt,
        move || {
            template("badge")
                .attr("data-x", "plain")
                .attr("hover:data-x", "hot")
                .substitute("n", s.get("n").to_string())
                .child(el("b").child("tail"))
        },
        host.clone(),
        root,
    )
    .unwrap();
    let badge = handle.root_handle().unwrap();
    let tail = host.borrow().query_selector_all(badge, "b")[0];

    MemoryHost::hover(&host, badge, true);
    assert_eq!(host.borrow().attribute(badge, "data-x").as_deref(), Some("hot"));

    state.set("n", 1);
    let rebuilt = handle.root_handle().unwrap();
    assert!(host.borrow().text_content(rebuilt).starts_with('1'));
    assert_eq!(host.borrow().attribute(rebuilt, "data-x").as_deref(), Some("hot"));
    assert_eq!(host.borrow().query_selector_all(rebuilt, "b"), vec![tail]);

    MemoryHost::hover(&host, rebuilt, false);
    assert_eq!(host.borrow().attribute(rebuilt, "data-x").as_deref(), Some("plain"));
}

#[test]
fn test_pass_with_busy_host_is_reported() {
    let rt = Runtime::default();
    let state = rt.create_reactive(json!({ "n": 0 })).unwrap();
    let (host, root) = setup();

    let s = state.clone();
    let handle = render(&rt, move || el("p").child(s.get("n")), host.clone(), root).unwrap();

    {
        let _busy = host.borrow_mut();
        state.set("n", 1);
    }
    assert_eq!(handle.render_count(), 1);
    assert!(matches!(handle.take_error(), Some(SparkError::HostBusy)));

    state.set("n", 2);
    assert_eq!(host.borrow().inner_html(root), "<p>2</p>");
}
