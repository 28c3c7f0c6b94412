//! Property tests for the keyed child-list diff.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use proptest::prelude::*;
use serde_json::json;
use spark_dom::{HostOp, MemoryHost, NodeId, Reactive, RenderHandle, Runtime, el, render};

fn unique(keys: Vec<u32>) -> Vec<u32> {
    let mut seen = HashSet::new();
    keys.into_iter().filter(|k| seen.insert(*k)).collect()
}

fn rendered_keys(host: &MemoryHost, ul: NodeId) -> Vec<u32> {
    host.element_children(ul)
        .into_iter()
        .filter_map(|li| host.text_content(li).parse().ok())
        .collect()
}

fn mount_list(rt: &Runtime, state: &Reactive, host: &Rc<RefCell<MemoryHost>>, root: NodeId) -> RenderHandle<MemoryHost> {
    let s = state.clone();
    render(
        rt,
        move || {
            let items = s.get("items");
            let list = items.as_reactive().map(|r| r.iter()).unwrap_or_default();
            el("ul").children(list.into_iter().map(|item| el("li").key(item.clone()).child(item)))
        },
        host.clone(),
        root,
    )
    .unwrap()
}

fn permutation() -> impl Strategy<Value = (Vec<u32>, Vec<u32>)> {
    prop::collection::vec(0u32..24, 1..16)
        .prop_map(unique)
        .prop_flat_map(|keys| (Just(keys.clone()), Just(keys).prop_shuffle()))
}

proptest! {
    #[test]
    fn test_dom_order_follows_keys(
        first in prop::collection::vec(0u32..24, 0..16),
        second in prop::collection::vec(0u32..24, 0..16),
    ) {
        let first = unique(first);
        let second = unique(second);

        let rt = Runtime::default();
        let state = rt.create_reactive(json!({ "items": first })).unwrap();
        let host = Rc::new(RefCell::new(MemoryHost::new()));
        let root = host.borrow_mut().create_root();

        let handle = mount_list(&rt, &state, &host, root);
        let ul = handle.root_handle().unwrap();

        let before: HashMap<u32, NodeId> = first
            .iter()
            .copied()
            .zip(host.borrow().element_children(ul))
            .collect();

        state.set("items", json!(second));

        let host = host.borrow();
        prop_assert_eq!(rendered_keys(&host, ul), second.clone());
        for (key, node) in second.iter().zip(host.element_children(ul)) {
            if let Some(previous) = before.get(key) {
                prop_assert_eq!(*previous, node);
            }
        }
    }

    #[test]
    fn test_permutation_only_moves((first, second) in permutation()) {
        let rt = Runtime::default();
        let state = rt.create_reactive(json!({ "items": first })).unwrap();
        let host = Rc::new(RefCell::new(MemoryHost::new()));
        let root = host.borrow_mut().create_root();
        let handle = mount_list(&rt, &state, &host, root);
        let ul = handle.root_handle().unwrap();

        host.borrow_mut().clear_ops();
        state.set("items", json!(second));

        let host = host.borrow();
        prop_assert_eq!(rendered_keys(&host, ul), second.clone());
        let churn = host
            .ops()
            .iter()
            .filter(|op| matches!(op, HostOp::Create(_) | HostOp::Remove { .. } | HostOp::Release(_)))
            .count();
        prop_assert_eq!(churn, 0);
    }
}
