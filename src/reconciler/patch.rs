//! Patching: in-place updates and the keyed child-list diff.
//!
//! # Child-list algorithm
//!
//! 1. Patch the common prefix of same-type pairs.
//! 2. Patch the common suffix of same-type pairs.
//! 3. Old list exhausted: mount the remaining new nodes in place.
//! 4. New list exhausted: unmount the remaining old nodes.
//! 5. Otherwise, for the unknown middle:
//!    - index new nodes by key
//!    - match each old node by key (or, keyless, by the first unmatched
//!      keyless same-type new node) and patch it; unmatched old nodes are
//!      unmounted
//!    - record `old index + 1` per new position (`0` = fresh) and whether
//!      matched positions ever decreased
//!    - walk new positions backwards: mount fresh nodes, and, if anything
//!      moved, move every node not on the longest increasing subsequence
//!      before the next sibling (or the list's tail anchor)

use std::collections::HashMap;

use tracing::{debug, warn};

use super::Reconciler;
use super::apply::apply_props;
use super::lis::longest_increasing_subsequence;
use super::mount::substitution_values;
use crate::error::SparkError;
use crate::host::Host;
use crate::types::{Key, NodeId};
use crate::vdom::{SelectorListeners, TemplateNode, VKind, VNode, same_type};

fn listener_signature(listeners: &SelectorListeners) -> Vec<(&str, &str)> {
    listeners
        .iter()
        .flat_map(|(selector, events)| events.keys().map(move |event| (selector.as_str(), event.as_str())))
        .collect()
}

impl<H: Host + 'static> Reconciler<'_, H> {
    /// Update `old` into `new`. Same type: reuse the live node. Otherwise
    /// mount `new` in `old`'s place and unmount `old`.
    pub(crate) fn patch(&mut self, old: VNode, new: &mut VNode, container: NodeId) -> Result<(), SparkError> {
        let Some(mounted) = old.mounted.clone() else {
            warn!(node = new.kind.label(), "previous node was never mounted; mounting fresh");
            return self.mount(new, container, None);
        };

        if !same_type(&old, new) {
            let reference = Self::first_handle(&old);
            let parent = reference.and_then(|r| self.host.parent(r)).unwrap_or(container);
            self.mount(new, parent, reference)?;
            self.unmount(old);
            return Ok(());
        }
        if mounted.inert {
            new.mounted = Some(mounted);
            return Ok(());
        }

        match &new.kind {
            VKind::Text(text) => {
                if old.text_content() != Some(text.as_str()) {
                    self.host.set_text(mounted.handle, text);
                }
            }
            VKind::Element { .. } => {
                new.resolved_props = self.resolve(&new.raw_props, mounted.interaction.get());
                apply_props(&mut *self.host, &mounted, &new.resolved_props);
                *mounted.raw_props.borrow_mut() = new.raw_props.clone();
                self.attach_interaction(&mounted);
                self.patch_children(old.children, &mut new.children, mounted.handle, None)?;
            }
            VKind::Fragment => {
                let parent = self.host.parent(mounted.handle).unwrap_or(container);
                self.patch_children(old.children, &mut new.children, parent, Some(mounted.handle))?;
            }
            VKind::Template(template) => {
                let template = template.clone();
                new.resolved_props = self.resolve(&new.raw_props, mounted.interaction.get());
                let values = substitution_values(&new.resolved_props, &template);
                let listeners_changed = match &old.kind {
                    VKind::Template(previous) => {
                        listener_signature(&previous.listeners) != listener_signature(&template.listeners)
                    }
                    _ => true,
                };
                if *mounted.template_inputs.borrow() != values || listeners_changed {
                    debug!(template = %template.name, "template inputs changed; re-instantiating");
                    return self.reinstantiate(old, new, &template, container);
                }

                apply_props(&mut *self.host, &mounted, &new.resolved_props);
                *mounted.raw_props.borrow_mut() = new.raw_props.clone();
                Self::refresh_selector_handlers(&mounted, &template);
                self.attach_interaction(&mounted);
                if let Some((slot_parent, marker)) = mounted.slot {
                    self.patch_children(old.children, &mut new.children, slot_parent, Some(marker))?;
                }
            }
        }
        new.mounted = Some(mounted);
        Ok(())
    }

    /// Rebuild a template instance in place of `old`. The interaction state
    /// carries over, and slot children are moved into the new slot and
    /// patched rather than remounted.
    fn reinstantiate(
        &mut self,
        mut old: VNode,
        new: &mut VNode,
        template: &TemplateNode,
        container: NodeId,
    ) -> Result<(), SparkError> {
        let Some(mounted) = old.mounted.clone() else {
            return self.mount(new, container, None);
        };
        let parent = self.host.parent(mounted.handle).unwrap_or(container);
        let old_children = std::mem::take(&mut old.children);
        let new_children = std::mem::take(&mut new.children);
        self.mount_template(new, template, parent, Some(mounted.handle), mounted.interaction.get())?;
        new.children = new_children;

        match new.mounted.as_ref().and_then(|m| m.slot) {
            Some((slot_parent, marker)) => {
                for child in &old_children {
                    self.move_node(child, slot_parent, Some(marker));
                }
                self.patch_children(old_children, &mut new.children, slot_parent, Some(marker))?;
            }
            None => {
                if !new.children.is_empty() {
                    warn!(template = %template.name, "template has no {{{{SLOT}}}}; children are not rendered");
                }
                for child in old_children {
                    self.unmount(child);
                }
            }
        }
        self.unmount(old);
        Ok(())
    }

    /// Insertion reference for position `index` of `nodes`: the first live
    /// node of `nodes[index]`, else the list's tail anchor.
    fn anchor_at(nodes: &[VNode], index: usize, tail: Option<NodeId>) -> Option<NodeId> {
        nodes.get(index).and_then(Self::first_handle).or(tail)
    }

    /// Diff two child lists living in `container`, before `tail` (`None` =
    /// end of the container).
    pub(crate) fn patch_children(
        &mut self,
        old: Vec<VNode>,
        new: &mut [VNode],
        container: NodeId,
        tail: Option<NodeId>,
    ) -> Result<(), SparkError> {
        let mut old: Vec<Option<VNode>> = old.into_iter().map(Some).collect();
        let mut start = 0;
        let mut old_end = old.len();
        let mut new_end = new.len();

        // 1. Common prefix.
        while start < old_end && start < new_end {
            match old[start].as_ref() {
                Some(o) if same_type(o, &new[start]) => {}
                _ => break,
            }
            if let Some(o) = old[start].take() {
                self.patch(o, &mut new[start], container)?;
            }
            start += 1;
        }

        // 2. Common suffix.
        while start < old_end && start < new_end {
            match old[old_end - 1].as_ref() {
                Some(o) if same_type(o, &new[new_end - 1]) => {}
                _ => break,
            }
            if let Some(o) = old[old_end - 1].take() {
                self.patch(o, &mut new[new_end - 1], container)?;
            }
            old_end -= 1;
            new_end -= 1;
        }

        // 3. Pure insertion.
        if start >= old_end {
            let anchor = Self::anchor_at(new, new_end, tail);
            for node in &mut new[start..new_end] {
                self.mount(node, container, anchor)?;
            }
            return Ok(());
        }

        // 4. Pure removal.
        if start >= new_end {
            for slot in &mut old[start..old_end] {
                if let Some(o) = slot.take() {
                    self.unmount(o);
                }
            }
            return Ok(());
        }

        // 5. Unknown middle.
        let key_to_new: HashMap<Key, usize> = (start..new_end)
            .filter_map(|j| new[j].key.clone().map(|key| (key, j)))
            .collect();
        let to_patch = new_end - start;
        let mut new_to_old = vec![0usize; to_patch];
        let mut patched = 0;
        let mut moved = false;
        let mut max_new_index = 0;

        for old_index in start..old_end {
            let Some(o) = old[old_index].take() else {
                continue;
            };
            if patched >= to_patch {
                self.unmount(o);
                continue;
            }
            let target = match &o.key {
                Some(key) => key_to_new.get(key).copied(),
                None => (start..new_end).find(|&j| {
                    new_to_old[j - start] == 0 && new[j].key.is_none() && same_type(&o, &new[j])
                }),
            };
            match target {
                Some(j) if new_to_old[j - start] == 0 => {
                    new_to_old[j - start] = old_index + 1;
                    if j >= max_new_index {
                        max_new_index = j;
                    } else {
                        moved = true;
                    }
                    self.patch(o, &mut new[j], container)?;
                    patched += 1;
                }
                _ => self.unmount(o),
            }
        }

        let stable = if moved {
            longest_increasing_subsequence(&new_to_old)
        } else {
            Vec::new()
        };
        let mut stable = stable.iter().rev().peekable();
        for k in (0..to_patch).rev() {
            let j = start + k;
            let anchor = Self::anchor_at(new, j + 1, tail);
            if new_to_old[k] == 0 {
                self.mount(&mut new[j], container, anchor)?;
            } else if moved {
                if stable.peek() == Some(&&k) {
                    stable.next();
                } else {
                    self.move_node(&new[j], container, anchor);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::host::{HostOp, MemoryHost};
    use crate::pipeline::Runtime;
    use crate::types::PropMap;

    struct Fixture {
        host: Rc<RefCell<MemoryHost>>,
        runtime: Runtime,
        root: NodeId,
        tree: Option<VNode>,
    }

    impl Fixture {
        fn new() -> Self {
            let host = Rc::new(RefCell::new(MemoryHost::new()));
            let root = host.borrow_mut().create_root();
            Self {
                host,
                runtime: Runtime::default(),
                root,
                tree: None,
            }
        }

        fn render(&mut self, mut next: VNode) {
            let weak = Rc::downgrade(&self.host);
            let mut host = self.host.borrow_mut();
            host.clear_ops();
            let mut reconciler = Reconciler::new(&mut *host, weak, &self.runtime, 0);
            reconciler
                .reconcile(self.tree.take(), Some(&mut next), self.root)
                .unwrap();
            self.tree = Some(next);
        }

        fn html(&self) -> String {
            self.host.borrow().inner_html(self.root)
        }

        fn ops(&self) -> Vec<HostOp> {
            self.host.borrow().ops().to_vec()
        }

        fn child_handles(&self) -> Vec<NodeId> {
            self.tree
                .as_ref()
                .map(|t| t.children.iter().filter_map(VNode::handle).collect())
                .unwrap_or_default()
        }
    }

    fn list(keys: &[i64]) -> VNode {
        let items = keys
            .iter()
            .map(|&k| {
                VNode::element("li", PropMap::new(), vec![VNode::text(k.to_string())]).with_key(Some(Key::from(k)))
            })
            .collect();
        VNode::element("ul", PropMap::new(), items)
    }

    fn count(ops: &[HostOp], f: impl Fn(&HostOp) -> bool) -> usize {
        ops.iter().filter(|op| f(op)).count()
    }

    fn html_of(keys: &[i64]) -> String {
        let items: String = keys.iter().map(|k| format!("<li>{k}</li>")).collect();
        format!("<ul>{items}</ul>")
    }

    #[test]
    fn test_single_move() {
        let mut fx = Fixture::new();
        fx.render(list(&[1, 2, 3, 4]));
        fx.render(list(&[2, 3, 1, 4]));
        let ops = fx.ops();
        assert_eq!(count(&ops, |op| matches!(op, HostOp::Move { .. })), 1);
        assert_eq!(count(&ops, |op| matches!(op, HostOp::Create(_))), 0);
        assert_eq!(count(&ops, |op| matches!(op, HostOp::Remove { .. })), 0);
        assert_eq!(fx.html(), html_of(&[2, 3, 1, 4]));
    }

    #[test]
    fn test_head_to_tail_is_one_move() {
        let mut fx = Fixture::new();
        fx.render(list(&[1, 2, 3, 4, 5]));
        let before = fx.child_handles();
        fx.render(list(&[2, 3, 4, 5, 1]));
        let ops = fx.ops();
        assert_eq!(count(&ops, |op| matches!(op, HostOp::Move { .. })), 1);
        assert_eq!(count(&ops, |op| matches!(op, HostOp::Create(_))), 0);
        assert_eq!(count(&ops, |op| matches!(op, HostOp::Remove { .. } | HostOp::Release(_))), 0);
        assert_eq!(fx.child_handles(), vec![before[1], before[2], before[3], before[4], before[0]]);
        assert_eq!(fx.html(), html_of(&[2, 3, 4, 5, 1]));
    }

    #[test]
    fn test_reverse() {
        let mut fx = Fixture::new();
        fx.render(list(&[1, 2, 3, 4, 5]));
        fx.render(list(&[5, 4, 3, 2, 1]));
        let ops = fx.ops();
        assert_eq!(count(&ops, |op| matches!(op, HostOp::Move { .. })), 4);
        assert_eq!(fx.html(), html_of(&[5, 4, 3, 2, 1]));
    }

    #[test]
    fn test_insert_in_middle() {
        let mut fx = Fixture::new();
        fx.render(list(&[1, 3]));
        let before = fx.child_handles();
        fx.render(list(&[1, 2, 3]));
        let after = fx.child_handles();
        assert_eq!(after[0], before[0]);
        assert_eq!(after[2], before[1]);
        assert_eq!(count(&fx.ops(), |op| matches!(op, HostOp::Move { .. })), 0);
        assert_eq!(fx.html(), html_of(&[1, 2, 3]));
    }

    #[test]
    fn test_remove_from_middle_keeps_handles() {
        let mut fx = Fixture::new();
        fx.render(list(&[1, 2, 3]));
        let before = fx.child_handles();
        fx.render(list(&[1, 3]));
        let after = fx.child_handles();
        assert_eq!(after, vec![before[0], before[2]]);
        assert_eq!(fx.html(), html_of(&[1, 3]));
    }

    #[test]
    fn test_mixed_insert_remove_move() {
        let mut fx = Fixture::new();
        fx.render(list(&[1, 2, 3, 4, 5, 6]));
        fx.render(list(&[1, 5, 7, 3, 2, 6]));
        assert_eq!(fx.html(), html_of(&[1, 5, 7, 3, 2, 6]));
        let ops = fx.ops();
        // 4 removed, 7 created (li + text), 5 and 3 reordered around 2.
        assert_eq!(count(&ops, |op| matches!(op, HostOp::Release(_))), 1);
        assert_eq!(count(&ops, |op| matches!(op, HostOp::Create(_))), 2);
    }

    #[test]
    fn test_keyless_text_patch_in_place() {
        let mut fx = Fixture::new();
        let para = |s: &str| VNode::element("p", PropMap::new(), vec![VNode::text(s)]);
        fx.render(para("a"));
        let handle = fx.tree.as_ref().and_then(VNode::handle);
        fx.render(para("b"));
        assert_eq!(fx.tree.as_ref().and_then(VNode::handle), handle);
        assert_eq!(fx.ops().len(), 1);
        assert_eq!(fx.html(), "<p>b</p>");
    }

    #[test]
    fn test_type_change_replaces() {
        let mut fx = Fixture::new();
        fx.render(VNode::element("p", PropMap::new(), vec![VNode::text("x")]));
        fx.render(VNode::element("span", PropMap::new(), vec![VNode::text("x")]));
        assert_eq!(fx.html(), "<span>x</span>");
    }

    #[test]
    fn test_fragment_root_children_before_anchor() {
        let mut fx = Fixture::new();
        fx.render(VNode::fragment(vec![VNode::text("a"), VNode::text("b")]));
        assert_eq!(fx.html(), "ab<!--fragment-->");
        fx.render(VNode::fragment(vec![VNode::text("a"), VNode::text("b"), VNode::text("c")]));
        assert_eq!(fx.html(), "abc<!--fragment-->");
        fx.render(VNode::fragment(vec![VNode::text("c")]));
        assert_eq!(fx.html(), "c<!--fragment-->");
    }

    #[test]
    fn test_invalid_tag_renders_placeholder() {
        let mut fx = Fixture::new();
        fx.render(VNode::element("1bad", PropMap::new(), vec![VNode::text("x")]));
        assert_eq!(fx.html(), "<!--invalid <1bad>-->");
        fx.render(VNode::element("1bad", PropMap::new(), vec![]));
        assert_eq!(fx.html(), "<!--invalid <1bad>-->");
    }
}
