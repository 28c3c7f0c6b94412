//! Mounting and unmounting canonical subtrees.

use std::rc::Rc;

use indexmap::IndexMap;
use tracing::{debug, warn};

use super::apply::apply_props;
use super::{Mounted, Reconciler};
use crate::error::{HostError, SparkError};
use crate::host::Host;
use crate::pipeline::Runtime;
use crate::props::{InteractionState, has_interaction_modifier, resolve};
use crate::template::{SLOT_TAG, instantiate};
use crate::types::{Event, EventHandler, NodeId, PropMap};
use crate::vdom::{TemplateNode, VKind, VNode};

/// Element names accepted by the host: ASCII letter first, then letters,
/// digits or `-`.
pub(crate) fn is_valid_tag(tag: &str) -> bool {
    let mut chars = tag.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '-')
}

/// Placeholder values for a template instance: resolved props by uppercased
/// name, overridden by explicit substitutions.
pub(crate) fn substitution_values(resolved: &PropMap, template: &TemplateNode) -> IndexMap<String, String> {
    let mut values: IndexMap<String, String> = resolved
        .iter()
        .filter_map(|(key, value)| value.to_text().map(|text| (key.to_uppercase(), text)))
        .collect();
    values.extend(template.substitutions.iter().map(|(k, v)| (k.clone(), v.clone())));
    values
}

impl<H: Host + 'static> Reconciler<'_, H> {
    /// Mount `node` (and its subtree) into `parent` before `before`.
    pub(crate) fn mount(&mut self, node: &mut VNode, parent: NodeId, before: Option<NodeId>) -> Result<(), SparkError> {
        match &node.kind {
            VKind::Text(text) => {
                let handle = self.host.create_text(text);
                self.host.insert_before(parent, handle, before);
                node.mounted = Some(Rc::new(Mounted::new(handle)));
            }
            VKind::Fragment => {
                let anchor = self.host.create_anchor("fragment");
                self.host.insert_before(parent, anchor, before);
                for child in &mut node.children {
                    self.mount(child, parent, Some(anchor))?;
                }
                node.mounted = Some(Rc::new(Mounted::new(anchor)));
            }
            VKind::Element { tag } if !is_valid_tag(tag) => {
                warn!(tag = %tag, "invalid element name; rendering an empty placeholder");
                let anchor = self.host.create_anchor(&format!("invalid <{tag}>"));
                self.host.insert_before(parent, anchor, before);
                let mut mounted = Mounted::new(anchor);
                mounted.inert = true;
                node.mounted = Some(Rc::new(mounted));
            }
            VKind::Element { tag } => {
                let handle = self.host.create_element(tag);
                let mounted = Rc::new(Mounted::new(handle));
                node.resolved_props = self.resolve(&node.raw_props, InteractionState::empty());
                apply_props(&mut *self.host, &mounted, &node.resolved_props);
                *mounted.raw_props.borrow_mut() = node.raw_props.clone();
                for child in &mut node.children {
                    self.mount(child, handle, None)?;
                }
                self.host.insert_before(parent, handle, before);
                self.attach_interaction(&mounted);
                node.mounted = Some(mounted);
            }
            VKind::Template(template) => {
                let template = template.clone();
                self.mount_template(node, &template, parent, before, InteractionState::empty())?;
            }
        }
        Ok(())
    }

    /// Instantiate a template and mount `node.children` into its slot.
    /// `interaction` seeds the new instance's hover/focus state.
    pub(crate) fn mount_template(
        &mut self,
        node: &mut VNode,
        template: &TemplateNode,
        parent: NodeId,
        before: Option<NodeId>,
        interaction: InteractionState,
    ) -> Result<(), SparkError> {
        node.resolved_props = self.resolve(&node.raw_props, interaction);
        let values = substitution_values(&node.resolved_props, template);
        let markup = instantiate(&template.asset, &values)?;
        if let Some(css) = &template.asset.css {
            self.runtime.inject_stylesheet_once(&mut *self.host, &template.name, css);
        }

        let fragment = self.host.parse_markup(&markup)?;
        let root = self
            .host
            .children(fragment)
            .into_iter()
            .find(|n| self.host.tag_name(*n).is_some());
        let Some(root) = root else {
            self.host.release(fragment);
            return Err(HostError::EmptyTemplate.into());
        };
        self.host.remove_child(fragment, root);
        self.host.release(fragment);

        let slot = self
            .host
            .query_selector_all(root, SLOT_TAG)
            .first()
            .and_then(|&marker| self.host.parent(marker).map(|container| (container, marker)));
        if slot.is_none() && !node.children.is_empty() {
            warn!(template = %template.name, "template has no {{{{SLOT}}}}; children are not rendered");
        }

        let mut mounted = Mounted::new(root);
        mounted.slot = slot;
        mounted.consumed = template.asset.placeholders();
        mounted.interaction.set(interaction);
        let mounted = Rc::new(mounted);
        *mounted.template_inputs.borrow_mut() = values;

        apply_props(&mut *self.host, &mounted, &node.resolved_props);
        *mounted.raw_props.borrow_mut() = node.raw_props.clone();
        self.bind_selector_listeners(&mounted, template);

        if let Some((container, marker)) = slot {
            for child in &mut node.children {
                self.mount(child, container, Some(marker))?;
            }
        }
        self.host.insert_before(parent, root, before);
        self.attach_interaction(&mounted);
        debug!(template = %template.name, root = root.0, "template instantiated");
        node.mounted = Some(mounted);
        Ok(())
    }

    /// Attach per-selector listeners; handlers are looked up on every event
    /// so patches can swap them.
    pub(crate) fn bind_selector_listeners(&mut self, mounted: &Rc<Mounted>, template: &TemplateNode) {
        let mut table = mounted.selector_handlers.borrow_mut();
        table.clear();
        for (selector, events) in &template.listeners {
            for (event, handler) in events {
                table.insert((selector.clone(), event.clone()), handler.clone());
            }
        }
        drop(table);

        for (selector, events) in &template.listeners {
            let targets = self.host.query_selector_all(mounted.handle, selector);
            if targets.is_empty() {
                debug!(selector = %selector, "template listener matched no elements");
            }
            for target in targets {
                for event in events.keys() {
                    let table = Rc::downgrade(&mounted.selector_handlers);
                    let key = (selector.clone(), event.clone());
                    let listener: EventHandler = Rc::new(move |e: &Event| {
                        let handler = table.upgrade().and_then(|t| t.borrow().get(&key).cloned());
                        if let Some(handler) = handler {
                            handler(e);
                        }
                    });
                    self.host.add_listener(target, event, listener);
                }
            }
        }
    }

    /// Refresh handler closures for an unchanged template instance.
    pub(crate) fn refresh_selector_handlers(mounted: &Mounted, template: &TemplateNode) {
        let mut table = mounted.selector_handlers.borrow_mut();
        for (selector, events) in &template.listeners {
            for (event, handler) in events {
                if let Some(slot) = table.get_mut(&(selector.clone(), event.clone())) {
                    *slot = handler.clone();
                }
            }
        }
    }

    pub(crate) fn resolve(&self, raw: &PropMap, interaction: InteractionState) -> PropMap {
        resolve(raw, self.tier, interaction, self.runtime.breakpoints())
    }

    /// Add hover/focus listeners when any raw key is interaction-gated.
    pub(crate) fn attach_interaction(&mut self, mounted: &Rc<Mounted>) {
        if mounted.interactive.get() {
            return;
        }
        let needed = mounted
            .raw_props
            .borrow()
            .keys()
            .any(|key| has_interaction_modifier(key));
        if !needed {
            return;
        }
        mounted.interactive.set(true);

        let transitions = [
            ("mouseenter", InteractionState::HOVER, true),
            ("mouseleave", InteractionState::HOVER, false),
            ("focus", InteractionState::FOCUS, true),
            ("blur", InteractionState::FOCUS, false),
        ];
        for (event, flag, entered) in transitions {
            let weak_mounted = Rc::downgrade(mounted);
            let weak_host = self.weak_host.clone();
            let runtime = self.runtime.downgrade();
            let listener: EventHandler = Rc::new(move |_: &Event| {
                let (Some(mounted), Some(host), Some(runtime)) =
                    (weak_mounted.upgrade(), weak_host.upgrade(), runtime.upgrade())
                else {
                    return;
                };
                let mut state = mounted.interaction.get();
                state.set(flag, entered);
                if state == mounted.interaction.get() {
                    return;
                }
                mounted.interaction.set(state);
                match host.try_borrow_mut() {
                    Ok(mut host) => reapply(&mut *host, &mounted, &runtime),
                    Err(_) => warn!("host busy; interaction change applied on next render"),
                }
            });
            self.host.add_listener(mounted.handle, event, listener);
        }
    }

    // =========================================================================
    // Unmount
    // =========================================================================

    /// Remove a mounted subtree. References are cleared before the handle is
    /// removed from its parent.
    pub(crate) fn unmount(&mut self, node: VNode) {
        let Some(mounted) = node.mounted.clone() else {
            return;
        };
        if let VKind::Fragment = node.kind {
            for child in node.children {
                self.unmount(child);
            }
        } else {
            release_refs(&node);
        }
        let handle = mounted.handle;
        if let Some(parent) = self.host.parent(handle) {
            self.host.remove_child(parent, handle);
        }
        self.host.release(handle);
    }
}

/// Re-resolve a node's props after an interaction change, outside a render
/// pass.
fn reapply<H: Host + ?Sized>(host: &mut H, mounted: &Mounted, runtime: &Runtime) {
    let resolved = resolve(
        &mounted.raw_props.borrow(),
        runtime.current_tier(),
        mounted.interaction.get(),
        runtime.breakpoints(),
    );
    apply_props(host, mounted, &resolved);
}

fn release_refs(node: &VNode) {
    for child in &node.children {
        release_refs(child);
    }
    if let Some(mounted) = &node.mounted {
        mounted.unbind_ref();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::host::MemoryHost;
    use crate::template::TemplateAsset;
    use crate::types::NodeRef;
    use crate::vdom::{View, el, normalize, template};

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

        fn render(&mut self, view: impl Into<View>) {
            let mut next = normalize(view.into(), &self.runtime).unwrap();
            let weak = Rc::downgrade(&self.host);
            let mut host = self.host.borrow_mut();
            let tier = self.runtime.current_tier();
            Reconciler::new(&mut *host, weak, &self.runtime, tier)
                .reconcile(self.tree.take(), next.as_mut(), self.root)
                .unwrap();
            self.tree = next;
        }

        fn clear(&mut self) {
            let weak = Rc::downgrade(&self.host);
            let mut host = self.host.borrow_mut();
            Reconciler::new(&mut *host, weak, &self.runtime, 0)
                .reconcile(self.tree.take(), None, self.root)
                .unwrap();
        }

        fn root_handle(&self) -> NodeId {
            self.tree.as_ref().and_then(VNode::handle).unwrap()
        }

        fn html(&self) -> String {
            self.host.borrow().inner_html(self.root)
        }
    }

    #[test]
    fn test_valid_tags() {
        assert!(is_valid_tag("div"));
        assert!(is_valid_tag("my-widget2"));
        assert!(!is_valid_tag(""));
        assert!(!is_valid_tag("2col"));
        assert!(!is_valid_tag("a b"));
    }

    #[test]
    fn test_template_fills_slot_and_consumes_placeholders() {
        let mut fx = Fixture::new();
        fx.runtime.register_template(
            "card",
            TemplateAsset::new(r#"<section class="card"><h2>{{TITLE}}</h2>{{SLOT}}</section>"#)
                .with_css(".card { padding: 4px }"),
        );
        fx.render(
            el("div")
                .child(template("card").attr("title", "Hi").attr("id", "c1").child("body"))
                .child(template("card").attr("title", "There")),
        );

        let html = fx.html();
        assert!(html.contains("<h2>Hi</h2>"));
        assert!(html.contains("<h2>There</h2>"));
        assert!(html.contains("body<spark-slot></spark-slot>"));
        assert!(html.contains(r#"id="c1""#));
        assert!(!html.contains("title="));
        assert_eq!(fx.host.borrow().stylesheets().len(), 1);
    }

    #[test]
    fn test_template_without_element_is_an_error() {
        let mut fx = Fixture::new();
        fx.runtime.register_template("blank", TemplateAsset::new("just text"));
        let mut next = normalize(template("blank").build(), &fx.runtime).unwrap();
        let weak = Rc::downgrade(&fx.host);
        let mut host = fx.host.borrow_mut();
        let result = Reconciler::new(&mut *host, weak, &fx.runtime, 0).reconcile(None, next.as_mut(), fx.root);
        assert!(matches!(result, Err(SparkError::Host(HostError::EmptyTemplate))));
    }

    #[test]
    fn test_hover_reresolves_props() {
        let mut fx = Fixture::new();
        fx.render(el("button").attr("class", "btn").attr("hover:class", "btn hot"));
        let button = fx.root_handle();

        MemoryHost::hover(&fx.host, button, true);
        assert_eq!(fx.host.borrow().attribute(button, "class").as_deref(), Some("btn hot"));

        MemoryHost::hover(&fx.host, button, false);
        assert_eq!(fx.host.borrow().attribute(button, "class").as_deref(), Some("btn"));
    }

    #[test]
    fn test_plain_element_gets_no_interaction_listeners() {
        let mut fx = Fixture::new();
        fx.render(el("p").attr("class", "plain"));
        assert_eq!(fx.host.borrow().listener_count(fx.root_handle()), 0);
    }

    #[test]
    fn test_ref_bound_on_mount_and_cleared_on_unmount() {
        let mut fx = Fixture::new();
        let node_ref = NodeRef::new();
        fx.render(el("div").child(el("input").node_ref(&node_ref)));
        let input = fx.host.borrow().element_children(fx.root_handle())[0];
        assert_eq!(node_ref.get(), Some(input));

        fx.clear();
        assert!(!node_ref.is_bound());
        assert_eq!(fx.html(), "");
    }
}
