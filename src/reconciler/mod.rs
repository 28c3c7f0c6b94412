//! Reconciler - mounts canonical trees into a [`Host`] and patches them.
//!
//! # Architecture
//!
//! ```text
//! reconcile(old?, new?)
//!   ├─ mount    new subtree -> host nodes          (mount.rs)
//!   ├─ patch    same type: update in place          (patch.rs)
//!   │    └─ patch_children: keyed diff + LIS moves  (patch.rs, lis.rs)
//!   ├─ unmount  release bindings, remove handles    (mount.rs)
//!   └─ apply    resolved props -> attributes,
//!               properties, styles, handlers        (apply.rs)
//! ```
//!
//! Every mounted node carries a shared [`Mounted`] record. Patching moves
//! that record from the old canonical node to the new one, so the live
//! handle, the interaction state and the handler table survive re-renders.

pub mod apply;
pub mod lis;
mod mount;
mod patch;

pub use lis::longest_increasing_subsequence;

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use tracing::trace;

use crate::error::SparkError;
use crate::host::Host;
use crate::pipeline::Runtime;
use crate::props::InteractionState;
use crate::types::{Event, EventHandler, ListenerId, NodeId, NodeRef, PropMap};
use crate::vdom::{VKind, VNode};

// =============================================================================
// Mounted
// =============================================================================

/// Live state of a mounted canonical node.
pub struct Mounted {
    /// Element, text node, template root, or the anchor of a fragment.
    pub(crate) handle: NodeId,
    /// Template children container and the slot marker they go before.
    pub(crate) slot: Option<(NodeId, NodeId)>,
    /// Placeholder for an element with an invalid tag name.
    pub(crate) inert: bool,
    pub(crate) interaction: Cell<InteractionState>,
    /// Whether hover/focus listeners are attached.
    pub(crate) interactive: Cell<bool>,
    pub(crate) raw_props: RefCell<PropMap>,
    /// Props last applied to the host, after resolution.
    pub(crate) applied: RefCell<PropMap>,
    /// Uppercased template placeholder names; those props are not applied.
    pub(crate) consumed: HashSet<String>,
    /// Event name -> current handler. Listeners call through this table so
    /// new closures on every render never re-register listeners.
    pub(crate) handlers: Rc<RefCell<HashMap<String, EventHandler>>>,
    pub(crate) trampolines: RefCell<HashMap<String, ListenerId>>,
    pub(crate) node_ref: RefCell<Option<NodeRef>>,
    /// Substitution values the template instance was built from.
    pub(crate) template_inputs: RefCell<IndexMap<String, String>>,
    /// `(selector, event)` -> handler, for template instance listeners.
    pub(crate) selector_handlers: Rc<RefCell<HashMap<(String, String), EventHandler>>>,
}

impl Mounted {
    pub(crate) fn new(handle: NodeId) -> Self {
        Self {
            handle,
            slot: None,
            inert: false,
            interaction: Cell::new(InteractionState::empty()),
            interactive: Cell::new(false),
            raw_props: RefCell::new(PropMap::new()),
            applied: RefCell::new(PropMap::new()),
            consumed: HashSet::new(),
            handlers: Rc::new(RefCell::new(HashMap::new())),
            trampolines: RefCell::new(HashMap::new()),
            node_ref: RefCell::new(None),
            template_inputs: RefCell::new(IndexMap::new()),
            selector_handlers: Rc::new(RefCell::new(HashMap::new())),
        }
    }

    pub fn handle(&self) -> NodeId {
        self.handle
    }

    pub fn interaction(&self) -> InteractionState {
        self.interaction.get()
    }

    /// Install or replace the handler for `event`, adding the listener on
    /// first use.
    pub(crate) fn set_handler<H: Host + ?Sized>(&self, host: &mut H, event: &str, handler: EventHandler) {
        self.handlers.borrow_mut().insert(event.to_string(), handler);
        if self.trampolines.borrow().contains_key(event) {
            return;
        }
        let table = Rc::downgrade(&self.handlers);
        let name = event.to_string();
        let trampoline: EventHandler = Rc::new(move |e: &Event| {
            let handler = table.upgrade().and_then(|t| t.borrow().get(&name).cloned());
            if let Some(handler) = handler {
                handler(e);
            }
        });
        let id = host.add_listener(self.handle, event, trampoline);
        self.trampolines.borrow_mut().insert(event.to_string(), id);
    }

    pub(crate) fn remove_handler<H: Host + ?Sized>(&self, host: &mut H, event: &str) {
        self.handlers.borrow_mut().remove(event);
        if let Some(id) = self.trampolines.borrow_mut().remove(event) {
            host.remove_listener(self.handle, id);
        }
    }

    /// Clear the external reference, if any.
    pub(crate) fn unbind_ref(&self) {
        if let Some(node_ref) = self.node_ref.borrow_mut().take() {
            node_ref.bind(None);
        }
    }
}

// =============================================================================
// Reconciler
// =============================================================================

/// One reconciliation pass against a borrowed host.
pub struct Reconciler<'a, H: Host + 'static> {
    host: &'a mut H,
    /// Captured by interaction listeners, which run outside any pass.
    weak_host: Weak<RefCell<H>>,
    runtime: &'a Runtime,
    /// Viewport tier snapshot for this pass.
    tier: usize,
}

impl<'a, H: Host + 'static> Reconciler<'a, H> {
    pub fn new(host: &'a mut H, weak_host: Weak<RefCell<H>>, runtime: &'a Runtime, tier: usize) -> Self {
        Self {
            host,
            weak_host,
            runtime,
            tier,
        }
    }

    /// Bring the host in line with `next`, given the previously mounted tree.
    ///
    /// `next` gets its live state filled in; `prev` is consumed.
    pub fn reconcile(
        &mut self,
        prev: Option<VNode>,
        next: Option<&mut VNode>,
        container: NodeId,
    ) -> Result<(), SparkError> {
        match (prev, next) {
            (None, None) => Ok(()),
            (None, Some(next)) => self.mount(next, container, None),
            (Some(prev), None) => {
                self.unmount(prev);
                Ok(())
            }
            (Some(prev), Some(next)) => self.patch(prev, next, container),
        }
    }

    /// First live node a subtree occupies, for use as an insertion reference.
    pub(crate) fn first_handle(node: &VNode) -> Option<NodeId> {
        match node.kind {
            VKind::Fragment => node
                .children
                .iter()
                .find_map(Self::first_handle)
                .or_else(|| node.handle()),
            _ => node.handle(),
        }
    }

    /// Move a mounted subtree before `anchor` in `container`.
    pub(crate) fn move_node(&mut self, node: &VNode, container: NodeId, anchor: Option<NodeId>) {
        if let VKind::Fragment = node.kind {
            for child in &node.children {
                self.move_node(child, container, anchor);
            }
        }
        if let Some(handle) = node.handle() {
            trace!(node = handle.0, "move");
            self.host.insert_before(container, handle, anchor);
        }
    }
}
