//! Render loop - one effect per render root.
//!
//! # Pass structure
//!
//! ```text
//! render effect (tracked)
//!   ├─ read active viewport tier
//!   ├─ call view function
//!   ├─ normalize to canonical tree      <- reactive reads recorded here
//!   └─ untracked
//!        ├─ capture focus
//!        ├─ mount (first pass) or patch (later passes)
//!        ├─ restore focus
//!        └─ store the new tree
//! ```
//!
//! Any write to state the view read re-runs the effect synchronously, so a
//! sequence of writes produces one pass per effective write.
//!
//! # Example
//!
//! ```ignore
//! let rt = Runtime::default();
//! let state = rt.create_reactive(json!({ "count": 0 }))?;
//! let host = Rc::new(RefCell::new(MemoryHost::new()));
//! let root = host.borrow_mut().create_root();
//!
//! let view_state = state.clone();
//! let handle = rt
//!     .root()
//!     .view(move || el("p").child(format!("Count: {}", view_state.get("count"))))
//!     .target(host.clone(), root)
//!     .render()?;
//!
//! state.set("count", 1); // re-renders
//! handle.unmount();
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use tracing::{debug, error, info};

use super::focus::FocusSnapshot;
use super::runtime::Runtime;
use crate::error::SparkError;
use crate::host::Host;
use crate::reactive::EffectHandle;
use crate::reconciler::Reconciler;
use crate::types::NodeId;
use crate::vdom::{VNode, View, normalize};

type ViewFn = Box<dyn FnMut() -> View>;

#[derive(Default)]
struct RootState {
    tree: Option<VNode>,
    passes: usize,
    last_error: Option<SparkError>,
}

// =============================================================================
// Render Root Builder
// =============================================================================

/// Builder for a render root: a view function plus a target container.
pub struct RenderRoot<H: Host + 'static> {
    runtime: Runtime,
    view: Option<ViewFn>,
    target: Option<(Rc<RefCell<H>>, NodeId)>,
}

impl Runtime {
    /// Start configuring a render root.
    pub fn root<H: Host + 'static>(&self) -> RenderRoot<H> {
        RenderRoot {
            runtime: self.clone(),
            view: None,
            target: None,
        }
    }
}

impl<H: Host + 'static> RenderRoot<H> {
    pub fn view<V: Into<View>>(mut self, mut view: impl FnMut() -> V + 'static) -> Self {
        self.view = Some(Box::new(move || view().into()));
        self
    }

    pub fn target(mut self, host: Rc<RefCell<H>>, container: NodeId) -> Self {
        self.target = Some((host, container));
        self
    }

    /// Run the first pass and keep re-rendering on change.
    ///
    /// Fails before any pass runs when the view or the target is missing, and
    /// fails with the first pass's error if that pass could not render.
    pub fn render(self) -> Result<RenderHandle<H>, SparkError> {
        let view = self.view.ok_or(SparkError::MissingView)?;
        let (host, container) = self.target.ok_or(SparkError::MissingTarget)?;
        start(self.runtime, view, host, container)
    }
}

/// Render `view` into `container`. Shorthand for the [`RenderRoot`] builder.
pub fn render<H, V>(
    runtime: &Runtime,
    view: impl FnMut() -> V + 'static,
    host: Rc<RefCell<H>>,
    container: NodeId,
) -> Result<RenderHandle<H>, SparkError>
where
    H: Host + 'static,
    V: Into<View>,
{
    runtime.root().view(view).target(host, container).render()
}

fn start<H: Host + 'static>(
    runtime: Runtime,
    mut view: ViewFn,
    host: Rc<RefCell<H>>,
    container: NodeId,
) -> Result<RenderHandle<H>, SparkError> {
    let state = Rc::new(RefCell::new(RootState::default()));

    let weak_runtime = runtime.downgrade();
    let weak_host = Rc::downgrade(&host);
    let root_state = state.clone();
    let effect = runtime.create_effect(move || {
        let (Some(runtime), Some(host)) = (weak_runtime.upgrade(), weak_host.upgrade()) else {
            return;
        };

        // Tracked phase.
        let tier = runtime.viewport_tier();
        let next = match normalize(view(), &runtime) {
            Ok(next) => next,
            Err(err) => {
                error!(%err, "render pass failed; keeping the previous tree");
                root_state.borrow_mut().last_error = Some(err);
                return;
            }
        };

        // Untracked phase.
        runtime.untracked(|| {
            let Ok(mut host_ref) = host.try_borrow_mut() else {
                error!("host is already borrowed; skipping render pass");
                root_state.borrow_mut().last_error = Some(SparkError::HostBusy);
                return;
            };
            let mut root = root_state.borrow_mut();
            let focus = FocusSnapshot::capture(&*host_ref, container);

            let mut next = next;
            let prev = root.tree.take();
            let result = Reconciler::new(&mut *host_ref, Rc::downgrade(&host), &runtime, tier).reconcile(
                prev,
                next.as_mut(),
                container,
            );
            root.tree = next;
            root.passes += 1;
            if let Err(err) = result {
                error!(%err, pass = root.passes, "reconciliation failed");
                root.last_error = Some(err);
            }

            if let Some(focus) = focus {
                focus.restore(&mut *host_ref, container);
            }
            debug!(pass = root.passes, "render pass complete");
        });
    });

    let handle = RenderHandle {
        runtime,
        host,
        container,
        state,
        effect: Some(effect),
    };
    let first_error = handle.state.borrow_mut().last_error.take();
    if let Some(err) = first_error {
        handle.unmount();
        return Err(err);
    }
    info!(container = container.0, "render root mounted");
    Ok(handle)
}

// =============================================================================
// Render Handle
// =============================================================================

/// Handle to a live render root.
///
/// Dropping the handle leaves the root rendering; call
/// [`RenderHandle::unmount`] to stop it and remove its nodes.
pub struct RenderHandle<H: Host + 'static> {
    runtime: Runtime,
    host: Rc<RefCell<H>>,
    container: NodeId,
    state: Rc<RefCell<RootState>>,
    effect: Option<EffectHandle>,
}

impl<H: Host + 'static> RenderHandle<H> {
    /// Number of completed render passes, the first one included.
    pub fn render_count(&self) -> usize {
        self.state.borrow().passes
    }

    /// Error of the most recent failed pass, if any. Clears it.
    pub fn take_error(&self) -> Option<SparkError> {
        self.state.borrow_mut().last_error.take()
    }

    pub fn has_error(&self) -> bool {
        self.state.borrow().last_error.is_some()
    }

    pub fn container(&self) -> NodeId {
        self.container
    }

    pub fn is_active(&self) -> bool {
        self.effect.as_ref().is_some_and(EffectHandle::is_active)
    }

    /// Call `f` with the current canonical tree.
    pub fn with_tree<T>(&self, f: impl FnOnce(Option<&VNode>) -> T) -> T {
        f(self.state.borrow().tree.as_ref())
    }

    /// Live handle of the root node.
    pub fn root_handle(&self) -> Option<NodeId> {
        self.with_tree(|tree| tree.and_then(VNode::handle))
    }

    /// Stop re-rendering and remove everything this root mounted.
    pub fn unmount(mut self) {
        if let Some(effect) = self.effect.take() {
            effect.dispose();
        }
        let tree = self.state.borrow_mut().tree.take();
        let weak = Rc::downgrade(&self.host);
        let tier = self.runtime.current_tier();
        let Ok(mut host) = self.host.try_borrow_mut() else {
            error!("host is borrowed; render root nodes left in place");
            return;
        };
        let result = Reconciler::new(&mut *host, weak, &self.runtime, tier).reconcile(tree, None, self.container);
        if let Err(err) = result {
            error!(%err, "unmount failed");
        }
        info!(container = self.container.0, "render root unmounted");
    }
}
