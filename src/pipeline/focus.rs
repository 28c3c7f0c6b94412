//! Focus preservation across render passes.
//!
//! A pass may replace the focused node (type change, template
//! re-instantiation). Before reconciling, the focused node's `id` and
//! selection range are captured; afterwards, if focus was lost, the node with
//! the same `id` under the root is focused again and its selection restored.

use tracing::debug;

use crate::host::{Host, is_within};
use crate::types::NodeId;

/// Focus state captured before a render pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FocusSnapshot {
    node: NodeId,
    id: Option<String>,
    selection: Option<(usize, usize)>,
}

impl FocusSnapshot {
    /// Capture focus if it is inside `root`.
    pub(crate) fn capture<H: Host + ?Sized>(host: &H, root: NodeId) -> Option<Self> {
        let node = host.focused()?;
        if !is_within(host, node, root) {
            return None;
        }
        Some(Self {
            node,
            id: host.attribute(node, "id"),
            selection: host.selection_range(node),
        })
    }

    /// Re-focus by `id` if the focused node did not survive the pass.
    pub(crate) fn restore<H: Host + ?Sized>(self, host: &mut H, root: NodeId) {
        if host.focused() == Some(self.node) && is_within(host, self.node, root) {
            return;
        }
        let Some(id) = self.id else {
            return;
        };
        let Some(target) = host.find_by_id(root, &id) else {
            debug!(id = %id, "focused element no longer rendered");
            return;
        };
        host.focus(target);
        if let Some((start, end)) = self.selection {
            host.set_selection_range(target, start, end);
        }
        debug!(id = %id, node = target.0, "focus restored");
    }
}
