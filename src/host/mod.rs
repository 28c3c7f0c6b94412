//! Host document interface.
//!
//! The reconciler never touches a real document directly. It drives a
//! [`Host`]: a tree of live nodes addressed by [`NodeId`] with attributes,
//! live properties, inline styles and event listeners.
//!
//! [`MemoryHost`] is the in-process implementation used by tests and demos.

pub mod markup;
pub mod memory;

pub use memory::{HostOp, MemoryHost};

use crate::error::HostError;
use crate::types::{EventHandler, ListenerId, NodeId, PropValue};

/// Live document operations used by the reconciler.
///
/// Node handles stay valid until [`Host::release`] is called on them (or on
/// an ancestor).
pub trait Host {
    // -------------------------------------------------------------------------
    // Creation
    // -------------------------------------------------------------------------

    fn create_element(&mut self, tag: &str) -> NodeId;
    fn create_text(&mut self, text: &str) -> NodeId;
    /// Invisible marker node (a comment in a browser document).
    fn create_anchor(&mut self, label: &str) -> NodeId;
    /// Container whose children move into the parent on insertion.
    fn create_fragment(&mut self) -> NodeId;
    /// Parse markup into a new detached fragment container.
    fn parse_markup(&mut self, markup: &str) -> Result<NodeId, HostError>;

    // -------------------------------------------------------------------------
    // Structure
    // -------------------------------------------------------------------------

    /// Insert (or move) `child` into `parent` before `reference`; `None`
    /// appends.
    fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>);

    fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.insert_before(parent, child, None);
    }

    fn remove_child(&mut self, parent: NodeId, child: NodeId);
    fn parent(&self, node: NodeId) -> Option<NodeId>;
    fn children(&self, node: NodeId) -> Vec<NodeId>;
    fn next_sibling(&self, node: NodeId) -> Option<NodeId>;
    /// Tag name, `None` for text, anchor and fragment nodes.
    fn tag_name(&self, node: NodeId) -> Option<String>;
    fn set_text(&mut self, node: NodeId, text: &str);
    /// Destroy a node and its subtree, dropping their listeners.
    fn release(&mut self, node: NodeId);

    // -------------------------------------------------------------------------
    // Attributes, properties, styles
    // -------------------------------------------------------------------------

    fn attribute(&self, node: NodeId, name: &str) -> Option<String>;
    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str);
    fn remove_attribute(&mut self, node: NodeId, name: &str);
    /// Live property (`value`, `checked`, `disabled`).
    fn property(&self, node: NodeId, name: &str) -> Option<PropValue>;
    fn set_property(&mut self, node: NodeId, name: &str, value: PropValue);
    /// Set (`Some`) or clear (`None`) one inline style declaration.
    fn set_style(&mut self, node: NodeId, name: &str, value: Option<&str>);

    // -------------------------------------------------------------------------
    // Events
    // -------------------------------------------------------------------------

    fn add_listener(&mut self, node: NodeId, event: &str, listener: EventHandler) -> ListenerId;
    fn remove_listener(&mut self, node: NodeId, listener: ListenerId);

    // -------------------------------------------------------------------------
    // Queries and document state
    // -------------------------------------------------------------------------

    /// Descendants of `root` (excluding `root`) matching a simple selector.
    fn query_selector_all(&self, root: NodeId, selector: &str) -> Vec<NodeId>;
    /// Descendant of `root` (or `root` itself) whose `id` attribute matches.
    fn find_by_id(&self, root: NodeId, id: &str) -> Option<NodeId>;
    /// Add a document-level stylesheet.
    fn inject_stylesheet(&mut self, id: &str, css: &str);
    fn focused(&self) -> Option<NodeId>;
    fn focus(&mut self, node: NodeId);
    fn selection_range(&self, node: NodeId) -> Option<(usize, usize)>;
    fn set_selection_range(&mut self, node: NodeId, start: usize, end: usize);
}

/// Whether `node` is `root` or one of its descendants.
pub fn is_within<H: Host + ?Sized>(host: &H, node: NodeId, root: NodeId) -> bool {
    let mut current = Some(node);
    while let Some(n) = current {
        if n == root {
            return true;
        }
        current = host.parent(n);
    }
    false
}
