//! Canonical tree nodes.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use super::view::SelectorListeners;
use crate::reconciler::Mounted;
use crate::template::TemplateAsset;
use crate::types::{Key, NodeId, PropMap};

/// Template instance data carried by a canonical node.
#[derive(Clone)]
pub struct TemplateNode {
    pub name: String,
    pub asset: Rc<TemplateAsset>,
    pub substitutions: IndexMap<String, String>,
    pub listeners: SelectorListeners,
}

impl fmt::Debug for TemplateNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateNode")
            .field("name", &self.name)
            .field("asset", &self.asset)
            .field("substitutions", &self.substitutions)
            .field("listeners", &self.listeners.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// What a canonical node renders as.
#[derive(Debug, Clone)]
pub enum VKind {
    Text(String),
    /// Only produced at the root; nested fragments are flattened away.
    Fragment,
    Element { tag: String },
    Template(TemplateNode),
}

impl VKind {
    /// Short label for logs.
    pub fn label(&self) -> &str {
        match self {
            VKind::Text(_) => "#text",
            VKind::Fragment => "#fragment",
            VKind::Element { tag } => tag,
            VKind::Template(t) => &t.name,
        }
    }
}

/// A node of the canonical tree.
///
/// `mounted` is filled in by the reconciler and transferred from the old node
/// to the new one on patch.
#[derive(Clone)]
pub struct VNode {
    pub kind: VKind,
    pub key: Option<Key>,
    /// Props as authored, responsive keys included.
    pub raw_props: PropMap,
    /// Props applied at the last mount/patch.
    pub resolved_props: PropMap,
    pub children: Vec<VNode>,
    pub(crate) mounted: Option<Rc<Mounted>>,
}

impl fmt::Debug for VNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VNode")
            .field("kind", &self.kind)
            .field("key", &self.key)
            .field("raw_props", &self.raw_props)
            .field("resolved_props", &self.resolved_props)
            .field("children", &self.children)
            .field("mounted", &self.handle())
            .finish()
    }
}

impl VNode {
    pub fn new(kind: VKind) -> Self {
        Self {
            kind,
            key: None,
            raw_props: PropMap::new(),
            resolved_props: PropMap::new(),
            children: Vec::new(),
            mounted: None,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(VKind::Text(text.into()))
    }

    pub fn fragment(children: Vec<VNode>) -> Self {
        Self {
            children,
            ..Self::new(VKind::Fragment)
        }
    }

    pub fn element(tag: impl Into<String>, raw_props: PropMap, children: Vec<VNode>) -> Self {
        Self {
            raw_props,
            children,
            ..Self::new(VKind::Element { tag: tag.into() })
        }
    }

    pub fn with_key(mut self, key: Option<Key>) -> Self {
        self.key = key;
        self
    }

    pub fn is_fragment(&self) -> bool {
        matches!(self.kind, VKind::Fragment)
    }

    pub fn text_content(&self) -> Option<&str> {
        match &self.kind {
            VKind::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Live handle of this node (the anchor, for a fragment).
    pub fn handle(&self) -> Option<NodeId> {
        self.mounted.as_ref().map(|m| m.handle)
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.is_some()
    }
}

/// Same kind, same tag or template name, same key.
pub fn same_type(a: &VNode, b: &VNode) -> bool {
    let kind = match (&a.kind, &b.kind) {
        (VKind::Text(_), VKind::Text(_)) | (VKind::Fragment, VKind::Fragment) => true,
        (VKind::Element { tag: x }, VKind::Element { tag: y }) => x == y,
        (VKind::Template(x), VKind::Template(y)) => x.name == y.name,
        _ => false,
    };
    kind && a.key == b.key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_type() {
        let a = VNode::element("li", PropMap::new(), vec![]).with_key(Some(Key::from(1)));
        let b = VNode::element("li", PropMap::new(), vec![]).with_key(Some(Key::from(1)));
        let c = VNode::element("li", PropMap::new(), vec![]).with_key(Some(Key::from(2)));
        let d = VNode::element("p", PropMap::new(), vec![]).with_key(Some(Key::from(1)));
        assert!(same_type(&a, &b));
        assert!(!same_type(&a, &c));
        assert!(!same_type(&a, &d));
        assert!(same_type(&VNode::text("x"), &VNode::text("y")));
        assert!(!same_type(&VNode::text("x"), &VNode::fragment(vec![])));
    }
}
