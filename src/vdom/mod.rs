//! Canonical Tree Model and Normalizer.
//!
//! - [`view`] - raw view descriptions returned by view functions
//! - [`builder`] - fluent constructors (`el`, `template`, `component`, ...)
//! - [`node`] - the canonical tree the reconciler diffs
//! - [`normalize`](mod@normalize) - raw view to canonical tree

pub mod builder;
pub mod node;
pub mod normalize;
pub mod view;

pub use builder::{
    ComponentBuilder, ElementBuilder, TemplateBuilder, children_of, component, el, fragment, template, text,
};
pub use node::{TemplateNode, VKind, VNode, same_type};
pub use normalize::normalize;
pub use view::{ComponentDesc, ComponentFn, ElementDesc, Render, SelectorListeners, TemplateDesc, View};
