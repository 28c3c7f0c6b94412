//! # spark-dom
//!
//! Reactive document UI runtime for Rust.
//!
//! State lives in reactive objects; a view function describes the UI; a render
//! effect re-runs the view whenever state it read changes and patches the live
//! document with the minimal set of host operations.
//!
//! ## Architecture
//!
//! ```text
//! Reactive state → render effect → View → normalize → VNode tree → reconcile → Host
//! ```
//!
//! - Dependencies are recorded per `(object, field)` during the tracked phase
//!   of a render pass; reconciliation runs untracked.
//! - Props may carry responsive (`md:class`) and interaction (`hover:class`)
//!   modifiers, resolved per node against the active viewport tier and the
//!   node's hover/focus state.
//! - Keyed child lists are diffed with longest-increasing-subsequence move
//!   minimization.
//!
//! ## Modules
//!
//! - [`reactive`] - dependency tracker, effects, observable objects and arrays
//! - [`vdom`] - view descriptions, builders, canonical tree, normalizer
//! - [`props`] - responsive key grammar and cascade resolution
//! - [`template`] - registered markup components with placeholders and a slot
//! - [`host`] - live document interface and the in-memory host
//! - [`reconciler`] - mount, patch, keyed diff
//! - [`pipeline`] - runtime context and render loop
//! - [`config`] - breakpoint table and limits, TOML loading

pub mod config;
pub mod error;
pub mod host;
pub mod pipeline;
pub mod props;
pub mod reactive;
pub mod reconciler;
pub mod template;
pub mod types;
pub mod vdom;

// Re-export commonly used items
pub use types::*;

pub use config::{Breakpoint, RuntimeConfig};
pub use error::{ConfigError, HostError, KeyError, Result, SparkError};

pub use host::{Host, HostOp, MemoryHost};

pub use pipeline::{RenderHandle, RenderRoot, Runtime, render};

pub use props::{Breakpoints, Interaction, InteractionState, resolve};

pub use reactive::{EffectHandle, EffectId, FieldKey, ObjectId, Observed, Reactive, Tracker};

pub use template::{TemplateAsset, TemplateRegistry};

pub use vdom::{
    Render, VKind, VNode, View, children_of, component, el, fragment, normalize, template, text,
};
