//! Reactivity engine.
//!
//! - [`tracker`] - dependency stack and `(object, field) -> effects` edges
//! - [`observable`] - [`Reactive`] objects/arrays with tracked reads and
//!   triggering writes
//! - [`effect`] - re-runnable computations
//!
//! Everything is single-threaded and synchronous: a write re-runs its
//! dependents before it returns. There is no batching; N writes to N tracked
//! fields produce N re-runs unless the caller coalesces them.

pub mod effect;
pub mod observable;
pub mod tracker;

pub use effect::EffectHandle;
pub use observable::{Observed, Reactive};
pub use tracker::{EffectId, FieldKey, ObjectId, Tracker};
