//! Props Resolver.
//!
//! - [`key`] - responsive key grammar and interaction states
//! - [`viewport`] - breakpoint table, active tier lookup
//! - [`resolve`](mod@resolve) - the cascade itself

pub mod key;
pub mod resolve;
pub mod viewport;

pub use key::{Interaction, InteractionState, ParsedKey, has_interaction_modifier, parse_key};
pub use resolve::resolve;
pub use viewport::Breakpoints;
