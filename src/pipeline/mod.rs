//! Render Pipeline
//!
//! Connects reactive state to the host document.
//!
//! # Pipeline Architecture
//!
//! ```text
//! Reactive state → render effect → view fn → normalize → reconcile → Host
//!                        ▲                                            │
//!                        └──────── event handlers write state ◄───────┘
//! ```
//!
//! ## Key Design Principles
//!
//! - **One effect per root**: every reactive read during view evaluation and
//!   normalization is a dependency of the root's render effect
//! - **Untracked reconciliation**: host work never records dependencies
//! - **Shared context**: the [`Runtime`] carries the tracker, breakpoints,
//!   viewport state and templates; there is no global state

pub mod focus;
pub mod render;
pub mod runtime;

pub use render::{RenderHandle, RenderRoot, render};
pub use runtime::Runtime;
