//! Error types.
//!
//! Fatal conditions surface as [`SparkError`]. Prop-key problems are
//! [`KeyError`]s, which the resolver logs and drops instead of failing the
//! render pass.

use std::path::PathBuf;

use thiserror::Error;

/// Errors returned by the runtime.
#[derive(Debug, Error)]
pub enum SparkError {
    /// A template component was referenced by a name nothing registered.
    #[error("Template component '{name}' is not registered")]
    ComponentNotFound { name: String },

    /// `render` was called without a view function.
    #[error("render() requires a view function")]
    MissingView,

    /// `render` was called without a target container.
    #[error("render() requires a target container")]
    MissingTarget,

    /// A render pass found the host already borrowed and was skipped.
    #[error("Host is borrowed elsewhere; render pass skipped")]
    HostBusy,

    /// `create_reactive` was given a primitive instead of an object or array.
    #[error("Only objects and arrays can be made reactive (got {found})")]
    NotComposite { found: &'static str },

    /// Breakpoint table or runtime configuration problem.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The presentation host rejected an operation.
    #[error("Host error: {0}")]
    Host(#[from] HostError),
}

/// Errors loading or validating [`RuntimeConfig`](crate::config::RuntimeConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {source}")]
    ParseError {
        #[source]
        source: toml::de::Error,
    },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },
}

/// Errors raised by a [`Host`](crate::host::Host) implementation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HostError {
    #[error("Malformed markup at byte {offset}: {reason}")]
    Markup { offset: usize, reason: String },

    #[error("Template markup has no root element")]
    EmptyTemplate,

    #[error("Template markup contains more than one {{{{SLOT}}}} marker")]
    MultipleSlots,
}

/// Why a responsive prop key was rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("Prop key '{key}' names more than one breakpoint")]
    MultipleBreakpoints { key: String },

    #[error("Prop key '{key}' names more than one interaction state")]
    MultipleInteractions { key: String },

    #[error("Prop key '{key}' has unknown modifier '{modifier}'")]
    UnknownModifier { key: String, modifier: String },

    #[error("Prop key '{key}' has an empty property name")]
    EmptyProperty { key: String },
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SparkError>;
