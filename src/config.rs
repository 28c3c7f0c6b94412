//! Runtime configuration - breakpoint table and tracker limits.
//!
//! The breakpoint table maps tier names to minimum viewport widths in pixels.
//! It can be built in code or loaded from TOML:
//!
//! ```toml
//! max_effect_depth = 64
//! viewport_width = 1024
//!
//! [[breakpoints]]
//! name = "lg"
//! min_width = 1024
//!
//! [[breakpoints]]
//! name = "base"
//! min_width = 0
//! ```
//!
//! After validation the table is ordered widest to narrowest; the index of a
//! tier in that order is what the props resolver compares.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::props::Interaction;

// =============================================================================
// Breakpoint
// =============================================================================

/// One named viewport-width tier.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Breakpoint {
    pub name: String,
    /// Tier is active when the viewport is at least this wide (pixels).
    pub min_width: f64,
}

impl Breakpoint {
    pub fn new(name: impl Into<String>, min_width: f64) -> Self {
        Self {
            name: name.into(),
            min_width,
        }
    }
}

// =============================================================================
// RuntimeConfig
// =============================================================================

/// Configuration for a [`Runtime`](crate::Runtime).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Breakpoint tiers. Any order on input; sorted widest first by `validate`.
    pub breakpoints: Vec<Breakpoint>,
    /// Maximum number of nested effect runs before further triggers are refused.
    pub max_effect_depth: usize,
    /// Viewport width the runtime starts with.
    pub viewport_width: f64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            breakpoints: vec![
                Breakpoint::new("xl", 1280.0),
                Breakpoint::new("lg", 1024.0),
                Breakpoint::new("md", 768.0),
                Breakpoint::new("sm", 640.0),
                Breakpoint::new("base", 0.0),
            ],
            max_effect_depth: 64,
            viewport_width: 1024.0,
        }
    }
}

impl RuntimeConfig {
    /// Config with the given breakpoint table and default limits.
    pub fn with_breakpoints(breakpoints: impl IntoIterator<Item = Breakpoint>) -> Self {
        Self {
            breakpoints: breakpoints.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: RuntimeConfig =
            toml::from_str(content).map_err(|source| ConfigError::ParseError { source })?;
        config.validated()
    }

    /// Load and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Validate and return the config with breakpoints sorted widest first.
    ///
    /// Checks:
    /// - at least one breakpoint
    /// - names are non-empty, unique, contain no `:` and are not interaction names
    /// - thresholds are finite, non-negative and unique
    /// - `max_effect_depth` is non-zero
    pub fn validated(mut self) -> Result<Self, ConfigError> {
        if self.breakpoints.is_empty() {
            return Err(invalid("at least one breakpoint must be configured"));
        }
        if self.max_effect_depth == 0 {
            return Err(invalid("max_effect_depth must be greater than zero"));
        }
        if !self.viewport_width.is_finite() || self.viewport_width < 0.0 {
            return Err(invalid("viewport_width must be a finite, non-negative number"));
        }

        let mut names = HashSet::new();
        for bp in &self.breakpoints {
            if bp.name.is_empty() || bp.name.contains(':') {
                return Err(invalid(format!("invalid breakpoint name '{}'", bp.name)));
            }
            if Interaction::from_modifier(&bp.name).is_some() {
                return Err(invalid(format!(
                    "breakpoint name '{}' is reserved for interaction states",
                    bp.name
                )));
            }
            if !names.insert(bp.name.as_str()) {
                return Err(invalid(format!("duplicate breakpoint '{}'", bp.name)));
            }
            if !bp.min_width.is_finite() || bp.min_width < 0.0 {
                return Err(invalid(format!(
                    "breakpoint '{}' has invalid min_width {}",
                    bp.name, bp.min_width
                )));
            }
        }

        self.breakpoints
            .sort_by(|a, b| b.min_width.total_cmp(&a.min_width));
        if self
            .breakpoints
            .windows(2)
            .any(|pair| pair[0].min_width == pair[1].min_width)
        {
            return Err(invalid("breakpoint thresholds must be unique"));
        }

        Ok(self)
    }
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        message: message.into(),
    }
}

// =============================================================================
// Tests
// =============================================================================
