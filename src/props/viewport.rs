//! Breakpoint table and active-tier lookup.

use crate::config::Breakpoint;

/// Validated breakpoint table, widest tier first.
#[derive(Debug, Clone, PartialEq)]
pub struct Breakpoints {
    tiers: Vec<Breakpoint>,
}

impl Breakpoints {
    /// Build from tiers already sorted widest first (see
    /// [`RuntimeConfig::validated`](crate::config::RuntimeConfig::validated)).
    pub fn new(tiers: Vec<Breakpoint>) -> Self {
        Self { tiers }
    }

    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tiers.iter().map(|t| t.name.as_str())
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.tiers.iter().position(|t| t.name == name)
    }

    pub fn name_of(&self, index: usize) -> Option<&str> {
        self.tiers.get(index).map(|t| t.name.as_str())
    }

    /// Index of the narrowest tier; keys without a breakpoint sort here.
    pub fn narrowest(&self) -> usize {
        self.tiers.len().saturating_sub(1)
    }

    /// Tier active at `width`: the widest tier whose threshold fits.
    /// Narrower than every threshold falls back to the narrowest tier.
    pub fn tier_for_width(&self, width: f64) -> usize {
        self.tiers
            .iter()
            .position(|t| width >= t.min_width)
            .unwrap_or_else(|| self.narrowest())
    }
}
