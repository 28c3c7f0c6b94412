//! Responsive prop-key parsing.
//!
//! Grammar: `[modifier:]*property`. Each modifier is either a breakpoint tier
//! name from the configured table or an interaction state (`hover`, `focus`).
//! At most one of each is allowed.
//!
//! ```text
//! "color"             -> color, always
//! "md:color"          -> color, while the active tier is md or wider
//! "hover:color"       -> color, while hovered
//! "sm:focus:color"    -> color, at sm or wider while focused
//! ```

use bitflags::bitflags;

use super::viewport::Breakpoints;
use crate::error::KeyError;

// =============================================================================
// Interaction
// =============================================================================

/// A transient UI state a rule can be gated on.
///
/// Declaration order is application order: `Focus` rules are applied before
/// `Hover` rules, so hover wins when both are active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Interaction {
    Focus,
    Hover,
}

impl Interaction {
    /// Parse a modifier token.
    pub fn from_modifier(token: &str) -> Option<Self> {
        match token {
            "focus" => Some(Self::Focus),
            "hover" => Some(Self::Hover),
            _ => None,
        }
    }

    /// Position in the application order.
    pub fn order(self) -> usize {
        match self {
            Self::Focus => 0,
            Self::Hover => 1,
        }
    }

    pub fn flag(self) -> InteractionState {
        match self {
            Self::Focus => InteractionState::FOCUS,
            Self::Hover => InteractionState::HOVER,
        }
    }
}

bitflags! {
    /// Interaction states currently active on a node.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct InteractionState: u8 {
        const HOVER = 0b01;
        const FOCUS = 0b10;
    }
}

// =============================================================================
// ParsedKey
// =============================================================================

/// A prop key split into property name and modifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedKey<'a> {
    pub property: &'a str,
    /// Index into the breakpoint table (widest = 0).
    pub breakpoint: Option<usize>,
    pub interaction: Option<Interaction>,
}

impl ParsedKey<'_> {
    pub fn is_plain(&self) -> bool {
        self.breakpoint.is_none() && self.interaction.is_none()
    }
}

/// Split a raw key into `(property, breakpoint?, interaction?)`.
pub fn parse_key<'a>(key: &'a str, breakpoints: &Breakpoints) -> Result<ParsedKey<'a>, KeyError> {
    let Some((modifiers, property)) = key.rsplit_once(':') else {
        return Ok(ParsedKey {
            property: key,
            breakpoint: None,
            interaction: None,
        });
    };
    if property.is_empty() {
        return Err(KeyError::EmptyProperty {
            key: key.to_string(),
        });
    }

    let mut breakpoint = None;
    let mut interaction = None;
    for token in modifiers.split(':') {
        if let Some(index) = breakpoints.index_of(token) {
            if breakpoint.replace(index).is_some() {
                return Err(KeyError::MultipleBreakpoints {
                    key: key.to_string(),
                });
            }
        } else if let Some(state) = Interaction::from_modifier(token) {
            if interaction.replace(state).is_some() {
                return Err(KeyError::MultipleInteractions {
                    key: key.to_string(),
                });
            }
        } else {
            return Err(KeyError::UnknownModifier {
                key: key.to_string(),
                modifier: token.to_string(),
            });
        }
    }

    Ok(ParsedKey {
        property,
        breakpoint,
        interaction,
    })
}

/// Whether a raw key carries an interaction modifier (used to decide if a
/// node needs hover/focus listeners). Malformed keys count as not interactive.
pub fn has_interaction_modifier(key: &str) -> bool {
    match key.rsplit_once(':') {
        Some((modifiers, _)) => modifiers
            .split(':')
            .any(|token| Interaction::from_modifier(token).is_some()),
        None => false,
    }
}
