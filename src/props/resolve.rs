//! Responsive cascade resolution.
//!
//! Turns a raw prop map (keys may carry breakpoint/interaction modifiers) into
//! the flat map that is applied to the live node.
//!
//! # Algorithm
//!
//! 1. Keys without modifiers are copied through unconditionally.
//! 2. A modified key is eligible when its breakpoint tier is at least as narrow
//!    as the active tier (index >= active index) and its interaction state, if
//!    any, is currently active. A key without a breakpoint counts as the
//!    narrowest tier.
//! 3. Eligible rules are applied in ascending `(tier index, interaction order)`
//!    with focus < hover < no interaction. Later rules overwrite earlier ones.
//!
//! With this ordering an active `hover` rule beats an active `focus` rule for
//! the same property, and a narrower tier's rule is applied after a wider
//! tier's rule whenever both are eligible.

use tracing::warn;

use super::key::{Interaction, InteractionState, parse_key};
use super::viewport::Breakpoints;
use crate::types::PropMap;

/// Sort position for rules without an interaction modifier.
const NO_INTERACTION: usize = 2;

/// Resolve `raw` for the active viewport tier and interaction state.
///
/// Pure: no memory between calls. Malformed keys are dropped with a warning.
pub fn resolve(
    raw: &PropMap,
    active_tier: usize,
    interaction: InteractionState,
    breakpoints: &Breakpoints,
) -> PropMap {
    let mut out = PropMap::with_capacity(raw.len());
    let mut rules = Vec::new();

    for (key, value) in raw {
        let parsed = match parse_key(key, breakpoints) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(%err, "ignoring prop key");
                continue;
            }
        };
        if parsed.is_plain() {
            out.insert(key.clone(), value.clone());
            continue;
        }

        let tier = parsed.breakpoint.unwrap_or_else(|| breakpoints.narrowest());
        if tier < active_tier {
            continue;
        }
        if let Some(state) = parsed.interaction {
            if !interaction.contains(state.flag()) {
                continue;
            }
        }
        let order = parsed.interaction.map_or(NO_INTERACTION, Interaction::order);
        rules.push((tier, order, parsed.property, value));
    }

    // Stable: equal (tier, order) rules keep author order.
    rules.sort_by_key(|&(tier, order, _, _)| (tier, order));
    for (_, _, property, value) in rules {
        out.insert(property.to_string(), value.clone());
    }
    out
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Breakpoint;
    use crate::types::PropValue;

    const LG: usize = 0;
    const SM: usize = 2;
    const BASE: usize = 3;

    fn table() -> Breakpoints {
        Breakpoints::new(vec![
            Breakpoint::new("lg", 1024.0),
            Breakpoint::new("md", 768.0),
            Breakpoint::new("sm", 640.0),
            Breakpoint::new("base", 0.0),
        ])
    }

    fn props(pairs: &[(&str, &str)]) -> PropMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), PropValue::from(*v)))
            .collect()
    }

    fn get<'a>(map: &'a PropMap, key: &str) -> Option<&'a str> {
        map.get(key).and_then(PropValue::as_str)
    }

    #[test]
    fn test_plain_props_unchanged() {
        let raw = props(&[("class", "btn"), ("id", "go"), ("title", "Go")]);
        let out = resolve(&raw, SM, InteractionState::empty(), &table());
        let keys: Vec<&String> = out.keys().collect();
        assert_eq!(keys, ["class", "id", "title"]);
        assert_eq!(get(&out, "class"), Some("btn"));
        assert_eq!(out.len(), raw.len());
    }

    #[test]
    fn test_breakpoint_eligibility() {
        let raw = props(&[("lg:color", "red")]);
        let out = resolve(&raw, SM, InteractionState::empty(), &table());
        assert_eq!(get(&out, "color"), None);

        let raw = props(&[("sm:color", "blue")]);
        let out = resolve(&raw, SM, InteractionState::empty(), &table());
        assert_eq!(get(&out, "color"), Some("blue"));
    }

    #[test]
    fn test_narrower_rule_applied_later() {
        let raw = props(&[("sm:color", "blue"), ("lg:color", "red"), ("color", "black")]);
        let out = resolve(&raw, LG, InteractionState::empty(), &table());
        assert_eq!(get(&out, "color"), Some("blue"));

        let out = resolve(&raw, BASE, InteractionState::empty(), &table());
        assert_eq!(get(&out, "color"), Some("black"));
    }

    #[test]
    fn test_hover_beats_focus() {
        let raw = props(&[("hover:color", "red"), ("focus:color", "blue")]);
        let both = InteractionState::HOVER | InteractionState::FOCUS;
        let out = resolve(&raw, SM, both, &table());
        assert_eq!(get(&out, "color"), Some("red"));

        let focus_only = resolve(&raw, SM, InteractionState::FOCUS, &table());
        assert_eq!(get(&focus_only, "color"), Some("blue"));

        let none = resolve(&raw, SM, InteractionState::empty(), &table());
        assert_eq!(get(&none, "color"), None);
    }

    #[test]
    fn test_plain_tier_rule_after_interaction_rule() {
        let raw = props(&[("sm:color", "plain"), ("sm:hover:color", "hovered")]);
        let out = resolve(&raw, SM, InteractionState::HOVER, &table());
        assert_eq!(get(&out, "color"), Some("plain"));
    }

    #[test]
    fn test_interaction_without_breakpoint_sorts_narrowest() {
        let raw = props(&[("hover:color", "hovered"), ("sm:color", "small")]);
        let out = resolve(&raw, SM, InteractionState::HOVER, &table());
        assert_eq!(get(&out, "color"), Some("hovered"));
    }

    #[test]
    fn test_malformed_keys_dropped() {
        let raw = props(&[("sm:md:color", "x"), ("hover:focus:color", "y"), ("title", "ok")]);
        let out = resolve(&raw, SM, InteractionState::all(), &table());
        assert_eq!(out.len(), 1);
        assert_eq!(get(&out, "title"), Some("ok"));
    }
}
