//! Template components.
//!
//! A template is registered markup (plus optional CSS) with `{{NAME}}`
//! placeholders. Rendering a template substitutes the placeholders, parses the
//! result through the host and uses the first top-level element as the
//! instance root. A `{{SLOT}}` placeholder marks where the instance's children
//! are mounted.
//!
//! # Example
//!
//! ```ignore
//! rt.register_template("card", TemplateAsset::new(
//!     r#"<div class="card"><h2>{{TITLE}}</h2>{{SLOT}}</div>"#,
//! ));
//! template("card").prop("title", "Hello").child(text("body"))
//! ```

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::debug;

use crate::error::{HostError, SparkError};

/// Tag of the element substituted for `{{SLOT}}`.
pub const SLOT_TAG: &str = "spark-slot";

const SLOT_NAME: &str = "SLOT";

/// Markup and optional stylesheet of a template component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateAsset {
    pub html: String,
    /// Injected once per runtime, keyed by template name.
    pub css: Option<String>,
}

impl TemplateAsset {
    pub fn new(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            css: None,
        }
    }

    pub fn with_css(mut self, css: impl Into<String>) -> Self {
        self.css = Some(css.into());
        self
    }

    /// Uppercased placeholder names used by the markup (excluding `SLOT`).
    pub fn placeholders(&self) -> HashSet<String> {
        scan(&self.html)
            .filter_map(|piece| match piece {
                Piece::Placeholder(name) if name != SLOT_NAME => Some(name),
                _ => None,
            })
            .collect()
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Lookup of template assets by name.
pub trait TemplateSource {
    fn lookup(&self, name: &str) -> Option<Rc<TemplateAsset>>;
}

/// Name -> asset table.
#[derive(Debug, Default, Clone)]
pub struct TemplateRegistry {
    assets: HashMap<String, Rc<TemplateAsset>>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a template. Returns the replaced asset.
    pub fn register(&mut self, name: impl Into<String>, asset: TemplateAsset) -> Option<Rc<TemplateAsset>> {
        self.assets.insert(name.into(), Rc::new(asset))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.assets.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Result<Rc<TemplateAsset>, SparkError> {
        self.lookup(name).ok_or_else(|| SparkError::ComponentNotFound {
            name: name.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

impl TemplateSource for TemplateRegistry {
    fn lookup(&self, name: &str) -> Option<Rc<TemplateAsset>> {
        self.assets.get(name).cloned()
    }
}

// =============================================================================
// Substitution
// =============================================================================

enum Piece<'a> {
    Literal(&'a str),
    Placeholder(String),
}

/// Split markup into literal runs and placeholders. An unterminated `{{` is
/// kept as literal text.
fn scan(html: &str) -> impl Iterator<Item = Piece<'_>> {
    let mut rest = html;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        let Some(open) = rest.find("{{") else {
            let literal = rest;
            rest = "";
            return Some(Piece::Literal(literal));
        };
        if open > 0 {
            let literal = &rest[..open];
            rest = &rest[open..];
            return Some(Piece::Literal(literal));
        }
        match rest[2..].find("}}") {
            Some(close) => {
                let name = rest[2..2 + close].trim().to_uppercase();
                rest = &rest[2 + close + 2..];
                Some(Piece::Placeholder(name))
            }
            None => {
                let literal = rest;
                rest = "";
                Some(Piece::Literal(literal))
            }
        }
    })
}

/// Escape text for use inside element content or a quoted attribute.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Produce instance markup. `values` is keyed by uppercased placeholder name;
/// placeholders without a value render empty. At most one slot is allowed.
pub fn instantiate(asset: &TemplateAsset, values: &IndexMap<String, String>) -> Result<String, HostError> {
    let mut out = String::with_capacity(asset.html.len());
    let mut slots = 0;
    for piece in scan(&asset.html) {
        match piece {
            Piece::Literal(text) => out.push_str(text),
            Piece::Placeholder(name) if name == SLOT_NAME => {
                slots += 1;
                if slots > 1 {
                    return Err(HostError::MultipleSlots);
                }
                out.push_str(&format!("<{SLOT_TAG}></{SLOT_TAG}>"));
            }
            Piece::Placeholder(name) => match values.get(&name) {
                Some(value) => out.push_str(&escape_html(value)),
                None => debug!(placeholder = %name, "template placeholder has no value"),
            },
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, &str)]) -> IndexMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_substitution_is_case_insensitive() {
        let asset = TemplateAsset::new("<p title=\"{{ title }}\">{{Title}}</p>");
        let out = instantiate(&asset, &values(&[("TITLE", "Hi")])).unwrap();
        assert_eq!(out, "<p title=\"Hi\">Hi</p>");
    }

    #[test]
    fn test_values_are_escaped() {
        let asset = TemplateAsset::new("<p>{{BODY}}</p>");
        let out = instantiate(&asset, &values(&[("BODY", "<b>&\"x\"</b>")])).unwrap();
        assert_eq!(out, "<p>&lt;b&gt;&amp;&quot;x&quot;&lt;/b&gt;</p>");
    }

    #[test]
    fn test_missing_value_renders_empty() {
        let asset = TemplateAsset::new("<p>[{{NOPE}}]</p>");
        assert_eq!(instantiate(&asset, &IndexMap::new()).unwrap(), "<p>[]</p>");
    }

    #[test]
    fn test_slot_marker() {
        let asset = TemplateAsset::new("<div>{{slot}}</div>");
        let out = instantiate(&asset, &IndexMap::new()).unwrap();
        assert_eq!(out, "<div><spark-slot></spark-slot></div>");

        let twice = TemplateAsset::new("<div>{{SLOT}}{{SLOT}}</div>");
        assert_eq!(instantiate(&twice, &IndexMap::new()), Err(HostError::MultipleSlots));
    }

    #[test]
    fn test_unterminated_placeholder_is_literal() {
        let asset = TemplateAsset::new("<p>{{OPEN</p>");
        assert_eq!(instantiate(&asset, &IndexMap::new()).unwrap(), "<p>{{OPEN</p>");
    }

    #[test]
    fn test_placeholders() {
        let asset = TemplateAsset::new("<a href=\"{{href}}\">{{LABEL}}{{SLOT}}</a>");
        let names = asset.placeholders();
        assert!(names.contains("HREF"));
        assert!(names.contains("LABEL"));
        assert!(!names.contains("SLOT"));
    }

    #[test]
    fn test_registry_lookup() {
        let mut registry = TemplateRegistry::new();
        assert!(registry.register("card", TemplateAsset::new("<div></div>")).is_none());
        assert!(registry.contains("card"));
        assert!(matches!(
            registry.get("missing"),
            Err(SparkError::ComponentNotFound { name }) if name == "missing"
        ));
    }
}
