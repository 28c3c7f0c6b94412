//! Runtime context.
//!
//! A [`Runtime`] owns everything a render root shares: the dependency
//! tracker, the validated breakpoint table, the reactive viewport state, the
//! template registry and the set of stylesheets already injected.
//!
//! # Example
//!
//! ```ignore
//! let rt = Runtime::new(RuntimeConfig::default())?;
//! let state = rt.create_reactive(json!({ "count": 0 }))?;
//! rt.register_template("card", TemplateAsset::new("<div>{{SLOT}}</div>"));
//! rt.set_viewport_width(700.0); // "sm" tier with the default table
//! ```

use std::cell::{Ref, RefCell};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::rc::{Rc, Weak};

use serde_json::{Map, Value as Json};
use tracing::{debug, info};

use crate::config::RuntimeConfig;
use crate::error::SparkError;
use crate::host::Host;
use crate::props::Breakpoints;
use crate::reactive::{EffectHandle, Reactive, Tracker};
use crate::template::{TemplateAsset, TemplateRegistry, TemplateSource};

struct RuntimeInner {
    config: RuntimeConfig,
    breakpoints: Breakpoints,
    tracker: Tracker,
    /// `{ "width": f64, "tier": usize }`; render passes read only `tier`.
    viewport: Reactive,
    templates: RefCell<TemplateRegistry>,
    injected: RefCell<HashSet<String>>,
}

/// Shared runtime context. Cloning is cheap and yields the same runtime.
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

/// Non-owning runtime handle, held by effects to avoid reference cycles.
#[derive(Clone)]
pub(crate) struct WeakRuntime(Weak<RuntimeInner>);

impl WeakRuntime {
    pub(crate) fn upgrade(&self) -> Option<Runtime> {
        self.0.upgrade().map(|inner| Runtime { inner })
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("breakpoints", &self.inner.breakpoints)
            .field("viewport_width", &self.viewport_width())
            .field("templates", &self.inner.templates.borrow().len())
            .finish()
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::build(RuntimeConfig::default())
    }
}

impl Runtime {
    /// Validate `config` and create a runtime.
    pub fn new(config: RuntimeConfig) -> Result<Self, SparkError> {
        Ok(Self::build(config.validated()?))
    }

    /// Create a runtime from a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SparkError> {
        Ok(Self::build(RuntimeConfig::load(path)?))
    }

    /// `config` must already be validated.
    fn build(config: RuntimeConfig) -> Self {
        let breakpoints = Breakpoints::new(config.breakpoints.clone());
        let tracker = Tracker::new(config.max_effect_depth);
        let width = config.viewport_width;
        let tier = breakpoints.tier_for_width(width);

        let mut state = Map::new();
        state.insert("width".to_string(), Json::from(width));
        state.insert("tier".to_string(), Json::from(tier));
        let viewport = tracker.reactive_object(state);

        info!(
            tiers = breakpoints.len(),
            width,
            tier = breakpoints.name_of(tier).unwrap_or_default(),
            "runtime created"
        );
        Self {
            inner: Rc::new(RuntimeInner {
                config,
                breakpoints,
                tracker,
                viewport,
                templates: RefCell::new(TemplateRegistry::new()),
                injected: RefCell::new(HashSet::new()),
            }),
        }
    }

    pub(crate) fn downgrade(&self) -> WeakRuntime {
        WeakRuntime(Rc::downgrade(&self.inner))
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    pub fn tracker(&self) -> &Tracker {
        &self.inner.tracker
    }

    pub fn breakpoints(&self) -> &Breakpoints {
        &self.inner.breakpoints
    }

    // =========================================================================
    // Reactive state
    // =========================================================================

    /// Wrap an object or array as reactive state.
    pub fn create_reactive(&self, value: impl Into<Json>) -> Result<Reactive, SparkError> {
        self.inner.tracker.reactive(value)
    }

    /// Create an effect that re-runs when anything it read changes.
    pub fn create_effect(&self, f: impl FnMut() + 'static) -> EffectHandle {
        self.inner.tracker.create_effect(f)
    }

    /// Run `f` without recording dependencies.
    pub fn untracked<T>(&self, f: impl FnOnce() -> T) -> T {
        self.inner.tracker.untracked(f)
    }

    // =========================================================================
    // Viewport
    // =========================================================================

    /// Resize notification. Dependents of the active tier re-run only when
    /// the tier changes.
    pub fn set_viewport_width(&self, width: f64) {
        let width = if width.is_finite() { width.max(0.0) } else { 0.0 };
        let tier = self.inner.breakpoints.tier_for_width(width);
        debug!(width, tier = self.inner.breakpoints.name_of(tier).unwrap_or_default(), "viewport resized");
        self.inner.viewport.set("width", width);
        self.inner.viewport.set("tier", tier);
    }

    pub fn viewport_width(&self) -> f64 {
        self.inner.viewport.peek("width").as_f64().unwrap_or_default()
    }

    /// Active tier index (tracked).
    pub fn viewport_tier(&self) -> usize {
        self.tier_from(self.inner.viewport.get("tier").as_i64())
    }

    /// Active tier index without recording a dependency.
    pub fn current_tier(&self) -> usize {
        self.tier_from(self.inner.viewport.peek("tier").as_i64())
    }

    /// Name of the active tier (tracked).
    pub fn viewport_tier_name(&self) -> &str {
        let tier = self.viewport_tier();
        self.inner.breakpoints.name_of(tier).unwrap_or_default()
    }

    fn tier_from(&self, raw: Option<i64>) -> usize {
        raw.and_then(|t| usize::try_from(t).ok())
            .unwrap_or_else(|| self.inner.breakpoints.narrowest())
    }

    // =========================================================================
    // Templates
    // =========================================================================

    /// Register (or replace) a template component.
    pub fn register_template(&self, name: impl Into<String>, asset: TemplateAsset) {
        let name = name.into();
        debug!(template = %name, "registered template");
        self.inner.templates.borrow_mut().register(name, asset);
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.inner.templates.borrow().contains(name)
    }

    pub fn templates(&self) -> Ref<'_, TemplateRegistry> {
        self.inner.templates.borrow()
    }

    /// Inject a template's stylesheet the first time it is needed.
    pub(crate) fn inject_stylesheet_once<H: Host + ?Sized>(&self, host: &mut H, id: &str, css: &str) {
        if self.inner.injected.borrow_mut().insert(id.to_string()) {
            debug!(template = id, "injecting stylesheet");
            host.inject_stylesheet(id, css);
        }
    }
}

impl TemplateSource for Runtime {
    fn lookup(&self, name: &str) -> Option<Rc<TemplateAsset>> {
        self.inner.templates.borrow().lookup(name)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use serde_json::json;

    use super::*;
    use crate::config::Breakpoint;

    #[test]
    fn test_default_runtime() {
        let rt = Runtime::default();
        assert_eq!(rt.viewport_width(), 1024.0);
        assert_eq!(rt.breakpoints().name_of(rt.current_tier()), Some("lg"));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = RuntimeConfig::with_breakpoints(Vec::<Breakpoint>::new());
        assert!(matches!(Runtime::new(config), Err(SparkError::Config(_))));
    }

    #[test]
    fn test_tier_changes_notify_only_on_tier_change() {
        let rt = Runtime::default();
        let runs = Rc::new(Cell::new(0));
        let seen = runs.clone();
        let reader = rt.clone();
        let _effect = rt.create_effect(move || {
            reader.viewport_tier();
            seen.set(seen.get() + 1);
        });
        assert_eq!(runs.get(), 1);

        rt.set_viewport_width(1100.0);
        assert_eq!(runs.get(), 1);
        rt.set_viewport_width(700.0);
        assert_eq!(runs.get(), 2);
        assert_eq!(rt.breakpoints().name_of(rt.current_tier()), Some("sm"));
        rt.set_viewport_width(-5.0);
        assert_eq!(rt.breakpoints().name_of(rt.current_tier()), Some("base"));
    }

    #[test]
    fn test_create_reactive_rejects_primitives() {
        let rt = Runtime::default();
        assert!(rt.create_reactive(json!({"a": 1})).is_ok());
        assert!(matches!(
            rt.create_reactive(json!(5)),
            Err(SparkError::NotComposite { found: "number" })
        ));
    }

    #[test]
    fn test_templates() {
        let rt = Runtime::default();
        rt.register_template("card", TemplateAsset::new("<div></div>"));
        assert!(rt.has_template("card"));
        assert!(rt.lookup("card").is_some());
        assert!(rt.lookup("other").is_none());
    }
}
