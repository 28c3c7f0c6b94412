//! Dependency Tracker - who read what.
//!
//! Keeps a stack of active computations and a map from `(object, field)` to
//! the set of effects that read it during their most recent run.
//!
//! - [`Tracker::track`] records an edge for the innermost active effect.
//! - [`Tracker::trigger`] re-runs every effect registered for a field,
//!   synchronously, in registration order.
//! - Before an effect re-runs its previous edges are cleared, so the set always
//!   reflects the last run only.
//!
//! Re-entrancy: an effect that is already running is never entered again (its
//! own writes cannot loop back into it), and nesting deeper than the configured
//! limit is refused.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use indexmap::IndexSet;
use tracing::{error, trace, warn};

// =============================================================================
// Identifiers
// =============================================================================

/// Identity of an observable object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub(crate) u64);

/// Identity of an effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EffectId(pub(crate) u64);

/// A readable location on an observable object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldKey {
    /// Named object field.
    Field(String),
    /// Array element.
    Index(usize),
    /// Synthetic structure key: array length, or an object's key set.
    Length,
}

impl FieldKey {
    pub fn field(name: impl Into<String>) -> Self {
        FieldKey::Field(name.into())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DepKey {
    object: ObjectId,
    field: FieldKey,
}

type EffectFn = Rc<RefCell<Box<dyn FnMut()>>>;

// =============================================================================
// Tracker State
// =============================================================================

pub(crate) struct TrackerInner {
    /// Active computations. `None` entries are untracked sections.
    stack: RefCell<Vec<Option<EffectId>>>,
    /// (object, field) -> effects that read it.
    deps: RefCell<HashMap<DepKey, IndexSet<EffectId>>>,
    /// effect -> (object, field) pairs it read. Reverse index for clearing.
    effect_deps: RefCell<HashMap<EffectId, IndexSet<DepKey>>>,
    effects: RefCell<HashMap<EffectId, EffectFn>>,
    next_effect: Cell<u64>,
    next_object: Cell<u64>,
    max_depth: usize,
}

/// Handle to a dependency tracker. Cloning shares the same state.
#[derive(Clone)]
pub struct Tracker {
    inner: Rc<TrackerInner>,
}

/// Non-owning tracker handle held by observables.
#[derive(Clone)]
pub(crate) struct WeakTracker(Weak<TrackerInner>);

impl WeakTracker {
    pub(crate) fn upgrade(&self) -> Option<Tracker> {
        self.0.upgrade().map(|inner| Tracker { inner })
    }
}

/// Pops the tracking stack when a tracked run ends, including by unwinding.
struct StackGuard<'a> {
    stack: &'a RefCell<Vec<Option<EffectId>>>,
}

impl<'a> StackGuard<'a> {
    fn push(stack: &'a RefCell<Vec<Option<EffectId>>>, marker: Option<EffectId>) -> Self {
        stack.borrow_mut().push(marker);
        Self { stack }
    }
}

impl Drop for StackGuard<'_> {
    fn drop(&mut self) {
        self.stack.borrow_mut().pop();
    }
}

impl Tracker {
    /// Create a tracker refusing effect nesting deeper than `max_depth`.
    pub fn new(max_depth: usize) -> Self {
        Self {
            inner: Rc::new(TrackerInner {
                stack: RefCell::new(Vec::new()),
                deps: RefCell::new(HashMap::new()),
                effect_deps: RefCell::new(HashMap::new()),
                effects: RefCell::new(HashMap::new()),
                next_effect: Cell::new(0),
                next_object: Cell::new(0),
                max_depth,
            }),
        }
    }

    pub(crate) fn downgrade(&self) -> WeakTracker {
        WeakTracker(Rc::downgrade(&self.inner))
    }

    pub(crate) fn next_object_id(&self) -> ObjectId {
        let id = self.inner.next_object.get();
        self.inner.next_object.set(id + 1);
        ObjectId(id)
    }

    pub(crate) fn next_effect_id(&self) -> EffectId {
        let id = self.inner.next_effect.get();
        self.inner.next_effect.set(id + 1);
        EffectId(id)
    }

    // =========================================================================
    // Stack
    // =========================================================================

    /// The innermost effect currently collecting dependencies.
    pub fn active_effect(&self) -> Option<EffectId> {
        self.inner.stack.borrow().last().copied().flatten()
    }

    /// Whether reads right now would be recorded.
    pub fn is_tracking(&self) -> bool {
        self.active_effect().is_some()
    }

    /// Number of effects currently executing (nesting depth).
    pub fn depth(&self) -> usize {
        self.inner.stack.borrow().iter().filter(|m| m.is_some()).count()
    }

    fn is_running(&self, id: EffectId) -> bool {
        self.inner.stack.borrow().contains(&Some(id))
    }

    /// Run `f` with `effect` as the active computation.
    ///
    /// Reads inside `f` are attributed to `effect`; nested tracked runs
    /// attribute their own reads.
    pub fn run_tracked<T>(&self, effect: EffectId, f: impl FnOnce() -> T) -> T {
        let _guard = StackGuard::push(&self.inner.stack, Some(effect));
        f()
    }

    /// Run `f` without recording any reads.
    pub fn untracked<T>(&self, f: impl FnOnce() -> T) -> T {
        let _guard = StackGuard::push(&self.inner.stack, None);
        f()
    }

    // =========================================================================
    // Edges
    // =========================================================================

    /// Record that the active effect read `(object, field)`.
    pub fn track(&self, object: ObjectId, field: FieldKey) {
        let Some(effect) = self.active_effect() else {
            return;
        };
        let key = DepKey { object, field };
        trace!(effect = effect.0, object = object.0, field = ?key.field, "track");
        self.inner
            .deps
            .borrow_mut()
            .entry(key.clone())
            .or_default()
            .insert(effect);
        self.inner
            .effect_deps
            .borrow_mut()
            .entry(effect)
            .or_default()
            .insert(key);
    }

    /// Re-run every effect that read `(object, field)`.
    pub fn trigger(&self, object: ObjectId, field: FieldKey) {
        self.trigger_many(object, std::iter::once(field));
    }

    /// Re-run every effect that read any of `fields`, each at most once.
    pub fn trigger_many(&self, object: ObjectId, fields: impl IntoIterator<Item = FieldKey>) {
        let mut queue: IndexSet<EffectId> = IndexSet::new();
        {
            let deps = self.inner.deps.borrow();
            for field in fields {
                let key = DepKey { object, field };
                if let Some(effects) = deps.get(&key) {
                    queue.extend(effects.iter().copied());
                }
            }
        }
        if queue.is_empty() {
            return;
        }
        trace!(object = object.0, effects = queue.len(), "trigger");
        for effect in queue {
            self.run_effect(effect);
        }
    }

    /// Number of `(object, field)` pairs with at least one dependent effect.
    pub fn dependency_count(&self) -> usize {
        self.inner.deps.borrow().len()
    }

    /// Number of `(object, field)` pairs `effect` read during its last run.
    pub fn dependencies_of(&self, effect: EffectId) -> usize {
        self.inner
            .effect_deps
            .borrow()
            .get(&effect)
            .map_or(0, IndexSet::len)
    }

    fn clear_deps(&self, effect: EffectId) {
        let Some(keys) = self.inner.effect_deps.borrow_mut().remove(&effect) else {
            return;
        };
        let mut deps = self.inner.deps.borrow_mut();
        for key in keys {
            if let Some(effects) = deps.get_mut(&key) {
                effects.shift_remove(&effect);
                if effects.is_empty() {
                    deps.remove(&key);
                }
            }
        }
    }

    /// Drop every edge keyed on `object`. Called when an observable is dropped.
    pub(crate) fn forget_object(&self, object: ObjectId) {
        let (Ok(mut deps), Ok(mut effect_deps)) = (
            self.inner.deps.try_borrow_mut(),
            self.inner.effect_deps.try_borrow_mut(),
        ) else {
            return;
        };
        deps.retain(|key, effects| {
            if key.object != object {
                return true;
            }
            for effect in effects.iter() {
                if let Some(keys) = effect_deps.get_mut(effect) {
                    keys.shift_remove(key);
                }
            }
            false
        });
    }

    // =========================================================================
    // Effects
    // =========================================================================

    pub(crate) fn register_effect(&self, id: EffectId, f: Box<dyn FnMut()>) {
        self.inner
            .effects
            .borrow_mut()
            .insert(id, Rc::new(RefCell::new(f)));
    }

    pub(crate) fn has_effect(&self, id: EffectId) -> bool {
        self.inner.effects.borrow().contains_key(&id)
    }

    /// Number of live effects.
    pub fn effect_count(&self) -> usize {
        self.inner.effects.borrow().len()
    }

    /// Clear an effect's edges and run it again.
    pub(crate) fn run_effect(&self, id: EffectId) {
        if self.is_running(id) {
            warn!(
                effect = id.0,
                "effect wrote to state it depends on while running; re-run suppressed"
            );
            return;
        }
        if self.depth() >= self.inner.max_depth {
            error!(
                effect = id.0,
                max_depth = self.inner.max_depth,
                "effect nesting limit reached; trigger refused"
            );
            return;
        }
        let Some(f) = self.inner.effects.borrow().get(&id).cloned() else {
            return;
        };

        self.clear_deps(id);
        self.run_tracked(id, || {
            let mut slot = f.borrow_mut();
            let run: &mut dyn FnMut() = &mut **slot;
            run();
        });
    }

    pub(crate) fn dispose_effect(&self, id: EffectId) {
        self.clear_deps(id);
        let removed = self.inner.effects.borrow_mut().remove(&id);
        // Closure captures may own observables whose drop touches the tracker.
        drop(removed);
    }
}

// =============================================================================
// Tests
// =============================================================================
