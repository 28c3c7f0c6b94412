//! Effects - re-runnable computations.
//!
//! An effect runs once when created and again, synchronously, whenever a
//! field it read during its most recent run is written with a new value.

use super::tracker::{EffectId, Tracker, WeakTracker};

/// Handle to a live effect.
///
/// Dropping the handle does NOT stop the effect; call [`EffectHandle::dispose`].
pub struct EffectHandle {
    id: EffectId,
    tracker: WeakTracker,
}

impl EffectHandle {
    pub fn id(&self) -> EffectId {
        self.id
    }

    /// Whether the effect is still registered.
    pub fn is_active(&self) -> bool {
        self.tracker
            .upgrade()
            .is_some_and(|tracker| tracker.has_effect(self.id))
    }

    /// Stop the effect and drop its dependency edges.
    pub fn dispose(self) {
        if let Some(tracker) = self.tracker.upgrade() {
            tracker.dispose_effect(self.id);
        }
    }
}

impl Tracker {
    /// Create an effect, run it immediately, and return its handle.
    pub fn create_effect(&self, f: impl FnMut() + 'static) -> EffectHandle {
        let id = self.next_effect_id();
        self.register_effect(id, Box::new(f));
        self.run_effect(id);
        EffectHandle {
            id,
            tracker: self.downgrade(),
        }
    }
}
