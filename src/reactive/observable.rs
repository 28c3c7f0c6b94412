//! Observable Wrapper - reactive state objects.
//!
//! A [`Reactive`] wraps a JSON object or array. Reads go through
//! [`Reactive::get`] (and friends) and record a dependency for the running
//! effect; writes go through [`Reactive::set`] (and the array mutators) and
//! re-run dependents when the value actually changed.
//!
//! Nested objects and arrays are wrapped lazily: the first read of a composite
//! field replaces the stored JSON with a [`Reactive`] that is then returned on
//! every later read, so identity is stable and dependencies on nested fields
//! work the same way as top-level ones.
//!
//! Structural array changes (push, insert, remove, reorder, truncate) trigger
//! the synthetic [`FieldKey::Length`] key in addition to each index whose
//! content moved. Anything that iterates or checks the length re-runs, even
//! though no single pre-existing index was written.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::Value as Json;

use super::tracker::{FieldKey, ObjectId, Tracker, WeakTracker};
use crate::error::SparkError;

// =============================================================================
// Storage
// =============================================================================

#[derive(Clone)]
enum Slot {
    Raw(Json),
    Wrapped(Reactive),
}

impl Slot {
    fn same_as(&self, value: &Json) -> bool {
        match self {
            Slot::Raw(current) => current == value,
            Slot::Wrapped(reactive) => reactive.snapshot_untracked() == *value,
        }
    }

    fn to_json(&self) -> Json {
        match self {
            Slot::Raw(value) => value.clone(),
            Slot::Wrapped(reactive) => reactive.snapshot_untracked(),
        }
    }
}

enum Composite {
    Object(IndexMap<String, Slot>),
    Array(Vec<Slot>),
}

struct ReactiveCell {
    id: ObjectId,
    tracker: WeakTracker,
    data: RefCell<Composite>,
}

impl Drop for ReactiveCell {
    fn drop(&mut self) {
        if let Some(tracker) = self.tracker.upgrade() {
            tracker.forget_object(self.id);
        }
    }
}

fn json_kind(value: &Json) -> &'static str {
    match value {
        Json::Null => "null",
        Json::Bool(_) => "bool",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

fn is_composite(value: &Json) -> bool {
    matches!(value, Json::Array(_) | Json::Object(_))
}

// =============================================================================
// Observed
// =============================================================================

/// The result of reading a reactive field.
#[derive(Clone, Debug)]
pub enum Observed {
    /// A primitive (or null).
    Value(Json),
    /// A nested object or array, itself reactive.
    Reactive(Reactive),
}

impl Observed {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Observed::Value(v) => v.as_i64(),
            Observed::Reactive(_) => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Observed::Value(v) => v.as_f64(),
            Observed::Reactive(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Observed::Value(v) => v.as_bool(),
            Observed::Reactive(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Observed::Value(v) => v.as_str(),
            Observed::Reactive(_) => None,
        }
    }

    pub fn as_reactive(&self) -> Option<&Reactive> {
        match self {
            Observed::Reactive(r) => Some(r),
            Observed::Value(_) => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Observed::Value(Json::Null))
    }

    /// Plain JSON form. Nested reactive values are snapshotted (tracked).
    pub fn into_json(self) -> Json {
        match self {
            Observed::Value(v) => v,
            Observed::Reactive(r) => r.snapshot(),
        }
    }
}

impl fmt::Display for Observed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Observed::Value(Json::String(s)) => f.write_str(s),
            Observed::Value(Json::Null) => Ok(()),
            Observed::Value(v) => write!(f, "{v}"),
            Observed::Reactive(r) => write!(f, "{}", r.snapshot()),
        }
    }
}

impl PartialEq<Json> for Observed {
    fn eq(&self, other: &Json) -> bool {
        match self {
            Observed::Value(v) => v == other,
            Observed::Reactive(r) => r.snapshot_untracked() == *other,
        }
    }
}

// =============================================================================
// Reactive
// =============================================================================

/// A reactive object or array. Cloning shares the same underlying state.
#[derive(Clone)]
pub struct Reactive {
    cell: Rc<ReactiveCell>,
}

impl fmt::Debug for Reactive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reactive")
            .field("id", &self.cell.id)
            .field("value", &self.snapshot_untracked())
            .finish()
    }
}

impl Tracker {
    /// Wrap a value: composites become [`Observed::Reactive`], primitives pass
    /// through unchanged.
    pub fn observe(&self, value: impl Into<Json>) -> Observed {
        let value = value.into();
        if is_composite(&value) {
            Observed::Reactive(Reactive::wrap(self.downgrade(), self.next_object_id(), value))
        } else {
            Observed::Value(value)
        }
    }

    /// Create a reactive object or array from plain JSON.
    pub fn reactive(&self, value: impl Into<Json>) -> Result<Reactive, SparkError> {
        let value = value.into();
        if !is_composite(&value) {
            return Err(SparkError::NotComposite {
                found: json_kind(&value),
            });
        }
        Ok(Reactive::wrap(self.downgrade(), self.next_object_id(), value))
    }

    pub(crate) fn reactive_object(&self, map: serde_json::Map<String, Json>) -> Reactive {
        Reactive::wrap(self.downgrade(), self.next_object_id(), Json::Object(map))
    }
}

impl Reactive {
    fn wrap(tracker: WeakTracker, id: ObjectId, value: Json) -> Self {
        let data = match value {
            Json::Array(items) => Composite::Array(items.into_iter().map(Slot::Raw).collect()),
            Json::Object(map) => {
                Composite::Object(map.into_iter().map(|(k, v)| (k, Slot::Raw(v))).collect())
            }
            // Callers only pass composites; treat anything else as an empty object.
            _ => Composite::Object(IndexMap::new()),
        };
        Self {
            cell: Rc::new(ReactiveCell {
                id,
                tracker,
                data: RefCell::new(data),
            }),
        }
    }

    pub fn id(&self) -> ObjectId {
        self.cell.id
    }

    pub fn is_array(&self) -> bool {
        matches!(*self.cell.data.borrow(), Composite::Array(_))
    }

    /// Whether both handles point at the same object.
    pub fn ptr_eq(&self, other: &Reactive) -> bool {
        Rc::ptr_eq(&self.cell, &other.cell)
    }

    fn track(&self, field: FieldKey) {
        if let Some(tracker) = self.cell.tracker.upgrade() {
            tracker.track(self.cell.id, field);
        }
    }

    fn trigger(&self, fields: Vec<FieldKey>) {
        if let Some(tracker) = self.cell.tracker.upgrade() {
            tracker.trigger_many(self.cell.id, fields);
        }
    }

    /// Read a slot, wrapping a composite the first time it is seen.
    fn observe_slot(&self, slot: &mut Slot) -> Observed {
        match slot {
            Slot::Wrapped(r) => Observed::Reactive(r.clone()),
            Slot::Raw(value) if is_composite(value) => {
                let Some(tracker) = self.cell.tracker.upgrade() else {
                    return Observed::Value(value.clone());
                };
                let nested = Reactive::wrap(
                    tracker.downgrade(),
                    tracker.next_object_id(),
                    std::mem::take(value),
                );
                *slot = Slot::Wrapped(nested.clone());
                Observed::Reactive(nested)
            }
            Slot::Raw(value) => Observed::Value(value.clone()),
        }
    }

    fn read(&self, field: FieldKey) -> Observed {
        let mut data = self.cell.data.borrow_mut();
        let slot = match (&mut *data, &field) {
            (Composite::Object(map), FieldKey::Field(name)) => map.get_mut(name.as_str()),
            (Composite::Array(items), FieldKey::Index(i)) => items.get_mut(*i),
            _ => None,
        };
        match slot {
            Some(slot) => self.observe_slot(slot),
            None => Observed::Value(Json::Null),
        }
    }

    // =========================================================================
    // Object access
    // =========================================================================

    /// Read a field (tracked). Missing fields read as null.
    ///
    /// On arrays, `"length"` reads the length and numeric names read indices.
    pub fn get(&self, field: &str) -> Observed {
        if self.is_array() {
            if field == "length" {
                return Observed::Value(Json::from(self.len()));
            }
            return match field.parse::<usize>() {
                Ok(index) => self.get_index(index),
                Err(_) => Observed::Value(Json::Null),
            };
        }
        self.track(FieldKey::field(field));
        self.read(FieldKey::field(field))
    }

    /// Read a field without recording a dependency.
    pub fn peek(&self, field: &str) -> Observed {
        match self.cell.tracker.upgrade() {
            Some(tracker) => tracker.untracked(|| self.get(field)),
            None => self.get(field),
        }
    }

    /// Write a field. Writing the current value is a no-op.
    pub fn set(&self, field: &str, value: impl Into<Json>) {
        let value = value.into();
        if self.is_array() {
            if let Ok(index) = field.parse::<usize>() {
                self.set_index(index, value);
            }
            return;
        }
        let changed = {
            let mut data = self.cell.data.borrow_mut();
            let Composite::Object(map) = &mut *data else {
                return;
            };
            match map.get(field).map(|slot| slot.same_as(&value)) {
                Some(true) => None,
                Some(false) => {
                    map.insert(field.to_string(), Slot::Raw(value));
                    Some(vec![FieldKey::field(field)])
                }
                None => {
                    map.insert(field.to_string(), Slot::Raw(value));
                    Some(vec![FieldKey::field(field), FieldKey::Length])
                }
            }
        };
        if let Some(fields) = changed {
            self.trigger(fields);
        }
    }

    /// Read-modify-write a field. The read is not tracked.
    pub fn update(&self, field: &str, f: impl FnOnce(Observed) -> Json) {
        let current = self.peek(field);
        self.set(field, f(current));
    }

    /// Remove an object field, returning its last value.
    pub fn remove(&self, field: &str) -> Option<Json> {
        let removed = {
            let mut data = self.cell.data.borrow_mut();
            let Composite::Object(map) = &mut *data else {
                return None;
            };
            map.shift_remove(field)
        };
        let removed = removed?;
        self.trigger(vec![FieldKey::field(field), FieldKey::Length]);
        Some(removed.to_json())
    }

    /// Field names in insertion order (tracks the key set).
    pub fn keys(&self) -> Vec<String> {
        self.track(FieldKey::Length);
        match &*self.cell.data.borrow() {
            Composite::Object(map) => map.keys().cloned().collect(),
            Composite::Array(items) => (0..items.len()).map(|i| i.to_string()).collect(),
        }
    }

    // =========================================================================
    // Array access
    // =========================================================================

    /// Number of elements (arrays) or fields (objects). Tracks the structure.
    pub fn len(&self) -> usize {
        self.track(FieldKey::Length);
        self.len_untracked()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn len_untracked(&self) -> usize {
        match &*self.cell.data.borrow() {
            Composite::Object(map) => map.len(),
            Composite::Array(items) => items.len(),
        }
    }

    /// Read an array element (tracked). Out of range reads as null.
    pub fn get_index(&self, index: usize) -> Observed {
        self.track(FieldKey::Index(index));
        self.read(FieldKey::Index(index))
    }

    /// Write an array element. Writing past the end pads with nulls.
    pub fn set_index(&self, index: usize, value: impl Into<Json>) {
        let value = value.into();
        let changed = {
            let mut data = self.cell.data.borrow_mut();
            let Composite::Array(items) = &mut *data else {
                return;
            };
            match items.get(index).map(|slot| slot.same_as(&value)) {
                Some(true) => None,
                Some(false) => {
                    items[index] = Slot::Raw(value);
                    Some(vec![FieldKey::Index(index)])
                }
                None => {
                    let old_len = items.len();
                    items.resize(index, Slot::Raw(Json::Null));
                    items.push(Slot::Raw(value));
                    Some(structural_keys(old_len, old_len, items.len()))
                }
            }
        };
        if let Some(fields) = changed {
            self.trigger(fields);
        }
    }

    /// Apply a structural edit to the array. `edit` returns the first index
    /// whose content may have changed.
    fn mutate_array<T>(&self, edit: impl FnOnce(&mut Vec<Slot>) -> (usize, T)) -> Option<T> {
        let (fields, out) = {
            let mut data = self.cell.data.borrow_mut();
            let Composite::Array(items) = &mut *data else {
                return None;
            };
            let old_len = items.len();
            let (from, out) = edit(items);
            (structural_keys(from, old_len, items.len()), out)
        };
        self.trigger(fields);
        Some(out)
    }

    pub fn push(&self, value: impl Into<Json>) {
        let value = value.into();
        self.mutate_array(|items| {
            items.push(Slot::Raw(value));
            (items.len() - 1, ())
        });
    }

    pub fn pop(&self) -> Option<Json> {
        if self.len_untracked() == 0 {
            return None;
        }
        self.mutate_array(|items| {
            let popped = items.pop().map(|slot| slot.to_json());
            (items.len(), popped)
        })
        .flatten()
    }

    /// Insert at `index` (clamped to the length).
    pub fn insert(&self, index: usize, value: impl Into<Json>) {
        let value = value.into();
        self.mutate_array(|items| {
            let index = index.min(items.len());
            items.insert(index, Slot::Raw(value));
            (index, ())
        });
    }

    /// Remove and return the element at `index`.
    pub fn remove_index(&self, index: usize) -> Option<Json> {
        if index >= self.len_untracked() {
            return None;
        }
        self.mutate_array(|items| (index, items.remove(index).to_json()))
    }

    pub fn swap(&self, a: usize, b: usize) {
        let len = self.len_untracked();
        if a == b || a >= len || b >= len {
            return;
        }
        self.mutate_array(|items| {
            items.swap(a, b);
            (a.min(b), ())
        });
    }

    pub fn reverse(&self) {
        if self.len_untracked() < 2 {
            return;
        }
        self.mutate_array(|items| {
            items.reverse();
            (0, ())
        });
    }

    pub fn truncate(&self, len: usize) {
        if len >= self.len_untracked() {
            return;
        }
        self.mutate_array(|items| {
            items.truncate(len);
            (len, ())
        });
    }

    pub fn clear(&self) {
        self.truncate(0);
    }

    /// Keep only elements whose JSON form satisfies `keep`.
    pub fn retain(&self, mut keep: impl FnMut(&Json) -> bool) {
        let values: Vec<Json> = match &*self.cell.data.borrow() {
            Composite::Array(items) => items.iter().map(Slot::to_json).collect(),
            Composite::Object(_) => return,
        };
        let mask: Vec<bool> = values.iter().map(|value| keep(value)).collect();
        let Some(first_dropped) = mask.iter().position(|kept| !kept) else {
            return;
        };
        self.mutate_array(|items| {
            let mut flags = mask.into_iter();
            items.retain(|_| flags.next().unwrap_or(true));
            (first_dropped, ())
        });
    }

    /// Stable sort by `compare` over the elements' JSON form. Nested reactive
    /// elements move with their identity intact.
    pub fn sort_by(&self, mut compare: impl FnMut(&Json, &Json) -> Ordering) {
        let values: Vec<Json> = match &*self.cell.data.borrow() {
            Composite::Array(items) => items.iter().map(Slot::to_json).collect(),
            Composite::Object(_) => return,
        };
        let mut order: Vec<usize> = (0..values.len()).collect();
        order.sort_by(|&a, &b| compare(&values[a], &values[b]));
        let Some(first_moved) = order.iter().enumerate().position(|(i, &from)| i != from) else {
            return;
        };
        self.mutate_array(|items| {
            let mut taken: Vec<Option<Slot>> = items.drain(..).map(Some).collect();
            items.extend(order.iter().filter_map(|&from| taken[from].take()));
            (first_moved, ())
        });
    }

    /// All elements, tracking the length and every index.
    pub fn iter(&self) -> Vec<Observed> {
        let len = self.len();
        (0..len).map(|i| self.get_index(i)).collect()
    }

    // =========================================================================
    // Snapshots
    // =========================================================================

    /// Deep plain-JSON copy, tracking everything it reads.
    pub fn snapshot(&self) -> Json {
        let keys = self.keys();
        if self.is_array() {
            Json::Array(
                (0..keys.len())
                    .map(|i| self.get_index(i).into_json())
                    .collect(),
            )
        } else {
            Json::Object(
                keys.into_iter()
                    .map(|k| {
                        let v = self.get(&k).into_json();
                        (k, v)
                    })
                    .collect(),
            )
        }
    }

    /// Deep plain-JSON copy without recording dependencies.
    pub fn snapshot_untracked(&self) -> Json {
        match &*self.cell.data.borrow() {
            Composite::Array(items) => Json::Array(items.iter().map(Slot::to_json).collect()),
            Composite::Object(map) => Json::Object(
                map.iter()
                    .map(|(k, slot)| (k.clone(), slot.to_json()))
                    .collect(),
            ),
        }
    }
}

/// Keys touched by a structural edit: the length plus every index from
/// `from` up to the longer of the old and new lengths.
fn structural_keys(from: usize, old_len: usize, new_len: usize) -> Vec<FieldKey> {
    std::iter::once(FieldKey::Length)
        .chain((from..old_len.max(new_len)).map(FieldKey::Index))
        .collect()
}

// =============================================================================
// Tests
// =============================================================================
