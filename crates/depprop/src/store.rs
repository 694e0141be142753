#![forbid(unsafe_code)]

//! Per-object slot storage.
//!
//! Every object carrying at least one dependent property owns exactly one
//! hidden [`SlotStore`], created lazily by [`get_or_create_store`]. The store
//! maps slot names to [`SlotRecord`]s. A record holds the current value and
//! the subscriber handle the tracker allocated for the slot.
//!
//! # Invariants
//!
//! 1. Slot names are unique per store; a second record for the same name is
//!    refused and the existing one is left untouched.
//! 2. A record's subscriber handle is allocated once and never replaced.
//! 3. A record moves from [`SlotState::Unset`] to [`SlotState::Set`] on its
//!    first write and never back.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::error::DepPropError;
use crate::object::Object;
use crate::tracker::{SubscriberHandle, Tracker};
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlotState {
    /// Never written; reads yield [`Value::Undefined`].
    #[default]
    Unset,
    Set,
}

/// Storage for one named slot.
pub struct SlotRecord {
    value: RefCell<Value>,
    state: Cell<SlotState>,
    subscribers: SubscriberHandle,
}

impl SlotRecord {
    fn new(subscribers: SubscriberHandle) -> Self {
        Self {
            value: RefCell::new(Value::Undefined),
            state: Cell::new(SlotState::Unset),
            subscribers,
        }
    }

    /// Current value (cloned; objects are shared handles).
    #[must_use]
    pub fn value(&self) -> Value {
        self.value.borrow().clone()
    }

    #[must_use]
    pub fn state(&self) -> SlotState {
        self.state.get()
    }

    #[must_use]
    pub fn subscribers(&self) -> SubscriberHandle {
        self.subscribers
    }

    /// Store `value` and mark the slot as set.
    pub(crate) fn store(&self, value: Value) {
        let previous = self.value.replace(value);
        self.state.set(SlotState::Set);
        drop(previous);
    }
}

impl fmt::Debug for SlotRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotRecord")
            .field("value", &*self.value.borrow())
            .field("state", &self.state.get())
            .field("subscribers", &self.subscribers)
            .finish()
    }
}

/// Hidden per-object table of slot records.
#[derive(Default)]
pub struct SlotStore {
    slots: RefCell<IndexMap<String, Rc<SlotRecord>>>,
}

impl SlotStore {
    /// Allocate the record for `name` with a fresh subscriber set.
    ///
    /// # Errors
    ///
    /// [`DepPropError::DuplicateSlot`] if `name` already has a record.
    pub(crate) fn create_record(
        &self,
        name: &str,
        tracker: &dyn Tracker,
    ) -> Result<Rc<SlotRecord>, DepPropError> {
        if self.contains(name) {
            return Err(DepPropError::duplicate(name));
        }
        let record = Rc::new(SlotRecord::new(tracker.create_subscriber_set()));
        self.slots
            .borrow_mut()
            .insert(name.to_owned(), Rc::clone(&record));
        Ok(record)
    }

    #[must_use]
    pub fn record(&self, name: &str) -> Option<Rc<SlotRecord>> {
        self.slots.borrow().get(name).cloned()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.slots.borrow().contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.borrow().is_empty()
    }

    /// Slot names in installation order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.slots.borrow().keys().cloned().collect()
    }
}

impl fmt::Debug for SlotStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotStore")
            .field("slots", &self.names())
            .finish()
    }
}

/// The store of `obj`, installing an empty one on first use.
#[must_use]
pub fn get_or_create_store(obj: &Object) -> &SlotStore {
    obj.slot_store()
}
