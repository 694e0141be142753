//! Counting tracker for unit tests.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use ahash::AHashMap;

use super::{SubscriberHandle, Tracker};

#[derive(Default)]
struct Counts {
    registrations: u64,
    invalidations: u64,
}

/// Records every tracker call per handle. `active` simulates a running
/// computation for `register_current`.
#[derive(Clone, Default)]
pub(crate) struct RecordingTracker {
    next: Rc<Cell<u64>>,
    active: Rc<Cell<bool>>,
    counts: Rc<RefCell<AHashMap<SubscriberHandle, Counts>>>,
}

impl RecordingTracker {
    pub(crate) fn set_active(&self, active: bool) {
        self.active.set(active);
    }

    pub(crate) fn registrations(&self, handle: SubscriberHandle) -> u64 {
        self.counts
            .borrow()
            .get(&handle)
            .map_or(0, |c| c.registrations)
    }

    pub(crate) fn invalidations(&self, handle: SubscriberHandle) -> u64 {
        self.counts
            .borrow()
            .get(&handle)
            .map_or(0, |c| c.invalidations)
    }

    pub(crate) fn sets_created(&self) -> u64 {
        self.next.get()
    }
}

impl Tracker for RecordingTracker {
    fn create_subscriber_set(&self) -> SubscriberHandle {
        let handle = SubscriberHandle::new(self.next.get());
        self.next.set(self.next.get() + 1);
        self.counts.borrow_mut().insert(handle, Counts::default());
        handle
    }

    fn register_current(&self, handle: SubscriberHandle) {
        if self.active.get() {
            self.counts.borrow_mut().entry(handle).or_default().registrations += 1;
        }
    }

    fn invalidate(&self, handle: SubscriberHandle) {
        self.counts.borrow_mut().entry(handle).or_default().invalidations += 1;
    }
}
