#![forbid(unsafe_code)]

//! The dependency-tracking context seam.
//!
//! Dependent properties never schedule anything themselves. They talk to a
//! [`Tracker`] through three opaque-handle operations:
//!
//! - [`create_subscriber_set`](Tracker::create_subscriber_set): allocate an
//!   empty set, once per slot;
//! - [`register_current`](Tracker::register_current): subscribe the
//!   currently running computation, if any;
//! - [`invalidate`](Tracker::invalidate): mark every subscriber stale.
//!
//! The tracker owns the subscriber sets. Slots only hold a copyable
//! [`SubscriberHandle`], so no ownership cycle can form between slots and
//! computations.
//!
//! [`Deps`] is a reference tracker with autorun/flush scheduling.

pub mod deps;
#[cfg(test)]
pub(crate) mod recording;

pub use deps::{Computation, Deps};

/// Opaque identifier of a subscriber set owned by a [`Tracker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberHandle(u64);

impl SubscriberHandle {
    /// Create a handle from a raw id. Only meaningful to the tracker that
    /// allocated it.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Contract of a dependency-tracking context.
pub trait Tracker {
    /// Allocate an empty subscriber set.
    fn create_subscriber_set(&self) -> SubscriberHandle;

    /// Add the currently running computation to `handle`'s set. No-op when
    /// nothing is running.
    fn register_current(&self, handle: SubscriberHandle);

    /// Mark every computation in `handle`'s set stale. Whether they re-run
    /// immediately or on a later flush is up to the tracker.
    fn invalidate(&self, handle: SubscriberHandle);
}

impl<T: Tracker + ?Sized> Tracker for std::rc::Rc<T> {
    fn create_subscriber_set(&self) -> SubscriberHandle {
        (**self).create_subscriber_set()
    }

    fn register_current(&self, handle: SubscriberHandle) {
        (**self).register_current(handle);
    }

    fn invalidate(&self, handle: SubscriberHandle) {
        (**self).invalidate(handle);
    }
}
