#![forbid(unsafe_code)]

//! Reference dependency-tracking context with autorun/flush scheduling.
//!
//! # Design
//!
//! [`Deps`] is a cheap, cloneable handle to shared tracker state. A
//! [`Computation`] wraps a closure that is run immediately by
//! [`Deps::autorun`] and re-run by [`Deps::flush`] after it has been
//! invalidated. While a computation runs it sits on top of the "current"
//! stack, so [`Tracker::register_current`] knows whom to subscribe.
//!
//! Subscriber sets hold `Weak` references; pending re-runs hold strong ones
//! until the next flush.
//!
//! # Invariants
//!
//! 1. Invalidation is deferred: computations re-run only inside `flush()`.
//! 2. A computation is queued at most once per invalidation cycle.
//! 3. Before each run a computation drops all its subscriptions, so it is
//!    subscribed exactly to what its latest run read.
//! 4. A stopped computation never runs again and holds no subscriptions.
//! 5. Only sets with at least one subscriber occupy memory; a set whose last
//!    subscriber leaves, or that is invalidated, is removed.
//! 6. Dropping the [`Computation`] returned by `autorun` stops it.
//!
//! # Failure Modes
//!
//! - **Self-invalidating computation**: a computation that invalidates what
//!   it reads re-queues itself forever. `flush()` gives up after
//!   [`MAX_FLUSH_RERUNS`] re-runs, logs a warning and leaves the rest queued.
//! - **Nested flush**: calling `flush()` from inside a computation is a
//!   no-op; the outer flush picks up the work.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::ptr;
use std::rc::{Rc, Weak};

use ahash::AHashMap;

use super::{SubscriberHandle, Tracker};

/// Upper bound on re-runs performed by a single [`Deps::flush`] call.
pub const MAX_FLUSH_RERUNS: usize = 10_000;

type RunFn = Box<dyn FnMut(&Computation)>;

struct ComputationInner {
    id: u64,
    run: RefCell<RunFn>,
    invalidated: Cell<bool>,
    stopped: Cell<bool>,
    run_count: Cell<u64>,
    /// Sets this computation currently belongs to.
    subscriptions: RefCell<Vec<SubscriberHandle>>,
    deps: Weak<DepsInner>,
}

#[derive(Default)]
struct DepsInner {
    next_handle: Cell<u64>,
    next_computation: Cell<u64>,
    subscribers: RefCell<AHashMap<SubscriberHandle, Vec<Weak<ComputationInner>>>>,
    /// `None` entries mark `nonreactive` sections.
    current: RefCell<Vec<Option<Rc<ComputationInner>>>>,
    pending: RefCell<VecDeque<Rc<ComputationInner>>>,
    flushing: Cell<bool>,
}

impl DepsInner {
    fn current_computation(&self) -> Option<Rc<ComputationInner>> {
        self.current.borrow().last().cloned().flatten()
    }

    fn unsubscribe(&self, comp: &ComputationInner) {
        let handles = std::mem::take(&mut *comp.subscriptions.borrow_mut());
        if handles.is_empty() {
            return;
        }
        let mut subscribers = self.subscribers.borrow_mut();
        for handle in handles {
            if let Some(list) = subscribers.get_mut(&handle) {
                list.retain(|weak| !ptr::eq(weak.as_ptr(), comp));
                if list.is_empty() {
                    subscribers.remove(&handle);
                }
            }
        }
    }

    fn invalidate_computation(&self, comp: &Rc<ComputationInner>) {
        if comp.stopped.get() || comp.invalidated.replace(true) {
            return;
        }
        self.unsubscribe(comp);
        self.pending.borrow_mut().push_back(Rc::clone(comp));
        tracing::trace!(message = "depprop.deps.invalidated", computation = comp.id);
    }

    fn run(&self, comp: &Rc<ComputationInner>) {
        let Ok(mut run) = comp.run.try_borrow_mut() else {
            tracing::warn!(message = "depprop.deps.reentrant_run", computation = comp.id);
            return;
        };
        self.unsubscribe(comp);
        comp.invalidated.set(false);
        comp.run_count.set(comp.run_count.get() + 1);

        self.current.borrow_mut().push(Some(Rc::clone(comp)));
        let _current = CurrentGuard { deps: self };
        let view = Computation {
            inner: Rc::clone(comp),
            owned: false,
        };
        let run: &mut RunFn = &mut run;
        run(&view);
    }
}

/// Pops the current-computation stack, also on unwind.
struct CurrentGuard<'a> {
    deps: &'a DepsInner,
}

impl Drop for CurrentGuard<'_> {
    fn drop(&mut self) {
        self.deps.current.borrow_mut().pop();
    }
}

struct FlushGuard<'a> {
    deps: &'a DepsInner,
}

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        self.deps.flushing.set(false);
    }
}

/// Reference tracking context.
///
/// Cloning a `Deps` creates a new handle to the **same** context.
#[derive(Clone, Default)]
pub struct Deps {
    inner: Rc<DepsInner>,
}

impl fmt::Debug for Deps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deps")
            .field("subscriber_sets", &self.inner.subscribers.borrow().len())
            .field("pending", &self.inner.pending.borrow().len())
            .field("active", &self.active())
            .finish()
    }
}

impl Deps {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` now under tracking and again after each invalidation flush.
    ///
    /// The returned handle keeps the computation alive; dropping it stops
    /// the computation.
    pub fn autorun(&self, f: impl FnMut(&Computation) + 'static) -> Computation {
        let id = self.inner.next_computation.get();
        self.inner.next_computation.set(id + 1);

        let comp = Rc::new(ComputationInner {
            id,
            run: RefCell::new(Box::new(f)),
            invalidated: Cell::new(false),
            stopped: Cell::new(false),
            run_count: Cell::new(0),
            subscriptions: RefCell::new(Vec::new()),
            deps: Rc::downgrade(&self.inner),
        });
        tracing::debug!(message = "depprop.deps.autorun", computation = id);
        self.inner.run(&comp);

        Computation {
            inner: comp,
            owned: true,
        }
    }

    /// Re-run every invalidated computation until none is pending.
    ///
    /// Returns the number of re-runs performed. Nested calls return 0.
    pub fn flush(&self) -> usize {
        if self.inner.flushing.replace(true) {
            return 0;
        }
        let _flushing = FlushGuard { deps: &self.inner };

        let mut reruns = 0;
        loop {
            let next = self.inner.pending.borrow_mut().pop_front();
            let Some(comp) = next else {
                break;
            };
            if comp.stopped.get() || !comp.invalidated.get() {
                continue;
            }
            if reruns >= MAX_FLUSH_RERUNS {
                tracing::warn!(
                    message = "depprop.deps.flush_limit",
                    limit = MAX_FLUSH_RERUNS,
                    computation = comp.id
                );
                self.inner.pending.borrow_mut().push_front(comp);
                break;
            }
            self.inner.run(&comp);
            reruns += 1;
        }
        tracing::trace!(message = "depprop.deps.flush", reruns);
        reruns
    }

    /// Whether a computation is running right now.
    #[must_use]
    pub fn active(&self) -> bool {
        self.inner.current_computation().is_some()
    }

    /// Run `f` with no current computation, so reads inside do not subscribe.
    pub fn nonreactive<R>(&self, f: impl FnOnce() -> R) -> R {
        self.inner.current.borrow_mut().push(None);
        let _current = CurrentGuard { deps: &self.inner };
        f()
    }

    /// Number of computations waiting for the next flush.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner
            .pending
            .borrow()
            .iter()
            .filter(|c| !c.stopped.get() && c.invalidated.get())
            .count()
    }

    /// Number of subscriber sets with at least one registered computation.
    #[must_use]
    pub fn subscriber_set_count(&self) -> usize {
        self.inner.subscribers.borrow().len()
    }

    /// Number of live computations subscribed to `handle`.
    #[must_use]
    pub fn subscriber_count(&self, handle: SubscriberHandle) -> usize {
        self.inner
            .subscribers
            .borrow()
            .get(&handle)
            .map_or(0, |list| list.iter().filter(|w| w.strong_count() > 0).count())
    }
}

impl Tracker for Deps {
    fn create_subscriber_set(&self) -> SubscriberHandle {
        // The list itself is created by the first registration.
        let raw = self.inner.next_handle.get();
        self.inner.next_handle.set(raw + 1);
        SubscriberHandle::new(raw)
    }

    fn register_current(&self, handle: SubscriberHandle) {
        let Some(comp) = self.inner.current_computation() else {
            return;
        };
        if comp.stopped.get() {
            return;
        }
        let mut subscribers = self.inner.subscribers.borrow_mut();
        let list = subscribers.entry(handle).or_default();
        if list.iter().any(|w| ptr::eq(w.as_ptr(), Rc::as_ptr(&comp))) {
            return;
        }
        list.push(Rc::downgrade(&comp));
        comp.subscriptions.borrow_mut().push(handle);
    }

    fn invalidate(&self, handle: SubscriberHandle) {
        let subscribed = self
            .inner
            .subscribers
            .borrow_mut()
            .remove(&handle)
            .unwrap_or_default();
        for weak in subscribed {
            if let Some(comp) = weak.upgrade() {
                self.inner.invalidate_computation(&comp);
            }
        }
    }
}

/// A tracked closure managed by [`Deps`].
///
/// The handle returned by [`Deps::autorun`] owns the computation: dropping it
/// stops the computation. The handle passed into the closure on each run is
/// a borrowed view and stops nothing when dropped.
#[must_use = "dropping a Computation stops it"]
pub struct Computation {
    inner: Rc<ComputationInner>,
    owned: bool,
}

impl Computation {
    #[must_use]
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// How many times the closure has run, including the current run.
    #[must_use]
    pub fn run_count(&self) -> u64 {
        self.inner.run_count.get()
    }

    /// Whether this is the first run (only meaningful inside the closure).
    #[must_use]
    pub fn first_run(&self) -> bool {
        self.inner.run_count.get() == 1
    }

    #[must_use]
    pub fn is_invalidated(&self) -> bool {
        self.inner.invalidated.get()
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.get()
    }

    /// Queue this computation for the next flush.
    pub fn invalidate(&self) {
        if let Some(deps) = self.inner.deps.upgrade() {
            deps.invalidate_computation(&self.inner);
        }
    }

    /// Stop the computation. It will not run again.
    pub fn stop(&self) {
        if self.inner.stopped.replace(true) {
            return;
        }
        if let Some(deps) = self.inner.deps.upgrade() {
            deps.unsubscribe(&self.inner);
        }
        tracing::debug!(message = "depprop.deps.stopped", computation = self.inner.id);
    }
}

impl Drop for Computation {
    fn drop(&mut self) {
        if self.owned {
            self.stop();
        }
    }
}

impl fmt::Debug for Computation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computation")
            .field("id", &self.inner.id)
            .field("run_count", &self.inner.run_count.get())
            .field("invalidated", &self.inner.invalidated.get())
            .field("stopped", &self.inner.stopped.get())
            .finish()
    }
}
