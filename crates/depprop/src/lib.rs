#![forbid(unsafe_code)]

//! Dependent properties: one storage slot, two accessors.
//!
//! [`DepProps::install`] gives an [`Object`] a named slot reachable through
//! a **plain** accessor (`obj["count"]`, invisible to dependency tracking)
//! and a **reactive** accessor (`obj["$count"]`, or `obj["$"]["count"]` when
//! namespaced). Reactive reads subscribe the running computation of the
//! injected [`Tracker`]; reactive writes invalidate subscribers unless the
//! configured equality policy considers the new value equal to the old one.
//!
//! # Example
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! use depprop::{DepOptions, DepProps, Deps, Object, Value};
//!
//! let deps = Deps::new();
//! let props = DepProps::new(deps.clone());
//! let counter = Object::new();
//! props.install(&counter, "count", DepOptions::new())?;
//! counter.set("count", 5);
//!
//! let seen = Rc::new(Cell::new(0.0));
//! let sink = Rc::clone(&seen);
//! let reader = counter.clone();
//! let comp = deps.autorun(move |_| {
//!     sink.set(reader.get("$count").as_number().unwrap_or(f64::NAN));
//! });
//! assert_eq!(seen.get(), 5.0);
//!
//! // Same value under strict equality: nothing re-runs.
//! counter.set("$count", 5);
//! deps.flush();
//! assert_eq!(comp.run_count(), 1);
//!
//! counter.set("$count", 6);
//! deps.flush();
//! assert_eq!(seen.get(), 6.0);
//! assert_eq!(comp.run_count(), 2);
//! assert_eq!(counter.get("count"), Value::from(6));
//! # Ok::<(), depprop::DepPropError>(())
//! ```
//!
//! # Modules
//!
//! - [`value`] / [`object`]: the dynamic value model and host objects.
//! - [`store`]: the hidden per-object slot table.
//! - [`equality`] / [`options`]: installation policy.
//! - [`install`]: the installer and accessor pair.
//! - [`readonly`]: frozen properties.
//! - [`tracker`]: the tracking-context seam and the [`Deps`] reference
//!   tracker.

pub mod equality;
pub mod error;
pub mod install;
pub mod object;
pub mod options;
pub mod readonly;
pub mod store;
pub mod tracker;
pub mod value;

pub use equality::{EqualityMode, EqualsFn, Predicate};
pub use error::{DepPropError, PropertyError, Result};
pub use install::{Access, Accessor, DepProperty, DepProps, DiagnosticSink};
pub use object::{
    DescriptorKind, Getter, Object, Property, PropertyDescriptor, PropertyKind, Setter,
    WeakObject,
};
#[cfg(feature = "serde")]
pub use options::OptionsFile;
pub use options::{DEFAULT_PREFIX, DepOptions, GetContext, GetHook, Placement, SetContext, SetHook};
pub use readonly::{ReadOnly, define_read_only};
pub use store::{SlotRecord, SlotState, SlotStore, get_or_create_store};
pub use tracker::{Computation, Deps, SubscriberHandle, Tracker};
pub use value::Value;
