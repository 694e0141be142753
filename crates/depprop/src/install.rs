#![forbid(unsafe_code)]

//! Accessor installation.
//!
//! [`DepProps`] is the installer. It is built once per consuming context
//! around an injected [`Tracker`] and installs dependent properties on
//! [`Object`]s:
//!
//! - the **plain** accessor at `obj[name]` reads and writes the slot and
//!   never touches the tracker;
//! - the **reactive** accessor at `obj[prefix + name]` (or
//!   `obj[prefix][name]` when namespaced) subscribes the running computation
//!   on read and invalidates subscribers on a write the equality policy
//!   considers a change.
//!
//! Every installation also returns the same pair as a [`DepProperty`], so
//! callers can hold typed accessors instead of looking keys up.
//!
//! # Ordering
//!
//! 1. `on_get` runs before subscription; a suppressed read never subscribes.
//! 2. `on_set` runs before the store is mutated and before invalidation.
//! 3. A reactive write stores the new value first, then invalidates if the
//!    predicate says the value changed.
//!
//! # Failure Modes
//!
//! Nothing here panics or aborts the caller. Anomalies are logged with
//! `tracing`, passed to the diagnostics sink, and returned:
//!
//! - **Duplicate slot**: the call is skipped; earlier accessors keep working.
//! - **Unknown equality mode**: installation proceeds with invalidation
//!   disabled for that slot.
//! - **Property or namespace conflict**: detected before the slot store or
//!   record is created, so the object is left untouched.
//! - **Accessor at the namespace key**: only a data property holding an
//!   object is reused as the namespace. An accessor at `obj[prefix]` is a
//!   namespace conflict even if its getter would return an object, since
//!   the getter could return a different object on each read.

use std::fmt;
use std::rc::Rc;

use crate::equality::Predicate;
use crate::error::{DepPropError, PropertyError, Result};
use crate::object::{DescriptorKind, Object, Property, WeakObject};
use crate::options::{DepOptions, GetContext, Placement, SetContext};
use crate::store::{SlotRecord, SlotState, get_or_create_store};
use crate::tracker::{SubscriberHandle, Tracker};
use crate::value::Value;

/// Receives every anomaly reported by [`DepProps`].
pub type DiagnosticSink = Rc<dyn Fn(&DepPropError)>;

/// Which of the two accessors an access goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Plain,
    Reactive,
}

impl Access {
    #[must_use]
    pub fn is_reactive(self) -> bool {
        matches!(self, Self::Reactive)
    }
}

/// Shared state behind both accessors of one slot.
struct Binding {
    name: String,
    owner: WeakObject,
    record: Rc<SlotRecord>,
    options: DepOptions,
    equality: Predicate,
    tracker: Rc<dyn Tracker>,
}

impl Binding {
    fn read(&self, access: Access) -> Value {
        let Some(object) = self.owner.upgrade() else {
            tracing::trace!(message = "depprop.owner_dropped", name = %self.name);
            return Value::Undefined;
        };
        let reactive = access.is_reactive();

        let current = self.record.value();
        let allowed = self.options.allow_get(&GetContext {
            reactive,
            value: &current,
            object: &object,
            name: &self.name,
            options: &self.options,
        });
        if !allowed {
            tracing::trace!(message = "depprop.read_suppressed", name = %self.name, reactive);
            return Value::Undefined;
        }

        if reactive {
            self.tracker.register_current(self.record.subscribers());
        }
        self.record.value()
    }

    fn write(&self, access: Access, value: Value) {
        let Some(object) = self.owner.upgrade() else {
            tracing::trace!(message = "depprop.owner_dropped", name = %self.name);
            return;
        };
        let reactive = access.is_reactive();

        let old = self.record.value();
        let allowed = self.options.allow_set(&SetContext {
            reactive,
            old: &old,
            new: &value,
            object: &object,
            name: &self.name,
            options: &self.options,
        });
        if !allowed {
            tracing::trace!(message = "depprop.write_suppressed", name = %self.name, reactive);
            return;
        }

        if !reactive {
            self.record.store(value);
            return;
        }

        // The hook may have written the slot itself; compare against what is
        // stored now.
        let current = self.record.value();
        let invalidate = self.equality.should_invalidate(&current, &value);
        self.record.store(value);
        if invalidate {
            tracing::trace!(message = "depprop.invalidate", name = %self.name);
            self.tracker.invalidate(self.record.subscribers());
        }
    }
}

fn accessor_property(binding: &Rc<Binding>, access: Access) -> Property {
    let getter = Rc::clone(binding);
    let setter = Rc::clone(binding);
    Property::accessor(
        Some(Rc::new(move || getter.read(access))),
        Some(Rc::new(move |value: Value| setter.write(access, value))),
    )
    .enumerable(binding.options.is_enumerable())
    .configurable(binding.options.is_configurable())
}

/// One accessor of a dependent property.
#[derive(Clone)]
pub struct Accessor {
    binding: Rc<Binding>,
    access: Access,
}

impl Accessor {
    /// Read through this accessor. Suppressed reads yield `Undefined`.
    #[must_use]
    pub fn get(&self) -> Value {
        self.binding.read(self.access)
    }

    /// Write through this accessor.
    pub fn set(&self, value: impl Into<Value>) {
        self.binding.write(self.access, value.into());
    }

    #[must_use]
    pub fn access(&self) -> Access {
        self.access
    }
}

impl fmt::Debug for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Accessor")
            .field("name", &self.binding.name)
            .field("access", &self.access)
            .finish()
    }
}

/// The accessor pair of an installed dependent property.
///
/// Cloning creates a new handle to the **same** slot.
#[derive(Clone)]
pub struct DepProperty {
    binding: Rc<Binding>,
    reactive_key: String,
    namespace: Option<Object>,
}

impl DepProperty {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.binding.name
    }

    /// Key of the reactive accessor on its target object.
    #[must_use]
    pub fn reactive_key(&self) -> &str {
        &self.reactive_key
    }

    /// The namespace sub-object holding the reactive accessor, if namespaced.
    #[must_use]
    pub fn namespace(&self) -> Option<&Object> {
        self.namespace.as_ref()
    }

    #[must_use]
    pub fn plain(&self) -> Accessor {
        Accessor {
            binding: Rc::clone(&self.binding),
            access: Access::Plain,
        }
    }

    #[must_use]
    pub fn reactive(&self) -> Accessor {
        Accessor {
            binding: Rc::clone(&self.binding),
            access: Access::Reactive,
        }
    }

    #[must_use]
    pub fn state(&self) -> SlotState {
        self.binding.record.state()
    }

    #[must_use]
    pub fn is_set(&self) -> bool {
        self.state() == SlotState::Set
    }

    #[must_use]
    pub fn subscribers(&self) -> SubscriberHandle {
        self.binding.record.subscribers()
    }

    #[must_use]
    pub fn options(&self) -> &DepOptions {
        &self.binding.options
    }
}

impl fmt::Debug for DepProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DepProperty")
            .field("name", &self.binding.name)
            .field("reactive_key", &self.reactive_key)
            .field("record", &self.binding.record)
            .field("equality", &self.binding.equality)
            .finish()
    }
}

/// Where the reactive accessor will be defined.
enum Target {
    Owner,
    Namespace(Object),
    NewNamespace,
}

/// Installer bound to one tracking context.
#[derive(Clone)]
pub struct DepProps {
    tracker: Rc<dyn Tracker>,
    diagnostics: Option<DiagnosticSink>,
}

impl fmt::Debug for DepProps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DepProps")
            .field("diagnostics", &self.diagnostics.is_some())
            .finish_non_exhaustive()
    }
}

impl DepProps {
    #[must_use]
    pub fn new(tracker: impl Tracker + 'static) -> Self {
        Self::from_shared(Rc::new(tracker))
    }

    #[must_use]
    pub fn from_shared(tracker: Rc<dyn Tracker>) -> Self {
        Self {
            tracker,
            diagnostics: None,
        }
    }

    /// Also deliver every reported anomaly to `sink`.
    #[must_use]
    pub fn with_diagnostics(mut self, sink: impl Fn(&DepPropError) + 'static) -> Self {
        self.diagnostics = Some(Rc::new(sink));
        self
    }

    #[must_use]
    pub fn tracker(&self) -> &Rc<dyn Tracker> {
        &self.tracker
    }

    /// Install a dependent property `name` on `obj`.
    ///
    /// # Errors
    ///
    /// - [`DepPropError::DuplicateSlot`] if `obj` already has a slot `name`;
    /// - [`DepPropError::Property`] if either accessor key holds a
    ///   non-configurable property;
    /// - [`DepPropError::NamespaceConflict`] if namespaced placement finds a
    ///   non-object at `obj[prefix]`.
    ///
    /// In every error case `obj` is unchanged. An unknown equality mode is
    /// reported but does not fail the installation.
    pub fn install(&self, obj: &Object, name: &str, options: DepOptions) -> Result<DepProperty> {
        let equality = match options.equality().resolve() {
            Ok(predicate) => predicate,
            Err(err) => {
                self.report(&err);
                Predicate::AlwaysEqual
            }
        };

        if obj
            .existing_slot_store()
            .is_some_and(|store| store.contains(name))
        {
            return Err(self.fail(DepPropError::duplicate(name)));
        }

        let reactive_key = options.reactive_key(name);
        let target = self
            .plan_target(obj, name, &reactive_key, &options)
            .map_err(|err| self.fail(err))?;

        let record = get_or_create_store(obj)
            .create_record(name, self.tracker.as_ref())
            .map_err(|err| self.fail(err))?;

        let binding = Rc::new(Binding {
            name: name.to_owned(),
            owner: obj.downgrade(),
            record,
            options,
            equality,
            tracker: Rc::clone(&self.tracker),
        });

        obj.define_property(name, accessor_property(&binding, Access::Plain))
            .map_err(|err| self.fail(err.into()))?;

        let prefix = binding.options.prefix_str();
        let (target, namespace) = match target {
            Target::Owner => (obj.clone(), None),
            Target::Namespace(sub) => (sub.clone(), Some(sub)),
            Target::NewNamespace => {
                let sub = Object::new();
                obj.define_property(
                    prefix,
                    Property::data(sub.clone())
                        .writable(false)
                        .enumerable(false)
                        .configurable(false),
                )
                .map_err(|err| self.fail(err.into()))?;
                tracing::debug!(message = "depprop.namespace_created", prefix);
                (sub.clone(), Some(sub))
            }
        };
        target
            .define_property(&reactive_key, accessor_property(&binding, Access::Reactive))
            .map_err(|err| self.fail(err.into()))?;

        tracing::debug!(
            message = "depprop.installed",
            name,
            reactive_key = %reactive_key,
            placement = ?binding.options.placement_mode(),
            equality = ?binding.equality
        );

        Ok(DepProperty {
            binding,
            reactive_key,
            namespace,
        })
    }

    /// Check that both accessors can be placed without touching `obj`.
    fn plan_target(
        &self,
        obj: &Object,
        name: &str,
        reactive_key: &str,
        options: &DepOptions,
    ) -> Result<Target> {
        let not_configurable = |key: &str| {
            DepPropError::from(PropertyError::NotConfigurable {
                key: key.to_owned(),
            })
        };

        if !obj.can_define(name) {
            return Err(not_configurable(name));
        }

        match options.placement_mode() {
            Placement::Prepend => {
                if !obj.can_define(reactive_key) {
                    return Err(not_configurable(reactive_key));
                }
                Ok(Target::Owner)
            }
            Placement::Namespaced => {
                let prefix = options.prefix_str();
                let namespace_conflict = || DepPropError::NamespaceConflict {
                    prefix: prefix.to_owned(),
                };
                if prefix == name {
                    return Err(namespace_conflict());
                }
                match obj.descriptor(prefix).map(|d| d.kind) {
                    None => Ok(Target::NewNamespace),
                    Some(DescriptorKind::Data {
                        value: Value::Object(sub),
                        ..
                    }) => {
                        if !sub.can_define(reactive_key) {
                            return Err(not_configurable(reactive_key));
                        }
                        Ok(Target::Namespace(sub))
                    }
                    Some(_) => Err(namespace_conflict()),
                }
            }
        }
    }

    fn report(&self, err: &DepPropError) {
        tracing::warn!(message = "depprop.diagnostic", code = err.code(), error = %err);
        if let Some(sink) = &self.diagnostics {
            sink(err);
        }
    }

    fn fail(&self, err: DepPropError) -> DepPropError {
        self.report(&err);
        err
    }
}
