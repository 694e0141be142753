#![forbid(unsafe_code)]

//! Host objects: shared property tables with descriptors.
//!
//! An [`Object`] is a cheaply cloneable handle to an ordered table of own
//! properties. Each property is either a data property (a stored [`Value`]
//! plus a `writable` flag) or an accessor property (optional getter and
//! setter closures). Every property carries `enumerable` and `configurable`
//! flags.
//!
//! # Assignment semantics
//!
//! [`Object::set`] dispatches on the existing own property:
//!
//! - accessor with a setter: the setter runs;
//! - accessor without a setter, or read-only data: the write is ignored;
//! - writable data: the value is replaced;
//! - missing: a plain enumerable, writable, configurable data property is
//!   created.
//!
//! # Invariants
//!
//! 1. A non-configurable property is never redefined or deleted.
//! 2. Own keys keep insertion order; redefinition keeps the original position.
//! 3. Getters and setters run with no internal borrow held, so they may
//!    freely read and write the object they live on.
//! 4. Each object owns at most one hidden [`SlotStore`], created on demand.
//!    It is not a property and never shows up in [`Object::keys`].

use std::cell::{OnceCell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use crate::error::PropertyError;
use crate::store::SlotStore;
use crate::value::Value;

/// Getter closure of an accessor property.
pub type Getter = Rc<dyn Fn() -> Value>;
/// Setter closure of an accessor property.
pub type Setter = Rc<dyn Fn(Value)>;

/// Storage of a single property.
#[derive(Clone)]
pub enum PropertyKind {
    Data { value: Value, writable: bool },
    Accessor {
        get: Option<Getter>,
        set: Option<Setter>,
    },
}

/// A property definition: its kind plus the shared flags.
#[derive(Clone)]
pub struct Property {
    kind: PropertyKind,
    enumerable: bool,
    configurable: bool,
}

impl Property {
    /// A writable, enumerable, configurable data property.
    #[must_use]
    pub fn data(value: impl Into<Value>) -> Self {
        Self {
            kind: PropertyKind::Data {
                value: value.into(),
                writable: true,
            },
            enumerable: true,
            configurable: true,
        }
    }

    /// An enumerable, configurable accessor property.
    #[must_use]
    pub fn accessor(get: Option<Getter>, set: Option<Setter>) -> Self {
        Self {
            kind: PropertyKind::Accessor { get, set },
            enumerable: true,
            configurable: true,
        }
    }

    #[must_use]
    pub fn enumerable(mut self, enumerable: bool) -> Self {
        self.enumerable = enumerable;
        self
    }

    #[must_use]
    pub fn configurable(mut self, configurable: bool) -> Self {
        self.configurable = configurable;
        self
    }

    /// Set the `writable` flag. Has no effect on accessor properties.
    #[must_use]
    pub fn writable(mut self, writable: bool) -> Self {
        if let PropertyKind::Data { writable: w, .. } = &mut self.kind {
            *w = writable;
        }
        self
    }

    #[must_use]
    pub fn kind(&self) -> &PropertyKind {
        &self.kind
    }

    fn descriptor(&self) -> PropertyDescriptor {
        let kind = match &self.kind {
            PropertyKind::Data { value, writable } => DescriptorKind::Data {
                value: value.clone(),
                writable: *writable,
            },
            PropertyKind::Accessor { get, set } => DescriptorKind::Accessor {
                has_get: get.is_some(),
                has_set: set.is_some(),
            },
        };
        PropertyDescriptor {
            kind,
            enumerable: self.enumerable,
            configurable: self.configurable,
        }
    }
}

impl fmt::Debug for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.descriptor(), f)
    }
}

/// Inspectable snapshot of a property's definition.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDescriptor {
    pub kind: DescriptorKind,
    pub enumerable: bool,
    pub configurable: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DescriptorKind {
    Data { value: Value, writable: bool },
    Accessor { has_get: bool, has_set: bool },
}

impl PropertyDescriptor {
    #[must_use]
    pub fn is_accessor(&self) -> bool {
        matches!(self.kind, DescriptorKind::Accessor { .. })
    }

    /// `Some(writable)` for data properties, `None` for accessors.
    #[must_use]
    pub fn writable(&self) -> Option<bool> {
        match self.kind {
            DescriptorKind::Data { writable, .. } => Some(writable),
            DescriptorKind::Accessor { .. } => None,
        }
    }
}

struct ObjectInner {
    properties: RefCell<IndexMap<String, Property>>,
    store: OnceCell<SlotStore>,
}

/// Shared handle to a host object. Clones refer to the same object.
#[derive(Clone)]
pub struct Object {
    inner: Rc<ObjectInner>,
}

/// Non-owning handle to an [`Object`].
#[derive(Clone)]
pub struct WeakObject {
    inner: Weak<ObjectInner>,
}

impl WeakObject {
    #[must_use]
    pub fn upgrade(&self) -> Option<Object> {
        self.inner.upgrade().map(|inner| Object { inner })
    }
}

impl fmt::Debug for WeakObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WeakObject")
    }
}

impl Default for Object {
    fn default() -> Self {
        Self::new()
    }
}

impl Object {
    /// Create an empty object.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(ObjectInner {
                properties: RefCell::new(IndexMap::new()),
                store: OnceCell::new(),
            }),
        }
    }

    #[must_use]
    pub fn downgrade(&self) -> WeakObject {
        WeakObject {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Whether both handles refer to the same object.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Read a property. Missing keys and accessors without a getter read as
    /// [`Value::Undefined`].
    #[must_use]
    pub fn get(&self, key: &str) -> Value {
        let getter = {
            let properties = self.inner.properties.borrow();
            match properties.get(key).map(|p| &p.kind) {
                None => return Value::Undefined,
                Some(PropertyKind::Data { value, .. }) => return value.clone(),
                Some(PropertyKind::Accessor { get, .. }) => get.clone(),
            }
        };
        getter.map_or(Value::Undefined, |get| get())
    }

    /// Assign a property. Returns `false` when the write was ignored.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> bool {
        let value = value.into();
        let setter = {
            let mut properties = self.inner.properties.borrow_mut();
            if !properties.contains_key(key) {
                properties.insert(key.to_owned(), Property::data(value));
                return true;
            }
            match properties.get_mut(key).map(|p| &mut p.kind) {
                None => None,
                Some(PropertyKind::Data {
                    value: slot,
                    writable: true,
                }) => {
                    *slot = value;
                    return true;
                }
                Some(PropertyKind::Data { writable: false, .. }) => None,
                Some(PropertyKind::Accessor { set, .. }) => set.clone(),
            }
        };
        match setter {
            Some(set) => {
                set(value);
                true
            }
            None => {
                tracing::trace!(message = "depprop.object.read_only_write", key);
                false
            }
        }
    }

    /// Define (or redefine) an own property.
    ///
    /// # Errors
    ///
    /// Returns [`PropertyError::NotConfigurable`] if `key` already holds a
    /// non-configurable property. The object is left unchanged.
    pub fn define_property(&self, key: &str, property: Property) -> Result<(), PropertyError> {
        // Keep the replaced property alive until the borrow is released: its
        // closures may own values whose drop touches this object.
        let _replaced = {
            let mut properties = self.inner.properties.borrow_mut();
            if properties.get(key).is_some_and(|p| !p.configurable) {
                return Err(PropertyError::NotConfigurable {
                    key: key.to_owned(),
                });
            }
            properties.insert(key.to_owned(), property)
        };
        Ok(())
    }

    /// Whether [`define_property`](Self::define_property) would succeed for `key`.
    #[must_use]
    pub fn can_define(&self, key: &str) -> bool {
        self.inner
            .properties
            .borrow()
            .get(key)
            .is_none_or(|p| p.configurable)
    }

    /// Remove a configurable own property. Returns `false` if the property is
    /// non-configurable; removing a missing key succeeds.
    pub fn delete(&self, key: &str) -> bool {
        let _removed = {
            let mut properties = self.inner.properties.borrow_mut();
            match properties.get(key) {
                None => return true,
                Some(p) if !p.configurable => return false,
                Some(_) => properties.shift_remove(key),
            }
        };
        true
    }

    #[must_use]
    pub fn has_own(&self, key: &str) -> bool {
        self.inner.properties.borrow().contains_key(key)
    }

    #[must_use]
    pub fn descriptor(&self, key: &str) -> Option<PropertyDescriptor> {
        self.inner
            .properties
            .borrow()
            .get(key)
            .map(Property::descriptor)
    }

    /// Enumerable own keys in insertion order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.inner
            .properties
            .borrow()
            .iter()
            .filter(|(_, p)| p.enumerable)
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// All own keys, enumerable or not, in insertion order.
    #[must_use]
    pub fn own_keys(&self) -> Vec<String> {
        self.inner.properties.borrow().keys().cloned().collect()
    }

    /// The hidden slot store, created on first use.
    pub(crate) fn slot_store(&self) -> &SlotStore {
        self.inner.store.get_or_init(SlotStore::default)
    }

    /// The hidden slot store, if one has been created.
    #[must_use]
    pub fn existing_slot_store(&self) -> Option<&SlotStore> {
        self.inner.store.get()
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Keys only: values may refer back to this object.
        let keys = match self.inner.properties.try_borrow() {
            Ok(properties) => properties.keys().cloned().collect::<Vec<_>>(),
            Err(_) => Vec::new(),
        };
        f.debug_struct("Object").field("keys", &keys).finish()
    }
}
