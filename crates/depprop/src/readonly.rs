#![forbid(unsafe_code)]

//! Read-only properties.
//!
//! A read-only property is enumerable, non-writable and non-configurable.
//! It carries either a fixed value or a getter recomputed on every access.
//! It has no slot and no reactivity.

use std::fmt;
use std::rc::Rc;

use crate::error::PropertyError;
use crate::object::{Getter, Object, Property};
use crate::value::Value;

/// Content of a read-only property.
#[derive(Clone)]
pub enum ReadOnly {
    Value(Value),
    Getter(Getter),
}

impl ReadOnly {
    #[must_use]
    pub fn value(value: impl Into<Value>) -> Self {
        Self::Value(value.into())
    }

    #[must_use]
    pub fn getter(f: impl Fn() -> Value + 'static) -> Self {
        Self::Getter(Rc::new(f))
    }
}

impl From<Value> for ReadOnly {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl fmt::Debug for ReadOnly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Self::Getter(_) => f.write_str("Getter(..)"),
        }
    }
}

/// Define `obj[name]` as a read-only property.
///
/// Writes through [`Object::set`] are ignored afterwards, and the property
/// cannot be redefined or deleted.
///
/// # Errors
///
/// [`PropertyError::NotConfigurable`] if `obj[name]` is already a
/// non-configurable property.
pub fn define_read_only(obj: &Object, name: &str, content: ReadOnly) -> Result<(), PropertyError> {
    let property = match content {
        ReadOnly::Value(value) => Property::data(value).writable(false),
        ReadOnly::Getter(get) => Property::accessor(Some(get), None),
    };
    obj.define_property(name, property.enumerable(true).configurable(false))
        .inspect_err(|err| tracing::warn!(message = "depprop.read_only_conflict", name, error = %err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn fixed_value_is_frozen() {
        let obj = Object::new();
        define_read_only(&obj, "version", ReadOnly::value("1.0")).expect("define");
        assert_eq!(obj.get("version"), Value::from("1.0"));

        assert!(!obj.set("version", "2.0"));
        assert_eq!(obj.get("version"), Value::from("1.0"));
        assert!(!obj.delete("version"));

        let d = obj.descriptor("version").expect("descriptor");
        assert!(d.enumerable && !d.configurable);
        assert_eq!(d.writable(), Some(false));
    }

    #[test]
    fn getter_recomputes_on_each_read() {
        let obj = Object::new();
        let ticks = Rc::new(Cell::new(0.0));
        let source = Rc::clone(&ticks);
        define_read_only(
            &obj,
            "now",
            ReadOnly::getter(move || {
                source.set(source.get() + 1.0);
                Value::from(source.get())
            }),
        )
        .expect("define");

        assert_eq!(obj.get("now"), Value::from(1.0));
        assert_eq!(obj.get("now"), Value::from(2.0));
        obj.set("now", 100);
        assert_eq!(obj.get("now"), Value::from(3.0));
        assert!(obj.descriptor("now").is_some_and(|d| d.is_accessor()));
    }

    #[test]
    fn redefinition_is_refused() {
        let obj = Object::new();
        define_read_only(&obj, "k", ReadOnly::value(1)).expect("first");
        let err = define_read_only(&obj, "k", ReadOnly::value(2)).expect_err("second");
        assert_eq!(err, PropertyError::NotConfigurable { key: "k".into() });
        assert_eq!(obj.get("k"), Value::from(1));
    }

    #[test]
    fn listed_in_keys() {
        let obj = Object::new();
        define_read_only(&obj, "a", Value::Null.into()).expect("define");
        assert_eq!(obj.keys(), vec!["a"]);
        assert!(format!("{:?}", ReadOnly::getter(|| Value::Null)).contains("Getter"));
    }
}
