#![forbid(unsafe_code)]

//! Equality policy for reactive writes.
//!
//! On every reactive write the slot compares the stored value with the new
//! one. When the pair is *considered equal* subscribers are left alone;
//! otherwise they are invalidated. The new value is stored either way.
//!
//! | mode      | considered equal                 |
//! |-----------|----------------------------------|
//! | `strict`  | [`Value::strict_equals`]         |
//! | `loose`   | [`Value::loose_equals`]          |
//! | `always`  | never (every write invalidates)  |
//! | custom    | the predicate returns `true`     |
//!
//! Modes can also be named by string (`"strict"`, `"loose"`, `"normal"`,
//! `"always"`). An unknown name resolves to a predicate that considers
//! everything equal, which disables invalidation for that slot.

use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use crate::error::DepPropError;
use crate::value::Value;

/// Custom equality predicate: `true` means "considered equal".
pub type EqualsFn = Rc<dyn Fn(&Value, &Value) -> bool>;

/// Equality mode requested in the installation options.
#[derive(Clone, Default)]
pub enum EqualityMode {
    #[default]
    Strict,
    Loose,
    Always,
    Custom(EqualsFn),
    /// A mode given by name that did not match a known mode.
    Unrecognized(String),
}

impl EqualityMode {
    /// Wrap a custom predicate.
    #[must_use]
    pub fn custom(f: impl Fn(&Value, &Value) -> bool + 'static) -> Self {
        Self::Custom(Rc::new(f))
    }

    /// Parse a mode name, keeping unknown names for install-time reporting.
    #[must_use]
    pub fn named(name: &str) -> Self {
        name.parse()
            .unwrap_or_else(|_| Self::Unrecognized(name.to_owned()))
    }

    /// Resolve to the predicate used on writes.
    ///
    /// # Errors
    ///
    /// [`DepPropError::UnknownEquality`] for an unrecognized name. Callers
    /// fall back to [`Predicate::AlwaysEqual`].
    pub fn resolve(&self) -> Result<Predicate, DepPropError> {
        Ok(match self {
            Self::Strict => Predicate::Strict,
            Self::Loose => Predicate::Loose,
            Self::Always => Predicate::NeverEqual,
            Self::Custom(f) => Predicate::Custom(Rc::clone(f)),
            Self::Unrecognized(mode) => {
                return Err(DepPropError::UnknownEquality { mode: mode.clone() });
            }
        })
    }
}

impl FromStr for EqualityMode {
    type Err = DepPropError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "strict" => Ok(Self::Strict),
            "loose" | "normal" => Ok(Self::Loose),
            "always" => Ok(Self::Always),
            other => Err(DepPropError::UnknownEquality {
                mode: other.to_owned(),
            }),
        }
    }
}

impl fmt::Debug for EqualityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strict => f.write_str("Strict"),
            Self::Loose => f.write_str("Loose"),
            Self::Always => f.write_str("Always"),
            Self::Custom(_) => f.write_str("Custom(..)"),
            Self::Unrecognized(mode) => write!(f, "Unrecognized({mode:?})"),
        }
    }
}

/// Resolved equality decision.
#[derive(Clone)]
pub enum Predicate {
    Strict,
    Loose,
    NeverEqual,
    /// Fallback for unrecognized modes: writes never invalidate.
    AlwaysEqual,
    Custom(EqualsFn),
}

impl Predicate {
    #[must_use]
    pub fn considered_equal(&self, old: &Value, new: &Value) -> bool {
        match self {
            Self::Strict => old.strict_equals(new),
            Self::Loose => old.loose_equals(new),
            Self::NeverEqual => false,
            Self::AlwaysEqual => true,
            Self::Custom(f) => f(old, new),
        }
    }

    #[must_use]
    pub fn should_invalidate(&self, old: &Value, new: &Value) -> bool {
        !self.considered_equal(old, new)
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strict => f.write_str("Strict"),
            Self::Loose => f.write_str("Loose"),
            Self::NeverEqual => f.write_str("NeverEqual"),
            Self::AlwaysEqual => f.write_str("AlwaysEqual"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}
