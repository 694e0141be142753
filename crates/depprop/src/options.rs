#![forbid(unsafe_code)]

//! Installation options for dependent properties.
//!
//! [`DepOptions`] is a builder resolved against these defaults:
//!
//! | option         | default        |
//! |----------------|----------------|
//! | `enumerable`   | `true`         |
//! | `configurable` | `true`         |
//! | placement      | prepend        |
//! | `prefix`       | `"$"`          |
//! | `equals`       | strict         |
//! | `on_get`       | allow          |
//! | `on_set`       | allow          |
//!
//! With the `serde` feature, [`OptionsFile`] reads the data-only subset of
//! the options from JSON.

use std::fmt;
use std::rc::Rc;

use crate::equality::EqualityMode;
use crate::object::Object;
use crate::value::Value;

/// Prefix used when none (or an empty one) is given.
pub const DEFAULT_PREFIX: &str = "$";

/// Where the reactive accessor lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Placement {
    /// `obj[prefix + name]`.
    #[default]
    Prepend,
    /// `obj[prefix][name]`, on a shared namespace sub-object.
    Namespaced,
}

/// Arguments of the read interception hook.
pub struct GetContext<'a> {
    pub reactive: bool,
    pub value: &'a Value,
    pub object: &'a Object,
    pub name: &'a str,
    pub options: &'a DepOptions,
}

/// Arguments of the write interception hook.
pub struct SetContext<'a> {
    pub reactive: bool,
    pub old: &'a Value,
    pub new: &'a Value,
    pub object: &'a Object,
    pub name: &'a str,
    pub options: &'a DepOptions,
}

/// Read hook: `false` suppresses the read (and any subscription).
pub type GetHook = Rc<dyn Fn(&GetContext<'_>) -> bool>;
/// Write hook: `false` discards the write.
pub type SetHook = Rc<dyn Fn(&SetContext<'_>) -> bool>;

fn allow_any_get(_: &GetContext<'_>) -> bool {
    true
}

fn allow_any_set(_: &SetContext<'_>) -> bool {
    true
}

/// Options for [`DepProps::install`](crate::DepProps::install).
#[derive(Clone)]
pub struct DepOptions {
    enumerable: bool,
    configurable: bool,
    placement: Placement,
    prefix: String,
    equals: EqualityMode,
    on_get: GetHook,
    on_set: SetHook,
}

impl Default for DepOptions {
    fn default() -> Self {
        Self {
            enumerable: true,
            configurable: true,
            placement: Placement::Prepend,
            prefix: DEFAULT_PREFIX.to_owned(),
            equals: EqualityMode::Strict,
            on_get: Rc::new(allow_any_get),
            on_set: Rc::new(allow_any_set),
        }
    }
}

impl DepOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
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

    /// `false` moves the reactive accessor into the namespace sub-object.
    #[must_use]
    pub fn prepend(mut self, prepend: bool) -> Self {
        self.placement = if prepend {
            Placement::Prepend
        } else {
            Placement::Namespaced
        };
        self
    }

    /// `true` moves the reactive accessor into the namespace sub-object.
    #[must_use]
    pub fn namespaced(self, namespaced: bool) -> Self {
        self.prepend(!namespaced)
    }

    #[must_use]
    pub fn placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }

    /// Reactive-name prefix, or namespace key. Empty falls back to `"$"`.
    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.prefix = if prefix.is_empty() {
            DEFAULT_PREFIX.to_owned()
        } else {
            prefix
        };
        self
    }

    #[must_use]
    pub fn equals(mut self, equals: EqualityMode) -> Self {
        self.equals = equals;
        self
    }

    /// Select the equality mode by name. Unknown names are reported at
    /// install time.
    #[must_use]
    pub fn equals_named(self, name: &str) -> Self {
        self.equals(EqualityMode::named(name))
    }

    #[must_use]
    pub fn equals_fn(self, f: impl Fn(&Value, &Value) -> bool + 'static) -> Self {
        self.equals(EqualityMode::custom(f))
    }

    #[must_use]
    pub fn on_get(mut self, hook: impl Fn(&GetContext<'_>) -> bool + 'static) -> Self {
        self.on_get = Rc::new(hook);
        self
    }

    #[must_use]
    pub fn on_set(mut self, hook: impl Fn(&SetContext<'_>) -> bool + 'static) -> Self {
        self.on_set = Rc::new(hook);
        self
    }

    #[must_use]
    pub fn is_enumerable(&self) -> bool {
        self.enumerable
    }

    #[must_use]
    pub fn is_configurable(&self) -> bool {
        self.configurable
    }

    #[must_use]
    pub fn placement_mode(&self) -> Placement {
        self.placement
    }

    #[must_use]
    pub fn prefix_str(&self) -> &str {
        &self.prefix
    }

    #[must_use]
    pub fn equality(&self) -> &EqualityMode {
        &self.equals
    }

    /// Key of the reactive accessor on its target object.
    #[must_use]
    pub fn reactive_key(&self, name: &str) -> String {
        match self.placement {
            Placement::Prepend => format!("{}{name}", self.prefix),
            Placement::Namespaced => name.to_owned(),
        }
    }

    pub(crate) fn allow_get(&self, ctx: &GetContext<'_>) -> bool {
        (self.on_get)(ctx)
    }

    pub(crate) fn allow_set(&self, ctx: &SetContext<'_>) -> bool {
        (self.on_set)(ctx)
    }
}

impl fmt::Debug for DepOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DepOptions")
            .field("enumerable", &self.enumerable)
            .field("configurable", &self.configurable)
            .field("placement", &self.placement)
            .field("prefix", &self.prefix)
            .field("equals", &self.equals)
            .finish_non_exhaustive()
    }
}

/// Data-only options as read from a JSON document.
///
/// Hooks and custom predicates cannot be expressed in a file; they can be
/// added to the converted [`DepOptions`] with the builder.
#[cfg(feature = "serde")]
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OptionsFile {
    pub enumerable: Option<bool>,
    pub configurable: Option<bool>,
    pub prepend: Option<bool>,
    pub prefix: Option<String>,
    pub equals: Option<String>,
}

#[cfg(feature = "serde")]
impl OptionsFile {
    /// Parse options from JSON.
    ///
    /// # Errors
    ///
    /// [`DepPropError::Options`](crate::DepPropError::Options) on malformed
    /// JSON or unknown fields.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(feature = "serde")]
impl From<OptionsFile> for DepOptions {
    fn from(file: OptionsFile) -> Self {
        let mut options = Self::default();
        if let Some(enumerable) = file.enumerable {
            options = options.enumerable(enumerable);
        }
        if let Some(configurable) = file.configurable {
            options = options.configurable(configurable);
        }
        if let Some(prepend) = file.prepend {
            options = options.prepend(prepend);
        }
        if let Some(prefix) = file.prefix {
            options = options.prefix(prefix);
        }
        if let Some(equals) = file.equals {
            options = options.equals_named(&equals);
        }
        options
    }
}
