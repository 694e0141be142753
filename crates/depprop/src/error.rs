use thiserror::Error;

pub type Result<T> = std::result::Result<T, DepPropError>;

/// Failure to define a property on a host object.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PropertyError {
    #[error("cannot redefine non-configurable property `{key}`")]
    NotConfigurable { key: String },
}

/// Anomalies reported by the installer.
///
/// None of these abort the caller: installation returns them so the caller
/// may inspect them, and they are also delivered to the diagnostics sink and
/// logged.
#[derive(Debug, Error)]
pub enum DepPropError {
    #[error("dependent property `{name}` is already installed on this object")]
    DuplicateSlot { name: String },

    #[error("unknown equality mode `{mode}`; invalidation disabled for this slot")]
    UnknownEquality { mode: String },

    #[error("namespace `{prefix}` is occupied by a non-object value")]
    NamespaceConflict { prefix: String },

    #[error(transparent)]
    Property(#[from] PropertyError),

    #[cfg(feature = "serde")]
    #[error("invalid options: {0}")]
    Options(#[from] serde_json::Error),
}

impl DepPropError {
    /// Stable short code, used as a log field.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::DuplicateSlot { .. } => "duplicate_slot",
            Self::UnknownEquality { .. } => "unknown_equality",
            Self::NamespaceConflict { .. } => "namespace_conflict",
            Self::Property(_) => "property_conflict",
            #[cfg(feature = "serde")]
            Self::Options(_) => "invalid_options",
        }
    }

    #[must_use]
    pub fn duplicate(name: impl Into<String>) -> Self {
        Self::DuplicateSlot { name: name.into() }
    }
}
