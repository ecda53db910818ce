use std::path::PathBuf;

use cfgdb_types::TypeError;
use thiserror::Error;

/// Errors produced by the schema registry.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("I/O error reading schema {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed schema {source_name}: {reason}")]
    Malformed { source_name: String, reason: String },

    #[error("class {name} defined twice (in {first} and {second})")]
    DuplicateClass {
        name: String,
        first: String,
        second: String,
    },

    #[error("class {class} extends unknown class {base}")]
    UnknownBaseClass { class: String, base: String },

    #[error("relation {class}.{relation} targets unknown class {target}")]
    UnknownRelationTarget {
        class: String,
        relation: String,
        target: String,
    },

    #[error("inheritance cycle through class {0}")]
    InheritanceCycle(String),

    #[error("unknown class: {0}")]
    UnknownClass(String),

    #[error("class {0} is abstract and cannot be instantiated")]
    AbstractClass(String),

    #[error("class {class} has no attribute or relation named {field}")]
    UnknownField { class: String, field: String },

    #[error("invalid value for {class}.{field}: {reason}")]
    InvalidValue {
        class: String,
        field: String,
        reason: String,
    },

    #[error("invalid value for {class}.{field}: {source}")]
    Type {
        class: String,
        field: String,
        #[source]
        source: TypeError,
    },
}

impl SchemaError {
    pub(crate) fn malformed(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_value(
        class: impl Into<String>,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            class: class.into(),
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` for errors raised while checking an object against the
    /// registry, as opposed to errors in the schema definitions themselves.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::AbstractClass(_)
                | Self::UnknownField { .. }
                | Self::InvalidValue { .. }
                | Self::Type { .. }
        )
    }
}

pub type SchemaResult<T> = Result<T, SchemaError>;
