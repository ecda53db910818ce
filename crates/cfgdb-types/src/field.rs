use serde::{Deserialize, Serialize};

use crate::object::ObjectRef;
use crate::relation::Relation;
use crate::value::Value;

/// One named slot of an object: either an attribute value or a relation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Attribute(Value),
    Relation(Relation),
}

impl Field {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Attribute(v) => Some(v),
            Self::Relation(_) => None,
        }
    }

    pub fn as_relation(&self) -> Option<&Relation> {
        match self {
            Self::Relation(r) => Some(r),
            Self::Attribute(_) => None,
        }
    }

    /// The target of a single-valued relation, `None` when unset or when the
    /// field is not a single relation.
    pub fn as_object(&self) -> Option<&ObjectRef> {
        self.as_relation().and_then(Relation::as_single)
    }

    /// All relation targets; empty for attributes.
    pub fn as_objects(&self) -> &[ObjectRef] {
        self.as_relation().map(Relation::targets).unwrap_or(&[])
    }

    /// Returns `true` for an unset single relation or an empty multi relation.
    pub fn is_null(&self) -> bool {
        match self {
            Self::Relation(r) => r.is_empty(),
            Self::Attribute(_) => false,
        }
    }
}

impl From<Value> for Field {
    fn from(v: Value) -> Self {
        Self::Attribute(v)
    }
}

impl From<Relation> for Field {
    fn from(r: Relation) -> Self {
        Self::Relation(r)
    }
}
