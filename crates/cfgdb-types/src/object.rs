use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Identity of a configuration object.
///
/// An object is identified by the pair `(class, id)`. The id is unique within
/// the class namespace across the whole composed database, not per file.
/// Relations hold `ObjectRef`s rather than the objects themselves, so a
/// reference is always a cheap identity that the object store resolves.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectRef {
    pub class: String,
    pub id: String,
}

impl ObjectRef {
    /// Create a reference from a class name and an object id.
    pub fn new(class: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            id: id.into(),
        }
    }

    /// The class name.
    pub fn class(&self) -> &str {
        &self.class
    }

    /// The object id (unique within the class).
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Full name in `id@class` form.
    pub fn full_name(&self) -> String {
        format!("{}@{}", self.id, self.class)
    }

    /// Parse a full name in `id@class` form.
    ///
    /// The split happens at the last `@`, so class names never contain one.
    pub fn parse_full_name(s: &str) -> Result<Self, TypeError> {
        let (id, class) = s
            .rsplit_once('@')
            .ok_or_else(|| TypeError::InvalidFullName(s.to_string()))?;
        if id.is_empty() || class.is_empty() {
            return Err(TypeError::InvalidFullName(s.to_string()));
        }
        Ok(Self::new(class, id))
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectRef({}@{})", self.id, self.class)
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.class)
    }
}

impl FromStr for ObjectRef {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_full_name(s)
    }
}

/// Validate an object id.
///
/// Ids must be non-empty, must not contain `@` (it separates id and class in
/// full names) and must not contain control characters.
pub fn validate_object_id(id: &str) -> Result<(), TypeError> {
    if id.is_empty() {
        return Err(TypeError::InvalidObjectId {
            id: id.to_string(),
            reason: "id must not be empty".into(),
        });
    }
    if id.contains('@') {
        return Err(TypeError::InvalidObjectId {
            id: id.to_string(),
            reason: "id must not contain '@'".into(),
        });
    }
    if id.chars().any(char::is_control) {
        return Err(TypeError::InvalidObjectId {
            id: id.to_string(),
            reason: "id must not contain control characters".into(),
        });
    }
    Ok(())
}
