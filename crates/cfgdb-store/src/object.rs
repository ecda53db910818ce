use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use cfgdb_types::{Field, ObjectRef};

/// Position of an object in the store arena.
///
/// Handles stay valid until the object is removed; a removed slot may be
/// reused by a later insert.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(pub(crate) usize);

impl Handle {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// An object as held by the store: identity, every schema slot, and the
/// data file it belongs to.
#[derive(Clone, Debug, PartialEq)]
pub struct StoredObject {
    pub(crate) oref: ObjectRef,
    pub(crate) fields: BTreeMap<String, Field>,
    pub(crate) file: PathBuf,
}

impl StoredObject {
    pub fn new(oref: ObjectRef, fields: BTreeMap<String, Field>, file: PathBuf) -> Self {
        Self { oref, fields, file }
    }

    pub fn oref(&self) -> &ObjectRef {
        &self.oref
    }

    pub fn class(&self) -> &str {
        self.oref.class()
    }

    pub fn id(&self) -> &str {
        self.oref.id()
    }

    /// The data file this object is stored in.
    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn fields(&self) -> &BTreeMap<String, Field> {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    /// Every `(slot, target)` pair of this object's relations.
    pub fn outgoing(&self) -> impl Iterator<Item = (&str, &ObjectRef)> {
        self.fields.iter().flat_map(|(name, field)| {
            field
                .as_objects()
                .iter()
                .map(move |target| (name.as_str(), target))
        })
    }
}
