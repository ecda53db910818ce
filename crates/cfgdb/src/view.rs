//! Borrowed access to one object of a session.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Index;
use std::path::Path;

use cfgdb_store::StoredObject;
use cfgdb_types::{Field, ObjectRef, Relation, Value};

use crate::error::ConfigResult;
use crate::session::Session;

/// Read-only view of a loaded object.
#[derive(Clone, Copy)]
pub struct ObjectView<'a> {
    object: &'a StoredObject,
}

impl<'a> ObjectView<'a> {
    pub(crate) fn new(object: &'a StoredObject) -> Self {
        Self { object }
    }

    pub fn oref(&self) -> &'a ObjectRef {
        self.object.oref()
    }

    pub fn class(&self) -> &'a str {
        self.object.class()
    }

    pub fn id(&self) -> &'a str {
        self.object.id()
    }

    /// `id@class`.
    pub fn full_name(&self) -> String {
        self.object.oref().full_name()
    }

    /// The data file this object is stored in.
    pub fn contained_in(&self) -> &'a Path {
        self.object.file()
    }

    pub fn fields(&self) -> &'a BTreeMap<String, Field> {
        self.object.fields()
    }

    pub fn get(&self, name: &str) -> Option<&'a Field> {
        self.object.field(name)
    }

    /// Attribute value of `name`.
    pub fn value(&self, name: &str) -> Option<&'a Value> {
        self.get(name).and_then(Field::as_value)
    }

    /// Target of a single-valued relation.
    pub fn object(&self, name: &str) -> Option<&'a ObjectRef> {
        self.get(name).and_then(Field::as_object)
    }

    /// Targets of a relation; empty for unknown names and attributes.
    pub fn objects(&self, name: &str) -> &'a [ObjectRef] {
        self.get(name).map_or(&[][..], Field::as_objects)
    }
}

/// Panics if the object has no field `name`, like map indexing.
impl Index<&str> for ObjectView<'_> {
    type Output = Field;

    fn index(&self, name: &str) -> &Field {
        match self.object.field(name) {
            Some(field) => field,
            None => panic!("object {} has no field {name}", self.object.oref()),
        }
    }
}

impl fmt::Debug for ObjectView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectView")
            .field("object", self.object.oref())
            .field("file", &self.object.file())
            .finish()
    }
}

impl fmt::Display for ObjectView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.object.oref(), f)
    }
}

/// Mutable handle on a loaded object.
///
/// Every assignment is checked against the schema before it is applied:
/// unknown fields and values of the wrong type are refused. Cardinality,
/// not-null rules and dangling targets are checked at commit.
pub struct ObjectMut<'a> {
    session: &'a mut Session,
    oref: ObjectRef,
}

impl<'a> ObjectMut<'a> {
    pub(crate) fn new(session: &'a mut Session, oref: ObjectRef) -> Self {
        Self { session, oref }
    }

    pub fn oref(&self) -> &ObjectRef {
        &self.oref
    }

    /// Give up the borrow of the session, keeping the identity.
    pub fn into_ref(self) -> ObjectRef {
        self.oref
    }

    /// Read-only view of the current state.
    pub fn view(&self) -> ConfigResult<ObjectView<'_>> {
        Ok(ObjectView::new(self.session.store().get(&self.oref)?))
    }

    pub fn get(&self, name: &str) -> Option<&Field> {
        self.session.store().get(&self.oref).ok()?.field(name)
    }

    /// Assign any field.
    pub fn set(&mut self, name: &str, field: impl Into<Field>) -> ConfigResult<&mut Self> {
        self.session.set_field(&self.oref, name, field.into())?;
        Ok(self)
    }

    /// Assign an attribute.
    pub fn set_value(&mut self, name: &str, value: impl Into<Value>) -> ConfigResult<&mut Self> {
        self.set(name, Field::Attribute(value.into()))
    }

    /// Assign a single-valued relation; `None` clears it.
    pub fn set_obj(&mut self, name: &str, target: Option<&ObjectRef>) -> ConfigResult<&mut Self> {
        self.set(name, Relation::Single(target.cloned()))
    }

    /// Assign a multi-valued relation.
    pub fn set_objs(&mut self, name: &str, targets: &[ObjectRef]) -> ConfigResult<&mut Self> {
        self.set(name, Relation::Multi(targets.to_vec()))
    }
}

impl fmt::Debug for ObjectMut<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectMut").field("object", &self.oref).finish()
    }
}
