//! Foundation types for the configuration database.
//!
//! Every other `cfgdb` crate depends on `cfgdb-types`. Nothing here knows
//! about schemas, files or sessions: these are the plain values that flow
//! between them.
//!
//! # Key Types
//!
//! - [`ObjectRef`]: identity of an object: `(class, id)`, printed as `id@class`
//! - [`Value`]: attribute value (scalar or list)
//! - [`AttrType`]: primitive attribute type with coercion and range checks
//! - [`Relation`]: relation slot content: single or multi-valued references
//! - [`Cardinality`]: relation cardinality constraint
//! - [`Field`]: one named slot of an object (attribute or relation)

pub mod error;
pub mod field;
pub mod object;
pub mod relation;
pub mod value;

pub use error::TypeError;
pub use field::Field;
pub use object::{validate_object_id, ObjectRef};
pub use relation::{Cardinality, Relation};
pub use value::{AttrType, Value};
