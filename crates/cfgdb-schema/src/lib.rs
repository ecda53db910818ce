//! Schema registry for the configuration database.
//!
//! Classes are read from JSON schema descriptors. A class declares typed
//! attributes and relation slots and may extend any number of other classes;
//! the registry resolves inheritance once per update and then answers
//! lookups and checks objects against the effective definitions.
//!
//! # Key Types
//!
//! - [`SchemaRegistry`]: the loaded classes, introspection and object checks
//! - [`SchemaDescriptor`]: one parsed schema file
//! - [`ClassDef`], [`AttributeDef`], [`RelationDef`]: class definitions
//! - [`ValidationReport`] / [`Violation`]: collected constraint violations
//!
//! # Quick Start
//!
//! ```rust
//! use cfgdb_schema::{ClassDef, RelationDef, SchemaDescriptor, SchemaRegistry};
//! use cfgdb_types::{Cardinality, ObjectRef};
//!
//! let schema = SchemaDescriptor::new().with_class(
//!     ClassDef::new("Second").with_relation(RelationDef::new(
//!         "Another",
//!         "Second",
//!         Cardinality::ZeroOrOne,
//!     )),
//! );
//! let mut registry = SchemaRegistry::new();
//! registry.extend([("test.schema.json".to_string(), schema)]).unwrap();
//!
//! let fields = registry.initial_fields("Second").unwrap();
//! assert!(registry
//!     .validate_object(&ObjectRef::new("Second", "a"), &fields)
//!     .is_ok());
//! ```

pub mod class;
pub mod descriptor;
mod domains;
pub mod error;
pub mod registry;
pub mod validation;

pub use class::{AttributeDef, ClassDef, RelationDef};
pub use descriptor::{SchemaDescriptor, SCHEMA_FORMAT};
pub use error::{SchemaError, SchemaResult};
pub use registry::SchemaRegistry;
pub use validation::{ValidationReport, Violation, ViolationKind};
