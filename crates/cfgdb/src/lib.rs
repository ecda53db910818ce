//! Schema-driven configuration database.
//!
//! A database is a data file holding typed objects, plus the schema files
//! and other data files it includes. [`Configuration`] is the handle over
//! one database: it loads the include closure into memory, applies
//! mutations there, and writes every changed data file atomically on
//! commit.
//!
//! # Key Types
//!
//! - [`Configuration`]: database handle: lifecycle, includes, objects
//! - [`ObjectView`] / [`ObjectMut`]: read and write access to one object
//! - [`DbConfig`]: search path, author and commit settings
//! - [`CommitSummary`]: what a commit wrote
//! - [`ConfigError`] / [`ErrorKind`]: errors and their categories
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use cfgdb::Configuration;
//!
//! # fn main() -> cfgdb::ConfigResult<()> {
//! let mut db = Configuration::open("jsonfile")?;
//! db.create_db("test.data.json", &["test.schema.json"])?;
//!
//! let first = db.create_obj("Second", "first")?.into_ref();
//! db.create_obj("Second", "second")?
//!     .set_obj("Another", Some(&first))?;
//! db.commit("initial objects")?;
//!
//! assert_eq!(db.get_objs("Second")?.len(), 2);
//! # Ok(())
//! # }
//! ```

pub mod check;
pub mod commit;
pub mod config;
pub mod db;
pub mod error;
mod loader;
mod session;
pub mod spec;
pub mod view;

pub use check::{CheckContext, CommitCheck, ReferenceCheck, SchemaCheck, Validator};
pub use commit::{CommitSummary, WrittenFile};
pub use config::DbConfig;
pub use db::Configuration;
pub use error::{ConfigError, ConfigResult, ErrorKind};
pub use spec::{DbSpec, JSON_BACKEND};
pub use view::{ObjectMut, ObjectView};

// Re-export key types
pub use cfgdb_changes::ChangeStatus;
pub use cfgdb_store::ObjectStore;
pub use cfgdb_schema::{
    AttributeDef, ClassDef, RelationDef, SchemaDescriptor, SchemaRegistry, ValidationReport,
    Violation, ViolationKind,
};
pub use cfgdb_types::{AttrType, Cardinality, Field, ObjectRef, Relation, Value};
