//! In-memory object store for the configuration database.
//!
//! The store owns every loaded object. Objects reference each other by
//! identity ([`ObjectRef`](cfgdb_types::ObjectRef)), never by copy, so any
//! number of objects can share a target and a relation hop is a single
//! index lookup.
//!
//! # Key Types
//!
//! - [`ObjectStore`]: arena, `(class, id)` index, reverse-reference index
//! - [`StoredObject`]: identity, fields and owning data file of one object
//! - [`Handle`]: arena position of an object
//! - [`RelationWalk`]: iterator following one relation slot
//!
//! # Design Rules
//!
//! 1. Ids are unique per class across all loaded files.
//! 2. Removing an object that others still reference is refused.
//! 3. Traversals are iterative; graph depth never becomes stack depth.
//! 4. The store does not know about schemas; callers check fields first.

pub mod error;
pub mod object;
pub mod store;
pub mod traverse;

pub use error::{StoreError, StoreResult};
pub use object::{Handle, StoredObject};
pub use store::ObjectStore;
pub use traverse::RelationWalk;
