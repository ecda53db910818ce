//! Include graph for the configuration database.
//!
//! A database is composed of data files that include schema files and other
//! data files. This crate keeps the ordered include list of every loaded
//! data file and knows how to find an included file on disk.
//!
//! # Modules
//!
//! - [`error`]: Error types for include operations
//! - [`graph`]: [`IncludeGraph`]: per-file include lists and reachability
//! - [`resolve`]: The [`IncludeResolver`] trait and [`SearchPathResolver`]
//! - [`names`]: Include path validation
//!
//! Cycles between files are not rejected here beyond refusing a direct
//! self-include. Traversals keep a visited set, so a cycle only means the
//! files are loaded once.

pub mod error;
pub mod graph;
pub mod names;
pub mod resolve;

pub use error::{IncludeError, Result};
pub use graph::IncludeGraph;
pub use names::validate_include_path;
pub use resolve::{IncludeResolver, SearchPathResolver};
