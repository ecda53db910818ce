//! On-disk formats for the configuration database.
//!
//! Schema files and data files are JSON documents told apart by their
//! `format` field. Every file read is digested so that a later commit can
//! notice when someone else changed it in between. Writes go through a
//! [`BatchWriter`], which publishes a whole commit with temp-file renames.
//!
//! # Key Types
//!
//! - [`DataFile`] / [`ObjectRecord`]: data file layout
//! - [`LoadedFile`]: a parsed file together with its [`Digest`]
//! - [`BatchWriter`]: two-phase atomic writer with conflict detection
//! - [`FileError`]: error type of this crate

pub mod data;
pub mod digest;
pub mod error;
pub mod reader;
pub mod writer;

pub use data::{is_verbatim_comment, DataFile, ObjectRecord, DATA_FORMAT, DATA_VERSION};
pub use digest::Digest;
pub use error::{FileError, FileResult};
pub use reader::{read_file, FileContent, FileKind, LoadedFile};
pub use writer::{Baseline, BatchWriter, Published};
