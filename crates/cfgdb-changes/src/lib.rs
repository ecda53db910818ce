//! Staged write-set for the configuration database.
//!
//! Tracks which objects changed since the last commit and which data files
//! must be rewritten, so that uncommitted work stays visible in memory while
//! the files on disk keep the committed state.
//!
//! # Key Types
//!
//! - [`ChangeSet`] -- Pending changes, keyed by object and by file
//! - [`ChangeKind`] -- Created/modified/destroyed/renamed
//! - [`FileFlags`] -- Why a data file is dirty
//! - [`ChangeStatus`] -- Report of pending changes

pub mod changeset;
pub mod status;

pub use changeset::{ChangeKind, ChangeSet, FileFlags};
pub use status::ChangeStatus;
