//! Pending change report.

use std::path::PathBuf;

use cfgdb_types::ObjectRef;
use serde::{Deserialize, Serialize};

/// Uncommitted changes of a session.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeStatus {
    /// Objects created since the last commit or load.
    pub created: Vec<ObjectRef>,
    /// Existing objects whose fields changed.
    pub modified: Vec<ObjectRef>,
    /// Objects destroyed.
    pub destroyed: Vec<ObjectRef>,
    /// Objects renamed, as `(old, new)`.
    pub renamed: Vec<(ObjectRef, ObjectRef)>,
    /// Data files that will be rewritten on commit.
    pub dirty_files: Vec<PathBuf>,
}

impl ChangeStatus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if there is nothing to commit.
    pub fn is_clean(&self) -> bool {
        self.total_entries() == 0 && self.dirty_files.is_empty()
    }

    /// Number of object changes across all categories.
    pub fn total_entries(&self) -> usize {
        self.created.len() + self.modified.len() + self.destroyed.len() + self.renamed.len()
    }
}
