use std::path::PathBuf;

use cfgdb_changes::ChangeStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A data file written by a commit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrittenFile {
    pub path: PathBuf,
    /// BLAKE3 digest of the new content, hex encoded.
    pub digest: String,
}

/// Result of a commit.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CommitSummary {
    pub session: Uuid,
    pub comment: String,
    pub author: String,
    pub committed_at: DateTime<Utc>,
    /// The changes that were persisted.
    pub changes: ChangeStatus,
    pub files: Vec<WrittenFile>,
    /// Objects that went through the schema check.
    pub objects_checked: usize,
}

impl CommitSummary {
    /// Returns `true` if the commit had nothing to write.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}
