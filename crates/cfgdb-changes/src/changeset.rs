//! The staged write-set.
//!
//! Mutations are applied to the in-memory object store right away; the
//! change set only records what differs from the last committed state so
//! that commit knows which objects to check and which files to rewrite.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use cfgdb_types::ObjectRef;
use tracing::debug;

use crate::status::ChangeStatus;

/// What happened to one object since the last commit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Destroyed,
    /// The object now carries this identity; it was known as `from`.
    Renamed { from: ObjectRef },
}

/// Flags of a data file with pending changes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FileFlags {
    /// The file does not exist on disk yet.
    pub new_file: bool,
    /// Objects stored in the file changed.
    pub objects_changed: bool,
    /// The include list changed.
    pub includes_changed: bool,
}

/// Pending changes of a session, keyed by object identity and by file.
#[derive(Clone, Debug, Default)]
pub struct ChangeSet {
    objects: BTreeMap<ObjectRef, ChangeKind>,
    files: BTreeMap<PathBuf, FileFlags>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if nothing needs to be written.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty() && self.files.is_empty()
    }

    pub fn clear(&mut self) {
        self.objects.clear();
        self.files.clear();
    }

    /// Pending change of one object.
    pub fn get(&self, oref: &ObjectRef) -> Option<&ChangeKind> {
        self.objects.get(oref)
    }

    // ---------------------------------------------------------------
    // Recording
    // ---------------------------------------------------------------

    /// A data file that must be written even if no object in it changes.
    pub fn record_new_file(&mut self, file: &Path) {
        self.files.entry(file.to_path_buf()).or_default().new_file = true;
    }

    pub fn record_includes_changed(&mut self, file: &Path) {
        self.files.entry(file.to_path_buf()).or_default().includes_changed = true;
    }

    pub fn record_created(&mut self, oref: &ObjectRef, file: &Path) {
        let kind = match self.objects.remove(oref) {
            // Destroyed and created again within one transaction.
            Some(ChangeKind::Destroyed) => ChangeKind::Modified,
            _ => ChangeKind::Created,
        };
        debug!(object = %oref, ?kind, "change recorded");
        self.objects.insert(oref.clone(), kind);
        self.touch(file);
    }

    pub fn record_modified(&mut self, oref: &ObjectRef, file: &Path) {
        self.objects
            .entry(oref.clone())
            .or_insert(ChangeKind::Modified);
        self.touch(file);
    }

    pub fn record_destroyed(&mut self, oref: &ObjectRef, file: &Path) {
        match self.objects.remove(oref) {
            Some(ChangeKind::Created) => {}
            Some(ChangeKind::Renamed { from }) => {
                self.objects.insert(from, ChangeKind::Destroyed);
            }
            _ => {
                self.objects.insert(oref.clone(), ChangeKind::Destroyed);
            }
        }
        self.touch(file);
    }

    pub fn record_renamed(&mut self, from: &ObjectRef, to: &ObjectRef, file: &Path) {
        let kind = match self.objects.remove(from) {
            Some(ChangeKind::Created) => ChangeKind::Created,
            Some(ChangeKind::Renamed { from: original }) if original == *to => ChangeKind::Modified,
            Some(ChangeKind::Renamed { from: original }) => ChangeKind::Renamed { from: original },
            _ => ChangeKind::Renamed { from: from.clone() },
        };
        self.objects.insert(to.clone(), kind);
        self.touch(file);
    }

    /// An object was moved to another file: both files are rewritten.
    pub fn record_moved(&mut self, oref: &ObjectRef, from_file: &Path, to_file: &Path) {
        self.record_modified(oref, to_file);
        self.touch(from_file);
    }

    fn touch(&mut self, file: &Path) {
        self.files.entry(file.to_path_buf()).or_default().objects_changed = true;
    }

    // ---------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------

    /// Files to rewrite on commit, sorted.
    pub fn dirty_files(&self) -> impl Iterator<Item = (&Path, &FileFlags)> {
        self.files.iter().map(|(p, f)| (p.as_path(), f))
    }

    pub fn is_file_dirty(&self, file: &Path) -> bool {
        self.files.contains_key(file)
    }

    /// Forget a file, e.g. when it is no longer part of the session.
    pub fn forget_file(&mut self, file: &Path) -> Option<FileFlags> {
        self.files.remove(file)
    }

    /// Identities that exist now and changed: created, modified or renamed.
    pub fn live_changes(&self) -> impl Iterator<Item = &ObjectRef> {
        self.objects
            .iter()
            .filter(|(_, kind)| !matches!(kind, ChangeKind::Destroyed))
            .map(|(oref, _)| oref)
    }

    /// Report of all pending changes.
    pub fn status(&self) -> ChangeStatus {
        let mut status = ChangeStatus::new();
        for (oref, kind) in &self.objects {
            match kind {
                ChangeKind::Created => status.created.push(oref.clone()),
                ChangeKind::Modified => status.modified.push(oref.clone()),
                ChangeKind::Destroyed => status.destroyed.push(oref.clone()),
                ChangeKind::Renamed { from } => status.renamed.push((from.clone(), oref.clone())),
            }
        }
        status.dirty_files = self.files.keys().cloned().collect();
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(id: &str) -> ObjectRef {
        ObjectRef::new("Dummy", id)
    }

    fn f() -> PathBuf {
        PathBuf::from("/db/test.data.json")
    }

    // ---- Basic recording ----

    #[test]
    fn new_changeset_is_empty() {
        let cs = ChangeSet::new();
        assert!(cs.is_empty());
        assert!(cs.status().is_clean());
    }

    #[test]
    fn create_marks_file_dirty() {
        let mut cs = ChangeSet::new();
        cs.record_created(&r("a"), &f());
        assert_eq!(cs.get(&r("a")), Some(&ChangeKind::Created));
        assert!(cs.is_file_dirty(&f()));
        let (path, flags) = cs.dirty_files().next().unwrap();
        assert_eq!(path, f().as_path());
        assert!(flags.objects_changed);
        assert!(!flags.includes_changed);
    }

    #[test]
    fn modify_after_create_stays_created() {
        let mut cs = ChangeSet::new();
        cs.record_created(&r("a"), &f());
        cs.record_modified(&r("a"), &f());
        assert_eq!(cs.get(&r("a")), Some(&ChangeKind::Created));
    }

    #[test]
    fn destroy_after_create_cancels() {
        let mut cs = ChangeSet::new();
        cs.record_created(&r("a"), &f());
        cs.record_destroyed(&r("a"), &f());
        assert!(cs.get(&r("a")).is_none());
        // The file still gets rewritten; that is harmless.
        assert!(cs.is_file_dirty(&f()));
    }

    #[test]
    fn recreate_after_destroy_is_modification() {
        let mut cs = ChangeSet::new();
        cs.record_destroyed(&r("a"), &f());
        cs.record_created(&r("a"), &f());
        assert_eq!(cs.get(&r("a")), Some(&ChangeKind::Modified));
    }

    // ---- Renames ----

    #[test]
    fn rename_of_committed_object() {
        let mut cs = ChangeSet::new();
        cs.record_renamed(&r("a"), &r("b"), &f());
        assert_eq!(cs.get(&r("b")), Some(&ChangeKind::Renamed { from: r("a") }));
        assert_eq!(cs.status().renamed, vec![(r("a"), r("b"))]);
    }

    #[test]
    fn rename_of_new_object_stays_created() {
        let mut cs = ChangeSet::new();
        cs.record_created(&r("a"), &f());
        cs.record_renamed(&r("a"), &r("b"), &f());
        assert!(cs.get(&r("a")).is_none());
        assert_eq!(cs.get(&r("b")), Some(&ChangeKind::Created));
    }

    #[test]
    fn rename_back_and_forth() {
        let mut cs = ChangeSet::new();
        cs.record_renamed(&r("a"), &r("b"), &f());
        cs.record_renamed(&r("b"), &r("c"), &f());
        assert_eq!(cs.get(&r("c")), Some(&ChangeKind::Renamed { from: r("a") }));
        cs.record_renamed(&r("c"), &r("a"), &f());
        assert_eq!(cs.get(&r("a")), Some(&ChangeKind::Modified));
    }

    #[test]
    fn destroy_renamed_destroys_original() {
        let mut cs = ChangeSet::new();
        cs.record_renamed(&r("a"), &r("b"), &f());
        cs.record_destroyed(&r("b"), &f());
        assert_eq!(cs.get(&r("a")), Some(&ChangeKind::Destroyed));
        assert!(cs.get(&r("b")).is_none());
    }

    // ---- Files and status ----

    #[test]
    fn include_and_new_file_flags() {
        let mut cs = ChangeSet::new();
        cs.record_new_file(&f());
        cs.record_includes_changed(&f());
        let (_, flags) = cs.dirty_files().next().unwrap();
        assert!(flags.new_file && flags.includes_changed && !flags.objects_changed);
        assert!(cs.forget_file(&f()).is_some());
        assert!(cs.is_empty());
    }

    #[test]
    fn moved_object_dirties_both_files() {
        let mut cs = ChangeSet::new();
        let other = PathBuf::from("/db/other.data.json");
        cs.record_moved(&r("a"), &f(), &other);
        assert!(cs.is_file_dirty(&f()));
        assert!(cs.is_file_dirty(&other));
    }

    #[test]
    fn status_and_live_changes() {
        let mut cs = ChangeSet::new();
        cs.record_created(&r("new"), &f());
        cs.record_modified(&r("mod"), &f());
        cs.record_destroyed(&r("gone"), &f());
        let status = cs.status();
        assert_eq!(status.created, vec![r("new")]);
        assert_eq!(status.modified, vec![r("mod")]);
        assert_eq!(status.destroyed, vec![r("gone")]);
        assert_eq!(status.dirty_files, vec![f()]);
        assert_eq!(status.total_entries(), 3);

        let live: Vec<_> = cs.live_changes().cloned().collect();
        assert_eq!(live, vec![r("mod"), r("new")]);

        cs.clear();
        assert!(cs.is_empty());
    }
}
