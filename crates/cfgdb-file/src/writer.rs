//! Atomic publication of a batch of files.
//!
//! Writing happens in two phases. Phase 1 writes every file's new content
//! into a temporary file in the target's directory. Phase 2 renames each
//! temporary file over its target. A failure in phase 1 leaves every target
//! untouched. A failure in phase 2 puts the previous content back into the
//! targets already replaced, or removes them if they were new. Readers of a
//! target always see either the old or the new content, never a partial
//! file.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::digest::Digest;
use crate::error::{FileError, FileResult};

/// What the writer expects to find on disk before replacing a file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Baseline {
    /// The file must not exist yet.
    Absent,
    /// The file must still have the digest observed when it was loaded.
    Digest(Digest),
    /// Overwrite whatever is there.
    Any,
}

#[derive(Debug)]
struct PendingWrite {
    path: PathBuf,
    bytes: Vec<u8>,
    baseline: Baseline,
}

/// A file that was published, with the digest of its new content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Published {
    pub path: PathBuf,
    pub digest: Digest,
}

/// Collects file contents and publishes them together.
#[derive(Debug)]
pub struct BatchWriter {
    sync: bool,
    check_baselines: bool,
    pending: Vec<PendingWrite>,
}

impl BatchWriter {
    /// `sync` flushes temporary files to stable storage before they are
    /// published. `check_baselines` refuses to replace files that changed
    /// on disk.
    pub fn new(sync: bool, check_baselines: bool) -> Self {
        Self {
            sync,
            check_baselines,
            pending: Vec::new(),
        }
    }

    pub fn add(&mut self, path: impl Into<PathBuf>, bytes: Vec<u8>, baseline: Baseline) {
        self.pending.push(PendingWrite {
            path: path.into(),
            bytes,
            baseline,
        });
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Check baselines, stage every file, then publish them all.
    pub fn commit(self) -> FileResult<Vec<Published>> {
        self.commit_with(|tmp, path| tmp.persist(path).map(drop).map_err(|e| e.error))
    }

    fn commit_with<F>(self, mut persist: F) -> FileResult<Vec<Published>>
    where
        F: FnMut(NamedTempFile, &Path) -> std::io::Result<()>,
    {
        let mut previous = Vec::with_capacity(self.pending.len());
        for write in &self.pending {
            previous.push(self.check_baseline(write)?);
        }

        let mut staged = Vec::with_capacity(self.pending.len());
        for write in &self.pending {
            let tmp = stage(&write.path, &write.bytes, self.sync)?;
            staged.push((tmp, write));
        }
        debug!(count = staged.len(), "batch staged");

        let mut published = Vec::with_capacity(staged.len());
        let mut replaced = Vec::with_capacity(staged.len());
        for ((tmp, write), before) in staged.into_iter().zip(previous) {
            if let Err(e) = persist(tmp, &write.path) {
                warn!(
                    path = %write.path.display(),
                    published = published.len(),
                    "publish failed part way through batch"
                );
                self.roll_back(replaced);
                return Err(FileError::io(&write.path, e));
            }
            replaced.push((write.path.as_path(), before));
            published.push(Published {
                path: write.path.clone(),
                digest: Digest::of(&write.bytes),
            });
        }
        if self.sync {
            sync_dirs(&published);
        }
        debug!(count = published.len(), "batch published");
        Ok(published)
    }

    /// Returns the current content of the target, `None` if it does not
    /// exist yet.
    fn check_baseline(&self, write: &PendingWrite) -> FileResult<Option<Vec<u8>>> {
        let current = match std::fs::read(&write.path) {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(FileError::io(&write.path, e)),
        };
        match (write.baseline, current.as_deref().map(Digest::of)) {
            (Baseline::Absent, Some(_)) => Err(FileError::AlreadyExists {
                path: write.path.clone(),
            }),
            (Baseline::Digest(expected), digest)
                if self.check_baselines && digest != Some(expected) =>
            {
                Err(FileError::Conflict {
                    path: write.path.clone(),
                })
            }
            _ => Ok(current),
        }
    }

    /// Put back the files a failed batch already replaced, newest first.
    fn roll_back(&self, replaced: Vec<(&Path, Option<Vec<u8>>)>) {
        for (path, before) in replaced.into_iter().rev() {
            let restored = match before {
                Some(bytes) => stage(path, &bytes, self.sync).and_then(|tmp| {
                    tmp.persist(path)
                        .map(drop)
                        .map_err(|e| FileError::io(path, e.error))
                }),
                None => std::fs::remove_file(path).map_err(|e| FileError::io(path, e)),
            };
            match restored {
                Ok(()) => debug!(path = %path.display(), "publish rolled back"),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "could not roll back published file")
                }
            }
        }
    }
}

/// Write `bytes` to a temporary file next to `target`.
fn stage(target: &Path, bytes: &[u8], sync: bool) -> FileResult<NamedTempFile> {
    let dir = match target.parent() {
        Some(d) if !d.as_os_str().is_empty() => d.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir).map_err(|e| FileError::io(&dir, e))?;
    let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| FileError::io(&dir, e))?;
    tmp.write_all(bytes).map_err(|e| FileError::io(target, e))?;
    if sync {
        tmp.as_file().sync_all().map_err(|e| FileError::io(target, e))?;
    }
    Ok(tmp)
}

/// Make the renames durable. Best effort: not every platform can open a
/// directory for syncing.
fn sync_dirs(published: &[Published]) {
    let mut dirs: Vec<&Path> = published.iter().filter_map(|p| p.path.parent()).collect();
    dirs.sort();
    dirs.dedup();
    for dir in dirs {
        if let Err(e) = std::fs::File::open(dir).and_then(|d| d.sync_all()) {
            debug!(dir = %dir.display(), error = %e, "directory sync skipped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publishes_all_files() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.json");
        let b = dir.path().join("sub/b.json");
        let mut w = BatchWriter::new(true, true);
        w.add(&a, b"A".to_vec(), Baseline::Absent);
        w.add(&b, b"B".to_vec(), Baseline::Any);
        assert_eq!(w.len(), 2);

        let published = w.commit().unwrap();
        assert_eq!(published.len(), 2);
        assert_eq!(std::fs::read(&a).unwrap(), b"A");
        assert_eq!(std::fs::read(&b).unwrap(), b"B");
        assert_eq!(published[0].digest, Digest::of(b"A"));
    }

    #[test]
    fn existing_file_with_absent_baseline_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.json");
        std::fs::write(&a, b"old").unwrap();
        let mut w = BatchWriter::new(false, true);
        w.add(&a, b"new".to_vec(), Baseline::Absent);
        assert!(matches!(w.commit(), Err(FileError::AlreadyExists { .. })));
        assert_eq!(std::fs::read(&a).unwrap(), b"old");
    }

    #[test]
    fn conflict_leaves_every_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.json");
        let b = dir.path().join("b.json");
        std::fs::write(&a, b"a0").unwrap();
        std::fs::write(&b, b"b0").unwrap();
        let seen_b = Digest::of(b"b0");
        std::fs::write(&b, b"changed elsewhere").unwrap();

        let mut w = BatchWriter::new(false, true);
        w.add(&a, b"a1".to_vec(), Baseline::Digest(Digest::of(b"a0")));
        w.add(&b, b"b1".to_vec(), Baseline::Digest(seen_b));
        assert!(matches!(w.commit(), Err(FileError::Conflict { .. })));
        assert_eq!(std::fs::read(&a).unwrap(), b"a0");
        assert_eq!(std::fs::read(&b).unwrap(), b"changed elsewhere");
    }

    #[test]
    fn conflict_check_can_be_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.json");
        std::fs::write(&a, b"changed").unwrap();
        let mut w = BatchWriter::new(false, false);
        w.add(&a, b"new".to_vec(), Baseline::Digest(Digest::of(b"original")));
        w.commit().unwrap();
        assert_eq!(std::fs::read(&a).unwrap(), b"new");
    }

    #[test]
    fn failed_publish_restores_earlier_files() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.json");
        let b = dir.path().join("b.json");
        let c = dir.path().join("c.json");
        std::fs::write(&a, b"a0").unwrap();
        std::fs::write(&c, b"c0").unwrap();

        let mut w = BatchWriter::new(false, true);
        w.add(&a, b"a1".to_vec(), Baseline::Digest(Digest::of(b"a0")));
        w.add(&b, b"b1".to_vec(), Baseline::Absent);
        w.add(&c, b"c1".to_vec(), Baseline::Any);

        let mut calls = 0;
        let err = w
            .commit_with(|tmp, path| {
                calls += 1;
                if calls == 3 {
                    return Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full"));
                }
                tmp.persist(path).map(drop).map_err(|e| e.error)
            })
            .unwrap_err();
        assert!(matches!(err, FileError::Io { ref path, .. } if path == &c));
        assert_eq!(std::fs::read(&a).unwrap(), b"a0");
        assert!(!b.exists());
        assert_eq!(std::fs::read(&c).unwrap(), b"c0");

        let mut names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        names.sort();
        assert_eq!(names, vec![std::ffi::OsString::from("a.json"), "c.json".into()]);
    }

    #[test]
    fn no_temp_files_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let mut w = BatchWriter::new(false, true);
        w.add(dir.path().join("a.json"), b"A".to_vec(), Baseline::Any);
        w.commit().unwrap();
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("a.json")]);
    }
}
