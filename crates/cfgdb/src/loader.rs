//! Reading a set of files and everything they include.
//!
//! Loading is split in two. [`read_closure`] reads and parses files without
//! touching the session; [`PendingLoad`] is then applied to the session in
//! one step, after every object in it has been checked. A load that fails
//! therefore never leaves a half-populated session behind.

use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};

use cfgdb_file::{read_file, Digest, FileContent, ObjectRecord};
use cfgdb_include::{IncludeResolver, SearchPathResolver};
use cfgdb_schema::SchemaDescriptor;
use tracing::debug;

use crate::error::ConfigResult;

/// Resolves includes next to the including file, then on the search path,
/// then relative to the working directory.
#[derive(Clone, Debug, Default)]
pub(crate) struct SessionResolver {
    inner: SearchPathResolver,
}

impl SessionResolver {
    pub(crate) fn new(search_path: Vec<PathBuf>) -> Self {
        Self {
            inner: SearchPathResolver::new(search_path),
        }
    }

    /// Locate a file named by the caller rather than by another file.
    pub(crate) fn locate(&self, path: &str) -> cfgdb_include::Result<PathBuf> {
        self.inner.locate(path)
    }
}

impl IncludeResolver for SessionResolver {
    fn resolve(&self, from: &Path, include: &str) -> cfgdb_include::Result<PathBuf> {
        self.inner
            .resolve(from, include)
            .or_else(|e| self.inner.locate(include).map_err(|_| e))
    }
}

/// A data file read from disk but not yet part of the session.
#[derive(Debug)]
pub(crate) struct PendingData {
    pub path: PathBuf,
    pub digest: Digest,
    pub includes: Vec<String>,
    pub objects: Vec<ObjectRecord>,
}

/// Everything read by one load.
#[derive(Debug, Default)]
pub(crate) struct PendingLoad {
    /// Schema descriptors keyed by canonical path.
    pub schemas: Vec<(String, SchemaDescriptor)>,
    pub data: Vec<PendingData>,
}

impl PendingLoad {
    pub(crate) fn object_count(&self) -> usize {
        self.data.iter().map(|d| d.objects.len()).sum()
    }
}

/// Source name under which a schema file is registered.
pub(crate) fn schema_source(path: &Path) -> String {
    path.display().to_string()
}

/// Read `roots` and every file they include, breadth first. Files for
/// which `skip` returns `true` are neither read nor followed. Every include
/// must resolve.
pub(crate) fn read_closure<R, F>(roots: &[PathBuf], resolver: &R, skip: F) -> ConfigResult<PendingLoad>
where
    R: IncludeResolver,
    F: Fn(&Path) -> bool,
{
    let mut pending = PendingLoad::default();
    let mut visited: HashSet<PathBuf> = HashSet::new();
    let mut queue: VecDeque<PathBuf> = VecDeque::new();

    for root in roots {
        if visited.insert(root.clone()) {
            queue.push_back(root.clone());
        }
    }

    while let Some(path) = queue.pop_front() {
        if skip(&path) {
            continue;
        }
        let loaded = read_file(&path)?;
        for include in loaded.includes() {
            let resolved = resolver.resolve(&path, include)?;
            if visited.insert(resolved.clone()) {
                queue.push_back(resolved);
            }
        }
        debug!(file = %path.display(), kind = ?loaded.kind(), "file read");
        match loaded.content {
            FileContent::Schema(descriptor) => {
                pending.schemas.push((schema_source(&path), descriptor));
            }
            FileContent::Data(data) => pending.data.push(PendingData {
                path,
                digest: loaded.digest,
                includes: data.includes,
                objects: data.objects,
            }),
        }
    }
    Ok(pending)
}

#[cfg(test)]
mod tests {
    use cfgdb_file::DataFile;
    use cfgdb_schema::ClassDef;

    use super::*;

    fn write_schema(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        let schema = SchemaDescriptor::new().with_class(ClassDef::new("Dummy"));
        std::fs::write(&path, schema.to_json_string().unwrap()).unwrap();
        std::fs::canonicalize(path).unwrap()
    }

    fn write_data(dir: &Path, name: &str, includes: &[&str]) -> PathBuf {
        let path = dir.join(name);
        let data = DataFile::new(includes.iter().map(|s| s.to_string()).collect());
        std::fs::write(&path, data.to_bytes().unwrap()).unwrap();
        std::fs::canonicalize(path).unwrap()
    }

    #[test]
    fn reads_schema_and_data_through_includes() {
        let dir = tempfile::tempdir().unwrap();
        write_schema(dir.path(), "t.schema.json");
        write_data(dir.path(), "b.data.json", &["t.schema.json"]);
        let a = write_data(dir.path(), "a.data.json", &["t.schema.json", "b.data.json"]);

        let resolver = SessionResolver::default();
        let pending = read_closure(&[a.clone()], &resolver, |_| false).unwrap();
        assert_eq!(pending.schemas.len(), 1);
        assert_eq!(pending.data.len(), 2);
        assert_eq!(pending.data[0].path, a);
        assert_eq!(pending.object_count(), 0);
    }

    #[test]
    fn include_cycles_read_each_file_once() {
        let dir = tempfile::tempdir().unwrap();
        write_data(dir.path(), "b.data.json", &["a.data.json"]);
        let a = write_data(dir.path(), "a.data.json", &["b.data.json"]);
        let pending = read_closure(&[a], &SessionResolver::default(), |_| false).unwrap();
        assert_eq!(pending.data.len(), 2);
    }

    #[test]
    fn skipped_files_are_not_followed() {
        let dir = tempfile::tempdir().unwrap();
        let schema = write_schema(dir.path(), "t.schema.json");
        let a = write_data(dir.path(), "a.data.json", &["t.schema.json"]);
        let pending = read_closure(&[a], &SessionResolver::default(), |p| p == schema).unwrap();
        assert!(pending.schemas.is_empty());
    }

    #[test]
    fn unresolved_include_fails() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_data(dir.path(), "a.data.json", &["missing.schema.json"]);
        let err = read_closure(&[a], &SessionResolver::default(), |_| false).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::NotFound);
    }

    #[test]
    fn search_path_is_consulted() {
        let dir = tempfile::tempdir().unwrap();
        let lib = dir.path().join("lib");
        std::fs::create_dir_all(&lib).unwrap();
        write_schema(&lib, "t.schema.json");
        let a = write_data(dir.path(), "a.data.json", &["t.schema.json"]);
        let resolver = SessionResolver::new(vec![lib]);
        let pending = read_closure(&[a], &resolver, |_| false).unwrap();
        assert_eq!(pending.schemas.len(), 1);
    }
}
