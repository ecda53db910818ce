//! Locating included files on disk.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{IncludeError, Result};

/// Turns a declared include path into the file it names.
pub trait IncludeResolver {
    /// Resolve `include` as declared by the file at `from`.
    fn resolve(&self, from: &Path, include: &str) -> Result<PathBuf>;
}

/// Resolves includes next to the including file first, then in each
/// directory of a search path, in order. Resolved paths are canonical.
#[derive(Clone, Debug, Default)]
pub struct SearchPathResolver {
    search_path: Vec<PathBuf>,
}

impl SearchPathResolver {
    pub fn new(search_path: Vec<PathBuf>) -> Self {
        Self { search_path }
    }

    pub fn search_path(&self) -> &[PathBuf] {
        &self.search_path
    }

    /// Locate a top-level file given on the command line or in an open
    /// spec: relative to the working directory, then the search path.
    pub fn locate(&self, path: &str) -> Result<PathBuf> {
        let candidate = Path::new(path);
        let dirs = std::iter::once(PathBuf::from(".")).chain(self.search_path.iter().cloned());
        first_existing(candidate, dirs).ok_or_else(|| IncludeError::Unresolved {
            include: path.to_string(),
            from: PathBuf::from("."),
        })
    }
}

impl IncludeResolver for SearchPathResolver {
    fn resolve(&self, from: &Path, include: &str) -> Result<PathBuf> {
        let candidate = Path::new(include);
        let dirs = from
            .parent()
            .map(Path::to_path_buf)
            .into_iter()
            .chain(self.search_path.iter().cloned());
        let resolved = first_existing(candidate, dirs).ok_or_else(|| IncludeError::Unresolved {
            include: include.to_string(),
            from: from.to_path_buf(),
        })?;
        debug!(include, resolved = %resolved.display(), "include resolved");
        Ok(resolved)
    }
}

fn first_existing(candidate: &Path, dirs: impl Iterator<Item = PathBuf>) -> Option<PathBuf> {
    if candidate.is_absolute() {
        return canonical_file(candidate);
    }
    dirs.filter_map(|dir| canonical_file(&dir.join(candidate))).next()
}

fn canonical_file(path: &Path) -> Option<PathBuf> {
    let path = std::fs::canonicalize(path).ok()?;
    path.is_file().then_some(path)
}
