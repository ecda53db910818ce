//! The include graph of a session.
//!
//! Each loaded data file owns an ordered list of include paths, kept exactly
//! as declared: no deduplication beyond refusing a duplicate add, no
//! reordering. Edits are visible immediately and are persisted only when the
//! owning file is written back.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{IncludeError, Result};
use crate::names::validate_include_path;
use crate::resolve::IncludeResolver;

/// Ordered include lists of all loaded data files.
#[derive(Clone, Debug, Default)]
pub struct IncludeGraph {
    /// Files in registration order.
    order: Vec<PathBuf>,
    includes: HashMap<PathBuf, Vec<String>>,
    /// File used when an operation names none: the last file touched.
    primary: Option<PathBuf>,
}

impl IncludeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file with its declared includes. The first registered file
    /// becomes the default file. Returns `false` if the file was already
    /// registered, in which case nothing changes.
    pub fn register(&mut self, file: PathBuf, includes: Vec<String>) -> bool {
        if self.includes.contains_key(&file) {
            return false;
        }
        if self.primary.is_none() {
            self.primary = Some(file.clone());
        }
        self.order.push(file.clone());
        self.includes.insert(file, includes);
        true
    }

    /// Drop a file from the graph, returning its include list.
    pub fn unregister(&mut self, file: &Path) -> Option<Vec<String>> {
        let includes = self.includes.remove(file)?;
        self.order.retain(|f| f != file);
        if self.primary.as_deref() == Some(file) {
            self.primary = self.order.first().cloned();
        }
        Some(includes)
    }

    pub fn contains(&self, file: &Path) -> bool {
        self.includes.contains_key(file)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Registered files, in registration order.
    pub fn files(&self) -> impl Iterator<Item = &Path> {
        self.order.iter().map(PathBuf::as_path)
    }

    /// The default file.
    pub fn primary(&self) -> Option<&Path> {
        self.primary.as_deref()
    }

    pub fn set_primary(&mut self, file: &Path) -> Result<()> {
        if !self.contains(file) {
            return Err(IncludeError::UnknownFile(file.to_path_buf()));
        }
        self.primary = Some(file.to_path_buf());
        Ok(())
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.includes.clear();
        self.primary = None;
    }

    /// The file an operation applies to: the given one, or the default.
    pub fn target(&self, file: Option<&Path>) -> Result<PathBuf> {
        let file = match file {
            Some(f) => f,
            None => self.primary.as_deref().ok_or(IncludeError::NoDefaultFile)?,
        };
        if !self.contains(file) {
            return Err(IncludeError::UnknownFile(file.to_path_buf()));
        }
        Ok(file.to_path_buf())
    }

    /// Current include list of a file, including uncommitted edits.
    pub fn get_includes(&self, file: Option<&Path>) -> Result<&[String]> {
        let file = self.target(file)?;
        Ok(self.includes.get(&file).map(Vec::as_slice).unwrap_or(&[]))
    }

    /// Append an include to a file's list. Returns the file that changed.
    pub fn add_include(&mut self, file: Option<&Path>, include: &str) -> Result<PathBuf> {
        validate_include_path(include)?;
        let file = self.target(file)?;
        if names_file(&file, include) {
            return Err(IncludeError::SelfInclude { file });
        }
        let list = self.includes.entry(file.clone()).or_default();
        if list.iter().any(|i| i == include) {
            return Err(IncludeError::DuplicateInclude {
                file,
                include: include.to_string(),
            });
        }
        list.push(include.to_string());
        debug!(file = %file.display(), include, "include added");
        self.primary = Some(file.clone());
        Ok(file)
    }

    /// Remove an include from a file's list by value. Returns the file that
    /// changed.
    pub fn remove_include(&mut self, file: Option<&Path>, include: &str) -> Result<PathBuf> {
        let file = self.target(file)?;
        let list = self.includes.entry(file.clone()).or_default();
        let Some(pos) = list.iter().position(|i| i == include) else {
            return Err(IncludeError::NotFound {
                file,
                include: include.to_string(),
            });
        };
        list.remove(pos);
        debug!(file = %file.display(), include, "include removed");
        self.primary = Some(file.clone());
        Ok(file)
    }

    /// Every file reachable from `roots` through includes, roots first, in
    /// breadth-first order.
    ///
    /// Includes of files that are not registered are not followed, and
    /// includes that fail to resolve are skipped. Cycles are harmless.
    pub fn closure<R: IncludeResolver>(&self, roots: &[PathBuf], resolver: &R) -> Vec<PathBuf> {
        let mut visited: HashSet<PathBuf> = HashSet::new();
        let mut queue: VecDeque<PathBuf> = VecDeque::new();
        let mut out = Vec::new();

        for root in roots {
            if visited.insert(root.clone()) {
                queue.push_back(root.clone());
            }
        }

        while let Some(file) = queue.pop_front() {
            if let Some(includes) = self.includes.get(&file) {
                for include in includes {
                    match resolver.resolve(&file, include) {
                        Ok(path) => {
                            if visited.insert(path.clone()) {
                                queue.push_back(path);
                            }
                        }
                        Err(e) => debug!(error = %e, "skipping unresolved include"),
                    }
                }
            }
            out.push(file);
        }
        out
    }
}

/// Lexical check whether `include`, declared in `file`, names `file` itself.
fn names_file(file: &Path, include: &str) -> bool {
    let include = Path::new(include);
    if include.is_absolute() {
        return include == file;
    }
    file.parent().is_some_and(|dir| dir.join(include) == file)
}
