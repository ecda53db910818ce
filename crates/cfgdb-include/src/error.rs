//! Error types for include operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during include operations.
#[derive(Debug, Error)]
pub enum IncludeError {
    /// The include is already declared by the file.
    #[error("{file} already includes {include}")]
    DuplicateInclude { file: PathBuf, include: String },

    /// The include is not declared by the file.
    #[error("{file} does not include {include}")]
    NotFound { file: PathBuf, include: String },

    /// A file cannot include itself.
    #[error("{file} cannot include itself")]
    SelfInclude { file: PathBuf },

    /// The file is not part of the graph.
    #[error("file not loaded: {0}")]
    UnknownFile(PathBuf),

    /// No file was given and the graph has no default file.
    #[error("no file given and no default file is set")]
    NoDefaultFile,

    /// The include path is syntactically unusable.
    #[error("invalid include path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    /// The include could not be located on disk.
    #[error("cannot resolve include {include} from {from}")]
    Unresolved { include: String, from: PathBuf },
}

/// Convenience type alias for include operations.
pub type Result<T> = std::result::Result<T, IncludeError>;
