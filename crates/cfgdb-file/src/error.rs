use std::path::PathBuf;

use cfgdb_schema::SchemaError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FileError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("{path}: unknown file format {format:?}")]
    UnknownFormat { path: PathBuf, format: String },

    #[error("{path}: unsupported data file version {version}")]
    UnsupportedVersion { path: PathBuf, version: u32 },

    #[error("{path} changed on disk since it was loaded")]
    Conflict { path: PathBuf },

    #[error("{path} already exists")]
    AlreadyExists { path: PathBuf },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

impl FileError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type FileResult<T> = Result<T, FileError>;
