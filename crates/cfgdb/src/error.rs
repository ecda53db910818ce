use std::fmt;
use std::path::PathBuf;

use cfgdb_file::FileError;
use cfgdb_include::IncludeError;
use cfgdb_schema::{SchemaError, ValidationReport};
use cfgdb_store::StoreError;
use cfgdb_types::TypeError;
use thiserror::Error;

/// Errors surfaced by a configuration session.
///
/// Errors from the lower crates are kept as they are; [`ConfigError::kind`]
/// sorts every error into one [`ErrorKind`] for callers that only care
/// about the category.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no database loaded")]
    NotLoaded,

    #[error("unknown database backend {0:?}")]
    UnknownBackend(String),

    #[error("cannot find database {0}")]
    DatabaseNotFound(String),

    #[error("database file {0} already exists")]
    DatabaseExists(PathBuf),

    #[error("invalid configuration in {path}: {reason}")]
    Config { path: PathBuf, reason: String },

    #[error(transparent)]
    InvalidId(#[from] TypeError),

    #[error("{0}")]
    Validation(ValidationReport),

    #[error("commit comment {comment:?} cannot be stored verbatim: {reason}")]
    InvalidComment { comment: String, reason: &'static str },

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Include(#[from] IncludeError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    File(#[from] FileError),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Category of a [`ConfigError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A path is unreachable, unreadable or unwritable.
    Io,
    /// A class, attribute or relation definition is malformed or unknown.
    Schema,
    /// An object or value violates the schema.
    Validation,
    /// An object, include or file already exists.
    AlreadyExists,
    /// An object, include or data source is missing.
    NotFound,
    /// Removing an object would orphan relations pointing at it.
    DanglingReference,
    /// The handle has no database loaded.
    NotLoaded,
    /// A data file changed on disk since it was loaded.
    Conflict,
    /// Session configuration is invalid.
    Config,
    /// In-memory state is corrupted. Not recoverable.
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Io => "io",
            Self::Schema => "schema",
            Self::Validation => "validation",
            Self::AlreadyExists => "already-exists",
            Self::NotFound => "not-found",
            Self::DanglingReference => "dangling-reference",
            Self::NotLoaded => "not-loaded",
            Self::Conflict => "conflict",
            Self::Config => "config",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ConfigError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io { .. } => ErrorKind::Io,
            Self::NotLoaded => ErrorKind::NotLoaded,
            Self::UnknownBackend(_) | Self::DatabaseNotFound(_) => ErrorKind::NotFound,
            Self::DatabaseExists(_) => ErrorKind::Io,
            Self::Config { .. } => ErrorKind::Config,
            Self::InvalidId(_) | Self::Validation(_) | Self::InvalidComment { .. } => {
                ErrorKind::Validation
            }
            Self::Schema(e) => schema_kind(e),
            Self::Include(e) => match e {
                IncludeError::DuplicateInclude { .. } => ErrorKind::AlreadyExists,
                IncludeError::SelfInclude { .. } | IncludeError::InvalidPath { .. } => {
                    ErrorKind::Validation
                }
                IncludeError::NotFound { .. }
                | IncludeError::UnknownFile(_)
                | IncludeError::NoDefaultFile
                | IncludeError::Unresolved { .. } => ErrorKind::NotFound,
            },
            Self::Store(e) => match e {
                StoreError::AlreadyExists(_) => ErrorKind::AlreadyExists,
                StoreError::NotFound(_) => ErrorKind::NotFound,
                StoreError::DanglingReference { .. } => ErrorKind::DanglingReference,
                StoreError::UnknownField { .. } => ErrorKind::Validation,
                StoreError::Corrupt(_) => ErrorKind::Internal,
            },
            Self::File(e) => match e {
                FileError::Io { .. }
                | FileError::Parse { .. }
                | FileError::UnknownFormat { .. }
                | FileError::UnsupportedVersion { .. } => ErrorKind::Io,
                FileError::Conflict { .. } => ErrorKind::Conflict,
                FileError::AlreadyExists { .. } => ErrorKind::AlreadyExists,
                FileError::Serialization(_) => ErrorKind::Internal,
                FileError::Schema(e) => schema_kind(e),
            },
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Every error except corrupted in-memory state leaves the session
    /// usable.
    pub fn is_recoverable(&self) -> bool {
        self.kind() != ErrorKind::Internal
    }

    /// The violations behind a failed commit or check, if that is what
    /// this error is.
    pub fn report(&self) -> Option<&ValidationReport> {
        match self {
            Self::Validation(report) => Some(report),
            _ => None,
        }
    }
}

fn schema_kind(e: &SchemaError) -> ErrorKind {
    match e {
        SchemaError::Io { .. } => ErrorKind::Io,
        e if e.is_validation() => ErrorKind::Validation,
        _ => ErrorKind::Schema,
    }
}

impl From<ValidationReport> for ConfigError {
    fn from(report: ValidationReport) -> Self {
        Self::Validation(report)
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;
    use cfgdb_types::ObjectRef;

    #[test]
    fn lower_errors_are_classified() {
        let dup: ConfigError = StoreError::AlreadyExists(ObjectRef::new("C", "a")).into();
        assert_eq!(dup.kind(), ErrorKind::AlreadyExists);

        let dangling: ConfigError = StoreError::DanglingReference {
            target: ObjectRef::new("C", "a"),
            referrers: vec![(ObjectRef::new("C", "b"), "Another".into())],
        }
        .into();
        assert_eq!(dangling.kind(), ErrorKind::DanglingReference);

        let unknown: ConfigError = SchemaError::UnknownClass("Nope".into()).into();
        assert_eq!(unknown.kind(), ErrorKind::Schema);

        let bad_field: ConfigError = SchemaError::UnknownField {
            class: "C".into(),
            field: "x".into(),
        }
        .into();
        assert_eq!(bad_field.kind(), ErrorKind::Validation);

        let missing: ConfigError = IncludeError::NotFound {
            file: "/db/a.data.json".into(),
            include: "b.data.json".into(),
        }
        .into();
        assert_eq!(missing.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn only_internal_is_unrecoverable() {
        assert!(ConfigError::NotLoaded.is_recoverable());
        assert!(!ConfigError::Internal("x".into()).is_recoverable());
        let corrupt: ConfigError = StoreError::Corrupt("x".into()).into();
        assert!(!corrupt.is_recoverable());
    }

    #[test]
    fn invalid_comment_is_a_validation_error() {
        let err = ConfigError::InvalidComment {
            comment: "a \"b\"".into(),
            reason: "no quotes",
        };
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.is_recoverable());
        assert!(err.report().is_none());
    }

    #[test]
    fn kind_names() {
        assert_eq!(ErrorKind::DanglingReference.to_string(), "dangling-reference");
        assert_eq!(ErrorKind::NotFound.as_str(), "not-found");
    }
}
