use thiserror::Error;

use crate::value::AttrType;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid object id {id:?}: {reason}")]
    InvalidObjectId { id: String, reason: String },

    #[error("invalid full object name {0:?}: expected `id@class`")]
    InvalidFullName(String),

    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: AttrType, found: String },

    #[error("value {value} out of range for {ty}")]
    OutOfRange { ty: AttrType, value: String },

    #[error("invalid {ty} literal {value:?}")]
    InvalidLiteral { ty: AttrType, value: String },
}
