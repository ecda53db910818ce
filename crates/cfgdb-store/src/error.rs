use cfgdb_types::ObjectRef;

/// Errors from object store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// An object with the same class and id is already loaded.
    #[error("object already exists: {0}")]
    AlreadyExists(ObjectRef),

    /// The requested object is not loaded.
    #[error("object not found: {0}")]
    NotFound(ObjectRef),

    /// Removing the object would leave other objects pointing at nothing.
    #[error("{target} is still referenced by {}", format_referrers(.referrers))]
    DanglingReference {
        target: ObjectRef,
        referrers: Vec<(ObjectRef, String)>,
    },

    /// The object has no slot with this name.
    #[error("object {object} has no field {field}")]
    UnknownField { object: ObjectRef, field: String },

    /// An internal index disagrees with the arena.
    #[error("object store corrupted: {0}")]
    Corrupt(String),
}

fn format_referrers(referrers: &[(ObjectRef, String)]) -> String {
    referrers
        .iter()
        .map(|(obj, slot)| format!("{obj}.{slot}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
