//! Error types for the entsync core library.

/// Top-level error enum for the reconciliation engine and its stores.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("No chassis row found in the discovery table; reconciliation cannot start")]
    NoChassis,

    #[error("Malformed discovery table: {0}")]
    MalformedTable(String),

    #[error("Class not found: {0}")]
    ClassNotFound(String),

    #[error("Object not found: {class_name} [{id}]")]
    ObjectNotFound { class_name: String, id: String },

    #[error("Object has no parent: {class_name} [{id}]")]
    NoParent { class_name: String, id: String },

    #[error("Store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type SyncResult<T> = Result<T, SyncError>;
