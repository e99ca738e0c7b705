use krishi_core::{Stage, ValidationError};

/// All errors that can be returned by a record or document store.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The record input was malformed. Nothing was written.
    #[error("invalid record: {0}")]
    Validation(#[from] ValidationError),

    /// A purchase or sale named an upstream record that does not exist or
    /// belongs to the wrong stage. Nothing was written.
    #[error("unknown upstream reference '{upstream_record_id}': no {expected} record with that id")]
    UnknownUpstreamReference {
        upstream_record_id: String,
        expected: Stage,
    },

    /// The assigned identifier is already taken. Happens when records were
    /// removed out from under the sequence counter.
    #[error("record already exists: {record_id}")]
    DuplicateRecord { record_id: String },

    /// No profile document for the given uid.
    #[error("profile not found: {uid}")]
    ProfileNotFound { uid: String },

    /// A stored document could not be decoded into its domain type.
    #[error("malformed document {collection}/{key}: {message}")]
    MalformedDocument {
        collection: String,
        key: String,
        message: String,
    },

    /// A backend-specific storage error (I/O, serialization, etc.).
    #[error("storage backend error: {0}")]
    Backend(String),
}
