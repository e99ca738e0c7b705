use krishi_core::{Role, Stage, ValidationError};
use krishi_storage::StorageError;

/// Errors surfaced to callers of the trace and ledger operations.
///
/// None of these are retried automatically. `NotFound` is an ordinary
/// "no result" outcome; `CorruptChain` signals a data-integrity bug.
#[derive(Debug, thiserror::Error)]
pub enum TraceError {
    /// Malformed input. Nothing was written.
    #[error("invalid input: {0}")]
    Validation(ValidationError),

    /// A purchase or sale named an upstream record that does not resolve to
    /// a record of the preceding stage. Nothing was written.
    #[error("unknown upstream reference '{upstream_record_id}': no {expected} record with that id")]
    UnknownUpstreamReference {
        upstream_record_id: String,
        expected: Stage,
    },

    /// No entity matches the lookup.
    #[error("{what} not found: {key}")]
    NotFound { what: &'static str, key: String },

    /// Following upstream references hit a dangling link, a stage out of
    /// order, or more links than there are stages.
    #[error("corrupt provenance chain at {record_id}: {message}")]
    CorruptChain { record_id: String, message: String },

    /// Propagated from the authentication provider.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The actor's role does not author this stage.
    #[error("{role} accounts cannot record {stage} stages")]
    RoleNotPermitted { role: Role, stage: Stage },

    /// Lookup codes can only be entered manually.
    #[error("reading lookup codes from images is not supported; enter the code manually")]
    ScanUnavailable,

    #[error(transparent)]
    Storage(StorageError),
}

impl From<StorageError> for TraceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Validation(e) => TraceError::Validation(e),
            StorageError::UnknownUpstreamReference {
                upstream_record_id,
                expected,
            } => TraceError::UnknownUpstreamReference {
                upstream_record_id,
                expected,
            },
            StorageError::ProfileNotFound { uid } => TraceError::NotFound {
                what: "profile",
                key: uid,
            },
            other => TraceError::Storage(other),
        }
    }
}

impl From<ValidationError> for TraceError {
    fn from(err: ValidationError) -> Self {
        TraceError::Validation(err)
    }
}
