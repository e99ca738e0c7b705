use async_trait::async_trait;
use krishi_core::{next_id, validate_new_record, NewStageRecord, Stage, StageRecord};

use crate::error::StorageError;

/// The stage record store.
///
/// A `RecordStore` holds harvest, purchase and sale records and enforces the
/// chain invariant on creation: a record's upstream reference must resolve
/// to an existing record of the immediately preceding stage.
///
/// ## Visibility
///
/// A successful `create` is visible to every subsequent `get` and
/// `list_by_actor` call. Each record has exactly one writer (its author), so
/// no transaction isolation is provided or needed.
///
/// ## Identifiers
///
/// `create` assigns `"{PREFIX}{seq:03}"` where `seq` is the number of
/// existing records of the stage plus one. If that id is already taken the
/// create fails with `StorageError::DuplicateRecord` rather than
/// overwriting.
///
/// Concurrent creates through one store never share an id: backends run
/// validation, id assignment and the write as one serialized step.
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync + 'static` to be used in axum
/// application state and across async task boundaries.
#[async_trait]
pub trait RecordStore: Send + Sync + 'static {
    /// Validate and store a new record, returning it with its assigned id.
    ///
    /// Fails with `StorageError::Validation` for malformed input and
    /// `StorageError::UnknownUpstreamReference` when the upstream id does
    /// not resolve to a record of the preceding stage. On failure the store
    /// is unchanged.
    async fn create(&self, new: NewStageRecord) -> Result<StageRecord, StorageError>;

    /// Read a record by id. `Ok(None)` when no such record exists.
    async fn get(&self, record_id: &str) -> Result<Option<StageRecord>, StorageError>;

    /// All records authored by `actor_id`, in creation order.
    async fn list_by_actor(&self, actor_id: &str) -> Result<Vec<StageRecord>, StorageError>;

    /// Number of stored records of `stage`.
    async fn count_by_stage(&self, stage: Stage) -> Result<usize, StorageError>;

    /// The identifier the next record of `stage` will receive.
    async fn next_id(&self, stage: Stage) -> Result<String, StorageError> {
        let existing = self.count_by_stage(stage).await?;
        Ok(next_id(stage.prefix(), existing))
    }
}

/// Run every pre-insert check for `new` against `store` and build the record
/// it would become.
///
/// Shared by all backends so they enforce identical rules.
pub(crate) async fn admit<S: RecordStore + ?Sized>(
    store: &S,
    new: NewStageRecord,
) -> Result<StageRecord, StorageError> {
    let date = validate_new_record(&new)?;
    let stage = new.stage();

    if let (Some(expected), Some(upstream_id)) = (stage.predecessor(), new.upstream_id()) {
        let resolves = store
            .get(upstream_id)
            .await?
            .is_some_and(|upstream| upstream.stage() == expected);
        if !resolves {
            return Err(StorageError::UnknownUpstreamReference {
                upstream_record_id: upstream_id.to_string(),
                expected,
            });
        }
    }

    let record_id = store.next_id(stage).await?;
    if store.get(&record_id).await?.is_some() {
        return Err(StorageError::DuplicateRecord { record_id });
    }
    Ok(new.into_record(record_id, date))
}
