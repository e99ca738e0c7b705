//! Record store backed by a [`DocumentStore`].
//!
//! Records live in the `records` collection keyed by record id, serialized
//! flat so `actor_id` and `stage` can be queried directly.

use async_trait::async_trait;
use krishi_core::{NewStageRecord, Stage, StageRecord};
use tokio::sync::Mutex;

use crate::document::{Document, DocumentStore};
use crate::error::StorageError;
use crate::traits::{admit, RecordStore};

/// Collection holding stage records.
pub const RECORDS: &str = "records";

/// A [`RecordStore`] over any document store.
///
/// Creates through one instance are serialized, so id assignment and the
/// write cannot interleave. Stores sharing the same documents through
/// separate instances still cannot overwrite each other: the write is an
/// insert-if-absent and a lost race fails with `DuplicateRecord`.
#[derive(Debug)]
pub struct DocumentRecordStore<D> {
    documents: D,
    create_lock: Mutex<()>,
}

impl<D: DocumentStore> DocumentRecordStore<D> {
    pub fn new(documents: D) -> Self {
        DocumentRecordStore {
            documents,
            create_lock: Mutex::new(()),
        }
    }

    /// The underlying document store.
    pub fn documents(&self) -> &D {
        &self.documents
    }
}

fn decode(key: &str, document: Document) -> Result<StageRecord, StorageError> {
    serde_json::from_value(document).map_err(|e| StorageError::MalformedDocument {
        collection: RECORDS.to_string(),
        key: key.to_string(),
        message: e.to_string(),
    })
}

fn decode_all(documents: Vec<Document>) -> Result<Vec<StageRecord>, StorageError> {
    documents
        .into_iter()
        .map(|doc| {
            let key = doc
                .get("record_id")
                .and_then(|v| v.as_str())
                .unwrap_or("?")
                .to_string();
            decode(&key, doc)
        })
        .collect()
}

#[async_trait]
impl<D: DocumentStore> RecordStore for DocumentRecordStore<D> {
    async fn create(&self, new: NewStageRecord) -> Result<StageRecord, StorageError> {
        let _guard = self.create_lock.lock().await;
        let record = admit(self, new).await?;
        let document = serde_json::to_value(&record)
            .map_err(|e| StorageError::Backend(format!("failed to encode record: {}", e)))?;
        self.documents
            .insert(RECORDS, &record.record_id, document)
            .await?;

        tracing::info!(
            record_id = %record.record_id,
            stage = %record.stage(),
            actor_id = %record.actor_id,
            "stage record created"
        );
        Ok(record)
    }

    async fn get(&self, record_id: &str) -> Result<Option<StageRecord>, StorageError> {
        match self.documents.get(RECORDS, record_id).await? {
            Some(doc) => decode(record_id, doc).map(Some),
            None => Ok(None),
        }
    }

    async fn list_by_actor(&self, actor_id: &str) -> Result<Vec<StageRecord>, StorageError> {
        let docs = self
            .documents
            .query(RECORDS, "actor_id", &Document::from(actor_id))
            .await?;
        decode_all(docs)
    }

    async fn count_by_stage(&self, stage: Stage) -> Result<usize, StorageError> {
        let docs = self
            .documents
            .query(RECORDS, "stage", &Document::from(stage.as_str()))
            .await?;
        Ok(docs.len())
    }
}
