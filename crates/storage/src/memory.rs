//! In-memory record store.

use async_trait::async_trait;
use krishi_core::{NewStageRecord, Stage, StageRecord};
use tokio::sync::{Mutex, RwLock};

use crate::error::StorageError;
use crate::traits::{admit, RecordStore};

/// Records held in a process-local vector, in creation order.
///
/// Creates are serialized by `create_lock`; reads only take the vector's
/// read lock and proceed while a create is being admitted.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: RwLock<Vec<StageRecord>>,
    create_lock: Mutex<()>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn create(&self, new: NewStageRecord) -> Result<StageRecord, StorageError> {
        let _guard = self.create_lock.lock().await;
        let record = admit(self, new).await?;

        let mut records = self.records.write().await;
        if records.iter().any(|r| r.record_id == record.record_id) {
            return Err(StorageError::DuplicateRecord {
                record_id: record.record_id,
            });
        }
        records.push(record.clone());
        drop(records);

        tracing::info!(
            record_id = %record.record_id,
            stage = %record.stage(),
            actor_id = %record.actor_id,
            "stage record created"
        );
        Ok(record)
    }

    async fn get(&self, record_id: &str) -> Result<Option<StageRecord>, StorageError> {
        let records = self.records.read().await;
        Ok(records.iter().find(|r| r.record_id == record_id).cloned())
    }

    async fn list_by_actor(&self, actor_id: &str) -> Result<Vec<StageRecord>, StorageError> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|r| r.actor_id == actor_id)
            .cloned()
            .collect())
    }

    async fn count_by_stage(&self, stage: Stage) -> Result<usize, StorageError> {
        let records = self.records.read().await;
        Ok(records.iter().filter(|r| r.stage() == stage).count())
    }
}
