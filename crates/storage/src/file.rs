//! JSON-file document store.
//!
//! Keeps every collection in memory and rewrites the whole file after each
//! put. Intended for single-process deployments with demo-scale data.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::document::{Collections, Document, DocumentStore};
use crate::error::StorageError;

/// Document store persisted to a single JSON file.
#[derive(Debug)]
pub struct JsonFileDocumentStore {
    path: PathBuf,
    inner: Mutex<Collections>,
}

impl JsonFileDocumentStore {
    /// Open the store at `path`, loading existing contents if the file exists.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let collections = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.is_empty() => Collections::default(),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                StorageError::Backend(format!("failed to parse {}: {}", path.display(), e))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Collections::default(),
            Err(e) => {
                return Err(StorageError::Backend(format!(
                    "failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        };
        tracing::debug!(path = %path.display(), "opened document file");
        Ok(JsonFileDocumentStore {
            path,
            inner: Mutex::new(collections),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write a sibling temp file, then rename it over the store file.
    async fn flush(&self, collections: &Collections) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec_pretty(collections)
            .map_err(|e| StorageError::Backend(format!("failed to encode documents: {}", e)))?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes).await.map_err(|e| {
            StorageError::Backend(format!("failed to write {}: {}", tmp.display(), e))
        })?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| {
            StorageError::Backend(format!("failed to replace {}: {}", self.path.display(), e))
        })
    }
}

#[async_trait]
impl DocumentStore for JsonFileDocumentStore {
    async fn put(
        &self,
        collection: &str,
        key: &str,
        document: Document,
    ) -> Result<(), StorageError> {
        let mut collections = self.inner.lock().await;
        let mut next = collections.clone();
        next.put(collection, key, document);
        self.flush(&next).await?;
        *collections = next;
        Ok(())
    }

    async fn insert(
        &self,
        collection: &str,
        key: &str,
        document: Document,
    ) -> Result<(), StorageError> {
        let mut collections = self.inner.lock().await;
        let mut next = collections.clone();
        next.insert(collection, key, document)?;
        self.flush(&next).await?;
        *collections = next;
        Ok(())
    }

    async fn get(&self, collection: &str, key: &str) -> Result<Option<Document>, StorageError> {
        Ok(self.inner.lock().await.get(collection, key))
    }

    async fn query(
        &self,
        collection: &str,
        field: &str,
        value: &Document,
    ) -> Result<Vec<Document>, StorageError> {
        Ok(self.inner.lock().await.query(collection, field, value))
    }

    async fn list(&self, collection: &str) -> Result<Vec<Document>, StorageError> {
        Ok(self.inner.lock().await.list(collection))
    }
}
