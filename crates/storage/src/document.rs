//! Document store abstraction and the in-memory backend.
//!
//! A document store holds JSON documents in named collections, keyed by a
//! string. Individual writes are atomic; there are no cross-document
//! transactions. The record store and profile accessors are thin wrappers
//! over these operations.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::StorageError;

/// A stored JSON document.
pub type Document = serde_json::Value;

/// Keyed JSON document storage.
///
/// Implementations must be `Send + Sync + 'static` so they can be shared
/// through axum application state.
#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    /// Insert or replace the document at `collection/key`.
    ///
    /// Replacing keeps the document's original position in the collection.
    async fn put(&self, collection: &str, key: &str, document: Document)
        -> Result<(), StorageError>;

    /// Insert the document at `collection/key` only if the key is free.
    ///
    /// The check and the write happen under one backend lock. Fails with
    /// `StorageError::DuplicateRecord` when the key is taken.
    async fn insert(
        &self,
        collection: &str,
        key: &str,
        document: Document,
    ) -> Result<(), StorageError>;

    /// Read the document at `collection/key`.
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Document>, StorageError>;

    /// All documents in `collection` whose top-level `field` equals `value`,
    /// in insertion order.
    async fn query(
        &self,
        collection: &str,
        field: &str,
        value: &Document,
    ) -> Result<Vec<Document>, StorageError>;

    /// Every document in `collection`, in insertion order.
    async fn list(&self, collection: &str) -> Result<Vec<Document>, StorageError>;
}

#[async_trait]
impl<T: DocumentStore + ?Sized> DocumentStore for Arc<T> {
    async fn put(
        &self,
        collection: &str,
        key: &str,
        document: Document,
    ) -> Result<(), StorageError> {
        (**self).put(collection, key, document).await
    }

    async fn insert(
        &self,
        collection: &str,
        key: &str,
        document: Document,
    ) -> Result<(), StorageError> {
        (**self).insert(collection, key, document).await
    }

    async fn get(&self, collection: &str, key: &str) -> Result<Option<Document>, StorageError> {
        (**self).get(collection, key).await
    }

    async fn query(
        &self,
        collection: &str,
        field: &str,
        value: &Document,
    ) -> Result<Vec<Document>, StorageError> {
        (**self).query(collection, field, value).await
    }

    async fn list(&self, collection: &str) -> Result<Vec<Document>, StorageError> {
        (**self).list(collection).await
    }
}

// ──────────────────────────────────────────────
// Collections (shared by the memory and file backends)
// ──────────────────────────────────────────────

/// One keyed entry in a collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Entry {
    pub(crate) key: String,
    pub(crate) document: Document,
}

/// Insertion-ordered collections of documents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub(crate) struct Collections {
    collections: BTreeMap<String, Vec<Entry>>,
}

impl Collections {
    pub(crate) fn put(&mut self, collection: &str, key: &str, document: Document) {
        let entries = self.collections.entry(collection.to_string()).or_default();
        match entries.iter_mut().find(|e| e.key == key) {
            Some(existing) => existing.document = document,
            None => entries.push(Entry {
                key: key.to_string(),
                document,
            }),
        }
    }

    /// Add `document` unless `key` is already present in `collection`.
    pub(crate) fn insert(
        &mut self,
        collection: &str,
        key: &str,
        document: Document,
    ) -> Result<(), StorageError> {
        let entries = self.collections.entry(collection.to_string()).or_default();
        if entries.iter().any(|e| e.key == key) {
            return Err(StorageError::DuplicateRecord {
                record_id: key.to_string(),
            });
        }
        entries.push(Entry {
            key: key.to_string(),
            document,
        });
        Ok(())
    }

    pub(crate) fn get(&self, collection: &str, key: &str) -> Option<Document> {
        self.collections
            .get(collection)?
            .iter()
            .find(|e| e.key == key)
            .map(|e| e.document.clone())
    }

    pub(crate) fn query(&self, collection: &str, field: &str, value: &Document) -> Vec<Document> {
        self.collections
            .get(collection)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|e| e.document.get(field) == Some(value))
                    .map(|e| e.document.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub(crate) fn list(&self, collection: &str) -> Vec<Document> {
        self.collections
            .get(collection)
            .map(|entries| entries.iter().map(|e| e.document.clone()).collect())
            .unwrap_or_default()
    }
}

// ──────────────────────────────────────────────
// MemoryDocumentStore
// ──────────────────────────────────────────────

/// Process-local document store. Contents are lost on drop.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    inner: RwLock<Collections>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn put(
        &self,
        collection: &str,
        key: &str,
        document: Document,
    ) -> Result<(), StorageError> {
        self.inner.write().await.put(collection, key, document);
        Ok(())
    }

    async fn insert(
        &self,
        collection: &str,
        key: &str,
        document: Document,
    ) -> Result<(), StorageError> {
        self.inner.write().await.insert(collection, key, document)
    }

    async fn get(&self, collection: &str, key: &str) -> Result<Option<Document>, StorageError> {
        Ok(self.inner.read().await.get(collection, key))
    }

    async fn query(
        &self,
        collection: &str,
        field: &str,
        value: &Document,
    ) -> Result<Vec<Document>, StorageError> {
        Ok(self.inner.read().await.query(collection, field, value))
    }

    async fn list(&self, collection: &str) -> Result<Vec<Document>, StorageError> {
        Ok(self.inner.read().await.list(collection))
    }
}
