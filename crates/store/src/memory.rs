use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use pipeline::{CollectionName, DocumentId, ReviewStore, StoreError};
use serde_json::Value;
use tokio::sync::Mutex;

/// Process-local [`ReviewStore`].
///
/// Ids are 24-character hex strings, the same shape MongoDB uses, so callers
/// cannot tell the stores apart from the ids they get back. Fetched documents
/// carry the id under `_id`.
#[derive(Debug, Default)]
pub struct InMemoryReviewStore {
    next_id: AtomicU64,
    collections: Mutex<BTreeMap<CollectionName, Vec<(DocumentId, Value)>>>,
}

impl InMemoryReviewStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Documents persisted to `collection`, in insertion order.
    pub async fn documents(&self, collection: &CollectionName) -> Vec<Value> {
        self.collections
            .lock()
            .await
            .get(collection)
            .map(|docs| docs.iter().map(|(_, doc)| doc.clone()).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ReviewStore for InMemoryReviewStore {
    async fn persist(
        &self,
        collection: &CollectionName,
        document: Value,
    ) -> Result<DocumentId, StoreError> {
        if !document.is_object() {
            return Err(StoreError::InvalidDocument(
                "review documents must be JSON objects".to_string(),
            ));
        }

        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let id = DocumentId::new(format!("{n:024x}"))
            .ok_or_else(|| StoreError::Write("generated an empty id".to_string()))?;

        self.collections
            .lock()
            .await
            .entry(collection.clone())
            .or_default()
            .push((id.clone(), document));
        tracing::debug!(collection = %collection, id = %id, "review_document_stored_in_memory");
        Ok(id)
    }

    async fn fetch(
        &self,
        collection: &CollectionName,
        id: &DocumentId,
    ) -> Result<Option<Value>, StoreError> {
        let guard = self.collections.lock().await;
        let found = guard
            .get(collection)
            .and_then(|docs| docs.iter().find(|(stored, _)| stored == id))
            .map(|(stored, doc)| {
                let mut doc = doc.clone();
                if let Value::Object(map) = &mut doc {
                    map.insert("_id".to_string(), Value::String(stored.to_string()));
                }
                doc
            });
        Ok(found)
    }
}
