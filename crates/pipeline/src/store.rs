//! Review trail store port.
//!
//! The trail is append-only: documents are inserted, never updated. A
//! correction is a new document.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::{CollectionName, DocumentId, RetryAware, RetryPolicy};

/// Collection receiving the initial document of every run.
pub const INITIAL_REVIEW_COLLECTION: &str = "reviews";

/// Collection receiving the final document (with reflection) of every run.
pub const FINAL_REVIEW_COLLECTION: &str = "council_review";

/// Errors raised by [`ReviewStore`] implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached or refused the connection.
    #[error("document store connection failed: {0}")]
    Connection(String),

    /// The store rejected or failed the insert.
    #[error("document store write failed: {0}")]
    Write(String),

    /// The store failed a lookup.
    #[error("document store read failed: {0}")]
    Read(String),

    /// The document could not be converted to the store's native format.
    #[error("document is not storable: {0}")]
    InvalidDocument(String),

    /// The supplied document id is not valid for this store.
    #[error("invalid document id '{0}'")]
    InvalidId(String),
}

impl RetryAware for StoreError {
    fn retry_policy(&self) -> RetryPolicy {
        match self {
            StoreError::Connection(_) | StoreError::Write(_) | StoreError::Read(_) => {
                RetryPolicy::Retryable { after: None }
            }
            StoreError::InvalidDocument(_) | StoreError::InvalidId(_) => RetryPolicy::NonRetryable,
        }
    }
}

/// Append-only document persistence for review documents.
#[async_trait]
pub trait ReviewStore: Send + Sync {
    /// Inserts `document` into `collection` and returns the store-generated id.
    async fn persist(
        &self,
        collection: &CollectionName,
        document: Value,
    ) -> Result<DocumentId, StoreError>;

    /// Fetches a previously persisted document, including store-assigned
    /// identity fields. Returns `Ok(None)` when no document has that id.
    async fn fetch(
        &self,
        collection: &CollectionName,
        id: &DocumentId,
    ) -> Result<Option<Value>, StoreError>;
}
