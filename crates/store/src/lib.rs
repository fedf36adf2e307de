//! Council review trail persistence.
//!
//! Implements the [`pipeline::ReviewStore`] trait twice:
//!
//! - [`MongoReviewStore`]: the production store. A fresh client is created
//!   for every operation, so each call is an independent, retryable event.
//! - [`InMemoryReviewStore`]: process-local collections, used by dry runs and
//!   tests.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Driver configuration, BSON conversion and identifier
//! formats live here; the [`pipeline`] crate sees only JSON values and
//! [`pipeline::DocumentId`].

mod memory;
mod mongo;

pub use memory::InMemoryReviewStore;
pub use mongo::{MongoConfig, MongoReviewStore, DEFAULT_DATABASE};
