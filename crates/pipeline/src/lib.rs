//! Core domain for the council review pipeline.
//!
//! This crate contains every domain concept, newtype identifier, shared value
//! type, and port trait used throughout the workspace. Infrastructure crates
//! implement the traits defined here; they never add domain rules.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! It defines *what* is needed; infrastructure crates define *how* to supply it.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype domain identifiers (`RunId`, `DocumentId`, etc.) |
//! | [`types`] | Shared value types (`StagedReport`, `CritiqueEnvelope`, `ReviewDocument`, etc.) |
//! | [`state`] | Run lifecycle state machine |
//! | [`errors`] | Pipeline error and retry-policy types |
//! | [`store`] | `ReviewStore` port |
//! | [`llm`] | `ReflectionModel` port |
//! | [`control`] | `WorkflowControl` port |

pub mod control;
pub mod errors;
pub mod identifiers;
pub mod llm;
pub mod state;
pub mod store;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use control::{AccessToken, ControlApiError, Credentials, RunSubmission, WorkflowControl};
pub use errors::{PipelineError, RetryAware, RetryPolicy};
pub use identifiers::{
    CollectionName, CritiqueFileName, DocumentId, ReportFileName, RunId, ToolName, WorkflowId,
};
pub use llm::{LlmError, ReflectionModel};
pub use state::RunState;
pub use store::{ReviewStore, StoreError, FINAL_REVIEW_COLLECTION, INITIAL_REVIEW_COLLECTION};
pub use types::{
    Critique, CritiqueEnvelope, CritiqueMeta, ReviewDocument, ReviewInputs, RiskScore, RunConf,
    StagedReport, Timestamp, NO_SAVED_CRITIQUE, NO_STAGED_REPORT,
};
