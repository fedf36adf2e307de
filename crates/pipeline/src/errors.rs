//! Top-level error and retry-policy types for the council review domain.
//!
//! [`PipelineError`] covers conditions that halt a pipeline run. Component-level
//! errors (store failures, model call failures, control API failures) are
//! defined next to their port traits.
//!
//! [`RetryPolicy`] is a cross-cutting concern: any error type that participates
//! in retry decisions implements [`RetryAware`].

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{RunId, RunState};

// ---------------------------------------------------------------------------
// Retry semantics
// ---------------------------------------------------------------------------

/// Whether an error condition is safe to retry and, if so, after what delay.
///
/// Returned by infrastructure error types to let the orchestration layer decide
/// whether to re-invoke an operation without failing the stage.
///
/// - `Retryable` errors: transport failures, timeouts, rate limits, 5xx responses.
/// - `NonRetryable` errors: rejected credentials, malformed requests, protocol
///   violations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RetryPolicy {
    /// The operation may be retried.
    ///
    /// `after` optionally specifies the minimum delay before retrying (e.g.
    /// derived from a `Retry-After` response header).
    Retryable {
        /// Minimum back-off before the next attempt. `None` means retry
        /// immediately or apply the caller's own back-off schedule.
        after: Option<Duration>,
    },
    /// The operation must not be retried.
    NonRetryable,
}

impl RetryPolicy {
    /// Returns `true` for [`RetryPolicy::Retryable`].
    pub fn is_retryable(&self) -> bool {
        matches!(self, RetryPolicy::Retryable { .. })
    }
}

/// Implemented by error types that can tell the caller whether to retry.
pub trait RetryAware {
    /// Classifies this error for retry decisions.
    fn retry_policy(&self) -> RetryPolicy;
}

// ---------------------------------------------------------------------------
// Pipeline-level errors
// ---------------------------------------------------------------------------

/// Errors that halt a pipeline run.
///
/// Once one of these is produced the run is in [`RunState::Failed`]. Documents
/// already persisted by earlier stages are left in place.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The run inputs (staged report or critique) could not be resolved or loaded.
    #[error("Run {run_id}: inputs unavailable: {reason}")]
    InputsUnavailable {
        /// Run being prepared.
        run_id: RunId,
        /// Human-readable description of the missing or unreadable input.
        reason: String,
    },

    /// A stage failed on every permitted attempt.
    #[error("Run {run_id}: stage '{stage}' failed after {attempts} attempt(s): {reason}")]
    StageFailed {
        /// Run the stage belongs to.
        run_id: RunId,
        /// Stage name (e.g. `"request_reflection"`).
        stage: &'static str,
        /// How many attempts were made.
        attempts: u32,
        /// Description of the last failure.
        reason: String,
    },

    /// A state transition was attempted that the run state machine forbids.
    #[error("Run {run_id}: invalid transition {from} -> {to}")]
    InvalidTransition {
        /// Run whose state was being advanced.
        run_id: RunId,
        /// State before the attempted transition.
        from: RunState,
        /// Requested state.
        to: RunState,
    },

    /// The pipeline configuration is invalid.
    #[error("Configuration error: {message}")]
    ConfigurationError {
        /// Description of the configuration problem.
        message: String,
    },
}
