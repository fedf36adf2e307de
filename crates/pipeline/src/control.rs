//! Workflow scheduler control API port.
//!
//! The scheduler that executes review runs is external. This module defines
//! the two calls the trigger needs from it: exchange credentials for a bearer
//! token, then submit a run.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::{RetryAware, RetryPolicy, RunConf, RunId, WorkflowId};

/// Username/password pair accepted by the scheduler's token endpoint.
#[derive(Clone, Serialize)]
pub struct Credentials {
    /// Account name.
    pub username: String,
    /// Account password.
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Bearer token issued by the scheduler.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wraps a raw token string.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the raw token for use in an `Authorization` header.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

/// Body of a run submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSubmission {
    /// Identifier of the new run.
    pub dag_run_id: RunId,
    /// Logical start time, ISO-8601 UTC with a `Z` suffix.
    pub logical_date: String,
    /// Run configuration pinning the input files.
    pub conf: RunConf,
}

/// Errors raised by [`WorkflowControl`] implementations.
#[derive(Debug, Error)]
pub enum ControlApiError {
    /// The scheduler answered with a non-2xx status.
    #[error("status {status}: {body}")]
    Rejected {
        /// HTTP status returned.
        status: u16,
        /// Truncated response body.
        body: String,
    },

    /// No HTTP response was received.
    #[error("request failed: {0}")]
    Transport(String),

    /// A 2xx response did not have the expected shape.
    #[error("unexpected response: {0}")]
    Protocol(String),
}

impl ControlApiError {
    /// Upstream HTTP status, when one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            ControlApiError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl RetryAware for ControlApiError {
    fn retry_policy(&self) -> RetryPolicy {
        match self {
            ControlApiError::Transport(_) => RetryPolicy::Retryable { after: None },
            ControlApiError::Rejected { status, .. } if *status >= 500 => {
                RetryPolicy::Retryable { after: None }
            }
            _ => RetryPolicy::NonRetryable,
        }
    }
}

/// The scheduler's HTTP control API.
#[async_trait]
pub trait WorkflowControl: Send + Sync {
    /// Exchanges `credentials` for a bearer token.
    async fn issue_token(&self, credentials: &Credentials) -> Result<AccessToken, ControlApiError>;

    /// Submits a new run of `workflow` and returns the scheduler's run metadata.
    async fn submit_run(
        &self,
        token: &AccessToken,
        workflow: &WorkflowId,
        submission: &RunSubmission,
    ) -> Result<Value, ControlApiError>;
}
