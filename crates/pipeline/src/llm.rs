//! Language model port.
//!
//! The pipeline needs a single prompt-in, text-out completion. Provider
//! details (endpoint, authentication, request shape) live in the `llm` crate.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::{RetryAware, RetryPolicy};

/// Errors raised by [`ReflectionModel`] implementations.
#[derive(Debug, Error)]
pub enum LlmError {
    /// The request never produced an HTTP response (DNS, TLS, timeout, reset).
    #[error("model request failed: {0}")]
    Transport(String),

    /// The provider throttled the request.
    #[error("model provider rate limited the request (status {status}): {body}")]
    RateLimited {
        /// HTTP status returned by the provider.
        status: u16,
        /// Truncated response body.
        body: String,
        /// Delay requested by the provider, if any.
        retry_after: Option<Duration>,
    },

    /// The provider answered with a non-success status.
    #[error("model provider returned status {status}: {body}")]
    Upstream {
        /// HTTP status returned by the provider.
        status: u16,
        /// Truncated response body.
        body: String,
    },

    /// The provider answered 2xx but the payload was unusable.
    #[error("model response could not be used: {0}")]
    Protocol(String),
}

impl RetryAware for LlmError {
    fn retry_policy(&self) -> RetryPolicy {
        match self {
            LlmError::Transport(_) => RetryPolicy::Retryable { after: None },
            LlmError::RateLimited { retry_after, .. } => RetryPolicy::Retryable {
                after: *retry_after,
            },
            LlmError::Upstream { status, .. } if *status >= 500 => {
                RetryPolicy::Retryable { after: None }
            }
            LlmError::Upstream { .. } | LlmError::Protocol(_) => RetryPolicy::NonRetryable,
        }
    }
}

/// A generative language model that completes a single text prompt.
#[async_trait]
pub trait ReflectionModel: Send + Sync {
    /// Sends `prompt` to the model and returns its raw text answer.
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_are_retryable_and_client_errors_are_not() {
        let server = LlmError::Upstream {
            status: 503,
            body: String::new(),
        };
        let client = LlmError::Upstream {
            status: 400,
            body: String::new(),
        };
        assert!(server.retry_policy().is_retryable());
        assert!(!client.retry_policy().is_retryable());
    }

    #[test]
    fn rate_limit_carries_requested_delay() {
        let err = LlmError::RateLimited {
            status: 429,
            body: String::new(),
            retry_after: Some(Duration::from_secs(3)),
        };
        assert_eq!(
            err.retry_policy(),
            RetryPolicy::Retryable {
                after: Some(Duration::from_secs(3))
            }
        );
    }
}
