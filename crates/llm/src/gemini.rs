use std::time::Duration;

use async_trait::async_trait;
use pipeline::{LlmError, ReflectionModel};
use reqwest::{header, Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};

/// Public Gemini API host.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Model used for reflections unless configured otherwise.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Response bodies are truncated to this many characters in error messages.
const ERROR_BODY_LIMIT: usize = 240;

/// Connection settings for [`GeminiProvider`].
#[derive(Clone)]
pub struct GeminiConfig {
    /// API key sent in the `x-goog-api-key` header.
    pub api_key: String,
    /// Model name, e.g. `gemini-2.0-flash`.
    pub model: String,
    /// API host without trailing path.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// [`ReflectionModel`] over the Gemini REST API.
#[derive(Debug, Clone)]
pub struct GeminiProvider {
    client: Client,
    config: GeminiConfig,
}

impl GeminiProvider {
    /// Builds the provider and its HTTP client.
    pub fn new(config: GeminiConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| LlmError::Transport(format!("failed to build HTTP client: {err}")))?;
        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }
}

#[async_trait]
impl ReflectionModel for GeminiProvider {
    #[tracing::instrument(skip(self, prompt), fields(model = %self.config.model, prompt_chars = prompt.len()))]
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let response = self
            .client
            .post(self.endpoint())
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-goog-api-key", &self.config.api_key)
            .json(&request_body(prompt))
            .send()
            .await
            .map_err(|err| LlmError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = retry_after(response.headers());
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "gemini_request_rejected");
            return Err(map_http_error(status, retry_after, &body));
        }

        let payload: GenerateContentResponse = response
            .json()
            .await
            .map_err(|err| LlmError::Protocol(format!("invalid JSON body: {err}")))?;
        let text = extract_text(payload)?;
        tracing::info!(response_chars = text.len(), "gemini_completion_received");
        Ok(text)
    }
}

fn request_body(prompt: &str) -> Value {
    json!({
        "contents": [
            {"role": "user", "parts": [{"text": prompt}]}
        ]
    })
}

// ---------------------------------------------------------------------------
// Response handling
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

fn extract_text(payload: GenerateContentResponse) -> Result<String, LlmError> {
    let Some(candidate) = payload.candidates.into_iter().next() else {
        let reason = payload
            .prompt_feedback
            .and_then(|feedback| feedback.block_reason)
            .unwrap_or_else(|| "no candidates returned".to_string());
        return Err(LlmError::Protocol(reason));
    };

    let text: String = candidate
        .content
        .map(|content| content.parts)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|part| part.text)
        .collect();

    if text.trim().is_empty() {
        let reason = candidate
            .finish_reason
            .unwrap_or_else(|| "UNKNOWN".to_string());
        return Err(LlmError::Protocol(format!(
            "candidate has no text (finish reason {reason})"
        )));
    }
    Ok(text)
}

fn retry_after(headers: &header::HeaderMap) -> Option<Duration> {
    headers
        .get(header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

fn map_http_error(status: StatusCode, retry_after: Option<Duration>, body: &str) -> LlmError {
    let body = body.chars().take(ERROR_BODY_LIMIT).collect::<String>();
    let status = status.as_u16();
    match status {
        408 | 429 => LlmError::RateLimited {
            status,
            body,
            retry_after,
        },
        _ => LlmError::Upstream { status, body },
    }
}

#[cfg(test)]
mod tests {
    use pipeline::{RetryAware, RetryPolicy};

    use super::*;

    fn parse(value: Value) -> GenerateContentResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn request_body_carries_prompt_as_single_user_part() {
        let body = request_body("critique this");
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "critique this");
    }

    #[test]
    fn text_parts_of_first_candidate_are_concatenated() {
        let payload = parse(json!({
            "candidates": [
                {"content": {"parts": [{"text": "The analyst "}, {"text": "ignored debt."}]},
                 "finishReason": "STOP"},
                {"content": {"parts": [{"text": "ignored"}]}}
            ]
        }));
        assert_eq!(extract_text(payload).unwrap(), "The analyst ignored debt.");
    }

    #[test]
    fn blocked_prompt_is_a_protocol_error() {
        let payload = parse(json!({"promptFeedback": {"blockReason": "SAFETY"}}));
        let err = extract_text(payload).unwrap_err();
        assert!(matches!(err, LlmError::Protocol(ref reason) if reason == "SAFETY"));
        assert_eq!(err.retry_policy(), RetryPolicy::NonRetryable);
    }

    #[test]
    fn throttling_and_server_errors_are_retryable() {
        let throttled = map_http_error(
            StatusCode::TOO_MANY_REQUESTS,
            Some(Duration::from_secs(2)),
            "slow down",
        );
        assert_eq!(
            throttled.retry_policy(),
            RetryPolicy::Retryable {
                after: Some(Duration::from_secs(2))
            }
        );

        let unavailable = map_http_error(StatusCode::SERVICE_UNAVAILABLE, None, "");
        assert!(unavailable.retry_policy().is_retryable());

        let bad_key = map_http_error(StatusCode::FORBIDDEN, None, "API key invalid");
        assert!(!bad_key.retry_policy().is_retryable());
    }

    #[test]
    fn error_bodies_are_truncated() {
        let long = "x".repeat(1000);
        let LlmError::Upstream { body, .. } = map_http_error(StatusCode::BAD_REQUEST, None, &long)
        else {
            panic!("expected upstream error");
        };
        assert_eq!(body.len(), ERROR_BODY_LIMIT);
    }

    #[test]
    fn endpoint_joins_base_url_and_model() {
        let provider = GeminiProvider::new(GeminiConfig {
            api_key: "k".to_string(),
            model: DEFAULT_MODEL.to_string(),
            base_url: format!("{DEFAULT_BASE_URL}/"),
            timeout: Duration::from_secs(5),
        })
        .unwrap();
        assert_eq!(
            provider.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }
}
