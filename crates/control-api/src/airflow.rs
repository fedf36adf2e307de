use std::time::Duration;

use async_trait::async_trait;
use pipeline::{
    AccessToken, ControlApiError, Credentials, RunSubmission, WorkflowControl, WorkflowId,
};
use reqwest::{header, Client, Response};
use serde::Deserialize;
use serde_json::Value;

/// Scheduler address used when none is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// Workflow definition that runs the review stages.
pub const DEFAULT_WORKFLOW_ID: &str = "council_review_workflow";

/// Response bodies are truncated to this many characters in error messages.
const ERROR_BODY_LIMIT: usize = 240;

/// Connection settings for [`AirflowClient`].
#[derive(Debug, Clone)]
pub struct AirflowConfig {
    /// Scheduler base URL, e.g. `http://localhost:8080`.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

/// [`WorkflowControl`] over the Airflow REST API.
#[derive(Debug, Clone)]
pub struct AirflowClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl AirflowClient {
    /// Builds the client. No request is made until the first call.
    pub fn new(config: AirflowConfig) -> Result<Self, ControlApiError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| {
                ControlApiError::Transport(format!("failed to build HTTP client: {err}"))
            })?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl WorkflowControl for AirflowClient {
    #[tracing::instrument(skip(self, credentials), fields(username = %credentials.username))]
    async fn issue_token(&self, credentials: &Credentials) -> Result<AccessToken, ControlApiError> {
        let response = self
            .client
            .post(self.url("/auth/token"))
            .json(credentials)
            .send()
            .await
            .map_err(|err| ControlApiError::Transport(err.to_string()))?;
        let response = ensure_success(response).await?;

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|err| ControlApiError::Protocol(format!("token response: {err}")))?;
        if token.access_token.is_empty() {
            return Err(ControlApiError::Protocol(
                "token response carried an empty access_token".to_string(),
            ));
        }
        tracing::debug!("scheduler_token_issued");
        Ok(AccessToken::new(token.access_token))
    }

    #[tracing::instrument(skip(self, token, submission), fields(run_id = %submission.dag_run_id))]
    async fn submit_run(
        &self,
        token: &AccessToken,
        workflow: &WorkflowId,
        submission: &RunSubmission,
    ) -> Result<Value, ControlApiError> {
        let response = self
            .client
            .post(self.url(&format!("/api/v2/dags/{workflow}/dagRuns")))
            .header(header::AUTHORIZATION, format!("Bearer {}", token.expose()))
            .json(submission)
            .send()
            .await
            .map_err(|err| ControlApiError::Transport(err.to_string()))?;
        let response = ensure_success(response).await?;

        // Some deployments answer with an empty body; treat that as no metadata.
        let body = response
            .text()
            .await
            .map_err(|err| ControlApiError::Transport(err.to_string()))?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body)
            .map_err(|err| ControlApiError::Protocol(format!("run response: {err}")))
    }
}

async fn ensure_success(response: Response) -> Result<Response, ControlApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    tracing::warn!(status = status.as_u16(), "scheduler_request_rejected");
    Err(ControlApiError::Rejected {
        status: status.as_u16(),
        body: body.chars().take(ERROR_BODY_LIMIT).collect(),
    })
}
