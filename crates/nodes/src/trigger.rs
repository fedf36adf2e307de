//! Run submission to the workflow scheduler.

use std::sync::Arc;

use pipeline::{
    ControlApiError, Credentials, RunConf, RunId, RunSubmission, Timestamp, WorkflowControl,
    WorkflowId,
};
use serde_json::Value;
use thiserror::Error;

/// Seconds between submission and the run's logical start.
pub const START_DELAY_SECS: i64 = 30;

/// A run accepted by the scheduler.
#[derive(Debug, Clone, PartialEq)]
pub struct RunHandle {
    pub run_id: RunId,
    /// Logical start time sent with the submission.
    pub logical_date: String,
    /// Pinned inputs sent with the submission.
    pub conf: RunConf,
    /// Run metadata returned by the scheduler (`Null` when it sent none).
    pub metadata: Value,
}

/// Why a run could not be submitted.
#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("authentication failed: {0}")]
    Authentication(#[source] ControlApiError),

    #[error("submission of run {run_id} failed: {source}")]
    Submission {
        run_id: RunId,
        #[source]
        source: ControlApiError,
    },
}

impl TriggerError {
    /// The scheduler's HTTP status, when it answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            TriggerError::Authentication(err) => err.status(),
            TriggerError::Submission { source, .. } => source.status(),
        }
    }
}

/// Authenticates and submits review runs.
#[derive(Clone)]
pub struct PipelineTrigger {
    control: Arc<dyn WorkflowControl>,
    credentials: Credentials,
    workflow: WorkflowId,
}

impl PipelineTrigger {
    pub fn new(
        control: Arc<dyn WorkflowControl>,
        credentials: Credentials,
        workflow: WorkflowId,
    ) -> Self {
        Self {
            control,
            credentials,
            workflow,
        }
    }

    /// Obtains a token and submits one run carrying `conf`.
    ///
    /// A fresh [`RunId`] is generated per call, and the logical date is set
    /// [`START_DELAY_SECS`] seconds in the future. Nothing is submitted when
    /// authentication fails.
    #[tracing::instrument(skip_all, fields(workflow = %self.workflow))]
    pub async fn trigger_run(&self, conf: RunConf) -> Result<RunHandle, TriggerError> {
        let token = self
            .control
            .issue_token(&self.credentials)
            .await
            .map_err(|err| {
                tracing::warn!(error = %err, "scheduler_authentication_failed");
                TriggerError::Authentication(err)
            })?;

        let submission = RunSubmission {
            dag_run_id: RunId::generate(),
            logical_date: Timestamp::now().plus_seconds(START_DELAY_SECS).to_iso_z(),
            conf,
        };
        let metadata = self
            .control
            .submit_run(&token, &self.workflow, &submission)
            .await
            .map_err(|source| {
                tracing::warn!(
                    run_id = %submission.dag_run_id,
                    error = %source,
                    "run_submission_failed"
                );
                TriggerError::Submission {
                    run_id: submission.dag_run_id.clone(),
                    source,
                }
            })?;

        tracing::info!(
            run_id = %submission.dag_run_id,
            logical_date = %submission.logical_date,
            "run_submitted"
        );
        Ok(RunHandle {
            run_id: submission.dag_run_id,
            logical_date: submission.logical_date,
            conf: submission.conf,
            metadata,
        })
    }
}
