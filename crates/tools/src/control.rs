use std::path::PathBuf;

use async_trait::async_trait;
use nodes::{select_inputs, PipelineTrigger, RunHandle, TriggerError};
use pipeline::{RiskScore, StagedReport};
use staging::{ReadError, StagingLayout, StagingOutcome, WriteError};
use thiserror::Error;

/// Why a reflection run could not be started.
#[derive(Debug, Error)]
pub enum ReflectionStartError {
    /// Scheduler credentials are not configured.
    #[error("scheduler is not configured: {0}")]
    NotConfigured(String),

    /// The run inputs could not be selected.
    #[error("could not select run inputs: {0}")]
    Selection(#[from] ReadError),

    /// There is no staged report or no saved critique to review.
    #[error("nothing to review: {0}")]
    NothingToReview(&'static str),

    #[error(transparent)]
    Trigger(#[from] TriggerError),
}

/// The operations a calling agent may invoke.
#[async_trait]
pub trait ControlCenter: Send + Sync {
    /// Directory inspected by [`ControlCenter::check_staging`].
    fn staging_dir(&self) -> PathBuf;

    async fn check_staging(&self) -> Result<StagingOutcome, ReadError>;

    async fn read_report(&self, file_name: &str) -> Result<StagedReport, ReadError>;

    async fn save_critique(
        &self,
        risk_score: RiskScore,
        summary: &str,
    ) -> Result<PathBuf, WriteError>;

    /// Pins the current inputs and submits a pipeline run for them.
    ///
    /// Nothing is submitted unless both a staged report and a saved critique
    /// are available.
    async fn start_reflection(&self) -> Result<RunHandle, ReflectionStartError>;
}

/// [`ControlCenter`] over the local data root and a scheduler trigger.
#[derive(Clone)]
pub struct LocalControlCenter {
    layout: StagingLayout,
    trigger: Option<PipelineTrigger>,
    missing_trigger_reason: String,
}

impl LocalControlCenter {
    pub fn new(layout: StagingLayout, trigger: PipelineTrigger) -> Self {
        Self {
            layout,
            trigger: Some(trigger),
            missing_trigger_reason: String::new(),
        }
    }

    /// A control center whose `start_reflection` always fails with `reason`.
    ///
    /// Used when the process has no scheduler credentials; the file
    /// operations still work.
    pub fn without_trigger(layout: StagingLayout, reason: impl Into<String>) -> Self {
        Self {
            layout,
            trigger: None,
            missing_trigger_reason: reason.into(),
        }
    }
}

#[async_trait]
impl ControlCenter for LocalControlCenter {
    fn staging_dir(&self) -> PathBuf {
        self.layout.staging_dir()
    }

    async fn check_staging(&self) -> Result<StagingOutcome, ReadError> {
        self.layout.check_staging().await
    }

    async fn read_report(&self, file_name: &str) -> Result<StagedReport, ReadError> {
        self.layout.read_report(file_name).await
    }

    async fn save_critique(
        &self,
        risk_score: RiskScore,
        summary: &str,
    ) -> Result<PathBuf, WriteError> {
        self.layout.save_critique(risk_score, summary).await
    }

    async fn start_reflection(&self) -> Result<RunHandle, ReflectionStartError> {
        let Some(trigger) = &self.trigger else {
            return Err(ReflectionStartError::NotConfigured(
                self.missing_trigger_reason.clone(),
            ));
        };
        let conf = select_inputs(&self.layout).await?;
        if let Some(missing) = conf.missing_input() {
            tracing::warn!(reason = missing, "reflection_not_started");
            return Err(ReflectionStartError::NothingToReview(missing));
        }
        Ok(trigger.trigger_run(conf).await?)
    }
}
