//! Stage executor.
//!
//! Drives one run through `push_initial_review`, `request_reflection` and
//! `push_final_review`, in that order, advancing the [`RunState`] after each
//! stage. A failing stage gets one more attempt after a fixed delay; if that
//! also fails the run is marked [`RunState::Failed`] and later stages are not
//! started. Documents written by earlier stages are never rolled back.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use pipeline::{
    CollectionName, DocumentId, LlmError, PipelineError, ReviewDocument, ReviewInputs, ReviewStore,
    RunId, RunState, StoreError, Timestamp, FINAL_REVIEW_COLLECTION, INITIAL_REVIEW_COLLECTION,
};
use thiserror::Error;

use crate::reflection::ReflectionRequester;

/// Stage names in execution order.
pub const STAGE_NAMES: [&str; 3] = [
    "push_initial_review",
    "request_reflection",
    "push_final_review",
];

/// Per-stage retry settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageRetry {
    /// Attempts allowed after the first failure.
    pub extra_attempts: u32,
    /// Wait before each extra attempt.
    pub delay: Duration,
}

impl Default for StageRetry {
    fn default() -> Self {
        Self {
            extra_attempts: 1,
            delay: Duration::from_secs(60),
        }
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub run_id: RunId,
    pub state: RunState,
    /// Id of the document written to the initial collection.
    pub initial_document: DocumentId,
    /// Id of the document written to the final collection.
    pub final_document: DocumentId,
    pub reflection: String,
}

#[derive(Debug, Error)]
enum StageError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Model(#[from] LlmError),
    #[error("failed to encode review document: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Executes review runs against a store and a reflection model.
#[derive(Clone)]
pub struct ReviewPipeline {
    store: Arc<dyn ReviewStore>,
    requester: ReflectionRequester,
    retry: StageRetry,
}

impl ReviewPipeline {
    pub fn new(
        store: Arc<dyn ReviewStore>,
        requester: ReflectionRequester,
        retry: StageRetry,
    ) -> Self {
        Self {
            store,
            requester,
            retry,
        }
    }

    /// Runs all three stages for `inputs`.
    ///
    /// Returns the run report on success. On failure the returned error names
    /// the stage that gave up; the run state at that point is `FAILED`.
    #[tracing::instrument(skip_all, fields(run_id = %run_id))]
    pub async fn execute(
        &self,
        run_id: RunId,
        inputs: ReviewInputs,
    ) -> Result<RunReport, PipelineError> {
        let mut tracker = RunTracker::new(run_id.clone());
        let initial_collection = collection(INITIAL_REVIEW_COLLECTION)?;
        let final_collection = collection(FINAL_REVIEW_COLLECTION)?;
        let inputs = &inputs;

        let initial_document = tracker
            .stage(self.run_stage(&run_id, STAGE_NAMES[0], || {
                self.push(
                    &initial_collection,
                    ReviewDocument::initial(inputs, Timestamp::now()),
                )
            }))
            .await?;
        tracker.advance(RunState::Stage1Pushed)?;

        let requester = &self.requester;
        let reflection = tracker
            .stage(self.run_stage(&run_id, STAGE_NAMES[1], || async move {
                Ok::<_, StageError>(requester.reflect(inputs).await?)
            }))
            .await?;
        tracker.advance(RunState::Reflected)?;

        let final_document = tracker
            .stage(self.run_stage(&run_id, STAGE_NAMES[2], || {
                self.push(
                    &final_collection,
                    ReviewDocument::finalized(inputs, &reflection, Timestamp::now()),
                )
            }))
            .await?;
        tracker.advance(RunState::Finalized)?;

        Ok(RunReport {
            run_id,
            state: tracker.state,
            initial_document,
            final_document,
            reflection,
        })
    }

    async fn push(
        &self,
        collection: &CollectionName,
        document: ReviewDocument,
    ) -> Result<DocumentId, StageError> {
        let id = self.store.persist(collection, document.to_value()?).await?;
        tracing::info!(collection = %collection, document_id = %id, "review_document_pushed");
        Ok(id)
    }

    async fn run_stage<T, F, Fut>(
        &self,
        run_id: &RunId,
        stage: &'static str,
        mut attempt: F,
    ) -> Result<T, PipelineError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StageError>>,
    {
        let allowed = 1 + self.retry.extra_attempts;
        let mut attempts = 0;
        tracing::info!(stage, "stage_started");
        loop {
            attempts += 1;
            match attempt().await {
                Ok(value) => {
                    tracing::info!(stage, attempts, "stage_succeeded");
                    return Ok(value);
                }
                Err(err) if attempts < allowed => {
                    tracing::warn!(
                        stage,
                        attempts,
                        error = %err,
                        delay_secs = self.retry.delay.as_secs_f64(),
                        "stage_retry_scheduled"
                    );
                    tokio::time::sleep(self.retry.delay).await;
                }
                Err(err) => {
                    tracing::error!(stage, attempts, error = %err, "stage_failed");
                    return Err(PipelineError::StageFailed {
                        run_id: run_id.clone(),
                        stage,
                        attempts,
                        reason: err.to_string(),
                    });
                }
            }
        }
    }
}

fn collection(name: &str) -> Result<CollectionName, PipelineError> {
    CollectionName::new(name).ok_or_else(|| PipelineError::ConfigurationError {
        message: "empty collection name".to_string(),
    })
}

/// Holds the run state and enforces the transition table.
struct RunTracker {
    run_id: RunId,
    state: RunState,
}

impl RunTracker {
    fn new(run_id: RunId) -> Self {
        Self {
            run_id,
            state: RunState::Pending,
        }
    }

    fn advance(&mut self, next: RunState) -> Result<(), PipelineError> {
        if !self.state.can_transition_to(next) {
            return Err(PipelineError::InvalidTransition {
                run_id: self.run_id.clone(),
                from: self.state,
                to: next,
            });
        }
        tracing::info!(from = %self.state, to = %next, "run_state_changed");
        self.state = next;
        Ok(())
    }

    /// Awaits a stage and moves the run to `FAILED` if it gave up.
    async fn stage<T>(
        &mut self,
        stage: impl Future<Output = Result<T, PipelineError>>,
    ) -> Result<T, PipelineError> {
        match stage.await {
            Ok(value) => Ok(value),
            Err(err) => {
                self.advance(RunState::Failed)?;
                Err(err)
            }
        }
    }
}
