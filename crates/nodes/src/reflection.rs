use std::sync::Arc;
use std::time::Duration;

use pipeline::{LlmError, ReflectionModel, RetryAware, RetryPolicy, ReviewInputs};
use serde_json::json;

/// Extra attempts allowed after the first model call fails transiently.
pub const MODEL_RETRY_BUDGET: u32 = 2;

const PROMPT_TEMPLATE: &str = "\
You are a senior financial analyst, who looks at various reviews of stocks and critiques \
the analysis made by a junior analyst in 4-5 sentences. Look for logical fallacies, biases \
and missed analysis points.
Review made by the junior analyst for a particular stock: {document}";

/// Renders the reflection prompt for the accumulated review.
///
/// The staged report and the saved critique envelope are embedded as compact
/// JSON under `analyst_review` and `claude_critique`, the same keys the review
/// documents use.
pub fn build_prompt(inputs: &ReviewInputs) -> String {
    let document = json!({
        "analyst_review": inputs.report,
        "claude_critique": inputs.critique,
    });
    PROMPT_TEMPLATE.replace("{document}", &document.to_string())
}

/// Asks the model for a reflection, within a bounded retry budget.
#[derive(Clone)]
pub struct ReflectionRequester {
    model: Arc<dyn ReflectionModel>,
    retry_budget: u32,
    backoff: Duration,
}

impl ReflectionRequester {
    /// Creates a requester with the default budget of [`MODEL_RETRY_BUDGET`]
    /// extra attempts, waiting `backoff` between attempts unless the provider
    /// asks for a specific delay.
    pub fn new(model: Arc<dyn ReflectionModel>, backoff: Duration) -> Self {
        Self {
            model,
            retry_budget: MODEL_RETRY_BUDGET,
            backoff,
        }
    }

    /// Sends the review and its critique to the model and returns its raw
    /// answer.
    ///
    /// Retryable failures are retried up to the budget; non-retryable ones
    /// surface immediately. The last error is returned once the budget is
    /// spent.
    pub async fn reflect(&self, inputs: &ReviewInputs) -> Result<String, LlmError> {
        let prompt = build_prompt(inputs);
        let mut retries = 0;
        loop {
            match self.model.complete(&prompt).await {
                Ok(text) => return Ok(text),
                Err(err) => {
                    let RetryPolicy::Retryable { after } = err.retry_policy() else {
                        tracing::warn!(error = %err, "reflection_failed_permanently");
                        return Err(err);
                    };
                    if retries >= self.retry_budget {
                        tracing::warn!(error = %err, retries, "reflection_retry_budget_exhausted");
                        return Err(err);
                    }
                    retries += 1;
                    let delay = after.unwrap_or(self.backoff);
                    tracing::info!(
                        error = %err,
                        retry = retries,
                        delay_secs = delay.as_secs_f64(),
                        "reflection_retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
