//! Run input selection and loading.

use pipeline::{PipelineError, ReviewInputs, RunConf, RunId, NO_SAVED_CRITIQUE, NO_STAGED_REPORT};
use staging::{ReadError, StagingLayout};

/// Chooses the inputs for a new run: the first staged report in sorted order
/// and the newest critique in the done directory.
///
/// Either field is left empty when nothing is available. Callers that submit
/// runs check [`RunConf::missing_input`] first so an unreviewable run is never
/// scheduled.
pub async fn select_inputs(layout: &StagingLayout) -> Result<RunConf, ReadError> {
    let report_file = layout.check_staging().await?.first().cloned();
    let critique_file = layout.newest_critique().await?;
    Ok(RunConf {
        report_file,
        critique_file,
    })
}

/// Resolves `conf` against the directories and loads both inputs.
///
/// Fields pinned in `conf` are used as-is; missing ones fall back to
/// [`select_inputs`].
pub async fn load_inputs(
    layout: &StagingLayout,
    run_id: &RunId,
    conf: &RunConf,
) -> Result<ReviewInputs, PipelineError> {
    let unavailable = |reason: String| PipelineError::InputsUnavailable {
        run_id: run_id.clone(),
        reason,
    };

    let fallback = if conf.report_file.is_none() || conf.critique_file.is_none() {
        select_inputs(layout)
            .await
            .map_err(|err| unavailable(err.to_string()))?
    } else {
        RunConf::default()
    };

    let report_file = conf.report_file.clone().or(fallback.report_file);
    let critique_file = conf.critique_file.clone().or(fallback.critique_file);
    let (report_file, critique_file) = match (report_file, critique_file) {
        (Some(report_file), Some(critique_file)) => (report_file, critique_file),
        (None, _) => return Err(unavailable(NO_STAGED_REPORT.to_string())),
        (_, None) => return Err(unavailable(NO_SAVED_CRITIQUE.to_string())),
    };

    let report = layout
        .read_report(report_file.as_str())
        .await
        .map_err(|err| unavailable(err.to_string()))?;
    let critique = layout
        .read_critique(&critique_file)
        .await
        .map_err(|err| unavailable(err.to_string()))?;

    tracing::info!(
        %run_id,
        report_file = %report_file,
        critique_file = %critique_file,
        "run_inputs_loaded"
    );
    Ok(ReviewInputs {
        report_file,
        report,
        critique_file,
        critique,
    })
}
