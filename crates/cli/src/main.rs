//! Council CLI entry point.
//!
//! This binary is the composition root for the entire system. Responsibilities:
//!
//! 1. **Load configuration** from `.env` and the environment ([`config::Settings`]).
//! 2. **Wire observability**: JSON `tracing` events on stderr plus an optional
//!    OpenTelemetry OTLP exporter.
//! 3. **Construct infrastructure** (`StagingLayout`, `MongoReviewStore`,
//!    `GeminiProvider`, `AirflowClient`) and inject it into the tool server,
//!    the trigger, or the stage executor.
//! 4. **Dispatch the command**:
//!    - `serve`: run the stdio tool server until input closes.
//!    - `status`: print the staging area status.
//!    - `trigger`: pin the current inputs and submit a run.
//!    - `run`: execute the three stages in-process for one run.
//!    - `show`: print a persisted review document.

mod cli;
mod config;
mod observability;

use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use control_api::AirflowClient;
use llm::GeminiProvider;
use nodes::{
    load_inputs, select_inputs, PipelineTrigger, ReflectionRequester, ReviewPipeline, StageRetry,
};
use pipeline::{
    CollectionName, CritiqueFileName, DocumentId, ReportFileName, ReviewStore, RunConf, RunId,
};
use serde_json::{json, Value};
use store::{InMemoryReviewStore, MongoReviewStore};
use tokio::io::BufReader;
use tools::{LocalControlCenter, McpServer, ToolRegistry};

use crate::cli::{Command, RootArgs, RunArgs, ShowArgs};
use crate::config::Settings;

/// Wait between model retries when the provider gives no hint.
const MODEL_BACKOFF: std::time::Duration = std::time::Duration::from_secs(2);

#[tokio::main]
async fn main() -> Result<()> {
    let args = RootArgs::parse();
    let settings = Settings::load().context("failed to load configuration")?;
    let telemetry = observability::init()?;
    tracing::debug!(?settings, "settings_loaded");

    let result = dispatch(args.command, &settings).await;
    if let Err(err) = &result {
        tracing::error!(error = %format!("{err:#}"), "command_failed");
    }
    telemetry.shutdown();
    result
}

async fn dispatch(command: Command, settings: &Settings) -> Result<()> {
    match command {
        Command::Serve => serve(settings).await,
        Command::Status => status(settings).await,
        Command::Trigger => trigger(settings).await,
        Command::Run(args) => run(settings, args).await,
        Command::Show(args) => show(settings, args).await,
    }
}

fn build_trigger(settings: &Settings) -> Result<PipelineTrigger> {
    let client = AirflowClient::new(settings.airflow())
        .context("failed to build scheduler client")?;
    Ok(PipelineTrigger::new(
        Arc::new(client),
        settings.credentials()?,
        settings.workflow_id()?,
    ))
}

fn control_center(settings: &Settings) -> LocalControlCenter {
    match build_trigger(settings) {
        Ok(trigger) => LocalControlCenter::new(settings.layout(), trigger),
        Err(err) => {
            tracing::warn!(error = %format!("{err:#}"), "scheduler_trigger_unavailable");
            LocalControlCenter::without_trigger(settings.layout(), format!("{err:#}"))
        }
    }
}

async fn serve(settings: &Settings) -> Result<()> {
    let registry = ToolRegistry::for_control_center(Arc::new(control_center(settings)));
    McpServer::new(registry)
        .serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
        .await
        .context("tool server stopped")
}

async fn status(settings: &Settings) -> Result<()> {
    let center = LocalControlCenter::without_trigger(
        settings.layout(),
        "scheduler is not used by the status command",
    );
    let registry = ToolRegistry::for_control_center(Arc::new(center));
    let outcome = registry
        .call("check_nifi_staging_area", Value::Null)
        .await?;
    println!("{}", outcome.text);
    if outcome.is_error {
        bail!("staging check failed");
    }
    Ok(())
}

async fn trigger(settings: &Settings) -> Result<()> {
    let trigger = build_trigger(settings)?;
    let conf = select_inputs(&settings.layout())
        .await
        .context("failed to select run inputs")?;
    if let Some(missing) = conf.missing_input() {
        bail!("nothing to review: {missing}");
    }
    let handle = trigger.trigger_run(conf).await?;
    print_json(&json!({
        "run_id": handle.run_id,
        "logical_date": handle.logical_date,
        "conf": handle.conf,
        "metadata": handle.metadata,
    }))
}

async fn run(settings: &Settings, args: RunArgs) -> Result<()> {
    let run_id = parse_run_id(args.run_id.as_deref())?;
    let mut conf: RunConf = match args.conf.as_deref() {
        Some(raw) => serde_json::from_str(raw).context("invalid --conf JSON")?,
        None => RunConf::default(),
    };
    if let Some(report) = args.report {
        conf.report_file = Some(required(ReportFileName::new(report), "--report")?);
    }
    if let Some(critique) = args.critique {
        conf.critique_file = Some(required(CritiqueFileName::new(critique), "--critique")?);
    }

    let store: Arc<dyn ReviewStore> = if args.dry_run {
        tracing::info!("dry_run_using_in_memory_store");
        Arc::new(InMemoryReviewStore::new())
    } else {
        Arc::new(MongoReviewStore::new(settings.mongo()?))
    };
    let model = GeminiProvider::new(settings.gemini()?)
        .context("failed to build model client")?;
    let pipeline = ReviewPipeline::new(
        store,
        ReflectionRequester::new(Arc::new(model), MODEL_BACKOFF),
        StageRetry {
            delay: settings.stage_retry_delay,
            ..StageRetry::default()
        },
    );

    let inputs = load_inputs(&settings.layout(), &run_id, &conf).await?;
    let report = pipeline.execute(run_id, inputs).await?;
    print_json(&json!({
        "run_id": report.run_id,
        "state": report.state,
        "initial_document": report.initial_document,
        "final_document": report.final_document,
        "reflection": report.reflection,
    }))
}

async fn show(settings: &Settings, args: ShowArgs) -> Result<()> {
    let collection = required(CollectionName::new(args.collection), "--collection")?;
    let id = required(DocumentId::new(args.id), "--id")?;
    let store = MongoReviewStore::new(settings.mongo()?);
    match store.fetch(&collection, &id).await? {
        Some(document) => print_json(&document),
        None => bail!("no document {id} in {collection}"),
    }
}

fn parse_run_id(raw: Option<&str>) -> Result<RunId> {
    let Some(raw) = raw else {
        return Ok(RunId::generate());
    };
    RunId::parse(raw).ok_or_else(|| anyhow!("invalid run id '{raw}'"))
}

fn required<T>(value: Option<T>, flag: &str) -> Result<T> {
    value.ok_or_else(|| anyhow!("empty {flag}"))
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    fn settings_for(root: &Path, extra: &[(&str, &str)]) -> Settings {
        let root = root.display().to_string();
        Settings::from_lookup(|key| match key {
            "COUNCIL_DATA_ROOT" => Some(root.clone()),
            _ => extra
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| value.to_string()),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn given_no_scheduler_credentials_when_status_runs_then_staging_is_reported() {
        let root = tempfile::tempdir().unwrap();
        let settings = settings_for(root.path(), &[]);
        std::fs::create_dir_all(settings.layout().staging_dir()).unwrap();

        status(&settings).await.unwrap();
    }

    #[tokio::test]
    async fn given_empty_staging_when_trigger_runs_then_nothing_is_submitted() {
        let root = tempfile::tempdir().unwrap();
        let credentials = [("AIRFLOW_USERNAME", "admin"), ("AIRFLOW_PASSWORD", "admin")];
        let settings = settings_for(root.path(), &credentials);
        std::fs::create_dir_all(settings.layout().staging_dir()).unwrap();

        let err = trigger(&settings).await.unwrap_err();

        assert_eq!(err.to_string(), "nothing to review: no staged report");
    }
}
