//! Tool handlers and the name-keyed registry.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use pipeline::{RiskScore, ToolName};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use staging::StagingOutcome;
use thiserror::Error;

use crate::control::ControlCenter;

/// Result of one tool call, as shown to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutcome {
    /// Text content. JSON results are serialised here.
    pub text: String,
    /// Set when the underlying operation failed.
    pub is_error: bool,
}

impl ToolOutcome {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    pub fn json(value: &Value) -> Self {
        let text = serde_json::to_string_pretty(value)
            .unwrap_or_else(|_| value.to_string());
        Self::text(text)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: true,
        }
    }
}

/// Errors raised before a tool runs.
#[derive(Debug, Error, PartialEq)]
pub enum ToolCallError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },
}

/// One invocable tool.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// JSON schema of the `arguments` object.
    fn input_schema(&self) -> Value;

    async fn call(&self, arguments: Value) -> Result<ToolOutcome, ToolCallError>;
}

/// Dispatch table from tool name to handler.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<ToolName, Arc<dyn ToolHandler>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the four control-center tools.
    pub fn for_control_center(center: Arc<dyn ControlCenter>) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(CheckStagingArea(center.clone())));
        registry.register(Arc::new(ReadAnalystFile(center.clone())));
        registry.register(Arc::new(SaveInitialCritique(center.clone())));
        registry.register(Arc::new(StartCouncilReflection(center)));
        registry
    }

    /// Adds `tool`, replacing any handler already registered under its name.
    pub fn register(&mut self, tool: Arc<dyn ToolHandler>) {
        if let Some(name) = ToolName::new(tool.name()) {
            self.tools.insert(name, tool);
        }
    }

    /// Tool descriptors in name order, in the `tools/list` shape.
    pub fn descriptors(&self) -> Vec<Value> {
        self.tools
            .values()
            .map(|tool| {
                json!({
                    "name": tool.name(),
                    "description": tool.description(),
                    "inputSchema": tool.input_schema(),
                })
            })
            .collect()
    }

    pub async fn call(&self, name: &str, arguments: Value) -> Result<ToolOutcome, ToolCallError> {
        let tool = ToolName::new(name)
            .and_then(|key| self.tools.get(&key))
            .ok_or_else(|| ToolCallError::UnknownTool(name.to_string()))?;
        tracing::info!(tool = name, "tool_called");
        let outcome = tool.call(arguments).await?;
        if outcome.is_error {
            tracing::warn!(tool = name, detail = %outcome.text, "tool_failed");
        }
        Ok(outcome)
    }
}

/// Decodes `arguments`, treating `null` as an empty object.
fn parse_args<T: DeserializeOwned>(tool: &str, arguments: Value) -> Result<T, ToolCallError> {
    let arguments = if arguments.is_null() {
        json!({})
    } else {
        arguments
    };
    serde_json::from_value(arguments).map_err(|err| ToolCallError::InvalidArguments {
        tool: tool.to_string(),
        reason: err.to_string(),
    })
}

fn no_arguments_schema() -> Value {
    json!({"type": "object", "properties": {}})
}

#[derive(Deserialize)]
struct NoArgs {}

// ---------------------------------------------------------------------------
// check_nifi_staging_area
// ---------------------------------------------------------------------------

struct CheckStagingArea(Arc<dyn ControlCenter>);

#[async_trait]
impl ToolHandler for CheckStagingArea {
    fn name(&self) -> &'static str {
        "check_nifi_staging_area"
    }

    fn description(&self) -> &'static str {
        "Checks whether the staging area holds new JSON analyst reports."
    }

    fn input_schema(&self) -> Value {
        no_arguments_schema()
    }

    async fn call(&self, arguments: Value) -> Result<ToolOutcome, ToolCallError> {
        let NoArgs {} = parse_args(self.name(), arguments)?;
        Ok(match self.0.check_staging().await {
            Ok(StagingOutcome::NoDirectory) => ToolOutcome::text(format!(
                "Staging directory does not exist: {}",
                self.0.staging_dir().display()
            )),
            Ok(StagingOutcome::Empty) => ToolOutcome::text("No Files to process"),
            Ok(StagingOutcome::Found(files)) => {
                let names: Vec<&str> = files.iter().map(|f| f.as_str()).collect();
                ToolOutcome::text(format!("Found new files to process: {}", names.join(", ")))
            }
            Err(err) => ToolOutcome::error(format!("Error checking staging area: {err}")),
        })
    }
}

// ---------------------------------------------------------------------------
// read_analyst_file
// ---------------------------------------------------------------------------

struct ReadAnalystFile(Arc<dyn ControlCenter>);

#[derive(Deserialize)]
struct ReadArgs {
    filename: String,
}

#[async_trait]
impl ToolHandler for ReadAnalystFile {
    fn name(&self) -> &'static str {
        "read_analyst_file"
    }

    fn description(&self) -> &'static str {
        "Reads a staged analyst report and returns its JSON content."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "filename": {
                    "type": "string",
                    "description": "Report file name inside the staging area"
                }
            },
            "required": ["filename"]
        })
    }

    async fn call(&self, arguments: Value) -> Result<ToolOutcome, ToolCallError> {
        let ReadArgs { filename } = parse_args(self.name(), arguments)?;
        Ok(match self.0.read_report(&filename).await {
            Ok(report) => ToolOutcome::json(report.as_value()),
            Err(err) => ToolOutcome::error(format!("Error reading {filename}: {err}")),
        })
    }
}

// ---------------------------------------------------------------------------
// save_initial_critique
// ---------------------------------------------------------------------------

struct SaveInitialCritique(Arc<dyn ControlCenter>);

#[derive(Deserialize)]
struct SaveArgs {
    risk_score: i64,
    critique_summary: String,
}

#[async_trait]
impl ToolHandler for SaveInitialCritique {
    fn name(&self) -> &'static str {
        "save_initial_critique"
    }

    fn description(&self) -> &'static str {
        "Saves the first-pass critique of a report (risk score and summary) for the council review."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "risk_score": {"type": "integer", "description": "Numeric risk assessment"},
                "critique_summary": {"type": "string", "description": "Free-text assessment"}
            },
            "required": ["risk_score", "critique_summary"]
        })
    }

    async fn call(&self, arguments: Value) -> Result<ToolOutcome, ToolCallError> {
        let SaveArgs {
            risk_score,
            critique_summary,
        } = parse_args(self.name(), arguments)?;
        let saved = self
            .0
            .save_critique(RiskScore::new(risk_score), &critique_summary)
            .await;
        Ok(match saved {
            Ok(path) => ToolOutcome::text(format!("Critique saved to {}", path.display())),
            Err(err) => ToolOutcome::error(format!("Error saving critique: {err}")),
        })
    }
}

// ---------------------------------------------------------------------------
// start_llm_council_reflection
// ---------------------------------------------------------------------------

struct StartCouncilReflection(Arc<dyn ControlCenter>);

#[async_trait]
impl ToolHandler for StartCouncilReflection {
    fn name(&self) -> &'static str {
        "start_llm_council_reflection"
    }

    fn description(&self) -> &'static str {
        "Starts the council reflection workflow for the staged report and its saved critique."
    }

    fn input_schema(&self) -> Value {
        no_arguments_schema()
    }

    async fn call(&self, arguments: Value) -> Result<ToolOutcome, ToolCallError> {
        let NoArgs {} = parse_args(self.name(), arguments)?;
        Ok(match self.0.start_reflection().await {
            Ok(handle) => ToolOutcome::text(format!(
                "Council reflection run {} submitted, scheduled for {}",
                handle.run_id, handle.logical_date
            )),
            Err(err) => ToolOutcome::error(format!("Failed to start council reflection: {err}")),
        })
    }
}
