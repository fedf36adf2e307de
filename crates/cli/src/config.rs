//! Process configuration.
//!
//! Loaded once from the environment (after reading `.env` when present) and
//! passed by reference to the commands. Values needed only by some commands
//! are validated by the accessor that hands them out, so `council status`
//! works without scheduler or database credentials.

use std::path::PathBuf;
use std::time::Duration;

use control_api::AirflowConfig;
use llm::GeminiConfig;
use pipeline::{Credentials, WorkflowId};
use staging::StagingLayout;
use store::MongoConfig;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load environment file: {0}")]
    EnvLoad(#[from] dotenvy::Error),

    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {var}: {reason}")]
    InvalidValue { var: &'static str, reason: String },
}

/// Settings for every command.
#[derive(Clone)]
pub struct Settings {
    pub data_root: PathBuf,
    pub mongo_uri: Option<String>,
    pub mongo_database: String,
    pub google_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub airflow_base_url: String,
    pub airflow_username: Option<String>,
    pub airflow_password: Option<String>,
    pub airflow_dag_id: String,
    pub stage_retry_delay: Duration,
    pub http_timeout: Duration,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("data_root", &self.data_root)
            .field("mongo_database", &self.mongo_database)
            .field("gemini_model", &self.gemini_model)
            .field("airflow_base_url", &self.airflow_base_url)
            .field("airflow_dag_id", &self.airflow_dag_id)
            .field("stage_retry_delay", &self.stage_retry_delay)
            .field("http_timeout", &self.http_timeout)
            .finish_non_exhaustive()
    }
}

impl Settings {
    /// Loads `.env` if present, then reads the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(_) => {}
            Err(err) if err.not_found() => {}
            Err(err) => return Err(err.into()),
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from `lookup`. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let or = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());

        Ok(Self {
            data_root: PathBuf::from(or("COUNCIL_DATA_ROOT", "./projectdata")),
            mongo_uri: var("MONGO_URI"),
            mongo_database: or("MONGO_DATABASE", store::DEFAULT_DATABASE),
            google_api_key: var("GOOGLE_API_KEY"),
            gemini_model: or("GEMINI_MODEL", llm::DEFAULT_MODEL),
            gemini_base_url: or("GEMINI_BASE_URL", llm::DEFAULT_BASE_URL),
            airflow_base_url: or("AIRFLOW_BASE_URL", control_api::DEFAULT_BASE_URL),
            airflow_username: var("AIRFLOW_USERNAME"),
            airflow_password: var("AIRFLOW_PASSWORD"),
            airflow_dag_id: or("AIRFLOW_DAG_ID", control_api::DEFAULT_WORKFLOW_ID),
            stage_retry_delay: seconds(
                "COUNCIL_STAGE_RETRY_DELAY_SECS",
                var("COUNCIL_STAGE_RETRY_DELAY_SECS"),
                60,
            )?,
            http_timeout: seconds(
                "COUNCIL_HTTP_TIMEOUT_SECS",
                var("COUNCIL_HTTP_TIMEOUT_SECS"),
                60,
            )?,
        })
    }

    pub fn layout(&self) -> StagingLayout {
        StagingLayout::new(&self.data_root)
    }

    pub fn mongo(&self) -> Result<MongoConfig, ConfigError> {
        Ok(MongoConfig {
            uri: self
                .mongo_uri
                .clone()
                .ok_or(ConfigError::MissingVar("MONGO_URI"))?,
            database: self.mongo_database.clone(),
        })
    }

    pub fn gemini(&self) -> Result<GeminiConfig, ConfigError> {
        Ok(GeminiConfig {
            api_key: self
                .google_api_key
                .clone()
                .ok_or(ConfigError::MissingVar("GOOGLE_API_KEY"))?,
            model: self.gemini_model.clone(),
            base_url: self.gemini_base_url.clone(),
            timeout: self.http_timeout,
        })
    }

    pub fn airflow(&self) -> AirflowConfig {
        AirflowConfig {
            base_url: self.airflow_base_url.clone(),
            timeout: self.http_timeout,
        }
    }

    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        Ok(Credentials {
            username: self
                .airflow_username
                .clone()
                .ok_or(ConfigError::MissingVar("AIRFLOW_USERNAME"))?,
            password: self
                .airflow_password
                .clone()
                .ok_or(ConfigError::MissingVar("AIRFLOW_PASSWORD"))?,
        })
    }

    pub fn workflow_id(&self) -> Result<WorkflowId, ConfigError> {
        WorkflowId::new(self.airflow_dag_id.clone())
            .ok_or(ConfigError::MissingVar("AIRFLOW_DAG_ID"))
    }
}

fn seconds(var: &'static str, raw: Option<String>, default: u64) -> Result<Duration, ConfigError> {
    let Some(raw) = raw else {
        return Ok(Duration::from_secs(default));
    };
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|err| ConfigError::InvalidValue {
            var,
            reason: format!("'{raw}' is not a whole number of seconds ({err})"),
        })
}
