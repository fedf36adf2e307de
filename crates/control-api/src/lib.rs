//! Council review scheduler client adapter.
//!
//! Implements the [`pipeline::WorkflowControl`] trait over the Airflow REST
//! control API:
//!
//! | Call | Endpoint |
//! |------|----------|
//! | token exchange | `POST /auth/token {username, password} -> {access_token}` |
//! | run submission | `POST /api/v2/dags/{workflow}/dagRuns {dag_run_id, logical_date, conf}` |
//!
//! Every call treats any 2xx status as success.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** URL construction, authentication headers and response
//! decoding live here. The [`pipeline`] crate sees only
//! [`pipeline::WorkflowControl`].

mod airflow;

pub use airflow::{AirflowClient, AirflowConfig, DEFAULT_BASE_URL, DEFAULT_WORKFLOW_ID};
