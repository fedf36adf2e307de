//! Council review pipeline stages and control-plane orchestration.
//!
//! This crate provides the three pipeline stages (initial push, reflection,
//! final push), the [`ReviewPipeline`] executor that drives them in order, the
//! [`ReflectionRequester`] that owns the model retry budget, and the
//! [`PipelineTrigger`] that submits new runs to the scheduler.
//!
//! ## Architectural Layer
//!
//! **Orchestration layer.** Nodes sequence calls between business logic in the
//! [`pipeline`] crate and infrastructure traits (store, model, scheduler).
//! They contain no transport details of their own.

mod executor;
mod inputs;
mod reflection;
mod trigger;

pub use executor::{ReviewPipeline, RunReport, StageRetry, STAGE_NAMES};
pub use inputs::{load_inputs, select_inputs};
pub use reflection::{build_prompt, ReflectionRequester, MODEL_RETRY_BUDGET};
pub use trigger::{PipelineTrigger, RunHandle, TriggerError, START_DELAY_SECS};
