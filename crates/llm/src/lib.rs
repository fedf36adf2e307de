//! Council review LLM provider infrastructure adapter.
//!
//! Implements the [`pipeline::ReflectionModel`] trait for Google's Gemini
//! `generateContent` REST API. Additional providers are added as new types in
//! this crate without any changes to the `pipeline` crate.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** All HTTP transport, request formatting, response parsing
//! and error classification live here. Retrying is *not* done here: errors are
//! classified through [`pipeline::RetryAware`] and the orchestration layer owns
//! the retry budget.

mod gemini;

pub use gemini::{GeminiConfig, GeminiProvider, DEFAULT_BASE_URL, DEFAULT_MODEL};
