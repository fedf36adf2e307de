//! Control-plane tool surface.
//!
//! A calling agent drives the review pipeline through four tools:
//!
//! | Tool | Operation |
//! |------|-----------|
//! | `check_nifi_staging_area` | list staged reports |
//! | `read_analyst_file` | read one staged report |
//! | `save_initial_critique` | save a critique to the done directory |
//! | `start_llm_council_reflection` | submit a pipeline run |
//!
//! The operations live behind the [`ControlCenter`] trait. [`ToolRegistry`]
//! maps tool names to handlers, and [`McpServer`] exposes the registry as
//! newline-delimited JSON-RPC 2.0 over any async reader/writer pair.
//!
//! Every tool call produces a result: failures of the underlying operation
//! are reported as error results, never as protocol errors.

mod control;
mod registry;
mod server;

pub use control::{ControlCenter, LocalControlCenter, ReflectionStartError};
pub use registry::{ToolCallError, ToolHandler, ToolOutcome, ToolRegistry};
pub use server::{McpServer, ProtocolError, PROTOCOL_VERSION, SERVER_NAME};
