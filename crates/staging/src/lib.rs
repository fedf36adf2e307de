//! Council review file-system infrastructure.
//!
//! Two directories under a configurable data root are shared with external
//! actors:
//!
//! | Directory | Written by | Read by |
//! |-----------|------------|---------|
//! | `stagingArea/` | the ingestion tool (JSON analyst reports) | tool server, pipeline |
//! | `doneProcessing/` | the tool server (critique envelopes) | pipeline |
//!
//! Nothing here locks either directory. Listings are sorted so that every
//! reader sees the same order for the same directory contents.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Path resolution, directory listing, JSON encoding and
//! durable writes live here. The [`pipeline`] crate sees only the value types
//! these functions produce.

mod error;
mod inspect;
mod reader;
mod writer;

use std::path::{Path, PathBuf};

pub use error::{ReadError, WriteError};
pub use inspect::StagingOutcome;
pub use writer::CRITIQUE_FILE_PREFIX;

/// Name of the directory holding not-yet-processed analyst reports.
pub const STAGING_DIR_NAME: &str = "stagingArea";

/// Name of the directory holding saved critique envelopes.
pub const DONE_DIR_NAME: &str = "doneProcessing";

/// Extension that marks a staged file as a report.
pub const REPORT_EXTENSION: &str = "json";

/// Resolved directory layout under one data root.
///
/// Constructed once at startup and shared by reference; every operation in
/// this crate is a method on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingLayout {
    root: PathBuf,
}

impl StagingLayout {
    /// Creates a layout rooted at `root`. No directory is created or checked.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The data root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory the ingestion tool writes reports into.
    pub fn staging_dir(&self) -> PathBuf {
        self.root.join(STAGING_DIR_NAME)
    }

    /// Directory critique envelopes are written into.
    pub fn done_dir(&self) -> PathBuf {
        self.root.join(DONE_DIR_NAME)
    }
}
