use std::path::PathBuf;

use thiserror::Error;

/// Failure to list or read a file under the data root.
#[derive(Debug, Error)]
pub enum ReadError {
    /// The requested name would resolve outside its directory.
    #[error("'{0}' does not name a file inside the staging area")]
    OutsideStaging(String),

    /// The file does not exist.
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The file or directory exists but could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// Path being read.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The file content is not valid JSON of the expected shape.
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        /// Path being parsed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
}

/// Failure to write a critique envelope.
#[derive(Debug, Error)]
pub enum WriteError {
    /// Directory creation, file creation, write or sync failed.
    #[error("failed to write {}: {source}", path.display())]
    Io {
        /// Path being written.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The envelope could not be encoded.
    #[error("failed to encode critique: {0}")]
    Encode(#[from] serde_json::Error),

    /// Every candidate file name for this timestamp was already taken.
    #[error("no free critique file name for timestamp {0}")]
    NameExhausted(String),
}
