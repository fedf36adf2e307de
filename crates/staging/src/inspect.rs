use std::path::Path;

use pipeline::{CritiqueFileName, ReportFileName};
use tokio::fs;

use crate::{ReadError, StagingLayout, CRITIQUE_FILE_PREFIX, REPORT_EXTENSION};

/// Result of inspecting the staging area.
///
/// A missing directory is an ordinary outcome, not an error: the ingestion
/// tool creates it lazily.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StagingOutcome {
    /// The staging directory does not exist.
    NoDirectory,
    /// The directory exists but holds no report files.
    Empty,
    /// Report files waiting to be processed, sorted by name.
    Found(Vec<ReportFileName>),
}

impl StagingOutcome {
    /// The report the pipeline picks when no file is named explicitly: the
    /// first in sorted order.
    pub fn first(&self) -> Option<&ReportFileName> {
        match self {
            StagingOutcome::Found(files) => files.first(),
            StagingOutcome::NoDirectory | StagingOutcome::Empty => None,
        }
    }
}

impl StagingLayout {
    /// Lists the `.json` files waiting in the staging area.
    pub async fn check_staging(&self) -> Result<StagingOutcome, ReadError> {
        let dir = self.staging_dir();
        if !is_dir(&dir).await? {
            tracing::debug!(dir = %dir.display(), "staging_directory_missing");
            return Ok(StagingOutcome::NoDirectory);
        }

        let files = list_files(&dir, |name| has_report_extension(name)).await?;
        tracing::debug!(dir = %dir.display(), count = files.len(), "staging_directory_listed");
        if files.is_empty() {
            return Ok(StagingOutcome::Empty);
        }

        Ok(StagingOutcome::Found(
            files.into_iter().filter_map(ReportFileName::new).collect(),
        ))
    }

    /// Returns the most recently written critique envelope, if any.
    ///
    /// Envelope names embed their write time, so the newest file is the
    /// lexicographically greatest one.
    pub async fn newest_critique(&self) -> Result<Option<CritiqueFileName>, ReadError> {
        let dir = self.done_dir();
        if !is_dir(&dir).await? {
            return Ok(None);
        }

        let files = list_files(&dir, |name| {
            name.starts_with(CRITIQUE_FILE_PREFIX) && has_report_extension(name)
        })
        .await?;
        Ok(files.into_iter().last().and_then(CritiqueFileName::new))
    }
}

fn has_report_extension(name: &str) -> bool {
    Path::new(name)
        .extension()
        .is_some_and(|ext| ext == REPORT_EXTENSION)
}

async fn is_dir(path: &Path) -> Result<bool, ReadError> {
    match fs::metadata(path).await {
        Ok(meta) => Ok(meta.is_dir()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(source) => Err(ReadError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Regular files in `dir` whose names satisfy `keep`, sorted by name.
async fn list_files(dir: &Path, keep: impl Fn(&str) -> bool) -> Result<Vec<String>, ReadError> {
    let io_err = |source| ReadError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = fs::read_dir(dir).await.map_err(io_err)?;
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
        let file_type = entry.file_type().await.map_err(io_err)?;
        if !file_type.is_file() {
            continue;
        }
        // Non UTF-8 names cannot be addressed through the tool surface.
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if keep(&name) {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}
