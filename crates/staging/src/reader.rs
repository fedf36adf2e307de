use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

use pipeline::{CritiqueEnvelope, CritiqueFileName, StagedReport};
use serde::de::DeserializeOwned;
use tokio::fs;

use crate::{ReadError, StagingLayout};

impl StagingLayout {
    /// Loads a staged report by bare file name.
    ///
    /// `file_name` must name a file directly inside the staging directory;
    /// separators, `..` and absolute paths are rejected before touching the
    /// file system, and symlinks resolving elsewhere are rejected after.
    pub async fn read_report(&self, file_name: &str) -> Result<StagedReport, ReadError> {
        let value = read_json(&self.staging_dir(), file_name).await?;
        Ok(StagedReport::new(value))
    }

    /// Loads a critique envelope from the done directory.
    pub async fn read_critique(
        &self,
        file_name: &CritiqueFileName,
    ) -> Result<CritiqueEnvelope, ReadError> {
        read_json(&self.done_dir(), file_name.as_str()).await
    }
}

async fn read_json<T: DeserializeOwned>(dir: &Path, file_name: &str) -> Result<T, ReadError> {
    let path = resolve_inside(dir, file_name).await?;
    let bytes = fs::read(&path).await.map_err(|source| ReadError::Io {
        path: path.clone(),
        source,
    })?;
    let value = serde_json::from_slice(&bytes).map_err(|source| ReadError::Parse {
        path: path.clone(),
        source,
    })?;
    tracing::debug!(path = %path.display(), bytes = bytes.len(), "json_file_loaded");
    Ok(value)
}

/// Joins `file_name` onto `dir`, refusing anything that could escape it.
async fn resolve_inside(dir: &Path, file_name: &str) -> Result<PathBuf, ReadError> {
    if !is_bare_file_name(file_name) {
        return Err(ReadError::OutsideStaging(file_name.to_string()));
    }

    let path = dir.join(file_name);
    let resolved = match fs::canonicalize(&path).await {
        Ok(resolved) => resolved,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(ReadError::NotFound(path));
        }
        Err(source) => return Err(ReadError::Io { path, source }),
    };
    let base = fs::canonicalize(dir)
        .await
        .map_err(|source| ReadError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    if !resolved.starts_with(&base) {
        return Err(ReadError::OutsideStaging(file_name.to_string()));
    }
    Ok(resolved)
}

fn is_bare_file_name(name: &str) -> bool {
    if name.contains(['/', '\\']) {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(part)), None) if part == OsStr::new(name)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_names_are_accepted_and_traversal_is_not() {
        assert!(is_bare_file_name("report_A.json"));
        assert!(!is_bare_file_name("../secrets.json"));
        assert!(!is_bare_file_name(".."));
        assert!(!is_bare_file_name("nested/report.json"));
        assert!(!is_bare_file_name("/etc/passwd"));
        assert!(!is_bare_file_name(r"..\report.json"));
        assert!(!is_bare_file_name(""));
    }
}
