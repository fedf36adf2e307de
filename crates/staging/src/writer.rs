use std::path::{Path, PathBuf};

use pipeline::{Critique, CritiqueEnvelope, RiskScore, Timestamp};
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::{StagingLayout, WriteError};

/// Every critique envelope file name starts with this prefix.
pub const CRITIQUE_FILE_PREFIX: &str = "analyst_review_draft_";

/// Envelopes are written for humans first: three-space indentation.
const ENVELOPE_INDENT: &[u8] = b"   ";

/// Upper bound on same-timestamp suffixes tried before giving up.
const MAX_NAME_ATTEMPTS: u32 = 1000;

impl StagingLayout {
    /// Wraps the critique in a timestamped envelope and writes it to a new
    /// file in the done directory. Returns the path written.
    ///
    /// Never overwrites: if the timestamp-derived name is taken a numeric
    /// suffix is appended. Suffixed names sort after the unsuffixed one.
    pub async fn save_critique(
        &self,
        risk_score: RiskScore,
        critique_summary: &str,
    ) -> Result<PathBuf, WriteError> {
        self.save_critique_at(Timestamp::now(), risk_score, critique_summary)
            .await
    }

    pub(crate) async fn save_critique_at(
        &self,
        timestamp: Timestamp,
        risk_score: RiskScore,
        critique_summary: &str,
    ) -> Result<PathBuf, WriteError> {
        let envelope = CritiqueEnvelope::new(
            Critique {
                risk_score,
                critique_summary: critique_summary.to_string(),
            },
            timestamp,
        );
        let bytes = encode_indented(&envelope)?;

        let dir = self.done_dir();
        fs::create_dir_all(&dir)
            .await
            .map_err(|source| WriteError::Io {
                path: dir.clone(),
                source,
            })?;

        let stamp = timestamp.to_file_safe();
        for attempt in 0..MAX_NAME_ATTEMPTS {
            let name = if attempt == 0 {
                format!("{CRITIQUE_FILE_PREFIX}{stamp}.json")
            } else {
                format!("{CRITIQUE_FILE_PREFIX}{stamp}_{attempt:03}.json")
            };
            let path = dir.join(name);

            let file = match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(source) => return Err(WriteError::Io { path, source }),
            };

            write_envelope(&path, file, &bytes).await?;
            tracing::info!(
                path = %path.display(),
                risk_score = %risk_score,
                "critique_saved"
            );
            return Ok(path);
        }

        Err(WriteError::NameExhausted(stamp))
    }
}

/// Writes and syncs `bytes` into the freshly created `file`.
///
/// On failure the partial file is removed, otherwise its name would make it
/// the newest critique.
async fn write_envelope(path: &Path, mut file: File, bytes: &[u8]) -> Result<(), WriteError> {
    let written = write_durably(&mut file, bytes).await;
    drop(file);
    let Err(source) = written else {
        return Ok(());
    };

    if let Err(err) = fs::remove_file(path).await {
        tracing::warn!(
            path = %path.display(),
            error = %err,
            "partial_critique_not_removed"
        );
    }
    Err(WriteError::Io {
        path: path.to_path_buf(),
        source,
    })
}

async fn write_durably(file: &mut File, bytes: &[u8]) -> std::io::Result<()> {
    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_all().await
}

fn encode_indented<T: Serialize>(value: &T) -> Result<Vec<u8>, WriteError> {
    let mut bytes = Vec::new();
    let mut serializer =
        Serializer::with_formatter(&mut bytes, PrettyFormatter::with_indent(ENVELOPE_INDENT));
    value.serialize(&mut serializer)?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use super::*;

    #[test]
    fn envelope_encoding_uses_three_space_indent() {
        let encoded = encode_indented(&json!({"audit": {"risk_score": 1}})).unwrap();
        let text = String::from_utf8(encoded).unwrap();
        assert!(text.contains("\n   \"audit\""));
        assert!(text.contains("\n      \"risk_score\": 1"));
    }

    #[tokio::test]
    async fn same_timestamp_saves_get_numbered_names() {
        let root = tempfile::tempdir().unwrap();
        let layout = StagingLayout::new(root.path());
        let instant = Timestamp::from_utc(Utc.with_ymd_and_hms(2026, 10, 19, 10, 15, 30).unwrap());

        let first = layout
            .save_critique_at(instant, RiskScore::new(3), "first")
            .await
            .unwrap();
        let second = layout
            .save_critique_at(instant, RiskScore::new(8), "second")
            .await
            .unwrap();

        let name = |path: &Path| path.file_name().unwrap().to_str().unwrap().to_string();
        assert_eq!(
            name(&first),
            "analyst_review_draft_2026-10-19T10-15-30-000000Z.json"
        );
        assert_eq!(
            name(&second),
            "analyst_review_draft_2026-10-19T10-15-30-000000Z_001.json"
        );
        assert_eq!(std::fs::read_dir(layout.done_dir()).unwrap().count(), 2);

        let newest = layout.newest_critique().await.unwrap().unwrap();
        assert_eq!(newest.as_str(), name(&second));
        let envelope = layout.read_critique(&newest).await.unwrap();
        assert_eq!(envelope.audit.risk_score, RiskScore::new(8));
    }

    #[tokio::test]
    async fn failed_write_removes_the_partial_file() {
        let root = tempfile::tempdir().unwrap();
        let path = root.path().join("analyst_review_draft_partial.json");
        std::fs::write(&path, b"").unwrap();
        // A read-only handle rejects the write.
        let file = File::open(&path).await.unwrap();

        let err = write_envelope(&path, file, b"{}").await.unwrap_err();

        assert!(matches!(err, WriteError::Io { .. }), "{err:?}");
        assert!(!path.exists());
    }
}
