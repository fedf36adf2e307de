//! Shared value types for the council review domain.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types carry
//! the payloads that flow through the pipeline: staged reports, critiques and
//! their envelopes, and the review documents persisted to the trail store.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{CritiqueFileName, ReportFileName};

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly; the underlying representation can change without affecting the
/// domain API. Serialises as ISO-8601 with a `Z` suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a [`Timestamp`] from a [`DateTime<Utc>`].
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Returns the underlying [`DateTime<Utc>`].
    pub fn as_datetime(self) -> DateTime<Utc> {
        self.0
    }

    /// Returns this timestamp shifted `seconds` into the future.
    pub fn plus_seconds(self, seconds: i64) -> Self {
        Self(self.0 + Duration::seconds(seconds))
    }

    /// ISO-8601 rendering with microsecond precision and a `Z` suffix.
    pub fn to_iso_z(self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    /// Rendering usable inside a file name: `:` and `.` become `-`.
    pub fn to_file_safe(self) -> String {
        self.to_iso_z().replace([':', '.'], "-")
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_iso_z())
    }
}

// ---------------------------------------------------------------------------
// Staged input
// ---------------------------------------------------------------------------

/// An analyst report as dropped into the staging area by the ingestion tool.
///
/// The content is opaque to this system; it is carried verbatim from the
/// staging file into the review documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StagedReport(Value);

impl StagedReport {
    /// Wraps an already parsed JSON value.
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Returns the report content.
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Consumes the report and returns its content.
    pub fn into_value(self) -> Value {
        self.0
    }
}

// ---------------------------------------------------------------------------
// Critique
// ---------------------------------------------------------------------------

/// Integer risk score assigned to an analyst report by the reviewing agent.
///
/// No range is imposed; the calling agent decides the scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RiskScore(i64);

impl RiskScore {
    /// Creates a [`RiskScore`] from a raw integer.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the underlying integer value.
    pub fn as_i64(self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for RiskScore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The first-pass critique of a staged report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Critique {
    /// Numeric risk assessment.
    pub risk_score: RiskScore,
    /// Free-text assessment.
    pub critique_summary: String,
}

/// Envelope metadata written alongside every critique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CritiqueMeta {
    /// When the critique was saved.
    pub timestamp: Timestamp,
}

/// The on-disk shape of a saved critique: `{meta: {timestamp}, audit: {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CritiqueEnvelope {
    /// Write-time metadata.
    pub meta: CritiqueMeta,
    /// The critique itself.
    pub audit: Critique,
}

impl CritiqueEnvelope {
    /// Wraps `critique` with `timestamp` as its metadata.
    pub fn new(critique: Critique, timestamp: Timestamp) -> Self {
        Self {
            meta: CritiqueMeta { timestamp },
            audit: critique,
        }
    }
}

// ---------------------------------------------------------------------------
// Review documents
// ---------------------------------------------------------------------------

/// Everything the pipeline stages need, loaded once before the first stage.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewInputs {
    /// Staging file the report was read from.
    pub report_file: ReportFileName,
    /// The staged analyst report.
    pub report: StagedReport,
    /// Done-directory file the critique was read from.
    pub critique_file: CritiqueFileName,
    /// The saved critique envelope.
    pub critique: CritiqueEnvelope,
}

/// The unit persisted to the review trail store.
///
/// The initial document has no reflection; the final document carries the
/// model's reflection text. `timestamp` is assigned when the document is
/// built for writing, so the two documents of one run carry different
/// timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewDocument {
    /// The staged analyst report.
    pub analyst_review: StagedReport,
    /// The critique envelope produced by the reviewing agent.
    pub claude_critique: CritiqueEnvelope,
    /// Reflection produced by the language model (final document only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gemini_reflect: Option<String>,
    /// Write time.
    pub timestamp: Timestamp,
}

impl ReviewDocument {
    /// Builds the initial document pushed by the first stage.
    pub fn initial(inputs: &ReviewInputs, timestamp: Timestamp) -> Self {
        Self {
            analyst_review: inputs.report.clone(),
            claude_critique: inputs.critique.clone(),
            gemini_reflect: None,
            timestamp,
        }
    }

    /// Builds the final document pushed by the last stage.
    pub fn finalized(inputs: &ReviewInputs, reflection: &str, timestamp: Timestamp) -> Self {
        Self {
            gemini_reflect: Some(reflection.to_string()),
            ..Self::initial(inputs, timestamp)
        }
    }

    /// Serialises the document into a JSON value for the store.
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

// ---------------------------------------------------------------------------
// Run configuration
// ---------------------------------------------------------------------------

/// Reason given when no staged report is available for a run.
pub const NO_STAGED_REPORT: &str = "no staged report";

/// Reason given when no saved critique is available for a run.
pub const NO_SAVED_CRITIQUE: &str = "no saved critique";

/// The `conf` payload submitted with every run.
///
/// Pins the exact input files at trigger time so the stages never rescan the
/// shared directories. Either field may be absent, in which case the
/// orchestrator falls back to its selection policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConf {
    /// Staged report to review.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_file: Option<ReportFileName>,
    /// Critique envelope to merge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub critique_file: Option<CritiqueFileName>,
}

impl RunConf {
    /// Names the first input this configuration does not pin, if any.
    pub fn missing_input(&self) -> Option<&'static str> {
        match (&self.report_file, &self.critique_file) {
            (None, _) => Some(NO_STAGED_REPORT),
            (_, None) => Some(NO_SAVED_CRITIQUE),
            (Some(_), Some(_)) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    fn fixed_time() -> Timestamp {
        Timestamp::from_utc(Utc.with_ymd_and_hms(2026, 10, 19, 10, 15, 30).unwrap())
    }

    #[test]
    fn file_safe_timestamp_has_no_colons_or_periods() {
        let rendered = fixed_time().to_file_safe();
        assert_eq!(rendered, "2026-10-19T10-15-30-000000Z");
    }

    #[test]
    fn envelope_serialises_with_meta_and_audit() {
        let envelope = CritiqueEnvelope::new(
            Critique {
                risk_score: RiskScore::new(7),
                critique_summary: "Overly optimistic".to_string(),
            },
            fixed_time(),
        );
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["audit"]["risk_score"], json!(7));
        assert_eq!(
            value["audit"]["critique_summary"],
            json!("Overly optimistic")
        );
        assert!(value["meta"]["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn initial_document_omits_reflection_and_final_document_carries_it() {
        let inputs = ReviewInputs {
            report_file: ReportFileName::new("report_A.json").unwrap(),
            report: StagedReport::new(json!({"ticker": "XYZ"})),
            critique_file: CritiqueFileName::new("analyst_review_draft_x.json").unwrap(),
            critique: CritiqueEnvelope::new(
                Critique {
                    risk_score: RiskScore::new(3),
                    critique_summary: "fine".to_string(),
                },
                fixed_time(),
            ),
        };

        let initial = ReviewDocument::initial(&inputs, fixed_time())
            .to_value()
            .unwrap();
        assert!(initial.get("gemini_reflect").is_none());
        assert_eq!(initial["analyst_review"], json!({"ticker": "XYZ"}));

        let later = fixed_time().plus_seconds(5);
        let last = ReviewDocument::finalized(&inputs, "reflection", later);
        assert_eq!(last.gemini_reflect.as_deref(), Some("reflection"));
        assert_ne!(last.timestamp, fixed_time());
    }

    #[test]
    fn run_conf_names_the_first_missing_input() {
        let report = ReportFileName::new("report_A.json");
        let critique = CritiqueFileName::new("analyst_review_draft_x.json");

        assert_eq!(RunConf::default().missing_input(), Some(NO_STAGED_REPORT));
        let only_report = RunConf {
            report_file: report.clone(),
            critique_file: None,
        };
        assert_eq!(only_report.missing_input(), Some(NO_SAVED_CRITIQUE));
        let complete = RunConf {
            report_file: report,
            critique_file: critique,
        };
        assert_eq!(complete.missing_input(), None);
    }
}
