//! Newtype domain identifiers.
//!
//! Every domain concept that has an identity is represented as a distinct newtype
//! wrapping a primitive. This prevents accidentally interchanging (for example)
//! a [`CollectionName`] with a [`DocumentId`] even though both are strings under
//! the hood.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Identifiers: run identity (internally generated)
// ---------------------------------------------------------------------------

/// Number of hex characters after the `run_` prefix.
const RUN_ID_HEX_LEN: usize = 8;

/// Identifies one execution of the review pipeline.
///
/// Always has the shape `run_<8 lowercase hex chars>`. Generated by the
/// trigger, submitted to the scheduler as the run id, and recorded on every
/// span emitted while the run executes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RunId(String);

impl RunId {
    /// Generates a new random run identifier.
    pub fn generate() -> Self {
        let hex = Uuid::new_v4().simple().to_string();
        Self(format!("run_{}", &hex[..RUN_ID_HEX_LEN]))
    }

    /// Parses an existing run identifier, returning `None` when the value does
    /// not have the `run_<8 hex>` shape.
    pub fn parse(value: &str) -> Option<Self> {
        let hex = value.strip_prefix("run_")?;
        let well_formed = hex.len() == RUN_ID_HEX_LEN
            && hex
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c));
        well_formed.then(|| Self(value.to_string()))
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for RunId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        RunId::parse(&value).ok_or_else(|| format!("malformed run id '{value}'"))
    }
}

impl From<RunId> for String {
    fn from(id: RunId) -> Self {
        id.0
    }
}

// ---------------------------------------------------------------------------
// Identifiers: string-backed (file names, store names, scheduler names)
// ---------------------------------------------------------------------------

string_id! {
    /// Name of a report file inside the staging area (e.g. `"report_A.json"`).
    ///
    /// Only the bare file name is stored; callers resolve it against the
    /// staging directory.
    ReportFileName
}

string_id! {
    /// Name of a critique envelope file inside the done directory
    /// (e.g. `"analyst_review_draft_2026-10-19T10-15-30-123456Z.json"`).
    CritiqueFileName
}

string_id! {
    /// Name of a document store collection (e.g. `"reviews"`).
    CollectionName
}

string_id! {
    /// Identifier generated by the document store for a persisted review document.
    DocumentId
}

string_id! {
    /// Identifies the workflow definition on the scheduler side
    /// (e.g. `"council_review_workflow"`).
    WorkflowId
}

string_id! {
    /// Identifies a tool exposed on the control-plane tool server.
    ToolName
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_run_id_has_prefix_and_eight_hex_chars() {
        let id = RunId::generate();
        let hex = id.as_str().strip_prefix("run_").unwrap();
        assert_eq!(hex.len(), 8);
        assert!(RunId::parse(id.as_str()).is_some());
    }

    #[test]
    fn run_id_parse_rejects_malformed_values() {
        assert!(RunId::parse("run_1234abcd").is_some());
        assert!(RunId::parse("run_1234ABCD").is_none());
        assert!(RunId::parse("run_123").is_none());
        assert!(RunId::parse("job_1234abcd").is_none());
    }

    #[test]
    fn string_ids_reject_empty_values() {
        assert!(CollectionName::new("").is_none());
        let reviews = CollectionName::new("reviews").unwrap();
        assert_eq!(reviews.as_str(), "reviews");
    }
}
