//! Run lifecycle state machine.
//!
//! A run moves strictly forward through
//! `Pending -> Stage1Pushed -> Reflected -> Finalized`. `Failed` is absorbing
//! and reachable from every non-terminal state.

use serde::{Deserialize, Serialize};

/// Lifecycle state of one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// Inputs resolved, no stage completed yet.
    Pending,
    /// The initial review document has been persisted.
    Stage1Pushed,
    /// The language model returned a reflection.
    Reflected,
    /// The final review document has been persisted.
    Finalized,
    /// A stage exhausted its attempts.
    Failed,
}

impl RunState {
    /// Returns the state that follows a successful stage, or `None` when the
    /// state is terminal.
    pub fn successor(self) -> Option<RunState> {
        match self {
            RunState::Pending => Some(RunState::Stage1Pushed),
            RunState::Stage1Pushed => Some(RunState::Reflected),
            RunState::Reflected => Some(RunState::Finalized),
            RunState::Finalized | RunState::Failed => None,
        }
    }

    /// Returns `true` if no further transition is possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Finalized | RunState::Failed)
    }

    /// Returns `true` if moving from `self` to `next` is permitted.
    pub fn can_transition_to(self, next: RunState) -> bool {
        if next == RunState::Failed {
            return !self.is_terminal();
        }
        self.successor() == Some(next)
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            RunState::Pending => "PENDING",
            RunState::Stage1Pushed => "STAGE1_PUSHED",
            RunState::Reflected => "REFLECTED",
            RunState::Finalized => "FINALIZED",
            RunState::Failed => "FAILED",
        };
        f.write_str(label)
    }
}
