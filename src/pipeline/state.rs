//! Draft state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of a generated document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftState {
    /// Raw output of the document writer.
    Drafted,
    /// Prose polished by the refiner.
    Refined,
    /// Suspended at the approval gate.
    PendingReview,
    /// Reviewer accepted the draft.
    Approved,
    /// Reviewer turned the draft down. Revisions start a new pipeline.
    Rejected,
    /// Approved text saved to the profile.
    Finalized,
}

impl DraftState {
    /// Check if this state allows transitioning to another state.
    pub fn can_transition_to(&self, target: DraftState) -> bool {
        use DraftState::*;

        matches!(
            (self, target),
            (Drafted, Refined)
                | (Refined, PendingReview)
                | (PendingReview, Approved)
                | (PendingReview, Rejected)
                | (Approved, Finalized)
        )
    }

    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Finalized)
    }
}

impl std::fmt::Display for DraftState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Drafted => "drafted",
            Self::Refined => "refined",
            Self::PendingReview => "pending_review",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Finalized => "finalized",
        };
        write!(f, "{s}")
    }
}

/// A state transition event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    /// Previous state.
    pub from: DraftState,
    /// New state.
    pub to: DraftState,
    /// When the transition occurred.
    pub timestamp: DateTime<Utc>,
    /// Reason for the transition.
    pub reason: Option<String>,
}
