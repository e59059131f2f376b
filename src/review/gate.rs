//! Approval gate — two-phase human review of a draft.
//!
//! Phase 1 (no confirmation state): record a pending request with the
//! runtime and return `pending_review` immediately. The caller suspends its
//! workflow until a human answers.
//!
//! Phase 2 (confirmation state present): the same logical call is replayed
//! with the verdict attached. The gate resolves the pending request and
//! returns `approved` or `rejected`; it never returns `pending_review` here.
//! Profile writes that belong to an approval are handed to the runtime with
//! the resolution, so the verdict and the saved document land together.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use super::request::{
    ConfirmationState, DocumentType, DraftReviewRequest, ReviewResponse, ReviewStatus,
};
use super::runtime::{ConfirmationRuntime, Resolution};
use crate::error::ApprovalError;
use crate::profile::ProfileValue;

const APPROVED_MESSAGE: &str =
    "The human APPROVED the draft. You can now finalize formatting and output the result.";
const REJECTED_MESSAGE: &str =
    "The human REJECTED the draft. Please ask the user for specific feedback on what to change.";

/// A verdict applied by the gate.
#[derive(Debug, Clone)]
pub struct Verdict {
    pub response: ReviewResponse,
    /// `None` when the session had nothing pending.
    pub resolution: Option<Resolution>,
}

/// Human-in-the-loop gate in front of document finalization.
pub struct ApprovalGate {
    runtime: Arc<dyn ConfirmationRuntime>,
}

impl ApprovalGate {
    pub fn new(runtime: Arc<dyn ConfirmationRuntime>) -> Self {
        Self { runtime }
    }

    /// Submit a draft for review, or apply the verdict on the resumed call.
    pub async fn submit_for_review(
        &self,
        session_id: Uuid,
        draft_text: &str,
        document_type: DocumentType,
        confirmation: Option<&ConfirmationState>,
    ) -> Result<ReviewResponse, ApprovalError> {
        match confirmation {
            None => self.suspend(session_id, draft_text, document_type).await,
            Some(state) => {
                let verdict = self
                    .apply_verdict(session_id, draft_text, document_type, state, &BTreeMap::new())
                    .await?;
                Ok(verdict.response)
            }
        }
    }

    /// Apply the reviewer's verdict to the session's pending request.
    ///
    /// `writes` are committed with the resolution when the verdict is an
    /// approval and discarded otherwise.
    pub async fn apply_verdict(
        &self,
        session_id: Uuid,
        draft_text: &str,
        document_type: DocumentType,
        state: &ConfirmationState,
        writes: &BTreeMap<String, ProfileValue>,
    ) -> Result<Verdict, ApprovalError> {
        let status = if state.confirmed {
            ReviewStatus::Approved
        } else {
            ReviewStatus::Rejected
        };

        let resolution = match self.runtime.pending(session_id).await? {
            Some(pending) => {
                if let Some(got) = state.request_id
                    && got != pending.id
                {
                    return Err(ApprovalError::RequestMismatch {
                        expected: pending.id,
                        got,
                    });
                }

                // Drift between the paused and resumed call is tolerated, only logged.
                if pending.draft_text != draft_text || pending.document_type != document_type {
                    warn!(
                        session_id = %session_id,
                        request_id = %pending.id,
                        "Resumed draft differs from the one submitted for review"
                    );
                }

                let empty = BTreeMap::new();
                let writes = if status == ReviewStatus::Approved {
                    writes
                } else {
                    &empty
                };
                let resolution = self.runtime.resolve(&pending, status, writes).await?;
                if resolution == Resolution::Stale {
                    warn!(request_id = %pending.id, "Review request was already resolved");
                }

                info!(
                    session_id = %session_id,
                    request_id = %pending.id,
                    verdict = %status,
                    "Human review verdict applied"
                );
                Some(resolution)
            }
            None => {
                warn!(
                    session_id = %session_id,
                    verdict = %status,
                    "Review verdict delivered with no pending request"
                );
                None
            }
        };

        let response = match status {
            ReviewStatus::Approved => ReviewResponse::Approved {
                message: APPROVED_MESSAGE.to_string(),
            },
            _ => ReviewResponse::Rejected {
                message: REJECTED_MESSAGE.to_string(),
            },
        };
        Ok(Verdict {
            response,
            resolution,
        })
    }

    /// The pending request of a session, if any.
    pub async fn pending(&self, session_id: Uuid) -> Result<Option<DraftReviewRequest>, ApprovalError> {
        self.runtime.pending(session_id).await
    }

    async fn suspend(
        &self,
        session_id: Uuid,
        draft_text: &str,
        document_type: DocumentType,
    ) -> Result<ReviewResponse, ApprovalError> {
        if let Some(existing) = self.runtime.pending(session_id).await? {
            return Err(ApprovalError::AlreadyPending {
                request_id: existing.id,
            });
        }

        let request = DraftReviewRequest::new(session_id, document_type, draft_text);
        self.runtime.request_confirmation(&request).await?;

        info!(
            session_id = %session_id,
            request_id = %request.id,
            document_type = %document_type,
            hint = %request.hint,
            "Draft submitted for human review"
        );

        Ok(ReviewResponse::PendingReview {
            message: format!(
                "Draft submitted. Waiting for human feedback on: {}",
                document_type
            ),
            request_id: request.id,
        })
    }
}
