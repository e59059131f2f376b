//! Document pipeline — one draft from writer output to finalized profile entry.
//!
//! Order is enforced: refine before review, review before anything is saved.
//! A rejected draft is terminal; revising it means starting a new pipeline.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use super::state::{DraftState, StateTransition};
use crate::error::PipelineError;
use crate::profile::{ProfileValue, USER_PREFIX};
use crate::review::{
    ApprovalGate, ConfirmationState, DocumentType, DraftReviewRequest, Resolution,
    ReviewResponse, ReviewStatus,
};
use crate::session::Session;

/// Text-rewriting collaborator.
///
/// Implementations must keep the factual content and only change grammar,
/// concision, tone and structure. That contract is not checked here.
#[async_trait]
pub trait Refiner: Send + Sync {
    async fn refine(&self, text: &str) -> Result<String, PipelineError>;
}

/// A single document moving through draft → refine → review → finalize.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftPipeline {
    pub id: Uuid,
    pub session_id: Uuid,
    pub document_type: DocumentType,
    text: String,
    state: DraftState,
    /// Resumption token of the review request, once submitted.
    request_id: Option<Uuid>,
    transitions: Vec<StateTransition>,
}

impl DraftPipeline {
    /// Start a pipeline from a freshly generated draft.
    pub fn new(session_id: Uuid, document_type: DocumentType, draft: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id,
            document_type,
            text: draft.into(),
            state: DraftState::Drafted,
            request_id: None,
            transitions: Vec::new(),
        }
    }

    /// Start from text the agent runtime has already refined.
    pub fn from_refined(
        session_id: Uuid,
        document_type: DocumentType,
        refined: impl Into<String>,
    ) -> Self {
        let mut pipeline = Self::new(session_id, document_type, refined);
        pipeline.state = DraftState::Refined;
        pipeline.transitions.push(StateTransition {
            from: DraftState::Drafted,
            to: DraftState::Refined,
            timestamp: Utc::now(),
            reason: Some("refined by caller".into()),
        });
        pipeline
    }

    /// Rebuild a pipeline suspended at review, e.g. after a restart.
    pub fn resume(request: &DraftReviewRequest) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id: request.session_id,
            document_type: request.document_type,
            text: request.draft_text.clone(),
            state: DraftState::PendingReview,
            request_id: Some(request.id),
            transitions: Vec::new(),
        }
    }

    pub fn state(&self) -> DraftState {
        self.state
    }

    /// Current text: the raw draft until refined, the refined text after.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn request_id(&self) -> Option<Uuid> {
        self.request_id
    }

    pub fn transitions(&self) -> &[StateTransition] {
        &self.transitions
    }

    fn ensure_can(&self, target: DraftState) -> Result<(), PipelineError> {
        if self.state.can_transition_to(target) {
            Ok(())
        } else {
            Err(PipelineError::InvalidTransition {
                id: self.id,
                from: self.state.to_string(),
                to: target.to_string(),
            })
        }
    }

    fn transition_to(
        &mut self,
        target: DraftState,
        reason: Option<String>,
    ) -> Result<(), PipelineError> {
        self.ensure_can(target)?;
        self.transitions.push(StateTransition {
            from: self.state,
            to: target,
            timestamp: Utc::now(),
            reason,
        });
        self.state = target;
        Ok(())
    }

    /// DRAFTED → REFINED through the refiner.
    pub async fn refine(&mut self, refiner: &dyn Refiner) -> Result<&str, PipelineError> {
        self.ensure_can(DraftState::Refined)?;

        let refined = refiner.refine(&self.text).await?;
        if refined.trim().is_empty() {
            return Err(PipelineError::EmptyRefinement);
        }

        self.text = refined;
        self.transition_to(DraftState::Refined, None)?;
        Ok(&self.text)
    }

    /// REFINED → PENDING_REVIEW: suspend at the gate.
    pub async fn review(&mut self, gate: &ApprovalGate) -> Result<ReviewResponse, PipelineError> {
        self.ensure_can(DraftState::PendingReview)?;

        let response = gate
            .submit_for_review(self.session_id, &self.text, self.document_type, None)
            .await?;
        if let ReviewResponse::PendingReview { request_id, .. } = &response {
            self.request_id = Some(*request_id);
        }
        self.transition_to(DraftState::PendingReview, None)?;
        Ok(response)
    }

    /// PENDING_REVIEW → APPROVED | REJECTED with the reviewer's verdict, then
    /// APPROVED → FINALIZED when the verdict resolved the pending request.
    ///
    /// The approved text travels with the verdict as `last_sop` / `last_cv`.
    /// A durable runtime commits it in the same transaction as the
    /// resolution and it is folded into the session's base; otherwise it
    /// lands in the session's delta. A verdict for a request that is no
    /// longer pending saves nothing and leaves the pipeline APPROVED.
    pub async fn decide(
        &mut self,
        gate: &ApprovalGate,
        confirmation: &ConfirmationState,
        session: &mut Session,
    ) -> Result<ReviewResponse, PipelineError> {
        if self.state != DraftState::PendingReview {
            return Err(PipelineError::InvalidTransition {
                id: self.id,
                from: self.state.to_string(),
                to: if confirmation.confirmed {
                    DraftState::Approved.to_string()
                } else {
                    DraftState::Rejected.to_string()
                },
            });
        }

        // Bind the verdict to our own request unless the caller already did.
        let confirmation = match (confirmation.request_id, self.request_id) {
            (None, Some(id)) => confirmation.clone().for_request(id),
            _ => confirmation.clone(),
        };

        let field = self.document_type.profile_field();
        let writes = BTreeMap::from([(
            format!("{USER_PREFIX}{field}"),
            ProfileValue::Text(self.text.clone()),
        )]);
        let verdict = gate
            .apply_verdict(
                self.session_id,
                &self.text,
                self.document_type,
                &confirmation,
                &writes,
            )
            .await?;

        if verdict.response.status() != ReviewStatus::Approved {
            self.transition_to(DraftState::Rejected, Some("reviewer rejected".into()))?;
            return Ok(verdict.response);
        }
        self.transition_to(DraftState::Approved, Some("reviewer approved".into()))?;

        match verdict.resolution {
            Some(Resolution::Persisted) => session.state.absorb(writes),
            Some(Resolution::Recorded) => {
                session
                    .state
                    .save_profile([(field, ProfileValue::Text(self.text.clone()))]);
            }
            Some(Resolution::Stale) | None => {
                warn!(
                    session_id = %self.session_id,
                    document_type = %self.document_type,
                    "Approval did not resolve a pending request, draft not saved"
                );
                return Ok(verdict.response);
            }
        }
        self.transition_to(DraftState::Finalized, None)?;

        info!(
            session_id = %self.session_id,
            document_type = %self.document_type,
            field,
            "Approved draft finalized"
        );
        Ok(verdict.response)
    }
}
