//! Suspension/resume runtimes — where pending review requests live while a
//! human decides.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::request::{DraftReviewRequest, ReviewStatus};
use crate::error::{ApprovalError, DatabaseError};
use crate::profile::ProfileValue;
use crate::store::Database;

/// Outcome of resolving a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The request was no longer pending; nothing was written.
    Stale,
    /// Resolved, and the profile writes were committed with the verdict.
    Persisted,
    /// Resolved; this runtime does not store profile writes.
    Recorded,
}

/// Records pending confirmation requests and their resolution.
///
/// Any failure of the backing mechanism is reported as
/// [`ApprovalError::ConfirmationUnavailable`]; a runtime must never guess a
/// verdict.
#[async_trait]
pub trait ConfirmationRuntime: Send + Sync {
    /// Record a pending request (phase 1 suspend).
    async fn request_confirmation(&self, request: &DraftReviewRequest)
    -> Result<(), ApprovalError>;

    /// The pending request of a session, if any.
    async fn pending(&self, session_id: Uuid) -> Result<Option<DraftReviewRequest>, ApprovalError>;

    /// Mark a pending request approved or rejected, carrying the profile
    /// writes that belong to the verdict.
    async fn resolve(
        &self,
        request: &DraftReviewRequest,
        status: ReviewStatus,
        writes: &BTreeMap<String, ProfileValue>,
    ) -> Result<Resolution, ApprovalError>;
}

fn unavailable(e: DatabaseError) -> ApprovalError {
    ApprovalError::ConfirmationUnavailable {
        reason: e.to_string(),
    }
}

/// Runtime backed by the session database; pending requests survive restarts.
pub struct DurableConfirmations {
    db: Arc<dyn Database>,
}

impl DurableConfirmations {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ConfirmationRuntime for DurableConfirmations {
    async fn request_confirmation(
        &self,
        request: &DraftReviewRequest,
    ) -> Result<(), ApprovalError> {
        match self.db.insert_review_request(request).await {
            Ok(()) => Ok(()),
            Err(DatabaseError::Constraint(_)) => {
                let existing = self
                    .db
                    .get_pending_review(request.session_id)
                    .await
                    .map_err(unavailable)?;
                Err(ApprovalError::AlreadyPending {
                    request_id: existing.map(|r| r.id).unwrap_or(request.id),
                })
            }
            Err(e) => Err(unavailable(e)),
        }
    }

    async fn pending(&self, session_id: Uuid) -> Result<Option<DraftReviewRequest>, ApprovalError> {
        self.db.get_pending_review(session_id).await.map_err(unavailable)
    }

    async fn resolve(
        &self,
        request: &DraftReviewRequest,
        status: ReviewStatus,
        writes: &BTreeMap<String, ProfileValue>,
    ) -> Result<Resolution, ApprovalError> {
        let resolved = self
            .db
            .resolve_review_request(request.session_id, request.id, status, writes)
            .await
            .map_err(unavailable)?;
        Ok(if resolved {
            Resolution::Persisted
        } else {
            Resolution::Stale
        })
    }
}

/// Process-local runtime. Pending requests are lost on restart.
#[derive(Default)]
pub struct InMemoryConfirmations {
    requests: Mutex<HashMap<Uuid, DraftReviewRequest>>,
}

impl InMemoryConfirmations {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConfirmationRuntime for InMemoryConfirmations {
    async fn request_confirmation(
        &self,
        request: &DraftReviewRequest,
    ) -> Result<(), ApprovalError> {
        let mut requests = self.requests.lock().await;
        if let Some(existing) = requests
            .values()
            .find(|r| r.session_id == request.session_id && r.status == ReviewStatus::Pending)
        {
            return Err(ApprovalError::AlreadyPending {
                request_id: existing.id,
            });
        }
        requests.insert(request.id, request.clone());
        Ok(())
    }

    async fn pending(&self, session_id: Uuid) -> Result<Option<DraftReviewRequest>, ApprovalError> {
        Ok(self
            .requests
            .lock()
            .await
            .values()
            .find(|r| r.session_id == session_id && r.status == ReviewStatus::Pending)
            .cloned())
    }

    async fn resolve(
        &self,
        request: &DraftReviewRequest,
        status: ReviewStatus,
        _writes: &BTreeMap<String, ProfileValue>,
    ) -> Result<Resolution, ApprovalError> {
        let mut requests = self.requests.lock().await;
        match requests.get_mut(&request.id) {
            Some(stored) if stored.status == ReviewStatus::Pending => {
                stored.status = status;
                stored.resolved_at = Some(Utc::now());
                Ok(Resolution::Recorded)
            }
            _ => Ok(Resolution::Stale),
        }
    }
}
