//! `Database` trait — single async interface for session persistence.

use std::collections::BTreeMap;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::profile::ProfileValue;
use crate::review::{DraftReviewRequest, ReviewStatus};

/// Backend-agnostic persistence for sessions, their committed state, and
/// pending draft reviews.
#[async_trait]
pub trait Database: Send + Sync {
    /// Run all pending schema migrations.
    async fn init_schema(&self) -> Result<(), DatabaseError>;

    // ── Sessions ────────────────────────────────────────────────────

    /// Ensure a session row exists, creating it if needed.
    async fn ensure_session(&self, session_id: Uuid, user_id: &str) -> Result<(), DatabaseError>;

    /// Load the committed state layer of a session. Unknown sessions load empty.
    async fn load_session_state(
        &self,
        session_id: Uuid,
    ) -> Result<BTreeMap<String, ProfileValue>, DatabaseError>;

    /// Upsert committed entries for a session (last write wins per key).
    async fn commit_session_state(
        &self,
        session_id: Uuid,
        entries: &BTreeMap<String, ProfileValue>,
    ) -> Result<(), DatabaseError>;

    // ── Review requests ─────────────────────────────────────────────

    /// Insert a new review request. Fails with `Constraint` if the session
    /// already has a pending one.
    async fn insert_review_request(&self, request: &DraftReviewRequest)
    -> Result<(), DatabaseError>;

    /// Get the pending review request of a session, if any.
    async fn get_pending_review(
        &self,
        session_id: Uuid,
    ) -> Result<Option<DraftReviewRequest>, DatabaseError>;

    /// Move a pending request to a final status and upsert `writes` into the
    /// session's committed state in the same transaction.
    ///
    /// Returns false, with nothing written, if the session has no pending
    /// request with that id.
    async fn resolve_review_request(
        &self,
        session_id: Uuid,
        id: Uuid,
        status: ReviewStatus,
        writes: &BTreeMap<String, ProfileValue>,
    ) -> Result<bool, DatabaseError>;
}
