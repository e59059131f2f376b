//! libSQL backend — async `Database` trait implementation.
//!
//! Supports local file and in-memory databases.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase, Transaction, params};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::profile::ProfileValue;
use crate::review::{DocumentType, DraftReviewRequest, ReviewStatus};
use crate::store::migrations;
use crate::store::traits::Database;

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        backend.init_schema().await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        backend.init_schema().await?;
        Ok(backend)
    }

    /// Get the connection.
    fn conn(&self) -> &Connection {
        &self.conn
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

/// Map a libsql Row to a DraftReviewRequest.
///
/// Column order matches REVIEW_COLUMNS:
/// 0:id, 1:session_id, 2:document_type, 3:draft_text, 4:hint, 5:status,
/// 6:created_at, 7:resolved_at
fn row_to_review(row: &libsql::Row) -> Result<DraftReviewRequest, DatabaseError> {
    let text = |idx: i32| -> Result<String, DatabaseError> {
        row.get::<String>(idx)
            .map_err(|e| DatabaseError::Serialization(format!("review column {idx}: {e}")))
    };

    let id = Uuid::parse_str(&text(0)?)
        .map_err(|e| DatabaseError::Serialization(format!("review id: {e}")))?;
    let session_id = Uuid::parse_str(&text(1)?)
        .map_err(|e| DatabaseError::Serialization(format!("review session_id: {e}")))?;
    let document_type: DocumentType = text(2)?
        .parse()
        .map_err(DatabaseError::Serialization)?;
    let status: ReviewStatus = text(5)?.parse().map_err(DatabaseError::Serialization)?;
    let resolved_at: Option<String> = row.get(7).ok();

    Ok(DraftReviewRequest {
        id,
        session_id,
        document_type,
        draft_text: text(3)?,
        hint: text(4)?,
        status,
        created_at: parse_datetime(&text(6)?),
        resolved_at: resolved_at.as_deref().map(parse_datetime),
    })
}

/// Upsert entries into `session_state` and touch the session row.
async fn upsert_state(
    tx: &Transaction,
    session_id: Uuid,
    entries: &BTreeMap<String, ProfileValue>,
    op: &str,
) -> Result<(), DatabaseError> {
    let now = Utc::now().to_rfc3339();
    for (key, value) in entries {
        let value_str = serde_json::to_string(&value.to_json())
            .map_err(|e| DatabaseError::Serialization(e.to_string()))?;
        tx.execute(
            "INSERT INTO session_state (session_id, key, value, updated_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (session_id, key) DO UPDATE SET value = ?3, updated_at = ?4",
            params![session_id.to_string(), key.as_str(), value_str, now.as_str()],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("{op}: {e}")))?;
    }

    tx.execute(
        "UPDATE sessions SET updated_at = ?2 WHERE id = ?1",
        params![session_id.to_string(), now.as_str()],
    )
    .await
    .map_err(|e| DatabaseError::Query(format!("{op}: {e}")))?;
    Ok(())
}

// ── Trait implementation ────────────────────────────────────────────

const REVIEW_COLUMNS: &str =
    "id, session_id, document_type, draft_text, hint, status, created_at, resolved_at";

#[async_trait]
impl Database for LibSqlBackend {
    async fn init_schema(&self) -> Result<(), DatabaseError> {
        migrations::run_migrations(self.conn()).await
    }

    // ── Sessions ────────────────────────────────────────────────────

    async fn ensure_session(&self, session_id: Uuid, user_id: &str) -> Result<(), DatabaseError> {
        let now = Utc::now().to_rfc3339();
        self.conn()
            .execute(
                "INSERT INTO sessions (id, user_id, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)
                 ON CONFLICT (id) DO NOTHING",
                params![session_id.to_string(), user_id, now],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("ensure_session: {e}")))?;
        Ok(())
    }

    async fn load_session_state(
        &self,
        session_id: Uuid,
    ) -> Result<BTreeMap<String, ProfileValue>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT key, value FROM session_state WHERE session_id = ?1",
                params![session_id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("load_session_state: {e}")))?;

        let mut state = BTreeMap::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("load_session_state: {e}")))?
        {
            let key: String = row
                .get(0)
                .map_err(|e| DatabaseError::Serialization(format!("state key: {e}")))?;
            let value_str: String = row
                .get(1)
                .map_err(|e| DatabaseError::Serialization(format!("state value {key}: {e}")))?;
            let value: serde_json::Value = serde_json::from_str(&value_str)
                .map_err(|e| DatabaseError::Serialization(format!("state value {key}: {e}")))?;
            state.insert(key, ProfileValue::from_json(value));
        }

        debug!(session_id = %session_id, keys = state.len(), "Session state loaded");
        Ok(state)
    }

    async fn commit_session_state(
        &self,
        session_id: Uuid,
        entries: &BTreeMap<String, ProfileValue>,
    ) -> Result<(), DatabaseError> {
        if entries.is_empty() {
            return Ok(());
        }

        let tx = self
            .conn()
            .transaction()
            .await
            .map_err(|e| DatabaseError::Query(format!("commit_session_state: {e}")))?;
        upsert_state(&tx, session_id, entries, "commit_session_state").await?;
        tx.commit()
            .await
            .map_err(|e| DatabaseError::Query(format!("commit_session_state: {e}")))?;
        Ok(())
    }

    // ── Review requests ─────────────────────────────────────────────

    async fn insert_review_request(
        &self,
        request: &DraftReviewRequest,
    ) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                "INSERT INTO review_requests (id, session_id, document_type, draft_text, hint, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    request.id.to_string(),
                    request.session_id.to_string(),
                    request.document_type.to_string(),
                    request.draft_text.as_str(),
                    request.hint.as_str(),
                    request.status.to_string(),
                    request.created_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| {
                let msg = e.to_string();
                if msg.contains("UNIQUE") {
                    DatabaseError::Constraint(format!(
                        "session {} already has a pending review",
                        request.session_id
                    ))
                } else {
                    DatabaseError::Query(format!("insert_review_request: {msg}"))
                }
            })?;
        Ok(())
    }

    async fn get_pending_review(
        &self,
        session_id: Uuid,
    ) -> Result<Option<DraftReviewRequest>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {REVIEW_COLUMNS} FROM review_requests
                     WHERE session_id = ?1 AND status = 'pending'
                     ORDER BY created_at DESC LIMIT 1"
                ),
                params![session_id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_pending_review: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_review(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_pending_review: {e}"))),
        }
    }

    async fn resolve_review_request(
        &self,
        session_id: Uuid,
        id: Uuid,
        status: ReviewStatus,
        writes: &BTreeMap<String, ProfileValue>,
    ) -> Result<bool, DatabaseError> {
        let tx = self
            .conn()
            .transaction()
            .await
            .map_err(|e| DatabaseError::Query(format!("resolve_review_request: {e}")))?;

        let count = tx
            .execute(
                "UPDATE review_requests SET status = ?3, resolved_at = ?4
                 WHERE id = ?1 AND session_id = ?2 AND status = 'pending'",
                params![
                    id.to_string(),
                    session_id.to_string(),
                    status.to_string(),
                    Utc::now().to_rfc3339()
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("resolve_review_request: {e}")))?;

        if count == 0 {
            tx.rollback()
                .await
                .map_err(|e| DatabaseError::Query(format!("resolve_review_request: {e}")))?;
            return Ok(false);
        }

        upsert_state(&tx, session_id, writes, "resolve_review_request").await?;
        tx.commit()
            .await
            .map_err(|e| DatabaseError::Query(format!("resolve_review_request: {e}")))?;
        debug!(
            session_id = %session_id,
            request_id = %id,
            verdict = %status,
            writes = writes.len(),
            "Review request resolved"
        );
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> LibSqlBackend {
        LibSqlBackend::new_memory().await.unwrap()
    }

    // ── Session state tests ─────────────────────────────────────────

    #[tokio::test]
    async fn session_state_roundtrip() {
        let db = test_db().await;
        let session_id = Uuid::new_v4();
        db.ensure_session(session_id, "user1").await.unwrap();

        let mut entries = BTreeMap::new();
        entries.insert("user:name".to_string(), ProfileValue::from("Imon"));
        entries.insert("user:age".to_string(), ProfileValue::from(24_i64));
        entries.insert("user:funded".to_string(), ProfileValue::from(true));
        db.commit_session_state(session_id, &entries).await.unwrap();

        let loaded = db.load_session_state(session_id).await.unwrap();
        assert_eq!(loaded, entries);
    }

    #[tokio::test]
    async fn session_state_upserts() {
        let db = test_db().await;
        let session_id = Uuid::new_v4();
        db.ensure_session(session_id, "user1").await.unwrap();

        let mut first = BTreeMap::new();
        first.insert("user:degree".to_string(), ProfileValue::from("MSc"));
        db.commit_session_state(session_id, &first).await.unwrap();

        let mut second = BTreeMap::new();
        second.insert("user:degree".to_string(), ProfileValue::from("PhD"));
        db.commit_session_state(session_id, &second).await.unwrap();

        let loaded = db.load_session_state(session_id).await.unwrap();
        assert_eq!(loaded["user:degree"], ProfileValue::from("PhD"));
    }

    #[tokio::test]
    async fn session_state_isolation() {
        let db = test_db().await;
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        db.ensure_session(a, "user1").await.unwrap();
        db.ensure_session(b, "user1").await.unwrap();

        let mut entries = BTreeMap::new();
        entries.insert("user:name".to_string(), ProfileValue::from("A"));
        db.commit_session_state(a, &entries).await.unwrap();

        assert!(db.load_session_state(b).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn ensure_session_is_idempotent() {
        let db = test_db().await;
        let id = Uuid::new_v4();
        db.ensure_session(id, "user1").await.unwrap();
        db.ensure_session(id, "user1").await.unwrap();
    }

    // ── Review request tests ────────────────────────────────────────

    #[tokio::test]
    async fn corrupt_state_value_is_a_serialization_error() {
        let db = test_db().await;
        let session_id = Uuid::new_v4();
        db.ensure_session(session_id, "user1").await.unwrap();
        db.conn()
            .execute(
                "INSERT INTO session_state (session_id, key, value) VALUES (?1, 'user:name', '{not json')",
                params![session_id.to_string()],
            )
            .await
            .unwrap();

        let err = db.load_session_state(session_id).await.unwrap_err();
        assert!(matches!(err, DatabaseError::Serialization(_)));
    }

    // ── Review request tests ────────────────────────────────────────

    #[tokio::test]
    async fn review_request_insert_and_load_pending() {
        let db = test_db().await;
        let request = DraftReviewRequest::new(Uuid::new_v4(), DocumentType::Sop, "My SOP");
        db.insert_review_request(&request).await.unwrap();

        let fetched = db
            .get_pending_review(request.session_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.id, request.id);
        assert_eq!(fetched.document_type, DocumentType::Sop);
        assert_eq!(fetched.draft_text, "My SOP");
        assert_eq!(fetched.hint, "Review SOP Draft");
        assert_eq!(fetched.status, ReviewStatus::Pending);
        assert!(fetched.resolved_at.is_none());
    }

    #[tokio::test]
    async fn only_one_pending_review_per_session() {
        let db = test_db().await;
        let session_id = Uuid::new_v4();
        db.insert_review_request(&DraftReviewRequest::new(session_id, DocumentType::Sop, "one"))
            .await
            .unwrap();

        let err = db
            .insert_review_request(&DraftReviewRequest::new(session_id, DocumentType::Cv, "two"))
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Constraint(_)));
    }

    #[tokio::test]
    async fn resolve_review_request_once() {
        let db = test_db().await;
        let request = DraftReviewRequest::new(Uuid::new_v4(), DocumentType::Cv, "CV");
        db.ensure_session(request.session_id, "user1").await.unwrap();
        db.insert_review_request(&request).await.unwrap();
        let none = BTreeMap::new();

        assert!(db
            .resolve_review_request(request.session_id, request.id, ReviewStatus::Approved, &none)
            .await
            .unwrap());
        assert!(db.get_pending_review(request.session_id).await.unwrap().is_none());

        // Already resolved: the late writes are dropped with it.
        let late = BTreeMap::from([("user:last_cv".to_string(), ProfileValue::from("late"))]);
        assert!(!db
            .resolve_review_request(request.session_id, request.id, ReviewStatus::Rejected, &late)
            .await
            .unwrap());
        assert!(db.load_session_state(request.session_id).await.unwrap().is_empty());

        // A new pending request is allowed once the old one is resolved.
        db.insert_review_request(&DraftReviewRequest::new(
            request.session_id,
            DocumentType::Cv,
            "CV v2",
        ))
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn resolve_commits_writes_with_the_verdict() {
        let db = test_db().await;
        let request = DraftReviewRequest::new(Uuid::new_v4(), DocumentType::Sop, "SOP");
        db.ensure_session(request.session_id, "user1").await.unwrap();
        db.insert_review_request(&request).await.unwrap();

        let writes = BTreeMap::from([("user:last_sop".to_string(), ProfileValue::from("SOP"))]);
        assert!(db
            .resolve_review_request(request.session_id, request.id, ReviewStatus::Approved, &writes)
            .await
            .unwrap());

        assert_eq!(db.load_session_state(request.session_id).await.unwrap(), writes);
    }

    #[tokio::test]
    async fn resolve_ignores_request_of_another_session() {
        let db = test_db().await;
        let request = DraftReviewRequest::new(Uuid::new_v4(), DocumentType::Sop, "SOP");
        db.insert_review_request(&request).await.unwrap();

        let other = Uuid::new_v4();
        let writes = BTreeMap::from([("user:last_sop".to_string(), ProfileValue::from("SOP"))]);
        assert!(!db
            .resolve_review_request(other, request.id, ReviewStatus::Approved, &writes)
            .await
            .unwrap());
        assert!(db.get_pending_review(request.session_id).await.unwrap().is_some());
        assert!(db.load_session_state(other).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn local_file_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.db");
        let session_id = Uuid::new_v4();
        let request = DraftReviewRequest::new(session_id, DocumentType::Sop, "persisted");

        {
            let db = LibSqlBackend::new_local(&path).await.unwrap();
            db.insert_review_request(&request).await.unwrap();
        }

        let db = LibSqlBackend::new_local(&path).await.unwrap();
        let pending = db.get_pending_review(session_id).await.unwrap().unwrap();
        assert_eq!(pending.draft_text, "persisted");
    }
}
