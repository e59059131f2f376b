//! Sessions — explicit per-conversation state handles.
//!
//! Every operation that reads or writes user facts takes a [`Session`]; there
//! is no process-wide state. The [`SessionManager`] hands out one
//! `Arc<Mutex<Session>>` per live session so writes within a session are
//! applied one at a time, in call order.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::profile::SessionState;
use crate::store::Database;

/// One conversation's state.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub state: SessionState,
}

impl Session {
    /// Fresh session with empty state.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self::with_state(Uuid::new_v4(), user_id, SessionState::new())
    }

    /// Session with a known id and already-loaded state.
    pub fn with_state(id: Uuid, user_id: impl Into<String>, state: SessionState) -> Self {
        Self {
            id,
            user_id: user_id.into(),
            created_at: Utc::now(),
            state,
        }
    }
}

/// Loads, caches and commits sessions against the store.
pub struct SessionManager {
    db: Arc<dyn Database>,
    sessions: RwLock<HashMap<Uuid, Arc<Mutex<Session>>>>,
}

impl SessionManager {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self {
            db,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Get a live session, loading its committed state on first access.
    pub async fn get_or_load(
        &self,
        session_id: Uuid,
        user_id: &str,
    ) -> Result<Arc<Mutex<Session>>, DatabaseError> {
        if let Some(session) = self.sessions.read().await.get(&session_id) {
            return Ok(Arc::clone(session));
        }

        self.db.ensure_session(session_id, user_id).await?;
        let base = self.db.load_session_state(session_id).await?;
        debug!(session_id = %session_id, keys = base.len(), "Session loaded");

        let session = Session::with_state(session_id, user_id, SessionState::with_base(base));
        let mut sessions = self.sessions.write().await;
        let entry = sessions
            .entry(session_id)
            .or_insert_with(|| Arc::new(Mutex::new(session)));
        Ok(Arc::clone(entry))
    }

    /// Persist the session's uncommitted writes, then fold them into its base.
    ///
    /// On failure the delta is left in place so nothing is lost.
    pub async fn commit(&self, session: &mut Session) -> Result<usize, DatabaseError> {
        if !session.state.is_dirty() {
            return Ok(0);
        }

        self.db
            .commit_session_state(session.id, session.state.delta())
            .await?;
        let committed = session.state.commit().len();
        info!(session_id = %session.id, keys = committed, "Session state committed");
        Ok(committed)
    }

    /// Drop a session from the live cache. Committed state stays in the store.
    pub async fn evict(&self, session_id: Uuid) -> bool {
        self.sessions.write().await.remove(&session_id).is_some()
    }

    /// Number of live sessions.
    pub async fn live_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
