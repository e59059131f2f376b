//! Tool context — the session a tool call runs against.

use std::sync::Arc;

use tokio::sync::Mutex;
use uuid::Uuid;

use crate::review::ConfirmationState;
use crate::session::Session;

/// Context for a single tool invocation.
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// Session the call belongs to.
    pub session_id: Uuid,
    /// Live session handle. Lock it for the shortest span possible.
    pub session: Arc<Mutex<Session>>,
    /// Reviewer verdict redelivered on a resumed call.
    pub confirmation: Option<ConfirmationState>,
}

impl ToolContext {
    pub fn new(session_id: Uuid, session: Arc<Mutex<Session>>) -> Self {
        Self {
            session_id,
            session,
            confirmation: None,
        }
    }

    /// Wrap a standalone session, e.g. in tests.
    pub fn for_session(session: Session) -> Self {
        Self::new(session.id, Arc::new(Mutex::new(session)))
    }

    pub fn with_confirmation(mut self, confirmation: Option<ConfirmationState>) -> Self {
        self.confirmation = confirmation;
        self
    }
}
