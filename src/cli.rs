//! JSON-lines tool channel — one invocation per stdin line, one result per stdout line.
//!
//! Each line looks like
//! `{"session_id": "...", "tool": "save_userinfo", "params": {...}, "confirmation": {...}}`
//! where `confirmation` is only present on a resumed review call.

use std::sync::Arc;

use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use uuid::Uuid;

use crate::context::ToolContext;
use crate::error::DatabaseError;
use crate::review::ConfirmationState;
use crate::session::SessionManager;
use crate::tools::{ToolError, ToolRegistry};

/// One tool call from the agent runtime.
#[derive(Debug, Clone, Deserialize)]
pub struct Invocation {
    pub session_id: Uuid,
    pub tool: String,
    #[serde(default = "empty_params")]
    pub params: serde_json::Value,
    #[serde(default)]
    pub confirmation: Option<ConfirmationState>,
}

fn empty_params() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Malformed invocation: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("Session store error: {0}")]
    Database(#[from] DatabaseError),
}

/// Routes invocations to tools and commits session writes after each call.
pub struct Dispatcher {
    sessions: Arc<SessionManager>,
    registry: Arc<ToolRegistry>,
    user_id: String,
}

impl Dispatcher {
    pub fn new(
        sessions: Arc<SessionManager>,
        registry: Arc<ToolRegistry>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            sessions,
            registry,
            user_id: user_id.into(),
        }
    }

    /// Run one invocation. Session writes are committed only if the tool succeeds.
    ///
    /// The session is evicted from the live cache afterwards either way; the
    /// next call for it reloads the committed state.
    pub async fn dispatch(&self, invocation: Invocation) -> Result<serde_json::Value, DispatchError> {
        let session_id = invocation.session_id;
        let result = self.run(invocation).await;
        self.sessions.evict(session_id).await;
        result
    }

    async fn run(&self, invocation: Invocation) -> Result<serde_json::Value, DispatchError> {
        let handle = self
            .sessions
            .get_or_load(invocation.session_id, &self.user_id)
            .await?;
        let ctx = ToolContext::new(invocation.session_id, Arc::clone(&handle))
            .with_confirmation(invocation.confirmation);

        let output = self
            .registry
            .execute(&invocation.tool, invocation.params, &ctx)
            .await?;

        let mut session = handle.lock().await;
        self.sessions.commit(&mut session).await?;
        Ok(output.result)
    }

    /// Parse and run one raw line, always producing a JSON reply.
    pub async fn dispatch_line(&self, line: &str) -> serde_json::Value {
        let result = match serde_json::from_str::<Invocation>(line) {
            Ok(invocation) => self.dispatch(invocation).await,
            Err(e) => Err(DispatchError::from(e)),
        };
        result.unwrap_or_else(|e| {
            serde_json::json!({
                "status": "error",
                "error_message": e.to_string(),
            })
        })
    }

    /// Serve invocations until EOF.
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> std::io::Result<usize>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        let mut handled = 0;
        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let reply = self.dispatch_line(line).await;
            writer.write_all(reply.to_string().as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
            handled += 1;
        }
        Ok(handled)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::store::{Database, LibSqlBackend};
    use crate::tools::builtin::{RetrieveUserInfoTool, SaveUserInfoTool};

    async fn dispatcher() -> Dispatcher {
        let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        let registry = ToolRegistry::new();
        registry.register(Arc::new(SaveUserInfoTool));
        registry.register(Arc::new(RetrieveUserInfoTool));
        Dispatcher::new(
            Arc::new(SessionManager::new(db)),
            Arc::new(registry),
            "user1",
        )
    }

    #[tokio::test]
    async fn sessions_do_not_stay_live_between_calls() {
        let dispatcher = dispatcher().await;
        let kept = Uuid::new_v4();
        dispatcher
            .dispatch_line(
                &json!({"session_id": kept, "tool": "save_userinfo", "params": {"degree": "PhD"}})
                    .to_string(),
            )
            .await;

        for _ in 0..50 {
            let line = json!({"session_id": Uuid::new_v4(), "tool": "retrieve_userinfo"});
            dispatcher.dispatch_line(&line.to_string()).await;
        }
        let failing = json!({"session_id": Uuid::new_v4(), "tool": "web_search"});
        dispatcher.dispatch_line(&failing.to_string()).await;
        assert_eq!(dispatcher.sessions.live_count().await, 0);

        // Committed state is reloaded on the next call.
        let reply = dispatcher
            .dispatch_line(&json!({"session_id": kept, "tool": "retrieve_userinfo"}).to_string())
            .await;
        assert_eq!(reply["data"], json!({"degree": "PhD"}));
    }

    #[tokio::test]
    async fn serves_lines_until_eof() {
        let dispatcher = dispatcher().await;
        let session_id = Uuid::new_v4();
        let input = format!(
            "{}\n\n{}\n",
            json!({"session_id": session_id, "tool": "save_userinfo", "params": {"name": "Rahim"}}),
            json!({"session_id": session_id, "tool": "retrieve_userinfo"}),
        );

        let mut out = Vec::new();
        let handled = dispatcher
            .serve(tokio::io::BufReader::new(input.as_bytes()), &mut out)
            .await
            .unwrap();
        assert_eq!(handled, 2);

        let replies: Vec<serde_json::Value> = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(replies[0]["saved_fields"], json!(["name"]));
        assert_eq!(replies[1]["data"], json!({"name": "Rahim"}));
    }

    #[tokio::test]
    async fn malformed_line_is_reported() {
        let dispatcher = dispatcher().await;
        let reply = dispatcher.dispatch_line("{not json").await;
        assert_eq!(reply["status"], "error");
        assert!(
            reply["error_message"]
                .as_str()
                .unwrap()
                .starts_with("Malformed invocation")
        );
    }

    #[tokio::test]
    async fn unknown_tool_is_reported() {
        let dispatcher = dispatcher().await;
        let reply = dispatcher
            .dispatch_line(&json!({"session_id": Uuid::new_v4(), "tool": "web_search"}).to_string())
            .await;
        assert_eq!(reply["status"], "error");
        assert_eq!(reply["error_message"], "Tool not found: web_search");
    }
}
