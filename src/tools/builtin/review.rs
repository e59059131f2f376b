//! `submit_draft_for_review` — the human approval checkpoint for SOP/CV drafts.
//!
//! First call (no confirmation in the context) suspends at the gate and
//! returns `pending_review`. The resumed call carries the reviewer's verdict
//! for the session's pending request; an approved draft is then saved to the
//! profile as `last_sop` / `last_cv`. The saved text is always the one that
//! was submitted for review, never the text of the resumed call. A verdict
//! with nothing pending is answered but saves nothing.

use std::sync::Arc;

use async_trait::async_trait;

use crate::context::ToolContext;
use crate::error::PipelineError;
use crate::pipeline::{DraftPipeline, DraftState};
use crate::review::{ApprovalGate, DocumentType};
use crate::tools::tool::{Tool, ToolError, ToolOutput, require_str};

pub struct SubmitDraftForReviewTool {
    gate: Arc<ApprovalGate>,
}

impl SubmitDraftForReviewTool {
    pub fn new(gate: Arc<ApprovalGate>) -> Self {
        Self { gate }
    }
}

fn failed(e: PipelineError) -> ToolError {
    ToolError::ExecutionFailed(e.to_string())
}

#[async_trait]
impl Tool for SubmitDraftForReviewTool {
    fn name(&self) -> &str {
        "submit_draft_for_review"
    }

    fn description(&self) -> &str {
        "Submit a refined SOP or CV draft for human review. Execution pauses until \
         the human approves or rejects. Never finalize a document without calling this."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "draft_text": {
                    "type": "string",
                    "description": "The refined draft"
                },
                "document_type": {
                    "type": "string",
                    "enum": ["SOP", "CV"],
                    "description": "Kind of document"
                }
            },
            "required": ["draft_text", "document_type"]
        })
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolOutput, ToolError> {
        let start = std::time::Instant::now();
        let draft_text = require_str(&params, "draft_text")?;
        let document_type: DocumentType = require_str(&params, "document_type")?
            .parse()
            .map_err(ToolError::InvalidParameters)?;

        let Some(confirmation) = ctx.confirmation.as_ref() else {
            let mut pipeline = DraftPipeline::from_refined(ctx.session_id, document_type, draft_text);
            let response = pipeline.review(&self.gate).await.map_err(failed)?;
            let result = serde_json::to_value(&response)
                .map_err(|e| ToolError::ExecutionFailed(format!("Failed to encode result: {}", e)))?;
            return Ok(ToolOutput::success(result, start.elapsed()));
        };

        let pending = self
            .gate
            .pending(ctx.session_id)
            .await
            .map_err(|e| failed(PipelineError::Approval(e)))?;

        let Some(request) = pending else {
            let response = self
                .gate
                .submit_for_review(ctx.session_id, draft_text, document_type, Some(confirmation))
                .await
                .map_err(|e| failed(PipelineError::Approval(e)))?;
            let result = serde_json::to_value(&response)
                .map_err(|e| ToolError::ExecutionFailed(format!("Failed to encode result: {}", e)))?;
            return Ok(ToolOutput::success(result, start.elapsed()));
        };

        let mut pipeline = DraftPipeline::resume(&request);
        let response = {
            let mut session = ctx.session.lock().await;
            pipeline
                .decide(&self.gate, confirmation, &mut session)
                .await
                .map_err(failed)?
        };

        let mut result = serde_json::to_value(&response)
            .map_err(|e| ToolError::ExecutionFailed(format!("Failed to encode result: {}", e)))?;
        if pipeline.state() == DraftState::Finalized {
            result["saved_field"] =
                serde_json::Value::String(pipeline.document_type.profile_field().to_string());
        }

        Ok(ToolOutput::success(result, start.elapsed()))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use async_trait::async_trait;
    use serde_json::json;
    use uuid::Uuid;

    use super::*;
    use crate::error::ApprovalError;
    use crate::profile::ProfileValue;
    use crate::review::{
        ConfirmationRuntime, ConfirmationState, DraftReviewRequest, InMemoryConfirmations,
        Resolution, ReviewStatus,
    };
    use crate::session::Session;

    /// Records requests but loses its store before any verdict lands.
    #[derive(Default)]
    struct BrokenResolve {
        inner: InMemoryConfirmations,
    }

    #[async_trait]
    impl ConfirmationRuntime for BrokenResolve {
        async fn request_confirmation(
            &self,
            request: &DraftReviewRequest,
        ) -> Result<(), ApprovalError> {
            self.inner.request_confirmation(request).await
        }

        async fn pending(
            &self,
            session_id: Uuid,
        ) -> Result<Option<DraftReviewRequest>, ApprovalError> {
            self.inner.pending(session_id).await
        }

        async fn resolve(
            &self,
            _request: &DraftReviewRequest,
            _status: ReviewStatus,
            _writes: &BTreeMap<String, ProfileValue>,
        ) -> Result<Resolution, ApprovalError> {
            Err(ApprovalError::ConfirmationUnavailable {
                reason: "database is locked".into(),
            })
        }
    }

    fn tool() -> SubmitDraftForReviewTool {
        let gate = ApprovalGate::new(Arc::new(InMemoryConfirmations::new()));
        SubmitDraftForReviewTool::new(Arc::new(gate))
    }

    fn params() -> serde_json::Value {
        json!({"draft_text": "My statement.", "document_type": "SOP"})
    }

    #[tokio::test]
    async fn first_call_suspends() {
        let tool = tool();
        let ctx = ToolContext::for_session(Session::new("user1"));
        let out = tool.execute(params(), &ctx).await.unwrap();

        assert_eq!(out.result["status"], "pending_review");
        assert_eq!(
            out.result["message"],
            "Draft submitted. Waiting for human feedback on: SOP"
        );
        assert!(out.result["request_id"].is_string());
        assert!(ctx.session.lock().await.state.retrieve_profile().is_empty());
    }

    #[tokio::test]
    async fn approval_saves_draft() {
        let tool = tool();
        let ctx = ToolContext::for_session(Session::new("user1"));
        tool.execute(params(), &ctx).await.unwrap();

        let resumed = ctx.clone().with_confirmation(Some(ConfirmationState::approve()));
        let out = tool.execute(params(), &resumed).await.unwrap();

        assert_eq!(out.result["status"], "approved");
        assert_eq!(out.result["saved_field"], "last_sop");
        assert_eq!(
            ctx.session.lock().await.state.retrieve_profile()["last_sop"],
            ProfileValue::from("My statement.")
        );
    }

    #[tokio::test]
    async fn rejection_saves_nothing() {
        let tool = tool();
        let ctx = ToolContext::for_session(Session::new("user1"));
        tool.execute(params(), &ctx).await.unwrap();

        let resumed = ctx.clone().with_confirmation(Some(ConfirmationState::reject()));
        let out = tool.execute(params(), &resumed).await.unwrap();

        assert_eq!(out.result["status"], "rejected");
        assert!(out.result.get("saved_field").is_none());
        assert!(ctx.session.lock().await.state.retrieve_profile().is_empty());

        // The cycle is closed; a revision can be submitted.
        let out = tool.execute(params(), &ctx).await.unwrap();
        assert_eq!(out.result["status"], "pending_review");
    }

    #[tokio::test]
    async fn second_submission_while_pending_fails() {
        let tool = tool();
        let ctx = ToolContext::for_session(Session::new("user1"));
        tool.execute(params(), &ctx).await.unwrap();
        assert!(matches!(
            tool.execute(params(), &ctx).await,
            Err(ToolError::ExecutionFailed(_))
        ));
    }

    #[tokio::test]
    async fn verdict_without_pending_request_is_shaped() {
        let tool = tool();
        let ctx = ToolContext::for_session(Session::new("user1"))
            .with_confirmation(Some(ConfirmationState::reject()));
        let out = tool.execute(params(), &ctx).await.unwrap();
        assert_eq!(out.result["status"], "rejected");
    }

    #[tokio::test]
    async fn approval_without_pending_request_saves_nothing() {
        let tool = tool();
        let ctx = ToolContext::for_session(Session::new("user1"))
            .with_confirmation(Some(ConfirmationState::approve()));
        let out = tool.execute(params(), &ctx).await.unwrap();

        assert_eq!(out.result["status"], "approved");
        assert!(out.result.get("saved_field").is_none());
        assert!(ctx.session.lock().await.state.retrieve_profile().is_empty());
    }

    #[tokio::test]
    async fn replayed_approval_keeps_reviewed_text() {
        let tool = tool();
        let ctx = ToolContext::for_session(Session::new("user1"));
        let reviewed = json!({"draft_text": "Reviewed text.", "document_type": "SOP"});
        let swapped = json!({"draft_text": "Swapped text.", "document_type": "SOP"});
        tool.execute(reviewed, &ctx).await.unwrap();

        // The resumed call carries different text; the reviewed one is saved.
        let resumed = ctx.clone().with_confirmation(Some(ConfirmationState::approve()));
        let out = tool.execute(swapped.clone(), &resumed).await.unwrap();
        assert_eq!(out.result["saved_field"], "last_sop");

        let replay = tool.execute(swapped, &resumed).await.unwrap();
        assert_eq!(replay.result["status"], "approved");
        assert!(replay.result.get("saved_field").is_none());
        assert_eq!(
            ctx.session.lock().await.state.retrieve_profile()["last_sop"],
            ProfileValue::from("Reviewed text.")
        );
    }

    #[tokio::test]
    async fn failed_resolution_saves_nothing() {
        let gate = Arc::new(ApprovalGate::new(Arc::new(BrokenResolve::default())));
        let tool = SubmitDraftForReviewTool::new(Arc::clone(&gate));
        let ctx = ToolContext::for_session(Session::new("user1"));
        tool.execute(params(), &ctx).await.unwrap();

        let resumed = ctx.clone().with_confirmation(Some(ConfirmationState::approve()));
        let err = tool.execute(params(), &resumed).await.unwrap_err();
        assert!(matches!(err, ToolError::ExecutionFailed(msg) if msg.contains("database is locked")));

        assert!(ctx.session.lock().await.state.retrieve_profile().is_empty());
        assert!(gate.pending(ctx.session_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn bad_document_type() {
        let ctx = ToolContext::for_session(Session::new("user1"));
        let err = tool()
            .execute(json!({"draft_text": "x", "document_type": "cover letter"}), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidParameters(_)));
    }

    #[tokio::test]
    async fn missing_draft_text() {
        let ctx = ToolContext::for_session(Session::new("user1"));
        let err = tool()
            .execute(json!({"document_type": "CV"}), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidParameters(_)));
    }
}
