//! Profile tools — save and retrieve `user:` facts in the session.
//!
//! Writes land in the session's delta and become durable when the caller
//! commits the session after the tool call.

use async_trait::async_trait;

use crate::context::ToolContext;
use crate::profile::ProfileValue;
use crate::tools::tool::{Tool, ToolError, ToolOutput};

// ── save_userinfo ───────────────────────────────────────────────────

/// Stores arbitrary user facts under the `user:` prefix.
pub struct SaveUserInfoTool;

#[async_trait]
impl Tool for SaveUserInfoTool {
    fn name(&self) -> &str {
        "save_userinfo"
    }

    fn description(&self) -> &str {
        "Save any user information (name, degree, country, funding, ...) to the \
         session profile. Pass each fact as a top-level field."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "description": "Arbitrary field → value pairs to remember",
            "additionalProperties": true
        })
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolOutput, ToolError> {
        let start = std::time::Instant::now();
        let serde_json::Value::Object(fields) = params else {
            return Err(ToolError::InvalidParameters(
                "expected an object of fields to save".to_string(),
            ));
        };

        let saved_fields = ctx.session.lock().await.state.save_profile(
            fields
                .into_iter()
                .map(|(key, value)| (key, ProfileValue::from_json(value))),
        );

        tracing::debug!(
            session_id = %ctx.session_id,
            fields = saved_fields.len(),
            "User info saved"
        );

        Ok(ToolOutput::success(
            serde_json::json!({
                "status": "success",
                "saved_fields": saved_fields,
            }),
            start.elapsed(),
        ))
    }
}

// ── retrieve_userinfo ───────────────────────────────────────────────

/// Returns every `user:` fact, unprefixed, from the merged session view.
pub struct RetrieveUserInfoTool;

#[async_trait]
impl Tool for RetrieveUserInfoTool {
    fn name(&self) -> &str {
        "retrieve_userinfo"
    }

    fn description(&self) -> &str {
        "Retrieve everything known about the user. Call before asking the user \
         for details they may already have given."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(
        &self,
        _params: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolOutput, ToolError> {
        let start = std::time::Instant::now();
        let profile = ctx.session.lock().await.state.retrieve_profile();

        let data: serde_json::Map<String, serde_json::Value> = profile
            .into_iter()
            .map(|(key, value)| (key, value.to_json()))
            .collect();

        Ok(ToolOutput::success(
            serde_json::json!({
                "status": "success",
                "data": data,
            }),
            start.elapsed(),
        ))
    }
}
