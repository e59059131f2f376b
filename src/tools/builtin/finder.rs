//! `find_scholarships` — ranked lookup against the scholarship dataset.

use std::sync::Arc;

use async_trait::async_trait;

use crate::context::ToolContext;
use crate::matcher::{MatchProfile, ScholarshipFinder};
use crate::tools::tool::{Tool, ToolError, ToolOutput};

pub struct FindScholarshipsTool {
    finder: Arc<ScholarshipFinder>,
    default_top_k: usize,
}

impl FindScholarshipsTool {
    pub fn new(finder: Arc<ScholarshipFinder>, default_top_k: usize) -> Self {
        Self {
            finder,
            default_top_k,
        }
    }

    fn top_k(&self, params: &serde_json::Value) -> Result<usize, ToolError> {
        match params.get("top_k") {
            None | Some(serde_json::Value::Null) => Ok(self.default_top_k),
            Some(v) => match v.as_u64() {
                Some(n) if n > 0 => Ok(n as usize),
                _ => Err(ToolError::InvalidParameters(format!(
                    "'top_k' must be a positive integer, got {v}"
                ))),
            },
        }
    }
}

#[async_trait]
impl Tool for FindScholarshipsTool {
    fn name(&self) -> &str {
        "find_scholarships"
    }

    fn description(&self) -> &str {
        "Find scholarships matching a degree, country and funding preference. \
         Omit 'profile' to search with the user's saved profile. An error or an \
         empty list means the local dataset has nothing; fall back to web search."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "profile": {
                    "type": "object",
                    "description": "Search preferences",
                    "properties": {
                        "degree": { "type": "string", "description": "Degree level, or 'any'" },
                        "country": { "type": "string", "description": "Destination country, or 'any'" },
                        "funding": { "type": "string", "description": "Funding preference, e.g. 'full' or 'any'" }
                    }
                },
                "top_k": {
                    "type": "integer",
                    "description": "Max results (default from configuration)",
                    "minimum": 1
                }
            }
        })
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolOutput, ToolError> {
        let start = std::time::Instant::now();
        let top_k = self.top_k(&params)?;

        let profile = match params.get("profile") {
            Some(value) if value.is_object() => MatchProfile::from_json(value),
            Some(_) => {
                return Err(ToolError::InvalidParameters(
                    "'profile' must be an object".to_string(),
                ));
            }
            None => {
                let saved = ctx.session.lock().await.state.retrieve_profile();
                MatchProfile::from_profile(&saved)
            }
        };

        let outcome = self.finder.find(&profile, top_k).await;
        let result = serde_json::to_value(&outcome)
            .map_err(|e| ToolError::ExecutionFailed(format!("Failed to encode result: {}", e)))?;

        Ok(ToolOutput::success(result, start.elapsed()))
    }
}
