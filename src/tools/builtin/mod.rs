//! Built-in tools for scholarship lookup, the user profile and draft review.

pub mod finder;
pub mod profile;
pub mod review;

use std::sync::Arc;

pub use finder::FindScholarshipsTool;
pub use profile::{RetrieveUserInfoTool, SaveUserInfoTool};
pub use review::SubmitDraftForReviewTool;

use crate::matcher::ScholarshipFinder;
use crate::review::ApprovalGate;
use crate::tools::ToolRegistry;

/// Register every built-in tool as protected.
pub fn register_builtin(
    registry: &ToolRegistry,
    finder: Arc<ScholarshipFinder>,
    gate: Arc<ApprovalGate>,
    default_top_k: usize,
) {
    registry.register(Arc::new(FindScholarshipsTool::new(finder, default_top_k)));
    registry.register(Arc::new(SaveUserInfoTool));
    registry.register(Arc::new(RetrieveUserInfoTool));
    registry.register(Arc::new(SubmitDraftForReviewTool::new(gate)));
}
