//! Human review of generated documents.

pub mod gate;
pub mod request;
pub mod runtime;

pub use gate::{ApprovalGate, Verdict};
pub use request::{ConfirmationState, DocumentType, DraftReviewRequest, ReviewResponse, ReviewStatus};
pub use runtime::{ConfirmationRuntime, DurableConfirmations, InMemoryConfirmations, Resolution};
