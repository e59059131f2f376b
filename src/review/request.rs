//! Draft review requests, verdicts and gate responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of application document under review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentType {
    /// Statement of Purpose.
    #[serde(rename = "SOP")]
    Sop,
    #[serde(rename = "CV")]
    Cv,
}

impl DocumentType {
    /// Profile field the finalized document is saved under.
    pub fn profile_field(&self) -> &'static str {
        match self {
            Self::Sop => "last_sop",
            Self::Cv => "last_cv",
        }
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sop => write!(f, "SOP"),
            Self::Cv => write!(f, "CV"),
        }
    }
}

impl std::str::FromStr for DocumentType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sop" | "statement of purpose" => Ok(Self::Sop),
            "cv" | "resume" => Ok(Self::Cv),
            _ => Err(format!("Unknown document type: {}", s)),
        }
    }
}

/// Status of a review request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
}

impl std::fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Approved => write!(f, "approved"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

impl std::str::FromStr for ReviewStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(format!("Unknown review status: {}", s)),
        }
    }
}

/// A draft waiting for (or past) a human verdict.
///
/// `id` doubles as the resumption token handed back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftReviewRequest {
    pub id: Uuid,
    pub session_id: Uuid,
    pub document_type: DocumentType,
    pub draft_text: String,
    /// Short label shown to the reviewer.
    pub hint: String,
    pub status: ReviewStatus,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl DraftReviewRequest {
    /// New pending request for `draft_text`.
    pub fn new(session_id: Uuid, document_type: DocumentType, draft_text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id,
            document_type,
            draft_text: draft_text.into(),
            hint: format!("Review {} Draft", document_type),
            status: ReviewStatus::Pending,
            created_at: Utc::now(),
            resolved_at: None,
        }
    }

    /// Payload presented to the reviewer.
    pub fn payload(&self) -> serde_json::Value {
        serde_json::json!({
            "document_type": self.document_type,
            "draft_text": self.draft_text,
        })
    }
}

/// Verdict redelivered on the resumed call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationState {
    pub confirmed: bool,
    /// Resumption token of the request this verdict answers, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<Uuid>,
}

impl ConfirmationState {
    pub fn approve() -> Self {
        Self {
            confirmed: true,
            request_id: None,
        }
    }

    pub fn reject() -> Self {
        Self {
            confirmed: false,
            request_id: None,
        }
    }

    /// Bind the verdict to a specific request.
    pub fn for_request(mut self, request_id: Uuid) -> Self {
        self.request_id = Some(request_id);
        self
    }
}

/// Gate response, in the wire shape callers expect.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReviewResponse {
    PendingReview { message: String, request_id: Uuid },
    Approved { message: String },
    Rejected { message: String },
}

impl ReviewResponse {
    pub fn status(&self) -> ReviewStatus {
        match self {
            Self::PendingReview { .. } => ReviewStatus::Pending,
            Self::Approved { .. } => ReviewStatus::Approved,
            Self::Rejected { .. } => ReviewStatus::Rejected,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::PendingReview { message, .. }
            | Self::Approved { message }
            | Self::Rejected { message } => message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_type_parsing_and_display() {
        assert_eq!("sop".parse::<DocumentType>().unwrap(), DocumentType::Sop);
        assert_eq!(" CV ".parse::<DocumentType>().unwrap(), DocumentType::Cv);
        assert!("cover letter".parse::<DocumentType>().is_err());
        assert_eq!(DocumentType::Sop.to_string(), "SOP");
        assert_eq!(serde_json::to_value(DocumentType::Cv).unwrap(), "CV");
    }

    #[test]
    fn request_hint_and_payload() {
        let request = DraftReviewRequest::new(Uuid::new_v4(), DocumentType::Cv, "Jane Doe, MSc");
        assert_eq!(request.hint, "Review CV Draft");
        assert_eq!(request.status, ReviewStatus::Pending);
        assert_eq!(request.payload()["document_type"], "CV");
        assert_eq!(request.payload()["draft_text"], "Jane Doe, MSc");
    }

    #[test]
    fn confirmation_state_accepts_bare_verdict() {
        let state: ConfirmationState = serde_json::from_str(r#"{"confirmed": true}"#).unwrap();
        assert_eq!(state, ConfirmationState::approve());
    }

    #[test]
    fn status_roundtrip() {
        for status in [ReviewStatus::Pending, ReviewStatus::Approved, ReviewStatus::Rejected] {
            assert_eq!(status.to_string().parse::<ReviewStatus>().unwrap(), status);
        }
    }

    #[test]
    fn response_wire_shape() {
        let id = Uuid::new_v4();
        let value = serde_json::to_value(ReviewResponse::PendingReview {
            message: "waiting".into(),
            request_id: id,
        })
        .unwrap();
        assert_eq!(value["status"], "pending_review");
        assert_eq!(value["request_id"], id.to_string());
    }
}
