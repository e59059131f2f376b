//! Error types for Scholarship Assist.

use uuid::Uuid;

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Scholarship dataset load failures.
///
/// These never escape the matcher; they are folded into an error-shaped
/// match outcome so the caller can fall back to an external search.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Human-approval gate errors.
#[derive(Debug, thiserror::Error)]
pub enum ApprovalError {
    #[error("Confirmation runtime unavailable: {reason}")]
    ConfirmationUnavailable { reason: String },

    #[error("A draft review is already pending for this session (request {request_id})")]
    AlreadyPending { request_id: Uuid },

    #[error("Review request mismatch: pending {expected}, resumed with {got}")]
    RequestMismatch { expected: Uuid, got: Uuid },
}

/// Draft pipeline errors.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Draft {id} is {from}, cannot transition to {to}")]
    InvalidTransition { id: Uuid, from: String, to: String },

    #[error("Refiner returned an empty draft")]
    EmptyRefinement,

    #[error("Refiner failed: {0}")]
    Refiner(String),

    #[error("Approval error: {0}")]
    Approval(#[from] ApprovalError),
}
