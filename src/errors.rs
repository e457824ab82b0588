//! Error types for the inboxqa pipeline
//!
//! Per-message failures during ingest are contained at the mail/index
//! adapter boundary; everything else aborts the current operation.

use thiserror::Error;

/// Main error type for the email Q&A pipeline
#[derive(Error, Debug)]
pub enum InboxError {
    /// Mail credentials could not be loaded or refreshed
    #[error("authentication failed: {0}")]
    Auth(String),

    /// A single message failed to parse or decode (logged and skipped)
    #[error("failed to process message {id}: {reason}")]
    Fetch { id: String, reason: String },

    /// A remote provider call failed (rate limit, auth, malformed response)
    #[error("provider request failed: {0}")]
    Provider(String),

    /// Missing or invalid configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// HTTP transport errors
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, InboxError>;

/// The vector store client surfaces anyhow errors; those are provider errors
/// from the pipeline's point of view.
impl From<anyhow::Error> for InboxError {
    fn from(err: anyhow::Error) -> Self {
        InboxError::Provider(err.to_string())
    }
}
