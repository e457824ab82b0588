//! Mail source adapter
//!
//! Fetches messages from the Gmail REST API and normalizes them into
//! `EmailRecord`s. Credentials are a stored OAuth token refreshed against
//! Google's token endpoint; the interactive consent flow is out of scope.
//!
//! Components:
//! - Auth: token file load/refresh/persist
//! - Body: pure header/body extraction policy
//! - Client: paginated listing + bounded-concurrency detail fetches

pub mod auth;
pub mod body;
pub mod client;

pub use auth::{GmailAuth, StoredToken, TokenStore};
pub use client::MailClient;

use serde::{Deserialize, Serialize};

/// A normalized email, the unit of embedding and display.
///
/// Immutable once created; removed only by explicit deletion from the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailRecord {
    /// Stable Gmail message id
    pub id: String,
    pub sender: String,
    pub subject: String,
    /// Plain-text body
    pub body: String,
    /// Concatenated form stored in the index and shown to the generator
    pub text: String,
}

impl EmailRecord {
    pub fn new(
        id: impl Into<String>,
        sender: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        let sender = sender.into();
        let subject = subject.into();
        let body = body.into();
        let text = format!("From: {}\nSubject: {}\nBody: {}", sender, subject, body);
        Self {
            id: id.into(),
            sender,
            subject,
            body,
            text,
        }
    }
}
