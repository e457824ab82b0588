//! Gmail REST client
//!
//! Lists message ids matching a search query (paginating until no
//! continuation token remains), then fetches message details through a
//! bounded worker pool. A message that fails to fetch or has no decodable
//! body is logged and skipped; only credential failures abort the batch.

use crate::errors::{InboxError, Result};
use crate::mail::auth::GmailAuth;
use crate::mail::body::{extract_body, sender, subject, GmailMessage};
use crate::mail::EmailRecord;
use futures_util::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const GMAIL_BASE_URL: &str = "https://gmail.googleapis.com/gmail/v1";
const PAGE_SIZE: u32 = 500;

/// HTTP client for the Gmail API
pub struct MailClient {
    client: Client,
    auth: GmailAuth,
    base_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    messages: Vec<MessageRef>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
    id: String,
}

impl MailClient {
    pub fn new(auth: GmailAuth) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            auth,
            base_url: GMAIL_BASE_URL.to_string(),
        }
    }

    /// Fetch all messages matching `query`, skipping ones that cannot be
    /// decoded. `concurrency` bounds the in-flight detail requests.
    pub async fn fetch(&self, query: &str, concurrency: usize) -> Result<Vec<EmailRecord>> {
        let token = self.auth.access_token().await?;

        let ids = self.list_message_ids(&token, query).await?;
        tracing::info!(count = ids.len(), query, "found messages to process");

        let progress = ProgressBar::new(ids.len() as u64);
        progress.set_style(
            ProgressStyle::with_template("{msg} [{bar:40}] {pos}/{len}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        progress.set_message("Processing emails");

        let mut results = stream::iter(ids.into_iter().map(|id| {
            let token = token.clone();
            async move {
                let result = self.fetch_message(&token, &id).await;
                (id, result)
            }
        }))
        .buffer_unordered(concurrency.max(1));

        let mut records = Vec::new();
        while let Some((id, result)) = results.next().await {
            progress.inc(1);
            match result {
                Ok(Some(record)) => records.push(record),
                // Messages with no decodable body are warned about inside
                Ok(None) => {}
                Err(e) => tracing::warn!(message_id = %id, error = %e, "skipping message"),
            }
        }
        progress.finish_and_clear();

        tracing::info!(count = records.len(), "successfully processed emails");
        Ok(records)
    }

    /// Page through `users/me/messages` until no continuation token remains.
    async fn list_message_ids(&self, token: &str, query: &str) -> Result<Vec<String>> {
        let url = format!("{}/users/me/messages", self.base_url);
        let page_size = PAGE_SIZE.to_string();
        let mut ids = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(&url)
                .bearer_auth(token)
                .query(&[("q", query), ("maxResults", page_size.as_str())]);
            if let Some(ref next) = page_token {
                request = request.query(&[("pageToken", next)]);
            }

            let response = request.send().await?;
            if !response.status().is_success() {
                let status = response.status();
                let detail = response.text().await.unwrap_or_default();
                if status == reqwest::StatusCode::UNAUTHORIZED
                    || status == reqwest::StatusCode::FORBIDDEN
                {
                    return Err(InboxError::Auth(format!(
                        "Gmail rejected the access token with {}: {}",
                        status, detail
                    )));
                }
                return Err(InboxError::Provider(format!(
                    "message listing failed with {}: {}",
                    status, detail
                )));
            }

            let page: ListResponse = response
                .json()
                .await
                .map_err(|e| InboxError::Provider(format!("malformed list response: {}", e)))?;

            ids.extend(page.messages.into_iter().map(|m| m.id));

            match page.next_page_token {
                Some(next) => {
                    tracing::debug!(count = ids.len(), "fetching next page of messages");
                    page_token = Some(next);
                }
                None => break,
            }
        }

        Ok(ids)
    }

    /// Fetch one message and normalize it. Returns `Ok(None)` when the
    /// message has no decodable text body.
    async fn fetch_message(&self, token: &str, id: &str) -> Result<Option<EmailRecord>> {
        let url = format!("{}/users/me/messages/{}", self.base_url, id);
        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .query(&[("format", "full")])
            .send()
            .await
            .map_err(|e| InboxError::Fetch {
                id: id.to_string(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(InboxError::Fetch {
                id: id.to_string(),
                reason: format!("message fetch returned {}", response.status()),
            });
        }

        let message: GmailMessage = response.json().await.map_err(|e| InboxError::Fetch {
            id: id.to_string(),
            reason: format!("malformed message response: {}", e),
        })?;

        let payload = message.payload.ok_or_else(|| InboxError::Fetch {
            id: id.to_string(),
            reason: "message has no payload".to_string(),
        })?;

        let body = match extract_body(&payload) {
            Some(body) => body,
            None => {
                tracing::warn!(message_id = %id, "no body content found, skipping");
                return Ok(None);
            }
        };

        Ok(Some(EmailRecord::new(
            id,
            sender(&payload),
            subject(&payload),
            body,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_response_deserialization() {
        let json = r#"{
            "messages": [{"id": "a1", "threadId": "t1"}, {"id": "b2", "threadId": "t2"}],
            "nextPageToken": "tok",
            "resultSizeEstimate": 2
        }"#;
        let page: ListResponse = serde_json::from_str(json).unwrap();
        assert_eq!(page.messages.len(), 2);
        assert_eq!(page.messages[0].id, "a1");
        assert_eq!(page.next_page_token.as_deref(), Some("tok"));
    }

    #[test]
    fn test_empty_list_response() {
        let page: ListResponse = serde_json::from_str(r#"{"resultSizeEstimate": 0}"#).unwrap();
        assert!(page.messages.is_empty());
        assert!(page.next_page_token.is_none());
    }

    #[test]
    fn test_message_deserialization_and_normalization() {
        let json = r#"{
            "id": "m1",
            "payload": {
                "mimeType": "text/plain",
                "headers": [
                    {"name": "From", "value": "billing@example.com"},
                    {"name": "Subject", "value": "Invoice"}
                ],
                "body": {"data": "aW52b2ljZSAkMTAw"}
            }
        }"#;
        let message: GmailMessage = serde_json::from_str(json).unwrap();
        let payload = message.payload.unwrap();
        assert_eq!(sender(&payload), "billing@example.com");
        assert_eq!(extract_body(&payload).unwrap(), "invoice $100");
    }
}
