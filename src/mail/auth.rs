//! OAuth token storage and refresh for the Gmail API
//!
//! The token file holds an already-granted refresh token; obtaining the
//! initial grant (browser consent) is outside this adapter. The file is
//! rewritten whenever the access token is refreshed, and is the only
//! persistent state the mail adapter owns.

use crate::errors::{InboxError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";

/// Refresh the access token this many seconds before its recorded expiry.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Contents of the token file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredToken {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    #[serde(default)]
    pub access_token: String,
    /// Unix timestamp after which `access_token` is stale
    #[serde(default)]
    pub expires_at: i64,
}

impl StoredToken {
    pub fn is_expired(&self, now: i64) -> bool {
        self.access_token.is_empty() || self.expires_at <= now + EXPIRY_MARGIN_SECS
    }
}

/// Reads and writes the token file
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn load(&self) -> Result<StoredToken> {
        let contents = fs::read_to_string(&self.path).map_err(|e| {
            InboxError::Auth(format!(
                "could not read token file {}: {}",
                self.path.display(),
                e
            ))
        })?;

        serde_json::from_str(&contents).map_err(|e| {
            InboxError::Auth(format!(
                "token file {} is not valid: {}",
                self.path.display(),
                e
            ))
        })
    }

    pub fn save(&self, token: &StoredToken) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(token)?;
        fs::write(&self.path, contents)?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    expires_in: i64,
}

/// Obtains valid access tokens, refreshing and persisting as needed
pub struct GmailAuth {
    store: TokenStore,
    client: Client,
    token_endpoint: String,
}

impl GmailAuth {
    pub fn new(store: TokenStore) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            store,
            client,
            token_endpoint: TOKEN_ENDPOINT.to_string(),
        }
    }

    /// Return a usable access token, refreshing it first if stale.
    pub async fn access_token(&self) -> Result<String> {
        let mut token = self.store.load()?;
        let now = chrono::Utc::now().timestamp();

        if token.is_expired(now) {
            tracing::info!("access token stale, refreshing");
            self.refresh(&mut token, now).await?;
            self.store.save(&token)?;
        }

        Ok(token.access_token)
    }

    async fn refresh(&self, token: &mut StoredToken, now: i64) -> Result<()> {
        let params = [
            ("client_id", token.client_id.as_str()),
            ("client_secret", token.client_secret.as_str()),
            ("refresh_token", token.refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .client
            .post(&self.token_endpoint)
            .form(&params)
            .send()
            .await
            .map_err(|e| InboxError::Auth(format!("token refresh request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(InboxError::Auth(format!(
                "token refresh rejected with {}: {}",
                status, detail
            )));
        }

        let refreshed: RefreshResponse = response
            .json()
            .await
            .map_err(|e| InboxError::Auth(format!("malformed token response: {}", e)))?;

        token.access_token = refreshed.access_token;
        token.expires_at = now + refreshed.expires_in;
        Ok(())
    }
}
