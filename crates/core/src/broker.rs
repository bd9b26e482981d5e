//! Broker Client
//!
//! Fetches short-lived session credentials from the token broker so the
//! long-lived provider key never leaves the server.

use crate::session::SessionCredential;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};

/// Path of the token endpoint exposed by the broker.
pub const TOKEN_PATH: &str = "/api/realtime-token";

/// Message used when the broker rejects a request without explaining why.
pub const TOKEN_FALLBACK_MESSAGE: &str = "Error al obtener token";

/// Failures while obtaining a session credential.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// The broker answered with a non-success status. Carries the relayed error text.
    #[error("{0}")]
    Rejected(String),
    #[error("Token broker request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Token broker returned an unreadable body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Token broker response did not include a token")]
    MissingValue,
}

/// A source of short-lived session credentials.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn fetch_token(&self) -> Result<SessionCredential, TokenError>;
}

/// The envelope returned by the broker: `{ value }` on success, `{ error }` otherwise.
#[derive(Debug, Deserialize)]
struct TokenEnvelope {
    value: Option<String>,
    error: Option<String>,
}

/// `TokenSource` backed by the HTTP token broker.
#[derive(Debug, Clone)]
pub struct BrokerClient {
    http: reqwest::Client,
    token_url: String,
}

impl BrokerClient {
    /// Creates a client for the broker rooted at `base_url` (e.g. `http://127.0.0.1:3000`).
    pub fn new(base_url: &str) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            token_url: format!("{}{}", base_url.trim_end_matches('/'), TOKEN_PATH),
        }
    }

    pub fn token_url(&self) -> &str {
        &self.token_url
    }
}

#[async_trait]
impl TokenSource for BrokerClient {
    #[instrument(skip(self), fields(url = %self.token_url))]
    async fn fetch_token(&self) -> Result<SessionCredential, TokenError> {
        let response = self.http.get(&self.token_url).send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!(%status, "Token broker responded");

        if !status.is_success() {
            let message = serde_json::from_str::<TokenEnvelope>(&body)
                .ok()
                .and_then(|envelope| envelope.error)
                .filter(|message| !message.is_empty())
                .unwrap_or_else(|| TOKEN_FALLBACK_MESSAGE.to_string());
            return Err(TokenError::Rejected(message));
        }

        let envelope: TokenEnvelope = serde_json::from_str(&body)?;
        envelope
            .value
            .map(SessionCredential::new)
            .ok_or(TokenError::MissingValue)
    }
}
