//! Client Secret Broker
//!
//! Exchanges the server-held provider key for a short-lived client secret.
//! One outbound call per request, no retries, and provider failures are relayed
//! verbatim.

use crate::{
    config::Config,
    models::{ClientSecretRequest, ClientSecretResponse, ErrorResponse},
};
use axum::{
    Json,
    http::{HeaderName, StatusCode, header},
    response::{IntoResponse, Response},
};
use secrecy::{ExposeSecret, SecretString};
use tracing::{error, info, instrument, warn};

/// Headers attached to every token response so the credential is never stored.
pub fn no_store_headers() -> [(HeaderName, &'static str); 2] {
    [
        (header::CACHE_CONTROL, "no-store, max-age=0"),
        (header::PRAGMA, "no-cache"),
    ]
}

#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("Missing OPENAI_API_KEY")]
    MissingApiKey,
    /// The provider answered with a non-success status; holds its raw body.
    #[error("{body}")]
    Upstream { status: StatusCode, body: String },
    #[error("Failed to reach the realtime provider: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Unexpected response from the realtime provider: {0}")]
    Decode(String),
}

impl IntoResponse for BrokerError {
    fn into_response(self) -> Response {
        match &self {
            BrokerError::MissingApiKey => error!("Token requested but OPENAI_API_KEY is not configured."),
            BrokerError::Upstream { status, .. } => {
                warn!(upstream_status = %status, "Provider rejected client secret request.")
            }
            BrokerError::Transport(e) => error!(error = ?e, "Client secret request failed."),
            BrokerError::Decode(reason) => error!(%reason, "Provider returned an unusable body."),
        }
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            no_store_headers(),
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

/// Issues client secrets against the provider's `realtime/client_secrets` endpoint.
pub struct ClientSecretIssuer {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<SecretString>,
    payload: ClientSecretRequest,
}

impl ClientSecretIssuer {
    pub fn new(http: reqwest::Client, config: &Config) -> Self {
        Self {
            http,
            endpoint: config.client_secrets_url(),
            api_key: config
                .openai_api_key
                .as_ref()
                .map(|key| SecretString::from(key.expose_secret().to_owned())),
            payload: ClientSecretRequest::from_config(config),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Requests a new client secret and returns its value unmodified.
    #[instrument(name = "issue_client_secret", skip(self), fields(model = %self.payload.session.model))]
    pub async fn issue(&self) -> Result<String, BrokerError> {
        let api_key = self.api_key.as_ref().ok_or(BrokerError::MissingApiKey)?;

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(api_key.expose_secret())
            .header(header::CACHE_CONTROL, "no-store")
            .json(&self.payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            return Err(BrokerError::Upstream { status, body });
        }

        let secret: ClientSecretResponse = response
            .json()
            .await
            .map_err(|e| BrokerError::Decode(e.to_string()))?;
        let value = secret
            .value
            .ok_or_else(|| BrokerError::Decode("response has no `value` field".to_string()))?;
        info!(expires_at = ?secret.expires_at, "Issued realtime client secret.");
        Ok(value)
    }
}
