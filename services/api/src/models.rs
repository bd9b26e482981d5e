//! API and Upstream Models
//!
//! Envelopes returned by the token endpoint (documented with `utoipa`) and the
//! payloads exchanged with the provider's client secret endpoint.

use crate::config::Config;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Success envelope carrying the short-lived client secret.
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct TokenResponse {
    #[schema(example = "ek_68af296e8e408191a1120ab6383263c2")]
    pub value: String,
}

/// Failure envelope. `error` holds either a local message or the provider's raw body.
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct ErrorResponse {
    #[schema(example = "Missing OPENAI_API_KEY")]
    pub error: String,
}

/// Body sent to `POST /realtime/client_secrets`.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ClientSecretRequest {
    pub session: RealtimeSessionConfig,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RealtimeSessionConfig {
    #[serde(rename = "type")]
    pub kind: String,
    pub model: String,
    pub audio: AudioConfig,
    pub instructions: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct AudioConfig {
    pub output: AudioOutputConfig,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct AudioOutputConfig {
    pub voice: String,
}

impl ClientSecretRequest {
    /// Builds the fixed realtime session configuration from the service config.
    pub fn from_config(config: &Config) -> Self {
        Self {
            session: RealtimeSessionConfig {
                kind: "realtime".to_string(),
                model: config.realtime_model.clone(),
                audio: AudioConfig {
                    output: AudioOutputConfig {
                        voice: config.realtime_voice.clone(),
                    },
                },
                instructions: config.realtime_instructions.clone(),
            },
        }
    }
}

/// The part of the provider's answer the broker relays.
#[derive(Deserialize, Debug)]
pub struct ClientSecretResponse {
    pub value: Option<String>,
    #[serde(default)]
    pub expires_at: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::net::SocketAddr;
    use tracing::Level;

    fn config() -> Config {
        Config {
            bind_address: "127.0.0.1:3000".parse::<SocketAddr>().unwrap(),
            openai_api_key: None,
            openai_api_base: "https://api.openai.com/v1".to_string(),
            realtime_model: "gpt-realtime".to_string(),
            realtime_voice: "marin".to_string(),
            realtime_instructions: "Responde en español.".to_string(),
            log_level: Level::INFO,
        }
    }

    #[test]
    fn test_client_secret_request_shape() {
        let request = ClientSecretRequest::from_config(&config());

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "session": {
                    "type": "realtime",
                    "model": "gpt-realtime",
                    "audio": { "output": { "voice": "marin" } },
                    "instructions": "Responde en español."
                }
            })
        );
    }

    #[test]
    fn test_client_secret_response_ignores_extra_fields() {
        let json = r#"{"value": "ek_123", "expires_at": 1756310470, "session": {"type": "realtime"}}"#;
        let response: ClientSecretResponse = serde_json::from_str(json).unwrap();

        assert_eq!(response.value.as_deref(), Some("ek_123"));
        assert_eq!(response.expires_at, Some(1756310470));
    }

    #[test]
    fn test_client_secret_response_without_value() {
        let response: ClientSecretResponse = serde_json::from_str("{}").unwrap();
        assert!(response.value.is_none());
        assert!(response.expires_at.is_none());
    }

    #[test]
    fn test_envelope_serialization() {
        let token = TokenResponse {
            value: "abc123".to_string(),
        };
        assert_eq!(serde_json::to_string(&token).unwrap(), r#"{"value":"abc123"}"#);

        let error = ErrorResponse {
            error: "unauthorized".to_string(),
        };
        assert_eq!(
            serde_json::to_string(&error).unwrap(),
            r#"{"error":"unauthorized"}"#
        );
    }
}
