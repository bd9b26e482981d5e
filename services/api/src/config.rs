use secrecy::SecretString;
use std::net::SocketAddr;
use tracing::Level;

// Shared with the client crate.
pub use habla_core::{
    DEFAULT_REALTIME_MODEL, agent::DEFAULT_INSTRUCTIONS as DEFAULT_REALTIME_INSTRUCTIONS,
};

pub const DEFAULT_OPENAI_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_REALTIME_VOICE: &str = "marin";

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
///
/// The provider key is optional here: a broker without one still starts and
/// answers every token request with an error.
#[derive(Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub openai_api_key: Option<SecretString>,
    pub openai_api_base: String,
    pub realtime_model: String,
    pub realtime_voice: String,
    pub realtime_instructions: String,
    pub log_level: Level,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let openai_api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .map(SecretString::from);

        let openai_api_base = std::env::var("OPENAI_API_BASE")
            .unwrap_or_else(|_| DEFAULT_OPENAI_API_BASE.to_string());
        if !openai_api_base.starts_with("http://") && !openai_api_base.starts_with("https://") {
            return Err(ConfigError::InvalidValue(
                "OPENAI_API_BASE".to_string(),
                format!("'{}' is not an http(s) URL", openai_api_base),
            ));
        }

        let realtime_model = non_empty_var("REALTIME_MODEL", DEFAULT_REALTIME_MODEL)?;
        let realtime_voice = non_empty_var("REALTIME_VOICE", DEFAULT_REALTIME_VOICE)?;
        let realtime_instructions =
            non_empty_var("REALTIME_INSTRUCTIONS", DEFAULT_REALTIME_INSTRUCTIONS)?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            bind_address,
            openai_api_key,
            openai_api_base,
            realtime_model,
            realtime_voice,
            realtime_instructions,
            log_level,
        })
    }

    /// Full URL of the provider's client secret endpoint.
    pub fn client_secrets_url(&self) -> String {
        format!(
            "{}/realtime/client_secrets",
            self.openai_api_base.trim_end_matches('/')
        )
    }
}

fn non_empty_var(name: &str, default: &str) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(value) if value.trim().is_empty() => Err(ConfigError::InvalidValue(
            name.to_string(),
            "must not be empty".to_string(),
        )),
        Ok(value) => Ok(value),
        Err(_) => Ok(default.to_string()),
    }
}
