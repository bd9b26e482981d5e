//! Realtime Session Abstraction
//!
//! The live voice protocol belongs to the provider. This module only defines
//! the seam the controller needs: build a session for an agent, connect it
//! with a short-lived credential, and close it.

use crate::agent::RealtimeAgent;
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::fmt;

/// A short-lived credential authorizing exactly one realtime session.
///
/// The value is never printed; `Debug` is redacted.
pub struct SessionCredential(SecretString);

impl SessionCredential {
    pub fn new(value: impl Into<String>) -> Self {
        Self(SecretString::from(value.into()))
    }

    /// Returns the raw token, for use in an `Authorization` header.
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for SessionCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionCredential([REDACTED])")
    }
}

/// Failures raised by a realtime session implementation.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Failed to connect realtime session: {0}")]
    Connect(String),
    #[error("Realtime session is already connected")]
    AlreadyConnected,
    #[error("Realtime session already closed")]
    Closed,
    #[error("Invalid session configuration: {0}")]
    InvalidConfig(String),
}

/// A provider-owned realtime voice session.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RealtimeSession: Send {
    /// Establishes the live connection using a short-lived credential.
    async fn connect(&mut self, credential: &SessionCredential) -> Result<(), SessionError>;

    /// Releases the session. Must be safe to call on a session that never connected.
    fn close(&mut self) -> Result<(), SessionError>;
}

/// Builds sessions bound to an agent and a realtime model.
pub trait SessionFactory: Send + Sync {
    type Session: RealtimeSession + 'static;

    fn create(&self, agent: &RealtimeAgent, model: &str) -> Result<Self::Session, SessionError>;
}
