//! Observable connection state of a voice controller.

use std::fmt;

/// Lifecycle of a single voice connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Idle,
    Connecting,
    Connected,
    Error,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::Idle => write!(f, "idle"),
            ConnectionStatus::Connecting => write!(f, "connecting"),
            ConnectionStatus::Connected => write!(f, "connected"),
            ConnectionStatus::Error => write!(f, "error"),
        }
    }
}

/// A snapshot of everything a view needs to render.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ControllerState {
    pub status: ConnectionStatus,
    /// Human-readable message for the last failed attempt.
    pub error: Option<String>,
    /// True while a session is connected and the microphone is live.
    pub listening: bool,
}

impl ControllerState {
    pub(crate) fn idle() -> Self {
        Self::default()
    }

    pub(crate) fn connecting() -> Self {
        Self {
            status: ConnectionStatus::Connecting,
            error: None,
            listening: false,
        }
    }

    pub(crate) fn connected() -> Self {
        Self {
            status: ConnectionStatus::Connected,
            error: None,
            listening: true,
        }
    }

    pub(crate) fn failed(message: String) -> Self {
        Self {
            status: ConnectionStatus::Error,
            error: Some(message),
            listening: false,
        }
    }
}
