//! Habla Core
//!
//! Client-side building blocks for a realtime voice chat: the connection
//! controller, the session abstraction it drives, the broker client that
//! fetches short-lived credentials, and an adapter for the OpenAI Realtime API.

pub mod agent;
pub mod broker;
pub mod controller;
pub mod openai;
pub mod session;
pub mod state;

pub use agent::RealtimeAgent;
pub use broker::{BrokerClient, TokenError, TokenSource};
pub use controller::{ControllerError, VoiceController};
pub use session::{RealtimeSession, SessionCredential, SessionError, SessionFactory};
pub use state::{ConnectionStatus, ControllerState};

/// The realtime model every session is bound to unless overridden.
pub const DEFAULT_REALTIME_MODEL: &str = "gpt-realtime";
