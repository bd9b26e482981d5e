//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds the shared,
//! clonable resources handed to every handler.

use crate::{broker::ClientSecretIssuer, config::Config};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub issuer: Arc<ClientSecretIssuer>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let issuer = ClientSecretIssuer::new(reqwest::Client::new(), &config);
        Self {
            issuer: Arc::new(issuer),
            config: Arc::new(config),
        }
    }
}
