//! Habla API Library Crate
//!
//! The token broker: configuration, the client secret issuer, HTTP handlers
//! and routing. The `api` binary is a thin wrapper around this library.

pub mod broker;
pub mod config;
pub mod handlers;
pub mod models;
pub mod router;
pub mod state;
