//! Axum Handlers for the REST API
//!
//! The token endpoint answers `GET` and `POST` identically. It uses `utoipa`
//! doc comments to generate OpenAPI documentation.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;

use crate::{
    broker::{BrokerError, no_store_headers},
    models::{ErrorResponse, TokenResponse},
    state::AppState,
};

/// Mint a short-lived realtime client secret.
#[utoipa::path(
    get,
    path = "/api/realtime-token",
    responses(
        (status = 200, description = "Client secret issued", body = TokenResponse),
        (status = 500, description = "Missing provider key or provider failure", body = ErrorResponse)
    )
)]
pub async fn get_realtime_token(
    State(state): State<Arc<AppState>>,
) -> Result<Response, BrokerError> {
    mint_token(&state).await
}

/// Mint a short-lived realtime client secret (non-cacheable variant).
#[utoipa::path(
    post,
    path = "/api/realtime-token",
    responses(
        (status = 200, description = "Client secret issued", body = TokenResponse),
        (status = 500, description = "Missing provider key or provider failure", body = ErrorResponse)
    )
)]
pub async fn post_realtime_token(
    State(state): State<Arc<AppState>>,
) -> Result<Response, BrokerError> {
    mint_token(&state).await
}

async fn mint_token(state: &AppState) -> Result<Response, BrokerError> {
    let value = state.issuer.issue().await?;
    Ok((
        StatusCode::OK,
        no_store_headers(),
        Json(TokenResponse { value }),
    )
        .into_response())
}
