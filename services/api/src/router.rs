//! Axum Router Configuration
//!
//! This module defines the HTTP routing for the broker, including the token
//! endpoint and the OpenAPI documentation.

use crate::{
    handlers,
    models::{ErrorResponse, TokenResponse},
    state::AppState,
};

use axum::{Router, routing::get};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(handlers::get_realtime_token, handlers::post_realtime_token),
    components(schemas(TokenResponse, ErrorResponse)),
    tags(
        (name = "Habla API", description = "Short-lived credentials for realtime voice sessions")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_router = Router::new()
        .route(
            "/api/realtime-token",
            get(handlers::get_realtime_token).post(handlers::post_realtime_token),
        )
        .with_state(app_state);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_router)
}
