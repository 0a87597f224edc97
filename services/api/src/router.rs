//! Axum Router Configuration
//!
//! This module defines the complete HTTP routing for the application,
//! including the turn endpoints and OpenAPI documentation.

use crate::{
    handlers,
    models::{
        ErrorResponse, Outcome, SessionSummary, TextTurnPayload, TurnResponse, TurnRole, TurnView,
    },
    state::AppState,
};

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::get_session,
        handlers::get_transcript,
        handlers::post_text_turn,
        handlers::post_audio_turn,
    ),
    components(
        schemas(SessionSummary, TurnView, TurnRole, TextTurnPayload, TurnResponse, Outcome, ErrorResponse)
    ),
    tags(
        (name = "Havruta API", description = "Turn processing for the havruta dialogue partner")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    // Group all routes that require AppState into their own router.
    let api_router = Router::new()
        .route("/session", get(handlers::get_session))
        .route("/transcript", get(handlers::get_transcript))
        .route("/turns/text", post(handlers::post_text_turn))
        .route("/turns/audio", post(handlers::post_audio_turn))
        .with_state(app_state);

    // Merge the stateful routes with the stateless ones (like Swagger UI).
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_router)
}
