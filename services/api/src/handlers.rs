//! Axum Handlers for the REST API
//!
//! Each turn endpoint runs exactly one orchestrator pass to completion while
//! holding the session lock, then returns the turns that pass appended.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use bytes::Bytes;
use havruta_core::{TurnOutcome, session::Session};
use std::sync::Arc;
use tracing::warn;

use crate::{
    audio_utils,
    models::{ErrorResponse, SessionSummary, TextTurnPayload, TurnResponse, TurnView},
    state::AppState,
};

/// Request-level failures. Turn failures are not errors here: they are
/// already in the transcript as notices.
pub enum ApiError {
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                warn!(%message, "Rejecting request");
                (StatusCode::BAD_REQUEST, Json(ErrorResponse { message })).into_response()
            }
        }
    }
}

/// Collects the turns appended since `start`.
fn turn_response(session: &Session, start: usize, outcome: TurnOutcome) -> TurnResponse {
    TurnResponse {
        outcome: outcome.into(),
        turns: session.transcript().turns()[start..]
            .iter()
            .map(TurnView::from)
            .collect(),
    }
}

/// Get the live session's id, topic and length.
#[utoipa::path(
    get,
    path = "/session",
    responses(
        (status = 200, description = "Session summary", body = SessionSummary)
    )
)]
pub async fn get_session(State(state): State<Arc<AppState>>) -> Json<SessionSummary> {
    let session = state.session.lock().await;
    Json(SessionSummary::from(&*session))
}

/// Get every turn of the live session, in append order.
#[utoipa::path(
    get,
    path = "/transcript",
    responses(
        (status = 200, description = "Transcript", body = [TurnView])
    )
)]
pub async fn get_transcript(State(state): State<Arc<AppState>>) -> Json<Vec<TurnView>> {
    let session = state.session.lock().await;
    Json(
        session
            .transcript()
            .turns()
            .iter()
            .map(TurnView::from)
            .collect(),
    )
}

/// Send a typed line.
#[utoipa::path(
    post,
    path = "/turns/text",
    request_body = TextTurnPayload,
    responses(
        (status = 200, description = "Turn processed", body = TurnResponse)
    )
)]
pub async fn post_text_turn(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<TextTurnPayload>,
) -> Json<TurnResponse> {
    let mut session = state.session.lock().await;
    let start = session.transcript().len();
    let outcome = state
        .orchestrator
        .handle_text(&mut session, &payload.text)
        .await;
    Json(turn_response(&session, start, outcome))
}

/// Submit a recorded clip (WAV body).
#[utoipa::path(
    post,
    path = "/turns/audio",
    request_body(content = Vec<u8>, content_type = "audio/wav"),
    responses(
        (status = 200, description = "Turn processed", body = TurnResponse),
        (status = 400, description = "Empty audio body", body = ErrorResponse)
    )
)]
pub async fn post_audio_turn(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<TurnResponse>, ApiError> {
    if body.is_empty() {
        return Err(ApiError::BadRequest("audio body is empty".to_string()));
    }
    if !audio_utils::is_riff_wave(&body) {
        warn!(bytes = body.len(), "Audio body has no RIFF/WAVE header; forwarding as-is");
    }

    let mut session = state.session.lock().await;
    let start = session.transcript().len();
    let outcome = state.orchestrator.handle_audio(&mut session, body).await;
    Ok(Json(turn_response(&session, start, outcome)))
}
