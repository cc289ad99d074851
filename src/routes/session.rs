use axum::{
    Json, Router,
    extract::State,
    routing::{get, post, put},
};
use validator::Validate;

use crate::{
    dto::session::{
        EndSessionSummary, MatchHistoryEntry, RecordMatchRequest, RecordMatchSummary,
        SessionSummary, SetScoreRequest, StartSessionRequest,
    },
    error::AppError,
    services::session_service,
    state::SharedState,
};

/// Routes handling the session lifecycle, live scores and match history.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/session", get(get_session))
        .route("/session/start", post(start_session))
        .route("/session/score", put(set_score))
        .route("/session/record", post(record_match))
        .route("/session/end", post(end_session))
        .route("/matches", get(match_history))
}

/// Snapshot of the current session.
#[utoipa::path(
    get,
    path = "/session",
    tag = "session",
    responses((status = 200, description = "Current session", body = SessionSummary))
)]
pub async fn get_session(State(state): State<SharedState>) -> Json<SessionSummary> {
    Json(session_service::current_session(&state).await)
}

/// Start a new session for a roster of registered players.
#[utoipa::path(
    post,
    path = "/session/start",
    tag = "session",
    request_body = StartSessionRequest,
    responses(
        (status = 200, description = "Session started", body = SessionSummary),
        (status = 400, description = "Fewer than two players supplied"),
        (status = 409, description = "A session is already active")
    )
)]
pub async fn start_session(
    State(state): State<SharedState>,
    Json(payload): Json<StartSessionRequest>,
) -> Result<Json<SessionSummary>, AppError> {
    payload.validate()?;
    let summary = session_service::start_session(&state, payload).await?;
    Ok(Json(summary))
}

/// Edit the live score of the current match.
#[utoipa::path(
    put,
    path = "/session/score",
    tag = "session",
    request_body = SetScoreRequest,
    responses(
        (status = 200, description = "Score updated", body = SessionSummary),
        (status = 400, description = "Player is not part of the current match")
    )
)]
pub async fn set_score(
    State(state): State<SharedState>,
    Json(payload): Json<SetScoreRequest>,
) -> Result<Json<SessionSummary>, AppError> {
    payload.validate()?;
    let summary = session_service::set_score(&state, payload).await?;
    Ok(Json(summary))
}

/// Finalize the current match and advance to the next pairing.
#[utoipa::path(
    post,
    path = "/session/record",
    tag = "session",
    request_body = RecordMatchRequest,
    responses(
        (status = 200, description = "Match recorded", body = RecordMatchSummary),
        (status = 409, description = "No session is active")
    )
)]
pub async fn record_match(
    State(state): State<SharedState>,
    Json(payload): Json<RecordMatchRequest>,
) -> Result<Json<RecordMatchSummary>, AppError> {
    payload.validate()?;
    let summary = session_service::record_match(&state, payload).await?;
    Ok(Json(summary))
}

/// End the current session and fold its tallies into the aggregates.
#[utoipa::path(
    post,
    path = "/session/end",
    tag = "session",
    responses(
        (status = 200, description = "Session ended", body = EndSessionSummary),
        (status = 409, description = "No session is active")
    )
)]
pub async fn end_session(
    State(state): State<SharedState>,
) -> Result<Json<EndSessionSummary>, AppError> {
    let summary = session_service::end_session(&state).await?;
    Ok(Json(summary))
}

/// Permanent match history, newest first.
#[utoipa::path(
    get,
    path = "/matches",
    tag = "session",
    responses((status = 200, description = "Completed matches", body = [MatchHistoryEntry]))
)]
pub async fn match_history(
    State(state): State<SharedState>,
) -> Result<Json<Vec<MatchHistoryEntry>>, AppError> {
    let entries = session_service::match_history(&state).await?;
    Ok(Json(entries))
}
