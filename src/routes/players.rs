use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::players::{CreatePlayerRequest, LeaderboardEntry, PlayerSummary},
    error::AppError,
    services::player_service,
    state::SharedState,
};

/// Routes handling the player registry and the all-time leaderboard.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/players", get(list_players).post(create_player))
        .route("/players/{id}", delete(delete_player))
        .route("/leaderboard", get(leaderboard))
}

/// List every registered player.
#[utoipa::path(
    get,
    path = "/players",
    tag = "players",
    responses((status = 200, description = "Registered players", body = [PlayerSummary]))
)]
pub async fn list_players(
    State(state): State<SharedState>,
) -> Result<Json<Vec<PlayerSummary>>, AppError> {
    let players = player_service::list_players(&state).await?;
    Ok(Json(players))
}

/// Register a new player.
#[utoipa::path(
    post,
    path = "/players",
    tag = "players",
    request_body = CreatePlayerRequest,
    responses((status = 201, description = "Player registered", body = PlayerSummary))
)]
pub async fn create_player(
    State(state): State<SharedState>,
    Json(payload): Json<CreatePlayerRequest>,
) -> Result<(StatusCode, Json<PlayerSummary>), AppError> {
    payload.validate()?;
    let player = player_service::create_player(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(player)))
}

/// Delete a registered player.
#[utoipa::path(
    delete,
    path = "/players/{id}",
    tag = "players",
    params(("id" = Uuid, Path, description = "Identifier of the player to delete")),
    responses((status = 204, description = "Player deleted"))
)]
pub async fn delete_player(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    player_service::delete_player(&state, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// All-time leaderboard, best record first.
#[utoipa::path(
    get,
    path = "/leaderboard",
    tag = "players",
    responses((status = 200, description = "All-time standings", body = [LeaderboardEntry]))
)]
pub async fn leaderboard(
    State(state): State<SharedState>,
) -> Result<Json<Vec<LeaderboardEntry>>, AppError> {
    let entries = player_service::leaderboard(&state).await?;
    Ok(Json(entries))
}
