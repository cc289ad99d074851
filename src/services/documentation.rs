use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Rally Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::players::list_players,
        crate::routes::players::create_player,
        crate::routes::players::delete_player,
        crate::routes::players::leaderboard,
        crate::routes::session::get_session,
        crate::routes::session::start_session,
        crate::routes::session::set_score,
        crate::routes::session::record_match,
        crate::routes::session::end_session,
        crate::routes::session::match_history,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::players::CreatePlayerRequest,
            crate::dto::players::PlayerSummary,
            crate::dto::players::LeaderboardEntry,
            crate::dto::session::StartSessionRequest,
            crate::dto::session::SetScoreRequest,
            crate::dto::session::RecordMatchRequest,
            crate::dto::session::SessionSummary,
            crate::dto::session::CurrentMatchSummary,
            crate::dto::session::UpcomingMatchSummary,
            crate::dto::session::SessionTally,
            crate::dto::session::RosterPlayer,
            crate::dto::session::RecordMatchSummary,
            crate::dto::session::EndSessionSummary,
            crate::dto::session::MatchHistoryEntry,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "players", description = "Player registry and leaderboard"),
        (name = "session", description = "Live session lifecycle, scores and history"),
    )
)]
pub struct ApiDoc;
