use std::time::SystemTime;

use tracing::info;
use uuid::Uuid;

use crate::{
    dao::models::PlayerEntity,
    dto::players::{CreatePlayerRequest, LeaderboardEntry, PlayerSummary},
    error::ServiceError,
    state::SharedState,
};

/// List every registered player.
pub async fn list_players(state: &SharedState) -> Result<Vec<PlayerSummary>, ServiceError> {
    let store = state.require_session_store().await?;
    let players = store.list_players().await?;
    Ok(players.into_iter().map(Into::into).collect())
}

/// Register a new player.
pub async fn create_player(
    state: &SharedState,
    request: CreatePlayerRequest,
) -> Result<PlayerSummary, ServiceError> {
    let store = state.require_session_store().await?;

    let name = request.name.trim().to_string();
    if name.is_empty() {
        return Err(ServiceError::InvalidInput(
            "player name must not be empty".into(),
        ));
    }

    let existing = store.list_players().await?;
    if existing
        .iter()
        .any(|player| player.name.eq_ignore_ascii_case(&name))
    {
        return Err(ServiceError::InvalidInput(format!(
            "a player named `{name}` already exists"
        )));
    }

    let entity = PlayerEntity {
        id: Uuid::new_v4(),
        name,
        created_at: SystemTime::now(),
    };
    store.create_player(entity.clone()).await?;

    info!(id = %entity.id, name = %entity.name, "player registered");
    Ok(entity.into())
}

/// Delete a registered player.
///
/// Players sitting on the roster of the active session cannot be removed;
/// the session must end first.
pub async fn delete_player(state: &SharedState, id: Uuid) -> Result<(), ServiceError> {
    let store = state.require_session_store().await?;

    {
        let session = state.session().read().await;
        if session.active && session.player(id).is_some() {
            return Err(ServiceError::InvalidState(format!(
                "player `{id}` is part of the active session"
            )));
        }
    }

    if !store.delete_player(id).await? {
        return Err(ServiceError::NotFound(format!("player `{id}` not found")));
    }

    info!(%id, "player deleted");
    Ok(())
}

/// All-time leaderboard: aggregate tallies joined with the registry, best
/// record first.
pub async fn leaderboard(state: &SharedState) -> Result<Vec<LeaderboardEntry>, ServiceError> {
    let store = state.require_session_store().await?;
    let (tallies, players) = (store.read_tallies().await?, store.list_players().await?);

    let mut entries: Vec<LeaderboardEntry> = tallies
        .into_iter()
        .map(|aggregate| {
            let name = players
                .iter()
                .find(|player| player.id == aggregate.player_id)
                .map(|player| player.name.clone());
            LeaderboardEntry::new(aggregate.player_id, name, aggregate.tally)
        })
        .collect();

    entries.sort_by(|a, b| {
        b.wins
            .cmp(&a.wins)
            .then(b.points.cmp(&a.points))
            .then(a.losses.cmp(&b.losses))
    });
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            models::TallyEntity,
            session_store::{SessionStore, memory::MemorySessionStore},
        },
        dto::session::StartSessionRequest,
        services::session_service,
        state::AppState,
    };

    async fn setup() -> (SharedState, MemorySessionStore) {
        let state = AppState::new(AppConfig::default());
        let store = MemorySessionStore::default();
        state
            .install_session_store(Arc::new(store.clone()) as Arc<dyn SessionStore>)
            .await;
        (state, store)
    }

    fn request(name: &str) -> CreatePlayerRequest {
        CreatePlayerRequest {
            name: name.to_string(),
        }
    }

    #[tokio::test]
    async fn create_trims_and_rejects_duplicates() {
        let (state, _store) = setup().await;

        let player = create_player(&state, request("  Ana ")).await.unwrap();
        assert_eq!(player.name, "Ana");

        let err = create_player(&state, request("ana")).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));

        let err = create_player(&state, request("   ")).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));

        assert_eq!(list_players(&state).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn delete_refuses_players_on_the_active_roster() {
        let (state, _store) = setup().await;
        let ana = create_player(&state, request("ana")).await.unwrap();
        let bo = create_player(&state, request("bo")).await.unwrap();
        let idle = create_player(&state, request("cy")).await.unwrap();

        session_service::start_session(
            &state,
            StartSessionRequest {
                player_ids: vec![ana.id, bo.id],
            },
        )
        .await
        .unwrap();

        let err = delete_player(&state, ana.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));

        // Bystanders can still be removed mid-session.
        delete_player(&state, idle.id).await.unwrap();

        let err = delete_player(&state, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn leaderboard_ranks_by_wins_then_points() {
        let (state, store) = setup().await;
        let ana = create_player(&state, request("ana")).await.unwrap();
        let bo = create_player(&state, request("bo")).await.unwrap();

        store
            .upsert_tally(
                ana.id,
                TallyEntity {
                    wins: 1,
                    losses: 2,
                    points: 30,
                    games: 3,
                },
            )
            .await
            .unwrap();
        store
            .upsert_tally(
                bo.id,
                TallyEntity {
                    wins: 2,
                    losses: 1,
                    points: 25,
                    games: 3,
                },
            )
            .await
            .unwrap();

        let entries = leaderboard(&state).await.unwrap();
        assert_eq!(entries[0].id, bo.id);
        assert_eq!(entries[0].name.as_deref(), Some("bo"));
        assert_eq!(entries[1].id, ana.id);
    }
}
