use std::time::SystemTime;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dao::{
        models::{MatchRecordEntity, SessionEntity, SessionFieldsPatch},
        storage::StorageError,
    },
    dto::session::{
        EndSessionSummary, MatchHistoryEntry, RecordMatchRequest, RecordMatchSummary,
        RosterPlayer, SessionSummary, SetScoreRequest, StartSessionRequest,
    },
    error::ServiceError,
    state::{EndReason, Player, SessionError, SharedState, session::SessionState},
};

/// Start a new session for the given roster.
///
/// The roster is resolved against the player registry, the initial rotation
/// is built locally and the resulting session document is pushed to the
/// shared store so other instances pick it up on their next poll.
pub async fn start_session(
    state: &SharedState,
    request: StartSessionRequest,
) -> Result<SessionSummary, ServiceError> {
    let store = state.require_session_store().await?;

    {
        let session = state.session().read().await;
        if session.active {
            return Err(SessionError::AlreadyActive.into());
        }
    }

    let registry = store.list_players().await?;
    let roster: Vec<Player> = request
        .player_ids
        .iter()
        .map(|id| {
            registry
                .iter()
                .find(|player| player.id == *id)
                .map(|player| Player {
                    id: player.id,
                    name: player.name.clone(),
                })
                .ok_or_else(|| ServiceError::NotFound(format!("player `{id}` is not registered")))
        })
        .collect::<Result<_, _>>()?;

    let session = SessionState::start(roster, state.config().rotation_length)?;
    store.write_session(session.clone().into()).await?;

    let summary = SessionSummary::from(&session);
    {
        let mut slot = state.session().write().await;
        *slot = session;
    }
    state.sync().write().await.reset();

    info!(
        players = summary.players.len(),
        queue = summary.queue_length,
        "session started"
    );
    Ok(summary)
}

/// Snapshot of the locally cached session.
pub async fn current_session(state: &SharedState) -> SessionSummary {
    let session = state.session().read().await;
    SessionSummary::from(&*session)
}

/// Edit the live score of the current match.
///
/// The edit always lands locally first. The write-through to the shared
/// store is best-effort: when the store is unreachable the edit stays marked
/// as pending and the synchronizer re-flushes it on a later tick.
pub async fn set_score(
    state: &SharedState,
    request: SetScoreRequest,
) -> Result<SessionSummary, ServiceError> {
    let (patch, summary) = {
        let mut session = state.session().write().await;
        match (request.value, request.delta) {
            (Some(value), None) => session.set_score(request.player_id, value)?,
            (None, Some(delta)) => {
                session.adjust_score(request.player_id, delta)?;
            }
            _ => {
                return Err(ServiceError::InvalidInput(
                    "exactly one of `value` and `delta` is required".into(),
                ));
            }
        }

        let slot = session.current_match().ok_or(SessionError::NoCurrentMatch)?;
        let patch = SessionFieldsPatch {
            cursor: session.cursor,
            score1: Some(slot.score1),
            score2: Some(slot.score2),
            updated_at: Some(session.updated_at),
        };
        let summary = SessionSummary::from(&*session);

        let mut sync = state.sync().write().await;
        sync.pending_write = true;
        sync.last_local_write = Some(session.updated_at);

        (patch, summary)
    };

    flush_score_patch(state, patch).await;
    Ok(summary)
}

/// Push a live-score patch to the shared store.
///
/// The patch carries its own stamp as the freshness guard, and the pending
/// flag drops only while that stamp is still the latest local edit; a newer
/// edit made while this write was in flight stays pending for the
/// synchronizer. Unreachable-store failures are logged and retried on the
/// next tick.
pub async fn flush_score_patch(state: &SharedState, patch: SessionFieldsPatch) {
    let Some(store) = state.session_store().await else {
        warn!("score edit kept local; storage unavailable (degraded mode)");
        return;
    };
    let Some(stamp) = patch.updated_at else {
        return;
    };

    match store.update_session_fields(patch, Some(stamp)).await {
        Ok(()) => state.sync().write().await.acknowledge_flush(stamp),
        Err(StorageError::StalePatch) => {
            // The store already holds a newer write; the merge rule settles
            // which score survives on the next poll.
            debug!("score write-through superseded by a newer remote write");
            state.sync().write().await.acknowledge_flush(stamp);
        }
        Err(err) => {
            warn!(error = %err, "score write-through failed; will retry on next sync tick");
        }
    }
}

/// Finalize the current match, advance the cursor and persist the outcome.
pub async fn record_match(
    state: &SharedState,
    request: RecordMatchRequest,
) -> Result<RecordMatchSummary, ServiceError> {
    let config = state.config();
    let (recorded, entity) = {
        let mut session = state.session().write().await;

        if let (Some(score1), Some(score2)) = (request.score1, request.score2) {
            let pairing = session
                .current_match()
                .ok_or(SessionError::NoCurrentMatch)?
                .pairing;
            session.set_score(pairing.player1, score1)?;
            session.set_score(pairing.player2, score2)?;
        }

        let recorded =
            session.record_current_match(config.low_watermark, config.rotation_length)?;
        let entity: SessionEntity = session.clone().into();
        (recorded, entity)
    };

    // A recorded match supersedes any in-flight score edit.
    state.sync().write().await.note_local_write(entity.updated_at);

    let record = MatchRecordEntity {
        id: Uuid::new_v4(),
        player1: recorded.pairing.player1,
        player2: recorded.pairing.player2,
        score1: recorded.score1,
        score2: recorded.score2,
        winner: recorded.winner,
        finished_at: SystemTime::now(),
    };

    if let Some(store) = state.session_store().await {
        if let Err(err) = store.append_match(record).await {
            warn!(error = %err, "failed to append match to permanent history");
        }
        if let Err(err) = store.write_session(entity).await {
            warn!(error = %err, "failed to push recorded session to shared store");
        }
    } else {
        warn!("match recorded locally only; storage unavailable (degraded mode)");
    }

    let mut summary = RecordMatchSummary {
        player1: recorded.pairing.player1,
        player2: recorded.pairing.player2,
        score1: recorded.score1,
        score2: recorded.score2,
        winner: recorded.winner,
        extended_by: recorded.extended_by,
        session_ended: None,
    };

    if let Some(reason) = recorded.ended {
        let ended = finish_session(state, reason).await;
        summary.session_ended = Some(ended.reason);
    }

    Ok(summary)
}

/// End the current session at a client's request.
pub async fn end_session(state: &SharedState) -> Result<EndSessionSummary, ServiceError> {
    {
        let session = state.session().read().await;
        if !session.active {
            return Err(SessionError::NotActive.into());
        }
    }
    Ok(finish_session(state, EndReason::Manual).await)
}

/// Shared teardown for both manual and queue-exhausted endings.
///
/// The local reset always happens; folding tallies into the all-time
/// aggregates and clearing the shared document are best-effort so an
/// unreachable store can never leave a session stuck active.
async fn finish_session(state: &SharedState, reason: EndReason) -> EndSessionSummary {
    let (tallies, entity) = {
        let mut session = state.session().write().await;
        let tallies = session.end().unwrap_or_default();
        let entity: SessionEntity = session.clone().into();
        (tallies, entity)
    };
    state.sync().write().await.reset();

    let folded_players = tallies.len();
    if let Some(store) = state.session_store().await {
        for (player_id, tally) in tallies {
            if let Err(err) = store.upsert_tally(player_id, tally.into()).await {
                warn!(%player_id, error = %err, "failed to fold session tally into aggregates");
            }
        }
        if let Err(err) = store.write_session(entity).await {
            warn!(error = %err, "failed to clear shared session document");
        }
    } else {
        warn!("session ended locally only; storage unavailable (degraded mode)");
    }

    info!(reason = reason.as_str(), folded_players, "session ended");
    EndSessionSummary {
        reason: reason.as_str().to_string(),
        folded_players,
    }
}

/// Permanent match history, newest first, with player names resolved.
pub async fn match_history(state: &SharedState) -> Result<Vec<MatchHistoryEntry>, ServiceError> {
    let store = state.require_session_store().await?;
    let (records, players) = (store.list_matches().await?, store.list_players().await?);

    let resolve = |id: Uuid| RosterPlayer {
        id,
        name: players
            .iter()
            .find(|player| player.id == id)
            .map(|player| player.name.clone())
            .unwrap_or_default(),
    };

    Ok(records
        .into_iter()
        .map(|record| MatchHistoryEntry {
            id: record.id,
            player1: resolve(record.player1),
            player2: resolve(record.player2),
            score1: record.score1,
            score2: record.score2,
            winner: record.winner,
            finished_at: crate::dto::format_system_time(record.finished_at),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use super::*;
    use crate::{
        config::AppConfig,
        dao::session_store::{SessionStore, memory::MemorySessionStore},
        dto::players::CreatePlayerRequest,
        services::player_service,
        state::AppState,
    };

    async fn setup(config: AppConfig, names: &[&str]) -> (SharedState, MemorySessionStore, Vec<Uuid>) {
        let state = AppState::new(config);
        let store = MemorySessionStore::default();
        state
            .install_session_store(Arc::new(store.clone()) as Arc<dyn SessionStore>)
            .await;

        let mut ids = Vec::new();
        for name in names {
            let player = player_service::create_player(
                &state,
                CreatePlayerRequest {
                    name: (*name).to_string(),
                },
            )
            .await
            .unwrap();
            ids.push(player.id);
        }
        (state, store, ids)
    }

    fn small_config() -> AppConfig {
        AppConfig {
            rotation_length: 6,
            low_watermark: 2,
            poll_interval: Duration::from_millis(100),
        }
    }

    #[tokio::test]
    async fn start_builds_and_publishes_the_session() {
        let (state, store, ids) = setup(small_config(), &["ana", "bo", "cy"]).await;

        let summary = start_session(&state, StartSessionRequest { player_ids: ids }).await.unwrap();
        assert!(summary.active);
        assert_eq!(summary.players.len(), 3);
        assert!(summary.queue_length >= 6);
        assert!(summary.current.is_some());

        let stored = store.read_session().await.unwrap().unwrap();
        assert!(stored.active);
        assert_eq!(stored.cursor, 0);
    }

    #[tokio::test]
    async fn start_rejects_unknown_players_and_double_start() {
        let (state, _store, ids) = setup(small_config(), &["ana", "bo"]).await;

        let mut with_ghost = ids.clone();
        with_ghost.push(Uuid::new_v4());
        let err = start_session(&state, StartSessionRequest { player_ids: with_ghost })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));

        start_session(&state, StartSessionRequest { player_ids: ids.clone() }).await.unwrap();
        let err = start_session(&state, StartSessionRequest { player_ids: ids })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test]
    async fn score_edits_write_through_to_the_store() {
        let (state, store, ids) = setup(small_config(), &["ana", "bo", "cy"]).await;
        start_session(&state, StartSessionRequest { player_ids: ids }).await.unwrap();

        let current = current_session(&state).await.current.unwrap();
        set_score(
            &state,
            SetScoreRequest {
                player_id: current.player1.id,
                value: Some(7),
                delta: None,
            },
        )
        .await
        .unwrap();
        let summary = set_score(
            &state,
            SetScoreRequest {
                player_id: current.player2.id,
                value: None,
                delta: Some(1),
            },
        )
        .await
        .unwrap();

        let live = summary.current.unwrap();
        assert_eq!((live.score1, live.score2), (7, 1));
        // The write-through landed, so nothing stays pending.
        assert!(!state.sync().read().await.pending_write);

        let stored = store.read_session().await.unwrap().unwrap();
        assert_eq!((stored.queue[0].score1, stored.queue[0].score2), (7, 1));
    }

    #[tokio::test]
    async fn an_older_inflight_flush_keeps_a_newer_edit_pending() {
        let (state, store, ids) = setup(small_config(), &["ana", "bo", "cy"]).await;
        start_session(&state, StartSessionRequest { player_ids: ids }).await.unwrap();

        // First edit, but hold its patch back as if the write were still in
        // flight; then a second edit lands locally before the first one
        // reaches the store.
        let (older_patch, target) = {
            let mut session = state.session().write().await;
            let pairing = session.current_match().unwrap().pairing;
            session.set_score(pairing.player1, 5).unwrap();
            let patch = SessionFieldsPatch {
                cursor: session.cursor,
                score1: Some(5),
                score2: None,
                updated_at: Some(session.updated_at),
            };

            session.set_score(pairing.player1, 7).unwrap();
            // Force a strictly newer stamp than the held-back patch.
            session.updated_at = session.updated_at + Duration::from_millis(1);
            let mut sync = state.sync().write().await;
            sync.pending_write = true;
            sync.last_local_write = Some(session.updated_at);
            (patch, pairing.player1)
        };

        flush_score_patch(&state, older_patch).await;

        // The older write settling must not orphan the newer edit.
        assert!(state.sync().read().await.pending_write);
        assert_eq!(store.read_session().await.unwrap().unwrap().queue[0].score1, 5);

        // The next sync tick delivers it.
        crate::services::synchronizer::poll_once(&state).await.unwrap();
        assert!(!state.sync().read().await.pending_write);
        let stored = store.read_session().await.unwrap().unwrap();
        assert_eq!(stored.queue[0].score1, 7);

        let session = state.session().read().await;
        assert!(session.current_match().unwrap().pairing.contains(target));
        assert_eq!(session.current_match().unwrap().score1, 7);
    }

    #[tokio::test]
    async fn ending_with_storage_down_still_resets_local_state() {
        let (state, store, ids) = setup(small_config(), &["ana", "bo", "cy"]).await;
        start_session(&state, StartSessionRequest { player_ids: ids }).await.unwrap();
        record_match(
            &state,
            RecordMatchRequest {
                score1: Some(11),
                score2: Some(5),
            },
        )
        .await
        .unwrap();

        state.clear_session_store().await;

        let summary = end_session(&state).await.unwrap();
        assert_eq!(summary.reason, "manual");
        assert_eq!(summary.folded_players, 3);

        let session = state.session().read().await;
        assert!(!session.active);
        assert!(session.queue.is_empty());
        assert!(session.tallies.is_empty());
        drop(session);

        // The shared document never saw the end, yet nothing stayed stuck
        // locally and the aggregates were simply not folded remotely.
        let stored = store.read_session().await.unwrap().unwrap();
        assert!(stored.active);
        assert!(store.read_tallies().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn recording_appends_history_and_advances() {
        let (state, store, ids) = setup(small_config(), &["ana", "bo", "cy"]).await;
        start_session(&state, StartSessionRequest { player_ids: ids }).await.unwrap();
        let current = current_session(&state).await.current.unwrap();

        let summary = record_match(
            &state,
            RecordMatchRequest {
                score1: Some(11),
                score2: Some(9),
            },
        )
        .await
        .unwrap();

        assert_eq!(summary.winner, Some(current.player1.id));
        assert!(summary.session_ended.is_none());
        assert_eq!(current_session(&state).await.played, 1);

        let history = match_history(&state).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].player1.name, current.player1.name);
        assert_eq!((history[0].score1, history[0].score2), (11, 9));

        let stored = store.read_session().await.unwrap().unwrap();
        assert_eq!(stored.cursor, 1);
        assert!(stored.queue[0].completed);
    }

    #[tokio::test]
    async fn a_tie_records_without_a_winner() {
        let (state, _store, ids) = setup(small_config(), &["ana", "bo"]).await;
        start_session(&state, StartSessionRequest { player_ids: ids }).await.unwrap();

        let summary = record_match(
            &state,
            RecordMatchRequest {
                score1: Some(10),
                score2: Some(10),
            },
        )
        .await
        .unwrap();
        assert_eq!(summary.winner, None);

        let history = match_history(&state).await.unwrap();
        assert_eq!(history[0].winner, None);
    }

    #[tokio::test]
    async fn ending_folds_tallies_into_the_aggregates() {
        let (state, store, ids) = setup(small_config(), &["ana", "bo", "cy"]).await;
        start_session(&state, StartSessionRequest { player_ids: ids.clone() }).await.unwrap();
        let current = current_session(&state).await.current.unwrap();

        record_match(
            &state,
            RecordMatchRequest {
                score1: Some(11),
                score2: Some(5),
            },
        )
        .await
        .unwrap();

        let summary = end_session(&state).await.unwrap();
        assert_eq!(summary.reason, "manual");
        assert_eq!(summary.folded_players, 3);

        assert!(!current_session(&state).await.active);
        let stored = store.read_session().await.unwrap().unwrap();
        assert!(!stored.active);

        let aggregates = store.read_tallies().await.unwrap();
        let winner = aggregates
            .iter()
            .find(|entry| entry.player_id == current.player1.id)
            .unwrap();
        assert_eq!((winner.tally.wins, winner.tally.points), (1, 11));

        let err = end_session(&state).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test]
    async fn exhausting_the_queue_ends_the_session() {
        // A one-match rotation with no refill watermark runs dry immediately.
        let config = AppConfig {
            rotation_length: 1,
            low_watermark: 0,
            poll_interval: Duration::from_millis(100),
        };
        let (state, _store, ids) = setup(config, &["ana", "bo"]).await;
        start_session(&state, StartSessionRequest { player_ids: ids }).await.unwrap();

        let summary = record_match(
            &state,
            RecordMatchRequest {
                score1: Some(3),
                score2: Some(1),
            },
        )
        .await
        .unwrap();

        assert_eq!(summary.session_ended.as_deref(), Some("queue-exhausted"));
        assert!(!current_session(&state).await.active);
    }

    #[tokio::test]
    async fn degraded_mode_rejects_session_start() {
        let state = AppState::new(small_config());
        let err = start_session(
            &state,
            StartSessionRequest {
                player_ids: vec![Uuid::new_v4(), Uuid::new_v4()],
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::Degraded));
    }
}
