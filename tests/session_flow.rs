//! End-to-end flow over two backend instances sharing one store: edits made
//! on one instance become visible on the other through the polling
//! synchronizer.

use std::{sync::Arc, time::Duration};

use rally_back::{
    config::AppConfig,
    dao::session_store::{SessionStore, memory::MemorySessionStore},
    dto::{
        players::CreatePlayerRequest,
        session::{RecordMatchRequest, SetScoreRequest, StartSessionRequest},
    },
    services::{player_service, session_service, synchronizer},
    state::{AppState, SharedState},
};

fn config() -> AppConfig {
    AppConfig {
        rotation_length: 6,
        low_watermark: 2,
        poll_interval: Duration::from_millis(50),
    }
}

async fn instance(store: &MemorySessionStore) -> SharedState {
    let state = AppState::new(config());
    state
        .install_session_store(Arc::new(store.clone()) as Arc<dyn SessionStore>)
        .await;
    state
}

#[tokio::test]
async fn two_instances_converge_on_one_session() {
    let store = MemorySessionStore::new();
    let alpha = instance(&store).await;
    let beta = instance(&store).await;

    // Register the roster on one instance; the registry lives in the store.
    let mut ids = Vec::new();
    for name in ["ana", "bo", "cy"] {
        let player = player_service::create_player(
            &alpha,
            CreatePlayerRequest {
                name: name.to_string(),
            },
        )
        .await
        .unwrap();
        ids.push(player.id);
    }
    assert_eq!(player_service::list_players(&beta).await.unwrap().len(), 3);

    // Alpha starts the session; beta picks it up on its next poll.
    let started = session_service::start_session(&alpha, StartSessionRequest { player_ids: ids })
        .await
        .unwrap();
    assert!(started.active);

    synchronizer::poll_once(&beta).await.unwrap();
    let on_beta = session_service::current_session(&beta).await;
    assert!(on_beta.active);
    assert_eq!(on_beta.players.len(), 3);
    assert_eq!(on_beta.queue_length, started.queue_length);

    // Beta edits the live score; alpha adopts it via its poll.
    let current = on_beta.current.unwrap();
    session_service::set_score(
        &beta,
        SetScoreRequest {
            player_id: current.player1.id,
            value: None,
            delta: Some(1),
        },
    )
    .await
    .unwrap();
    session_service::set_score(
        &beta,
        SetScoreRequest {
            player_id: current.player1.id,
            value: None,
            delta: Some(1),
        },
    )
    .await
    .unwrap();

    synchronizer::poll_once(&alpha).await.unwrap();
    let live = session_service::current_session(&alpha)
        .await
        .current
        .unwrap();
    assert_eq!((live.score1, live.score2), (2, 0));

    // Alpha records the match; beta converges on the advanced cursor and the
    // folded tallies.
    let recorded = session_service::record_match(
        &alpha,
        RecordMatchRequest {
            score1: Some(11),
            score2: Some(7),
        },
    )
    .await
    .unwrap();
    assert_eq!(recorded.winner, Some(current.player1.id));

    synchronizer::poll_once(&beta).await.unwrap();
    let on_beta = session_service::current_session(&beta).await;
    assert_eq!(on_beta.played, 1);
    let winner_tally = on_beta
        .tallies
        .iter()
        .find(|tally| tally.player.id == current.player1.id)
        .unwrap();
    assert_eq!((winner_tally.wins, winner_tally.points), (1, 11));

    // History and leaderboard are shared reads.
    let history = session_service::match_history(&beta).await.unwrap();
    assert_eq!(history.len(), 1);

    let ended = session_service::end_session(&alpha).await.unwrap();
    assert_eq!(ended.reason, "manual");

    synchronizer::poll_once(&beta).await.unwrap();
    assert!(!session_service::current_session(&beta).await.active);

    let standings = player_service::leaderboard(&alpha).await.unwrap();
    assert_eq!(standings[0].id, current.player1.id);
    assert_eq!(standings[0].wins, 1);
}

#[tokio::test]
async fn pending_edit_survives_a_stale_poll_and_flushes() {
    let store = MemorySessionStore::new();
    let alpha = instance(&store).await;

    let mut ids = Vec::new();
    for name in ["ana", "bo"] {
        let player = player_service::create_player(
            &alpha,
            CreatePlayerRequest {
                name: name.to_string(),
            },
        )
        .await
        .unwrap();
        ids.push(player.id);
    }
    session_service::start_session(&alpha, StartSessionRequest { player_ids: ids })
        .await
        .unwrap();
    let current = session_service::current_session(&alpha)
        .await
        .current
        .unwrap();

    // Simulate a write-through that never landed: mutate locally and raise
    // the pending flag while the store still holds the pre-edit document.
    let pre_edit = store.read_session().await.unwrap().unwrap();
    session_service::set_score(
        &alpha,
        SetScoreRequest {
            player_id: current.player1.id,
            value: Some(9),
            delta: None,
        },
    )
    .await
    .unwrap();
    store.write_session(pre_edit).await.unwrap();
    alpha.sync().write().await.pending_write = true;

    // The next poll flushes the edit before merging, so the stale snapshot
    // cannot clobber it.
    synchronizer::poll_once(&alpha).await.unwrap();
    assert!(!alpha.sync().read().await.pending_write);

    let live = session_service::current_session(&alpha)
        .await
        .current
        .unwrap();
    assert_eq!(live.score1, 9);
    let stored = store.read_session().await.unwrap().unwrap();
    assert_eq!(stored.queue[0].score1, 9);
}
