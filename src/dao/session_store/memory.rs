use std::{sync::Arc, time::SystemTime};

use futures::future::BoxFuture;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::dao::{
    models::{
        AggregateTallyEntity, MatchRecordEntity, PlayerEntity, SessionEntity, SessionFieldsPatch,
        TallyEntity,
    },
    session_store::SessionStore,
    storage::{StorageError, StorageResult},
};

/// In-memory [`SessionStore`] backend.
///
/// Mirrors the semantics of the real backends (point reads, last-write-wins
/// field patches with an optional freshness guard) without any network, so
/// the service layer and the synchronizer can be exercised in tests and in
/// storeless development runs.
#[derive(Clone, Default)]
pub struct MemorySessionStore {
    inner: Arc<RwLock<MemoryInner>>,
}

#[derive(Default)]
struct MemoryInner {
    session: Option<SessionEntity>,
    players: Vec<PlayerEntity>,
    matches: Vec<MatchRecordEntity>,
    tallies: Vec<AggregateTallyEntity>,
}

impl MemorySessionStore {
    /// Create an empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    async fn apply_patch(
        &self,
        patch: SessionFieldsPatch,
        expected_newer_than: Option<SystemTime>,
    ) -> StorageResult<()> {
        let mut inner = self.inner.write().await;
        let Some(session) = inner.session.as_mut() else {
            return Err(StorageError::unavailable(
                "no session document to patch".into(),
                std::io::Error::new(std::io::ErrorKind::NotFound, "session missing"),
            ));
        };

        if let Some(expected) = expected_newer_than
            && session.updated_at > expected
        {
            return Err(StorageError::StalePatch);
        }

        if let Some(slot) = session.queue.get_mut(patch.cursor) {
            if let Some(score1) = patch.score1 {
                slot.score1 = score1;
            }
            if let Some(score2) = patch.score2 {
                slot.score2 = score2;
            }
        }
        if let Some(stamp) = patch.updated_at {
            session.updated_at = stamp;
        }
        Ok(())
    }
}

impl SessionStore for MemorySessionStore {
    fn read_session(&self) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.inner.read().await.session.clone()) })
    }

    fn write_session(&self, session: SessionEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.inner.write().await.session = Some(session);
            Ok(())
        })
    }

    fn update_session_fields(
        &self,
        patch: SessionFieldsPatch,
        expected_newer_than: Option<SystemTime>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.apply_patch(patch, expected_newer_than).await })
    }

    fn list_players(&self) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.inner.read().await.players.clone()) })
    }

    fn create_player(&self, player: PlayerEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.inner.write().await.players.push(player);
            Ok(())
        })
    }

    fn delete_player(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            let mut inner = store.inner.write().await;
            let before = inner.players.len();
            inner.players.retain(|player| player.id != id);
            Ok(inner.players.len() < before)
        })
    }

    fn append_match(&self, record: MatchRecordEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.inner.write().await.matches.push(record);
            Ok(())
        })
    }

    fn list_matches(&self) -> BoxFuture<'static, StorageResult<Vec<MatchRecordEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let mut matches = store.inner.read().await.matches.clone();
            matches.sort_by(|a, b| b.finished_at.cmp(&a.finished_at));
            Ok(matches)
        })
    }

    fn upsert_tally(
        &self,
        player_id: Uuid,
        delta: TallyEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let mut inner = store.inner.write().await;
            match inner
                .tallies
                .iter_mut()
                .find(|entry| entry.player_id == player_id)
            {
                Some(entry) => entry.tally.add(&delta),
                None => inner.tallies.push(AggregateTallyEntity {
                    player_id,
                    tally: delta,
                }),
            }
            Ok(())
        })
    }

    fn read_tallies(&self) -> BoxFuture<'static, StorageResult<Vec<AggregateTallyEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.inner.read().await.tallies.clone()) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use indexmap::IndexMap;

    use super::*;
    use crate::dao::models::{MatchSlotEntity, RosterEntryEntity};

    fn session_doc() -> SessionEntity {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        SessionEntity {
            players: vec![
                RosterEntryEntity {
                    id: a,
                    name: "ana".into(),
                },
                RosterEntryEntity {
                    id: b,
                    name: "bo".into(),
                },
            ],
            queue: vec![MatchSlotEntity {
                player1: a,
                player2: b,
                score1: 0,
                score2: 0,
                completed: false,
                winner: None,
            }],
            cursor: 0,
            tallies: IndexMap::new(),
            active: true,
            updated_at: SystemTime::now(),
        }
    }

    #[tokio::test]
    async fn patch_updates_the_current_match_score() {
        let store = MemorySessionStore::new();
        store.write_session(session_doc()).await.unwrap();

        let stamp = SystemTime::now() + Duration::from_secs(1);
        store
            .update_session_fields(
                SessionFieldsPatch {
                    cursor: 0,
                    score1: Some(7),
                    score2: None,
                    updated_at: Some(stamp),
                },
                None,
            )
            .await
            .unwrap();

        let session = store.read_session().await.unwrap().unwrap();
        assert_eq!(session.queue[0].score1, 7);
        assert_eq!(session.queue[0].score2, 0);
        assert_eq!(session.updated_at, stamp);
    }

    #[tokio::test]
    async fn guarded_patch_rejects_newer_stored_document() {
        let store = MemorySessionStore::new();
        let mut doc = session_doc();
        doc.updated_at = SystemTime::now() + Duration::from_secs(10);
        store.write_session(doc).await.unwrap();

        let result = store
            .update_session_fields(
                SessionFieldsPatch {
                    score1: Some(3),
                    ..Default::default()
                },
                Some(SystemTime::now()),
            )
            .await;

        assert!(matches!(result, Err(StorageError::StalePatch)));
    }

    #[tokio::test]
    async fn upsert_tally_accumulates_deltas() {
        let store = MemorySessionStore::new();
        let player = Uuid::new_v4();
        let delta = TallyEntity {
            wins: 1,
            losses: 0,
            points: 11,
            games: 1,
        };

        store.upsert_tally(player, delta).await.unwrap();
        store.upsert_tally(player, delta).await.unwrap();

        let tallies = store.read_tallies().await.unwrap();
        assert_eq!(tallies.len(), 1);
        assert_eq!(tallies[0].tally.wins, 2);
        assert_eq!(tallies[0].tally.points, 22);
    }
}
