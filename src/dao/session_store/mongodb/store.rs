use std::{sync::Arc, time::SystemTime};

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, Collection, Database,
    bson::{DateTime, Document, doc},
    options::IndexOptions,
};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::{
        MongoMatchRecordDocument, MongoPlayerDocument, MongoSessionDocument, MongoTallyDocument,
        SESSION_DOC_ID, doc_id,
    },
};
use crate::dao::{
    models::{
        AggregateTallyEntity, MatchRecordEntity, PlayerEntity, SessionEntity, SessionFieldsPatch,
        TallyEntity,
    },
    session_store::SessionStore,
    storage::StorageResult,
};

const SESSION_COLLECTION: &str = "session";
const PLAYER_COLLECTION: &str = "players";
const MATCH_COLLECTION: &str = "matches";
const TALLY_COLLECTION: &str = "tallies";

/// MongoDB implementation of the shared session store.
#[derive(Clone)]
pub struct MongoSessionStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    #[allow(dead_code)]
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

impl MongoSessionStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let database = self.database().await;

        let matches = database.collection::<MongoMatchRecordDocument>(MATCH_COLLECTION);
        let finished_idx = mongodb::IndexModel::builder()
            .keys(doc! {"finished_at": -1})
            .options(
                IndexOptions::builder()
                    .name(Some("match_finished_idx".to_owned()))
                    .build(),
            )
            .build();
        matches
            .create_index(finished_idx)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: MATCH_COLLECTION,
                index: "finished_at",
                source,
            })?;

        let players = database.collection::<MongoPlayerDocument>(PLAYER_COLLECTION);
        let name_idx = mongodb::IndexModel::builder()
            .keys(doc! {"name": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("player_name_idx".to_owned()))
                    .build(),
            )
            .build();
        players
            .create_index(name_idx)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: PLAYER_COLLECTION,
                index: "name",
                source,
            })?;

        Ok(())
    }

    async fn database(&self) -> Database {
        let guard = self.inner.state.read().await;
        guard.database.clone()
    }

    async fn session_collection(&self) -> Collection<MongoSessionDocument> {
        self.database().await.collection(SESSION_COLLECTION)
    }

    async fn player_collection(&self) -> Collection<MongoPlayerDocument> {
        self.database().await.collection(PLAYER_COLLECTION)
    }

    async fn match_collection(&self) -> Collection<MongoMatchRecordDocument> {
        self.database().await.collection(MATCH_COLLECTION)
    }

    async fn tally_collection(&self) -> Collection<MongoTallyDocument> {
        self.database().await.collection(TALLY_COLLECTION)
    }

    async fn read_session(&self) -> MongoResult<Option<SessionEntity>> {
        let collection = self.session_collection().await;
        let document = collection
            .find_one(doc! {"_id": SESSION_DOC_ID})
            .await
            .map_err(|source| MongoDaoError::Session { source })?;
        Ok(document.map(Into::into))
    }

    async fn write_session(&self, session: SessionEntity) -> MongoResult<()> {
        let document: MongoSessionDocument = session.into();
        let collection = self.session_collection().await;
        collection
            .replace_one(doc! {"_id": SESSION_DOC_ID}, &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::Session { source })?;
        Ok(())
    }

    async fn update_session_fields(
        &self,
        patch: SessionFieldsPatch,
        expected_newer_than: Option<SystemTime>,
    ) -> MongoResult<()> {
        let mut filter = doc! {"_id": SESSION_DOC_ID};
        if let Some(expected) = expected_newer_than {
            filter.insert(
                "updated_at",
                doc! {"$lte": DateTime::from_system_time(expected)},
            );
        }

        let mut fields = Document::new();
        if let Some(score1) = patch.score1 {
            fields.insert(format!("queue.{}.score1", patch.cursor), score1 as i64);
        }
        if let Some(score2) = patch.score2 {
            fields.insert(format!("queue.{}.score2", patch.cursor), score2 as i64);
        }
        if let Some(stamp) = patch.updated_at {
            fields.insert("updated_at", DateTime::from_system_time(stamp));
        }
        if fields.is_empty() {
            return Ok(());
        }

        let collection = self.session_collection().await;
        let result = collection
            .update_one(filter, doc! {"$set": fields})
            .await
            .map_err(|source| MongoDaoError::Session { source })?;

        if result.matched_count == 0 {
            // The filter either missed the document entirely or the
            // freshness guard rejected the patch.
            return if expected_newer_than.is_some() {
                Err(MongoDaoError::StalePatch)
            } else {
                Err(MongoDaoError::SessionMissing)
            };
        }
        Ok(())
    }

    async fn list_players(&self) -> MongoResult<Vec<PlayerEntity>> {
        let collection = self.player_collection().await;
        let documents: Vec<MongoPlayerDocument> = collection
            .find(doc! {})
            .sort(doc! {"created_at": 1})
            .await
            .map_err(|source| MongoDaoError::Player { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::Player { source })?;
        Ok(documents.into_iter().map(Into::into).collect())
    }

    async fn create_player(&self, player: PlayerEntity) -> MongoResult<()> {
        let document: MongoPlayerDocument = player.into();
        let collection = self.player_collection().await;
        collection
            .insert_one(&document)
            .await
            .map_err(|source| MongoDaoError::Player { source })?;
        Ok(())
    }

    async fn delete_player(&self, id: Uuid) -> MongoResult<bool> {
        let collection = self.player_collection().await;
        let result = collection
            .delete_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::Player { source })?;
        Ok(result.deleted_count > 0)
    }

    async fn append_match(&self, record: MatchRecordEntity) -> MongoResult<()> {
        let document: MongoMatchRecordDocument = record.into();
        let collection = self.match_collection().await;
        collection
            .insert_one(&document)
            .await
            .map_err(|source| MongoDaoError::MatchHistory { source })?;
        Ok(())
    }

    async fn list_matches(&self) -> MongoResult<Vec<MatchRecordEntity>> {
        let collection = self.match_collection().await;
        let documents: Vec<MongoMatchRecordDocument> = collection
            .find(doc! {})
            .sort(doc! {"finished_at": -1})
            .await
            .map_err(|source| MongoDaoError::MatchHistory { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::MatchHistory { source })?;
        Ok(documents.into_iter().map(Into::into).collect())
    }

    async fn upsert_tally(&self, player_id: Uuid, delta: TallyEntity) -> MongoResult<()> {
        let collection = self.tally_collection().await;
        collection
            .update_one(
                doc_id(player_id),
                doc! {"$inc": {
                    "wins": delta.wins as i64,
                    "losses": delta.losses as i64,
                    "points": delta.points as i64,
                    "games": delta.games as i64,
                }},
            )
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::Tally { player_id, source })?;
        Ok(())
    }

    async fn read_tallies(&self) -> MongoResult<Vec<AggregateTallyEntity>> {
        let collection = self.tally_collection().await;
        let documents: Vec<MongoTallyDocument> = collection
            .find(doc! {})
            .await
            .map_err(|source| MongoDaoError::Tally {
                player_id: Uuid::nil(),
                source,
            })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::Tally {
                player_id: Uuid::nil(),
                source,
            })?;
        Ok(documents.into_iter().map(Into::into).collect())
    }
}

impl SessionStore for MongoSessionStore {
    fn read_session(&self) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.read_session().await.map_err(Into::into) })
    }

    fn write_session(&self, session: SessionEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.write_session(session).await.map_err(Into::into) })
    }

    fn update_session_fields(
        &self,
        patch: SessionFieldsPatch,
        expected_newer_than: Option<SystemTime>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .update_session_fields(patch, expected_newer_than)
                .await
                .map_err(Into::into)
        })
    }

    fn list_players(&self) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_players().await.map_err(Into::into) })
    }

    fn create_player(&self, player: PlayerEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.create_player(player).await.map_err(Into::into) })
    }

    fn delete_player(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.delete_player(id).await.map_err(Into::into) })
    }

    fn append_match(&self, record: MatchRecordEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.append_match(record).await.map_err(Into::into) })
    }

    fn list_matches(&self) -> BoxFuture<'static, StorageResult<Vec<MatchRecordEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_matches().await.map_err(Into::into) })
    }

    fn upsert_tally(
        &self,
        player_id: Uuid,
        delta: TallyEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.upsert_tally(player_id, delta).await.map_err(Into::into) })
    }

    fn read_tallies(&self) -> BoxFuture<'static, StorageResult<Vec<AggregateTallyEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.read_tallies().await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
