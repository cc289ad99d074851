/// In-memory backend used by tests and storeless development.
pub mod memory;
#[cfg(feature = "mongo-store")]
/// MongoDB backend.
pub mod mongodb;

use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::{
    models::{
        AggregateTallyEntity, MatchRecordEntity, PlayerEntity, SessionEntity, SessionFieldsPatch,
        TallyEntity,
    },
    storage::StorageResult,
};

/// Abstraction over the shared backing store.
///
/// The store offers point reads and last-write-wins field updates only; no
/// multi-field transactions and no change notifications. Everything the core
/// needs from its environment goes through this trait: the singleton session
/// document, the player roster, permanent match history and the all-time
/// aggregates.
pub trait SessionStore: Send + Sync {
    /// Point-read the singleton session document, if one exists.
    fn read_session(&self) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>>;
    /// Replace the singleton session document wholesale.
    fn write_session(&self, session: SessionEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Apply a last-write-wins field patch to the session document.
    ///
    /// When `expected_newer_than` is set the patch only lands while the
    /// stored stamp is not newer than the given one; a rejected patch
    /// surfaces as [`crate::dao::storage::StorageError::StalePatch`].
    fn update_session_fields(
        &self,
        patch: SessionFieldsPatch,
        expected_newer_than: Option<std::time::SystemTime>,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// List every registered player.
    fn list_players(&self) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>>;
    /// Register a new player.
    fn create_player(&self, player: PlayerEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Delete a player; returns whether anything was removed.
    fn delete_player(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>>;
    /// Append an immutable completed-match record to permanent history.
    fn append_match(&self, record: MatchRecordEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// List completed matches, newest first.
    fn list_matches(&self) -> BoxFuture<'static, StorageResult<Vec<MatchRecordEntity>>>;
    /// Fold a session tally delta into a player's all-time aggregates.
    fn upsert_tally(
        &self,
        player_id: Uuid,
        delta: TallyEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Read the all-time aggregates for every player.
    fn read_tallies(&self) -> BoxFuture<'static, StorageResult<Vec<AggregateTallyEntity>>>;
    /// Cheap connectivity probe.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Attempt to re-establish a dropped connection.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
