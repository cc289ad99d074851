use thiserror::Error;
use uuid::Uuid;

/// Result alias for the MongoDB backend.
pub type MongoResult<T> = Result<T, MongoDaoError>;

/// Errors raised by the MongoDB backend.
#[derive(Debug, Error)]
pub enum MongoDaoError {
    /// The connection string could not be parsed.
    #[error("invalid MongoDB URI `{uri}`")]
    InvalidUri {
        /// The rejected URI.
        uri: String,
        /// Driver error.
        #[source]
        source: mongodb::error::Error,
    },
    /// A required environment variable is missing.
    #[error("missing environment variable `{var}`")]
    MissingEnvVar {
        /// Name of the missing variable.
        var: &'static str,
    },
    /// The client could not be constructed.
    #[error("failed to build MongoDB client")]
    ClientConstruction {
        /// Driver error.
        #[source]
        source: mongodb::error::Error,
    },
    /// The initial connectivity ping never succeeded.
    #[error("MongoDB did not answer the initial ping after {attempts} attempts")]
    InitialPing {
        /// Number of ping attempts made.
        attempts: u32,
        /// Driver error from the last attempt.
        #[source]
        source: mongodb::error::Error,
    },
    /// A health-check ping failed.
    #[error("MongoDB health ping failed")]
    HealthPing {
        /// Driver error.
        #[source]
        source: mongodb::error::Error,
    },
    /// Creating a collection index failed.
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        /// Collection the index belongs to.
        collection: &'static str,
        /// Index keys description.
        index: &'static str,
        /// Driver error.
        #[source]
        source: mongodb::error::Error,
    },
    /// Reading or writing the session document failed.
    #[error("session document operation failed")]
    Session {
        /// Driver error.
        #[source]
        source: mongodb::error::Error,
    },
    /// A guarded field patch was rejected by the freshness filter.
    #[error("session field patch rejected: stored document is newer")]
    StalePatch,
    /// A field patch targeted a session document that does not exist.
    #[error("no session document to patch")]
    SessionMissing,
    /// A player-collection operation failed.
    #[error("player operation failed")]
    Player {
        /// Driver error.
        #[source]
        source: mongodb::error::Error,
    },
    /// Appending or listing match history failed.
    #[error("match history operation failed")]
    MatchHistory {
        /// Driver error.
        #[source]
        source: mongodb::error::Error,
    },
    /// An aggregate-tally operation failed for the given player.
    #[error("aggregate tally operation failed for player `{player_id}`")]
    Tally {
        /// Player whose aggregates were being touched.
        player_id: Uuid,
        /// Driver error.
        #[source]
        source: mongodb::error::Error,
    },
}
