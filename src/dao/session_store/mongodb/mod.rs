mod connection;
mod error;
mod models;
/// MongoDB-backed [`crate::dao::session_store::SessionStore`] implementation.
pub mod store;

/// Connection settings for the MongoDB backend.
pub mod config;

pub use config::MongoConfig;
pub use error::MongoDaoError;
pub use store::MongoSessionStore;

use crate::dao::storage::StorageError;

impl From<MongoDaoError> for StorageError {
    fn from(err: MongoDaoError) -> Self {
        match err {
            MongoDaoError::StalePatch => StorageError::StalePatch,
            other => StorageError::unavailable(other.to_string(), other),
        }
    }
}
