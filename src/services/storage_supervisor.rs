use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    dao::{session_store::SessionStore, storage::StorageError},
    state::SharedState,
};

const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(10);
const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(5);
const MAX_RECONNECT_ATTEMPTS: u32 = 3;

/// Keep a storage backend installed, entering degraded mode whenever it is
/// unavailable.
///
/// `connect` produces a fresh store handle; the supervisor retries it with
/// exponential backoff, then probes the installed store periodically and
/// attempts in-place reconnects before giving the handle up and starting
/// over.
pub async fn run<F, Fut>(state: SharedState, mut connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn SessionStore>, StorageError>> + Send,
{
    let mut delay = INITIAL_DELAY;

    loop {
        let store = match connect().await {
            Ok(store) => store,
            Err(err) => {
                warn!(error = %err, "storage connection attempt failed");
                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
                continue;
            }
        };

        state.install_session_store(store.clone()).await;
        info!("storage connection established; leaving degraded mode");
        delay = INITIAL_DELAY;

        watch_store(&state, store).await;

        // The handle is beyond repair; reconnect from scratch.
        sleep(delay).await;
        delay = (delay * 2).min(MAX_DELAY);
    }
}

/// Probe the installed store until it fails beyond recovery.
async fn watch_store(state: &SharedState, store: Arc<dyn SessionStore>) {
    loop {
        match store.health_check().await {
            Ok(()) => sleep(HEALTH_POLL_INTERVAL).await,
            Err(err) => {
                warn!(error = %err, "storage health check failed; entering degraded mode");
                state.clear_session_store().await;

                if reconnect_with_backoff(store.as_ref()).await {
                    info!("storage reconnected; leaving degraded mode");
                    state.install_session_store(store.clone()).await;
                } else {
                    warn!("exhausted storage reconnect attempts; dropping connection");
                    return;
                }
            }
        }
    }
}

async fn reconnect_with_backoff(store: &dyn SessionStore) -> bool {
    let mut delay = INITIAL_DELAY;
    for attempt in 0..MAX_RECONNECT_ATTEMPTS {
        match store.try_reconnect().await {
            Ok(()) => return true,
            Err(err) => {
                warn!(attempt, error = %err, "storage reconnect attempt failed");
                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
            }
        }
    }
    false
}
