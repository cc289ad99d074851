//! Background polling loop keeping the local session cache in step with the
//! shared store.
//!
//! The store offers no change notifications, so every instance polls the
//! singleton session document on a fixed interval, re-flushes any score edit
//! that failed its write-through, and reconciles the snapshot it read through
//! [`crate::state::merge`].

use tokio::time::interval;
use tracing::{debug, warn};

use crate::{
    dao::{models::SessionFieldsPatch, storage::StorageError},
    error::ServiceError,
    state::{
        SharedState,
        merge::{self, ScoreResolution},
    },
};

/// Run the polling loop forever.
pub async fn run(state: SharedState) {
    let mut ticker = interval(state.config().poll_interval);
    loop {
        ticker.tick().await;
        if let Err(err) = poll_once(&state).await {
            // Connectivity problems are the supervisor's business; the next
            // tick simply tries again.
            warn!(error = %err, "session sync tick failed");
        }
    }
}

/// One synchronization tick: flush, read, merge.
pub async fn poll_once(state: &SharedState) -> Result<(), ServiceError> {
    let Some(store) = state.session_store().await else {
        debug!("skipping sync tick; storage unavailable (degraded mode)");
        return Ok(());
    };

    flush_pending(state).await?;

    let Some(snapshot) = store.read_session().await? else {
        // No shared document yet. Seed it from the local copy when this
        // instance already runs a session; otherwise there is nothing to do.
        let session = state.session().read().await;
        if session.active {
            store.write_session(session.clone().into()).await?;
        }
        return Ok(());
    };

    let mut session = state.session().write().await;
    let sync = state.sync().read().await;
    let resolution = merge::merge_remote(&mut session, snapshot.into(), &sync);
    if resolution == ScoreResolution::KeptLocal {
        // Expected while an edit is in flight, so never more than a debug
        // line.
        debug!("suppressed stale remote score during sync");
    }
    Ok(())
}

/// Re-flush a score edit whose write-through did not land yet.
async fn flush_pending(state: &SharedState) -> Result<(), ServiceError> {
    let pending = state.sync().read().await.pending_write;
    if !pending {
        return Ok(());
    }

    let patch = {
        let session = state.session().read().await;
        let Some(slot) = session.current_match() else {
            // The slot the edit targeted is gone; nothing left to flush.
            state.sync().write().await.pending_write = false;
            return Ok(());
        };
        SessionFieldsPatch {
            cursor: session.cursor,
            score1: Some(slot.score1),
            score2: Some(slot.score2),
            updated_at: Some(session.updated_at),
        }
    };

    store_patch(state, patch).await
}

async fn store_patch(state: &SharedState, patch: SessionFieldsPatch) -> Result<(), ServiceError> {
    let store = state.require_session_store().await?;
    let Some(stamp) = patch.updated_at else {
        return Ok(());
    };

    match store.update_session_fields(patch, Some(stamp)).await {
        Ok(()) => {
            state.sync().write().await.acknowledge_flush(stamp);
            debug!("re-flushed pending score edit");
        }
        Err(StorageError::StalePatch) => {
            // The store moved past this edit; the merge below adopts the
            // newer remote copy.
            state.sync().write().await.acknowledge_flush(stamp);
            debug!("pending score edit superseded by a newer remote write");
        }
        Err(err) => return Err(err.into()),
    }
    Ok(())
}
