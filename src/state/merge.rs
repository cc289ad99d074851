//! Reconciliation of a remote session snapshot into the local cache.
//!
//! Kept free of any I/O so the merge policy can be unit-tested on its own;
//! [`crate::services::synchronizer`] is the only caller that feeds it real
//! snapshots from the shared store.

use std::time::SystemTime;

use crate::state::session::SessionState;

/// Local write-tracking state consulted by the merge rule.
///
/// `pending_write` is raised whenever this instance mutates the live score and
/// cleared only once the write-through lands; `last_local_write` remembers the
/// stamp of the last score edit this instance submitted or accepted.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncGuard {
    /// A local score edit has not yet been flushed to the shared store.
    pub pending_write: bool,
    /// Stamp of the most recent local score write.
    pub last_local_write: Option<SystemTime>,
}

impl SyncGuard {
    /// Forget all tracked writes, e.g. when a session starts or ends.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Remember a local structural write that already reached the store,
    /// dropping any pending score edit it superseded.
    pub fn note_local_write(&mut self, stamp: SystemTime) {
        self.pending_write = false;
        self.last_local_write = Some(stamp);
    }

    /// Settle the write-through that carried `stamp`.
    ///
    /// The pending flag only drops while `stamp` is still the latest local
    /// edit; a newer edit made while the flush was in flight keeps the flag
    /// raised so the synchronizer pushes it on the next tick.
    pub fn acknowledge_flush(&mut self, stamp: SystemTime) {
        if self.last_local_write == Some(stamp) {
            self.pending_write = false;
        }
    }

    /// Whether the given remote stamp is allowed to replace the local live
    /// score.
    ///
    /// Remote wins only when nothing is pending locally and the remote copy is
    /// strictly newer than our last accepted write; anything else would let a
    /// stale read clobber an edit this instance just made.
    pub fn accepts_remote_score(&self, remote_stamp: SystemTime) -> bool {
        if self.pending_write {
            return false;
        }
        match self.last_local_write {
            Some(local) => remote_stamp > local,
            None => true,
        }
    }
}

/// How the live score was resolved during a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreResolution {
    /// The remote live score was adopted.
    AdoptedRemote,
    /// The local live score survived (pending or newer local write). This is
    /// the expected suppressed-stale-overwrite case, not a fault.
    KeptLocal,
}

/// Merge a remote snapshot into the local session cache.
///
/// Roster, queue, cursor, tallies and the active flag always follow the
/// remote copy: advancement is serialized through match recording, so those
/// fields have a single writer at a time. The live score of the current match
/// is the one concurrently edited field and goes through [`SyncGuard`].
pub fn merge_remote(
    local: &mut SessionState,
    mut remote: SessionState,
    guard: &SyncGuard,
) -> ScoreResolution {
    let resolution = if guard.accepts_remote_score(remote.updated_at) {
        ScoreResolution::AdoptedRemote
    } else {
        ScoreResolution::KeptLocal
    };

    if resolution == ScoreResolution::KeptLocal {
        // Carry the protected local score over onto the adopted queue, but
        // only while both sides still agree on which match is current.
        if let (Some(local_slot), Some(remote_slot)) = (
            local.queue.get(local.cursor).cloned(),
            remote.queue.get_mut(remote.cursor),
        ) && local.cursor == remote.cursor
            && local_slot.pairing == remote_slot.pairing
        {
            remote_slot.score1 = local_slot.score1;
            remote_slot.score2 = local_slot.score2;
        }
        // Keep the local stamp so the next poll applies the same comparison.
        remote.updated_at = local.updated_at.max(remote.updated_at);
    }

    *local = remote;
    resolution
}
