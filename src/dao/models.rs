use std::time::SystemTime;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Player record owned by the participant store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerEntity {
    /// Stable identifier for the player.
    pub id: Uuid,
    /// Display name chosen for the player.
    pub name: String,
    /// Creation timestamp for auditing/debugging.
    pub created_at: SystemTime,
}

/// Roster snapshot of a player embedded in the session document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RosterEntryEntity {
    /// Stable identifier for the player.
    pub id: Uuid,
    /// Display name at the time the session started.
    pub name: String,
}

/// One queued match inside the session document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchSlotEntity {
    /// Player on the first side of the table.
    pub player1: Uuid,
    /// Player on the second side of the table.
    pub player2: Uuid,
    /// Live score of the first side.
    pub score1: u32,
    /// Live score of the second side.
    pub score2: u32,
    /// Whether the match has been recorded.
    pub completed: bool,
    /// Winner once completed; absent for a tie.
    pub winner: Option<Uuid>,
}

/// Per-player session counters persisted inside the session document.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TallyEntity {
    /// Matches won.
    pub wins: u32,
    /// Matches lost.
    pub losses: u32,
    /// Total points scored.
    pub points: u64,
    /// Matches played, ties included.
    pub games: u32,
}

/// The singleton session document shared by every backend instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionEntity {
    /// Roster snapshot for this session.
    pub players: Vec<RosterEntryEntity>,
    /// Ordered match queue.
    pub queue: Vec<MatchSlotEntity>,
    /// Index of the current match inside `queue`.
    pub cursor: usize,
    /// Per-player session counters keyed by player id.
    pub tallies: IndexMap<Uuid, TallyEntity>,
    /// Whether a session is currently running.
    pub active: bool,
    /// Logical last-modified stamp; the synchronization protocol compares
    /// these with strict ordering.
    pub updated_at: SystemTime,
}

/// Partial update of the session document's live-score fields.
///
/// The shared store applies this as a last-write-wins field patch; `None`
/// fields are left untouched. The patch is how a score edit crosses the
/// process boundary without rewriting the whole document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionFieldsPatch {
    /// Queue index of the match slot the scores belong to.
    pub cursor: usize,
    /// New live score for the first side of the current match.
    pub score1: Option<u32>,
    /// New live score for the second side of the current match.
    pub score2: Option<u32>,
    /// Fresh stamp accompanying the patch.
    pub updated_at: Option<SystemTime>,
}

/// Immutable record of a completed match appended to permanent history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchRecordEntity {
    /// Primary key of the record.
    pub id: Uuid,
    /// Player on the first side of the table.
    pub player1: Uuid,
    /// Player on the second side of the table.
    pub player2: Uuid,
    /// Final score of the first side.
    pub score1: u32,
    /// Final score of the second side.
    pub score2: u32,
    /// Winner, absent for a tie.
    pub winner: Option<Uuid>,
    /// When the match was recorded.
    pub finished_at: SystemTime,
}

/// All-time aggregate counters for one player, owned by the aggregate store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AggregateTallyEntity {
    /// Player these counters belong to.
    pub player_id: Uuid,
    /// All-time counter values.
    pub tally: TallyEntity,
}

impl TallyEntity {
    /// Fold another tally into this one, counter by counter.
    pub fn add(&mut self, delta: &TallyEntity) {
        self.wins += delta.wins;
        self.losses += delta.losses;
        self.points += delta.points;
        self.games += delta.games;
    }
}
