use std::time::SystemTime;

use indexmap::IndexMap;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    dao::models::{MatchSlotEntity, PlayerEntity, RosterEntryEntity, SessionEntity, TallyEntity},
    rotation,
};

/// Player info tracked during a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    /// Stable identifier for the player.
    pub id: Uuid,
    /// Display name chosen for the player.
    pub name: String,
}

/// An unordered pair of player identifiers sharing a table for one match.
///
/// Two pairings are equal when they reference the same two players regardless
/// of which side is listed first.
#[derive(Debug, Clone, Copy)]
pub struct Pairing {
    /// Player listed on the first side of the table.
    pub player1: Uuid,
    /// Player listed on the second side of the table.
    pub player2: Uuid,
}

impl Pairing {
    /// Build a pairing keeping the caller's side order.
    pub fn new(player1: Uuid, player2: Uuid) -> Self {
        Self { player1, player2 }
    }

    /// Whether the given player sits on either side of this pairing.
    pub fn contains(&self, id: Uuid) -> bool {
        self.player1 == id || self.player2 == id
    }

    /// Number of players this pairing shares with another (0, 1 or 2).
    ///
    /// A count of exactly 1 is the table-continuity case: one player stays at
    /// the table between matches.
    pub fn shared_count(&self, other: &Pairing) -> usize {
        usize::from(other.contains(self.player1)) + usize::from(other.contains(self.player2))
    }

    fn normalized(&self) -> (Uuid, Uuid) {
        if self.player1 <= self.player2 {
            (self.player1, self.player2)
        } else {
            (self.player2, self.player1)
        }
    }
}

impl PartialEq for Pairing {
    fn eq(&self, other: &Self) -> bool {
        self.normalized() == other.normalized()
    }
}

impl Eq for Pairing {}

impl std::hash::Hash for Pairing {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.normalized().hash(state);
    }
}

/// One queued match: a pairing plus its live score and completion status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchSlot {
    /// The two players assigned to this match.
    pub pairing: Pairing,
    /// Live score for the first side.
    pub score1: u32,
    /// Live score for the second side.
    pub score2: u32,
    /// Whether the match has been recorded and is now immutable.
    pub completed: bool,
    /// Winning player once completed; `None` for a tie.
    pub winner: Option<Uuid>,
}

impl MatchSlot {
    fn pending(pairing: Pairing) -> Self {
        Self {
            pairing,
            score1: 0,
            score2: 0,
            completed: false,
            winner: None,
        }
    }
}

/// Per-player counters accumulated over the lifetime of one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunningTally {
    /// Matches won this session.
    pub wins: u32,
    /// Matches lost this session.
    pub losses: u32,
    /// Total points scored this session.
    pub points: u64,
    /// Matches played this session (ties included).
    pub games: u32,
}

/// Why an active session came to an end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// A client explicitly ended the session.
    Manual,
    /// The cursor reached the end of the queue with no extension possible.
    QueueExhausted,
}

impl EndReason {
    /// Stable label used in responses and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::QueueExhausted => "queue-exhausted",
        }
    }
}

/// Errors raised by session lifecycle operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// A session needs at least two players on its roster.
    #[error("a session requires at least 2 players (got {size})")]
    InvalidRoster {
        /// Number of players that were supplied.
        size: usize,
    },
    /// The operation is only valid while a session is active.
    #[error("no session is currently active")]
    NotActive,
    /// A session is already running and must be ended first.
    #[error("a session is already active")]
    AlreadyActive,
    /// The queue cursor points past the last match.
    #[error("no current match to operate on")]
    NoCurrentMatch,
    /// The referenced player is not part of the current match.
    #[error("player `{0}` is not part of the current match")]
    PlayerNotInMatch(Uuid),
}

/// Outcome of recording the current match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedMatch {
    /// The pairing that was recorded.
    pub pairing: Pairing,
    /// Final score of the first side.
    pub score1: u32,
    /// Final score of the second side.
    pub score2: u32,
    /// Winner, if the score was not a tie.
    pub winner: Option<Uuid>,
    /// Number of matches spliced onto the queue by the low-watermark refill.
    pub extended_by: usize,
    /// Set when the queue was exhausted and the session must end.
    pub ended: Option<EndReason>,
}

/// The one logical session shared by every client instance.
///
/// Each backend instance holds a cached copy of this record; the shared store
/// is the owner of record and [`crate::state::merge`] reconciles the two.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    /// Players taking part in this session.
    pub roster: Vec<Player>,
    /// Ordered queue of matches produced by the rotation builder.
    pub queue: Vec<MatchSlot>,
    /// Index of the current match inside `queue`.
    pub cursor: usize,
    /// Per-player counters for this session, in roster order.
    pub tallies: IndexMap<Uuid, RunningTally>,
    /// Whether a session is currently running.
    pub active: bool,
    /// Logical last-modified stamp used by the synchronization protocol.
    pub updated_at: SystemTime,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::inactive()
    }
}

impl SessionState {
    /// An empty, inactive session record.
    pub fn inactive() -> Self {
        Self {
            roster: Vec::new(),
            queue: Vec::new(),
            cursor: 0,
            tallies: IndexMap::new(),
            active: false,
            updated_at: SystemTime::UNIX_EPOCH,
        }
    }

    /// Start a session for the given roster with an initial rotation of
    /// `rotation_length` matches.
    pub fn start(roster: Vec<Player>, rotation_length: usize) -> Result<Self, SessionError> {
        if roster.len() < 2 {
            return Err(SessionError::InvalidRoster { size: roster.len() });
        }

        let ids: Vec<Uuid> = roster.iter().map(|player| player.id).collect();
        let queue = rotation::builder::build(&ids, rotation_length)
            .into_iter()
            .map(MatchSlot::pending)
            .collect();
        let tallies = ids.iter().map(|id| (*id, RunningTally::default())).collect();

        Ok(Self {
            roster,
            queue,
            cursor: 0,
            tallies,
            active: true,
            updated_at: SystemTime::now(),
        })
    }

    /// The match the cursor currently points at, if any.
    pub fn current_match(&self) -> Option<&MatchSlot> {
        self.queue.get(self.cursor)
    }

    /// Matches still queued after the current one.
    pub fn upcoming(&self) -> &[MatchSlot] {
        let next = (self.cursor + 1).min(self.queue.len());
        &self.queue[next..]
    }

    /// Resolve a roster entry by identifier.
    pub fn player(&self, id: Uuid) -> Option<&Player> {
        self.roster.iter().find(|player| player.id == id)
    }

    /// Set the live score of the given player on the current match.
    ///
    /// Never advances the cursor; only the sides of the current match are
    /// valid targets.
    pub fn set_score(&mut self, player: Uuid, value: u32) -> Result<(), SessionError> {
        if !self.active {
            return Err(SessionError::NotActive);
        }
        let cursor = self.cursor;
        let slot = self
            .queue
            .get_mut(cursor)
            .ok_or(SessionError::NoCurrentMatch)?;

        if slot.pairing.player1 == player {
            slot.score1 = value;
        } else if slot.pairing.player2 == player {
            slot.score2 = value;
        } else {
            return Err(SessionError::PlayerNotInMatch(player));
        }

        self.updated_at = SystemTime::now();
        Ok(())
    }

    /// Adjust the live score of the given player by a signed delta, clamping
    /// at zero.
    pub fn adjust_score(&mut self, player: Uuid, delta: i32) -> Result<u32, SessionError> {
        if !self.active {
            return Err(SessionError::NotActive);
        }
        let slot = self
            .queue
            .get(self.cursor)
            .ok_or(SessionError::NoCurrentMatch)?;
        let current = if slot.pairing.player1 == player {
            slot.score1
        } else if slot.pairing.player2 == player {
            slot.score2
        } else {
            return Err(SessionError::PlayerNotInMatch(player));
        };

        let next = current.saturating_add_signed(delta);
        self.set_score(player, next)?;
        Ok(next)
    }

    /// Finalize the current match and advance the cursor.
    ///
    /// The winner is the side with the strictly greater score; a tie yields no
    /// winner but both sides still accrue games and points. When the remaining
    /// buffer drops under `low_watermark` the queue is extended with a
    /// continuity splice of roughly `refill` further matches.
    pub fn record_current_match(
        &mut self,
        low_watermark: usize,
        refill: usize,
    ) -> Result<RecordedMatch, SessionError> {
        if !self.active {
            return Err(SessionError::NotActive);
        }
        let cursor = self.cursor;
        let slot = self
            .queue
            .get_mut(cursor)
            .ok_or(SessionError::NoCurrentMatch)?;

        let pairing = slot.pairing;
        let (score1, score2) = (slot.score1, slot.score2);
        let winner = if score1 > score2 {
            Some(pairing.player1)
        } else if score2 > score1 {
            Some(pairing.player2)
        } else {
            None
        };

        slot.completed = true;
        slot.winner = winner;

        self.fold_tally(pairing.player1, score1, winner);
        self.fold_tally(pairing.player2, score2, winner);
        self.cursor += 1;

        let mut extended_by = 0;
        if self.queue.len() - self.cursor < low_watermark {
            extended_by = self.extend_queue(refill);
        }

        let ended = (self.cursor >= self.queue.len()).then_some(EndReason::QueueExhausted);
        self.updated_at = SystemTime::now();

        Ok(RecordedMatch {
            pairing,
            score1,
            score2,
            winner,
            extended_by,
            ended,
        })
    }

    /// Splice further rotation passes onto the tail of the queue, preserving
    /// continuity with the last queued pairing. Returns the number of matches
    /// added.
    fn extend_queue(&mut self, refill: usize) -> usize {
        let ids: Vec<Uuid> = self.roster.iter().map(|player| player.id).collect();
        let tail = self.queue.last().map(|slot| slot.pairing);
        let extra = rotation::builder::extend(tail.as_ref(), &ids, refill);
        let added = extra.len();
        self.queue.extend(extra.into_iter().map(MatchSlot::pending));
        added
    }

    /// End the session, returning the drained running tallies so the caller
    /// can fold them into the all-time aggregates.
    pub fn end(&mut self) -> Result<IndexMap<Uuid, RunningTally>, SessionError> {
        if !self.active {
            return Err(SessionError::NotActive);
        }
        let tallies = std::mem::take(&mut self.tallies);
        *self = Self::inactive();
        self.updated_at = SystemTime::now();
        Ok(tallies)
    }

    fn fold_tally(&mut self, player: Uuid, points: u32, winner: Option<Uuid>) {
        let tally = self.tallies.entry(player).or_default();
        tally.games += 1;
        tally.points += u64::from(points);
        match winner {
            Some(id) if id == player => tally.wins += 1,
            Some(_) => tally.losses += 1,
            None => {}
        }
    }
}

impl From<SessionEntity> for SessionState {
    fn from(value: SessionEntity) -> Self {
        Self {
            roster: value.players.into_iter().map(Into::into).collect(),
            queue: value.queue.into_iter().map(Into::into).collect(),
            cursor: value.cursor,
            tallies: value
                .tallies
                .into_iter()
                .map(|(id, tally)| (id, tally.into()))
                .collect(),
            active: value.active,
            updated_at: value.updated_at,
        }
    }
}

impl From<SessionState> for SessionEntity {
    fn from(value: SessionState) -> Self {
        Self {
            players: value.roster.into_iter().map(Into::into).collect(),
            queue: value.queue.into_iter().map(Into::into).collect(),
            cursor: value.cursor,
            tallies: value
                .tallies
                .into_iter()
                .map(|(id, tally)| (id, tally.into()))
                .collect(),
            active: value.active,
            updated_at: value.updated_at,
        }
    }
}

impl From<PlayerEntity> for Player {
    fn from(value: PlayerEntity) -> Self {
        Self {
            id: value.id,
            name: value.name,
        }
    }
}

impl From<RosterEntryEntity> for Player {
    fn from(value: RosterEntryEntity) -> Self {
        Self {
            id: value.id,
            name: value.name,
        }
    }
}

impl From<Player> for RosterEntryEntity {
    fn from(value: Player) -> Self {
        Self {
            id: value.id,
            name: value.name,
        }
    }
}

impl From<MatchSlotEntity> for MatchSlot {
    fn from(value: MatchSlotEntity) -> Self {
        Self {
            pairing: Pairing::new(value.player1, value.player2),
            score1: value.score1,
            score2: value.score2,
            completed: value.completed,
            winner: value.winner,
        }
    }
}

impl From<MatchSlot> for MatchSlotEntity {
    fn from(value: MatchSlot) -> Self {
        Self {
            player1: value.pairing.player1,
            player2: value.pairing.player2,
            score1: value.score1,
            score2: value.score2,
            completed: value.completed,
            winner: value.winner,
        }
    }
}

impl From<TallyEntity> for RunningTally {
    fn from(value: TallyEntity) -> Self {
        Self {
            wins: value.wins,
            losses: value.losses,
            points: value.points,
            games: value.games,
        }
    }
}

impl From<RunningTally> for TallyEntity {
    fn from(value: RunningTally) -> Self {
        Self {
            wins: value.wins,
            losses: value.losses,
            points: value.points,
            games: value.games,
        }
    }
}
