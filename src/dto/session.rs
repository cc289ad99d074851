use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::{
    dto::format_system_time,
    state::session::{MatchSlot, SessionState},
};

/// Number of upcoming matches exposed in the session summary.
const UPCOMING_WINDOW: usize = 10;

/// Payload used to start a new session.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct StartSessionRequest {
    /// Identifiers of the players taking part, at least two.
    #[validate(length(min = 2, message = "a session requires at least 2 players"))]
    pub player_ids: Vec<Uuid>,
}

/// Payload used to edit the live score of the current match.
///
/// Exactly one of `value` and `delta` must be present: `value` sets the
/// score absolutely, `delta` adjusts it (clamping at zero) the way the
/// score buttons do.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SetScoreRequest {
    /// Player whose score is being edited; must sit on the current match.
    pub player_id: Uuid,
    /// Absolute score value.
    #[serde(default)]
    pub value: Option<u32>,
    /// Signed adjustment applied to the current value.
    #[serde(default)]
    pub delta: Option<i32>,
}

impl Validate for SetScoreRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        match (self.value, self.delta) {
            (None, None) | (Some(_), Some(_)) => {
                let mut err = ValidationError::new("score_edit");
                err.message = Some("exactly one of `value` and `delta` is required".into());
                errors.add("value", err);
            }
            _ => {}
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Payload used to finalize the current match.
///
/// Final scores may be supplied here; when omitted, the live score already
/// on the match is used as-is.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct RecordMatchRequest {
    /// Final score for the first side.
    #[serde(default)]
    pub score1: Option<u32>,
    /// Final score for the second side.
    #[serde(default)]
    pub score2: Option<u32>,
}

impl Validate for RecordMatchRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if self.score1.is_some() != self.score2.is_some() {
            let mut err = ValidationError::new("final_scores");
            err.message = Some("final scores must be supplied for both sides or neither".into());
            errors.add("score1", err);
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// A roster player as exposed in session payloads.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RosterPlayer {
    /// Stable identifier for the player.
    pub id: Uuid,
    /// Display name.
    pub name: String,
}

/// The current match and its live score.
#[derive(Debug, Serialize, ToSchema)]
pub struct CurrentMatchSummary {
    /// Player on the first side of the table.
    pub player1: RosterPlayer,
    /// Player on the second side of the table.
    pub player2: RosterPlayer,
    /// Live score of the first side.
    pub score1: u32,
    /// Live score of the second side.
    pub score2: u32,
}

/// An upcoming pairing in the queue.
#[derive(Debug, Serialize, ToSchema)]
pub struct UpcomingMatchSummary {
    /// Player on the first side of the table.
    pub player1: RosterPlayer,
    /// Player on the second side of the table.
    pub player2: RosterPlayer,
}

/// Session counters for one player.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionTally {
    /// Player these counters belong to.
    pub player: RosterPlayer,
    /// Matches won this session.
    pub wins: u32,
    /// Matches lost this session.
    pub losses: u32,
    /// Points scored this session.
    pub points: u64,
    /// Matches played this session.
    pub games: u32,
}

/// Read model of the current session returned by the session routes.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionSummary {
    /// Whether a session is currently running.
    pub active: bool,
    /// Roster taking part in the session.
    pub players: Vec<RosterPlayer>,
    /// The match the cursor points at, if any.
    pub current: Option<CurrentMatchSummary>,
    /// Next queued matches, capped to a small window.
    pub upcoming: Vec<UpcomingMatchSummary>,
    /// Number of matches played so far.
    pub played: usize,
    /// Total queue length.
    pub queue_length: usize,
    /// Per-player session counters.
    pub tallies: Vec<SessionTally>,
    /// Last-modified stamp (RFC 3339).
    pub updated_at: String,
}

impl From<&SessionState> for SessionSummary {
    fn from(session: &SessionState) -> Self {
        let resolve = |id: Uuid| RosterPlayer {
            id,
            name: session
                .player(id)
                .map(|player| player.name.clone())
                .unwrap_or_default(),
        };
        let pair_of = |slot: &MatchSlot| {
            (
                resolve(slot.pairing.player1),
                resolve(slot.pairing.player2),
            )
        };

        let current = session.current_match().map(|slot| {
            let (player1, player2) = pair_of(slot);
            CurrentMatchSummary {
                player1,
                player2,
                score1: slot.score1,
                score2: slot.score2,
            }
        });

        let upcoming = session
            .upcoming()
            .iter()
            .take(UPCOMING_WINDOW)
            .map(|slot| {
                let (player1, player2) = pair_of(slot);
                UpcomingMatchSummary { player1, player2 }
            })
            .collect();

        let tallies = session
            .tallies
            .iter()
            .map(|(id, tally)| SessionTally {
                player: resolve(*id),
                wins: tally.wins,
                losses: tally.losses,
                points: tally.points,
                games: tally.games,
            })
            .collect();

        Self {
            active: session.active,
            players: session
                .roster
                .iter()
                .map(|player| RosterPlayer {
                    id: player.id,
                    name: player.name.clone(),
                })
                .collect(),
            current,
            upcoming,
            played: session.cursor,
            queue_length: session.queue.len(),
            tallies,
            updated_at: format_system_time(session.updated_at),
        }
    }
}

/// Outcome of finalizing a match.
#[derive(Debug, Serialize, ToSchema)]
pub struct RecordMatchSummary {
    /// Player on the first side of the recorded match.
    pub player1: Uuid,
    /// Player on the second side of the recorded match.
    pub player2: Uuid,
    /// Final score of the first side.
    pub score1: u32,
    /// Final score of the second side.
    pub score2: u32,
    /// Winner, absent for a tie.
    pub winner: Option<Uuid>,
    /// Matches spliced onto the queue by the refill, if any.
    pub extended_by: usize,
    /// Set when recording exhausted the queue and ended the session.
    pub session_ended: Option<String>,
}

/// Outcome of ending a session.
#[derive(Debug, Serialize, ToSchema)]
pub struct EndSessionSummary {
    /// Why the session ended ("manual" or "queue-exhausted").
    pub reason: String,
    /// Number of players whose tallies were folded into the all-time
    /// aggregates.
    pub folded_players: usize,
}

/// One completed match from permanent history.
#[derive(Debug, Serialize, ToSchema)]
pub struct MatchHistoryEntry {
    /// Record identifier.
    pub id: Uuid,
    /// Player on the first side.
    pub player1: RosterPlayer,
    /// Player on the second side.
    pub player2: RosterPlayer,
    /// Final score of the first side.
    pub score1: u32,
    /// Final score of the second side.
    pub score2: u32,
    /// Winner, absent for a tie.
    pub winner: Option<Uuid>,
    /// When the match was recorded (RFC 3339).
    pub finished_at: String,
}
