use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{PlayerEntity, TallyEntity},
    dto::format_system_time,
};

/// Payload used to register a new player.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreatePlayerRequest {
    /// Display name for the new player.
    #[validate(length(min = 1, max = 64, message = "player name must not be empty"))]
    pub name: String,
}

/// Public projection of a registered player.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PlayerSummary {
    /// Stable identifier for the player.
    pub id: Uuid,
    /// Display name chosen for the player.
    pub name: String,
    /// Registration timestamp (RFC 3339).
    pub created_at: String,
}

impl From<PlayerEntity> for PlayerSummary {
    fn from(value: PlayerEntity) -> Self {
        Self {
            id: value.id,
            name: value.name,
            created_at: format_system_time(value.created_at),
        }
    }
}

/// One row of the all-time leaderboard.
#[derive(Debug, Serialize, ToSchema)]
pub struct LeaderboardEntry {
    /// Player this row belongs to.
    pub id: Uuid,
    /// Display name, when the player is still registered.
    pub name: Option<String>,
    /// All-time matches won.
    pub wins: u32,
    /// All-time matches lost.
    pub losses: u32,
    /// All-time points scored.
    pub points: u64,
    /// All-time matches played.
    pub games: u32,
}

impl LeaderboardEntry {
    /// Assemble a leaderboard row from aggregate counters and an optional
    /// resolved name.
    pub fn new(id: Uuid, name: Option<String>, tally: TallyEntity) -> Self {
        Self {
            id,
            name,
            wins: tally.wins,
            losses: tally.losses,
            points: tally.points,
            games: tally.games,
        }
    }
}
