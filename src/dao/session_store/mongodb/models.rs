use mongodb::bson::{Binary, DateTime, Document, doc, spec::BinarySubtype};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dao::models::{
    AggregateTallyEntity, MatchRecordEntity, MatchSlotEntity, PlayerEntity, RosterEntryEntity,
    SessionEntity, TallyEntity,
};

/// Fixed `_id` of the singleton session document.
pub const SESSION_DOC_ID: &str = "current";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoSessionDocument {
    #[serde(rename = "_id")]
    id: String,
    players: Vec<RosterEntryEntity>,
    queue: Vec<MatchSlotEntity>,
    cursor: u32,
    tallies: Vec<MongoTallyEntry>,
    active: bool,
    updated_at: DateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoTallyEntry {
    player_id: Uuid,
    tally: TallyEntity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoPlayerDocument {
    #[serde(rename = "_id")]
    id: Uuid,
    name: String,
    created_at: DateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoMatchRecordDocument {
    #[serde(rename = "_id")]
    id: Uuid,
    player1: Uuid,
    player2: Uuid,
    score1: u32,
    score2: u32,
    winner: Option<Uuid>,
    finished_at: DateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoTallyDocument {
    #[serde(rename = "_id")]
    player_id: Uuid,
    #[serde(flatten)]
    tally: TallyEntity,
}

impl From<SessionEntity> for MongoSessionDocument {
    fn from(value: SessionEntity) -> Self {
        Self {
            id: SESSION_DOC_ID.to_owned(),
            players: value.players,
            queue: value.queue,
            cursor: value.cursor as u32,
            tallies: value
                .tallies
                .into_iter()
                .map(|(player_id, tally)| MongoTallyEntry { player_id, tally })
                .collect(),
            active: value.active,
            updated_at: DateTime::from_system_time(value.updated_at),
        }
    }
}

impl From<MongoSessionDocument> for SessionEntity {
    fn from(value: MongoSessionDocument) -> Self {
        Self {
            players: value.players,
            queue: value.queue,
            cursor: value.cursor as usize,
            tallies: value
                .tallies
                .into_iter()
                .map(|entry| (entry.player_id, entry.tally))
                .collect(),
            active: value.active,
            updated_at: value.updated_at.to_system_time(),
        }
    }
}

impl From<PlayerEntity> for MongoPlayerDocument {
    fn from(value: PlayerEntity) -> Self {
        Self {
            id: value.id,
            name: value.name,
            created_at: DateTime::from_system_time(value.created_at),
        }
    }
}

impl From<MongoPlayerDocument> for PlayerEntity {
    fn from(value: MongoPlayerDocument) -> Self {
        Self {
            id: value.id,
            name: value.name,
            created_at: value.created_at.to_system_time(),
        }
    }
}

impl From<MatchRecordEntity> for MongoMatchRecordDocument {
    fn from(value: MatchRecordEntity) -> Self {
        Self {
            id: value.id,
            player1: value.player1,
            player2: value.player2,
            score1: value.score1,
            score2: value.score2,
            winner: value.winner,
            finished_at: DateTime::from_system_time(value.finished_at),
        }
    }
}

impl From<MongoMatchRecordDocument> for MatchRecordEntity {
    fn from(value: MongoMatchRecordDocument) -> Self {
        Self {
            id: value.id,
            player1: value.player1,
            player2: value.player2,
            score1: value.score1,
            score2: value.score2,
            winner: value.winner,
            finished_at: value.finished_at.to_system_time(),
        }
    }
}

impl From<MongoTallyDocument> for AggregateTallyEntity {
    fn from(value: MongoTallyDocument) -> Self {
        Self {
            player_id: value.player_id,
            tally: value.tally,
        }
    }
}

fn uuid_as_binary(id: Uuid) -> Binary {
    Binary {
        subtype: BinarySubtype::Uuid,
        bytes: id.into_bytes().to_vec(),
    }
}

pub fn doc_id(id: Uuid) -> Document {
    doc! {"_id": uuid_as_binary(id)}
}
