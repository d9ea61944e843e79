//! Wire rows of the persisted store and the change-feed envelope.
//!
//! Rows use the store's snake_case column names. This module is the only place that
//! maps between those rows and the internal model; the realtime reducer and the store
//! adapter both go through it.
//!
//! | model           | wire            |
//! |-----------------|-----------------|
//! | `tournament_id` | `tournament_id` |
//! | `match_number`  | `match_number`  |
//! | `group`         | `group_number`  |
//! | `player1_id`    | `player1_id`    |
//! | `player2_id`    | `player2_id`    |
//! | `winner`        | `winner_id`     |
//! | `next_match_id` | `next_match_id` |
//! | `match_id`      | `match_id`      |

use crate::models::{
    MatchStatus, PlayerId, SetScore, Tournament, TournamentFormat, TournamentMatch,
    TournamentStatus,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A row that cannot be turned into a model value. Never surfaced to callers of the
/// reducer: it is logged and the event is dropped.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum MalformedRow {
    #[error("{entity} row is missing `{field}`")]
    MissingField {
        entity: &'static str,
        field: &'static str,
    },
    #[error("{0} event carries no record")]
    MissingRecord(&'static str),
}

fn require<T>(value: Option<T>, entity: &'static str, field: &'static str) -> Result<T, MalformedRow> {
    value.ok_or(MalformedRow::MissingField { entity, field })
}

/// `tournaments` row. Every column is optional on the wire: delete payloads and partial
/// rows only carry some of them.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct TournamentRow {
    pub id: Option<String>,
    pub name: Option<String>,
    pub date: Option<NaiveDate>,
    pub format: Option<TournamentFormat>,
    pub status: Option<TournamentStatus>,
    pub participants: Option<Vec<PlayerId>>,
    pub winner_id: Option<PlayerId>,
}

impl TryFrom<TournamentRow> for Tournament {
    type Error = MalformedRow;

    fn try_from(row: TournamentRow) -> Result<Self, Self::Error> {
        const ENTITY: &str = "tournament";
        Ok(Tournament {
            id: require(row.id, ENTITY, "id")?,
            name: require(row.name, ENTITY, "name")?,
            date: require(row.date, ENTITY, "date")?,
            format: require(row.format, ENTITY, "format")?,
            status: row.status.unwrap_or_default(),
            participants: row.participants.unwrap_or_default(),
            matches: Vec::new(),
            winner: row.winner_id,
        })
    }
}

impl From<&Tournament> for TournamentRow {
    fn from(t: &Tournament) -> Self {
        Self {
            id: Some(t.id.clone()),
            name: Some(t.name.clone()),
            date: Some(t.date),
            format: Some(t.format),
            status: Some(t.status),
            participants: Some(t.participants.clone()),
            winner_id: t.winner.clone(),
        }
    }
}

/// `tournament_matches` row.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct MatchRow {
    pub id: Option<String>,
    pub tournament_id: Option<String>,
    pub round: Option<u32>,
    pub match_number: Option<u32>,
    pub group_number: Option<u32>,
    pub player1_id: Option<PlayerId>,
    pub player2_id: Option<PlayerId>,
    pub player1_score: Option<u32>,
    pub player2_score: Option<u32>,
    pub sets: Option<Vec<SetScore>>,
    pub winner_id: Option<PlayerId>,
    pub status: Option<MatchStatus>,
    pub next_match_id: Option<String>,
    pub match_id: Option<String>,
}

impl TryFrom<MatchRow> for TournamentMatch {
    type Error = MalformedRow;

    fn try_from(row: MatchRow) -> Result<Self, Self::Error> {
        const ENTITY: &str = "tournament_match";
        Ok(TournamentMatch {
            id: require(row.id, ENTITY, "id")?,
            tournament_id: require(row.tournament_id, ENTITY, "tournament_id")?,
            round: require(row.round, ENTITY, "round")?,
            match_number: require(row.match_number, ENTITY, "match_number")?,
            group: row.group_number,
            player1_id: row.player1_id,
            player2_id: row.player2_id,
            player1_score: row.player1_score,
            player2_score: row.player2_score,
            sets: row.sets.unwrap_or_default(),
            winner: row.winner_id,
            status: row.status.unwrap_or_default(),
            next_match_id: row.next_match_id,
            match_id: row.match_id,
        })
    }
}

impl From<&TournamentMatch> for MatchRow {
    fn from(m: &TournamentMatch) -> Self {
        Self {
            id: Some(m.id.clone()),
            tournament_id: Some(m.tournament_id.clone()),
            round: Some(m.round),
            match_number: Some(m.match_number),
            group_number: m.group,
            player1_id: m.player1_id.clone(),
            player2_id: m.player2_id.clone(),
            player1_score: m.player1_score,
            player2_score: m.player2_score,
            sets: (!m.sets.is_empty()).then(|| m.sets.clone()),
            winner_id: m.winner.clone(),
            status: Some(m.status),
            next_match_id: m.next_match_id.clone(),
            match_id: m.match_id.clone(),
        }
    }
}

/// Row-level operation reported by the change feed.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    #[serde(alias = "INSERT")]
    Insert,
    #[serde(alias = "UPDATE")]
    Update,
    #[serde(alias = "DELETE")]
    Delete,
}

/// One row change. `new_record` is absent for deletes; `old_record` may only carry keys.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct RowChange<R> {
    pub operation: Operation,
    #[serde(default)]
    pub new_record: Option<R>,
    #[serde(default)]
    pub old_record: Option<R>,
}

/// A change-feed notification, tagged by entity stream.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entity_type", rename_all = "snake_case")]
pub enum ChangeEvent {
    Tournament(RowChange<TournamentRow>),
    TournamentMatch(RowChange<MatchRow>),
}

impl ChangeEvent {
    pub fn tournament_inserted(t: &Tournament) -> Self {
        ChangeEvent::Tournament(RowChange {
            operation: Operation::Insert,
            new_record: Some(t.into()),
            old_record: None,
        })
    }

    pub fn tournament_updated(t: &Tournament) -> Self {
        ChangeEvent::Tournament(RowChange {
            operation: Operation::Update,
            new_record: Some(t.into()),
            old_record: Some(TournamentRow {
                id: Some(t.id.clone()),
                ..TournamentRow::default()
            }),
        })
    }

    pub fn tournament_deleted(id: &str) -> Self {
        ChangeEvent::Tournament(RowChange {
            operation: Operation::Delete,
            new_record: None,
            old_record: Some(TournamentRow {
                id: Some(id.to_string()),
                ..TournamentRow::default()
            }),
        })
    }

    pub fn match_inserted(m: &TournamentMatch) -> Self {
        ChangeEvent::TournamentMatch(RowChange {
            operation: Operation::Insert,
            new_record: Some(m.into()),
            old_record: None,
        })
    }

    pub fn match_updated(m: &TournamentMatch) -> Self {
        ChangeEvent::TournamentMatch(RowChange {
            operation: Operation::Update,
            new_record: Some(m.into()),
            old_record: Some(match_key(&m.tournament_id, &m.id)),
        })
    }

    pub fn match_deleted(tournament_id: &str, id: &str) -> Self {
        ChangeEvent::TournamentMatch(RowChange {
            operation: Operation::Delete,
            new_record: None,
            old_record: Some(match_key(tournament_id, id)),
        })
    }

    pub fn operation(&self) -> Operation {
        match self {
            ChangeEvent::Tournament(c) => c.operation,
            ChangeEvent::TournamentMatch(c) => c.operation,
        }
    }
}

fn match_key(tournament_id: &str, id: &str) -> MatchRow {
    MatchRow {
        id: Some(id.to_string()),
        tournament_id: Some(tournament_id.to_string()),
        ..MatchRow::default()
    }
}
