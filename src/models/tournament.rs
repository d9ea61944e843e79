//! Tournament, TournamentFormat and TournamentStatus.

use crate::models::error::TournamentError;
use crate::models::player::PlayerId;
use crate::models::tournament_match::{MatchId, MatchStatus, TournamentMatch};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a tournament.
pub type TournamentId = String;

/// How matches are organised.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentFormat {
    /// Single elimination.
    #[serde(alias = "KNOCKOUT")]
    Knockout,
    /// Everyone plays everyone once.
    #[serde(alias = "ROUND_ROBIN")]
    RoundRobin,
    /// Round-robin groups, then a knockout stage of the group qualifiers.
    #[serde(alias = "GROUP")]
    Group,
}

/// Lifecycle of a tournament.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentStatus {
    /// Roster open; no matches yet.
    #[default]
    #[serde(alias = "UPCOMING")]
    Upcoming,
    #[serde(alias = "ACTIVE")]
    Active,
    /// Winner decided.
    #[serde(alias = "COMPLETED")]
    Completed,
}

/// Full tournament: roster in seed order plus every match generated so far.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Tournament {
    pub id: TournamentId,
    pub name: String,
    pub date: NaiveDate,
    pub format: TournamentFormat,
    pub status: TournamentStatus,
    /// Seed order: first = seed 1.
    pub participants: Vec<PlayerId>,
    /// Unique by id.
    pub matches: Vec<TournamentMatch>,
    pub winner: Option<PlayerId>,
}

impl Tournament {
    /// Create an upcoming tournament with no matches.
    pub fn new(
        name: impl Into<String>,
        date: NaiveDate,
        format: TournamentFormat,
        participants: Vec<PlayerId>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            date,
            format,
            status: TournamentStatus::Upcoming,
            participants,
            matches: Vec::new(),
            winner: None,
        }
    }

    pub fn get_match(&self, id: &str) -> Option<&TournamentMatch> {
        self.matches.iter().find(|m| m.id == id)
    }

    pub fn get_match_mut(&mut self, id: &str) -> Option<&mut TournamentMatch> {
        self.matches.iter_mut().find(|m| m.id == id)
    }

    /// Look up a match by id, failing with `MatchNotFound`.
    pub fn find_match(&self, id: &str) -> Result<&TournamentMatch, TournamentError> {
        self.get_match(id)
            .ok_or_else(|| TournamentError::MatchNotFound(id.to_string()))
    }

    /// Insert a match, or replace the one with the same id. Returns true if it was new.
    pub fn upsert_match(&mut self, m: TournamentMatch) -> bool {
        match self.get_match_mut(&m.id) {
            Some(existing) => {
                *existing = m;
                false
            }
            None => {
                self.matches.push(m);
                true
            }
        }
    }

    /// Remove a match by id. Returns the removed match, if any.
    pub fn remove_match(&mut self, id: &str) -> Option<TournamentMatch> {
        let idx = self.matches.iter().position(|m| m.id == id)?;
        Some(self.matches.remove(idx))
    }

    pub fn is_participant(&self, player: &str) -> bool {
        self.participants.iter().any(|p| p == player)
    }

    /// Matches of the given round, ordered by match number.
    pub fn round_matches(&self, round: u32) -> Vec<&TournamentMatch> {
        let mut ms: Vec<_> = self.matches.iter().filter(|m| m.round == round).collect();
        ms.sort_by_key(|m| m.match_number);
        ms
    }

    /// Matches that feed into `match_id`, ordered by (round, match number).
    pub fn feeders_of(&self, match_id: &MatchId) -> Vec<&TournamentMatch> {
        let mut ms: Vec<_> = self
            .matches
            .iter()
            .filter(|m| m.next_match_id.as_ref() == Some(match_id))
            .collect();
        ms.sort_by_key(|m| (m.round, m.match_number));
        ms
    }

    /// Every match is completed (false if there are none).
    pub fn all_matches_completed(&self) -> bool {
        !self.matches.is_empty() && self.matches.iter().all(|m| m.status == MatchStatus::Completed)
    }
}

/// Look up a tournament by id in an in-memory collection.
pub fn find_tournament<'a>(
    tournaments: &'a [Tournament],
    id: &str,
) -> Result<&'a Tournament, TournamentError> {
    tournaments
        .iter()
        .find(|t| t.id == id)
        .ok_or_else(|| TournamentError::TournamentNotFound(id.to_string()))
}

/// Mutable variant of [`find_tournament`].
pub fn find_tournament_mut<'a>(
    tournaments: &'a mut [Tournament],
    id: &str,
) -> Result<&'a mut Tournament, TournamentError> {
    tournaments
        .iter_mut()
        .find(|t| t.id == id)
        .ok_or_else(|| TournamentError::TournamentNotFound(id.to_string()))
}
