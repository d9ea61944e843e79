//! TournamentMatch, its status, and recorded results.

use crate::models::player::PlayerId;
use crate::models::tournament::TournamentId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a tournament match.
pub type MatchId = String;

/// Generate a fresh match id.
pub fn new_match_id() -> MatchId {
    Uuid::new_v4().to_string()
}

/// Where a match is in its life. Matches awaiting players arrive as `pending`
/// from some writers; that is the same state as `scheduled`.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    #[default]
    #[serde(alias = "pending")]
    Scheduled,
    Completed,
}

/// Points scored by each player in a single set.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct SetScore {
    pub player1: u32,
    pub player2: u32,
}

impl SetScore {
    pub fn new(player1: u32, player2: u32) -> Self {
        Self { player1, player2 }
    }
}

/// A result to record against a match.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Sets won by player 1.
    pub player1_score: u32,
    /// Sets won by player 2.
    pub player2_score: u32,
    /// Per-set points, empty when only the set count was entered.
    #[serde(default)]
    pub sets: Vec<SetScore>,
}

impl MatchResult {
    /// Result entered as set counts only.
    pub fn new(player1_score: u32, player2_score: u32) -> Self {
        Self {
            player1_score,
            player2_score,
            sets: Vec::new(),
        }
    }

    /// Result entered set by set; the set counts are derived.
    pub fn from_sets(sets: Vec<SetScore>) -> Self {
        let player1_score = sets.iter().filter(|s| s.player1 > s.player2).count() as u32;
        let player2_score = sets.iter().filter(|s| s.player2 > s.player1).count() as u32;
        Self {
            player1_score,
            player2_score,
            sets,
        }
    }
}

/// One of the two player positions of a match.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchSlot {
    Player1,
    Player2,
}

/// A single match inside a tournament.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct TournamentMatch {
    pub id: MatchId,
    pub tournament_id: TournamentId,
    /// 1 = first stage.
    pub round: u32,
    /// Position within the round, unique per round.
    pub match_number: u32,
    /// Group number (1-based), only set for group-stage matches.
    pub group: Option<u32>,
    /// None = TBD slot awaiting a prior round's winner.
    pub player1_id: Option<PlayerId>,
    pub player2_id: Option<PlayerId>,
    pub player1_score: Option<u32>,
    pub player2_score: Option<u32>,
    #[serde(default)]
    pub sets: Vec<SetScore>,
    pub winner: Option<PlayerId>,
    pub status: MatchStatus,
    /// The match this winner feeds into.
    pub next_match_id: Option<MatchId>,
    /// Finalized head-to-head match record, once committed to match history.
    pub match_id: Option<String>,
}

impl TournamentMatch {
    /// Create a scheduled match with a fresh id and no players.
    pub fn new(tournament_id: impl Into<TournamentId>, round: u32, match_number: u32) -> Self {
        Self {
            id: new_match_id(),
            tournament_id: tournament_id.into(),
            round,
            match_number,
            ..Self::default()
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == MatchStatus::Completed
    }

    /// Both slots are filled.
    pub fn has_both_players(&self) -> bool {
        self.player1_id.is_some() && self.player2_id.is_some()
    }

    /// Whether `player` occupies either slot.
    pub fn involves(&self, player: &str) -> bool {
        self.player1_id.as_deref() == Some(player) || self.player2_id.as_deref() == Some(player)
    }

    pub fn player(&self, slot: MatchSlot) -> Option<&PlayerId> {
        match slot {
            MatchSlot::Player1 => self.player1_id.as_ref(),
            MatchSlot::Player2 => self.player2_id.as_ref(),
        }
    }

    pub fn player_mut(&mut self, slot: MatchSlot) -> &mut Option<PlayerId> {
        match slot {
            MatchSlot::Player1 => &mut self.player1_id,
            MatchSlot::Player2 => &mut self.player2_id,
        }
    }

    /// Slot `player` is seated in, if any.
    pub fn slot_of(&self, player: &str) -> Option<MatchSlot> {
        if self.player1_id.as_deref() == Some(player) {
            Some(MatchSlot::Player1)
        } else if self.player2_id.as_deref() == Some(player) {
            Some(MatchSlot::Player2)
        } else {
            None
        }
    }

    /// The player that lost, if the match is decided.
    pub fn loser(&self) -> Option<&PlayerId> {
        let winner = self.winner.as_ref()?;
        if self.player1_id.as_ref() == Some(winner) {
            self.player2_id.as_ref()
        } else {
            self.player1_id.as_ref()
        }
    }

    /// Points scored by (player 1, player 2) over the whole match.
    ///
    /// Sums the per-set breakdown; without one, the set counts stand in as the only "set".
    /// Sums saturate, so absurd scores from a bad row cannot overflow.
    pub fn points(&self) -> (u32, u32) {
        if self.sets.is_empty() {
            (
                self.player1_score.unwrap_or(0),
                self.player2_score.unwrap_or(0),
            )
        } else {
            self.sets
                .iter()
                .fold((0u32, 0u32), |(a, b), s| {
                    (a.saturating_add(s.player1), b.saturating_add(s.player2))
                })
        }
    }
}
