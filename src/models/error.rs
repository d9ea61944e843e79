//! Errors raised by the bracket generator and the progression engine.

use crate::models::player::PlayerId;
use crate::models::tournament::{TournamentId, TournamentStatus};
use crate::models::tournament_match::MatchId;
use thiserror::Error;

/// Errors that can occur during tournament operations.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum TournamentError {
    /// A result was recorded against a match that is not scheduled or lacks a player.
    #[error("match {match_id} cannot take a result: {reason}")]
    InvalidMatchState { match_id: MatchId, reason: String },
    /// Fewer than 2 entrants for the stage being generated.
    #[error("need at least 2 participants to generate a stage (got {found})")]
    InsufficientParticipants { found: usize },
    #[error("tournament {0} not found")]
    TournamentNotFound(TournamentId),
    #[error("match {0} not found")]
    MatchNotFound(MatchId),
    #[error("player {0} is not a participant")]
    PlayerNotFound(PlayerId),
    /// The same player appears twice in the participant list.
    #[error("player {0} is listed more than once")]
    DuplicateParticipant(PlayerId),
    /// Ping-pong sets always produce a winner.
    #[error("result {0}-{1} has no winner")]
    TiedResult(u32, u32),
    /// Tournament is not in a status that allows this action.
    #[error("tournament is {0:?}, action not allowed")]
    InvalidState(TournamentStatus),
}

impl TournamentError {
    pub(crate) fn invalid_match(match_id: &str, reason: impl Into<String>) -> Self {
        TournamentError::InvalidMatchState {
            match_id: match_id.to_string(),
            reason: reason.into(),
        }
    }
}
