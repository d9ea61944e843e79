//! Data structures for the tournament core: players, tournaments, matches, errors.

mod error;
mod player;
mod tournament;
mod tournament_match;

pub use error::TournamentError;
pub use player::{Player, PlayerId};
pub use tournament::{
    find_tournament, find_tournament_mut, Tournament, TournamentFormat, TournamentId,
    TournamentStatus,
};
pub use tournament_match::{
    new_match_id, MatchId, MatchResult, MatchSlot, MatchStatus, SetScore, TournamentMatch,
};
