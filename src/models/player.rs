//! Player identity as seen by the tournament core.

use serde::{Deserialize, Serialize};

/// Stable identifier for a player (owned by the player-management collaborator).
pub type PlayerId = String;

/// A club player. The core only references `id`; name and rating belong to the host.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub elo_rating: i32,
}

impl Player {
    /// Rating given to players who have never played a rated match.
    pub const DEFAULT_RATING: i32 = 1200;

    /// Create a player with the default rating.
    pub fn new(id: impl Into<PlayerId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            elo_rating: Self::DEFAULT_RATING,
        }
    }

    /// Replace the rating after a finished match.
    pub fn set_rating(&mut self, rating: i32) {
        self.elo_rating = rating;
    }
}
