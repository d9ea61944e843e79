//! Standings: fold completed matches into a ranked table.

use crate::models::{PlayerId, TournamentMatch};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};

/// Tournament points for winning a match.
pub const POINTS_FOR_WIN: u32 = 2;
/// Tournament points for playing and losing a match.
pub const POINTS_FOR_LOSS: u32 = 1;

/// One row of a standings table.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Standing {
    pub player: PlayerId,
    pub matches_played: u32,
    pub wins: u32,
    pub losses: u32,
    pub tournament_points: u32,
    /// Points scored over all sets.
    pub points_for: u32,
    pub points_against: u32,
    pub points_diff: i64,
}

impl Standing {
    fn new(player: PlayerId) -> Self {
        Self {
            player,
            ..Self::default()
        }
    }

    fn record(&mut self, won: bool, scored: u32, conceded: u32) {
        self.matches_played += 1;
        if won {
            self.wins += 1;
            self.tournament_points += POINTS_FOR_WIN;
        } else {
            self.losses += 1;
            self.tournament_points += POINTS_FOR_LOSS;
        }
        self.points_for = self.points_for.saturating_add(scored);
        self.points_against = self.points_against.saturating_add(conceded);
        self.points_diff = i64::from(self.points_for) - i64::from(self.points_against);
    }

    /// Ranking key, highest first: points, wins, point difference, points scored.
    fn rank_key(&self) -> (u32, u32, i64, u32) {
        (self.tournament_points, self.wins, self.points_diff, self.points_for)
    }
}

/// Sort standings best first. The sort is stable, so rows still tied after all keys keep
/// their input order.
pub fn rank(rows: &mut [Standing]) {
    rows.sort_by_key(|s| Reverse(s.rank_key()));
}

/// Ranked table for `participants` over the completed matches in `matches`.
///
/// Only matches where both players are participants count. Every participant gets a row,
/// including those with nothing played yet.
pub fn standings(participants: &[PlayerId], matches: &[TournamentMatch]) -> Vec<Standing> {
    let index: HashMap<&str, usize> = participants
        .iter()
        .enumerate()
        .map(|(i, p)| (p.as_str(), i))
        .collect();
    let mut rows: Vec<Standing> = participants.iter().cloned().map(Standing::new).collect();

    for m in matches.iter().filter(|m| m.is_completed()) {
        let (Some(p1), Some(p2), Some(winner)) = (&m.player1_id, &m.player2_id, &m.winner) else {
            continue;
        };
        let (Some(&i1), Some(&i2)) = (index.get(p1.as_str()), index.get(p2.as_str())) else {
            continue;
        };
        let (points1, points2) = m.points();
        rows[i1].record(winner == p1, points1, points2);
        rows[i2].record(winner == p2, points2, points1);
    }

    rank(&mut rows);
    rows
}

/// Per-group standings of a group stage, keyed by group number.
///
/// Membership comes from each group's matches, ordered as in `participants`.
pub fn group_standings(
    participants: &[PlayerId],
    matches: &[TournamentMatch],
) -> BTreeMap<u32, Vec<Standing>> {
    let mut by_group: BTreeMap<u32, Vec<TournamentMatch>> = BTreeMap::new();
    for m in matches {
        if let Some(g) = m.group {
            by_group.entry(g).or_default().push(m.clone());
        }
    }

    by_group
        .into_iter()
        .map(|(g, group_matches)| {
            let members: Vec<PlayerId> = participants
                .iter()
                .filter(|p| group_matches.iter().any(|m| m.involves(p)))
                .cloned()
                .collect();
            (g, standings(&members, &group_matches))
        })
        .collect()
}
