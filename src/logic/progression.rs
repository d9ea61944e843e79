//! Tournament progression: start, record results, generate the next stage, detect the winner.
//!
//! ```text
//! UPCOMING --start--> ACTIVE
//! ACTIVE   --stage complete, next stage needed--> next stage generated, still ACTIVE
//! ACTIVE   --final stage complete--> winner ready (caller confirms with set_winner)
//! *        --set_winner--> COMPLETED
//! ```

use crate::config::EngineConfig;
use crate::logic::bracket;
use crate::logic::standings::{group_standings, rank, standings, Standing};
use crate::models::{
    MatchId, MatchResult, MatchSlot, MatchStatus, PlayerId, Tournament, TournamentError,
    TournamentFormat, TournamentMatch, TournamentStatus,
};
use std::collections::HashMap;

/// What the tournament needs next, as decided by [`maybe_advance`].
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Advance {
    /// Matches of a newly generated stage, to be persisted by the caller.
    pub new_matches: Vec<TournamentMatch>,
    /// Set once the final stage is complete: the player to declare winner.
    pub winner_ready: Option<PlayerId>,
}

impl Advance {
    pub fn is_empty(&self) -> bool {
        self.new_matches.is_empty() && self.winner_ready.is_none()
    }
}

/// Start an upcoming tournament: generate round 1 and mark it active.
///
/// Returns the generated matches. On error the tournament is left untouched.
pub fn start(
    tournament: &mut Tournament,
    config: &EngineConfig,
) -> Result<Vec<TournamentMatch>, TournamentError> {
    if tournament.status != TournamentStatus::Upcoming {
        return Err(TournamentError::InvalidState(tournament.status));
    }
    let matches = bracket::generate(
        tournament.format,
        &tournament.id,
        &tournament.participants,
        &[],
        config,
    )?;
    tournament.matches = matches.clone();
    tournament.status = TournamentStatus::Active;
    log::info!(
        "tournament {} started with {} matches",
        tournament.id,
        matches.len()
    );
    Ok(matches)
}

/// Record the result of a scheduled match.
///
/// The match is completed and, if it feeds another match, its winner is seated there
/// straight away. Returns every match that changed (the recorded one first).
/// A match that is already completed is rejected, so of two concurrent attempts only the
/// first one sticks.
pub fn record_result(
    tournament: &mut Tournament,
    match_id: &str,
    result: &MatchResult,
) -> Result<Vec<TournamentMatch>, TournamentError> {
    let m = tournament.find_match(match_id)?;
    if m.status != MatchStatus::Scheduled {
        return Err(TournamentError::invalid_match(match_id, "already completed"));
    }
    let (Some(p1), Some(p2)) = (m.player1_id.clone(), m.player2_id.clone()) else {
        return Err(TournamentError::invalid_match(match_id, "awaiting a player"));
    };
    if tournament.status != TournamentStatus::Active {
        return Err(TournamentError::InvalidState(tournament.status));
    }
    let winner = match result.player1_score.cmp(&result.player2_score) {
        std::cmp::Ordering::Greater => p1,
        std::cmp::Ordering::Less => p2,
        std::cmp::Ordering::Equal => {
            return Err(TournamentError::TiedResult(
                result.player1_score,
                result.player2_score,
            ))
        }
    };

    // Work out where the winner goes before touching anything.
    let seat = match &m.next_match_id {
        Some(next) => Some(winner_slot(tournament, &m.id, next)?),
        None => None,
    };

    let Some(m) = tournament.get_match_mut(match_id) else {
        return Err(TournamentError::MatchNotFound(match_id.to_string()));
    };
    m.player1_score = Some(result.player1_score);
    m.player2_score = Some(result.player2_score);
    m.sets = result.sets.clone();
    m.winner = Some(winner.clone());
    m.status = MatchStatus::Completed;
    let mut changed = vec![m.clone()];

    if let Some((next_id, slot)) = seat {
        if let Some(next) = tournament.get_match_mut(&next_id) {
            let target = next.player_mut(slot);
            if target.as_ref() != Some(&winner) {
                *target = Some(winner.clone());
                changed.push(next.clone());
            }
        }
    }

    log::debug!("match {} won by {}", match_id, winner);
    Ok(changed)
}

/// Slot of `next_id` that the winner of `from` fills: the earlier of two feeders takes
/// player 1, the later player 2; a lone feeder takes whichever slot is still free.
fn winner_slot(
    tournament: &Tournament,
    from: &MatchId,
    next_id: &MatchId,
) -> Result<(MatchId, MatchSlot), TournamentError> {
    let next = tournament.find_match(next_id)?;
    if next.is_completed() {
        return Err(TournamentError::invalid_match(
            next_id,
            "next match is already completed",
        ));
    }
    let feeders = tournament.feeders_of(next_id);
    let slot = if feeders.len() >= 2 {
        if feeders.first().map(|f| &f.id) == Some(from) {
            MatchSlot::Player1
        } else {
            MatchSlot::Player2
        }
    } else if next.player1_id.is_none() {
        MatchSlot::Player1
    } else {
        MatchSlot::Player2
    };
    Ok((next_id.clone(), slot))
}

/// Decide what the tournament needs next, without changing it.
///
/// Safe to call after every change: the group-to-knockout transition only fires while
/// no match beyond round 1 exists, so once the knockout stage is stored it is never
/// generated again.
pub fn maybe_advance(
    tournament: &Tournament,
    config: &EngineConfig,
) -> Result<Advance, TournamentError> {
    if tournament.status != TournamentStatus::Active {
        return Ok(Advance::default());
    }

    match tournament.format {
        TournamentFormat::Knockout => Ok(Advance {
            winner_ready: final_winner(tournament.matches.iter()),
            ..Advance::default()
        }),
        TournamentFormat::RoundRobin => {
            if !tournament.all_matches_completed() {
                return Ok(Advance::default());
            }
            let table = standings(&tournament.participants, &tournament.matches);
            Ok(Advance {
                winner_ready: table.first().map(|s| s.player.clone()),
                ..Advance::default()
            })
        }
        TournamentFormat::Group => advance_group(tournament, config),
    }
}

fn advance_group(tournament: &Tournament, config: &EngineConfig) -> Result<Advance, TournamentError> {
    let group_stage: Vec<TournamentMatch> = tournament
        .matches
        .iter()
        .filter(|m| m.round == 1)
        .cloned()
        .collect();
    if group_stage.is_empty() || !group_stage.iter().all(|m| m.is_completed()) {
        return Ok(Advance::default());
    }

    let has_knockout = tournament.matches.iter().any(|m| m.round > 1);
    if has_knockout {
        return Ok(Advance {
            winner_ready: final_winner(tournament.matches.iter().filter(|m| m.round > 1)),
            ..Advance::default()
        });
    }

    let seeds = knockout_seeds(&tournament.participants, &group_stage, config);
    if seeds.len() < 2 {
        return Err(TournamentError::InsufficientParticipants { found: seeds.len() });
    }
    let new_matches = bracket::generate(
        TournamentFormat::Knockout,
        &tournament.id,
        &seeds,
        &tournament.matches,
        config,
    )?;
    log::info!(
        "group stage of tournament {} complete, knockout stage of {} matches for {} qualifiers",
        tournament.id,
        new_matches.len(),
        seeds.len()
    );
    Ok(Advance {
        new_matches,
        ..Advance::default()
    })
}

/// Group qualifiers in knockout seed order.
///
/// Qualifiers are ranked tier by tier (all group winners, then all runners-up, ...),
/// each tier by the standings keys with group order breaking ties. For a power-of-two
/// field of four or more the list is folded (1 v last, 2 v second to last, ...) so the
/// best qualifiers meet the weakest first, and then any first-round pair from the same
/// group swaps its lower seed with another pair where that separates both.
pub fn knockout_seeds(
    participants: &[PlayerId],
    group_stage: &[TournamentMatch],
    config: &EngineConfig,
) -> Vec<PlayerId> {
    let tables = group_standings(participants, group_stage);
    let group_of: HashMap<&str, u32> = tables
        .iter()
        .flat_map(|(g, t)| t.iter().map(move |s| (s.player.as_str(), *g)))
        .collect();
    let mut ranked: Vec<(PlayerId, u32)> = Vec::new();
    for tier in 0..config.qualifiers_per_group as usize {
        let mut rows: Vec<Standing> = tables.values().filter_map(|t| t.get(tier)).cloned().collect();
        rank(&mut rows);
        ranked.extend(rows.into_iter().map(|s| {
            let group = group_of.get(s.player.as_str()).copied().unwrap_or(0);
            (s.player, group)
        }));
    }

    let n = ranked.len();
    if n < 4 || !n.is_power_of_two() {
        return ranked.into_iter().map(|(p, _)| p).collect();
    }
    let mut pairs: Vec<[(PlayerId, u32); 2]> = (0..n / 2)
        .map(|i| [ranked[i].clone(), ranked[n - 1 - i].clone()])
        .collect();
    separate_groups(&mut pairs);
    pairs.into_iter().flatten().map(|(p, _)| p).collect()
}

/// Swap lower seeds between pairs so that, where possible, no pair is a same-group rematch.
fn separate_groups(pairs: &mut [[(PlayerId, u32); 2]]) {
    for i in 0..pairs.len() {
        if pairs[i][0].1 != pairs[i][1].1 {
            continue;
        }
        let swap = (0..pairs.len()).rev().find(|&j| {
            j != i
                && pairs[i][0].1 != pairs[j][1].1
                && pairs[j][0].1 != pairs[i][1].1
        });
        match swap {
            Some(j) => {
                let (low_i, low_j) = (pairs[i][1].clone(), pairs[j][1].clone());
                pairs[i][1] = low_j;
                pairs[j][1] = low_i;
            }
            None => log::warn!(
                "could not keep {} and {} apart in the first knockout round",
                pairs[i][0].0,
                pairs[i][1].0
            ),
        }
    }
}

/// Winner of the bracket among `matches`: the unique match without a next match, once
/// it is completed.
fn final_winner<'a>(matches: impl Iterator<Item = &'a TournamentMatch>) -> Option<PlayerId> {
    let mut finals = matches.filter(|m| m.next_match_id.is_none());
    let last = finals.next()?;
    if finals.next().is_some() || !last.is_completed() {
        return None;
    }
    last.winner.clone()
}

/// [`maybe_advance`], then add any newly generated matches to the tournament.
pub fn advance(
    tournament: &mut Tournament,
    config: &EngineConfig,
) -> Result<Advance, TournamentError> {
    let advance = maybe_advance(tournament, config)?;
    for m in &advance.new_matches {
        tournament.upsert_match(m.clone());
    }
    Ok(advance)
}

/// Declare the winner; the tournament becomes completed.
pub fn set_winner(tournament: &mut Tournament, winner: &str) -> Result<(), TournamentError> {
    if !tournament.is_participant(winner) {
        return Err(TournamentError::PlayerNotFound(winner.to_string()));
    }
    tournament.winner = Some(winner.to_string());
    tournament.status = TournamentStatus::Completed;
    log::info!("tournament {} won by {}", tournament.id, winner);
    Ok(())
}
