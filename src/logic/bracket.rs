//! Bracket generation: knockout trees, round-robin schedules and group stages.
//!
//! Generated matches get their ids here so that `next_match_id` linkage can be
//! expressed before anything is persisted. Use [`generate_with`] to supply ids
//! from elsewhere (e.g. a store sequence or a deterministic test counter).

use crate::config::{EngineConfig, GroupPartition};
use crate::models::{
    new_match_id, MatchId, PlayerId, TournamentError, TournamentFormat, TournamentMatch,
};
use std::collections::HashSet;

/// Generate the next stage of a tournament with fresh uuid match ids.
///
/// `prior_stage` holds matches of earlier stages (empty when starting); the new stage
/// begins in the round after the last prior one.
pub fn generate(
    format: TournamentFormat,
    tournament_id: &str,
    participants: &[PlayerId],
    prior_stage: &[TournamentMatch],
    config: &EngineConfig,
) -> Result<Vec<TournamentMatch>, TournamentError> {
    generate_with(
        format,
        tournament_id,
        participants,
        prior_stage,
        config,
        &mut new_match_id,
    )
}

/// Like [`generate`], taking match ids from `next_id`.
pub fn generate_with(
    format: TournamentFormat,
    tournament_id: &str,
    participants: &[PlayerId],
    prior_stage: &[TournamentMatch],
    config: &EngineConfig,
    next_id: &mut dyn FnMut() -> MatchId,
) -> Result<Vec<TournamentMatch>, TournamentError> {
    check_participants(participants)?;
    let first_round = prior_stage.iter().map(|m| m.round).max().unwrap_or(0) + 1;

    let matches = match format {
        TournamentFormat::Knockout => knockout(tournament_id, participants, first_round, next_id),
        TournamentFormat::RoundRobin => {
            let mut matches = Vec::new();
            round_robin_into(&mut matches, tournament_id, participants, first_round, None, next_id);
            matches
        }
        TournamentFormat::Group => {
            let groups = partition_groups(participants, config);
            let mut matches = Vec::new();
            for (i, members) in groups.iter().enumerate() {
                let group = Some(i as u32 + 1);
                round_robin_into(&mut matches, tournament_id, members, first_round, group, next_id);
            }
            matches
        }
    };

    log::debug!(
        "generated {} {:?} matches for tournament {} starting at round {}",
        matches.len(),
        format,
        tournament_id,
        first_round
    );
    Ok(matches)
}

fn check_participants(participants: &[PlayerId]) -> Result<(), TournamentError> {
    if participants.len() < 2 {
        return Err(TournamentError::InsufficientParticipants {
            found: participants.len(),
        });
    }
    let mut seen = HashSet::with_capacity(participants.len());
    for p in participants {
        if !seen.insert(p.as_str()) {
            return Err(TournamentError::DuplicateParticipant(p.clone()));
        }
    }
    Ok(())
}

/// Number of knockout rounds needed for `n` entrants (log2 of the bracket size).
pub fn knockout_rounds(n: usize) -> u32 {
    n.max(1).next_power_of_two().trailing_zeros()
}

/// Split participants into `config.group_count` groups whose sizes differ by at most one.
/// Seed order is kept inside each group.
///
/// The group count is capped at `participants.len() / 2` so that every group has at least
/// two members.
pub fn partition_groups(participants: &[PlayerId], config: &EngineConfig) -> Vec<Vec<PlayerId>> {
    let requested = config.group_count.max(1) as usize;
    let count = requested.min((participants.len() / 2).max(1));
    if count < requested {
        log::warn!(
            "{} groups requested for {} participants, using {}",
            requested,
            participants.len(),
            count
        );
    }
    let mut groups = vec![Vec::new(); count];
    match config.group_partition {
        GroupPartition::Interleaved => {
            for (i, p) in participants.iter().enumerate() {
                groups[i % count].push(p.clone());
            }
        }
        GroupPartition::Contiguous => {
            let base = participants.len() / count;
            let extra = participants.len() % count;
            let mut rest = participants.iter();
            for (k, group) in groups.iter_mut().enumerate() {
                let size = base + usize::from(k < extra);
                group.extend(rest.by_ref().take(size).cloned());
            }
        }
    }
    groups
}

/// Every unordered pair once, appended in seed order. Match numbers continue from
/// whatever `out` already holds for the same round.
fn round_robin_into(
    out: &mut Vec<TournamentMatch>,
    tournament_id: &str,
    members: &[PlayerId],
    round: u32,
    group: Option<u32>,
    next_id: &mut dyn FnMut() -> MatchId,
) {
    for (i, a) in members.iter().enumerate() {
        for b in &members[i + 1..] {
            let match_number = out.len() as u32 + 1;
            out.push(TournamentMatch {
                id: next_id(),
                group,
                player1_id: Some(a.clone()),
                player2_id: Some(b.clone()),
                ..TournamentMatch::new(tournament_id, round, match_number)
            });
        }
    }
}

/// A first-round slot: either a contested pairing or a bye straight into the next round.
enum Slot {
    Pair(PlayerId, PlayerId),
    Bye(PlayerId),
}

/// Lay out first-round slots for `participants` in a bracket of the next power of two.
///
/// Byes go to the top seeds. Bye slots are the odd slots first (1, 3, 5, ...) and then
/// the even ones, so a bye player meets a first-round winner where possible; the
/// remaining seeds are paired in order across the contested slots.
fn first_round_slots(participants: &[PlayerId]) -> Vec<Slot> {
    let size = participants.len().next_power_of_two();
    let slot_count = size / 2;
    let byes = size - participants.len();

    let mut is_bye = vec![false; slot_count];
    for idx in (0..slot_count)
        .step_by(2)
        .chain((1..slot_count).step_by(2))
        .take(byes)
    {
        is_bye[idx] = true;
    }

    let (bye_seeds, paired_seeds) = participants.split_at(byes);
    let mut bye_seeds = bye_seeds.iter();
    let mut paired_seeds = paired_seeds.chunks_exact(2);
    is_bye
        .into_iter()
        .filter_map(|bye| {
            if bye {
                bye_seeds.next().map(|p| Slot::Bye(p.clone()))
            } else {
                paired_seeds
                    .next()
                    .map(|pair| Slot::Pair(pair[0].clone(), pair[1].clone()))
            }
        })
        .collect()
}

/// Single-elimination tree. Slot `2k-1` and `2k` of a round feed match `k` of the next.
/// Bye slots are not materialized; the bye player is seated in the round-2 match directly.
fn knockout(
    tournament_id: &str,
    participants: &[PlayerId],
    first_round: u32,
    next_id: &mut dyn FnMut() -> MatchId,
) -> Vec<TournamentMatch> {
    let slots = first_round_slots(participants);
    let rounds = knockout_rounds(participants.len()) as usize;

    // ids[r][s]: id of the match in bracket round r (0-based) at slot s; None for byes.
    let mut ids: Vec<Vec<Option<MatchId>>> = Vec::with_capacity(rounds);
    ids.push(
        slots
            .iter()
            .map(|s| match s {
                Slot::Pair(..) => Some(next_id()),
                Slot::Bye(_) => None,
            })
            .collect(),
    );
    for r in 1..rounds {
        let count = slots.len() >> r;
        ids.push((0..count).map(|_| Some(next_id())).collect());
    }

    let next_of = |r: usize, s: usize| -> Option<MatchId> {
        ids.get(r + 1).and_then(|next| next[s / 2].clone())
    };

    let mut matches = Vec::new();

    let mut number = 0;
    for (s, slot) in slots.iter().enumerate() {
        if let (Slot::Pair(a, b), Some(id)) = (slot, &ids[0][s]) {
            number += 1;
            matches.push(TournamentMatch {
                id: id.clone(),
                player1_id: Some(a.clone()),
                player2_id: Some(b.clone()),
                next_match_id: next_of(0, s),
                ..TournamentMatch::new(tournament_id, first_round, number)
            });
        }
    }

    for r in 1..rounds {
        for (s, id) in ids[r].iter().enumerate() {
            let Some(id) = id else { continue };
            let mut m = TournamentMatch {
                id: id.clone(),
                next_match_id: next_of(r, s),
                ..TournamentMatch::new(tournament_id, first_round + r as u32, s as u32 + 1)
            };
            if r == 1 {
                if let Some(Slot::Bye(p)) = slots.get(2 * s) {
                    m.player1_id = Some(p.clone());
                }
                if let Some(Slot::Bye(p)) = slots.get(2 * s + 1) {
                    m.player2_id = Some(p.clone());
                }
            }
            matches.push(m);
        }
    }

    matches
}
