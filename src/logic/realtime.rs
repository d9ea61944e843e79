//! Realtime synchronization: fold change-feed events into the in-memory tournament list.
//!
//! The reducer never fails. Malformed or partial events are logged and dropped, and a
//! match event for a tournament that is not loaded yet is ignored (the parent's own
//! insert or a refetch brings it back). Replaying an insert or update replaces the
//! record with itself; deleting an absent id does nothing.
//!
//! Events for one entity must be applied in feed order; the reducer does not reorder.

use crate::models::{Tournament, TournamentMatch};
use crate::wire::{ChangeEvent, MalformedRow, MatchRow, Operation, RowChange, TournamentRow};

/// Why an event left the state untouched.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Ignored {
    /// The payload could not be read.
    Malformed(MalformedRow),
    /// Match event for a tournament that is not in memory.
    ParentNotLoaded(String),
    /// Delete of a record that is already gone.
    AlreadyAbsent,
}

/// Effect of applying one event.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ApplyOutcome {
    Inserted,
    Updated,
    Removed,
    Ignored(Ignored),
}

impl From<MalformedRow> for ApplyOutcome {
    fn from(e: MalformedRow) -> Self {
        ApplyOutcome::Ignored(Ignored::Malformed(e))
    }
}

/// Apply a single change event to `tournaments`.
pub fn apply_change(tournaments: &mut Vec<Tournament>, event: ChangeEvent) -> ApplyOutcome {
    let operation = event.operation();
    let outcome = match event {
        ChangeEvent::Tournament(change) => apply_tournament(tournaments, change),
        ChangeEvent::TournamentMatch(change) => apply_match(tournaments, change),
    };
    match &outcome {
        ApplyOutcome::Ignored(Ignored::Malformed(e)) => {
            log::warn!("dropping malformed {:?} event: {}", operation, e)
        }
        ApplyOutcome::Ignored(reason) => log::debug!("{:?} event ignored: {:?}", operation, reason),
        applied => log::debug!("{:?} event applied: {:?}", operation, applied),
    }
    outcome
}

/// Apply events in order. Returns how many changed the state.
pub fn apply_changes(
    tournaments: &mut Vec<Tournament>,
    events: impl IntoIterator<Item = ChangeEvent>,
) -> usize {
    events
        .into_iter()
        .map(|e| apply_change(tournaments, e))
        .filter(|o| !matches!(o, ApplyOutcome::Ignored(_)))
        .count()
}

fn apply_tournament(
    tournaments: &mut Vec<Tournament>,
    change: RowChange<TournamentRow>,
) -> ApplyOutcome {
    match change.operation {
        Operation::Insert | Operation::Update => {
            let Some(row) = change.new_record else {
                return MalformedRow::MissingRecord("tournament").into();
            };
            let incoming = match Tournament::try_from(row) {
                Ok(t) => t,
                Err(e) => return e.into(),
            };
            match tournaments.iter_mut().find(|t| t.id == incoming.id) {
                // The row never carries matches; they arrive on their own stream.
                Some(existing) => {
                    let matches = std::mem::take(&mut existing.matches);
                    *existing = Tournament {
                        matches,
                        ..incoming
                    };
                    ApplyOutcome::Updated
                }
                None => {
                    tournaments.push(incoming);
                    ApplyOutcome::Inserted
                }
            }
        }
        Operation::Delete => {
            let Some(id) = change.old_record.and_then(|r| r.id) else {
                return MalformedRow::MissingField {
                    entity: "tournament",
                    field: "id",
                }
                .into();
            };
            let before = tournaments.len();
            tournaments.retain(|t| t.id != id);
            if tournaments.len() < before {
                ApplyOutcome::Removed
            } else {
                ApplyOutcome::Ignored(Ignored::AlreadyAbsent)
            }
        }
    }
}

fn apply_match(tournaments: &mut [Tournament], change: RowChange<MatchRow>) -> ApplyOutcome {
    let parent_id = change
        .new_record
        .as_ref()
        .and_then(|r| r.tournament_id.clone())
        .or_else(|| change.old_record.as_ref().and_then(|r| r.tournament_id.clone()));
    let Some(parent_id) = parent_id else {
        return MalformedRow::MissingField {
            entity: "tournament_match",
            field: "tournament_id",
        }
        .into();
    };
    let Some(parent) = tournaments.iter_mut().find(|t| t.id == parent_id) else {
        return ApplyOutcome::Ignored(Ignored::ParentNotLoaded(parent_id));
    };

    match change.operation {
        Operation::Insert | Operation::Update => {
            let Some(mut row) = change.new_record else {
                return MalformedRow::MissingRecord("tournament_match").into();
            };
            row.tournament_id = Some(parent_id);
            let m = match TournamentMatch::try_from(row) {
                Ok(m) => m,
                Err(e) => return e.into(),
            };
            if parent.upsert_match(m) {
                ApplyOutcome::Inserted
            } else {
                ApplyOutcome::Updated
            }
        }
        Operation::Delete => {
            let Some(id) = change.old_record.and_then(|r| r.id) else {
                return MalformedRow::MissingField {
                    entity: "tournament_match",
                    field: "id",
                }
                .into();
            };
            match parent.remove_match(&id) {
                Some(_) => ApplyOutcome::Removed,
                None => ApplyOutcome::Ignored(Ignored::AlreadyAbsent),
            }
        }
    }
}
