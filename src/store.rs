//! Collaborator seams (persistent store, rating update) and an in-memory store adapter.

use crate::models::{
    new_match_id, MatchResult, MatchSlot, MatchStatus, Tournament, TournamentError,
    TournamentMatch,
};
use crate::wire::{ChangeEvent, MalformedRow, MatchRow, TournamentRow};
use thiserror::Error;

#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum StoreError {
    #[error(transparent)]
    Tournament(#[from] TournamentError),
    #[error("tournament {0} already exists")]
    DuplicateTournament(String),
    /// A stored row no longer maps onto the model.
    #[error("corrupt row: {0}")]
    Corrupt(#[from] MalformedRow),
}

/// Persistent storage for tournaments and their matches.
///
/// Writes are the single source of truth: a second completion of the same match must be
/// rejected here, whatever the in-memory state of the caller says.
pub trait Store {
    fn insert_tournament(&mut self, tournament: &Tournament) -> Result<Tournament, StoreError>;
    /// Replace the tournament row (not its matches).
    fn update_tournament(&mut self, tournament: &Tournament) -> Result<Tournament, StoreError>;
    /// Persist generated matches; ids already set are kept, empty ones are assigned.
    fn insert_matches(
        &mut self,
        tournament_id: &str,
        matches: Vec<TournamentMatch>,
    ) -> Result<Vec<TournamentMatch>, StoreError>;
    /// Seat a player in one slot of a scheduled match, leaving the rest of the row alone.
    /// Seating the player already there is a no-op; a slot held by someone else is rejected.
    fn seat_player(
        &mut self,
        match_id: &str,
        slot: MatchSlot,
        player_id: &str,
    ) -> Result<TournamentMatch, StoreError>;
    fn update_match_result(
        &mut self,
        match_id: &str,
        result: &MatchResult,
        winner: &str,
    ) -> Result<TournamentMatch, StoreError>;
    fn set_tournament_winner(
        &mut self,
        tournament_id: &str,
        winner_id: &str,
    ) -> Result<Tournament, StoreError>;
    fn fetch_all(&self) -> Result<Vec<Tournament>, StoreError>;
}

/// Rating update applied once a match result is final. Opaque to the tournament core.
pub trait RatingCalculator {
    /// New ratings for (a, b) after a match that `a` won iff `a_won`.
    fn compute_new_ratings(&self, rating_a: i32, rating_b: i32, a_won: bool) -> (i32, i32);
}

/// Store keeping wire rows in memory. Every write is also recorded as a change event,
/// collected with [`MemoryStore::drain_changes`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    tournaments: Vec<TournamentRow>,
    matches: Vec<MatchRow>,
    outbox: Vec<ChangeEvent>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Change events produced since the last call, in write order.
    pub fn drain_changes(&mut self) -> Vec<ChangeEvent> {
        std::mem::take(&mut self.outbox)
    }

    /// Delete a tournament and its matches (matches first, as a cascading delete would).
    pub fn delete_tournament(&mut self, tournament_id: &str) -> Result<(), StoreError> {
        self.tournament_row(tournament_id)?;
        let (gone, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.matches)
            .into_iter()
            .partition(|r| r.tournament_id.as_deref() == Some(tournament_id));
        self.matches = kept;
        for row in gone {
            if let Some(id) = row.id.as_deref() {
                self.outbox.push(ChangeEvent::match_deleted(tournament_id, id));
            }
        }
        self.tournaments.retain(|r| r.id.as_deref() != Some(tournament_id));
        self.outbox.push(ChangeEvent::tournament_deleted(tournament_id));
        Ok(())
    }

    fn tournament_row(&self, id: &str) -> Result<usize, TournamentError> {
        self.tournaments
            .iter()
            .position(|r| r.id.as_deref() == Some(id))
            .ok_or_else(|| TournamentError::TournamentNotFound(id.to_string()))
    }

    fn match_row(&self, id: &str) -> Result<usize, TournamentError> {
        self.matches
            .iter()
            .position(|r| r.id.as_deref() == Some(id))
            .ok_or_else(|| TournamentError::MatchNotFound(id.to_string()))
    }

    fn load_tournament(&self, idx: usize) -> Result<Tournament, StoreError> {
        let mut t = Tournament::try_from(self.tournaments[idx].clone())?;
        for row in &self.matches {
            if row.tournament_id.as_deref() == Some(t.id.as_str()) {
                t.matches.push(TournamentMatch::try_from(row.clone())?);
            }
        }
        Ok(t)
    }
}

impl Store for MemoryStore {
    fn insert_tournament(&mut self, tournament: &Tournament) -> Result<Tournament, StoreError> {
        if self.tournament_row(&tournament.id).is_ok() {
            return Err(StoreError::DuplicateTournament(tournament.id.clone()));
        }
        let stored = Tournament {
            matches: Vec::new(),
            ..tournament.clone()
        };
        self.tournaments.push(TournamentRow::from(&stored));
        self.outbox.push(ChangeEvent::tournament_inserted(&stored));
        Ok(stored)
    }

    fn update_tournament(&mut self, tournament: &Tournament) -> Result<Tournament, StoreError> {
        let idx = self.tournament_row(&tournament.id)?;
        self.tournaments[idx] = TournamentRow::from(tournament);
        self.outbox.push(ChangeEvent::tournament_updated(tournament));
        self.load_tournament(idx)
    }

    fn insert_matches(
        &mut self,
        tournament_id: &str,
        matches: Vec<TournamentMatch>,
    ) -> Result<Vec<TournamentMatch>, StoreError> {
        self.tournament_row(tournament_id)?;
        let mut stored = Vec::with_capacity(matches.len());
        for mut m in matches {
            if m.id.is_empty() {
                m.id = new_match_id();
            }
            m.tournament_id = tournament_id.to_string();
            self.matches.push(MatchRow::from(&m));
            self.outbox.push(ChangeEvent::match_inserted(&m));
            stored.push(m);
        }
        Ok(stored)
    }

    fn seat_player(
        &mut self,
        match_id: &str,
        slot: MatchSlot,
        player_id: &str,
    ) -> Result<TournamentMatch, StoreError> {
        let idx = self.match_row(match_id)?;
        let mut m = TournamentMatch::try_from(self.matches[idx].clone())?;
        if m.is_completed() {
            return Err(TournamentError::invalid_match(match_id, "already completed").into());
        }
        match m.player(slot) {
            Some(current) if current == player_id => return Ok(m),
            Some(current) => {
                return Err(TournamentError::invalid_match(
                    match_id,
                    format!("{slot:?} already taken by {current}"),
                )
                .into())
            }
            None => {}
        }
        *m.player_mut(slot) = Some(player_id.to_string());
        self.matches[idx] = MatchRow::from(&m);
        self.outbox.push(ChangeEvent::match_updated(&m));
        Ok(m)
    }

    fn update_match_result(
        &mut self,
        match_id: &str,
        result: &MatchResult,
        winner: &str,
    ) -> Result<TournamentMatch, StoreError> {
        let idx = self.match_row(match_id)?;
        let mut m = TournamentMatch::try_from(self.matches[idx].clone())?;
        if m.status != MatchStatus::Scheduled {
            return Err(TournamentError::invalid_match(match_id, "already completed").into());
        }
        if !m.has_both_players() {
            return Err(TournamentError::invalid_match(match_id, "awaiting a player").into());
        }
        if !m.involves(winner) {
            return Err(TournamentError::PlayerNotFound(winner.to_string()).into());
        }
        m.player1_score = Some(result.player1_score);
        m.player2_score = Some(result.player2_score);
        m.sets = result.sets.clone();
        m.winner = Some(winner.to_string());
        m.status = MatchStatus::Completed;
        self.matches[idx] = MatchRow::from(&m);
        self.outbox.push(ChangeEvent::match_updated(&m));
        Ok(m)
    }

    fn set_tournament_winner(
        &mut self,
        tournament_id: &str,
        winner_id: &str,
    ) -> Result<Tournament, StoreError> {
        let idx = self.tournament_row(tournament_id)?;
        let mut t = self.load_tournament(idx)?;
        crate::logic::set_winner(&mut t, winner_id)?;
        self.tournaments[idx] = TournamentRow::from(&t);
        self.outbox.push(ChangeEvent::tournament_updated(&t));
        Ok(t)
    }

    fn fetch_all(&self) -> Result<Vec<Tournament>, StoreError> {
        (0..self.tournaments.len())
            .map(|idx| self.load_tournament(idx))
            .collect()
    }
}
