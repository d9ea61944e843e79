//! Integration tests for the store adapter and the change-feed loop around the engine.

use chrono::NaiveDate;
use pingpong_tournament::{
    apply_changes, find_tournament, maybe_advance, record_result, start, ChangeEvent,
    EngineConfig, MatchResult, MatchSlot, MemoryStore, Operation, RatingCalculator, Store,
    StoreError, Tournament, TournamentError, TournamentFormat, TournamentStatus,
};

fn new_tournament(format: TournamentFormat, participants: &[&str]) -> Tournament {
    Tournament::new(
        "League night",
        NaiveDate::from_ymd_opt(2024, 9, 20).unwrap(),
        format,
        participants.iter().map(|s| s.to_string()).collect(),
    )
}

/// Feed every pending store change into `state`, letting progression react until quiet.
fn pump(store: &mut MemoryStore, state: &mut Vec<Tournament>, config: &EngineConfig) {
    loop {
        let events = store.drain_changes();
        if events.is_empty() {
            break;
        }
        apply_changes(state, events);
        let ids: Vec<String> = state.iter().map(|t| t.id.clone()).collect();
        for id in ids {
            let t = find_tournament(state, &id).unwrap();
            let adv = maybe_advance(t, config).unwrap();
            if !adv.new_matches.is_empty() {
                store.insert_matches(&id, adv.new_matches).unwrap();
            } else if let Some(winner) = adv.winner_ready {
                store.set_tournament_winner(&id, &winner).unwrap();
            }
        }
    }
}

/// Record a result the way a host would: engine on a copy, store as the arbiter.
fn play(
    store: &mut MemoryStore,
    state: &[Tournament],
    tournament_id: &str,
    match_id: &str,
    result: MatchResult,
) -> Result<(), StoreError> {
    let mut t = find_tournament(state, tournament_id)?.clone();
    let changed = record_result(&mut t, match_id, &result)?;
    let winner = changed[0].winner.clone().unwrap();
    store.update_match_result(match_id, &result, &winner)?;
    for m in &changed[1..] {
        store.seat_player(&m.id, m.slot_of(&winner).unwrap(), &winner)?;
    }
    Ok(())
}

#[test]
fn feed_rebuilds_the_stored_state() {
    let config = EngineConfig::default();
    let mut store = MemoryStore::new();
    let mut t = new_tournament(TournamentFormat::Knockout, &["A", "B", "C", "D"]);
    store.insert_tournament(&t).unwrap();
    let matches = start(&mut t, &config).unwrap();
    store.update_tournament(&t).unwrap();
    store.insert_matches(&t.id, matches).unwrap();

    let events = store.drain_changes();
    assert_eq!(events.len(), 5);
    assert_eq!(events[0].operation(), Operation::Insert);

    let mut state = Vec::new();
    apply_changes(&mut state, events);
    assert_eq!(state, store.fetch_all().unwrap());
    assert_eq!(state[0].status, TournamentStatus::Active);
}

#[test]
fn store_rejects_a_second_completion() {
    let config = EngineConfig::default();
    let mut store = MemoryStore::new();
    let mut t = new_tournament(TournamentFormat::RoundRobin, &["A", "B"]);
    store.insert_tournament(&t).unwrap();
    let matches = start(&mut t, &config).unwrap();
    store.update_tournament(&t).unwrap();
    let stored = store.insert_matches(&t.id, matches).unwrap();
    let id = &stored[0].id;

    store.update_match_result(id, &MatchResult::new(3, 1), "A").unwrap();
    let second = store.update_match_result(id, &MatchResult::new(0, 3), "B");
    assert!(matches!(
        second,
        Err(StoreError::Tournament(TournamentError::InvalidMatchState { .. }))
    ));
    let all = store.fetch_all().unwrap();
    assert_eq!(all[0].matches[0].winner.as_deref(), Some("A"));
}

#[test]
fn results_recorded_from_the_same_snapshot_keep_both_seats() {
    let config = EngineConfig::default();
    let mut store = MemoryStore::new();
    let mut state = Vec::new();
    let mut t = new_tournament(TournamentFormat::Knockout, &["p1", "p2", "p3", "p4"]);
    let tid = t.id.clone();
    store.insert_tournament(&t).unwrap();
    let matches = start(&mut t, &config).unwrap();
    store.update_tournament(&t).unwrap();
    store.insert_matches(&tid, matches).unwrap();
    pump(&mut store, &mut state, &config);

    // Both semi-finals land before the feed catches up.
    let snapshot = state.clone();
    let semis: Vec<String> = snapshot[0].round_matches(1).iter().map(|m| m.id.clone()).collect();
    play(&mut store, &snapshot, &tid, &semis[0], MatchResult::new(3, 0)).unwrap();
    play(&mut store, &snapshot, &tid, &semis[1], MatchResult::new(3, 1)).unwrap();
    pump(&mut store, &mut state, &config);

    let fin = state[0].round_matches(2)[0].clone();
    assert_eq!(fin.player1_id.as_deref(), Some("p1"));
    assert_eq!(fin.player2_id.as_deref(), Some("p3"));
    assert_eq!(state, store.fetch_all().unwrap());

    play(&mut store, &state, &tid, &fin.id, MatchResult::new(3, 2)).unwrap();
    pump(&mut store, &mut state, &config);
    assert_eq!(state[0].winner.as_deref(), Some("p1"));
}

#[test]
fn seating_never_displaces_another_player() {
    let config = EngineConfig::default();
    let mut store = MemoryStore::new();
    let mut t = new_tournament(TournamentFormat::Knockout, &["A", "B", "C", "D"]);
    store.insert_tournament(&t).unwrap();
    let matches = start(&mut t, &config).unwrap();
    store.update_tournament(&t).unwrap();
    let stored = store.insert_matches(&t.id, matches).unwrap();
    let fin = stored.iter().find(|m| m.round == 2).unwrap().id.clone();
    store.drain_changes();

    let seated = store.seat_player(&fin, MatchSlot::Player1, "A").unwrap();
    assert_eq!(seated.player1_id.as_deref(), Some("A"));
    assert_eq!(seated.player2_id, None);
    assert_eq!(store.drain_changes().len(), 1);

    // Same player again: nothing to write.
    store.seat_player(&fin, MatchSlot::Player1, "A").unwrap();
    assert!(store.drain_changes().is_empty());

    assert!(matches!(
        store.seat_player(&fin, MatchSlot::Player1, "B"),
        Err(StoreError::Tournament(TournamentError::InvalidMatchState { .. }))
    ));
    let seated = store.seat_player(&fin, MatchSlot::Player2, "D").unwrap();
    assert_eq!(seated.player1_id.as_deref(), Some("A"));
    assert_eq!(seated.player2_id.as_deref(), Some("D"));
}

#[test]
fn group_tournament_runs_to_completion_through_the_feed() {
    let config = EngineConfig::default();
    let mut store = MemoryStore::new();
    let mut state = Vec::new();

    let mut t = new_tournament(TournamentFormat::Group, &["A", "B", "C", "D"]);
    let tid = t.id.clone();
    store.insert_tournament(&t).unwrap();
    let matches = start(&mut t, &config).unwrap();
    store.update_tournament(&t).unwrap();
    store.insert_matches(&tid, matches).unwrap();
    pump(&mut store, &mut state, &config);
    assert_eq!(state[0].matches.len(), 2);

    let group_ids: Vec<String> = state[0].matches.iter().map(|m| m.id.clone()).collect();
    for id in &group_ids {
        play(&mut store, &state, &tid, id, MatchResult::new(3, 0)).unwrap();
        pump(&mut store, &mut state, &config);
    }
    // Knockout final generated once, from the two group winners.
    let finals: Vec<_> = state[0].matches.iter().filter(|m| m.round == 2).collect();
    assert_eq!(finals.len(), 1);
    assert_eq!(finals[0].player1_id.as_deref(), Some("A"));
    assert_eq!(finals[0].player2_id.as_deref(), Some("C"));

    let final_id = finals[0].id.clone();
    play(&mut store, &state, &tid, &final_id, MatchResult::new(1, 3)).unwrap();
    pump(&mut store, &mut state, &config);

    assert_eq!(state[0].status, TournamentStatus::Completed);
    assert_eq!(state[0].winner.as_deref(), Some("C"));
    assert_eq!(state[0].matches.len(), 3);
    assert_eq!(state, store.fetch_all().unwrap());
}

#[test]
fn deleting_a_tournament_clears_it_from_the_feed() {
    let config = EngineConfig::default();
    let mut store = MemoryStore::new();
    let mut state = Vec::new();
    let mut t = new_tournament(TournamentFormat::Knockout, &["A", "B"]);
    store.insert_tournament(&t).unwrap();
    let matches = start(&mut t, &config).unwrap();
    store.update_tournament(&t).unwrap();
    store.insert_matches(&t.id, matches).unwrap();
    pump(&mut store, &mut state, &config);

    store.delete_tournament(&t.id).unwrap();
    let events = store.drain_changes();
    assert!(matches!(
        &events[0],
        ChangeEvent::TournamentMatch(c) if c.operation == Operation::Delete
    ));
    apply_changes(&mut state, events);
    assert!(state.is_empty());
    assert!(store.fetch_all().unwrap().is_empty());
}

#[test]
fn unknown_ids_surface_as_store_errors() {
    let mut store = MemoryStore::new();
    assert_eq!(
        store.insert_matches("missing", Vec::new()),
        Err(StoreError::Tournament(TournamentError::TournamentNotFound(
            "missing".to_string()
        )))
    );
    assert_eq!(
        store.update_match_result("m1", &MatchResult::new(3, 0), "A"),
        Err(StoreError::Tournament(TournamentError::MatchNotFound(
            "m1".to_string()
        )))
    );
}

struct FixedStep(i32);

impl RatingCalculator for FixedStep {
    fn compute_new_ratings(&self, rating_a: i32, rating_b: i32, a_won: bool) -> (i32, i32) {
        let step = if a_won { self.0 } else { -self.0 };
        (rating_a + step, rating_b - step)
    }
}

#[test]
fn rating_collaborator_is_a_plain_trait_object() {
    let calc: Box<dyn RatingCalculator> = Box::new(FixedStep(16));
    assert_eq!(calc.compute_new_ratings(1200, 1200, true), (1216, 1184));
    assert_eq!(calc.compute_new_ratings(1200, 1200, false), (1184, 1216));
}
