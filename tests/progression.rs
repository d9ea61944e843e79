//! Integration tests for tournament progression: start, results, stage generation, winner.

use chrono::NaiveDate;
use pingpong_tournament::{
    advance, maybe_advance, record_result, set_winner, start, EngineConfig, GroupPartition,
    MatchResult, MatchStatus, PlayerId, SetScore, Tournament, TournamentError, TournamentFormat,
    TournamentMatch, TournamentStatus,
};

fn tournament(format: TournamentFormat, participants: &[&str]) -> Tournament {
    Tournament::new(
        "Club night",
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
        format,
        participants.iter().map(|s| s.to_string()).collect(),
    )
}

fn seeds(n: usize) -> Vec<String> {
    (1..=n).map(|i| format!("p{i}")).collect()
}

fn started(format: TournamentFormat, participants: &[&str], config: &EngineConfig) -> Tournament {
    let mut t = tournament(format, participants);
    start(&mut t, config).unwrap();
    t
}

fn match_at(t: &Tournament, round: u32, number: u32) -> TournamentMatch {
    t.matches
        .iter()
        .find(|m| m.round == round && m.match_number == number)
        .cloned()
        .unwrap()
}

/// Play every ready match with player 1 winning 3-0, until none is left.
fn play_out_player1_wins(t: &mut Tournament) {
    loop {
        let mut ready: Vec<TournamentMatch> = t
            .matches
            .iter()
            .filter(|m| m.status == MatchStatus::Scheduled && m.has_both_players())
            .cloned()
            .collect();
        if ready.is_empty() {
            break;
        }
        ready.sort_by_key(|m| (m.round, m.match_number));
        for m in ready {
            record_result(t, &m.id, &MatchResult::new(3, 0)).unwrap();
        }
    }
}

#[test]
fn start_generates_round_one_and_activates() {
    let mut t = tournament(TournamentFormat::Knockout, &["A", "B", "C", "D"]);
    let matches = start(&mut t, &EngineConfig::default()).unwrap();
    assert_eq!(matches.len(), 3);
    assert_eq!(t.status, TournamentStatus::Active);
    assert_eq!(t.matches, matches);
    assert!(matches.iter().all(|m| m.tournament_id == t.id));

    assert_eq!(
        start(&mut t, &EngineConfig::default()),
        Err(TournamentError::InvalidState(TournamentStatus::Active))
    );
}

#[test]
fn failed_start_leaves_tournament_untouched() {
    let mut t = tournament(TournamentFormat::Knockout, &["A"]);
    let before = t.clone();
    assert_eq!(
        start(&mut t, &EngineConfig::default()),
        Err(TournamentError::InsufficientParticipants { found: 1 })
    );
    assert_eq!(t, before);
}

#[test]
fn knockout_winner_is_seated_immediately() {
    let mut t = started(TournamentFormat::Knockout, &["A", "B", "C", "D"], &EngineConfig::default());
    let first = match_at(&t, 1, 1);
    let result = MatchResult::from_sets(vec![
        SetScore::new(11, 5),
        SetScore::new(8, 11),
        SetScore::new(11, 9),
    ]);

    let changed = record_result(&mut t, &first.id, &result).unwrap();
    assert_eq!(changed.len(), 2);
    assert_eq!(changed[0].winner.as_deref(), Some("A"));
    assert_eq!(changed[0].player1_score, Some(2));
    assert_eq!(changed[0].player2_score, Some(1));
    assert_eq!(changed[0].sets.len(), 3);
    assert_eq!(changed[0].status, MatchStatus::Completed);

    let fin = match_at(&t, 2, 1);
    assert_eq!(fin.player1_id.as_deref(), Some("A"));
    assert_eq!(fin.player2_id, None);

    // Second semi-final fills the other slot.
    let second = match_at(&t, 1, 2);
    record_result(&mut t, &second.id, &MatchResult::new(1, 3)).unwrap();
    let fin = match_at(&t, 2, 1);
    assert_eq!(fin.player2_id.as_deref(), Some("D"));
    assert!(maybe_advance(&t, &EngineConfig::default()).unwrap().is_empty());
}

#[test]
fn invalid_results_are_rejected() {
    let mut t = started(TournamentFormat::Knockout, &["A", "B", "C", "D"], &EngineConfig::default());
    let first = match_at(&t, 1, 1);
    let fin = match_at(&t, 2, 1);

    assert!(matches!(
        record_result(&mut t, &fin.id, &MatchResult::new(3, 0)),
        Err(TournamentError::InvalidMatchState { .. })
    ));
    assert_eq!(
        record_result(&mut t, &first.id, &MatchResult::new(2, 2)),
        Err(TournamentError::TiedResult(2, 2))
    );
    assert_eq!(
        record_result(&mut t, "nope", &MatchResult::new(3, 0)),
        Err(TournamentError::MatchNotFound("nope".to_string()))
    );

    record_result(&mut t, &first.id, &MatchResult::new(3, 0)).unwrap();
    assert!(matches!(
        record_result(&mut t, &first.id, &MatchResult::new(0, 3)),
        Err(TournamentError::InvalidMatchState { .. })
    ));
    // The first result stands.
    assert_eq!(match_at(&t, 1, 1).winner.as_deref(), Some("A"));
}

#[test]
fn eight_player_bracket_is_won_by_top_seed() {
    let players = seeds(8);
    let names: Vec<&str> = players.iter().map(String::as_str).collect();
    let config = EngineConfig::default();
    let mut t = started(TournamentFormat::Knockout, &names, &config);

    play_out_player1_wins(&mut t);

    let fin = match_at(&t, 3, 1);
    assert_eq!(fin.winner.as_deref(), Some("p1"));
    let adv = maybe_advance(&t, &config).unwrap();
    assert_eq!(adv.winner_ready.as_deref(), Some("p1"));
    assert!(adv.new_matches.is_empty());

    set_winner(&mut t, "p1").unwrap();
    assert_eq!(t.status, TournamentStatus::Completed);
    assert_eq!(t.winner.as_deref(), Some("p1"));
    assert!(maybe_advance(&t, &config).unwrap().is_empty());
}

#[test]
fn byes_play_through_to_a_winner() {
    let players = seeds(6);
    let names: Vec<&str> = players.iter().map(String::as_str).collect();
    let mut t = started(TournamentFormat::Knockout, &names, &EngineConfig::default());

    play_out_player1_wins(&mut t);

    assert!(t.all_matches_completed());
    let round2 = t.round_matches(2);
    assert_eq!(round2[0].player2_id.as_deref(), Some("p3"));
    assert_eq!(round2[1].player2_id.as_deref(), Some("p5"));
    let adv = maybe_advance(&t, &EngineConfig::default()).unwrap();
    assert_eq!(adv.winner_ready.as_deref(), Some("p1"));
}

#[test]
fn round_robin_is_decided_by_standings_once_all_played() {
    let config = EngineConfig::default();
    let mut t = started(TournamentFormat::RoundRobin, &["A", "B", "C"], &config);
    let ids: Vec<_> = t.matches.iter().map(|m| m.id.clone()).collect();
    // Pairs in order: A-B, A-C, B-C.
    record_result(&mut t, &ids[0], &MatchResult::new(1, 3)).unwrap();
    record_result(&mut t, &ids[1], &MatchResult::new(3, 0)).unwrap();
    assert!(maybe_advance(&t, &config).unwrap().is_empty());

    record_result(&mut t, &ids[2], &MatchResult::new(3, 2)).unwrap();
    let adv = maybe_advance(&t, &config).unwrap();
    assert_eq!(adv.winner_ready.as_deref(), Some("B"));
    assert!(adv.new_matches.is_empty());
}

#[test]
fn group_stage_generates_knockout_exactly_once() {
    let config = EngineConfig::default();
    let mut t = started(TournamentFormat::Group, &["A", "B", "C", "D"], &config);
    assert_eq!(t.matches.len(), 2);
    assert!(advance(&mut t, &config).unwrap().is_empty());

    let ab = match_at(&t, 1, 1);
    let cd = match_at(&t, 1, 2);
    record_result(&mut t, &ab.id, &MatchResult::new(3, 0)).unwrap();
    assert!(advance(&mut t, &config).unwrap().is_empty());
    record_result(&mut t, &cd.id, &MatchResult::new(0, 3)).unwrap();

    let adv = advance(&mut t, &config).unwrap();
    assert_eq!(adv.new_matches.len(), 1);
    let fin = &adv.new_matches[0];
    assert_eq!(fin.round, 2);
    assert_eq!(fin.player1_id.as_deref(), Some("A"));
    assert_eq!(fin.player2_id.as_deref(), Some("D"));
    assert_eq!(fin.group, None);
    assert_eq!(t.matches.len(), 3);

    // Repeated checks do not generate it again.
    let again = advance(&mut t, &config).unwrap();
    assert!(again.is_empty());
    assert_eq!(t.matches.iter().filter(|m| m.round > 1).count(), 1);

    let fin_id = fin.id.clone();
    record_result(&mut t, &fin_id, &MatchResult::new(2, 3)).unwrap();
    let adv = advance(&mut t, &config).unwrap();
    assert_eq!(adv.winner_ready.as_deref(), Some("D"));
}

#[test]
fn two_qualifiers_per_group_cross_over() {
    let config = EngineConfig {
        qualifiers_per_group: 2,
        ..EngineConfig::default()
    };
    let players = seeds(8);
    let names: Vec<&str> = players.iter().map(String::as_str).collect();
    let mut t = started(TournamentFormat::Group, &names, &config);
    assert_eq!(t.matches.len(), 12);

    play_out_player1_wins(&mut t);
    let adv = advance(&mut t, &config).unwrap();
    assert_eq!(adv.new_matches.len(), 3);

    let semis = t.round_matches(2);
    assert_eq!(semis.len(), 2);
    let pair = |m: &TournamentMatch| (m.player1_id.clone(), m.player2_id.clone());
    assert_eq!(pair(semis[0]), (Some("p1".into()), Some("p6".into())));
    assert_eq!(pair(semis[1]), (Some("p5".into()), Some("p2".into())));
    assert_eq!(t.round_matches(3).len(), 1);
}

#[test]
fn uneven_groups_still_avoid_rematches_in_the_first_knockout_round() {
    let config = EngineConfig {
        qualifiers_per_group: 2,
        ..EngineConfig::default()
    };
    let players = seeds(8);
    let names: Vec<&str> = players.iter().map(String::as_str).collect();
    let mut t = started(TournamentFormat::Group, &names, &config);

    // Group 1: p1 sweeps, p2 second on -1. Group 2: p5 wins every match 3-2, p6 second on +5.
    let results = [
        (1, 3, 0),
        (2, 3, 0),
        (3, 3, 0),
        (4, 3, 2),
        (5, 3, 2),
        (6, 3, 0),
        (7, 3, 2),
        (8, 3, 2),
        (9, 3, 2),
        (10, 3, 0),
        (11, 3, 0),
        (12, 3, 0),
    ];
    for (number, a, b) in results {
        let m = match_at(&t, 1, number);
        record_result(&mut t, &m.id, &MatchResult::new(a, b)).unwrap();
    }

    advance(&mut t, &config).unwrap();
    let semis = t.round_matches(2);
    let pair = |m: &TournamentMatch| (m.player1_id.clone(), m.player2_id.clone());
    assert_eq!(pair(semis[0]), (Some("p1".into()), Some("p6".into())));
    assert_eq!(pair(semis[1]), (Some("p5".into()), Some("p2".into())));
}

#[test]
fn interleaved_groups_run_through_to_the_final() {
    let config = EngineConfig {
        group_partition: GroupPartition::Interleaved,
        ..EngineConfig::default()
    };
    let mut t = started(TournamentFormat::Group, &["A", "B", "C", "D"], &config);

    let first = match_at(&t, 1, 1);
    let second = match_at(&t, 1, 2);
    assert_eq!(first.group, Some(1));
    assert_eq!(first.player1_id.as_deref(), Some("A"));
    assert_eq!(first.player2_id.as_deref(), Some("C"));
    assert_eq!(second.group, Some(2));
    assert_eq!(second.player1_id.as_deref(), Some("B"));
    assert_eq!(second.player2_id.as_deref(), Some("D"));

    record_result(&mut t, &first.id, &MatchResult::new(3, 1)).unwrap();
    record_result(&mut t, &second.id, &MatchResult::new(1, 3)).unwrap();

    let adv = advance(&mut t, &config).unwrap();
    assert_eq!(adv.new_matches.len(), 1);
    let fin = &adv.new_matches[0];
    assert_eq!(fin.player1_id.as_deref(), Some("A"));
    assert_eq!(fin.player2_id.as_deref(), Some("D"));
}

#[test]
fn too_few_qualifiers_fail_without_changes() {
    let config = EngineConfig {
        group_count: 1,
        ..EngineConfig::default()
    };
    let mut t = started(TournamentFormat::Group, &["A", "B", "C"], &config);
    play_out_player1_wins(&mut t);
    let before = t.clone();

    assert_eq!(
        advance(&mut t, &config),
        Err(TournamentError::InsufficientParticipants { found: 1 })
    );
    assert_eq!(t, before);
}

#[test]
fn upcoming_tournament_has_nothing_to_advance() {
    let t = tournament(TournamentFormat::Group, &["A", "B", "C", "D"]);
    assert!(maybe_advance(&t, &EngineConfig::default()).unwrap().is_empty());
}

#[test]
fn winner_must_be_a_participant() {
    let mut t = started(TournamentFormat::Knockout, &["A", "B"], &EngineConfig::default());
    assert_eq!(
        set_winner(&mut t, "Z"),
        Err(TournamentError::PlayerNotFound("Z".to_string()))
    );
    assert_eq!(t.status, TournamentStatus::Active);
}

#[test]
fn participants_are_kept_in_seed_order() {
    let t = tournament(TournamentFormat::Knockout, &["B", "A"]);
    let expected: Vec<PlayerId> = vec!["B".into(), "A".into()];
    assert_eq!(t.participants, expected);
}
