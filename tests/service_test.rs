//! End-to-end tests of room operations through the game service.

use chess_rooms::{
    COMPUTER_ID, Difficulty, DrawReason, EngineConfig, EngineMetrics, EventKind, GameError,
    GameService, ManualClock, MemorySink, Move, SessionState, Side,
};
use chrono::TimeDelta;
use std::sync::Arc;

struct Harness {
    service: GameService,
    sink: Arc<MemorySink>,
    clock: Arc<ManualClock>,
}

fn harness(config: EngineConfig) -> Harness {
    let sink = Arc::new(MemorySink::new());
    let clock = Arc::new(ManualClock::starting_now());
    let service = GameService::new(
        config,
        sink.clone(),
        clock.clone(),
        EngineMetrics::unregistered(),
    );
    Harness {
        service,
        sink,
        clock,
    }
}

fn default_harness() -> Harness {
    harness(EngineConfig::default().with_seed(11).with_depth(2))
}

fn mv(uci: &str) -> Move {
    uci.parse().unwrap()
}

#[test]
fn test_human_move_gets_computer_reply() {
    let h = default_harness();
    let id = h
        .service
        .create_ai_game("alice", Side::White, Difficulty::Easy)
        .unwrap();

    let snapshot = h.service.submit_move(&id, "alice", mv("e2e4")).unwrap();
    assert_eq!(snapshot.ply, 2);
    assert_eq!(snapshot.side_to_move, Side::White);
    assert_eq!(snapshot.turn_owner.as_deref(), Some("alice"));
    assert_eq!(snapshot.state, SessionState::InProgress);
    assert!(snapshot.last_move.is_some());
    assert_eq!(h.service.metrics().moves_total.get(), 2);
}

#[test]
fn test_computer_opens_when_it_has_white() {
    let h = default_harness();
    let id = h
        .service
        .create_ai_game("alice", Side::Black, Difficulty::Medium)
        .unwrap();
    let snapshot = h.service.snapshot(&id).unwrap();
    assert_eq!(snapshot.ply, 1);
    assert_eq!(snapshot.white.id, COMPUTER_ID);
    assert_eq!(snapshot.side_to_move, Side::Black);
}

#[test]
fn test_checkmate_then_game_finished() {
    let h = default_harness();
    let id = h.service.create_game("alice", "bob").unwrap();
    for (player, uci) in [
        ("alice", "f2f3"),
        ("bob", "e7e5"),
        ("alice", "g2g4"),
        ("bob", "d8h4"),
    ] {
        h.service.submit_move(&id, player, mv(uci)).unwrap();
    }

    let snapshot = h.service.snapshot(&id).unwrap();
    assert_eq!(
        snapshot.state,
        SessionState::Checkmate {
            winner: Side::Black
        }
    );
    assert_eq!(snapshot.turn_owner, None);
    assert_eq!(
        h.service.submit_move(&id, "alice", mv("a2a3")).unwrap_err(),
        GameError::GameFinished
    );

    h.service.events().flush().unwrap();
    let kinds: Vec<_> = h.sink.events_for(&id).iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![
            EventKind::Move,
            EventKind::Move,
            EventKind::Move,
            EventKind::Move,
            EventKind::Checkmate
        ]
    );
}

#[test]
fn test_resign_ends_the_game() {
    let h = default_harness();
    let id = h.service.create_game("alice", "bob").unwrap();
    let snapshot = h.service.resign(&id, "alice").unwrap();
    assert_eq!(
        snapshot.state,
        SessionState::Resigned {
            winner: Side::Black
        }
    );
    assert_eq!(
        h.service.resign(&id, "bob").unwrap_err(),
        GameError::GameFinished
    );

    h.service.events().flush().unwrap();
    let events = h.sink.events_for(&id);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, EventKind::Resign);
    assert_eq!(events[0].payload.winner, Some(Side::Black));
}

#[test]
fn test_draw_by_agreement() {
    let h = default_harness();
    let id = h.service.create_game("alice", "bob").unwrap();

    let offered = h.service.offer_draw(&id, "alice").unwrap();
    assert_eq!(offered.draw_offer.map(|o| o.offered_by), Some(Side::White));
    // The offerer cannot accept their own offer.
    assert_eq!(
        h.service.accept_draw(&id, "alice").unwrap_err(),
        GameError::NoDrawOffer
    );

    let snapshot = h.service.accept_draw(&id, "bob").unwrap();
    assert_eq!(
        snapshot.state,
        SessionState::Draw {
            reason: DrawReason::Agreement
        }
    );
}

#[test]
fn test_declined_and_lapsed_offers() {
    let h = default_harness();
    let id = h.service.create_game("alice", "bob").unwrap();

    assert_eq!(
        h.service.decline_draw(&id, "bob").unwrap_err(),
        GameError::NoDrawOffer
    );
    h.service.offer_draw(&id, "alice").unwrap();
    let snapshot = h.service.decline_draw(&id, "bob").unwrap();
    assert_eq!(snapshot.draw_offer, None);
    assert_eq!(snapshot.state, SessionState::InProgress);

    // An offer lapses when its recipient moves instead of answering.
    h.service.submit_move(&id, "alice", mv("e2e4")).unwrap();
    h.service.offer_draw(&id, "alice").unwrap();
    let snapshot = h.service.submit_move(&id, "bob", mv("e7e5")).unwrap();
    assert_eq!(snapshot.draw_offer, None);
}

#[test]
fn test_computer_declines_draw_offers() {
    let h = default_harness();
    let id = h
        .service
        .create_ai_game("alice", Side::White, Difficulty::Easy)
        .unwrap();
    let snapshot = h.service.offer_draw(&id, "alice").unwrap();
    assert_eq!(snapshot.draw_offer, None);
    assert_eq!(snapshot.state, SessionState::InProgress);
}

#[test]
fn test_flag_falls_on_next_interaction() {
    let h = harness(
        EngineConfig::default()
            .with_depth(2)
            .with_time_control_secs(Some(60)),
    );
    let id = h.service.create_game("alice", "bob").unwrap();
    h.clock.advance(TimeDelta::seconds(10));
    let snapshot = h.service.submit_move(&id, "alice", mv("e2e4")).unwrap();
    assert_eq!(snapshot.white_remaining_ms, Some(50_000));

    h.clock.advance(TimeDelta::seconds(61));
    assert_eq!(
        h.service.submit_move(&id, "bob", mv("e7e5")).unwrap_err(),
        GameError::GameFinished
    );
    let snapshot = h.service.snapshot(&id).unwrap();
    assert_eq!(
        snapshot.state,
        SessionState::TimedOut {
            winner: Side::White
        }
    );
    assert_eq!(snapshot.black_remaining_ms, Some(0));

    h.service.events().flush().unwrap();
    let last = h.sink.events_for(&id).pop().unwrap();
    assert_eq!(last.kind, EventKind::Timeout);
    assert_eq!(last.actor, "bob");
}

#[test]
fn test_open_and_join_room() {
    let h = default_harness();
    let id = h.service.open_room("alice").unwrap();
    assert_eq!(
        h.service.snapshot(&id).unwrap().state,
        SessionState::WaitingForOpponent
    );
    assert_eq!(
        h.service.submit_move(&id, "alice", mv("e2e4")).unwrap_err(),
        GameError::NotStarted
    );

    assert_eq!(h.service.join_room(&id, "bob").unwrap(), Side::Black);
    assert_eq!(
        h.service.join_room(&id, "carol").unwrap_err(),
        GameError::RoomFull
    );
    assert_eq!(
        h.service.snapshot(&id).unwrap().state,
        SessionState::InProgress
    );
    h.service.submit_move(&id, "alice", mv("e2e4")).unwrap();
}

#[test]
fn test_legal_moves_only_for_the_player_to_move() {
    let h = default_harness();
    let id = h.service.create_game("alice", "bob").unwrap();
    assert_eq!(h.service.legal_moves(&id, "alice").unwrap().len(), 20);
    assert_eq!(
        h.service.legal_moves(&id, "bob").unwrap_err(),
        GameError::NotYourTurn
    );
    assert!(matches!(
        h.service.legal_moves(&id, "eve").unwrap_err(),
        GameError::NotAParticipant(_)
    ));
}

#[test]
fn test_concurrent_moves_on_one_room() {
    let h = default_harness();
    let id = h.service.create_game("alice", "bob").unwrap();

    let results: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| h.service.submit_move(&id, "alice", mv("e2e4"))))
            .collect();
        handles.into_iter().map(|t| t.join().unwrap()).collect()
    });

    let accepted = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(accepted, 1);
    assert!(
        results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| *e == GameError::NotYourTurn)
    );
    assert_eq!(h.service.snapshot(&id).unwrap().ply, 1);
}

#[test]
fn test_racing_players_keep_event_order() {
    let h = default_harness();
    for _ in 0..200 {
        let id = h.service.create_game("alice", "bob").unwrap();
        std::thread::scope(|scope| {
            scope.spawn(|| {
                while h.service.submit_move(&id, "bob", mv("e7e5")).is_err() {
                    std::thread::yield_now();
                }
            });
            scope.spawn(|| h.service.submit_move(&id, "alice", mv("e2e4")).unwrap());
        });

        h.service.events().flush().unwrap();
        let delivered: Vec<Move> = h
            .sink
            .events_for(&id)
            .iter()
            .filter(|e| e.kind == EventKind::Move)
            .filter_map(|e| e.mv)
            .collect();
        let history = h.service.registry().get(&id).unwrap().history().to_vec();
        assert_eq!(history, vec![mv("e2e4"), mv("e7e5")]);
        assert_eq!(delivered, history);
        h.service.delete_room(&id).unwrap();
    }
}

#[test]
fn test_computer_turn_on_deleted_room() {
    let h = default_harness();
    let id = h
        .service
        .create_selfplay_game(Difficulty::Easy, Difficulty::Easy)
        .unwrap();
    assert!(h.service.play_computer_turn(&id).unwrap().is_some());
    h.service.delete_room(&id).unwrap();
    assert!(matches!(
        h.service.play_computer_turn(&id).unwrap_err(),
        GameError::NotFound(_)
    ));
}

#[test]
fn test_computer_turn_is_a_no_op_for_humans() {
    let h = default_harness();
    let id = h.service.create_game("alice", "bob").unwrap();
    assert_eq!(h.service.play_computer_turn(&id).unwrap(), None);
    assert_eq!(h.service.snapshot(&id).unwrap().ply, 0);
}

#[test]
fn test_selfplay_runs_to_completion_or_limit() {
    let h = default_harness();
    let id = h
        .service
        .create_selfplay_game(Difficulty::Easy, Difficulty::Medium)
        .unwrap();
    let mut plies = 0;
    while plies < 40 {
        match h.service.play_computer_turn(&id).unwrap() {
            Some(_) => plies += 1,
            None => break,
        }
    }
    let snapshot = h.service.snapshot(&id).unwrap();
    assert_eq!(snapshot.ply, plies);
    assert!(plies == 40 || snapshot.state.is_terminal());
}

#[test]
fn test_analyze_rejects_bad_notation() {
    let h = default_harness();
    assert!(h.service.analyze("nonsense").is_err());
    let report = h
        .service
        .analyze("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1")
        .unwrap();
    assert_eq!(report.side_to_move, Side::White);
}
