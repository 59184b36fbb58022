//! Tests for computer move selection.

use chess_rooms::{
    Difficulty, EngineMetrics, GameError, MAX_DEPTH, ManualClock, Move, MoveRules, PositionCache,
    SearchEngine, ShakmatyRules,
};
use chrono::TimeDelta;
use std::sync::Arc;

fn rules() -> Arc<dyn MoveRules> {
    Arc::new(ShakmatyRules::new())
}

fn cache() -> Arc<PositionCache> {
    Arc::new(PositionCache::new(
        TimeDelta::hours(1),
        10_000,
        Arc::new(ManualClock::starting_now()),
        EngineMetrics::unregistered(),
    ))
}

fn mv(uci: &str) -> Move {
    uci.parse().unwrap()
}

#[test]
fn test_no_legal_moves_is_reported() {
    let rules = rules();
    let engine = SearchEngine::new(Arc::clone(&rules), 3);
    let mated = rules
        .parse("rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3")
        .unwrap();
    for difficulty in [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard] {
        assert_eq!(
            engine.best_move(&mated, difficulty),
            Err(GameError::NoLegalMoves)
        );
    }
}

#[test]
fn test_hard_finds_back_rank_mate() {
    let rules = rules();
    let engine = SearchEngine::new(Arc::clone(&rules), 3);
    let pos = rules.parse("6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1").unwrap();
    let result = engine.search(&pos, 3).unwrap();
    assert_eq!(result.best_move, mv("a1a8"));
    assert_eq!(result.score, f64::INFINITY);
}

#[test]
fn test_medium_takes_hanging_queen() {
    let rules = rules();
    let engine = SearchEngine::new(Arc::clone(&rules), 3);
    let pos = rules.parse("4k3/8/8/3q4/8/8/8/3RK3 w - - 0 1").unwrap();
    assert_eq!(engine.best_move(&pos, Difficulty::Medium).unwrap(), mv("d1d5"));
}

#[test]
fn test_hard_takes_hanging_queen() {
    let rules = rules();
    let engine = SearchEngine::new(Arc::clone(&rules), 2);
    let pos = rules.parse("4k3/8/8/3q4/8/8/8/3RK3 w - - 0 1").unwrap();
    assert_eq!(engine.best_move(&pos, Difficulty::Hard).unwrap(), mv("d1d5"));
}

#[test]
fn test_search_is_deterministic() {
    let rules = rules();
    let engine = SearchEngine::new(Arc::clone(&rules), 2);
    let pos = rules
        .parse("r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq - 2 3")
        .unwrap();
    let first = engine.search(&pos, 2).unwrap();
    let second = engine.search(&pos, 2).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_cache_does_not_change_results() {
    let rules = rules();
    let pos = rules
        .parse("r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq - 2 3")
        .unwrap();

    let plain = SearchEngine::new(Arc::clone(&rules), 2);
    let cache = cache();
    let cached = SearchEngine::new(Arc::clone(&rules), 2).with_cache(Arc::clone(&cache));

    let expected = plain.best_move(&pos, Difficulty::Hard).unwrap();
    // Cold cache, then warm cache.
    assert_eq!(cached.best_move(&pos, Difficulty::Hard).unwrap(), expected);
    assert!(!cache.is_empty());
    assert_eq!(cached.best_move(&pos, Difficulty::Hard).unwrap(), expected);

    assert_eq!(
        cached.best_move(&pos, Difficulty::Medium).unwrap(),
        plain.best_move(&pos, Difficulty::Medium).unwrap()
    );
}

#[test]
fn test_easy_picks_a_legal_move() {
    let rules = rules();
    let engine = SearchEngine::new(Arc::clone(&rules), 3).with_seed(7);
    let start = rules.initial_position();
    let legal = rules.legal_moves(&start);
    for _ in 0..20 {
        let chosen = engine.best_move(&start, Difficulty::Easy).unwrap();
        assert!(legal.contains(&chosen));
    }
}

#[test]
fn test_easy_is_reproducible_with_a_seed() {
    let rules = rules();
    let start = rules.initial_position();
    let a = SearchEngine::new(Arc::clone(&rules), 3).with_seed(42);
    let b = SearchEngine::new(Arc::clone(&rules), 3).with_seed(42);
    let picks_a: Vec<_> = (0..10)
        .map(|_| a.best_move(&start, Difficulty::Easy).unwrap())
        .collect();
    let picks_b: Vec<_> = (0..10)
        .map(|_| b.best_move(&start, Difficulty::Easy).unwrap())
        .collect();
    assert_eq!(picks_a, picks_b);
}

#[test]
fn test_single_legal_move_is_returned() {
    let rules = rules();
    let engine = SearchEngine::new(Arc::clone(&rules), 3);
    // The rook holds the b-file, so the king can only step to a7.
    let pos = rules.parse("k7/8/8/8/8/8/8/1R5K b - - 0 1").unwrap();
    let legal = rules.legal_moves(&pos);
    assert_eq!(legal, vec![mv("a8a7")]);
    assert_eq!(engine.best_move(&pos, Difficulty::Hard).unwrap(), legal[0]);
}

#[test]
fn test_difficulty_parses_from_text() {
    assert_eq!("hard".parse::<Difficulty>().unwrap(), Difficulty::Hard);
    assert_eq!("Easy".parse::<Difficulty>().unwrap(), Difficulty::Easy);
    assert_eq!(Difficulty::default(), Difficulty::Medium);
    assert_eq!(Difficulty::Medium.to_string(), "medium");
}

#[test]
fn test_depth_is_capped() {
    assert_eq!(SearchEngine::new(rules(), 12).depth(), MAX_DEPTH);
    assert_eq!(SearchEngine::new(rules(), 0).depth(), 1);
}
