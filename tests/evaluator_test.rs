//! Tests for the static evaluator and position analyzer.

use chess_rooms::{
    Advice, Evaluator, MoveRules, PieceKind, PositionAnalyzer, PositionStatus, ShakmatyRules, Side,
    piece_square_value,
};
use std::sync::Arc;

fn rules() -> Arc<dyn MoveRules> {
    Arc::new(ShakmatyRules::new())
}

#[test]
fn test_start_position_is_balanced() {
    let rules = rules();
    let evaluator = Evaluator::new(Arc::clone(&rules));
    let score = evaluator.evaluate(&rules.initial_position());
    assert!(score.abs() < 1e-9, "start position scored {score}");
}

#[test]
fn test_score_is_relative_to_side_to_move() {
    let rules = rules();
    let evaluator = Evaluator::new(Arc::clone(&rules));
    // White is a queen up.
    let white_to_move = rules.parse("3qk3/8/8/8/8/8/8/2QQK3 w - - 0 1").unwrap();
    let black_to_move = rules.parse("3qk3/8/8/8/8/8/8/2QQK3 b - - 0 1").unwrap();

    let for_white = evaluator.evaluate(&white_to_move);
    let for_black = evaluator.evaluate(&black_to_move);
    assert!(for_white > 5.0, "white should be clearly better: {for_white}");
    assert!(for_black < -5.0, "black should be clearly worse: {for_black}");
}

#[test]
fn test_material_term_uses_standard_values() {
    let rules = rules();
    let evaluator = Evaluator::new(Arc::clone(&rules));
    let pos = rules.parse("4k3/8/8/8/8/8/8/R3K3 w - - 0 1").unwrap();
    let breakdown = evaluator.breakdown(&pos);
    assert_eq!(*breakdown.material(), PieceKind::Rook.value());
    assert_eq!(PieceKind::Queen.value(), 9.0);
    assert_eq!(PieceKind::King.value(), 0.0);
}

#[test]
fn test_breakdown_terms_sum_to_total() {
    let rules = rules();
    let evaluator = Evaluator::new(Arc::clone(&rules));
    let pos = rules
        .parse("r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq - 2 3")
        .unwrap();
    let e = evaluator.breakdown(&pos);
    let sum = e.material() + e.placement() + e.pawn_structure() + e.king_safety() + e.mobility();
    assert!((sum - e.total()).abs() < 1e-9);
}

#[test]
fn test_doubled_pawns_are_penalised() {
    let rules = rules();
    let evaluator = Evaluator::new(Arc::clone(&rules));
    let doubled = rules.parse("4k3/8/8/8/8/4P3/4P3/4K3 w - - 0 1").unwrap();
    let e = evaluator.breakdown(&doubled);
    assert!(*e.pawn_structure() < 0.0);
}

#[test]
fn test_checkmated_side_scores_negative_infinity() {
    let rules = rules();
    let evaluator = Evaluator::new(Arc::clone(&rules));
    let mated = rules
        .parse("rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3")
        .unwrap();
    assert_eq!(evaluator.evaluate(&mated), f64::NEG_INFINITY);
}

#[test]
fn test_stalemate_and_draws_score_zero() {
    let rules = rules();
    let evaluator = Evaluator::new(Arc::clone(&rules));
    let stalemate = rules.parse("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").unwrap();
    assert_eq!(evaluator.evaluate(&stalemate), 0.0);
    let bare = rules.parse("8/8/4k3/8/8/4K3/8/8 w - - 0 1").unwrap();
    assert_eq!(evaluator.evaluate(&bare), 0.0);
}

#[test]
fn test_mobility_skipped_when_in_check() {
    let rules = rules();
    let evaluator = Evaluator::new(Arc::clone(&rules));
    let checked = rules.parse("4k3/8/8/8/8/8/8/4RK2 b - - 0 1").unwrap();
    assert_eq!(*evaluator.breakdown(&checked).mobility(), 0.0);
}

#[test]
fn test_piece_square_tables_favour_centre_knights() {
    let centre = piece_square_value(PieceKind::Knight, Side::White, "e4".parse().unwrap());
    let corner = piece_square_value(PieceKind::Knight, Side::White, "a1".parse().unwrap());
    assert!(centre > corner);
}

#[test]
fn test_analyzer_reports_mate_without_advice() {
    let rules = rules();
    let analyzer = PositionAnalyzer::new(Arc::clone(&rules));
    let mated = rules
        .parse("rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3")
        .unwrap();
    let report = analyzer.analyze(&mated);
    assert_eq!(report.status, PositionStatus::Checkmate);
    assert!(report.advice.is_none());
    assert_eq!(report.to_string(), "Checkmate. black wins.");
}

#[test]
fn test_analyzer_advises_the_side_ahead() {
    let rules = rules();
    let analyzer = PositionAnalyzer::new(Arc::clone(&rules));
    let ahead = rules.parse("3qk3/8/8/8/8/8/8/2QQK3 w - - 0 1").unwrap();
    let behind = rules.parse("3qk3/8/8/8/8/8/8/2QQK3 b - - 0 1").unwrap();
    let level = rules.initial_position();

    assert_eq!(analyzer.analyze(&ahead).advice, Some(Advice::PressAdvantage));
    assert_eq!(analyzer.analyze(&behind).advice, Some(Advice::SeekCounterplay));
    assert_eq!(analyzer.analyze(&level).advice, Some(Advice::ImprovePieces));

    let text = analyzer.analyze(&level).to_string();
    assert!(text.contains("Evaluation: 0.00"));
    assert!(text.contains("Plan:"));
}
