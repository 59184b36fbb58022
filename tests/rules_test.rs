//! Tests for the shakmaty-backed rules oracle.

use chess_rooms::{
    DrawRule, Move, MoveRules, PieceKind, PositionStatus, RulesError, ShakmatyRules, Side, Square,
};

fn mv(uci: &str) -> Move {
    uci.parse().unwrap()
}

fn play(rules: &ShakmatyRules, moves: &[&str]) -> chess_rooms::Position {
    moves.iter().fold(rules.initial_position(), |pos, uci| {
        rules.apply(&pos, &mv(uci)).unwrap()
    })
}

#[test]
fn test_initial_position_has_twenty_moves() {
    let rules = ShakmatyRules::new();
    let start = rules.initial_position();
    assert_eq!(start.side_to_move(), Side::White);
    assert_eq!(rules.legal_moves(&start).len(), 20);
    assert_eq!(rules.status(&start), PositionStatus::Normal);
    assert_eq!(
        rules.serialize(&start),
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1"
    );
}

#[test]
fn test_apply_returns_fresh_snapshot() {
    let rules = ShakmatyRules::new();
    let start = rules.initial_position();
    let after = rules.apply(&start, &mv("e2e4")).unwrap();

    assert_eq!(after.side_to_move(), Side::Black);
    assert_eq!(start.side_to_move(), Side::White);
    let e4: Square = "e4".parse().unwrap();
    assert_eq!(after.piece_at(e4).map(|p| p.kind), Some(PieceKind::Pawn));
    assert!(start.piece_at(e4).is_none());
}

#[test]
fn test_apply_rejects_illegal_move() {
    let rules = ShakmatyRules::new();
    let start = rules.initial_position();
    let err = rules.apply(&start, &mv("e2e5")).unwrap_err();
    assert!(matches!(err, RulesError::IllegalMove(_)));
}

#[test]
fn test_fools_mate_is_checkmate() {
    let rules = ShakmatyRules::new();
    let pos = play(&rules, &["f2f3", "e7e5", "g2g4", "d8h4"]);
    assert_eq!(rules.status(&pos), PositionStatus::Checkmate);
    assert!(rules.legal_moves(&pos).is_empty());
}

#[test]
fn test_stalemate_detected() {
    let rules = ShakmatyRules::new();
    let pos = rules.parse("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").unwrap();
    assert_eq!(rules.status(&pos), PositionStatus::Stalemate);
}

#[test]
fn test_draw_rules_detected() {
    let rules = ShakmatyRules::new();
    let bare = rules.parse("8/8/4k3/8/8/4K3/8/8 w - - 0 1").unwrap();
    assert_eq!(
        rules.status(&bare),
        PositionStatus::Draw(DrawRule::InsufficientMaterial)
    );

    let fifty = rules.parse("4k3/8/8/8/8/8/R7/4K3 w - - 100 80").unwrap();
    assert_eq!(rules.status(&fifty), PositionStatus::Draw(DrawRule::FiftyMoves));
}

#[test]
fn test_check_status() {
    let rules = ShakmatyRules::new();
    let pos = rules.parse("4k3/8/8/8/8/8/8/4RK2 b - - 0 1").unwrap();
    assert_eq!(rules.status(&pos), PositionStatus::Check);
    assert!(rules.status(&pos).is_check());
    assert!(!rules.status(&pos).is_terminal());
}

#[test]
fn test_null_move_unavailable_in_check() {
    let rules = ShakmatyRules::new();
    let checked = rules.parse("4k3/8/8/8/8/8/8/4RK2 b - - 0 1").unwrap();
    assert!(rules.null_move(&checked).is_none());

    let start = rules.initial_position();
    let passed = rules.null_move(&start).unwrap();
    assert_eq!(passed.side_to_move(), Side::Black);
}

#[test]
fn test_parse_rejects_garbage() {
    let rules = ShakmatyRules::new();
    assert!(matches!(
        rules.parse("not a position"),
        Err(RulesError::InvalidNotation(_))
    ));
}

#[test]
fn test_castling_and_en_passant_exposed() {
    let rules = ShakmatyRules::new();
    let pos = play(&rules, &["e2e4", "a7a6", "e4e5", "d7d5"]);
    assert_eq!(pos.en_passant(), Some("d6".parse().unwrap()));
    assert!(pos.castling().has(Side::White, chess_rooms::CastleSide::KingSide));
    assert!(rules.legal_moves(&pos).contains(&mv("e5d6")));
}

#[test]
fn test_repetition_key_ignores_counters() {
    let rules = ShakmatyRules::new();
    let start = rules.initial_position();
    let back = play(&rules, &["g1f3", "g8f6", "f3g1", "f6g8"]);
    assert_ne!(start.key(), back.key());
    assert_eq!(start.repetition_key(), back.repetition_key());
}
