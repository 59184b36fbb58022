//! Static position evaluation.

use super::tables::piece_square_value;
use crate::chess::{MoveRules, PieceKind, Position, PositionStatus, Side, Square};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::trace;

/// Weights applied to each evaluation term.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvalWeights {
    /// Multiplier on the material balance (pieces in pawn units).
    pub material: f64,
    /// Multiplier on piece-square table values.
    pub placement: f64,
    /// Penalty per extra pawn on a file.
    pub doubled_pawn: f64,
    /// Bonus per pawn sheltering the king.
    pub pawn_shield: f64,
    /// Penalty per file next to the king without a friendly pawn.
    pub open_file: f64,
    /// Value of one extra legal move.
    pub mobility: f64,
}

impl Default for EvalWeights {
    fn default() -> Self {
        Self {
            material: 1.0,
            placement: 0.1,
            doubled_pawn: 0.5,
            pawn_shield: 0.2,
            open_file: 0.25,
            mobility: 0.05,
        }
    }
}

/// Per-term breakdown of a static evaluation.
///
/// Every term is from the side to move's perspective, and `total` is their
/// sum, except for checkmate where `total` is negative infinity.
#[derive(Debug, Clone, Copy, PartialEq, Default, Getters, Serialize)]
pub struct Evaluation {
    material: f64,
    placement: f64,
    pawn_structure: f64,
    king_safety: f64,
    mobility: f64,
    total: f64,
}

/// Heuristic position evaluator.
///
/// Scores are always relative to the side to move: positive favours the
/// mover. A mated mover scores `f64::NEG_INFINITY`; stalemate and rule draws
/// score zero.
#[derive(Debug, Clone)]
pub struct Evaluator {
    rules: Arc<dyn MoveRules>,
    weights: EvalWeights,
}

impl Evaluator {
    /// Evaluator with default weights.
    pub fn new(rules: Arc<dyn MoveRules>) -> Self {
        Self::with_weights(rules, EvalWeights::default())
    }

    /// Evaluator with custom weights.
    pub fn with_weights(rules: Arc<dyn MoveRules>, weights: EvalWeights) -> Self {
        Self { rules, weights }
    }

    /// Weights in use.
    pub fn weights(&self) -> &EvalWeights {
        &self.weights
    }

    /// Score of `position` for the side to move.
    pub fn evaluate(&self, position: &Position) -> f64 {
        self.breakdown(position).total
    }

    /// Score with each term reported separately.
    pub fn breakdown(&self, position: &Position) -> Evaluation {
        let status = self.rules.status(position);
        match status {
            PositionStatus::Checkmate => {
                return Evaluation {
                    total: f64::NEG_INFINITY,
                    ..Evaluation::default()
                };
            }
            PositionStatus::Stalemate | PositionStatus::Draw(_) => return Evaluation::default(),
            PositionStatus::Normal | PositionStatus::Check => {}
        }

        let sign = match position.side_to_move() {
            Side::White => 1.0,
            Side::Black => -1.0,
        };
        let w = &self.weights;

        let material = sign * w.material * material_balance(position);
        let placement = sign * w.placement * placement_balance(position);
        let pawn_structure = sign
            * w.doubled_pawn
            * (doubled_pawns(position, Side::Black) - doubled_pawns(position, Side::White)) as f64;
        let king_safety = sign
            * (self.king_safety(position, Side::White) - self.king_safety(position, Side::Black));
        let mobility = if status.is_check() {
            0.0
        } else {
            self.mobility(position)
        };

        let total = material + placement + pawn_structure + king_safety + mobility;
        trace!(fen = %position, total, "Evaluated position");
        Evaluation {
            material,
            placement,
            pawn_structure,
            king_safety,
            mobility,
            total,
        }
    }

    fn king_safety(&self, position: &Position, side: Side) -> f64 {
        let Some(king) = position.king_square(side) else {
            return 0.0;
        };
        let (shield, open) = shelter(position, side, king);
        self.weights.pawn_shield * shield as f64 - self.weights.open_file * open as f64
    }

    fn mobility(&self, position: &Position) -> f64 {
        let Some(passed) = self.rules.null_move(position) else {
            return 0.0;
        };
        let own = self.rules.legal_moves(position).len() as f64;
        let theirs = self.rules.legal_moves(&passed).len() as f64;
        self.weights.mobility * (own - theirs)
    }
}

fn material_balance(position: &Position) -> f64 {
    position
        .pieces()
        .map(|(_, piece)| match piece.side {
            Side::White => piece.kind.value(),
            Side::Black => -piece.kind.value(),
        })
        .sum()
}

fn placement_balance(position: &Position) -> f64 {
    position
        .pieces()
        .map(|(sq, piece)| {
            let value = piece_square_value(piece.kind, piece.side, sq);
            match piece.side {
                Side::White => value,
                Side::Black => -value,
            }
        })
        .sum()
}

/// Extra pawns stacked on a file, summed over all files.
fn doubled_pawns(position: &Position, side: Side) -> u32 {
    let mut per_file = [0u32; 8];
    for (sq, piece) in position.pieces() {
        if piece.is_pawn_of(side) {
            per_file[sq.file() as usize] += 1;
        }
    }
    per_file.iter().map(|n| n.saturating_sub(1)).sum()
}

/// Pawns directly in front of the king (two ranks deep, adjacent files) and
/// adjacent files holding no friendly pawn at all.
fn shelter(position: &Position, side: Side, king: Square) -> (u32, u32) {
    let forward: i8 = match side {
        Side::White => 1,
        Side::Black => -1,
    };
    let mut shield = 0;
    let mut open = 0;

    for df in -1i8..=1 {
        let file = king.file() as i8 + df;
        if !(0..8).contains(&file) {
            continue;
        }
        for step in 1..=2 {
            let rank = king.rank() as i8 + forward * step;
            let friendly_pawn = u8::try_from(rank)
                .ok()
                .and_then(|r| Square::new(file as u8, r))
                .and_then(|sq| position.piece_at(sq))
                .is_some_and(|p| p.is_pawn_of(side));
            if friendly_pawn {
                shield += 1;
            }
        }
        let file_has_pawn = (0..8u8)
            .filter_map(|r| Square::new(file as u8, r))
            .filter_map(|sq| position.piece_at(sq))
            .any(|p| p.kind == PieceKind::Pawn && p.side == side);
        if !file_has_pawn {
            open += 1;
        }
    }
    (shield, open)
}
