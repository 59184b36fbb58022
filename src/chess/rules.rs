//! The move-rules oracle contract.

use super::position::Position;
use super::types::Move;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};

/// Why the oracle considers a position drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DrawRule {
    /// Neither side can mate.
    InsufficientMaterial,
    /// One hundred half-moves without a capture or pawn move.
    FiftyMoves,
}

/// Status of a position for the side to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionStatus {
    /// Play continues, side to move is not in check.
    Normal,
    /// Side to move is in check but has a reply.
    Check,
    /// Side to move is mated.
    Checkmate,
    /// Side to move has no legal move and is not in check.
    Stalemate,
    /// Drawn by rule.
    Draw(DrawRule),
}

impl PositionStatus {
    /// Whether the game cannot continue from this position.
    pub fn is_terminal(self) -> bool {
        !matches!(self, PositionStatus::Normal | PositionStatus::Check)
    }

    /// Whether the side to move is in check (including mate).
    pub fn is_check(self) -> bool {
        matches!(self, PositionStatus::Check | PositionStatus::Checkmate)
    }
}

/// Errors reported by an oracle.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum RulesError {
    /// Board notation could not be parsed.
    #[display("invalid position notation: {_0}")]
    InvalidNotation(#[error(not(source))] String),
    /// The move is not legal in the given position.
    #[display("illegal move: {_0}")]
    IllegalMove(#[error(not(source))] String),
}

/// Move legality, generation and game-end detection.
///
/// The engine treats implementations as a black box: every position it
/// handles comes out of [`parse`](MoveRules::parse),
/// [`initial_position`](MoveRules::initial_position) or
/// [`apply`](MoveRules::apply). Implementations must be pure: the same input
/// always yields the same output, including the order of
/// [`legal_moves`](MoveRules::legal_moves), which the search relies on for
/// tie-breaking.
pub trait MoveRules: Send + Sync + std::fmt::Debug {
    /// Standard starting position.
    fn initial_position(&self) -> Position;

    /// All legal moves for the side to move, in a stable order.
    fn legal_moves(&self, position: &Position) -> Vec<Move>;

    /// Applies a move, returning the resulting snapshot.
    fn apply(&self, position: &Position, mv: &Move) -> Result<Position, RulesError>;

    /// Check/mate/stalemate/draw status of the side to move.
    fn status(&self, position: &Position) -> PositionStatus;

    /// The same position with the other side to move, or `None` when passing
    /// is not representable (e.g. the side to move is in check).
    fn null_move(&self, position: &Position) -> Option<Position>;

    /// Canonical notation of a position.
    fn serialize(&self, position: &Position) -> String;

    /// Parses canonical notation.
    fn parse(&self, notation: &str) -> Result<Position, RulesError>;
}
