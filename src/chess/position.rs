//! Immutable board snapshots.

use super::types::{CastlingRights, Piece, PieceKind, Side, Square};
use serde::{Deserialize, Serialize};

/// A full board snapshot.
///
/// Positions are produced by a [`MoveRules`](super::MoveRules) oracle and
/// never mutated afterwards: applying a move yields a fresh snapshot. The
/// canonical key (FEN) is fixed at construction and doubles as the cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    board: Vec<Option<Piece>>,
    side_to_move: Side,
    castling: CastlingRights,
    en_passant: Option<Square>,
    halfmove_clock: u32,
    fullmove_number: u32,
    key: String,
}

impl Position {
    /// Assembles a snapshot. Intended for oracle implementations, which are
    /// responsible for `key` being the canonical encoding of the other parts.
    pub fn from_parts(
        board: [Option<Piece>; 64],
        side_to_move: Side,
        castling: CastlingRights,
        en_passant: Option<Square>,
        halfmove_clock: u32,
        fullmove_number: u32,
        key: String,
    ) -> Self {
        Self {
            board: board.to_vec(),
            side_to_move,
            castling,
            en_passant,
            halfmove_clock,
            fullmove_number,
            key,
        }
    }

    /// Piece on the given square.
    pub fn piece_at(&self, square: Square) -> Option<Piece> {
        self.board.get(square.index()).copied().flatten()
    }

    /// Occupied squares with their pieces, a1 first.
    pub fn pieces(&self) -> impl Iterator<Item = (Square, Piece)> + '_ {
        Square::all().filter_map(|sq| self.piece_at(sq).map(|piece| (sq, piece)))
    }

    /// Square of the given side's king.
    pub fn king_square(&self, side: Side) -> Option<Square> {
        self.pieces()
            .find(|(_, piece)| piece.kind == PieceKind::King && piece.side == side)
            .map(|(sq, _)| sq)
    }

    /// Side to move.
    pub fn side_to_move(&self) -> Side {
        self.side_to_move
    }

    /// Castling rights still available.
    pub fn castling(&self) -> CastlingRights {
        self.castling
    }

    /// En-passant target square, if an en-passant capture is available.
    pub fn en_passant(&self) -> Option<Square> {
        self.en_passant
    }

    /// Half-moves since the last capture or pawn move.
    pub fn halfmove_clock(&self) -> u32 {
        self.halfmove_clock
    }

    /// Full-move number, starting at 1.
    pub fn fullmove_number(&self) -> u32 {
        self.fullmove_number
    }

    /// Canonical key (FEN).
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Key with move counters stripped; equal for repeated positions.
    pub fn repetition_key(&self) -> &str {
        match self.key.match_indices(' ').nth(3) {
            Some((idx, _)) => &self.key[..idx],
            None => &self.key,
        }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.key)
    }
}
