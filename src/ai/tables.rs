//! Piece-square tables.
//!
//! Tables are laid out the way a board is printed from White's side: the
//! first row is the eighth rank, a-file first. Values are in tenths of a pawn.

use crate::chess::{PieceKind, Side, Square};

#[rustfmt::skip]
const PAWN: [f64; 64] = [
     0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,
     5.0,  5.0,  5.0,  5.0,  5.0,  5.0,  5.0,  5.0,
     1.0,  1.0,  2.0,  3.0,  3.0,  2.0,  1.0,  1.0,
     0.5,  0.5,  1.0,  2.5,  2.5,  1.0,  0.5,  0.5,
     0.0,  0.0,  0.0,  2.0,  2.0,  0.0,  0.0,  0.0,
     0.5, -0.5, -1.0,  0.0,  0.0, -1.0, -0.5,  0.5,
     0.5,  1.0,  1.0, -2.0, -2.0,  1.0,  1.0,  0.5,
     0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,
];

#[rustfmt::skip]
const KNIGHT: [f64; 64] = [
    -5.0, -4.0, -3.0, -3.0, -3.0, -3.0, -4.0, -5.0,
    -4.0, -2.0,  0.0,  0.0,  0.0,  0.0, -2.0, -4.0,
    -3.0,  0.0,  1.0,  1.5,  1.5,  1.0,  0.0, -3.0,
    -3.0,  0.5,  1.5,  2.0,  2.0,  1.5,  0.5, -3.0,
    -3.0,  0.0,  1.5,  2.0,  2.0,  1.5,  0.0, -3.0,
    -3.0,  0.5,  1.0,  1.5,  1.5,  1.0,  0.5, -3.0,
    -4.0, -2.0,  0.0,  0.5,  0.5,  0.0, -2.0, -4.0,
    -5.0, -4.0, -3.0, -3.0, -3.0, -3.0, -4.0, -5.0,
];

#[rustfmt::skip]
const BISHOP: [f64; 64] = [
    -2.0, -1.0, -1.0, -1.0, -1.0, -1.0, -1.0, -2.0,
    -1.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0, -1.0,
    -1.0,  0.0,  0.5,  1.0,  1.0,  0.5,  0.0, -1.0,
    -1.0,  0.5,  0.5,  1.0,  1.0,  0.5,  0.5, -1.0,
    -1.0,  0.0,  1.0,  1.0,  1.0,  1.0,  0.0, -1.0,
    -1.0,  1.0,  1.0,  1.0,  1.0,  1.0,  1.0, -1.0,
    -1.0,  0.5,  0.0,  0.0,  0.0,  0.0,  0.5, -1.0,
    -2.0, -1.0, -1.0, -1.0, -1.0, -1.0, -1.0, -2.0,
];

#[rustfmt::skip]
const ROOK: [f64; 64] = [
     0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,
     0.5,  1.0,  1.0,  1.0,  1.0,  1.0,  1.0,  0.5,
    -0.5,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0, -0.5,
    -0.5,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0, -0.5,
    -0.5,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0, -0.5,
    -0.5,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0, -0.5,
    -0.5,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0, -0.5,
     0.0,  0.0,  0.0,  0.5,  0.5,  0.0,  0.0,  0.0,
];

#[rustfmt::skip]
const QUEEN: [f64; 64] = [
    -2.0, -1.0, -1.0, -0.5, -0.5, -1.0, -1.0, -2.0,
    -1.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0, -1.0,
    -1.0,  0.0,  0.5,  0.5,  0.5,  0.5,  0.0, -1.0,
    -0.5,  0.0,  0.5,  0.5,  0.5,  0.5,  0.0, -0.5,
     0.0,  0.0,  0.5,  0.5,  0.5,  0.5,  0.0, -0.5,
    -1.0,  0.5,  0.5,  0.5,  0.5,  0.5,  0.0, -1.0,
    -1.0,  0.0,  0.5,  0.0,  0.0,  0.0,  0.0, -1.0,
    -2.0, -1.0, -1.0, -0.5, -0.5, -1.0, -1.0, -2.0,
];

#[rustfmt::skip]
const KING: [f64; 64] = [
    -3.0, -4.0, -4.0, -5.0, -5.0, -4.0, -4.0, -3.0,
    -3.0, -4.0, -4.0, -5.0, -5.0, -4.0, -4.0, -3.0,
    -3.0, -4.0, -4.0, -5.0, -5.0, -4.0, -4.0, -3.0,
    -3.0, -4.0, -4.0, -5.0, -5.0, -4.0, -4.0, -3.0,
    -2.0, -3.0, -3.0, -4.0, -4.0, -3.0, -3.0, -2.0,
    -1.0, -2.0, -2.0, -2.0, -2.0, -2.0, -2.0, -1.0,
     2.0,  2.0,  0.0,  0.0,  0.0,  0.0,  2.0,  2.0,
     2.0,  3.0,  1.0,  0.0,  0.0,  1.0,  3.0,  2.0,
];

/// Table value for a piece of `side` standing on `square`.
///
/// Black reads the tables mirrored vertically.
pub fn piece_square_value(kind: PieceKind, side: Side, square: Square) -> f64 {
    let table = match kind {
        PieceKind::Pawn => &PAWN,
        PieceKind::Knight => &KNIGHT,
        PieceKind::Bishop => &BISHOP,
        PieceKind::Rook => &ROOK,
        PieceKind::Queen => &QUEEN,
        PieceKind::King => &KING,
    };
    let row = match side {
        Side::White => 7 - square.rank(),
        Side::Black => square.rank(),
    };
    table[row as usize * 8 + square.file() as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_are_mirrored_for_black() {
        let e2: Square = "e2".parse().unwrap();
        let e7: Square = "e7".parse().unwrap();
        assert_eq!(
            piece_square_value(PieceKind::Pawn, Side::White, e2),
            piece_square_value(PieceKind::Pawn, Side::Black, e7)
        );
        let g1: Square = "g1".parse().unwrap();
        assert_eq!(piece_square_value(PieceKind::King, Side::White, g1), 3.0);
    }
}
