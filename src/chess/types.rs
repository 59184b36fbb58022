//! Core domain types for chess: sides, pieces, squares and moves.

use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Side in the game.
///
/// `White` is always the first mover, `Black` the second.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Side {
    /// First mover.
    White,
    /// Second mover.
    Black,
}

impl Side {
    /// Returns the opposing side.
    pub fn opponent(self) -> Self {
        match self {
            Side::White => Side::Black,
            Side::Black => Side::White,
        }
    }

    /// Seat index of this side in an ordered player pair.
    pub fn index(self) -> usize {
        match self {
            Side::White => 0,
            Side::Black => 1,
        }
    }

    /// Rank (0-7) on which this side's pawns promote.
    pub fn promotion_rank(self) -> u8 {
        match self {
            Side::White => 7,
            Side::Black => 0,
        }
    }

    /// Rank (0-7) on which this side's king starts.
    pub fn back_rank(self) -> u8 {
        match self {
            Side::White => 0,
            Side::Black => 7,
        }
    }
}

/// Kind of chess piece.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PieceKind {
    /// Pawn.
    Pawn,
    /// Knight.
    Knight,
    /// Bishop.
    Bishop,
    /// Rook.
    Rook,
    /// Queen.
    Queen,
    /// King.
    King,
}

impl PieceKind {
    /// Standard material value in pawns. The king carries no material value.
    pub fn value(self) -> f64 {
        match self {
            PieceKind::Pawn => 1.0,
            PieceKind::Knight | PieceKind::Bishop => 3.0,
            PieceKind::Rook => 5.0,
            PieceKind::Queen => 9.0,
            PieceKind::King => 0.0,
        }
    }

    /// Lowercase letter used in UCI promotion suffixes and FEN (black pieces).
    pub fn letter(self) -> char {
        match self {
            PieceKind::Pawn => 'p',
            PieceKind::Knight => 'n',
            PieceKind::Bishop => 'b',
            PieceKind::Rook => 'r',
            PieceKind::Queen => 'q',
            PieceKind::King => 'k',
        }
    }

    /// Parses a piece letter, case-insensitively.
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter.to_ascii_lowercase() {
            'p' => Some(PieceKind::Pawn),
            'n' => Some(PieceKind::Knight),
            'b' => Some(PieceKind::Bishop),
            'r' => Some(PieceKind::Rook),
            'q' => Some(PieceKind::Queen),
            'k' => Some(PieceKind::King),
            _ => None,
        }
    }

    /// Whether a pawn may promote to this kind.
    pub fn is_promotion_target(self) -> bool {
        matches!(
            self,
            PieceKind::Knight | PieceKind::Bishop | PieceKind::Rook | PieceKind::Queen
        )
    }
}

/// A piece on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_new::new)]
pub struct Piece {
    /// What kind of piece.
    pub kind: PieceKind,
    /// Which side owns it.
    pub side: Side,
}

impl Piece {
    /// Returns true if this is a pawn of the given side.
    pub fn is_pawn_of(&self, side: Side) -> bool {
        self.kind == PieceKind::Pawn && self.side == side
    }
}

/// Error parsing square or move notation.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
#[display("invalid notation: {input}")]
pub struct NotationError {
    /// The rejected input.
    pub input: String,
}

impl NotationError {
    fn new(input: &str) -> Self {
        Self {
            input: input.to_string(),
        }
    }
}

/// A square on the 8x8 board.
///
/// Stored as `rank * 8 + file`, so `a1` is 0 and `h8` is 63.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Square(u8);

impl Square {
    /// Creates a square from file (0-7, a-h) and rank (0-7, 1-8).
    pub const fn new(file: u8, rank: u8) -> Option<Self> {
        if file < 8 && rank < 8 {
            Some(Self(rank * 8 + file))
        } else {
            None
        }
    }

    /// Creates a square from its 0-63 index.
    pub const fn from_index(index: u8) -> Option<Self> {
        if index < 64 { Some(Self(index)) } else { None }
    }

    /// All 64 squares, a1 first.
    pub fn all() -> impl Iterator<Item = Square> {
        (0u8..64).map(Square)
    }

    /// File (0-7).
    pub const fn file(self) -> u8 {
        self.0 % 8
    }

    /// Rank (0-7).
    pub const fn rank(self) -> u8 {
        self.0 / 8
    }

    /// Index 0-63.
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for Square {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let file = (b'a' + self.file()) as char;
        let rank = (b'1' + self.rank()) as char;
        write!(f, "{file}{rank}")
    }
}

impl FromStr for Square {
    type Err = NotationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.len() != 2 {
            return Err(NotationError::new(s));
        }
        let file = bytes[0].wrapping_sub(b'a');
        let rank = bytes[1].wrapping_sub(b'1');
        Square::new(file, rank).ok_or_else(|| NotationError::new(s))
    }
}

impl TryFrom<String> for Square {
    type Error = NotationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Square> for String {
    fn from(square: Square) -> Self {
        square.to_string()
    }
}

/// Which wing a castle goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CastleSide {
    /// Short castle, king to the g-file.
    KingSide,
    /// Long castle, king to the c-file.
    QueenSide,
}

/// Remaining castling rights for both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CastlingRights {
    /// White may still castle short.
    pub white_king_side: bool,
    /// White may still castle long.
    pub white_queen_side: bool,
    /// Black may still castle short.
    pub black_king_side: bool,
    /// Black may still castle long.
    pub black_queen_side: bool,
}

impl CastlingRights {
    /// Whether `side` still holds the right to castle towards `wing`.
    pub fn has(&self, side: Side, wing: CastleSide) -> bool {
        match (side, wing) {
            (Side::White, CastleSide::KingSide) => self.white_king_side,
            (Side::White, CastleSide::QueenSide) => self.white_queen_side,
            (Side::Black, CastleSide::KingSide) => self.black_king_side,
            (Side::Black, CastleSide::QueenSide) => self.black_queen_side,
        }
    }

    /// Sets a single right.
    pub fn set(&mut self, side: Side, wing: CastleSide, allowed: bool) {
        match (side, wing) {
            (Side::White, CastleSide::KingSide) => self.white_king_side = allowed,
            (Side::White, CastleSide::QueenSide) => self.white_queen_side = allowed,
            (Side::Black, CastleSide::KingSide) => self.black_king_side = allowed,
            (Side::Black, CastleSide::QueenSide) => self.black_queen_side = allowed,
        }
    }
}

/// A move request: origin, destination and optional promotion piece.
///
/// Capture, castle, en-passant and check tags are derived from positions,
/// never stored on the move. Castles are written king-from/king-to
/// (`e1g1`), the way UCI does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Move {
    /// Origin square.
    pub from: Square,
    /// Destination square.
    pub to: Square,
    /// Piece a pawn promotes to, if any.
    pub promotion: Option<PieceKind>,
}

impl Move {
    /// Creates a non-promoting move.
    pub fn new(from: Square, to: Square) -> Self {
        Self {
            from,
            to,
            promotion: None,
        }
    }

    /// Creates a promoting move.
    pub fn with_promotion(from: Square, to: Square, promotion: PieceKind) -> Self {
        Self {
            from,
            to,
            promotion: Some(promotion),
        }
    }

    /// Parses UCI long algebraic notation such as `e2e4` or `e7e8q`.
    pub fn from_uci(uci: &str) -> Result<Self, NotationError> {
        uci.parse()
    }

    /// Absolute file distance travelled.
    pub fn file_distance(&self) -> u8 {
        self.from.file().abs_diff(self.to.file())
    }

    /// Absolute rank distance travelled.
    pub fn rank_distance(&self) -> u8 {
        self.from.rank().abs_diff(self.to.rank())
    }
}

impl std::fmt::Display for Move {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if let Some(kind) = self.promotion {
            write!(f, "{}", kind.letter())?;
        }
        Ok(())
    }
}

impl FromStr for Move {
    type Err = NotationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if !s.is_ascii() || !(4..=5).contains(&s.len()) {
            return Err(NotationError::new(s));
        }
        let from: Square = s[0..2].parse().map_err(|_| NotationError::new(s))?;
        let to: Square = s[2..4].parse().map_err(|_| NotationError::new(s))?;
        let promotion = match s[4..].chars().next() {
            None => None,
            Some(letter) => match PieceKind::from_letter(letter) {
                Some(kind) if kind.is_promotion_target() => Some(kind),
                _ => return Err(NotationError::new(s)),
            },
        };
        Ok(Self {
            from,
            to,
            promotion,
        })
    }
}

impl TryFrom<String> for Move {
    type Error = NotationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Move> for String {
    fn from(mv: Move) -> Self {
        mv.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_notation() {
        let e4: Square = "e4".parse().unwrap();
        assert_eq!(e4.file(), 4);
        assert_eq!(e4.rank(), 3);
        assert_eq!(e4.to_string(), "e4");
        assert!("i9".parse::<Square>().is_err());
        assert!("e".parse::<Square>().is_err());
    }

    #[test]
    fn test_move_uci_with_promotion() {
        let mv = Move::from_uci("e7e8q").unwrap();
        assert_eq!(mv.promotion, Some(PieceKind::Queen));
        assert_eq!(mv.to_string(), "e7e8q");
        assert!(Move::from_uci("e7e8k").is_err());
        assert!(Move::from_uci("e7").is_err());
    }

    #[test]
    fn test_castling_rights_set_and_has() {
        let mut rights = CastlingRights::default();
        assert!(!rights.has(Side::Black, CastleSide::QueenSide));
        rights.set(Side::Black, CastleSide::QueenSide, true);
        assert!(rights.has(Side::Black, CastleSide::QueenSide));
        assert!(!rights.has(Side::White, CastleSide::QueenSide));
    }
}
