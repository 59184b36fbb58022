//! Move-rules oracle backed by shakmaty.

use super::position::Position;
use super::rules::{DrawRule, MoveRules, PositionStatus, RulesError};
use super::types::{CastlingRights, CastleSide, Move, Piece, PieceKind, Side, Square};
use shakmaty::fen::Fen;
use shakmaty::uci::UciMove;
use shakmaty::{CastlingMode, Chess, EnPassantMode, Position as _};
use tracing::{instrument, warn};

/// Standard chess rules via the `shakmaty` crate.
///
/// Snapshots cross the boundary through FEN, so any position this oracle
/// hands out can be turned back into a `shakmaty::Chess` losslessly.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShakmatyRules;

impl ShakmatyRules {
    /// Creates the oracle.
    pub fn new() -> Self {
        Self
    }

    fn to_chess(&self, position: &Position) -> Result<Chess, RulesError> {
        let fen: Fen = position
            .key()
            .parse()
            .map_err(|e| RulesError::InvalidNotation(format!("{e}")))?;
        fen.into_position(CastlingMode::Standard)
            .map_err(|e| RulesError::InvalidNotation(format!("{e}")))
    }

    fn chess_or_log(&self, position: &Position) -> Option<Chess> {
        match self.to_chess(position) {
            Ok(chess) => Some(chess),
            Err(e) => {
                warn!(fen = %position.key(), error = %e, "Oracle received an unreadable position");
                None
            }
        }
    }

    fn snapshot(chess: &Chess) -> Position {
        let board = chess.board();
        let mut squares: [Option<Piece>; 64] = [None; 64];
        for (idx, slot) in squares.iter_mut().enumerate() {
            let sq = shakmaty::Square::new(idx as u32);
            *slot = board.piece_at(sq).map(|p| Piece::new(p.role.into(), p.color.into()));
        }

        let castles = chess.castles();
        let mut castling = CastlingRights::default();
        for side in [Side::White, Side::Black] {
            for wing in [CastleSide::KingSide, CastleSide::QueenSide] {
                castling.set(side, wing, castles.has(side.into(), wing.into()));
            }
        }

        let en_passant = chess
            .ep_square(EnPassantMode::Legal)
            .and_then(|sq| Square::from_index(sq as u8));
        let key = Fen::from_position(chess.clone(), EnPassantMode::Legal).to_string();

        Position::from_parts(
            squares,
            chess.turn().into(),
            castling,
            en_passant,
            chess.halfmoves(),
            chess.fullmoves().get(),
            key,
        )
    }

    fn to_uci(mv: &Move) -> UciMove {
        UciMove::Normal {
            from: shakmaty::Square::new(mv.from.index() as u32),
            to: shakmaty::Square::new(mv.to.index() as u32),
            promotion: mv.promotion.map(Into::into),
        }
    }

    fn from_shakmaty_move(m: &shakmaty::Move) -> Option<Move> {
        match UciMove::from_move(m, CastlingMode::Standard) {
            UciMove::Normal {
                from,
                to,
                promotion,
            } => Some(Move {
                from: Square::from_index(from as u8)?,
                to: Square::from_index(to as u8)?,
                promotion: promotion.map(Into::into),
            }),
            _ => None,
        }
    }
}

impl MoveRules for ShakmatyRules {
    fn initial_position(&self) -> Position {
        Self::snapshot(&Chess::default())
    }

    fn legal_moves(&self, position: &Position) -> Vec<Move> {
        let Some(chess) = self.chess_or_log(position) else {
            return Vec::new();
        };
        chess
            .legal_moves()
            .iter()
            .filter_map(Self::from_shakmaty_move)
            .collect()
    }

    #[instrument(level = "trace", skip(self, position), fields(fen = %position.key(), mv = %mv))]
    fn apply(&self, position: &Position, mv: &Move) -> Result<Position, RulesError> {
        let chess = self.to_chess(position)?;
        let m = Self::to_uci(mv)
            .to_move(&chess)
            .map_err(|_| RulesError::IllegalMove(mv.to_string()))?;
        let next = chess
            .play(&m)
            .map_err(|_| RulesError::IllegalMove(mv.to_string()))?;
        Ok(Self::snapshot(&next))
    }

    fn status(&self, position: &Position) -> PositionStatus {
        let Some(chess) = self.chess_or_log(position) else {
            return PositionStatus::Normal;
        };
        if chess.is_checkmate() {
            PositionStatus::Checkmate
        } else if chess.is_stalemate() {
            PositionStatus::Stalemate
        } else if chess.is_insufficient_material() {
            PositionStatus::Draw(DrawRule::InsufficientMaterial)
        } else if chess.halfmoves() >= 100 {
            PositionStatus::Draw(DrawRule::FiftyMoves)
        } else if chess.is_check() {
            PositionStatus::Check
        } else {
            PositionStatus::Normal
        }
    }

    fn null_move(&self, position: &Position) -> Option<Position> {
        let chess = self.chess_or_log(position)?;
        if chess.is_check() {
            return None;
        }
        chess.swap_turn().ok().map(|passed| Self::snapshot(&passed))
    }

    fn serialize(&self, position: &Position) -> String {
        position.key().to_string()
    }

    fn parse(&self, notation: &str) -> Result<Position, RulesError> {
        let fen: Fen = notation
            .trim()
            .parse()
            .map_err(|e| RulesError::InvalidNotation(format!("{e}")))?;
        let chess: Chess = fen
            .into_position(CastlingMode::Standard)
            .map_err(|e| RulesError::InvalidNotation(format!("{e}")))?;
        Ok(Self::snapshot(&chess))
    }
}

impl From<shakmaty::Color> for Side {
    fn from(c: shakmaty::Color) -> Self {
        match c {
            shakmaty::Color::White => Side::White,
            shakmaty::Color::Black => Side::Black,
        }
    }
}

impl From<Side> for shakmaty::Color {
    fn from(side: Side) -> Self {
        match side {
            Side::White => shakmaty::Color::White,
            Side::Black => shakmaty::Color::Black,
        }
    }
}

impl From<shakmaty::Role> for PieceKind {
    fn from(r: shakmaty::Role) -> Self {
        match r {
            shakmaty::Role::Pawn => PieceKind::Pawn,
            shakmaty::Role::Knight => PieceKind::Knight,
            shakmaty::Role::Bishop => PieceKind::Bishop,
            shakmaty::Role::Rook => PieceKind::Rook,
            shakmaty::Role::Queen => PieceKind::Queen,
            shakmaty::Role::King => PieceKind::King,
        }
    }
}

impl From<PieceKind> for shakmaty::Role {
    fn from(kind: PieceKind) -> Self {
        match kind {
            PieceKind::Pawn => shakmaty::Role::Pawn,
            PieceKind::Knight => shakmaty::Role::Knight,
            PieceKind::Bishop => shakmaty::Role::Bishop,
            PieceKind::Rook => shakmaty::Role::Rook,
            PieceKind::Queen => shakmaty::Role::Queen,
            PieceKind::King => shakmaty::Role::King,
        }
    }
}

impl From<CastleSide> for shakmaty::CastlingSide {
    fn from(wing: CastleSide) -> Self {
        match wing {
            CastleSide::KingSide => shakmaty::CastlingSide::KingSide,
            CastleSide::QueenSide => shakmaty::CastlingSide::QueenSide,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_position_snapshot() {
        let rules = ShakmatyRules::new();
        let pos = rules.initial_position();
        assert_eq!(pos.side_to_move(), Side::White);
        assert_eq!(
            pos.key(),
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1"
        );
        let e1: Square = "e1".parse().unwrap();
        assert_eq!(pos.piece_at(e1), Some(Piece::new(PieceKind::King, Side::White)));
        assert!(pos.castling().has(Side::Black, CastleSide::QueenSide));
        assert_eq!(rules.legal_moves(&pos).len(), 20);
    }

    #[test]
    fn test_null_move_refused_in_check() {
        let rules = ShakmatyRules::new();
        let pos = rules
            .parse("rnbqkbnr/ppppp1pp/8/5p1Q/4P3/8/PPPP1PPP/RNB1KBNR b KQkq - 1 2")
            .unwrap();
        assert_eq!(rules.status(&pos), PositionStatus::Check);
        assert!(rules.null_move(&pos).is_none());
    }
}
