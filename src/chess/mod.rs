//! Chess domain types and the move-rules oracle.

mod position;
mod rules;
mod shakmaty_rules;
mod types;

pub use position::Position;
pub use rules::{DrawRule, MoveRules, PositionStatus, RulesError};
pub use shakmaty_rules::ShakmatyRules;
pub use types::{CastleSide, CastlingRights, Move, NotationError, Piece, PieceKind, Side, Square};
