//! Error taxonomy for room operations.

use crate::chess::RulesError;
use derive_more::{Display, Error};

/// Everything a caller can get back from a room operation.
///
/// All variants are recoverable at the caller boundary except
/// [`GameError::RegistryFull`], which is reported without retry.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum GameError {
    /// No room with this id.
    #[display("room not found: {_0}")]
    NotFound(#[error(not(source))] String),
    /// The requester is seated but the other side is to move.
    #[display("not your turn")]
    NotYourTurn,
    /// The oracle or a validator precondition rejected the move.
    #[display("illegal move: {_0}")]
    IllegalMove(#[error(not(source))] String),
    /// The room has reached a terminal state.
    #[display("game is finished")]
    GameFinished,
    /// The computer was asked to move in a position without legal moves.
    #[display("no legal moves")]
    NoLegalMoves,
    /// The requester is not seated in this room.
    #[display("player {_0} is not seated in this room")]
    NotAParticipant(#[error(not(source))] String),
    /// The room is still waiting for its second player.
    #[display("game has not started")]
    NotStarted,
    /// Both seats are taken.
    #[display("room already has two players")]
    RoomFull,
    /// Accept/decline without a pending offer from the opponent.
    #[display("no pending draw offer")]
    NoDrawOffer,
    /// The registry refused to allocate another room.
    #[display("room limit of {_0} reached")]
    RegistryFull(#[error(not(source))] usize),
}

impl GameError {
    /// Whether the error is expected control flow rather than a client mistake.
    pub fn is_game_over(&self) -> bool {
        matches!(self, GameError::GameFinished | GameError::NoLegalMoves)
    }
}

impl From<RulesError> for GameError {
    fn from(err: RulesError) -> Self {
        match err {
            RulesError::IllegalMove(reason) => GameError::IllegalMove(reason),
            RulesError::InvalidNotation(reason) => {
                GameError::IllegalMove(format!("invalid notation: {reason}"))
            }
        }
    }
}
