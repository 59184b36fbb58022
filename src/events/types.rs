//! Domain events emitted by game rooms.

use crate::chess::{CastleSide, Move, PieceKind, Side};
use crate::session::{DrawReason, PlayerId, SessionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What happened.
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
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EventKind {
    /// A move was accepted.
    Move,
    /// The move took a piece.
    Capture,
    /// The move gives check.
    Check,
    /// The move mates.
    Checkmate,
    /// The game was drawn.
    Draw,
    /// A pawn was promoted.
    Promotion,
    /// A king castled.
    Castle,
    /// A pawn captured en passant.
    EnPassant,
    /// A player ran out of time.
    Timeout,
    /// A player resigned.
    Resign,
}

/// Extra data attached to an event. Only the fields relevant to the kind
/// are set.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EventPayload {
    /// Piece a pawn promoted to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promoted_to: Option<PieceKind>,
    /// Wing of a castle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub castle_side: Option<CastleSide>,
    /// Piece removed by a capture.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captured: Option<PieceKind>,
    /// Why a draw happened.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draw_reason: Option<DrawReason>,
    /// Winner of a decided game.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<Side>,
    /// Position after the event, in canonical notation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fen: Option<String>,
}

/// An immutable record of something that happened in a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameEvent {
    /// Room the event belongs to.
    pub session_id: SessionId,
    /// Event kind.
    pub kind: EventKind,
    /// Move that triggered it, if any.
    #[serde(rename = "move")]
    pub mv: Option<Move>,
    /// Player responsible.
    pub actor: PlayerId,
    /// When it happened.
    pub timestamp: DateTime<Utc>,
    /// Kind-specific details.
    pub payload: EventPayload,
}

impl GameEvent {
    /// Creates an event with an empty payload.
    pub fn new(
        session_id: impl Into<SessionId>,
        kind: EventKind,
        actor: impl Into<PlayerId>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            kind,
            mv: None,
            actor: actor.into(),
            timestamp,
            payload: EventPayload::default(),
        }
    }

    /// Attaches the triggering move.
    pub fn with_move(mut self, mv: Move) -> Self {
        self.mv = Some(mv);
        self
    }

    /// Replaces the payload.
    pub fn with_payload(mut self, payload: EventPayload) -> Self {
        self.payload = payload;
        self
    }
}
