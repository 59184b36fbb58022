//! Deriving event kinds from a move and the positions around it.

use super::types::{EventKind, EventPayload, GameEvent};
use crate::chess::{CastleSide, Move, MoveRules, PieceKind, Position, PositionStatus};
use crate::session::DrawReason;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Tags of one applied move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MoveTags {
    /// Piece taken, including a pawn taken en passant.
    pub captured: Option<PieceKind>,
    /// Wing, when the move is a castle.
    pub castle: Option<CastleSide>,
    /// Whether the capture was en passant.
    pub en_passant: bool,
    /// Promotion piece.
    pub promotion: Option<PieceKind>,
    /// Oracle status of the resulting position.
    pub status: PositionStatus,
}

impl MoveTags {
    /// Event kinds, `Move` first, in a fixed order.
    pub fn kinds(&self) -> Vec<EventKind> {
        let mut kinds = vec![EventKind::Move];
        if self.captured.is_some() {
            kinds.push(EventKind::Capture);
        }
        if self.en_passant {
            kinds.push(EventKind::EnPassant);
        }
        if self.castle.is_some() {
            kinds.push(EventKind::Castle);
        }
        if self.promotion.is_some() {
            kinds.push(EventKind::Promotion);
        }
        match self.status {
            PositionStatus::Check => kinds.push(EventKind::Check),
            PositionStatus::Checkmate => kinds.push(EventKind::Checkmate),
            PositionStatus::Stalemate | PositionStatus::Draw(_) => kinds.push(EventKind::Draw),
            PositionStatus::Normal => {}
        }
        kinds
    }

    /// Draw reason implied by the resulting position, if it is drawn.
    pub fn draw_reason(&self) -> Option<DrawReason> {
        match self.status {
            PositionStatus::Stalemate => Some(DrawReason::Stalemate),
            PositionStatus::Draw(rule) => Some(rule.into()),
            _ => None,
        }
    }

    /// One event per kind, each carrying the payload fields relevant to it.
    pub fn to_events(
        &self,
        session_id: &str,
        actor: &str,
        mv: Move,
        after: &Position,
        timestamp: DateTime<Utc>,
    ) -> Vec<GameEvent> {
        let mover = after.side_to_move().opponent();
        self.kinds()
            .into_iter()
            .map(|kind| {
                let mut payload = EventPayload {
                    fen: Some(after.key().to_string()),
                    ..EventPayload::default()
                };
                match kind {
                    EventKind::Capture | EventKind::EnPassant => payload.captured = self.captured,
                    EventKind::Castle => payload.castle_side = self.castle,
                    EventKind::Promotion => payload.promoted_to = self.promotion,
                    EventKind::Checkmate => payload.winner = Some(mover),
                    EventKind::Draw => payload.draw_reason = self.draw_reason(),
                    _ => {}
                }
                GameEvent::new(session_id, kind, actor, timestamp)
                    .with_move(mv)
                    .with_payload(payload)
            })
            .collect()
    }
}

/// Classifies applied moves. Side-effect free.
#[derive(Debug, Clone)]
pub struct EventClassifier {
    rules: Arc<dyn MoveRules>,
}

impl EventClassifier {
    /// Creates a classifier backed by `rules`.
    pub fn new(rules: Arc<dyn MoveRules>) -> Self {
        Self { rules }
    }

    /// Tags for `mv`, which took `before` to `after`.
    pub fn classify(&self, before: &Position, mv: &Move, after: &Position) -> MoveTags {
        let moving = before.piece_at(mv.from);
        let is_pawn = moving.is_some_and(|p| p.kind == PieceKind::Pawn);
        let is_king = moving.is_some_and(|p| p.kind == PieceKind::King);

        let target = before.piece_at(mv.to);
        let en_passant = is_pawn
            && target.is_none()
            && mv.file_distance() == 1
            && before.en_passant() == Some(mv.to);

        let captured = match target {
            Some(piece) if Some(piece.side) != moving.map(|p| p.side) => Some(piece.kind),
            _ if en_passant => Some(PieceKind::Pawn),
            _ => None,
        };

        let castle = (is_king && mv.file_distance() == 2).then(|| {
            if mv.to.file() > mv.from.file() {
                CastleSide::KingSide
            } else {
                CastleSide::QueenSide
            }
        });

        MoveTags {
            captured,
            castle,
            en_passant,
            promotion: if is_pawn { mv.promotion } else { None },
            status: self.rules.status(after),
        }
    }

    /// Event kinds for `mv`.
    pub fn kinds(&self, before: &Position, mv: &Move, after: &Position) -> Vec<EventKind> {
        self.classify(before, mv, after).kinds()
    }
}
