//! Application-level move validation on top of the rules oracle.

use super::game::{DrawReason, GameSession, REPETITION_LIMIT, SessionState};
use crate::chess::{CastleSide, Move, MoveRules, PieceKind, Position, PositionStatus, Side};
use crate::error::GameError;
use crate::events::{EventClassifier, EventKind, EventPayload, GameEvent, MoveTags};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Result of an accepted move.
#[derive(Debug, Clone)]
pub struct AppliedMove {
    /// The move as played.
    pub mv: Move,
    /// Derived tags.
    pub tags: MoveTags,
    /// Events to emit once the room lock is released.
    pub events: Vec<GameEvent>,
}

/// Enforces turn order and special-move preconditions, then applies moves
/// through the oracle.
#[derive(Debug, Clone)]
pub struct RuleValidator {
    rules: Arc<dyn MoveRules>,
    classifier: EventClassifier,
}

impl RuleValidator {
    /// Creates a validator backed by `rules`.
    pub fn new(rules: Arc<dyn MoveRules>) -> Self {
        Self {
            classifier: EventClassifier::new(Arc::clone(&rules)),
            rules,
        }
    }

    /// Checks whether `player` may play `mv` now.
    ///
    /// Finished games reject everything. Turn ownership is checked before
    /// anything is asked of the oracle.
    #[instrument(skip(self, session), fields(session_id = %session.id(), mv = %mv))]
    pub fn validate(&self, session: &GameSession, player: &str, mv: &Move) -> Result<(), GameError> {
        let side = session.seat(player)?;
        let position = session.position();
        if side != position.side_to_move() {
            debug!(player, %side, "Player tried to move out of turn");
            return Err(GameError::NotYourTurn);
        }

        check_preconditions(position, side, mv)?;

        if !self.rules.legal_moves(position).contains(mv) {
            warn!(player, "Oracle rejected move");
            return Err(GameError::IllegalMove(format!("{mv} is not legal here")));
        }
        Ok(())
    }

    /// Validates and applies `mv`, advancing the room's state machine.
    #[instrument(skip(self, session), fields(session_id = %session.id(), mv = %mv))]
    pub fn apply(
        &self,
        session: &mut GameSession,
        player: &str,
        mv: Move,
        now: DateTime<Utc>,
    ) -> Result<AppliedMove, GameError> {
        self.validate(session, player, &mv)?;

        let before = session.position().clone();
        let after = self.rules.apply(&before, &mv)?;
        let tags = self.classifier.classify(&before, &mv, &after);
        let mover = before.side_to_move();
        let occurrences = session.record_move(mv, after, now);
        let after = session.position();

        let mut events = tags.to_events(session.id(), player, mv, after, now);

        match tags.status {
            PositionStatus::Checkmate => session.finish(SessionState::Checkmate { winner: mover }),
            PositionStatus::Stalemate => session.finish(SessionState::Stalemate),
            PositionStatus::Draw(rule) => session.finish(SessionState::Draw {
                reason: rule.into(),
            }),
            PositionStatus::Normal | PositionStatus::Check if occurrences >= REPETITION_LIMIT => {
                let reason = DrawReason::Repetition;
                events.push(
                    GameEvent::new(session.id(), EventKind::Draw, player, now)
                        .with_move(mv)
                        .with_payload(EventPayload {
                            draw_reason: Some(reason),
                            fen: Some(session.position().key().to_string()),
                            ..EventPayload::default()
                        }),
                );
                session.finish(SessionState::Draw { reason });
            }
            PositionStatus::Normal | PositionStatus::Check => {}
        }

        debug!(
            ply = session.ply(),
            kinds = ?events.iter().map(|e| e.kind).collect::<Vec<_>>(),
            "Move applied"
        );
        Ok(AppliedMove { mv, tags, events })
    }
}

/// Castling rights, en-passant target and promotion piece checks.
fn check_preconditions(position: &Position, side: Side, mv: &Move) -> Result<(), GameError> {
    let piece = position
        .piece_at(mv.from)
        .filter(|p| p.side == side)
        .ok_or_else(|| GameError::IllegalMove(format!("no piece of yours on {}", mv.from)))?;

    match piece.kind {
        PieceKind::King if mv.file_distance() == 2 && mv.rank_distance() == 0 => {
            let wing = if mv.to.file() > mv.from.file() {
                CastleSide::KingSide
            } else {
                CastleSide::QueenSide
            };
            if !position.castling().has(side, wing) {
                return Err(GameError::IllegalMove(format!(
                    "{side} has lost the right to castle {wing}"
                )));
            }
        }
        PieceKind::Pawn => {
            let diagonal = mv.file_distance() == 1;
            if diagonal && position.piece_at(mv.to).is_none() && position.en_passant() != Some(mv.to) {
                return Err(GameError::IllegalMove(format!(
                    "no en passant capture available on {}",
                    mv.to
                )));
            }
            let last_rank = mv.to.rank() == side.promotion_rank();
            match mv.promotion {
                None if last_rank => {
                    return Err(GameError::IllegalMove(
                        "a promotion piece is required".to_string(),
                    ));
                }
                Some(_) if !last_rank => {
                    return Err(GameError::IllegalMove(
                        "promotion is only possible on the last rank".to_string(),
                    ));
                }
                Some(kind) if !kind.is_promotion_target() => {
                    return Err(GameError::IllegalMove(format!("cannot promote to {kind}")));
                }
                _ => {}
            }
        }
        _ if mv.promotion.is_some() => {
            return Err(GameError::IllegalMove(
                "only pawns can promote".to_string(),
            ));
        }
        _ => {}
    }
    Ok(())
}
