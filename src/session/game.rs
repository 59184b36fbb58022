//! Per-room game state.

use crate::ai::Difficulty;
use crate::chess::{DrawRule, Move, Position, Side};
use crate::error::GameError;
use crate::events::{EventKind, EventPayload, GameEvent};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, instrument, warn};

/// Unique identifier for a game room.
pub type SessionId = String;

/// Opaque identifier for a player.
pub type PlayerId = String;

/// Number of occurrences of a position that draws the game.
pub const REPETITION_LIMIT: u32 = 3;

/// Who is sitting in a seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "type", content = "difficulty")]
pub enum ParticipantKind {
    /// A person relayed by the front-end.
    Human,
    /// The built-in engine.
    Computer(Difficulty),
}

/// A seated player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Player id.
    pub id: PlayerId,
    /// Human or computer.
    pub kind: ParticipantKind,
}

impl Participant {
    /// A human player.
    pub fn human(id: impl Into<PlayerId>) -> Self {
        Self {
            id: id.into(),
            kind: ParticipantKind::Human,
        }
    }

    /// A computer player.
    pub fn computer(id: impl Into<PlayerId>, difficulty: Difficulty) -> Self {
        Self {
            id: id.into(),
            kind: ParticipantKind::Computer(difficulty),
        }
    }

    /// Difficulty, when this is the computer.
    pub fn difficulty(&self) -> Option<Difficulty> {
        match self.kind {
            ParticipantKind::Computer(d) => Some(d),
            ParticipantKind::Human => None,
        }
    }
}

/// Why a game was drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DrawReason {
    /// Side to move has no legal move and is not in check.
    Stalemate,
    /// Neither side can mate.
    InsufficientMaterial,
    /// Fifty moves without capture or pawn move.
    FiftyMoves,
    /// Same position for the third time.
    Repetition,
    /// Both players agreed.
    Agreement,
}

impl From<DrawRule> for DrawReason {
    fn from(rule: DrawRule) -> Self {
        match rule {
            DrawRule::InsufficientMaterial => DrawReason::InsufficientMaterial,
            DrawRule::FiftyMoves => DrawReason::FiftyMoves,
        }
    }
}

/// Room lifecycle.
///
/// `WaitingForOpponent -> InProgress -> {Checkmate, Stalemate, Draw,
/// Resigned, TimedOut}`. Terminal states never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum SessionState {
    /// Only the creator is seated.
    WaitingForOpponent,
    /// Both seats taken, moves accepted.
    InProgress,
    /// The loser was mated.
    Checkmate {
        /// Side that delivered mate.
        winner: Side,
    },
    /// No legal move, not in check.
    Stalemate,
    /// Drawn by rule or agreement.
    Draw {
        /// Why.
        reason: DrawReason,
    },
    /// A player resigned.
    Resigned {
        /// The other player.
        winner: Side,
    },
    /// A player's clock ran out.
    TimedOut {
        /// The player with time left.
        winner: Side,
    },
}

impl SessionState {
    /// Whether the game is over.
    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            SessionState::WaitingForOpponent | SessionState::InProgress
        )
    }

    /// Winning side of a decided game.
    pub fn winner(&self) -> Option<Side> {
        match *self {
            SessionState::Checkmate { winner }
            | SessionState::Resigned { winner }
            | SessionState::TimedOut { winner } => Some(winner),
            _ => None,
        }
    }
}

/// A pending draw offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawOffer {
    /// Side that offered.
    pub offered_by: Side,
    /// When.
    pub offered_at: DateTime<Utc>,
}

/// Read-only copy of a room handed to presentation layers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    /// Room id.
    pub id: SessionId,
    /// First mover.
    pub white: Participant,
    /// Second mover, once seated.
    pub black: Option<Participant>,
    /// Current position in canonical notation.
    pub fen: String,
    /// Side to move.
    pub side_to_move: Side,
    /// Player expected to move next, while the game is running.
    pub turn_owner: Option<PlayerId>,
    /// Lifecycle state.
    pub state: SessionState,
    /// Pending draw offer.
    pub draw_offer: Option<DrawOffer>,
    /// White's remaining time in milliseconds, for timed games.
    pub white_remaining_ms: Option<i64>,
    /// Black's remaining time in milliseconds, for timed games.
    pub black_remaining_ms: Option<i64>,
    /// Half-moves played.
    pub ply: u32,
    /// Most recent move.
    pub last_move: Option<Move>,
    /// Last interaction.
    pub last_activity: DateTime<Utc>,
}

/// A game room.
///
/// Owned by the [`SessionRegistry`](super::SessionRegistry) and mutated only
/// while its per-room lock is held.
#[derive(Debug, Clone)]
pub struct GameSession {
    id: SessionId,
    white: Participant,
    black: Option<Participant>,
    position: Position,
    state: SessionState,
    remaining: Option<[TimeDelta; 2]>,
    turn_started_at: DateTime<Utc>,
    draw_offer: Option<DrawOffer>,
    created_at: DateTime<Utc>,
    last_activity: DateTime<Utc>,
    history: Vec<Move>,
    repetitions: HashMap<String, u32>,
}

impl GameSession {
    /// Creates a room. With both seats filled it starts `InProgress`,
    /// otherwise `WaitingForOpponent`.
    #[instrument(skip(white, black, position), fields(white = %white.id))]
    pub fn new(
        id: SessionId,
        white: Participant,
        black: Option<Participant>,
        position: Position,
        time_control: Option<TimeDelta>,
        now: DateTime<Utc>,
    ) -> Self {
        let state = if black.is_some() {
            SessionState::InProgress
        } else {
            SessionState::WaitingForOpponent
        };
        info!(session_id = %id, ?state, "Creating new game session");
        let mut repetitions = HashMap::new();
        repetitions.insert(position.repetition_key().to_string(), 1);
        Self {
            id,
            white,
            black,
            position,
            state,
            remaining: time_control.map(|t| [t, t]),
            turn_started_at: now,
            draw_offer: None,
            created_at: now,
            last_activity: now,
            history: Vec::new(),
            repetitions,
        }
    }

    /// Room id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Current position.
    pub fn position(&self) -> &Position {
        &self.position
    }

    /// Lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Pending draw offer.
    pub fn draw_offer(&self) -> Option<DrawOffer> {
        self.draw_offer
    }

    /// Half-moves played since creation.
    pub fn ply(&self) -> u32 {
        self.history.len() as u32
    }

    /// Moves played, in order.
    pub fn history(&self) -> &[Move] {
        &self.history
    }

    /// Creation time.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Last interaction.
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }

    /// Records an interaction.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_activity = now;
    }

    /// Participant in a seat.
    pub fn participant(&self, side: Side) -> Option<&Participant> {
        match side {
            Side::White => Some(&self.white),
            Side::Black => self.black.as_ref(),
        }
    }

    /// Seat of `player`.
    pub fn side_of(&self, player: &str) -> Option<Side> {
        if self.white.id == player {
            Some(Side::White)
        } else if self.black.as_ref().is_some_and(|p| p.id == player) {
            Some(Side::Black)
        } else {
            None
        }
    }

    /// Participant whose move it is, while the game is running.
    pub fn turn_owner(&self) -> Option<&Participant> {
        match self.state {
            SessionState::InProgress => self.participant(self.position.side_to_move()),
            _ => None,
        }
    }

    /// Remaining time for `side`, for timed games.
    pub fn remaining(&self, side: Side) -> Option<TimeDelta> {
        self.remaining.map(|r| r[side.index()])
    }

    /// How many times the current position has occurred.
    pub fn repetition_count(&self) -> u32 {
        self.repetitions
            .get(self.position.repetition_key())
            .copied()
            .unwrap_or(0)
    }

    /// Seats the second player.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn join(&mut self, player: Participant, now: DateTime<Utc>) -> Result<Side, GameError> {
        if self.state.is_terminal() {
            return Err(GameError::GameFinished);
        }
        if self.black.is_some() || self.white.id == player.id {
            warn!(player_id = %player.id, "Session already has 2 players");
            return Err(GameError::RoomFull);
        }
        info!(player_id = %player.id, "Registering player as black");
        self.black = Some(player);
        self.state = SessionState::InProgress;
        self.turn_started_at = now;
        self.touch(now);
        Ok(Side::Black)
    }

    /// Fails unless the game is running.
    pub fn ensure_in_progress(&self) -> Result<(), GameError> {
        match self.state {
            SessionState::InProgress => Ok(()),
            SessionState::WaitingForOpponent => Err(GameError::NotStarted),
            _ => Err(GameError::GameFinished),
        }
    }

    /// Seat of `player` in a running game.
    pub fn seat(&self, player: &str) -> Result<Side, GameError> {
        self.ensure_in_progress()?;
        self.side_of(player)
            .ok_or_else(|| GameError::NotAParticipant(player.to_string()))
    }

    /// Ends the game on time if the side to move has run out.
    ///
    /// Clocks are only consulted when somebody interacts with the room.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn settle_clock(&mut self, now: DateTime<Utc>) -> Option<GameEvent> {
        if self.state != SessionState::InProgress {
            return None;
        }
        let mover = self.position.side_to_move();
        let left = self.remaining(mover)?;
        if now - self.turn_started_at < left {
            return None;
        }

        let winner = mover.opponent();
        if let Some(r) = self.remaining.as_mut() {
            r[mover.index()] = TimeDelta::zero();
        }
        self.state = SessionState::TimedOut { winner };
        self.draw_offer = None;
        info!(flagged = %mover, "Player ran out of time");

        let actor = self
            .participant(mover)
            .map(|p| p.id.clone())
            .unwrap_or_default();
        Some(
            GameEvent::new(self.id.clone(), EventKind::Timeout, actor, now).with_payload(
                EventPayload {
                    winner: Some(winner),
                    fen: Some(self.position.key().to_string()),
                    ..EventPayload::default()
                },
            ),
        )
    }

    /// Records an accepted move: charges the mover's clock, swaps in the new
    /// position and updates repetition counts. Returns how often the new
    /// position has now occurred.
    pub(crate) fn record_move(&mut self, mv: Move, next: Position, now: DateTime<Utc>) -> u32 {
        let mover = self.position.side_to_move();
        if let Some(r) = self.remaining.as_mut() {
            let spent = now - self.turn_started_at;
            let left = r[mover.index()] - spent;
            r[mover.index()] = left.max(TimeDelta::zero());
        }
        if self.draw_offer.is_some_and(|o| o.offered_by != mover) {
            debug!("Draw offer lapsed by moving");
            self.draw_offer = None;
        }

        self.position = next;
        self.history.push(mv);
        self.turn_started_at = now;
        self.touch(now);

        let count = self
            .repetitions
            .entry(self.position.repetition_key().to_string())
            .or_insert(0);
        *count += 1;
        *count
    }

    /// Moves to a terminal state.
    pub(crate) fn finish(&mut self, state: SessionState) {
        debug_assert!(state.is_terminal());
        info!(session_id = %self.id, ?state, "Game finished");
        self.state = state;
        self.draw_offer = None;
    }

    /// Resigns on behalf of `player`.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn resign(&mut self, player: &str, now: DateTime<Utc>) -> Result<GameEvent, GameError> {
        let side = self.seat(player)?;
        let winner = side.opponent();
        self.finish(SessionState::Resigned { winner });
        self.touch(now);
        Ok(
            GameEvent::new(self.id.clone(), EventKind::Resign, player, now).with_payload(
                EventPayload {
                    winner: Some(winner),
                    ..EventPayload::default()
                },
            ),
        )
    }

    /// Offers a draw to the opponent, replacing any earlier offer.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn offer_draw(&mut self, player: &str, now: DateTime<Utc>) -> Result<DrawOffer, GameError> {
        let side = self.seat(player)?;
        let offer = DrawOffer {
            offered_by: side,
            offered_at: now,
        };
        self.draw_offer = Some(offer);
        self.touch(now);
        info!(offered_by = %side, "Draw offered");
        Ok(offer)
    }

    /// Accepts the opponent's pending offer.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn accept_draw(&mut self, player: &str, now: DateTime<Utc>) -> Result<GameEvent, GameError> {
        let side = self.seat(player)?;
        self.take_offer_for(side)?;
        self.finish(SessionState::Draw {
            reason: DrawReason::Agreement,
        });
        self.touch(now);
        Ok(
            GameEvent::new(self.id.clone(), EventKind::Draw, player, now).with_payload(
                EventPayload {
                    draw_reason: Some(DrawReason::Agreement),
                    fen: Some(self.position.key().to_string()),
                    ..EventPayload::default()
                },
            ),
        )
    }

    /// Declines the opponent's pending offer.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn decline_draw(&mut self, player: &str, now: DateTime<Utc>) -> Result<(), GameError> {
        let side = self.seat(player)?;
        self.take_offer_for(side)?;
        self.touch(now);
        info!(declined_by = %side, "Draw declined");
        Ok(())
    }

    fn take_offer_for(&mut self, recipient: Side) -> Result<DrawOffer, GameError> {
        match self.draw_offer {
            Some(offer) if offer.offered_by != recipient => {
                self.draw_offer = None;
                Ok(offer)
            }
            _ => Err(GameError::NoDrawOffer),
        }
    }

    /// Copy of the public state.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id.clone(),
            white: self.white.clone(),
            black: self.black.clone(),
            fen: self.position.key().to_string(),
            side_to_move: self.position.side_to_move(),
            turn_owner: self.turn_owner().map(|p| p.id.clone()),
            state: self.state,
            draw_offer: self.draw_offer,
            white_remaining_ms: self.remaining(Side::White).map(|t| t.num_milliseconds()),
            black_remaining_ms: self.remaining(Side::Black).map(|t| t.num_milliseconds()),
            ply: self.ply(),
            last_move: self.history.last().copied(),
            last_activity: self.last_activity,
        }
    }
}
