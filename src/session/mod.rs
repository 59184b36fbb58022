//! Game rooms: per-room state machine, validation and the registry.

mod game;
mod registry;
mod validator;

pub use game::{
    DrawOffer, DrawReason, GameSession, Participant, ParticipantKind, PlayerId, REPETITION_LIMIT,
    SessionId, SessionSnapshot, SessionState,
};
pub use registry::{DEFAULT_INACTIVITY_TIMEOUT_SECS, SessionRegistry};
pub use validator::{AppliedMove, RuleValidator};
