//! Chess Rooms library - concurrent chess game-session engine
//!
//! Hosts many two-player chess rooms at once, validates and applies moves
//! through a rules oracle, turns special moves into domain events, and plays
//! as a computer opponent with an alpha-beta search.
//!
//! # Architecture
//!
//! - **Chess**: domain types and the [`MoveRules`] oracle ([`ShakmatyRules`])
//! - **AI**: [`Evaluator`], [`SearchEngine`] and [`PositionAnalyzer`]
//! - **Cache**: TTL-bounded [`PositionCache`] of evaluations
//! - **Session**: [`SessionRegistry`], [`GameSession`] and [`RuleValidator`]
//! - **Events**: [`EventClassifier`], [`EventBuffer`] and sinks
//! - **Service**: [`GameService`], the operations a front-end calls
//!
//! # Example
//!
//! ```no_run
//! use chess_rooms::{EngineConfig, EngineMetrics, GameService, LogSink, SystemClock};
//! use std::sync::Arc;
//!
//! # fn example() -> Result<(), chess_rooms::GameError> {
//! let service = GameService::new(
//!     EngineConfig::default(),
//!     Arc::new(LogSink),
//!     Arc::new(SystemClock),
//!     EngineMetrics::unregistered(),
//! );
//! let room = service.create_game("alice", "bob")?;
//! let snapshot = service.submit_move(&room, "alice", "e2e4".parse().unwrap())?;
//! assert_eq!(snapshot.turn_owner.as_deref(), Some("bob"));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod ai;
mod cache;
mod chess;
mod clock;
mod config;
mod error;
mod events;
mod maintenance;
mod metrics;
mod server;
mod service;
mod session;

// Crate-level exports - Chess domain and rules oracle
pub use chess::{
    CastleSide, CastlingRights, DrawRule, Move, MoveRules, NotationError, Piece, PieceKind,
    Position, PositionStatus, RulesError, ShakmatyRules, Side, Square,
};

// Crate-level exports - Computer opponent
pub use ai::{
    Advice, AnalysisReport, DEFAULT_DEPTH, Difficulty, EvalWeights, Evaluation, Evaluator,
    MAX_DEPTH, PositionAnalyzer, SearchEngine, SearchResult, piece_square_value,
};

// Crate-level exports - Position cache
pub use cache::{CacheEntry, PositionCache};

// Crate-level exports - Sessions
pub use session::{
    AppliedMove, DEFAULT_INACTIVITY_TIMEOUT_SECS, DrawOffer, DrawReason, GameSession, Participant,
    ParticipantKind, PlayerId, REPETITION_LIMIT, RuleValidator, SessionId, SessionRegistry,
    SessionSnapshot, SessionState,
};

// Crate-level exports - Events
pub use events::{
    ChannelSink, DEFAULT_FLUSH_INTERVAL_MS, EventBuffer, EventClassifier, EventKind, EventPayload,
    EventSink, GameEvent, LogSink, MemorySink, MoveTags, SinkError,
};

// Crate-level exports - Service, infrastructure and configuration
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    AiConfig, CacheConfig, ConfigError, EngineConfig, EventsConfig, ServerConfig, SessionConfig,
};
pub use error::GameError;
pub use maintenance::{PeriodicTask, TaskError, spawn_periodic};
pub use metrics::EngineMetrics;
pub use server::{
    ApiError, AppState, CreateAiGameRequest, CreateRoomRequest, CreatedResponse, ErrorBody,
    JoinResponse, MakeMoveRequest, PlayerRequest, router,
};
pub use service::{COMPUTER_ID, GameService};
