//! Room operations tying the registry, validator, search engine and event
//! layer together.

use crate::ai::{AnalysisReport, Difficulty, PositionAnalyzer, SearchEngine};
use crate::cache::PositionCache;
use crate::chess::{Move, MoveRules, ShakmatyRules, Side};
use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::error::GameError;
use crate::events::{EventBuffer, EventSink, GameEvent};
use crate::maintenance::spawn_periodic;
use crate::metrics::EngineMetrics;
use crate::session::{
    GameSession, Participant, RuleValidator, SessionId, SessionRegistry, SessionSnapshot,
    SessionState,
};
use chrono::TimeDelta;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Id given to the computer seat.
pub const COMPUTER_ID: &str = "computer";

/// The game session engine.
///
/// Every operation locks at most one room at a time. Its events are staged
/// under the room lock and reach the event buffer after the lock is
/// released, in the order they were applied. Computer replies are searched with
/// no lock held and committed only if the room is unchanged.
#[derive(Debug, Clone)]
pub struct GameService {
    rules: Arc<dyn MoveRules>,
    registry: SessionRegistry,
    validator: RuleValidator,
    engine: Arc<SearchEngine>,
    analyzer: PositionAnalyzer,
    events: Arc<EventBuffer>,
    cache: Option<Arc<PositionCache>>,
    metrics: EngineMetrics,
    config: EngineConfig,
}

impl GameService {
    /// Builds an engine on the bundled rules oracle.
    pub fn new(
        config: EngineConfig,
        sink: Arc<dyn EventSink>,
        clock: Arc<dyn Clock>,
        metrics: EngineMetrics,
    ) -> Self {
        Self::with_rules(Arc::new(ShakmatyRules::new()), config, sink, clock, metrics)
    }

    /// Builds an engine on a custom rules oracle.
    #[instrument(skip_all)]
    pub fn with_rules(
        rules: Arc<dyn MoveRules>,
        config: EngineConfig,
        sink: Arc<dyn EventSink>,
        clock: Arc<dyn Clock>,
        metrics: EngineMetrics,
    ) -> Self {
        let cache = config.cache().enabled().then(|| {
            Arc::new(PositionCache::new(
                config.cache().ttl(),
                *config.cache().capacity(),
                Arc::clone(&clock),
                metrics.clone(),
            ))
        });

        let mut engine = SearchEngine::new(Arc::clone(&rules), *config.ai().depth())
            .with_metrics(metrics.clone());
        if let Some(cache) = &cache {
            engine = engine.with_cache(Arc::clone(cache));
        }
        if let Some(seed) = config.ai().seed() {
            engine = engine.with_seed(*seed);
        }

        let registry = SessionRegistry::new(
            clock,
            config.sessions().inactivity_timeout(),
            *config.sessions().max_sessions(),
            metrics.clone(),
        );

        info!(
            depth = engine.depth(),
            cache = cache.is_some(),
            "Game service ready"
        );
        Self {
            validator: RuleValidator::new(Arc::clone(&rules)),
            analyzer: PositionAnalyzer::new(Arc::clone(&rules)),
            events: Arc::new(EventBuffer::new(sink, metrics.clone())),
            engine: Arc::new(engine),
            rules,
            registry,
            cache,
            metrics,
            config,
        }
    }

    /// The room registry.
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// The event buffer.
    pub fn events(&self) -> &Arc<EventBuffer> {
        &self.events
    }

    /// The position cache, when enabled.
    pub fn cache(&self) -> Option<&Arc<PositionCache>> {
        self.cache.as_ref()
    }

    /// The computer opponent.
    pub fn engine(&self) -> &Arc<SearchEngine> {
        &self.engine
    }

    /// The rules oracle.
    pub fn rules(&self) -> &Arc<dyn MoveRules> {
        &self.rules
    }

    /// Active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Metrics handles.
    pub fn metrics(&self) -> &EngineMetrics {
        &self.metrics
    }

    /// Starts the reaper, cache sweep and event flush loops.
    pub fn spawn_maintenance(&self, cancel: CancellationToken) -> Vec<JoinHandle<()>> {
        let mut handles = vec![
            spawn_periodic(
                Arc::new(self.registry.clone()),
                self.config.sessions().reap_interval(),
                cancel.clone(),
            ),
            spawn_periodic(
                self.events.clone(),
                self.config.events().flush_interval(),
                cancel.clone(),
            ),
        ];
        if let Some(cache) = &self.cache {
            handles.push(spawn_periodic(
                cache.clone(),
                self.config.cache().sweep_interval(),
                cancel,
            ));
        }
        handles
    }

    fn time_control(&self) -> Option<TimeDelta> {
        self.config.sessions().time_control()
    }

    /// Opens a room with `creator` as White, waiting for an opponent.
    #[instrument(skip(self))]
    pub fn open_room(&self, creator: &str) -> Result<SessionId, GameError> {
        self.registry.create(
            Participant::human(creator),
            None,
            self.rules.initial_position(),
            self.time_control(),
        )
    }

    /// Seats `player` as Black in an open room.
    #[instrument(skip(self))]
    pub fn join_room(&self, id: &str, player: &str) -> Result<Side, GameError> {
        let now = self.registry.clock().now();
        self.registry
            .with_lock(id, |s| s.join(Participant::human(player), now))?
    }

    /// Creates a room with both players seated.
    #[instrument(skip(self))]
    pub fn create_game(&self, white: &str, black: &str) -> Result<SessionId, GameError> {
        self.registry.create(
            Participant::human(white),
            Some(Participant::human(black)),
            self.rules.initial_position(),
            self.time_control(),
        )
    }

    /// Creates a room against the computer. If the computer has White it
    /// moves straight away.
    #[instrument(skip(self))]
    pub fn create_ai_game(
        &self,
        human: &str,
        human_side: Side,
        difficulty: Difficulty,
    ) -> Result<SessionId, GameError> {
        let person = Participant::human(human);
        let computer = Participant::computer(COMPUTER_ID, difficulty);
        let (white, black) = match human_side {
            Side::White => (person, computer),
            Side::Black => (computer, person),
        };
        let id = self.registry.create(
            white,
            Some(black),
            self.rules.initial_position(),
            self.time_control(),
        )?;
        if human_side == Side::Black {
            self.play_computer_turn(&id)?;
        }
        Ok(id)
    }

    /// Creates a room where the computer plays both sides.
    #[instrument(skip(self))]
    pub fn create_selfplay_game(
        &self,
        white: Difficulty,
        black: Difficulty,
    ) -> Result<SessionId, GameError> {
        self.registry.create(
            Participant::computer(format!("{COMPUTER_ID}-white"), white),
            Some(Participant::computer(format!("{COMPUTER_ID}-black"), black)),
            self.rules.initial_position(),
            None,
        )
    }

    /// Public view of a room.
    pub fn snapshot(&self, id: &str) -> Result<SessionSnapshot, GameError> {
        self.registry.snapshot(id)
    }

    /// Removes a room.
    pub fn delete_room(&self, id: &str) -> Result<(), GameError> {
        self.registry.delete(id)
    }

    /// Runs `f` on a room after settling its clock. Events produced either way
    /// are emitted once the lock is released, keeping per-room order.
    fn interact<T>(
        &self,
        id: &str,
        f: impl FnOnce(&mut GameSession) -> Result<(T, Vec<GameEvent>), GameError>,
    ) -> Result<T, GameError> {
        let now = self.registry.clock().now();
        self.registry.with_lock_publishing(
            id,
            |session| {
                let mut events = Vec::new();
                if let Some(timeout) = session.settle_clock(now) {
                    events.push(timeout);
                }
                match f(session) {
                    Ok((value, more)) => {
                        events.extend(more);
                        (Ok(value), events)
                    }
                    Err(e) => (Err(e), events),
                }
            },
            |events| self.events.emit_all(events),
        )?
    }

    /// Plays `mv` for `player`. If the opponent is the computer, its reply is
    /// searched and committed before returning.
    #[instrument(skip(self))]
    pub fn submit_move(&self, id: &str, player: &str, mv: Move) -> Result<SessionSnapshot, GameError> {
        let now = self.registry.clock().now();
        let computer_next = self.interact(id, |session| {
            let applied = self.validator.apply(session, player, mv, now)?;
            let next = session.turn_owner().and_then(|p| p.difficulty()).is_some();
            Ok((next, applied.events))
        })?;
        self.metrics.moves_total.inc();
        debug!(player, "Move accepted");

        if computer_next {
            if let Err(e) = self.play_computer_turn(id) {
                warn!(error = %e, "Computer reply was not committed");
            }
        }
        self.snapshot(id)
    }

    /// Searches and commits one computer move, if the computer is to move.
    ///
    /// The search runs without the room lock. The result is dropped if the
    /// room was reaped or moved on in the meantime.
    #[instrument(skip(self))]
    pub fn play_computer_turn(&self, id: &str) -> Result<Option<Move>, GameError> {
        let turn = self.registry.with_lock(id, |s| {
            if s.state() != SessionState::InProgress {
                return None;
            }
            let owner = s.turn_owner()?;
            let difficulty = owner.difficulty()?;
            Some((s.position().clone(), s.ply(), owner.id.clone(), difficulty))
        })?;
        let Some((position, ply, actor, difficulty)) = turn else {
            return Ok(None);
        };

        let mv = match self.engine.best_move(&position, difficulty) {
            Ok(mv) => mv,
            Err(GameError::NoLegalMoves) => return Ok(None),
            Err(e) => return Err(e),
        };

        let now = self.registry.clock().now();
        let committed = self.interact(id, |session| {
            if session.ply() != ply {
                debug!("Room moved on during search, discarding reply");
                return Ok((None, Vec::new()));
            }
            let applied = self.validator.apply(session, &actor, mv, now)?;
            Ok((Some(applied.mv), applied.events))
        });

        match committed {
            Ok(Some(mv)) => {
                self.metrics.moves_total.inc();
                info!(session_id = %id, %mv, %difficulty, "Computer moved");
                Ok(Some(mv))
            }
            Ok(None) => Ok(None),
            Err(GameError::NotFound(_)) => {
                warn!(session_id = %id, "Room vanished during search");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Resigns for `player`.
    #[instrument(skip(self))]
    pub fn resign(&self, id: &str, player: &str) -> Result<SessionSnapshot, GameError> {
        let now = self.registry.clock().now();
        self.interact(id, |session| {
            let event = session.resign(player, now)?;
            Ok((session.snapshot(), vec![event]))
        })
    }

    /// Offers a draw. The computer declines every offer.
    #[instrument(skip(self))]
    pub fn offer_draw(&self, id: &str, player: &str) -> Result<SessionSnapshot, GameError> {
        let now = self.registry.clock().now();
        self.interact(id, |session| {
            let offer = session.offer_draw(player, now)?;
            let opponent = session.participant(offer.offered_by.opponent());
            if opponent.is_some_and(|p| p.difficulty().is_some()) {
                debug!("Computer declined draw offer");
                if let Some(computer) = opponent.map(|p| p.id.clone()) {
                    session.decline_draw(&computer, now)?;
                }
            }
            Ok((session.snapshot(), Vec::new()))
        })
    }

    /// Accepts the opponent's draw offer.
    #[instrument(skip(self))]
    pub fn accept_draw(&self, id: &str, player: &str) -> Result<SessionSnapshot, GameError> {
        let now = self.registry.clock().now();
        self.interact(id, |session| {
            let event = session.accept_draw(player, now)?;
            Ok((session.snapshot(), vec![event]))
        })
    }

    /// Declines the opponent's draw offer.
    #[instrument(skip(self))]
    pub fn decline_draw(&self, id: &str, player: &str) -> Result<SessionSnapshot, GameError> {
        let now = self.registry.clock().now();
        self.interact(id, |session| {
            session.decline_draw(player, now)?;
            Ok((session.snapshot(), Vec::new()))
        })
    }

    /// Legal moves for `player` when it is their turn.
    pub fn legal_moves(&self, id: &str, player: &str) -> Result<Vec<Move>, GameError> {
        let position = self.interact(id, |session| {
            let side = session.seat(player)?;
            if side != session.position().side_to_move() {
                return Err(GameError::NotYourTurn);
            }
            Ok((session.position().clone(), Vec::new()))
        })?;
        Ok(self.rules.legal_moves(&position))
    }

    /// Analyses a position given in canonical notation.
    #[instrument(skip(self))]
    pub fn analyze(&self, fen: &str) -> Result<AnalysisReport, GameError> {
        let position = self.rules.parse(fen)?;
        Ok(self.analyzer.analyze(&position))
    }
}
