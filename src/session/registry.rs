//! Concurrent registry of live game rooms.

use super::game::{GameSession, Participant, SessionId, SessionSnapshot};
use crate::chess::Position;
use crate::clock::Clock;
use crate::error::GameError;
use crate::events::GameEvent;
use crate::maintenance::{PeriodicTask, TaskError};
use crate::metrics::EngineMetrics;
use chrono::TimeDelta;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Default inactivity threshold before a room is reaped.
pub const DEFAULT_INACTIVITY_TIMEOUT_SECS: i64 = 30 * 60;

#[derive(Debug)]
struct Room {
    session: Mutex<GameSession>,
    // Events staged under the session lock, handed on in apply order.
    outbox: Mutex<Vec<GameEvent>>,
}

impl Room {
    fn new(session: GameSession) -> Self {
        Self {
            session: Mutex::new(session),
            outbox: Mutex::new(Vec::new()),
        }
    }
}

type SharedRoom = Arc<Room>;

/// Manages all game rooms.
///
/// The map lock only guards inserts and removals; each room has its own lock,
/// so different rooms are mutated in parallel while one room is serialized.
#[derive(Debug, Clone)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<SessionId, SharedRoom>>>,
    clock: Arc<dyn Clock>,
    inactivity_timeout: TimeDelta,
    max_sessions: usize,
    metrics: EngineMetrics,
}

impl SessionRegistry {
    /// Creates an empty registry.
    #[instrument(skip(clock, metrics))]
    pub fn new(
        clock: Arc<dyn Clock>,
        inactivity_timeout: TimeDelta,
        max_sessions: usize,
        metrics: EngineMetrics,
    ) -> Self {
        info!("Creating session registry");
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            clock,
            inactivity_timeout,
            max_sessions,
            metrics,
        }
    }

    /// The registry's clock.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Creates a room and returns its id.
    ///
    /// Fails with [`GameError::RegistryFull`] once `max_sessions` rooms are
    /// live.
    #[instrument(skip(self, white, black, position), fields(white = %white.id))]
    pub fn create(
        &self,
        white: Participant,
        black: Option<Participant>,
        position: Position,
        time_control: Option<TimeDelta>,
    ) -> Result<SessionId, GameError> {
        let id = uuid::Uuid::new_v4().to_string();
        let session = GameSession::new(
            id.clone(),
            white,
            black,
            position,
            time_control,
            self.clock.now(),
        );

        let mut sessions = self.sessions.write();
        if sessions.len() >= self.max_sessions {
            warn!(limit = self.max_sessions, "Session limit reached");
            return Err(GameError::RegistryFull(self.max_sessions));
        }
        sessions.insert(id.clone(), Arc::new(Room::new(session)));
        self.metrics.active_sessions.set(sessions.len() as i64);

        info!(session_id = %id, "Created new session");
        Ok(id)
    }

    fn entry(&self, id: &str) -> Result<SharedRoom, GameError> {
        self.sessions.read().get(id).cloned().ok_or_else(|| {
            debug!(session_id = id, "Session not found");
            GameError::NotFound(id.to_string())
        })
    }

    /// Copy of a room. No lock is held once this returns.
    pub fn get(&self, id: &str) -> Result<GameSession, GameError> {
        Ok(self.entry(id)?.session.lock().clone())
    }

    /// Public view of a room.
    pub fn snapshot(&self, id: &str) -> Result<SessionSnapshot, GameError> {
        Ok(self.entry(id)?.session.lock().snapshot())
    }

    /// Whether a room exists.
    pub fn contains(&self, id: &str) -> bool {
        self.sessions.read().contains_key(id)
    }

    /// Removes a room.
    #[instrument(skip(self))]
    pub fn delete(&self, id: &str) -> Result<(), GameError> {
        let mut sessions = self.sessions.write();
        if sessions.remove(id).is_none() {
            return Err(GameError::NotFound(id.to_string()));
        }
        self.metrics.active_sessions.set(sessions.len() as i64);
        info!(session_id = id, "Deleted session");
        Ok(())
    }

    /// Runs `f` with exclusive access to one room.
    ///
    /// The room's last-activity stamp is refreshed first. The lock is
    /// released on every exit path, including a panic inside `f`.
    pub fn with_lock<R>(
        &self,
        id: &str,
        f: impl FnOnce(&mut GameSession) -> R,
    ) -> Result<R, GameError> {
        let room = self.entry(id)?;
        let mut session = room.session.lock();
        session.touch(self.clock.now());
        Ok(f(&mut session))
    }

    /// Like [`with_lock`](Self::with_lock), for operations that produce
    /// events.
    ///
    /// Events are staged in the room's outbox before the room lock is
    /// released and passed to `publish` after it, so `publish` runs without
    /// the room lock yet sees each room's events in the order they were
    /// applied, even when several threads act on the same room.
    pub fn with_lock_publishing<R>(
        &self,
        id: &str,
        f: impl FnOnce(&mut GameSession) -> (R, Vec<GameEvent>),
        publish: impl FnOnce(Vec<GameEvent>),
    ) -> Result<R, GameError> {
        let room = self.entry(id)?;
        let result = {
            let mut session = room.session.lock();
            session.touch(self.clock.now());
            let (result, events) = f(&mut session);
            if !events.is_empty() {
                room.outbox.lock().extend(events);
            }
            result
        };

        // Whoever takes the outbox first delivers everything staged so far.
        let mut outbox = room.outbox.lock();
        if !outbox.is_empty() {
            publish(std::mem::take(&mut *outbox));
        }
        Ok(result)
    }

    /// Ids of all live rooms.
    pub fn ids(&self) -> Vec<SessionId> {
        self.sessions.read().keys().cloned().collect()
    }

    /// Number of live rooms.
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    /// Whether no rooms are live.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes rooms idle for at least the inactivity timeout.
    ///
    /// Rooms whose lock is currently held are in use and skipped.
    #[instrument(skip(self))]
    pub fn reap_inactive(&self) -> usize {
        let now = self.clock.now();
        let timeout = self.inactivity_timeout;
        let mut sessions = self.sessions.write();
        let before = sessions.len();

        sessions.retain(|id, room| {
            let Some(session) = room.session.try_lock() else {
                return true;
            };
            let idle = now - session.last_activity();
            if idle >= timeout {
                info!(session_id = %id, idle_secs = idle.num_seconds(), "Reaping inactive session");
                false
            } else {
                true
            }
        });

        let reaped = before - sessions.len();
        self.metrics.active_sessions.set(sessions.len() as i64);
        reaped
    }
}

impl PeriodicTask for SessionRegistry {
    fn name(&self) -> &'static str {
        "session_reaper"
    }

    fn run_once(&self) -> Result<usize, TaskError> {
        Ok(self.reap_inactive())
    }
}
