//! Downstream consumers of flushed event batches.

use super::types::GameEvent;
use derive_more::{Display, Error};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::info;

/// Delivery to a sink failed; the batch will be offered again.
#[derive(Debug, Clone, Display, Error)]
#[display("Event delivery failed: {message}")]
pub struct SinkError {
    /// What went wrong.
    pub message: String,
}

impl SinkError {
    /// Creates a sink error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Receives batches of events in append order.
///
/// A batch may be delivered more than once if an earlier attempt failed
/// part-way, so consumers must tolerate duplicates.
pub trait EventSink: Send + Sync + std::fmt::Debug {
    /// Delivers one batch.
    fn deliver(&self, batch: &[GameEvent]) -> Result<(), SinkError>;
}

/// Logs every event at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn deliver(&self, batch: &[GameEvent]) -> Result<(), SinkError> {
        for event in batch {
            info!(
                session_id = %event.session_id,
                kind = %event.kind,
                actor = %event.actor,
                mv = ?event.mv.map(|m| m.to_string()),
                "Game event"
            );
        }
        Ok(())
    }
}

/// Keeps delivered events in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<GameEvent>>,
    failures: Mutex<usize>,
}

impl MemorySink {
    /// Empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `n` deliveries fail.
    pub fn fail_next(&self, n: usize) {
        *self.failures.lock() = n;
    }

    /// Everything delivered so far.
    pub fn events(&self) -> Vec<GameEvent> {
        self.events.lock().clone()
    }

    /// Delivered events belonging to one room.
    pub fn events_for(&self, session_id: &str) -> Vec<GameEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.session_id == session_id)
            .cloned()
            .collect()
    }
}

impl EventSink for MemorySink {
    fn deliver(&self, batch: &[GameEvent]) -> Result<(), SinkError> {
        {
            let mut failures = self.failures.lock();
            if *failures > 0 {
                *failures -= 1;
                return Err(SinkError::new("injected failure"));
            }
        }
        self.events.lock().extend_from_slice(batch);
        Ok(())
    }
}

/// Forwards batches over a tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Vec<GameEvent>>,
}

impl ChannelSink {
    /// Creates a sink and the receiver its batches arrive on.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Vec<GameEvent>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn deliver(&self, batch: &[GameEvent]) -> Result<(), SinkError> {
        self.tx
            .send(batch.to_vec())
            .map_err(|_| SinkError::new("event receiver dropped"))
    }
}
