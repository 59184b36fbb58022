//! Batched event delivery.

use super::sink::{EventSink, SinkError};
use super::types::GameEvent;
use crate::maintenance::{PeriodicTask, TaskError};
use crate::metrics::EngineMetrics;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Default flush period.
pub const DEFAULT_FLUSH_INTERVAL_MS: u64 = 100;

/// In-memory event queue drained to a sink on a tick.
///
/// Events are delivered in append order. A failed batch goes back to the
/// front of the queue, so delivery is at-least-once.
#[derive(Debug)]
pub struct EventBuffer {
    queue: Mutex<VecDeque<GameEvent>>,
    // Serialises flushes so a retried batch cannot overtake newer ones.
    flushing: Mutex<()>,
    sink: Arc<dyn EventSink>,
    metrics: EngineMetrics,
}

impl EventBuffer {
    /// Creates a buffer draining into `sink`.
    pub fn new(sink: Arc<dyn EventSink>, metrics: EngineMetrics) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            flushing: Mutex::new(()),
            sink,
            metrics,
        }
    }

    /// Appends one event.
    pub fn emit(&self, event: GameEvent) {
        self.queue.lock().push_back(event);
    }

    /// Appends events, keeping their order.
    pub fn emit_all(&self, events: impl IntoIterator<Item = GameEvent>) {
        self.queue.lock().extend(events);
    }

    /// Number of events waiting for delivery.
    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }

    /// Delivers everything queued so far as one batch.
    #[instrument(skip(self))]
    pub fn flush(&self) -> Result<usize, SinkError> {
        let _flushing = self.flushing.lock();
        let batch: Vec<GameEvent> = self.queue.lock().drain(..).collect();
        if batch.is_empty() {
            return Ok(0);
        }

        match self.sink.deliver(&batch) {
            Ok(()) => {
                debug!(count = batch.len(), "Flushed events");
                self.metrics.events_flushed.inc_by(batch.len() as u64);
                Ok(batch.len())
            }
            Err(e) => {
                warn!(count = batch.len(), error = %e, "Event delivery failed, requeueing batch");
                let mut queue = self.queue.lock();
                for event in batch.into_iter().rev() {
                    queue.push_front(event);
                }
                Err(e)
            }
        }
    }
}

impl PeriodicTask for EventBuffer {
    fn name(&self) -> &'static str {
        "event_flush"
    }

    fn run_once(&self) -> Result<usize, TaskError> {
        self.flush()
            .map_err(|e| TaskError::new(self.name(), e.to_string()))
    }
}
