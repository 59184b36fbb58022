//! Event layer: classification, buffering and delivery.

mod buffer;
mod classify;
mod sink;
mod types;

pub use buffer::{DEFAULT_FLUSH_INTERVAL_MS, EventBuffer};
pub use classify::{EventClassifier, MoveTags};
pub use sink::{ChannelSink, EventSink, LogSink, MemorySink, SinkError};
pub use types::{EventKind, EventPayload, GameEvent};
