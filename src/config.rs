//! Engine configuration loaded from TOML.

use crate::ai::{DEFAULT_DEPTH, Difficulty, MAX_DEPTH};
use crate::events::DEFAULT_FLUSH_INTERVAL_MS;
use crate::session::DEFAULT_INACTIVITY_TIMEOUT_SECS;
use chrono::TimeDelta;
use derive_getters::Getters;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Room lifecycle settings.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Idle time after which a room is reaped.
    inactivity_timeout_secs: u64,
    /// How often the reaper runs.
    reap_interval_secs: u64,
    /// Maximum number of live rooms.
    max_sessions: usize,
    /// Per-side thinking time; untimed when absent.
    time_control_secs: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            inactivity_timeout_secs: DEFAULT_INACTIVITY_TIMEOUT_SECS as u64,
            reap_interval_secs: 300,
            max_sessions: 10_000,
            time_control_secs: None,
        }
    }
}

impl SessionConfig {
    /// Inactivity threshold as a time delta.
    pub fn inactivity_timeout(&self) -> TimeDelta {
        secs_delta(self.inactivity_timeout_secs)
    }

    /// Reaper period.
    pub fn reap_interval(&self) -> Duration {
        Duration::from_secs(self.reap_interval_secs.max(1))
    }

    /// Time control, if the games are timed.
    pub fn time_control(&self) -> Option<TimeDelta> {
        self.time_control_secs.map(secs_delta)
    }
}

/// Position cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Whether searches use the cache at all.
    enabled: bool,
    /// Entry lifetime.
    ttl_secs: u64,
    /// How often expired entries are swept.
    sweep_interval_secs: u64,
    /// Maximum number of entries.
    capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: 3600,
            sweep_interval_secs: 3600,
            capacity: 100_000,
        }
    }
}

impl CacheConfig {
    /// Entry lifetime as a time delta.
    pub fn ttl(&self) -> TimeDelta {
        secs_delta(self.ttl_secs)
    }

    /// Sweep period.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

/// Event delivery settings.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Flush period in milliseconds.
    flush_interval_ms: u64,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            flush_interval_ms: DEFAULT_FLUSH_INTERVAL_MS,
        }
    }
}

impl EventsConfig {
    /// Flush period.
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms.max(1))
    }
}

/// Computer opponent settings.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// Hard-tier search depth in plies, `1..=MAX_DEPTH`.
    depth: u32,
    /// Difficulty used when a request does not name one.
    difficulty: Difficulty,
    /// Seed for the easy tier; OS entropy when absent.
    seed: Option<u64>,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            depth: DEFAULT_DEPTH,
            difficulty: Difficulty::Medium,
            seed: None,
        }
    }
}

/// HTTP adapter settings.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address.
    host: String,
    /// Bind port.
    port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

/// Complete engine configuration. Every field has a default.
#[derive(Debug, Clone, PartialEq, Eq, Default, Getters, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Room lifecycle.
    sessions: SessionConfig,
    /// Position cache.
    cache: CacheConfig,
    /// Event delivery.
    events: EventsConfig,
    /// Computer opponent.
    ai: AiConfig,
    /// HTTP adapter.
    server: ServerConfig,
}

impl EngineConfig {
    /// Loads configuration from a TOML file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;
        let config = Self::from_toml_str(&content)?;
        info!("Config loaded successfully");
        Ok(config)
    }

    /// Parses configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_DEPTH).contains(&self.ai.depth) {
            return Err(ConfigError::new(format!(
                "ai.depth must be between 1 and {}, got {}",
                MAX_DEPTH, self.ai.depth
            )));
        }
        Ok(())
    }

    /// Overrides the bind address.
    pub fn with_server(mut self, host: impl Into<String>, port: u16) -> Self {
        self.server = ServerConfig {
            host: host.into(),
            port,
        };
        self
    }

    /// Overrides the easy-tier seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.ai.seed = Some(seed);
        self
    }

    /// Overrides the hard-tier depth, clamped to `1..=MAX_DEPTH`.
    pub fn with_depth(mut self, depth: u32) -> Self {
        self.ai.depth = depth.clamp(1, MAX_DEPTH);
        self
    }

    /// Turns the position cache on or off.
    pub fn with_cache_enabled(mut self, enabled: bool) -> Self {
        self.cache.enabled = enabled;
        self
    }

    /// Sets the per-side time control.
    pub fn with_time_control_secs(mut self, secs: Option<u64>) -> Self {
        self.sessions.time_control_secs = secs;
        self
    }
}

fn secs_delta(secs: u64) -> TimeDelta {
    TimeDelta::try_seconds(i64::try_from(secs).unwrap_or(i64::MAX / 1000)).unwrap_or(TimeDelta::MAX)
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}
