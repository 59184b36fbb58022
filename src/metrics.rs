//! Prometheus metrics for the engine.

use prometheus::{Histogram, HistogramOpts, HistogramVec, IntCounter, IntGauge, Opts, Registry};

/// Engine-level prometheus metrics.
#[derive(Clone)]
pub struct EngineMetrics {
    /// Number of live rooms in the registry.
    pub active_sessions: IntGauge,
    /// Moves accepted across all rooms.
    pub moves_total: IntCounter,
    /// Position cache hits.
    pub cache_hits: IntCounter,
    /// Position cache misses.
    pub cache_misses: IntCounter,
    /// Events handed to the sink.
    pub events_flushed: IntCounter,
    /// Wall time spent choosing a computer move, by difficulty.
    pub ai_search_seconds: HistogramVec,
}

impl EngineMetrics {
    /// Create metrics and register them with the given prometheus registry.
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let metrics = Self::build()?;
        registry.register(Box::new(metrics.active_sessions.clone()))?;
        registry.register(Box::new(metrics.moves_total.clone()))?;
        registry.register(Box::new(metrics.cache_hits.clone()))?;
        registry.register(Box::new(metrics.cache_misses.clone()))?;
        registry.register(Box::new(metrics.events_flushed.clone()))?;
        registry.register(Box::new(metrics.ai_search_seconds.clone()))?;
        Ok(metrics)
    }

    /// Create metrics without registering (for tests and embedded use).
    ///
    /// Infallible in practice: `build` only fails on an invalid metric name
    /// or label, and every name and label here is a constant.
    pub fn unregistered() -> Self {
        Self::build().expect("valid metric definitions")
    }

    fn build() -> Result<Self, prometheus::Error> {
        Ok(Self {
            active_sessions: IntGauge::with_opts(Opts::new(
                "chess_active_sessions",
                "Number of live game rooms",
            ))?,
            moves_total: IntCounter::with_opts(Opts::new(
                "chess_moves_total",
                "Moves accepted across all rooms",
            ))?,
            cache_hits: IntCounter::with_opts(Opts::new(
                "chess_cache_hits_total",
                "Position cache hits",
            ))?,
            cache_misses: IntCounter::with_opts(Opts::new(
                "chess_cache_misses_total",
                "Position cache misses",
            ))?,
            events_flushed: IntCounter::with_opts(Opts::new(
                "chess_events_flushed_total",
                "Game events delivered to the sink",
            ))?,
            ai_search_seconds: HistogramVec::new(
                HistogramOpts::new(
                    "chess_ai_search_seconds",
                    "Time spent choosing a computer move",
                )
                .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0]),
                &["difficulty"],
            )?,
        })
    }

    /// Histogram for one difficulty tier.
    pub fn search_timer(&self, difficulty: &str) -> Histogram {
        self.ai_search_seconds.with_label_values(&[difficulty])
    }
}

impl std::fmt::Debug for EngineMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineMetrics")
            .field("active_sessions", &self.active_sessions.get())
            .field("moves_total", &self.moves_total.get())
            .finish_non_exhaustive()
    }
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::unregistered()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unregistered_metrics_work() {
        let m = EngineMetrics::unregistered();
        m.active_sessions.set(3);
        m.moves_total.inc();
        m.search_timer("hard").observe(0.5);
        assert_eq!(m.active_sessions.get(), 3);
        assert_eq!(m.moves_total.get(), 1);
        assert_eq!(m.ai_search_seconds.with_label_values(&["hard"]).get_sample_count(), 1);
    }

    #[test]
    fn registered_metrics_reject_double_registration() {
        let registry = Registry::new();
        assert!(EngineMetrics::new(&registry).is_ok());
        assert!(EngineMetrics::new(&registry).is_err());
    }
}
