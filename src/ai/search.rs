//! Computer opponent: random, greedy and alpha-beta move selection.

use super::evaluator::Evaluator;
use crate::cache::PositionCache;
use crate::chess::{Move, MoveRules, Position};
use crate::error::GameError;
use crate::metrics::EngineMetrics;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Default search depth for the hard tier, in plies.
pub const DEFAULT_DEPTH: u32 = 3;

/// Deepest hard-tier search the engine will run, in plies.
pub const MAX_DEPTH: u32 = 4;

/// How hard the computer tries.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Difficulty {
    /// Uniformly random legal move.
    Easy,
    /// Best move after one ply by static evaluation.
    #[default]
    Medium,
    /// Alpha-beta search to the configured depth.
    Hard,
}

/// Outcome of a search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SearchResult {
    /// Chosen move.
    pub best_move: Move,
    /// Its score from the mover's perspective.
    pub score: f64,
}

/// Picks moves for a computer participant.
///
/// Results depend only on the position, difficulty, depth and (for the easy
/// tier) the seeded random source. The cache only changes latency.
#[derive(Debug)]
pub struct SearchEngine {
    rules: Arc<dyn MoveRules>,
    evaluator: Evaluator,
    cache: Option<Arc<PositionCache>>,
    depth: u32,
    rng: Mutex<StdRng>,
    metrics: EngineMetrics,
}

impl SearchEngine {
    /// Engine searching `depth` plies on the hard tier, without a cache.
    ///
    /// `depth` is clamped to `1..=MAX_DEPTH`.
    pub fn new(rules: Arc<dyn MoveRules>, depth: u32) -> Self {
        let clamped = depth.clamp(1, MAX_DEPTH);
        if clamped != depth {
            warn!(requested = depth, depth = clamped, "Search depth out of range, clamping");
        }
        Self {
            evaluator: Evaluator::new(Arc::clone(&rules)),
            rules,
            cache: None,
            depth: clamped,
            rng: Mutex::new(StdRng::from_os_rng()),
            metrics: EngineMetrics::unregistered(),
        }
    }

    /// Memoises static evaluations in `cache`.
    pub fn with_cache(mut self, cache: Arc<PositionCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Seeds the easy tier's random source.
    pub fn with_seed(self, seed: u64) -> Self {
        *self.rng.lock() = StdRng::seed_from_u64(seed);
        self
    }

    /// Replaces the evaluator.
    pub fn with_evaluator(mut self, evaluator: Evaluator) -> Self {
        self.evaluator = evaluator;
        self
    }

    /// Records search timings in `metrics`.
    pub fn with_metrics(mut self, metrics: EngineMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    /// Hard-tier depth.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// The evaluator used at leaves.
    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    /// Chooses a move for the side to move.
    ///
    /// Returns [`GameError::NoLegalMoves`] when the game is already over.
    #[instrument(skip(self, position), fields(fen = %position))]
    pub fn best_move(&self, position: &Position, difficulty: Difficulty) -> Result<Move, GameError> {
        let _timer = self
            .metrics
            .search_timer(&difficulty.to_string())
            .start_timer();

        let moves = self.rules.legal_moves(position);
        if moves.is_empty() {
            debug!("No legal moves available");
            return Err(GameError::NoLegalMoves);
        }

        let chosen = match difficulty {
            Difficulty::Easy => {
                let idx = self.rng.lock().random_range(0..moves.len());
                moves[idx]
            }
            Difficulty::Medium => self.greedy(position, &moves)?.best_move,
            Difficulty::Hard => self.search(position, self.depth)?.best_move,
        };
        debug!(chosen = %chosen, "Selected move");
        Ok(chosen)
    }

    /// Alpha-beta negamax to `depth` plies, clamped to `1..=MAX_DEPTH`.
    ///
    /// Ties go to the earliest move in the oracle's enumeration order.
    #[instrument(skip(self, position), fields(fen = %position))]
    pub fn search(&self, position: &Position, depth: u32) -> Result<SearchResult, GameError> {
        let moves = self.rules.legal_moves(position);
        let first = *moves.first().ok_or(GameError::NoLegalMoves)?;
        let depth = depth.clamp(1, MAX_DEPTH);

        let mut best = SearchResult {
            best_move: first,
            score: f64::NEG_INFINITY,
        };
        let mut alpha = f64::NEG_INFINITY;
        let beta = f64::INFINITY;

        for mv in moves {
            let child = self.rules.apply(position, &mv)?;
            let score = -self.negamax(&child, depth - 1, -beta, -alpha);
            if score > best.score {
                best = SearchResult {
                    best_move: mv,
                    score,
                };
            }
            alpha = alpha.max(score);
        }

        debug!(best = %best.best_move, score = best.score, depth, "Search complete");
        Ok(best)
    }

    fn greedy(&self, position: &Position, moves: &[Move]) -> Result<SearchResult, GameError> {
        let first = *moves.first().ok_or(GameError::NoLegalMoves)?;
        let mut best = SearchResult {
            best_move: first,
            score: f64::NEG_INFINITY,
        };
        for mv in moves {
            let child = self.rules.apply(position, mv)?;
            let score = -self.static_eval(&child);
            if score > best.score {
                best = SearchResult {
                    best_move: *mv,
                    score,
                };
            }
        }
        Ok(best)
    }

    fn negamax(&self, position: &Position, depth: u32, mut alpha: f64, beta: f64) -> f64 {
        if depth == 0 || self.rules.status(position).is_terminal() {
            return self.static_eval(position);
        }

        let mut best = f64::NEG_INFINITY;
        for mv in self.rules.legal_moves(position) {
            let Ok(child) = self.rules.apply(position, &mv) else {
                continue;
            };
            let score = -self.negamax(&child, depth - 1, -beta, -alpha);
            if score > best {
                best = score;
            }
            if best > alpha {
                alpha = best;
            }
            if alpha >= beta {
                break;
            }
        }
        best
    }

    fn static_eval(&self, position: &Position) -> f64 {
        let Some(cache) = &self.cache else {
            return self.evaluator.evaluate(position);
        };
        if let Some(score) = cache.get(position.key()) {
            return score;
        }
        let score = self.evaluator.evaluate(position);
        cache.set(position.key(), score);
        score
    }
}
