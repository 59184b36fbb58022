//! Computer opponent: evaluation, search and analysis.

mod analysis;
mod evaluator;
mod search;
mod tables;

pub use analysis::{Advice, AnalysisReport, PositionAnalyzer};
pub use evaluator::{EvalWeights, Evaluation, Evaluator};
pub use search::{DEFAULT_DEPTH, Difficulty, MAX_DEPTH, SearchEngine, SearchResult};
pub use tables::piece_square_value;
