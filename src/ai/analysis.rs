//! Human-readable position reports.

use super::evaluator::{Evaluation, Evaluator};
use crate::chess::{DrawRule, MoveRules, Position, PositionStatus, Side};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Margin, in pawns, beyond which one side is considered clearly better.
const CLEAR_ADVANTAGE: f64 = 2.0;

/// What the side to move should aim for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
pub enum Advice {
    /// Ahead: trade down and convert.
    #[strum(to_string = "Use the material advantage; simplify through exchanges")]
    PressAdvantage,
    /// Behind: look for tactics.
    #[strum(to_string = "Look for tactical chances; pressure weak points")]
    SeekCounterplay,
    /// Roughly level.
    #[strum(to_string = "Improve piece placement; fight for the centre")]
    ImprovePieces,
}

/// Structured analysis of one position.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    /// Canonical notation of the analysed position.
    pub fen: String,
    /// Side to move.
    pub side_to_move: Side,
    /// Oracle status.
    pub status: PositionStatus,
    /// Evaluation terms, from the mover's perspective.
    pub evaluation: Evaluation,
    /// Suggested plan; absent once the game is over.
    pub advice: Option<Advice>,
}

impl fmt::Display for AnalysisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            PositionStatus::Checkmate => {
                return write!(f, "Checkmate. {} wins.", self.side_to_move.opponent());
            }
            PositionStatus::Stalemate => return write!(f, "Stalemate. Draw."),
            PositionStatus::Draw(DrawRule::FiftyMoves) => {
                return write!(f, "Draw by the fifty-move rule.");
            }
            PositionStatus::Draw(DrawRule::InsufficientMaterial) => {
                return write!(f, "Draw by insufficient material.");
            }
            PositionStatus::Normal | PositionStatus::Check => {}
        }

        writeln!(f, "Position: {}", self.fen)?;
        writeln!(f, "To move: {}", self.side_to_move)?;
        if self.status.is_check() {
            writeln!(f, "In check")?;
        }
        let e = &self.evaluation;
        writeln!(f, "Evaluation: {:.2}", e.total())?;
        writeln!(f, "  material:       {:.2}", e.material())?;
        writeln!(f, "  placement:      {:.2}", e.placement())?;
        writeln!(f, "  pawn structure: {:.2}", e.pawn_structure())?;
        writeln!(f, "  king safety:    {:.2}", e.king_safety())?;
        writeln!(f, "  mobility:       {:.2}", e.mobility())?;
        if let Some(advice) = self.advice {
            write!(f, "Plan: {advice}")?;
        }
        Ok(())
    }
}

/// Produces [`AnalysisReport`]s.
#[derive(Debug, Clone)]
pub struct PositionAnalyzer {
    rules: Arc<dyn MoveRules>,
    evaluator: Evaluator,
}

impl PositionAnalyzer {
    /// Analyzer with the default evaluator.
    pub fn new(rules: Arc<dyn MoveRules>) -> Self {
        Self {
            evaluator: Evaluator::new(Arc::clone(&rules)),
            rules,
        }
    }

    /// Analyses `position`.
    pub fn analyze(&self, position: &Position) -> AnalysisReport {
        let status = self.rules.status(position);
        let evaluation = self.evaluator.breakdown(position);
        let advice = (!status.is_terminal()).then(|| advise(*evaluation.total()));
        AnalysisReport {
            fen: self.rules.serialize(position),
            side_to_move: position.side_to_move(),
            status,
            evaluation,
            advice,
        }
    }
}

fn advise(score: f64) -> Advice {
    if score > CLEAR_ADVANTAGE {
        Advice::PressAdvantage
    } else if score < -CLEAR_ADVANTAGE {
        Advice::SeekCounterplay
    } else {
        Advice::ImprovePieces
    }
}
