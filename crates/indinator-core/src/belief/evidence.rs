//! Every answer, however it was expressed, becomes one multiplier per entity.

use crate::model::answer::{Answer, Confidence, Outcome};
use crate::model::likelihood::OutcomeDistribution;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Evidence {
    /// The answer affirms (or denies) the question with the given confidence.
    Directional {
        affirmative: bool,
        confidence: Confidence,
    },
    /// A raw outcome looked up directly in the likelihood table.
    Outcome(Outcome),
    /// "Unknown": consumes a turn, changes nothing.
    Skip,
}

impl Evidence {
    pub fn from_answer(answer: Answer, confidence: Option<Confidence>) -> Self {
        match (answer.direction(), confidence) {
            (Some(affirmative), Some(confidence)) => Evidence::Directional {
                affirmative,
                confidence,
            },
            _ => Evidence::Skip,
        }
    }

    pub fn is_skip(&self) -> bool {
        matches!(self, Evidence::Skip)
    }

    /// Likelihood of this evidence for one entity's row.
    pub fn likelihood(&self, row: &OutcomeDistribution) -> f64 {
        match *self {
            Evidence::Directional {
                affirmative,
                confidence,
            } => match row.leaning() {
                Some(leans_yes) if leans_yes == affirmative => confidence.correct,
                Some(_) => confidence.incorrect,
                None => confidence.midpoint(),
            },
            Evidence::Outcome(outcome) => row.prob(outcome),
            Evidence::Skip => 1.0,
        }
    }

    /// Multipliers for a full question row, `None` when the evidence is a skip.
    pub fn multipliers(&self, row: &[OutcomeDistribution]) -> Option<Vec<f64>> {
        if self.is_skip() {
            return None;
        }
        Some(row.iter().map(|cell| self.likelihood(cell)).collect())
    }
}
