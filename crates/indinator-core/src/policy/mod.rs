//! Stop-and-guess decisions.

use serde::{Deserialize, Serialize};

use crate::belief::BeliefState;
use crate::config::EngineConfig;
use crate::model::entity::EntityId;
use crate::model::question::QuestionId;

/// Session lifecycle: `Asking → Guessing → Asking | Solved | GaveUp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Asking,
    Guessing,
    Solved,
    GaveUp,
}

impl Phase {
    pub const fn is_finished(self) -> bool {
        matches!(self, Phase::Solved | Phase::GaveUp)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Guess {
    pub entity: EntityId,
    pub name: String,
    pub probability: f64,
    /// Made because nothing was left to ask or the budget ran out.
    pub forced: bool,
}

/// What the caller should present next.
#[derive(Debug, Clone, PartialEq)]
pub enum Turn {
    Ask(QuestionId),
    Guess(Guess),
}

/// Result of scoring a guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackOutcome {
    Solved,
    Continue,
    GaveUp,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GuessPolicy {
    pub threshold: f64,
    pub min_questions: usize,
    pub max_questions: usize,
}

impl GuessPolicy {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            threshold: config.guess_threshold,
            min_questions: config.min_questions,
            max_questions: config.max_questions,
        }
    }

    /// True once the leader reaches `threshold` and the minimum number of
    /// turns has been played.
    pub fn should_guess(&self, belief: &BeliefState, threshold: f64) -> bool {
        belief.turns() >= self.min_questions
            && belief.top().is_some_and(|(_, p)| p >= threshold)
    }

    pub fn budget_exhausted(&self, belief: &BeliefState) -> bool {
        belief.turns() >= self.max_questions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kb::fixtures::four_way;

    fn policy(min_questions: usize) -> GuessPolicy {
        GuessPolicy {
            threshold: 0.7,
            min_questions,
            max_questions: 3,
        }
    }

    #[test]
    fn threshold_gates_guessing() {
        let mut belief = BeliefState::from_priors(&four_way());
        assert!(!policy(0).should_guess(&belief, 0.7));
        belief.apply_multipliers(&[0.9, 0.1, 0.1, 0.1]).unwrap();
        assert!(policy(0).should_guess(&belief, 0.7));
        assert!(!policy(0).should_guess(&belief, 0.8));
    }

    #[test]
    fn minimum_turns_hold_back_early_guesses() {
        let mut belief = BeliefState::from_priors(&four_way());
        belief.apply_multipliers(&[0.99, 0.001, 0.001, 0.001]).unwrap();
        assert!(!policy(1).should_guess(&belief, 0.7));
        belief.mark_asked(0);
        assert!(policy(1).should_guess(&belief, 0.7));
    }

    #[test]
    fn budget_counts_skipped_turns() {
        let mut belief = BeliefState::from_priors(&four_way());
        for _ in 0..3 {
            belief.mark_skipped(2);
        }
        assert!(policy(0).budget_exhausted(&belief));
    }
}
