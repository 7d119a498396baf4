//! Expected-information-gain question selection.
//!
//! `gain(q) = H(belief) - Σ_a P(a) · H(belief | a)` over the outcomes
//! `{yes, no, maybe}`. Cost is `O(questions · outcomes · entities)` per call,
//! so sessions memoize the last choice through [`SelectionCache`].

mod cache;

pub use cache::SelectionCache;

use serde::Serialize;
use tracing::trace;

use crate::belief::{BeliefState, entropy};
use crate::kb::KnowledgeBase;
use crate::model::answer::Outcome;
use crate::model::likelihood::OutcomeDistribution;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoredQuestion {
    pub index: usize,
    pub gain: f64,
}

/// Expected entropy of the posterior after asking a question whose per-entity
/// likelihoods are `row`.
pub fn expected_entropy(probs: &[f64], row: &[OutcomeDistribution]) -> f64 {
    let mut expected = 0.0;
    let mut posterior = vec![0.0; probs.len()];
    for outcome in Outcome::ALL {
        let mut p_outcome = 0.0;
        for (slot, (p, cell)) in posterior.iter_mut().zip(probs.iter().zip(row)) {
            *slot = p * cell.prob(outcome);
            p_outcome += *slot;
        }
        if p_outcome <= 0.0 {
            continue;
        }
        for slot in posterior.iter_mut() {
            *slot /= p_outcome;
        }
        expected += p_outcome * entropy(&posterior);
    }
    expected
}

pub fn information_gain(probs: &[f64], row: &[OutcomeDistribution]) -> f64 {
    entropy(probs) - expected_entropy(probs, row)
}

/// Scores every eligible question in catalog order. Questions the player
/// skipped are only scored once nothing else is left.
pub fn score_questions(belief: &BeliefState, kb: &KnowledgeBase) -> Vec<ScoredQuestion> {
    let current = entropy(belief.probs());
    let score = |q: usize| ScoredQuestion {
        index: q,
        gain: current - expected_entropy(belief.probs(), kb.likelihoods().row(q)),
    };

    let fresh: Vec<ScoredQuestion> = (0..kb.question_count())
        .filter(|q| !belief.is_asked(*q) && !belief.is_skipped(*q))
        .map(score)
        .collect();
    if !fresh.is_empty() {
        return fresh;
    }
    (0..kb.question_count())
        .filter(|q| !belief.is_asked(*q))
        .map(score)
        .collect()
}

/// Index of the most informative eligible question, or `None` when every
/// question has been asked. Ties keep the earliest question.
pub fn select_best_question(belief: &BeliefState, kb: &KnowledgeBase) -> Option<usize> {
    let mut best: Option<ScoredQuestion> = None;
    for candidate in score_questions(belief, kb) {
        if best.is_none_or(|top| candidate.gain > top.gain) {
            best = Some(candidate);
        }
    }
    if let Some(best) = best {
        trace!(
            target: "indinator::select",
            question = %kb.question(best.index).id,
            gain = best.gain,
            "selected question"
        );
    }
    best.map(|scored| scored.index)
}

/// Top `k` eligible questions by gain, ties in catalog order.
pub fn rank_questions(belief: &BeliefState, kb: &KnowledgeBase, k: usize) -> Vec<ScoredQuestion> {
    let mut scored = score_questions(belief, kb);
    scored.sort_by(|a, b| b.gain.total_cmp(&a.gain));
    scored.truncate(k);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kb::fixtures::four_way;

    #[test]
    fn prefers_the_even_split() {
        let kb = four_way();
        let belief = BeliefState::from_priors(&kb);
        assert_eq!(select_best_question(&belief, &kb), kb.question_index("ab"));
    }

    #[test]
    fn uninformative_question_has_no_gain() {
        let kb = four_way();
        let belief = BeliefState::from_priors(&kb);
        let flat = kb.question_index("flat").unwrap();
        let gain = information_gain(belief.probs(), kb.likelihoods().row(flat));
        assert!(gain.abs() < 1e-12);
    }

    #[test]
    fn gain_is_bounded_by_current_entropy() {
        let kb = four_way();
        let belief = BeliefState::from_priors(&kb);
        for scored in score_questions(&belief, &kb) {
            assert!(scored.gain >= -1e-12);
            assert!(scored.gain <= entropy(belief.probs()) + 1e-12);
        }
    }

    #[test]
    fn selection_is_deterministic() {
        let kb = four_way();
        let mut belief = BeliefState::from_priors(&kb);
        belief.apply_multipliers(&[0.5, 0.2, 0.2, 0.1]).unwrap();
        let first = select_best_question(&belief, &kb);
        for _ in 0..10 {
            assert_eq!(select_best_question(&belief, &kb), first);
        }
    }

    #[test]
    fn exhausted_catalog_returns_none() {
        let kb = four_way();
        let mut belief = BeliefState::from_priors(&kb);
        for q in 0..kb.question_count() {
            belief.mark_asked(q);
        }
        assert_eq!(select_best_question(&belief, &kb), None);
        assert!(rank_questions(&belief, &kb, 5).is_empty());
    }

    #[test]
    fn skipped_questions_wait_until_others_are_used() {
        let kb = four_way();
        let mut belief = BeliefState::from_priors(&kb);
        let ab = kb.question_index("ab").unwrap();
        belief.mark_skipped(ab);
        assert_ne!(select_best_question(&belief, &kb), Some(ab));

        for q in 0..kb.question_count() {
            if q != ab {
                belief.mark_asked(q);
            }
        }
        assert_eq!(select_best_question(&belief, &kb), Some(ab));
    }

    #[test]
    fn ranking_orders_by_gain() {
        let kb = four_way();
        let belief = BeliefState::from_priors(&kb);
        let ranked = rank_questions(&belief, &kb, 3);
        assert_eq!(ranked.len(), 3);
        assert!(ranked.windows(2).all(|w| w[0].gain >= w[1].gain));
        assert_eq!(ranked[0].index, kb.question_index("ab").unwrap());
    }
}
