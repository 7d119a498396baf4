//! Live posterior and per-session question bookkeeping.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use thiserror::Error;

use crate::kb::KnowledgeBase;

/// Allowed drift of the total mass away from one after any mutation.
pub const NORMALIZATION_TOLERANCE: f64 = 1e-9;

/// Returned when reweighting would leave no probability mass at all. The
/// belief is not modified in that case.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("reweighting left a total mass of {total}")]
pub struct DegenerateUpdate {
    pub total: f64,
}

/// Probability per entity (knowledge-base order) plus which questions this
/// session has consumed.
#[derive(Debug, Clone, PartialEq)]
pub struct BeliefState {
    probs: Vec<f64>,
    asked: Vec<bool>,
    skipped: Vec<bool>,
    turns: usize,
}

impl BeliefState {
    /// Seeds the belief with the knowledge-base priors.
    pub fn from_priors(kb: &KnowledgeBase) -> Self {
        Self {
            probs: kb.priors(),
            asked: vec![false; kb.question_count()],
            skipped: vec![false; kb.question_count()],
            turns: 0,
        }
    }

    /// Builds a belief from raw parts, renormalizing the weights. Returns
    /// `None` for a weight vector without positive mass.
    pub fn from_parts(
        weights: Vec<f64>,
        asked: Vec<bool>,
        skipped: Vec<bool>,
        turns: usize,
    ) -> Option<Self> {
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return None;
        }
        let mut state = Self {
            probs: weights,
            asked,
            skipped,
            turns,
        };
        state.renormalize().ok()?;
        Some(state)
    }

    pub fn reset(&mut self, kb: &KnowledgeBase) {
        *self = Self::from_priors(kb);
    }

    pub fn probs(&self) -> &[f64] {
        &self.probs
    }

    pub fn prob(&self, entity: usize) -> f64 {
        self.probs[entity]
    }

    pub fn len(&self) -> usize {
        self.probs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probs.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.probs.iter().sum()
    }

    /// Turns consumed so far, skipped answers included.
    pub fn turns(&self) -> usize {
        self.turns
    }

    pub fn is_asked(&self, question: usize) -> bool {
        self.asked[question]
    }

    pub fn is_skipped(&self, question: usize) -> bool {
        self.skipped[question]
    }

    pub fn asked_mask(&self) -> &[bool] {
        &self.asked
    }

    pub fn skipped_mask(&self) -> &[bool] {
        &self.skipped
    }

    pub fn asked_count(&self) -> usize {
        self.asked.iter().filter(|asked| **asked).count()
    }

    /// Records a turn whose answer reweighted the belief.
    pub fn mark_asked(&mut self, question: usize) {
        self.asked[question] = true;
        self.skipped[question] = false;
        self.turns += 1;
    }

    /// Records a turn answered with "unknown". The question stays eligible.
    pub fn mark_skipped(&mut self, question: usize) {
        if !self.asked[question] {
            self.skipped[question] = true;
        }
        self.turns += 1;
    }

    /// Highest-probability entity; ties go to the earliest index.
    pub fn top(&self) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        for (idx, p) in self.probs.iter().copied().enumerate() {
            if best.is_none_or(|(_, top)| p > top) {
                best = Some((idx, p));
            }
        }
        best
    }

    /// Up to `k` entities in descending probability, ties in index order.
    pub fn ranked(&self, k: usize) -> Vec<(usize, f64)> {
        let mut order: Vec<(usize, f64)> = self.probs.iter().copied().enumerate().collect();
        order.sort_by(|a, b| b.1.total_cmp(&a.1));
        order.truncate(k);
        order
    }

    /// Number of entities whose probability is at least `floor`.
    pub fn candidates_above(&self, floor: f64) -> usize {
        self.probs.iter().filter(|p| **p >= floor).count()
    }

    /// Multiplies every entry by its multiplier and renormalizes. The product
    /// is computed on a scratch copy and committed only when it has mass.
    pub fn apply_multipliers(&mut self, multipliers: &[f64]) -> Result<(), DegenerateUpdate> {
        debug_assert_eq!(multipliers.len(), self.probs.len());
        let scratch: Vec<f64> = self
            .probs
            .iter()
            .zip(multipliers)
            .map(|(p, m)| p * m)
            .collect();
        let total: f64 = scratch.iter().sum();
        if !(total.is_finite() && total > 0.0) {
            return Err(DegenerateUpdate { total });
        }
        self.probs = scratch.into_iter().map(|p| p / total).collect();
        Ok(())
    }

    /// Scales one entry, renormalizes, then lifts that entry to `floor` if
    /// rounding pushed it below.
    pub fn scale_entity(
        &mut self,
        entity: usize,
        factor: f64,
        floor: f64,
    ) -> Result<(), DegenerateUpdate> {
        let mut multipliers = vec![1.0; self.probs.len()];
        multipliers[entity] = factor;
        self.apply_multipliers(&multipliers)?;
        if self.probs[entity] < floor {
            self.probs[entity] = floor;
            self.renormalize()?;
        }
        Ok(())
    }

    fn renormalize(&mut self) -> Result<(), DegenerateUpdate> {
        let total: f64 = self.probs.iter().sum();
        if !(total.is_finite() && total > 0.0) {
            return Err(DegenerateUpdate { total });
        }
        for p in &mut self.probs {
            *p /= total;
        }
        Ok(())
    }

    /// Hash over the exact belief bits and question masks; identical inputs to
    /// the selector hash identically.
    pub fn summary_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        for p in &self.probs {
            p.to_bits().hash(&mut hasher);
        }
        self.asked.hash(&mut hasher);
        self.skipped.hash(&mut hasher);
        hasher.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kb::fixtures::four_way;

    #[test]
    fn starts_from_priors() {
        let belief = BeliefState::from_priors(&four_way());
        assert_eq!(belief.probs(), &[0.25; 4]);
        assert_eq!(belief.turns(), 0);
        assert_eq!(belief.asked_count(), 0);
    }

    #[test]
    fn multipliers_renormalize() {
        let mut belief = BeliefState::from_priors(&four_way());
        belief.apply_multipliers(&[0.9, 0.1, 0.1, 0.1]).unwrap();
        assert!((belief.prob(0) - 0.75).abs() < 1e-12);
        assert!((belief.total() - 1.0).abs() < NORMALIZATION_TOLERANCE);
    }

    #[test]
    fn zero_mass_is_rejected_without_mutation() {
        let mut belief = BeliefState::from_priors(&four_way());
        let before = belief.clone();
        let err = belief.apply_multipliers(&[0.0; 4]).unwrap_err();
        assert_eq!(err.total, 0.0);
        assert_eq!(belief, before);
    }

    #[test]
    fn skipping_keeps_question_eligible() {
        let mut belief = BeliefState::from_priors(&four_way());
        belief.mark_skipped(1);
        assert!(!belief.is_asked(1));
        assert!(belief.is_skipped(1));
        assert_eq!(belief.turns(), 1);

        belief.mark_asked(1);
        assert!(belief.is_asked(1));
        assert!(!belief.is_skipped(1));
        assert_eq!(belief.turns(), 2);
    }

    #[test]
    fn ties_resolve_to_catalog_order() {
        let belief = BeliefState::from_priors(&four_way());
        assert_eq!(belief.top(), Some((0, 0.25)));
        let ranked: Vec<usize> = belief.ranked(3).into_iter().map(|(idx, _)| idx).collect();
        assert_eq!(ranked, vec![0, 1, 2]);
    }

    #[test]
    fn scaled_entity_respects_floor() {
        let mut belief = BeliefState::from_priors(&four_way());
        belief.scale_entity(2, 1e-320, f64::MIN_POSITIVE).unwrap();
        assert!(belief.prob(2) > 0.0);
        assert!((belief.total() - 1.0).abs() < NORMALIZATION_TOLERANCE);
    }

    #[test]
    fn hash_tracks_belief_changes() {
        let mut belief = BeliefState::from_priors(&four_way());
        let before = belief.summary_hash();
        assert_eq!(before, belief.clone().summary_hash());
        belief.apply_multipliers(&[2.0, 1.0, 1.0, 1.0]).unwrap();
        assert_ne!(before, belief.summary_hash());
    }
}
