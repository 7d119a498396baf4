//! Likelihood table P(outcome | entity, question) and the trait model used to
//! generate one from boolean trait flags.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::answer::Outcome;

/// Tolerance within which a row is accepted as already normalized.
pub const DISTRIBUTION_EPSILON: f64 = 1e-6;
/// Rows further than this from 1 are rejected instead of renormalized.
pub const DISTRIBUTION_REPAIR_LIMIT: f64 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutcomeDistribution {
    pub yes: f64,
    pub no: f64,
    #[serde(alias = "unknown")]
    pub maybe: f64,
}

impl OutcomeDistribution {
    pub const fn new(yes: f64, no: f64, maybe: f64) -> Self {
        Self { yes, no, maybe }
    }

    pub const fn prob(&self, outcome: Outcome) -> f64 {
        match outcome {
            Outcome::Yes => self.yes,
            Outcome::No => self.no,
            Outcome::Maybe => self.maybe,
        }
    }

    pub fn total(&self) -> f64 {
        self.yes + self.no + self.maybe
    }

    /// Returns the row scaled to sum to one, or `None` if it is negative,
    /// non-finite, or too far from normalized to be a rounding artifact.
    pub fn normalized(&self) -> Option<Self> {
        let values = [self.yes, self.no, self.maybe];
        if values.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return None;
        }
        let total = self.total();
        if (total - 1.0).abs() <= DISTRIBUTION_EPSILON {
            return Some(*self);
        }
        if (total - 1.0).abs() > DISTRIBUTION_REPAIR_LIMIT {
            return None;
        }
        Some(Self::new(self.yes / total, self.no / total, self.maybe / total))
    }

    /// Direction this row leans: `Some(true)` when "yes" outweighs "no".
    pub fn leaning(&self) -> Option<bool> {
        if self.yes > self.no {
            Some(true)
        } else if self.no > self.yes {
            Some(false)
        } else {
            None
        }
    }

    /// Most likely outcome; ties resolve in `Outcome::ALL` order.
    pub fn most_likely(&self) -> Outcome {
        let mut best = Outcome::Yes;
        for outcome in Outcome::ALL {
            if self.prob(outcome) > self.prob(best) {
                best = outcome;
            }
        }
        best
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Outcome {
        let total = self.total();
        if total <= 0.0 {
            return Outcome::Maybe;
        }
        let mut roll = rng.gen_range(0.0..total);
        for outcome in Outcome::ALL {
            let p = self.prob(outcome);
            if roll < p {
                return outcome;
            }
            roll -= p;
        }
        Outcome::Maybe
    }
}

/// Dense table stored question-major so a selector scan over one question reads
/// a contiguous row of entities.
#[derive(Debug, Clone, PartialEq)]
pub struct LikelihoodTable {
    entity_count: usize,
    question_count: usize,
    cells: Vec<OutcomeDistribution>,
}

impl LikelihoodTable {
    pub fn filled(
        entity_count: usize,
        question_count: usize,
        value: OutcomeDistribution,
    ) -> Self {
        Self {
            entity_count,
            question_count,
            cells: vec![value; entity_count * question_count],
        }
    }

    pub fn entity_count(&self) -> usize {
        self.entity_count
    }

    pub fn question_count(&self) -> usize {
        self.question_count
    }

    pub fn get(&self, question: usize, entity: usize) -> &OutcomeDistribution {
        &self.cells[question * self.entity_count + entity]
    }

    pub fn set(&mut self, question: usize, entity: usize, value: OutcomeDistribution) {
        self.cells[question * self.entity_count + entity] = value;
    }

    pub fn row(&self, question: usize) -> &[OutcomeDistribution] {
        let start = question * self.entity_count;
        &self.cells[start..start + self.entity_count]
    }
}

/// Rows emitted for entities that have, lack, or are agnostic to a trait.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TraitModel {
    pub matched: OutcomeDistribution,
    pub opposite: OutcomeDistribution,
    pub neutral: OutcomeDistribution,
}

impl Default for TraitModel {
    fn default() -> Self {
        Self {
            matched: OutcomeDistribution::new(0.85, 0.05, 0.10),
            opposite: OutcomeDistribution::new(0.05, 0.85, 0.10),
            neutral: OutcomeDistribution::new(0.33, 0.33, 0.34),
        }
    }
}

impl TraitModel {
    /// `None` means the question carries no trait to compare against.
    pub fn distribution(&self, has_trait: Option<bool>) -> OutcomeDistribution {
        match has_trait {
            Some(true) => self.matched,
            Some(false) => self.opposite,
            None => self.neutral,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    #[test]
    fn near_normalized_rows_are_repaired() {
        let row = OutcomeDistribution::new(0.3334, 0.3333, 0.3334);
        let fixed = row.normalized().expect("repairable");
        assert!((fixed.total() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn far_from_normalized_rows_are_rejected() {
        assert!(OutcomeDistribution::new(0.5, 0.5, 0.5).normalized().is_none());
        assert!(OutcomeDistribution::new(1.1, -0.1, 0.0).normalized().is_none());
    }

    #[test]
    fn leaning_follows_yes_versus_no() {
        assert_eq!(TraitModel::default().matched.leaning(), Some(true));
        assert_eq!(TraitModel::default().opposite.leaning(), Some(false));
        assert_eq!(TraitModel::default().neutral.leaning(), None);
    }

    #[test]
    fn sampling_respects_point_masses() {
        let mut rng = SmallRng::seed_from_u64(7);
        let row = OutcomeDistribution::new(0.0, 1.0, 0.0);
        for _ in 0..32 {
            assert_eq!(row.sample(&mut rng), Outcome::No);
        }
    }

    #[test]
    fn table_rows_are_question_major() {
        let mut table = LikelihoodTable::filled(3, 2, TraitModel::default().neutral);
        let marked = OutcomeDistribution::new(1.0, 0.0, 0.0);
        table.set(1, 2, marked);
        assert_eq!(table.row(1)[2], marked);
        assert_eq!(*table.get(0, 2), TraitModel::default().neutral);
    }
}
