use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};

use crate::config::TargetMode;
use indinator_core::KnowledgeBase;

/// Picks the hidden entity for each game.
pub enum TargetSchedule {
    RoundRobin { count: usize },
    Prior(WeightedIndex<f64>),
}

impl TargetSchedule {
    /// `None` when the priors cannot be sampled from.
    pub fn new(mode: TargetMode, kb: &KnowledgeBase) -> Option<Self> {
        match mode {
            TargetMode::RoundRobin => Some(TargetSchedule::RoundRobin {
                count: kb.entity_count(),
            }),
            TargetMode::Prior => WeightedIndex::new(kb.priors()).ok().map(TargetSchedule::Prior),
        }
    }

    pub fn pick<R: Rng + ?Sized>(&self, game_index: usize, rng: &mut R) -> usize {
        match self {
            TargetSchedule::RoundRobin { count } => game_index % count,
            TargetSchedule::Prior(weights) => weights.sample(rng),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indinator_core::kb::loader::{LikelihoodDocument, build, parse_questions};
    use indinator_core::kb::{EntityRecord, LikelihoodSource};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn kb(priors: [f64; 3]) -> KnowledgeBase {
        let records = ["x", "y", "z"]
            .iter()
            .zip(priors)
            .map(|(id, prior)| EntityRecord::new(*id, *id, Some(prior)))
            .collect();
        build(
            records,
            parse_questions("[]").unwrap(),
            LikelihoodSource::Table(LikelihoodDocument::new()),
        )
        .unwrap()
    }

    #[test]
    fn round_robin_cycles_through_entities() {
        let schedule = TargetSchedule::new(TargetMode::RoundRobin, &kb([1.0; 3])).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let picks: Vec<usize> = (0..5).map(|game| schedule.pick(game, &mut rng)).collect();
        assert_eq!(picks, vec![0, 1, 2, 0, 1]);
    }

    #[test]
    fn prior_sampling_never_picks_weightless_entities() {
        let schedule = TargetSchedule::new(TargetMode::Prior, &kb([0.0, 1.0, 3.0])).unwrap();
        let mut rng = StdRng::seed_from_u64(9);
        assert!((0..200).all(|game| schedule.pick(game, &mut rng) != 0));
    }
}
