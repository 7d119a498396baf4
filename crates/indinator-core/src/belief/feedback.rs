//! Reinforcement applied after the player scores a guess.

use super::BeliefState;
use crate::error::EngineError;

/// Multiplies one entity's probability by `factor > 1` and renormalizes.
pub fn boost(belief: &mut BeliefState, entity: usize, factor: f64) -> Result<(), EngineError> {
    if !(factor.is_finite() && factor > 1.0) {
        return Err(EngineError::InvalidFactor {
            factor,
            expected: "finite and greater than 1",
        });
    }
    belief
        .scale_entity(entity, factor, 0.0)
        .map_err(|_| EngineError::InvalidFactor {
            factor,
            expected: "finite and greater than 1",
        })
}

/// Multiplies one entity's probability by `0 < factor < 1` and renormalizes.
/// The entity keeps a strictly positive probability.
pub fn penalize(belief: &mut BeliefState, entity: usize, factor: f64) -> Result<(), EngineError> {
    if !(factor > 0.0 && factor < 1.0) {
        return Err(EngineError::InvalidFactor {
            factor,
            expected: "in (0, 1)",
        });
    }
    belief
        .scale_entity(entity, factor, f64::MIN_POSITIVE)
        .map_err(|_| EngineError::InvalidFactor {
            factor,
            expected: "in (0, 1)",
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::belief::NORMALIZATION_TOLERANCE;
    use crate::kb::fixtures::four_way;

    #[test]
    fn penalizing_the_leader_promotes_the_runner_up() {
        let mut belief = BeliefState::from_priors(&four_way());
        belief.apply_multipliers(&[0.40, 0.38, 0.12, 0.10]).unwrap();
        assert_eq!(belief.top().map(|(idx, _)| idx), Some(0));

        penalize(&mut belief, 0, 0.001).unwrap();
        assert_eq!(belief.top().map(|(idx, _)| idx), Some(1));
        assert!(belief.prob(0) > 0.0);
        assert!((belief.total() - 1.0).abs() < NORMALIZATION_TOLERANCE);
    }

    #[test]
    fn boosting_raises_the_entity() {
        let mut belief = BeliefState::from_priors(&four_way());
        boost(&mut belief, 3, 1000.0).unwrap();
        assert!(belief.prob(3) > 0.99);
        assert!((belief.total() - 1.0).abs() < NORMALIZATION_TOLERANCE);
    }

    #[test]
    fn rejects_factors_on_the_wrong_side_of_one() {
        let mut belief = BeliefState::from_priors(&four_way());
        assert!(boost(&mut belief, 0, 0.5).is_err());
        assert!(penalize(&mut belief, 0, 2.0).is_err());
        assert!(penalize(&mut belief, 0, 0.0).is_err());
        assert_eq!(belief.probs(), &[0.25; 4]);
    }

    #[test]
    fn repeated_penalties_never_reach_zero() {
        let mut belief = BeliefState::from_priors(&four_way());
        for _ in 0..200 {
            for entity in 0..4 {
                penalize(&mut belief, entity, 0.001).unwrap();
            }
        }
        assert!(belief.probs().iter().all(|p| *p > 0.0));
        assert!((belief.total() - 1.0).abs() < NORMALIZATION_TOLERANCE);
    }
}
