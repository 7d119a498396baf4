use rand::SeedableRng;
use rand::rngs::StdRng;

use super::answer_for;
use crate::policy::{RespondContext, Respondent, emit_answer};
use indinator_core::Answer;

/// Draws each answer from the target's outcome distribution, so a trait the
/// table marks as uncertain is sometimes answered wrongly.
#[derive(Debug, Clone)]
pub struct NoisyRespondent {
    name: String,
    rng: StdRng,
}

impl NoisyRespondent {
    pub fn new(name: impl Into<String>, seed: u64) -> Self {
        Self {
            name: name.into(),
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Respondent for NoisyRespondent {
    fn name(&self) -> &str {
        &self.name
    }

    fn answer(&mut self, ctx: &RespondContext) -> Answer {
        let outcome = ctx
            .kb
            .likelihood(ctx.question, ctx.target)
            .sample(&mut self.rng);
        let answer = answer_for(outcome);
        emit_answer(&self.name, ctx, answer);
        answer
    }
}
