use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{RespondentParams, answer_for};
use crate::policy::{RespondContext, Respondent, emit_answer};
use indinator_core::Answer;

/// Knows the right answer but sometimes hedges it or shrugs.
#[derive(Debug, Clone)]
pub struct SloppyRespondent {
    name: String,
    hedge_rate: f64,
    skip_rate: f64,
    rng: StdRng,
}

impl SloppyRespondent {
    pub fn new(name: impl Into<String>, params: RespondentParams, seed: u64) -> Self {
        Self {
            name: name.into(),
            hedge_rate: params.hedge_rate.clamp(0.0, 1.0),
            skip_rate: params.skip_rate.clamp(0.0, 1.0),
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Respondent for SloppyRespondent {
    fn name(&self) -> &str {
        &self.name
    }

    fn answer(&mut self, ctx: &RespondContext) -> Answer {
        let honest = answer_for(ctx.kb.likelihood(ctx.question, ctx.target).most_likely());
        let answer = if self.rng.gen_bool(self.skip_rate) {
            Answer::Unknown
        } else if self.rng.gen_bool(self.hedge_rate) {
            match honest {
                Answer::Yes => Answer::Probably,
                Answer::No => Answer::ProbablyNot,
                other => other,
            }
        } else {
            honest
        };
        emit_answer(&self.name, ctx, answer);
        answer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::respondent::fixtures::animals;

    fn ask(respondent: &mut SloppyRespondent, target: usize) -> Answer {
        let kb = animals();
        respondent.answer(&RespondContext {
            kb: &kb,
            target,
            question: 0,
            turn: 0,
        })
    }

    #[test]
    fn always_hedging_softens_the_answer() {
        let params = RespondentParams {
            hedge_rate: 1.0,
            skip_rate: 0.0,
        };
        let mut respondent = SloppyRespondent::new("s", params, 1);
        assert_eq!(ask(&mut respondent, 0), Answer::Probably);
        assert_eq!(ask(&mut respondent, 1), Answer::ProbablyNot);
    }

    #[test]
    fn always_skipping_never_answers() {
        let params = RespondentParams {
            hedge_rate: 0.0,
            skip_rate: 1.0,
        };
        let mut respondent = SloppyRespondent::new("s", params, 1);
        assert_eq!(ask(&mut respondent, 0), Answer::Unknown);
    }

    #[test]
    fn zero_rates_match_the_truthful_answer() {
        let params = RespondentParams {
            hedge_rate: 0.0,
            skip_rate: 0.0,
        };
        let mut respondent = SloppyRespondent::new("s", params, 1);
        assert_eq!(ask(&mut respondent, 0), Answer::Yes);
        assert_eq!(ask(&mut respondent, 2), Answer::No);
    }
}
