use super::answer_for;
use crate::policy::{RespondContext, Respondent, emit_answer};
use indinator_core::Answer;

/// Always gives the most likely outcome of the target's row.
#[derive(Debug, Clone)]
pub struct TruthfulRespondent {
    name: String,
}

impl TruthfulRespondent {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Respondent for TruthfulRespondent {
    fn name(&self) -> &str {
        &self.name
    }

    fn answer(&mut self, ctx: &RespondContext) -> Answer {
        let answer = answer_for(ctx.kb.likelihood(ctx.question, ctx.target).most_likely());
        emit_answer(&self.name, ctx, answer);
        answer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::respondent::fixtures::animals;

    #[test]
    fn follows_the_table() {
        let kb = animals();
        let mut respondent = TruthfulRespondent::new("t");
        let ask = |question: usize, target: usize| RespondContext {
            kb: &kb,
            target,
            question,
            turn: 0,
        };
        assert_eq!(respondent.answer(&ask(0, 0)), Answer::Yes);
        assert_eq!(respondent.answer(&ask(0, 1)), Answer::No);
        assert_eq!(respondent.answer(&ask(2, 2)), Answer::Unknown);
    }
}
