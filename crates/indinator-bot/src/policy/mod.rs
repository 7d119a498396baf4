use indinator_core::Answer;
use indinator_core::Guess;
use indinator_core::kb::KnowledgeBase;
use tracing::{Level, event};

/// What a simulated player sees when a question is put to them.
pub struct RespondContext<'a> {
    pub kb: &'a KnowledgeBase,
    /// Entity the player has in mind.
    pub target: usize,
    pub question: usize,
    /// Turns already played in this game.
    pub turn: usize,
}

/// A simulated player answering questions about a hidden target.
pub trait Respondent: Send {
    fn name(&self) -> &str;

    fn answer(&mut self, ctx: &RespondContext) -> Answer;

    /// Confirms or rejects a guess. Players never lie about the final reveal.
    fn confirm(&mut self, kb: &KnowledgeBase, target: usize, guess: &Guess) -> bool {
        kb.entity(target).id == guess.entity
    }
}

pub(crate) fn emit_answer(respondent: &str, ctx: &RespondContext, answer: Answer) {
    if !tracing::enabled!(Level::TRACE) {
        return;
    }
    event!(
        target: "indinator::respondent",
        Level::TRACE,
        respondent,
        target_entity = %ctx.kb.entity(ctx.target).id,
        question = %ctx.kb.question(ctx.question).id,
        turn = ctx.turn,
        answer = answer.as_str(),
    );
}
