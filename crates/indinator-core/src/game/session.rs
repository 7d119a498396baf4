//! One game of twenty questions: the belief, the pending guess and the phase,
//! over a shared knowledge base.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

use super::serialization::{SessionSnapshot, SnapshotError};
use crate::belief::{self, BeliefState, Evidence};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::kb::{EntityRecord, KnowledgeBase, lookup};
use crate::model::answer::{Answer, Confidence, Outcome};
use crate::model::question::QuestionId;
use crate::policy::{FeedbackOutcome, Guess, GuessPolicy, Phase, Turn};
use crate::select::{self, ScoredQuestion, SelectionCache};

/// Entities at or above this probability count as still in the running.
pub const CANDIDATE_FLOOR: f64 = 0.001;

const STATS_TOP_K: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStats {
    pub questions_asked: usize,
    pub top: Option<(String, f64)>,
    pub top_k: Vec<(String, f64)>,
    pub remaining_candidates: usize,
    pub entropy: f64,
    pub wrong_guesses: usize,
}

#[derive(Debug, Clone)]
pub struct Session {
    kb: Arc<KnowledgeBase>,
    config: EngineConfig,
    policy: GuessPolicy,
    belief: BeliefState,
    phase: Phase,
    pending: Option<Guess>,
    wrong_guesses: usize,
    cache: SelectionCache,
}

impl Session {
    pub fn new(kb: Arc<KnowledgeBase>, config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let belief = BeliefState::from_priors(&kb);
        Ok(Self {
            policy: GuessPolicy::from_config(&config),
            kb,
            config,
            belief,
            phase: Phase::Asking,
            pending: None,
            wrong_guesses: 0,
            cache: SelectionCache::new(),
        })
    }

    pub(crate) fn from_parts(
        kb: Arc<KnowledgeBase>,
        config: EngineConfig,
        belief: BeliefState,
        phase: Phase,
        pending: Option<Guess>,
        wrong_guesses: usize,
    ) -> Result<Self, EngineError> {
        let mut session = Self::new(kb, config)?;
        session.belief = belief;
        session.phase = phase;
        session.pending = pending;
        session.wrong_guesses = wrong_guesses;
        Ok(session)
    }

    pub fn restore(
        kb: Arc<KnowledgeBase>,
        snapshot: SessionSnapshot,
    ) -> Result<Self, SnapshotError> {
        snapshot.restore(kb)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot::capture(self)
    }

    /// Swaps the engine settings mid-game, e.g. after resuming a snapshot.
    /// The belief and any pending guess are kept.
    pub fn set_config(&mut self, config: EngineConfig) -> Result<(), EngineError> {
        config.validate()?;
        self.policy = GuessPolicy::from_config(&config);
        self.config = config;
        Ok(())
    }

    /// Back to the priors with nothing asked and no guess pending.
    pub fn reset(&mut self) {
        self.belief.reset(&self.kb);
        self.phase = Phase::Asking;
        self.pending = None;
        self.wrong_guesses = 0;
        self.cache.clear();
        debug!(target: "indinator::session", "session reset");
    }

    pub fn knowledge_base(&self) -> &Arc<KnowledgeBase> {
        &self.kb
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn belief(&self) -> &BeliefState {
        &self.belief
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn pending_guess(&self) -> Option<&Guess> {
        self.pending.as_ref()
    }

    pub fn questions_asked(&self) -> usize {
        self.belief.turns()
    }

    pub fn wrong_guesses(&self) -> usize {
        self.wrong_guesses
    }

    pub fn select_best_question(&mut self) -> Option<QuestionId> {
        self.cache
            .select(&self.belief, &self.kb)
            .map(|index| self.kb.question(index).id.clone())
    }

    /// Top `k` questions by information gain.
    pub fn rank_questions(&self, k: usize) -> Vec<(QuestionId, f64)> {
        select::rank_questions(&self.belief, &self.kb, k)
            .into_iter()
            .map(|ScoredQuestion { index, gain }| (self.kb.question(index).id.clone(), gain))
            .collect()
    }

    /// Applies an answer. Supplied likelihoods override the answer's default
    /// confidence; supplying only one implies its complement.
    pub fn update_probabilities(
        &mut self,
        question: &str,
        answer: Answer,
        likelihood_correct: Option<f64>,
        likelihood_incorrect: Option<f64>,
    ) -> Result<(), EngineError> {
        let index = self.question_index(question)?;
        let confidence = match self.config.confidence_for(answer) {
            Some(fallback) => Some(Confidence::from_parts(
                likelihood_correct,
                likelihood_incorrect,
                fallback,
            )?),
            None => {
                // Skipped answers carry no evidence, but the likelihoods must still be valid.
                Confidence::from_parts(
                    likelihood_correct,
                    likelihood_incorrect,
                    self.config.firm,
                )?;
                None
            }
        };
        self.apply(index, Evidence::from_answer(answer, confidence))
    }

    /// Applies a raw three-way outcome looked up directly in the table.
    pub fn observe(&mut self, question: &str, outcome: Outcome) -> Result<(), EngineError> {
        let index = self.question_index(question)?;
        self.apply(index, Evidence::Outcome(outcome))
    }

    fn apply(&mut self, question: usize, evidence: Evidence) -> Result<(), EngineError> {
        let row = self.kb.likelihoods().row(question);
        let Some(multipliers) = evidence.multipliers(row) else {
            self.belief.mark_skipped(question);
            debug!(
                target: "indinator::belief",
                question = %self.kb.question(question).id,
                turns = self.belief.turns(),
                "answer skipped"
            );
            return Ok(());
        };
        if let Err(err) = self.belief.apply_multipliers(&multipliers) {
            let id = self.kb.question(question).id.clone();
            warn!(
                target: "indinator::belief",
                question = %id,
                total = err.total,
                "update rejected; belief left unchanged"
            );
            return Err(EngineError::DegenerateBelief { question: id });
        }
        self.belief.mark_asked(question);
        debug!(
            target: "indinator::belief",
            question = %self.kb.question(question).id,
            turns = self.belief.turns(),
            entropy = self.entropy(),
            "belief updated"
        );
        Ok(())
    }

    pub fn entropy(&self) -> f64 {
        belief::entropy(self.belief.probs())
    }

    pub fn get_top_characters(&self, k: usize) -> Vec<(String, f64)> {
        self.belief
            .ranked(k)
            .into_iter()
            .map(|(index, p)| (self.kb.entity(index).name.clone(), p))
            .collect()
    }

    pub fn should_make_guess(&self, threshold: f64) -> bool {
        self.policy.should_guess(&self.belief, threshold)
    }

    pub fn get_best_guess(&self) -> (String, f64) {
        let (index, p) = self.leader();
        (self.kb.entity(index).name.clone(), p)
    }

    pub fn boost_character(&mut self, name: &str, factor: f64) -> Result<(), EngineError> {
        let index = self.entity_index(name)?;
        belief::boost(&mut self.belief, index, factor)
    }

    pub fn penalize_wrong_guess(&mut self, name: &str, factor: f64) -> Result<(), EngineError> {
        let index = self.entity_index(name)?;
        belief::penalize(&mut self.belief, index, factor)
    }

    /// Resolves free text to an entity name: exact, then substring, then fuzzy.
    pub fn find_character(&self, query: &str) -> Option<String> {
        lookup::find_entity(&self.kb, query).map(|index| self.kb.entity(index).name.clone())
    }

    /// Decides what to present next: a question, or a guess that must be
    /// answered with [`Session::record_feedback`] before the next turn.
    pub fn next_turn(&mut self) -> Result<Turn, EngineError> {
        if self.phase.is_finished() {
            return Err(EngineError::SessionFinished);
        }
        if let Some(guess) = &self.pending {
            return Err(EngineError::GuessPending(guess.name.clone()));
        }
        if self.policy.budget_exhausted(&self.belief) {
            return Ok(self.make_guess(true));
        }
        if self.policy.should_guess(&self.belief, self.policy.threshold) {
            return Ok(self.make_guess(false));
        }
        match self.select_best_question() {
            Some(question) => Ok(Turn::Ask(question)),
            None => Ok(self.make_guess(true)),
        }
    }

    fn make_guess(&mut self, forced: bool) -> Turn {
        let (index, probability) = self.leader();
        let entity = self.kb.entity(index);
        let guess = Guess {
            entity: entity.id.clone(),
            name: entity.name.clone(),
            probability,
            forced,
        };
        debug!(
            target: "indinator::session",
            entity = %guess.entity,
            probability,
            forced,
            turns = self.belief.turns(),
            "guessing"
        );
        self.pending = Some(guess.clone());
        self.phase = Phase::Guessing;
        Turn::Guess(guess)
    }

    /// Scores the pending guess. A confirmed guess ends the session; a
    /// rejected one returns to asking unless the guess was forced.
    pub fn record_feedback(&mut self, correct: bool) -> Result<FeedbackOutcome, EngineError> {
        let guess = self.pending.clone().ok_or(EngineError::NoPendingGuess)?;
        let index = self
            .kb
            .entity_index(guess.entity.as_str())
            .ok_or_else(|| EngineError::UnknownEntity(guess.entity.to_string()))?;
        let outcome = if correct {
            belief::boost(&mut self.belief, index, self.config.boost_factor)?;
            self.phase = Phase::Solved;
            FeedbackOutcome::Solved
        } else {
            belief::penalize(&mut self.belief, index, self.config.penalty_factor)?;
            self.wrong_guesses += 1;
            if guess.forced {
                self.phase = Phase::GaveUp;
                FeedbackOutcome::GaveUp
            } else {
                self.phase = Phase::Asking;
                FeedbackOutcome::Continue
            }
        };
        self.pending = None;
        debug!(
            target: "indinator::session",
            entity = %guess.entity,
            correct,
            outcome = ?outcome,
            "guess scored"
        );
        Ok(outcome)
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            questions_asked: self.questions_asked(),
            top: Some(self.get_best_guess()),
            top_k: self.get_top_characters(STATS_TOP_K),
            remaining_candidates: self.belief.candidates_above(CANDIDATE_FLOOR),
            entropy: self.entropy(),
            wrong_guesses: self.wrong_guesses,
        }
    }

    /// The current belief as an entity table, ready to be saved as the priors
    /// of future games.
    pub fn export_priors(&self) -> Vec<EntityRecord> {
        self.kb
            .entities()
            .iter()
            .zip(self.belief.probs())
            .map(|(entity, p)| EntityRecord::new(entity.id.as_str(), entity.name.clone(), Some(*p)))
            .collect()
    }

    fn leader(&self) -> (usize, f64) {
        // Knowledge bases are never empty, so the belief always has a leader.
        self.belief.top().unwrap_or((0, 0.0))
    }

    fn question_index(&self, question: &str) -> Result<usize, EngineError> {
        self.kb
            .question_index(question)
            .ok_or_else(|| EngineError::UnknownQuestion(question.to_string()))
    }

    /// Display name first, then identifier.
    fn entity_index(&self, name: &str) -> Result<usize, EngineError> {
        self.kb
            .entities()
            .iter()
            .position(|entity| entity.name == name)
            .or_else(|| self.kb.entity_index(name))
            .ok_or_else(|| EngineError::UnknownEntity(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kb::fixtures::four_way;
    use crate::model::entity::Entity;
    use crate::model::likelihood::{LikelihoodTable, TraitModel};
    use crate::model::question::Question;

    fn session() -> Session {
        Session::new(Arc::new(four_way()), EngineConfig::default()).unwrap()
    }

    #[test]
    fn explicit_likelihoods_drive_the_update() {
        let mut session = session();
        session
            .update_probabilities("a_only", Answer::Yes, Some(0.9), Some(0.1))
            .unwrap();
        let (name, p) = session.get_best_guess();
        assert_eq!(name, "Alpha");
        assert!((p - 0.75).abs() < 1e-9);
        assert_eq!(session.questions_asked(), 1);
        assert!(session.belief().is_asked(0));
    }

    #[test]
    fn unknown_question_is_rejected() {
        let mut session = session();
        let err = session
            .update_probabilities("missing", Answer::Yes, None, None)
            .unwrap_err();
        assert_eq!(err, EngineError::UnknownQuestion("missing".into()));
        assert_eq!(session.questions_asked(), 0);
    }

    #[test]
    fn out_of_range_likelihood_is_rejected() {
        let mut session = session();
        let before = session.belief().clone();
        let err = session
            .update_probabilities("ab", Answer::Yes, Some(1.5), None)
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidLikelihood { .. }));
        assert_eq!(session.belief(), &before);
    }

    #[test]
    fn contradictory_certain_answers_leave_belief_unchanged() {
        let mut session = session();
        session
            .update_probabilities("a_only", Answer::Yes, Some(1.0), Some(0.0))
            .unwrap();
        let before = session.belief().clone();
        let err = session
            .update_probabilities("a_only", Answer::No, Some(1.0), Some(0.0))
            .unwrap_err();
        assert_eq!(
            err,
            EngineError::DegenerateBelief {
                question: QuestionId::new("a_only")
            }
        );
        assert_eq!(session.belief(), &before);
    }

    #[test]
    fn graded_answers_move_less_than_firm_ones() {
        let mut firm = session();
        let mut graded = session();
        firm.update_probabilities("ab", Answer::Yes, None, None).unwrap();
        graded
            .update_probabilities("ab", Answer::Probably, None, None)
            .unwrap();
        assert!(firm.get_best_guess().1 > graded.get_best_guess().1);
        assert!(graded.get_best_guess().1 > 0.25);
    }

    #[test]
    fn observe_uses_raw_outcomes() {
        let mut session = session();
        session.observe("a_only", Outcome::Yes).unwrap();
        assert!((session.belief().prob(0) - 0.75).abs() < 1e-9);
    }

    #[test]
    fn threshold_triggers_a_guess_and_confirmation_ends_the_game() {
        let mut session = session();
        session
            .update_probabilities("a_only", Answer::Yes, Some(0.99), Some(0.01))
            .unwrap();
        assert!(session.should_make_guess(0.85));

        let Turn::Guess(guess) = session.next_turn().unwrap() else {
            panic!("expected a guess");
        };
        assert_eq!(guess.name, "Alpha");
        assert!(!guess.forced);
        assert_eq!(
            session.next_turn().unwrap_err(),
            EngineError::GuessPending("Alpha".into())
        );

        assert_eq!(session.record_feedback(true).unwrap(), FeedbackOutcome::Solved);
        assert_eq!(session.phase(), Phase::Solved);
        assert_eq!(session.next_turn().unwrap_err(), EngineError::SessionFinished);
    }

    #[test]
    fn rejected_guess_returns_to_asking() {
        let mut session = session();
        session
            .update_probabilities("a_only", Answer::Yes, Some(0.99), Some(0.01))
            .unwrap();
        assert!(matches!(session.next_turn().unwrap(), Turn::Guess(_)));
        assert_eq!(
            session.record_feedback(false).unwrap(),
            FeedbackOutcome::Continue
        );
        assert_eq!(session.phase(), Phase::Asking);
        assert_eq!(session.wrong_guesses(), 1);
        assert_ne!(session.get_best_guess().0, "Alpha");
    }

    #[test]
    fn unknown_answer_still_validates_likelihoods() {
        let mut session = session();
        let err = session
            .update_probabilities("ab", Answer::Unknown, Some(7.0), Some(-3.0))
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidLikelihood { .. }));
        assert_eq!(session.questions_asked(), 0);
        assert!(!session.belief().is_skipped(1));

        session
            .update_probabilities("ab", Answer::Unknown, Some(0.9), None)
            .unwrap();
        assert_eq!(session.belief().probs(), &[0.25; 4]);
        assert!(session.belief().is_skipped(1));
    }

    #[test]
    fn feedback_targets_the_guessed_id_even_when_a_name_collides() {
        let entities = vec![
            Entity::new("bravo", "Bravo Team", 0.9),
            Entity::new("x", "bravo", 0.1),
        ];
        let questions = vec![Question::new("q", "Is it a team?")];
        let table = LikelihoodTable::filled(2, 1, TraitModel::default().neutral);
        let kb = KnowledgeBase::new(entities, questions, table).unwrap();
        let config = EngineConfig {
            guess_threshold: 0.5,
            ..EngineConfig::default()
        };
        let mut session = Session::new(Arc::new(kb), config).unwrap();

        let Turn::Guess(guess) = session.next_turn().unwrap() else {
            panic!("expected a guess");
        };
        assert_eq!(guess.entity.as_str(), "bravo");
        assert_eq!(
            session.record_feedback(false).unwrap(),
            FeedbackOutcome::Continue
        );
        assert!(session.belief().prob(0) < 0.5);
        assert!(session.belief().prob(1) > 0.5);
    }

    #[test]
    fn feedback_requires_a_pending_guess() {
        let mut session = session();
        assert_eq!(
            session.record_feedback(true).unwrap_err(),
            EngineError::NoPendingGuess
        );
    }

    #[test]
    fn exhausted_budget_forces_a_guess() {
        let config = EngineConfig {
            max_questions: 1,
            ..EngineConfig::default()
        };
        let mut session = Session::new(Arc::new(four_way()), config).unwrap();
        session
            .update_probabilities("ab", Answer::Yes, None, None)
            .unwrap();
        let Turn::Guess(guess) = session.next_turn().unwrap() else {
            panic!("expected a forced guess");
        };
        assert!(guess.forced);
        assert_eq!(
            session.record_feedback(false).unwrap(),
            FeedbackOutcome::GaveUp
        );
        assert_eq!(session.phase(), Phase::GaveUp);
    }

    #[test]
    fn selection_is_memoized_until_the_belief_moves() {
        let mut session = session();
        let first = session.select_best_question();
        assert_eq!(first, session.select_best_question());
        assert_eq!(first, Some(QuestionId::new("ab")));
        session
            .update_probabilities("ab", Answer::Yes, None, None)
            .unwrap();
        assert_ne!(session.select_best_question(), first);
    }

    #[test]
    fn feedback_helpers_resolve_names_and_ids() {
        let mut session = session();
        session.boost_character("Bravo", 10.0).unwrap();
        assert_eq!(session.get_best_guess().0, "Bravo");
        session.penalize_wrong_guess("b", 0.001).unwrap();
        assert_ne!(session.get_best_guess().0, "Bravo");
        assert_eq!(
            session.boost_character("Zulu", 10.0).unwrap_err(),
            EngineError::UnknownEntity("Zulu".into())
        );
    }

    #[test]
    fn stats_and_priors_reflect_the_belief() {
        let mut session = session();
        session
            .update_probabilities("a_only", Answer::Yes, Some(0.9), Some(0.1))
            .unwrap();
        let stats = session.stats();
        assert_eq!(stats.questions_asked, 1);
        assert_eq!(stats.remaining_candidates, 4);
        assert_eq!(stats.top_k.len(), 4);
        assert_eq!(stats.top.map(|(name, _)| name), Some("Alpha".to_string()));

        let priors = session.export_priors();
        assert_eq!(priors[0].id, "a");
        assert!((priors[0].prior.unwrap() - 0.75).abs() < 1e-9);
    }

    #[test]
    fn replaced_config_drives_the_guess_policy() {
        let mut session = session();
        session
            .update_probabilities("a_only", Answer::Yes, Some(0.9), Some(0.1))
            .unwrap();
        let mut resumed = Session::restore(Arc::clone(session.knowledge_base()), session.snapshot())
            .unwrap();
        assert!(matches!(resumed.next_turn().unwrap(), Turn::Ask(_)));

        let lenient = EngineConfig {
            guess_threshold: 0.7,
            ..EngineConfig::default()
        };
        resumed.set_config(lenient).unwrap();
        assert_eq!(resumed.config().guess_threshold, 0.7);
        assert!(matches!(resumed.next_turn().unwrap(), Turn::Guess(_)));

        let broken = EngineConfig {
            guess_threshold: 1.5,
            ..EngineConfig::default()
        };
        assert!(resumed.set_config(broken).is_err());
        assert_eq!(resumed.config().guess_threshold, 0.7);
    }

    #[test]
    fn reset_restores_the_priors() {
        let mut session = session();
        session
            .update_probabilities("ab", Answer::No, None, None)
            .unwrap();
        session.reset();
        assert_eq!(session.belief().probs(), &[0.25; 4]);
        assert_eq!(session.questions_asked(), 0);
        assert_eq!(session.phase(), Phase::Asking);
    }
}
