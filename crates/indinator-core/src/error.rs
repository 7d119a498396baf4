use thiserror::Error;

use crate::game::registry::SessionId;
use crate::model::question::QuestionId;

/// Per-turn failures surfaced by the engine. Every variant leaves the belief
/// state exactly as it was before the failing call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("answer to question '{question}' contradicts every remaining candidate")]
    DegenerateBelief { question: QuestionId },
    #[error("unknown entity '{0}'")]
    UnknownEntity(String),
    #[error("unknown question '{0}'")]
    UnknownQuestion(String),
    #[error(
        "likelihoods must lie in [0, 1] and not both be zero (correct={correct}, incorrect={incorrect})"
    )]
    InvalidLikelihood { correct: f64, incorrect: f64 },
    #[error("factor {factor} must be {expected}")]
    InvalidFactor { factor: f64, expected: &'static str },
    #[error("{field}: {message}")]
    InvalidConfig { field: &'static str, message: String },
    #[error("no guess is waiting for feedback")]
    NoPendingGuess,
    #[error("guess '{0}' is still waiting for feedback")]
    GuessPending(String),
    #[error("session has already finished")]
    SessionFinished,
    #[error("unknown session {0}")]
    UnknownSession(SessionId),
}
