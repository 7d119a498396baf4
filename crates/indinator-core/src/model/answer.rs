use core::fmt;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

use crate::error::EngineError;

/// Outcome set shared by every question in the likelihood table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Yes,
    No,
    Maybe,
}

impl Outcome {
    pub const ALL: [Outcome; 3] = [Outcome::Yes, Outcome::No, Outcome::Maybe];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Outcome::Yes => "yes",
            Outcome::No => "no",
            Outcome::Maybe => "maybe",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Graded answer a player gives to a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Answer {
    Yes,
    No,
    Probably,
    ProbablyNot,
    Unknown,
}

impl Answer {
    pub const ALL: [Answer; 5] = [
        Answer::Yes,
        Answer::No,
        Answer::Probably,
        Answer::ProbablyNot,
        Answer::Unknown,
    ];

    /// `Some(true)` for affirming answers, `Some(false)` for denying ones and
    /// `None` for a skip.
    pub const fn direction(self) -> Option<bool> {
        match self {
            Answer::Yes | Answer::Probably => Some(true),
            Answer::No | Answer::ProbablyNot => Some(false),
            Answer::Unknown => None,
        }
    }

    pub const fn is_graded(self) -> bool {
        matches!(self, Answer::Probably | Answer::ProbablyNot)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Answer::Yes => "yes",
            Answer::No => "no",
            Answer::Probably => "probably",
            Answer::ProbablyNot => "probably_not",
            Answer::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized answer '{0}' (expected yes, no, probably, probably_not or unknown)")]
pub struct AnswerParseError(pub String);

impl FromStr for Answer {
    type Err = AnswerParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        let answer = match normalized.as_str() {
            "y" | "yes" | "1" | "true" => Answer::Yes,
            "n" | "no" | "0" | "false" => Answer::No,
            "p" | "probably" | "probably_yes" | "likely" | "likely yes" | "maybe" => {
                Answer::Probably
            }
            "pn" | "probably not" | "probably_not" | "probably_no" | "likely not"
            | "likely_no" => Answer::ProbablyNot,
            "u" | "dk" | "unknown" | "don't know" | "dont know" | "dont_know" | "?" | "skip" => {
                Answer::Unknown
            }
            _ => return Err(AnswerParseError(value.trim().to_string())),
        };
        Ok(answer)
    }
}

/// Two-parameter likelihood pair: what an entity that agrees with the answer's
/// direction contributes, and what one that disagrees contributes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Confidence {
    pub correct: f64,
    pub incorrect: f64,
}

impl Confidence {
    pub const FIRM: Confidence = Confidence {
        correct: 0.95,
        incorrect: 0.05,
    };

    pub const GRADED: Confidence = Confidence {
        correct: 0.75,
        incorrect: 0.25,
    };

    pub fn new(correct: f64, incorrect: f64) -> Result<Self, EngineError> {
        let confidence = Self { correct, incorrect };
        confidence.validate()?;
        Ok(confidence)
    }

    /// Builds a pair from optionally supplied halves. A single supplied value
    /// implies its complement.
    pub fn from_parts(
        correct: Option<f64>,
        incorrect: Option<f64>,
        fallback: Confidence,
    ) -> Result<Self, EngineError> {
        match (correct, incorrect) {
            (Some(c), Some(i)) => Self::new(c, i),
            (Some(c), None) => Self::new(c, 1.0 - c),
            (None, Some(i)) => Self::new(1.0 - i, i),
            (None, None) => Ok(fallback),
        }
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        let in_range = |value: f64| value.is_finite() && (0.0..=1.0).contains(&value);
        if !in_range(self.correct)
            || !in_range(self.incorrect)
            || self.correct + self.incorrect <= 0.0
        {
            return Err(EngineError::InvalidLikelihood {
                correct: self.correct,
                incorrect: self.incorrect,
            });
        }
        Ok(())
    }

    pub fn midpoint(&self) -> f64 {
        (self.correct + self.incorrect) * 0.5
    }
}
