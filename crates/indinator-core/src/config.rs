use serde::{Deserialize, Serialize};
use std::env;

use crate::error::EngineError;
use crate::model::answer::{Answer, Confidence};

const DEFAULT_GUESS_THRESHOLD: f64 = 0.85;
const DEFAULT_MAX_QUESTIONS: usize = 30;
const DEFAULT_BOOST_FACTOR: f64 = 1000.0;
const DEFAULT_PENALTY_FACTOR: f64 = 0.001;

/// Tunable engine parameters shared by every session built from it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Minimum top probability before the engine commits to a guess.
    pub guess_threshold: f64,
    /// Turns that must be consumed before a non-forced guess is allowed.
    pub min_questions: usize,
    /// Turn budget; once spent the engine forces a final guess.
    pub max_questions: usize,
    /// Likelihood pair for `yes` / `no`.
    pub firm: Confidence,
    /// Likelihood pair for `probably` / `probably_not`.
    pub graded: Confidence,
    pub boost_factor: f64,
    pub penalty_factor: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            guess_threshold: DEFAULT_GUESS_THRESHOLD,
            min_questions: 0,
            max_questions: DEFAULT_MAX_QUESTIONS,
            firm: Confidence::FIRM,
            graded: Confidence::GRADED,
            boost_factor: DEFAULT_BOOST_FACTOR,
            penalty_factor: DEFAULT_PENALTY_FACTOR,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self::from_reader(|key| env::var(key).ok())
    }

    /// Default likelihood pair for an answer; `None` for a skip.
    pub fn confidence_for(&self, answer: Answer) -> Option<Confidence> {
        match answer {
            Answer::Yes | Answer::No => Some(self.firm),
            Answer::Probably | Answer::ProbablyNot => Some(self.graded),
            Answer::Unknown => None,
        }
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if !self.guess_threshold.is_finite() || !(0.0..=1.0).contains(&self.guess_threshold) {
            return Err(EngineError::InvalidConfig {
                field: "guess_threshold",
                message: format!("{} is outside [0, 1]", self.guess_threshold),
            });
        }
        if self.max_questions == 0 {
            return Err(EngineError::InvalidConfig {
                field: "max_questions",
                message: "question budget must be at least 1".to_string(),
            });
        }
        if self.min_questions > self.max_questions {
            return Err(EngineError::InvalidConfig {
                field: "min_questions",
                message: format!(
                    "{} exceeds max_questions ({})",
                    self.min_questions, self.max_questions
                ),
            });
        }
        self.firm.validate()?;
        self.graded.validate()?;
        if !self.boost_factor.is_finite() || self.boost_factor <= 1.0 {
            return Err(EngineError::InvalidConfig {
                field: "boost_factor",
                message: format!("{} must be greater than 1", self.boost_factor),
            });
        }
        if !(self.penalty_factor > 0.0 && self.penalty_factor < 1.0) {
            return Err(EngineError::InvalidConfig {
                field: "penalty_factor",
                message: format!("{} must lie in (0, 1)", self.penalty_factor),
            });
        }
        Ok(())
    }

    fn from_reader<F>(mut read: F) -> Self
    where
        F: FnMut(&str) -> Option<String>,
    {
        let base = Self::default();
        let guess_threshold = parse_var(&mut read, "INDINATOR_GUESS_THRESHOLD")
            .filter(|value: &f64| value.is_finite())
            .map(|value| value.clamp(0.0, 1.0))
            .unwrap_or(base.guess_threshold);
        let max_questions = parse_var(&mut read, "INDINATOR_MAX_QUESTIONS")
            .map(|value: usize| value.max(1))
            .unwrap_or(base.max_questions);
        let min_questions = parse_var(&mut read, "INDINATOR_MIN_QUESTIONS")
            .map(|value: usize| value.min(max_questions))
            .unwrap_or(base.min_questions);
        let boost_factor = parse_var(&mut read, "INDINATOR_BOOST_FACTOR")
            .filter(|value: &f64| value.is_finite() && *value > 1.0)
            .unwrap_or(base.boost_factor);
        let penalty_factor = parse_var(&mut read, "INDINATOR_PENALTY_FACTOR")
            .filter(|value: &f64| *value > 0.0 && *value < 1.0)
            .unwrap_or(base.penalty_factor);

        Self {
            guess_threshold,
            min_questions,
            max_questions,
            boost_factor,
            penalty_factor,
            ..base
        }
    }
}

fn parse_var<F, T>(read: &mut F, key: &str) -> Option<T>
where
    F: FnMut(&str) -> Option<String>,
    T: std::str::FromStr,
{
    read(key).and_then(|raw| raw.trim().parse::<T>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn reader(pairs: &[(&str, &str)]) -> impl FnMut(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_validate() {
        EngineConfig::default().validate().expect("defaults are valid");
    }

    #[test]
    fn env_overrides_are_clamped() {
        let cfg = EngineConfig::from_reader(reader(&[
            ("INDINATOR_GUESS_THRESHOLD", "1.7"),
            ("INDINATOR_MAX_QUESTIONS", "12"),
            ("INDINATOR_MIN_QUESTIONS", "40"),
            ("INDINATOR_PENALTY_FACTOR", "3"),
        ]));
        assert_eq!(cfg.guess_threshold, 1.0);
        assert_eq!(cfg.max_questions, 12);
        assert_eq!(cfg.min_questions, 12);
        assert_eq!(cfg.penalty_factor, DEFAULT_PENALTY_FACTOR);
        cfg.validate().expect("clamped config is valid");
    }

    #[test]
    fn rejects_min_above_max() {
        let cfg = EngineConfig {
            min_questions: 5,
            max_questions: 3,
            ..EngineConfig::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidConfig { field, .. } if field == "min_questions"
        ));
    }

    #[test]
    fn graded_answers_use_weaker_pair() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.confidence_for(Answer::Probably), Some(Confidence::GRADED));
        assert_eq!(cfg.confidence_for(Answer::No), Some(Confidence::FIRM));
        assert_eq!(cfg.confidence_for(Answer::Unknown), None);
    }
}
