//! Simulated players used by the benchmark harness.

mod noisy;
mod sloppy;
mod truthful;

pub use noisy::NoisyRespondent;
pub use sloppy::SloppyRespondent;
pub use truthful::TruthfulRespondent;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::policy::Respondent;
use indinator_core::{Answer, Outcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RespondentKind {
    Truthful,
    Noisy,
    Sloppy,
}

impl RespondentKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            RespondentKind::Truthful => "truthful",
            RespondentKind::Noisy => "noisy",
            RespondentKind::Sloppy => "sloppy",
        }
    }
}

impl fmt::Display for RespondentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RespondentKind {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "truthful" | "oracle" => Ok(RespondentKind::Truthful),
            "noisy" | "sampled" => Ok(RespondentKind::Noisy),
            "sloppy" | "hedging" => Ok(RespondentKind::Sloppy),
            other => Err(format!("unknown respondent kind '{other}'")),
        }
    }
}

/// Knobs for the sloppy respondent. Rates are probabilities per question.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RespondentParams {
    pub hedge_rate: f64,
    pub skip_rate: f64,
}

impl Default for RespondentParams {
    fn default() -> Self {
        Self {
            hedge_rate: 0.25,
            skip_rate: 0.05,
        }
    }
}

impl RespondentParams {
    pub fn validate(&self) -> Result<(), String> {
        for (field, value) in [("hedge_rate", self.hedge_rate), ("skip_rate", self.skip_rate)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("{field} must lie in [0, 1], got {value}"));
            }
        }
        Ok(())
    }
}

impl RespondentKind {
    /// Builds a boxed respondent; `seed` feeds the randomized kinds.
    pub fn build(
        self,
        name: impl Into<String>,
        params: RespondentParams,
        seed: u64,
    ) -> Box<dyn Respondent> {
        let name = name.into();
        match self {
            RespondentKind::Truthful => Box::new(TruthfulRespondent::new(name)),
            RespondentKind::Noisy => Box::new(NoisyRespondent::new(name, seed)),
            RespondentKind::Sloppy => Box::new(SloppyRespondent::new(name, params, seed)),
        }
    }
}

/// Answer a player gives when they are sure of the outcome.
pub(crate) fn answer_for(outcome: Outcome) -> Answer {
    match outcome {
        Outcome::Yes => Answer::Yes,
        Outcome::No => Answer::No,
        Outcome::Maybe => Answer::Unknown,
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use indinator_core::kb::KnowledgeBase;
    use indinator_core::kb::loader::{TraitRecord, build, parse_questions};
    use indinator_core::kb::{EntityRecord, LikelihoodSource};
    use indinator_core::model::likelihood::TraitModel;
    use std::collections::HashMap;

    /// `cat` has fur, `crow` flies, `carp` has neither; `loud` says nothing.
    pub fn animals() -> KnowledgeBase {
        let records = vec![
            EntityRecord::new("cat", "Cat", None),
            EntityRecord::new("crow", "Crow", None),
            EntityRecord::new("carp", "Carp", None),
        ];
        let questions = parse_questions(
            r#"[
                {"id": "fur", "text": "Does it have fur?", "trait": "fur"},
                {"id": "flies", "text": "Can it fly?", "trait": "flies"},
                {"id": "loud", "text": "Is it loud?"}
            ]"#,
        )
        .expect("questions parse");
        let traits: HashMap<String, TraitRecord> =
            serde_json::from_str(r#"{"cat": ["fur"], "crow": ["flies"], "carp": []}"#)
                .expect("traits parse");
        build(
            records,
            questions,
            LikelihoodSource::Traits {
                traits,
                model: TraitModel::default(),
            },
        )
        .expect("fixture builds")
    }
}
