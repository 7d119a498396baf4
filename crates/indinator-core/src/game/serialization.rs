use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use super::session::Session;
use crate::belief::BeliefState;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::kb::KnowledgeBase;
use crate::model::entity::EntityId;
use crate::model::question::QuestionId;
use crate::policy::{Guess, Phase};

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot references unknown entity '{0}'")]
    UnknownEntity(String),
    #[error("snapshot references unknown question '{0}'")]
    UnknownQuestion(String),
    #[error("snapshot has no probability for entity '{0}'")]
    MissingEntity(String),
    #[error("snapshot belief has no usable probability mass")]
    InvalidBelief,
    #[error("phase {phase:?} does not match the pending guess")]
    PendingMismatch { phase: Phase },
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("failed to parse snapshot: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BeliefEntry {
    pub entity: EntityId,
    pub probability: f64,
}

/// Everything needed to resume a session against the same knowledge base.
/// Entities and questions are stored by id so the snapshot survives catalog
/// reordering.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionSnapshot {
    pub config: EngineConfig,
    pub belief: Vec<BeliefEntry>,
    pub asked: Vec<QuestionId>,
    #[serde(default)]
    pub skipped: Vec<QuestionId>,
    pub turns: usize,
    pub phase: Phase,
    #[serde(default)]
    pub pending: Option<Guess>,
    #[serde(default)]
    pub wrong_guesses: usize,
}

impl SessionSnapshot {
    pub fn capture(session: &Session) -> Self {
        let kb = session.knowledge_base();
        let state = session.belief();
        let belief = kb
            .entities()
            .iter()
            .zip(state.probs())
            .map(|(entity, p)| BeliefEntry {
                entity: entity.id.clone(),
                probability: *p,
            })
            .collect();
        let pick = |mask: &[bool]| -> Vec<QuestionId> {
            mask.iter()
                .enumerate()
                .filter(|(_, set)| **set)
                .map(|(index, _)| kb.question(index).id.clone())
                .collect()
        };
        SessionSnapshot {
            config: *session.config(),
            belief,
            asked: pick(state.asked_mask()),
            skipped: pick(state.skipped_mask()),
            turns: state.turns(),
            phase: session.phase(),
            pending: session.pending_guess().cloned(),
            wrong_guesses: session.wrong_guesses(),
        }
    }

    pub fn restore(self, kb: Arc<KnowledgeBase>) -> Result<Session, SnapshotError> {
        let mut weights: Vec<Option<f64>> = vec![None; kb.entity_count()];
        for entry in &self.belief {
            let index = kb
                .entity_index(entry.entity.as_str())
                .ok_or_else(|| SnapshotError::UnknownEntity(entry.entity.to_string()))?;
            weights[index] = Some(entry.probability);
        }
        let weights = weights
            .into_iter()
            .enumerate()
            .map(|(index, weight)| {
                weight.ok_or_else(|| SnapshotError::MissingEntity(kb.entity(index).id.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let asked = question_mask(&kb, &self.asked)?;
        let skipped = question_mask(&kb, &self.skipped)?;
        let belief = BeliefState::from_parts(weights, asked, skipped, self.turns)
            .ok_or(SnapshotError::InvalidBelief)?;

        if let Some(guess) = &self.pending {
            if kb.entity_index(guess.entity.as_str()).is_none() {
                return Err(SnapshotError::UnknownEntity(guess.entity.to_string()));
            }
        }
        if (self.phase == Phase::Guessing) != self.pending.is_some() {
            return Err(SnapshotError::PendingMismatch { phase: self.phase });
        }

        Ok(Session::from_parts(
            kb,
            self.config,
            belief,
            self.phase,
            self.pending,
            self.wrong_guesses,
        )?)
    }

    pub fn to_json(session: &Session) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&Self::capture(session))
    }

    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(json)?)
    }
}

fn question_mask(kb: &KnowledgeBase, ids: &[QuestionId]) -> Result<Vec<bool>, SnapshotError> {
    let mut mask = vec![false; kb.question_count()];
    for id in ids {
        let index = kb
            .question_index(id.as_str())
            .ok_or_else(|| SnapshotError::UnknownQuestion(id.to_string()))?;
        mask[index] = true;
    }
    Ok(mask)
}
