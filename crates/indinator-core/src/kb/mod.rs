//! Static tables the engine reasons over: entity priors, the question catalog
//! and the likelihood table. Read-only once built; share it behind an `Arc`.

pub mod audit;
pub mod loader;
pub mod lookup;

use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

use crate::model::entity::{Entity, EntityId};
use crate::model::likelihood::{LikelihoodTable, OutcomeDistribution};
use crate::model::question::{Question, QuestionId};

pub use loader::{EntityRecord, KnowledgeFiles, LikelihoodFile, LikelihoodSource};

#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    entities: Vec<Entity>,
    questions: Vec<Question>,
    likelihoods: LikelihoodTable,
    entity_index: HashMap<EntityId, usize>,
    question_index: HashMap<QuestionId, usize>,
}

impl KnowledgeBase {
    /// Validates and assembles a knowledge base. Priors are renormalized to
    /// sum to one.
    pub fn new(
        mut entities: Vec<Entity>,
        questions: Vec<Question>,
        likelihoods: LikelihoodTable,
    ) -> Result<Self, KnowledgeBaseError> {
        if entities.is_empty() {
            return Err(KnowledgeBaseError::Empty("entities"));
        }
        if likelihoods.entity_count() != entities.len()
            || likelihoods.question_count() != questions.len()
        {
            return Err(KnowledgeBaseError::TableShape {
                entities: entities.len(),
                questions: questions.len(),
                table_entities: likelihoods.entity_count(),
                table_questions: likelihoods.question_count(),
            });
        }

        let mut entity_index = HashMap::with_capacity(entities.len());
        for (idx, entity) in entities.iter().enumerate() {
            if entity_index.insert(entity.id.clone(), idx).is_some() {
                return Err(KnowledgeBaseError::DuplicateEntity(entity.id.to_string()));
            }
        }

        let mut question_index = HashMap::with_capacity(questions.len());
        for (idx, question) in questions.iter().enumerate() {
            if question_index.insert(question.id.clone(), idx).is_some() {
                return Err(KnowledgeBaseError::DuplicateQuestion(
                    question.id.to_string(),
                ));
            }
        }

        normalize_priors(&mut entities)?;

        let mut likelihoods = likelihoods;
        for q in 0..questions.len() {
            for e in 0..entities.len() {
                let row = likelihoods.get(q, e);
                let fixed = row
                    .normalized()
                    .ok_or_else(|| KnowledgeBaseError::InvalidDistribution {
                        question: questions[q].id.to_string(),
                        entity: entities[e].id.to_string(),
                        total: row.total(),
                    })?;
                likelihoods.set(q, e, fixed);
            }
        }

        Ok(Self {
            entities,
            questions,
            likelihoods,
            entity_index,
            question_index,
        })
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn entity(&self, index: usize) -> &Entity {
        &self.entities[index]
    }

    pub fn question(&self, index: usize) -> &Question {
        &self.questions[index]
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    pub fn entity_index(&self, id: &str) -> Option<usize> {
        self.entity_index.get(id).copied()
    }

    pub fn question_index(&self, id: &str) -> Option<usize> {
        self.question_index.get(id).copied()
    }

    pub fn likelihoods(&self) -> &LikelihoodTable {
        &self.likelihoods
    }

    pub fn likelihood(&self, question: usize, entity: usize) -> &OutcomeDistribution {
        self.likelihoods.get(question, entity)
    }

    pub fn priors(&self) -> Vec<f64> {
        self.entities.iter().map(|entity| entity.prior).collect()
    }

    /// Copy of this knowledge base with replaced priors, in entity order.
    pub fn with_priors(&self, priors: &[f64]) -> Result<Self, KnowledgeBaseError> {
        if priors.len() != self.entities.len() {
            return Err(KnowledgeBaseError::InvalidPrior {
                entity: "<all>".to_string(),
                reason: format!(
                    "expected {} priors, got {}",
                    self.entities.len(),
                    priors.len()
                ),
            });
        }
        let entities = self
            .entities
            .iter()
            .zip(priors)
            .map(|(entity, prior)| Entity {
                prior: *prior,
                ..entity.clone()
            })
            .collect();
        Self::new(entities, self.questions.clone(), self.likelihoods.clone())
    }
}

fn normalize_priors(entities: &mut [Entity]) -> Result<(), KnowledgeBaseError> {
    for entity in entities.iter() {
        if !entity.prior.is_finite() || entity.prior < 0.0 {
            return Err(KnowledgeBaseError::InvalidPrior {
                entity: entity.id.to_string(),
                reason: format!("prior {} is negative or not finite", entity.prior),
            });
        }
    }
    let total: f64 = entities.iter().map(|entity| entity.prior).sum();
    if total <= 0.0 {
        return Err(KnowledgeBaseError::InvalidPrior {
            entity: "<all>".to_string(),
            reason: "priors sum to zero".to_string(),
        });
    }
    for entity in entities.iter_mut() {
        entity.prior /= total;
    }
    Ok(())
}

/// Load-time failures. All of them are fatal for session creation.
#[derive(Debug, Error)]
pub enum KnowledgeBaseError {
    #[error("failed to read {path:?}: {source}")]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("failed to parse {path:?}: {source}")]
    Parse {
        #[source]
        source: serde_json::Error,
        path: PathBuf,
    },
    #[error("knowledge base has no {0}")]
    Empty(&'static str),
    #[error("entity '{0}' defined more than once")]
    DuplicateEntity(String),
    #[error("question '{0}' defined more than once")]
    DuplicateQuestion(String),
    #[error("'{referenced_by}' references unknown entity '{entity}'")]
    UnknownEntity { entity: String, referenced_by: String },
    #[error("likelihood table references unknown question '{0}'")]
    UnknownQuestion(String),
    #[error("no likelihood for question '{question}' and entity '{entity}'")]
    MissingLikelihood { question: String, entity: String },
    #[error("likelihood for question '{question}' and entity '{entity}' sums to {total}")]
    InvalidDistribution {
        question: String,
        entity: String,
        total: f64,
    },
    #[error("invalid prior for '{entity}': {reason}")]
    InvalidPrior { entity: String, reason: String },
    #[error(
        "likelihood table is {table_questions}x{table_entities}, expected {questions}x{entities}"
    )]
    TableShape {
        entities: usize,
        questions: usize,
        table_entities: usize,
        table_questions: usize,
    },
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::model::likelihood::TraitModel;

    /// Four entities with equal priors and three questions:
    /// `a_only` separates A from the rest, `ab` splits {A, B} from {C, D},
    /// `flat` carries no information.
    pub fn four_way() -> KnowledgeBase {
        let entities = vec![
            Entity::new("a", "Alpha", 1.0),
            Entity::new("b", "Bravo", 1.0),
            Entity::new("c", "Charlie", 1.0),
            Entity::new("d", "Delta", 1.0),
        ];
        let questions = vec![
            Question::new("a_only", "Is it Alpha?"),
            Question::new("ab", "Is it Alpha or Bravo?"),
            Question::new("flat", "Is it anything?"),
        ];
        let model = TraitModel::default();
        let mut table = LikelihoodTable::filled(4, 3, model.neutral);
        let a_favoured = OutcomeDistribution::new(0.9, 0.1, 0.0);
        let a_opposed = OutcomeDistribution::new(0.1, 0.9, 0.0);
        for e in 0..4 {
            table.set(0, e, if e == 0 { a_favoured } else { a_opposed });
            table.set(1, e, if e < 2 { model.matched } else { model.opposite });
        }
        KnowledgeBase::new(entities, questions, table).expect("fixture is valid")
    }
}
