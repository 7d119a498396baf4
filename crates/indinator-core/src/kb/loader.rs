//! JSON documents the knowledge base is built from.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{KnowledgeBase, KnowledgeBaseError};
use crate::model::entity::Entity;
use crate::model::likelihood::{LikelihoodTable, OutcomeDistribution, TraitModel};
use crate::model::question::Question;

/// Entry of `entities.json`. A missing name falls back to the id; priors are
/// either given for every entity or for none (uniform).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prior: Option<f64>,
}

impl EntityRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>, prior: Option<f64>) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()),
            prior,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum QuestionDocument {
    Wrapped { questions: Vec<Question> },
    Bare(Vec<Question>),
}

impl QuestionDocument {
    fn into_questions(self) -> Vec<Question> {
        match self {
            QuestionDocument::Wrapped { questions } | QuestionDocument::Bare(questions) => {
                questions
            }
        }
    }
}

/// `{question_id: {entity_id: {yes, no, maybe}}}`
pub type LikelihoodDocument = HashMap<String, HashMap<String, OutcomeDistribution>>;

/// Traits of one entity, either as a list of trait names or as a flag map.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TraitRecord {
    List(Vec<String>),
    Flags(HashMap<String, TraitFlag>),
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TraitFlag {
    Bool(bool),
    Number(f64),
}

impl TraitFlag {
    fn is_set(self) -> bool {
        match self {
            TraitFlag::Bool(value) => value,
            TraitFlag::Number(value) => value >= 0.5,
        }
    }
}

impl TraitRecord {
    pub fn has(&self, trait_name: &str) -> bool {
        match self {
            TraitRecord::List(traits) => traits.iter().any(|t| t == trait_name),
            TraitRecord::Flags(flags) => flags.get(trait_name).is_some_and(|flag| flag.is_set()),
        }
    }

    /// Whether the record mentions the trait at all, set or not.
    pub fn defines(&self, trait_name: &str) -> bool {
        match self {
            TraitRecord::List(traits) => traits.iter().any(|t| t == trait_name),
            TraitRecord::Flags(flags) => flags.contains_key(trait_name),
        }
    }
}

pub enum LikelihoodSource {
    Table(LikelihoodDocument),
    Traits {
        traits: HashMap<String, TraitRecord>,
        model: TraitModel,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LikelihoodFile {
    Table(PathBuf),
    Traits(PathBuf),
}

/// Paths of the three documents a knowledge base is loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnowledgeFiles {
    pub entities: PathBuf,
    pub questions: PathBuf,
    pub likelihoods: LikelihoodFile,
}

impl KnowledgeFiles {
    pub fn load(&self, model: TraitModel) -> Result<KnowledgeBase, KnowledgeBaseError> {
        let entities: Vec<EntityRecord> = read_json(&self.entities)?;
        let questions = read_json::<QuestionDocument>(&self.questions)?.into_questions();
        let source = match &self.likelihoods {
            LikelihoodFile::Table(path) => LikelihoodSource::Table(read_json(path)?),
            LikelihoodFile::Traits(path) => LikelihoodSource::Traits {
                traits: read_json(path)?,
                model,
            },
        };
        let kb = build(entities, questions, source)?;
        debug!(
            target: "indinator::kb",
            entities = kb.entity_count(),
            questions = kb.question_count(),
            "knowledge base loaded"
        );
        Ok(kb)
    }
}

/// Parses a `questions.json` document in either of its accepted shapes.
pub fn parse_questions(json: &str) -> serde_json::Result<Vec<Question>> {
    serde_json::from_str::<QuestionDocument>(json).map(QuestionDocument::into_questions)
}

/// Reads a `traits.json` document.
pub fn read_traits(path: &Path) -> Result<HashMap<String, TraitRecord>, KnowledgeBaseError> {
    read_json(path)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, KnowledgeBaseError> {
    let file = File::open(path).map_err(|source| KnowledgeBaseError::Read {
        source,
        path: path.to_path_buf(),
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| KnowledgeBaseError::Parse {
        source,
        path: path.to_path_buf(),
    })
}

/// Assembles a knowledge base from parsed documents, failing on any dangling
/// or missing reference.
pub fn build(
    records: Vec<EntityRecord>,
    questions: Vec<Question>,
    source: LikelihoodSource,
) -> Result<KnowledgeBase, KnowledgeBaseError> {
    if let Some(id) = first_duplicate(records.iter().map(|record| record.id.as_str())) {
        return Err(KnowledgeBaseError::DuplicateEntity(id.to_string()));
    }
    if let Some(id) = first_duplicate(questions.iter().map(|question| question.id.as_str())) {
        return Err(KnowledgeBaseError::DuplicateQuestion(id.to_string()));
    }

    let entities = resolve_entities(records)?;
    let entity_lookup: HashMap<&str, usize> = entities
        .iter()
        .enumerate()
        .map(|(idx, entity)| (entity.id.as_str(), idx))
        .collect();

    let table = match source {
        LikelihoodSource::Table(document) => {
            table_from_document(&entities, &questions, &entity_lookup, document)?
        }
        LikelihoodSource::Traits { traits, model } => {
            table_from_traits(&entities, &questions, &entity_lookup, &traits, model)?
        }
    };

    KnowledgeBase::new(entities, questions, table)
}

fn first_duplicate<'a>(mut ids: impl Iterator<Item = &'a str>) -> Option<&'a str> {
    let mut seen = HashSet::new();
    ids.find(|id| !seen.insert(*id))
}

fn resolve_entities(records: Vec<EntityRecord>) -> Result<Vec<Entity>, KnowledgeBaseError> {
    let with_prior = records.iter().filter(|r| r.prior.is_some()).count();
    if with_prior != 0 && with_prior != records.len() {
        let missing = records
            .iter()
            .find(|r| r.prior.is_none())
            .map(|r| r.id.clone())
            .unwrap_or_default();
        return Err(KnowledgeBaseError::InvalidPrior {
            entity: missing,
            reason: "prior missing while other entities define one".to_string(),
        });
    }

    Ok(records
        .into_iter()
        .map(|record| {
            let name = record.name.unwrap_or_else(|| record.id.clone());
            Entity::new(record.id, name, record.prior.unwrap_or(1.0))
        })
        .collect())
}

fn table_from_document(
    entities: &[Entity],
    questions: &[Question],
    entity_lookup: &HashMap<&str, usize>,
    document: LikelihoodDocument,
) -> Result<LikelihoodTable, KnowledgeBaseError> {
    let question_lookup: HashMap<&str, usize> = questions
        .iter()
        .enumerate()
        .map(|(idx, question)| (question.id.as_str(), idx))
        .collect();

    let mut filled = vec![false; entities.len() * questions.len()];
    let mut table = LikelihoodTable::filled(
        entities.len(),
        questions.len(),
        OutcomeDistribution::new(0.0, 0.0, 0.0),
    );

    for (question_id, rows) in document {
        let q = *question_lookup
            .get(question_id.as_str())
            .ok_or_else(|| KnowledgeBaseError::UnknownQuestion(question_id.clone()))?;
        for (entity_id, row) in rows {
            let e = *entity_lookup.get(entity_id.as_str()).ok_or_else(|| {
                KnowledgeBaseError::UnknownEntity {
                    entity: entity_id.clone(),
                    referenced_by: question_id.clone(),
                }
            })?;
            table.set(q, e, row);
            filled[q * entities.len() + e] = true;
        }
    }

    for (q, question) in questions.iter().enumerate() {
        for (e, entity) in entities.iter().enumerate() {
            if !filled[q * entities.len() + e] {
                return Err(KnowledgeBaseError::MissingLikelihood {
                    question: question.id.to_string(),
                    entity: entity.id.to_string(),
                });
            }
        }
    }

    Ok(table)
}

fn table_from_traits(
    entities: &[Entity],
    questions: &[Question],
    entity_lookup: &HashMap<&str, usize>,
    traits: &HashMap<String, TraitRecord>,
    model: TraitModel,
) -> Result<LikelihoodTable, KnowledgeBaseError> {
    if let Some(unknown) = traits
        .keys()
        .find(|id| !entity_lookup.contains_key(id.as_str()))
    {
        return Err(KnowledgeBaseError::UnknownEntity {
            entity: unknown.clone(),
            referenced_by: "traits".to_string(),
        });
    }

    let mut table = LikelihoodTable::filled(entities.len(), questions.len(), model.neutral);
    for (q, question) in questions.iter().enumerate() {
        let Some(trait_name) = question.trait_name.as_deref() else {
            continue;
        };
        for (e, entity) in entities.iter().enumerate() {
            let has_trait = traits
                .get(entity.id.as_str())
                .is_some_and(|record| record.has(trait_name));
            table.set(q, e, model.distribution(Some(has_trait)));
        }
    }
    Ok(table)
}
