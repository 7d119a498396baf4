//! Flags questions that cannot separate candidates well.

use serde::Serialize;
use std::collections::HashMap;

use super::KnowledgeBase;
use super::loader::TraitRecord;

const MIN_EXAMPLES: usize = 2;
const BALANCE_LOW: f64 = 0.10;
const BALANCE_HIGH: f64 = 0.90;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditIssue {
    NoPositive,
    NoNegative,
    TooFewPositive,
    TooFewNegative,
    Unbalanced,
    /// The question's trait appears in no entity's trait record.
    MissingTrait,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionAudit {
    pub question: String,
    pub positives: usize,
    pub negatives: usize,
    pub neutral: usize,
    pub positive_share: f64,
    pub issue: Option<AuditIssue>,
}

/// Counts, per question, the entities whose row leans towards "yes" or "no".
/// Questions without a trait whose rows are all neutral carry no signal by
/// construction and are left out.
pub fn audit(kb: &KnowledgeBase) -> Vec<QuestionAudit> {
    report(kb, |_| true)
}

/// Like [`audit`], but also flags questions whose trait no entity defines.
pub fn audit_traits(
    kb: &KnowledgeBase,
    traits: &HashMap<String, TraitRecord>,
) -> Vec<QuestionAudit> {
    report(kb, |trait_name| traits.values().any(|record| record.defines(trait_name)))
}

fn report(kb: &KnowledgeBase, defined: impl Fn(&str) -> bool) -> Vec<QuestionAudit> {
    (0..kb.question_count())
        .filter_map(|q| {
            let mut positives = 0usize;
            let mut negatives = 0usize;
            let mut neutral = 0usize;
            for row in kb.likelihoods().row(q) {
                match row.leaning() {
                    Some(true) => positives += 1,
                    Some(false) => negatives += 1,
                    None => neutral += 1,
                }
            }
            let question = kb.question(q);
            let positive_share = positives as f64 / kb.entity_count() as f64;
            let issue = match question.trait_name.as_deref() {
                None if positives + negatives == 0 => return None,
                Some(trait_name) if !defined(trait_name) => Some(AuditIssue::MissingTrait),
                _ => classify(positives, negatives, positive_share),
            };
            Some(QuestionAudit {
                question: question.id.to_string(),
                positives,
                negatives,
                neutral,
                positive_share,
                issue,
            })
        })
        .collect()
}

fn classify(positives: usize, negatives: usize, share: f64) -> Option<AuditIssue> {
    if positives == 0 {
        Some(AuditIssue::NoPositive)
    } else if negatives == 0 {
        Some(AuditIssue::NoNegative)
    } else if positives <= MIN_EXAMPLES {
        Some(AuditIssue::TooFewPositive)
    } else if negatives <= MIN_EXAMPLES {
        Some(AuditIssue::TooFewNegative)
    } else if !(BALANCE_LOW..=BALANCE_HIGH).contains(&share) {
        Some(AuditIssue::Unbalanced)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kb::fixtures::four_way;
    use crate::kb::loader::{EntityRecord, LikelihoodSource, build};
    use crate::model::likelihood::TraitModel;
    use crate::model::question::Question;

    #[test]
    fn flags_thin_questions_and_skips_traitless_ones() {
        let report = audit(&four_way());
        let by_id = |id: &str| report.iter().find(|r| r.question == id);

        assert!(by_id("flat").is_none());

        let a_only = by_id("a_only").unwrap();
        assert_eq!((a_only.positives, a_only.negatives), (1, 3));
        assert_eq!(a_only.issue, Some(AuditIssue::TooFewPositive));
    }

    #[test]
    fn undefined_traits_are_reported_separately() {
        let records = vec![
            EntityRecord::new("owl", "Owl", None),
            EntityRecord::new("cod", "Cod", None),
        ];
        let questions = vec![
            Question::new("flies", "Does it fly?").with_trait("flies"),
            Question::new("sings", "Does it sing?").with_trait("sings"),
            Question::new("old", "Is it old?"),
        ];
        let traits: HashMap<String, TraitRecord> = serde_json::from_str(
            r#"{"owl": ["flies"], "cod": {"flies": 0}}"#,
        )
        .unwrap();
        let kb = build(
            records,
            questions,
            LikelihoodSource::Traits {
                traits: traits.clone(),
                model: TraitModel::default(),
            },
        )
        .unwrap();

        let report = audit_traits(&kb, &traits);
        assert_eq!(report.len(), 2);
        assert_eq!(report[0].question, "flies");
        assert_eq!((report[0].positives, report[0].negatives), (1, 1));
        assert_ne!(report[0].issue, Some(AuditIssue::MissingTrait));
        assert_eq!(report[1].question, "sings");
        assert_eq!(report[1].issue, Some(AuditIssue::MissingTrait));

        // Without the trait table the same question only looks one-sided.
        let plain = audit(&kb);
        assert_eq!(plain[1].issue, Some(AuditIssue::NoPositive));
    }

    #[test]
    fn balanced_questions_pass() {
        assert_eq!(classify(40, 60, 0.4), None);
        assert_eq!(classify(5, 95, 0.05), Some(AuditIssue::Unbalanced));
    }
}
