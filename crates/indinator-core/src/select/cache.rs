use super::select_best_question;
use crate::belief::BeliefState;
use crate::kb::KnowledgeBase;

/// Remembers the last selection keyed by the belief's summary hash, so asking
/// twice without an intervening update does not rescan the catalog.
#[derive(Debug, Clone, Default)]
pub struct SelectionCache {
    entry: Option<(u64, Option<usize>)>,
    hits: u64,
    misses: u64,
}

impl SelectionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(&mut self, belief: &BeliefState, kb: &KnowledgeBase) -> Option<usize> {
        let key = belief.summary_hash();
        if let Some((cached_key, choice)) = self.entry {
            if cached_key == key {
                self.hits += 1;
                return choice;
            }
        }
        self.misses += 1;
        let choice = select_best_question(belief, kb);
        self.entry = Some((key, choice));
        choice
    }

    pub fn clear(&mut self) {
        self.entry = None;
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}
