use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::session::Session;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::kb::KnowledgeBase;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(u64);

impl SessionId {
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Owns independent sessions over one shared knowledge base. Identifiers are
/// never reused. Callers that share a registry across threads wrap it in a
/// lock themselves.
#[derive(Debug)]
pub struct SessionRegistry {
    kb: Arc<KnowledgeBase>,
    config: EngineConfig,
    sessions: HashMap<SessionId, Session>,
    next_id: u64,
}

impl SessionRegistry {
    pub fn new(kb: Arc<KnowledgeBase>, config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self {
            kb,
            config,
            sessions: HashMap::new(),
            next_id: 1,
        })
    }

    pub fn knowledge_base(&self) -> &Arc<KnowledgeBase> {
        &self.kb
    }

    pub fn create(&mut self) -> Result<SessionId, EngineError> {
        let session = Session::new(Arc::clone(&self.kb), self.config)?;
        let id = SessionId(self.next_id);
        self.next_id += 1;
        self.sessions.insert(id, session);
        Ok(id)
    }

    pub fn get(&self, id: SessionId) -> Result<&Session, EngineError> {
        self.sessions.get(&id).ok_or(EngineError::UnknownSession(id))
    }

    pub fn get_mut(&mut self, id: SessionId) -> Result<&mut Session, EngineError> {
        self.sessions
            .get_mut(&id)
            .ok_or(EngineError::UnknownSession(id))
    }

    pub fn remove(&mut self, id: SessionId) -> Result<Session, EngineError> {
        self.sessions
            .remove(&id)
            .ok_or(EngineError::UnknownSession(id))
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kb::fixtures::four_way;
    use crate::model::answer::Answer;

    fn registry() -> SessionRegistry {
        SessionRegistry::new(Arc::new(four_way()), EngineConfig::default()).unwrap()
    }

    #[test]
    fn sessions_do_not_share_beliefs() {
        let mut registry = registry();
        let first = registry.create().unwrap();
        let second = registry.create().unwrap();
        assert_ne!(first, second);

        registry
            .get_mut(first)
            .unwrap()
            .update_probabilities("a_only", Answer::Yes, None, None)
            .unwrap();

        assert_eq!(registry.get(first).unwrap().questions_asked(), 1);
        assert_eq!(registry.get(second).unwrap().questions_asked(), 0);
        assert_eq!(registry.get(second).unwrap().belief().probs(), &[0.25; 4]);
    }

    #[test]
    fn removed_ids_are_not_reused() {
        let mut registry = registry();
        let id = registry.create().unwrap();
        registry.remove(id).unwrap();
        assert!(registry.is_empty());
        assert_eq!(
            registry.get(id).unwrap_err(),
            EngineError::UnknownSession(id)
        );
        let next = registry.create().unwrap();
        assert!(next.get() > id.get());
    }
}
