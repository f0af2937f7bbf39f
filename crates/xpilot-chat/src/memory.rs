//! Learned-facts memory.
//!
//! Wraps the in-memory [`LearnedFacts`] map and keeps its persisted copy in
//! step. Persistence failures are logged, never surfaced: the conversation
//! keeps working with whatever is in memory.

use std::sync::{Mutex, MutexGuard};

use tracing::{debug, warn};

use xpilot_core::types::LearnedFacts;
use xpilot_storage::ChatRepository;

use crate::error::ChatError;

/// Shared facts about the user, accumulated across non-temporary chats.
#[derive(Debug)]
pub struct MemoryContext {
    facts: Mutex<LearnedFacts>,
    repository: ChatRepository,
}

impl MemoryContext {
    pub fn new(repository: ChatRepository, facts: LearnedFacts) -> Self {
        Self {
            facts: Mutex::new(facts),
            repository,
        }
    }

    /// Start from whatever is persisted. An unreadable record starts empty.
    pub fn load(repository: ChatRepository) -> Self {
        let facts = match repository.load_facts() {
            Ok(facts) => facts,
            Err(e) => {
                warn!(error = %e, "Failed to load learned facts, starting empty");
                LearnedFacts::new()
            }
        };
        Self::new(repository, facts)
    }

    fn lock(&self) -> Result<MutexGuard<'_, LearnedFacts>, ChatError> {
        self.facts
            .lock()
            .map_err(|e| ChatError::StateError(format!("facts lock poisoned: {}", e)))
    }

    fn persist(&self, facts: &LearnedFacts) {
        if let Err(e) = self.repository.save_facts(facts) {
            warn!(error = %e, "Failed to persist learned facts");
        }
    }

    pub fn snapshot(&self) -> Result<LearnedFacts, ChatError> {
        Ok(self.lock()?.clone())
    }

    /// Merge newly extracted facts. Persists only when something was added.
    pub fn learn(&self, incoming: &LearnedFacts) -> Result<bool, ChatError> {
        if incoming.is_empty() {
            return Ok(false);
        }
        let mut facts = self.lock()?;
        let changed = facts.merge(incoming);
        if changed {
            debug!(categories = facts.len(), "Learned new facts");
            self.persist(&facts);
        }
        Ok(changed)
    }

    /// Replace the whole map, as an editor would.
    pub fn replace(&self, new_facts: LearnedFacts) -> Result<(), ChatError> {
        let mut facts = self.lock()?;
        *facts = new_facts;
        self.persist(&facts);
        Ok(())
    }

    /// Forget everything and drop the persisted record.
    pub fn clear(&self) -> Result<(), ChatError> {
        self.lock()?.clear();
        if let Err(e) = self.repository.clear_facts() {
            warn!(error = %e, "Failed to remove learned facts record");
        }
        Ok(())
    }

    pub fn forget_category(&self, category: &str) -> Result<bool, ChatError> {
        let mut facts = self.lock()?;
        let removed = facts.remove_category(category);
        if removed {
            self.persist(&facts);
        }
        Ok(removed)
    }

    pub fn forget_value(&self, category: &str, value: &str) -> Result<bool, ChatError> {
        let mut facts = self.lock()?;
        let removed = facts.remove_value(category, value);
        if removed {
            self.persist(&facts);
        }
        Ok(removed)
    }
}
