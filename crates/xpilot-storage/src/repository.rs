//! Chat persistence on top of a [`KeyValueStore`].
//!
//! Two independent records: the session list and the learned-facts map,
//! both JSON. Timestamps are RFC 3339 strings on disk and `DateTime<Utc>`
//! once loaded.

use std::sync::Arc;

use tracing::debug;

use xpilot_core::error::XpilotError;
use xpilot_core::types::{LearnedFacts, Session};

use crate::store::KeyValueStore;

/// Key of the session list record.
pub const SESSIONS_KEY: &str = "xpilot-chats";

/// Key of the learned-facts record.
pub const FACTS_KEY: &str = "xpilot-learned-data";

/// Reads and writes chat state to a key-value store.
#[derive(Clone)]
pub struct ChatRepository {
    store: Arc<dyn KeyValueStore>,
}

impl ChatRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Load all stored sessions. A missing record is an empty list.
    pub fn load_sessions(&self) -> Result<Vec<Session>, XpilotError> {
        match self.store.get(SESSIONS_KEY)? {
            Some(json) => {
                let sessions: Vec<Session> = serde_json::from_str(&json)?;
                debug!(count = sessions.len(), "Loaded sessions");
                Ok(sessions)
            }
            None => Ok(Vec::new()),
        }
    }

    /// Persist the session list. Temporary sessions are filtered out here so
    /// no caller can leak one to disk.
    pub fn save_sessions(&self, sessions: &[Session]) -> Result<(), XpilotError> {
        let permanent: Vec<&Session> = sessions.iter().filter(|s| !s.is_temporary).collect();
        let json = serde_json::to_string(&permanent)?;
        self.store.set(SESSIONS_KEY, &json)?;
        debug!(count = permanent.len(), "Saved sessions");
        Ok(())
    }

    /// Remove the session record entirely.
    pub fn clear_sessions(&self) -> Result<(), XpilotError> {
        self.store.remove(SESSIONS_KEY)
    }

    /// Load learned facts. A missing record is an empty map.
    pub fn load_facts(&self) -> Result<LearnedFacts, XpilotError> {
        match self.store.get(FACTS_KEY)? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(LearnedFacts::new()),
        }
    }

    pub fn save_facts(&self, facts: &LearnedFacts) -> Result<(), XpilotError> {
        let json = serde_json::to_string(facts)?;
        self.store.set(FACTS_KEY, &json)
    }

    /// Remove the learned-facts record entirely.
    pub fn clear_facts(&self) -> Result<(), XpilotError> {
        self.store.remove(FACTS_KEY)
    }
}

impl std::fmt::Debug for ChatRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatRepository").finish()
    }
}
