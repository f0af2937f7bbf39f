//! Session manager: owns chat sessions and drives each conversational turn.
//!
//! A turn runs: learn facts from the user's text, append the user message,
//! answer it (canned reply or model call), annotate the reply, append it,
//! title the session on its first exchange, and persist. Temporary sessions
//! go through the same steps but never learn, never see learned facts, and
//! never reach storage.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use xpilot_core::config::XpilotConfig;
use xpilot_core::types::{derive_title, LearnedFacts, Message, Session};
use xpilot_insight::EntityExtractor;
use xpilot_storage::ChatRepository;

use crate::clipboard::Clipboard;
use crate::error::ChatError;
use crate::llm::{LlmClient, PromptRequest};
use crate::memory::MemoryContext;
use crate::response::ResponseGenerator;

/// Speaker label for user lines in a shared transcript.
const USER_LABEL: &str = "You";

/// Per-turn toggles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SendOptions {
    /// Ask for code only; disables emoji annotation.
    pub generate_code: bool,
    /// Ask for a longer, more thorough answer.
    pub think_deeply: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Turn {
    /// A new user message.
    Fresh,
    /// Re-answer the user message already at the end of the session.
    Regenerate,
}

#[derive(Debug)]
struct ChatState {
    /// Most recently created first.
    sessions: Vec<Session>,
    current: Option<Uuid>,
    temporary_mode: bool,
    last_error: Option<String>,
}

/// Clears the loading flag when a turn ends, however it ends.
struct LoadingGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> LoadingGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Owns the session list, the learned-facts memory and the per-turn flow.
pub struct SessionManager {
    state: Mutex<ChatState>,
    loading: AtomicBool,
    repository: ChatRepository,
    memory: MemoryContext,
    extractor: EntityExtractor,
    responses: ResponseGenerator,
    llm: Arc<dyn LlmClient>,
    clipboard: Arc<dyn Clipboard>,
    assistant_name: String,
}

impl SessionManager {
    /// Restore persisted sessions and set up the first current session.
    ///
    /// Stored temporary sessions are dropped. With nothing stored a fresh
    /// session is created and persisted. A session list that cannot be read
    /// is treated as empty.
    pub fn load(
        config: &XpilotConfig,
        repository: ChatRepository,
        memory: MemoryContext,
        llm: Arc<dyn LlmClient>,
        clipboard: Arc<dyn Clipboard>,
    ) -> Result<Self, ChatError> {
        let mut sessions = match repository.load_sessions() {
            Ok(sessions) => sessions,
            Err(e) => {
                warn!(error = %e, "Failed to load sessions, starting empty");
                Vec::new()
            }
        };
        sessions.retain(|s| !s.is_temporary);

        let manager = Self {
            state: Mutex::new(ChatState {
                sessions,
                current: None,
                temporary_mode: false,
                last_error: None,
            }),
            loading: AtomicBool::new(false),
            repository,
            memory,
            extractor: EntityExtractor::new(&config.extraction)?,
            responses: ResponseGenerator::new(&config.persona),
            llm,
            clipboard,
            assistant_name: config.persona.assistant_name.clone(),
        };

        {
            let mut state = manager.lock_state()?;
            match state.sessions.first().map(|s| s.id) {
                Some(head) => state.current = Some(head),
                None => {
                    Self::insert_session(&mut state, false);
                    manager.persist(&state.sessions);
                }
            }
            info!(sessions = state.sessions.len(), "Session manager ready");
        }

        Ok(manager)
    }

    fn lock_state(&self) -> Result<MutexGuard<'_, ChatState>, ChatError> {
        self.state
            .lock()
            .map_err(|e| ChatError::StateError(format!("session lock poisoned: {}", e)))
    }

    fn persist(&self, sessions: &[Session]) {
        if let Err(e) = self.repository.save_sessions(sessions) {
            warn!(error = %e, "Failed to persist sessions");
        }
    }

    fn insert_session(state: &mut ChatState, temporary: bool) -> Session {
        let session = Session::new(temporary);
        state.sessions.insert(0, session.clone());
        state.current = Some(session.id);
        state.temporary_mode = temporary;
        session
    }

    fn session_mut(state: &mut ChatState, id: Uuid) -> Result<&mut Session, ChatError> {
        state
            .sessions
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(ChatError::SessionNotFound(id))
    }

    // =========================================================================
    // Session lifecycle
    // =========================================================================

    /// Create a session, put it at the head of the list and make it current.
    pub fn create_session(&self, temporary: bool) -> Result<Session, ChatError> {
        let mut state = self.lock_state()?;
        let session = Self::insert_session(&mut state, temporary);
        if !temporary {
            self.persist(&state.sessions);
        }
        info!(session_id = %session.id, temporary, "Created session");
        Ok(session)
    }

    /// Make an existing session current. Returns `false` for an unknown id.
    pub fn switch_session(&self, id: Uuid) -> Result<bool, ChatError> {
        let mut state = self.lock_state()?;
        let Some(temporary) = state
            .sessions
            .iter()
            .find(|s| s.id == id)
            .map(|s| s.is_temporary)
        else {
            return Ok(false);
        };
        state.current = Some(id);
        state.temporary_mode = temporary;
        debug!(session_id = %id, "Switched session");
        Ok(true)
    }

    /// Delete a session. Deleting the current one promotes the new head of
    /// the list, or a fresh session when none remain.
    pub fn delete_session(&self, id: Uuid) -> Result<bool, ChatError> {
        let mut state = self.lock_state()?;
        let Some(pos) = state.sessions.iter().position(|s| s.id == id) else {
            return Ok(false);
        };
        state.sessions.remove(pos);

        if state.current == Some(id) {
            match state.sessions.first().map(|s| (s.id, s.is_temporary)) {
                Some((head, temporary)) => {
                    state.current = Some(head);
                    state.temporary_mode = temporary;
                }
                None => {
                    Self::insert_session(&mut state, false);
                }
            }
        }

        self.persist(&state.sessions);
        info!(session_id = %id, "Deleted session");
        Ok(true)
    }

    /// Drop every session and start over with one fresh session.
    pub fn clear_all_sessions(&self) -> Result<Session, ChatError> {
        let mut state = self.lock_state()?;
        state.sessions.clear();
        let session = Self::insert_session(&mut state, false);
        self.persist(&state.sessions);
        info!("Cleared all sessions");
        Ok(session)
    }

    // =========================================================================
    // Turns
    // =========================================================================

    /// Send a user message in the current session and wait for the reply.
    ///
    /// Whitespace-only text and a missing current session are no-ops. Fails
    /// with [`ChatError::Busy`] while another turn is in flight.
    pub async fn send_user_message(
        &self,
        text: &str,
        options: SendOptions,
    ) -> Result<(), ChatError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }
        let _loading = self.begin_turn()?;
        let result = self.run_turn(text, options, Turn::Fresh).await;
        self.finish_turn(result)
    }

    /// Replace the answer to the last user message.
    ///
    /// Needs at least two messages. The previous answer's code mode is
    /// reused; think-deeply is off and no facts are learned again.
    pub async fn regenerate_last_response(&self) -> Result<(), ChatError> {
        let _loading = self.begin_turn()?;
        let prepared = self.last_question();
        let Some((text, generate_code)) = self.finish_turn(prepared)? else {
            return Ok(());
        };
        let options = SendOptions {
            generate_code,
            think_deeply: false,
        };
        let result = self.run_turn(&text, options, Turn::Regenerate).await;
        self.finish_turn(result)
    }

    fn begin_turn(&self) -> Result<LoadingGuard<'_>, ChatError> {
        let guard = LoadingGuard::acquire(&self.loading).ok_or(ChatError::Busy)?;
        self.lock_state()?.last_error = None;
        Ok(guard)
    }

    fn finish_turn<T>(&self, result: Result<T, ChatError>) -> Result<T, ChatError> {
        if let Err(e) = &result {
            error!(error = %e, "Chat turn failed");
            if let Ok(mut state) = self.state.lock() {
                state.last_error = Some(e.to_string());
            }
        }
        result
    }

    /// The last user message and the code mode of the answer after it.
    fn last_question(&self) -> Result<Option<(String, bool)>, ChatError> {
        let mut state = self.lock_state()?;
        let Some(id) = state.current else {
            return Ok(None);
        };
        let session = Self::session_mut(&mut state, id)?;
        if session.messages.len() < 2 {
            return Ok(None);
        }
        let Some(user_index) = session.last_user_index() else {
            return Ok(None);
        };
        let generate_code = session
            .messages
            .last()
            .and_then(|m| m.is_code)
            .unwrap_or(false);
        let text = session.messages[user_index].text.clone();
        Ok(Some((text, generate_code)))
    }

    async fn run_turn(&self, text: &str, options: SendOptions, turn: Turn) -> Result<(), ChatError> {
        let (session_id, temporary) = {
            let state = self.lock_state()?;
            match state.current {
                Some(id) => (id, state.temporary_mode),
                None => return Ok(()),
            }
        };

        if turn == Turn::Fresh && !temporary {
            let extracted = self.extractor.extract(text);
            self.memory.learn(&extracted)?;
        }

        let first_exchange = match turn {
            Turn::Fresh => {
                let mut state = self.lock_state()?;
                let session = Self::session_mut(&mut state, session_id)?;
                let first = session.is_empty();
                session.push_message(Message::user(text));
                first
            }
            Turn::Regenerate => false,
        };

        let reply = match self.responses.canned_reply(text) {
            Some(reply) => {
                debug!("Answered locally");
                reply
            }
            None => {
                let facts = if temporary {
                    LearnedFacts::new()
                } else {
                    self.memory.snapshot()?
                };
                let request = PromptRequest {
                    text: text.to_string(),
                    generate_code: options.generate_code,
                    think_deeply: options.think_deeply,
                    facts,
                    temporary,
                };
                let reply = self.llm.send(&request).await;
                self.responses.finish(reply, options.generate_code)
            }
        };

        let mut state = self.lock_state()?;
        let session = Self::session_mut(&mut state, session_id)?;
        // The old answer stays until its replacement is ready.
        if turn == Turn::Regenerate {
            if let Some(user_index) = session.last_user_index() {
                session.messages.truncate(user_index + 1);
                debug!(session_id = %session_id, "Dropped last answer for regeneration");
            }
        }
        session.push_message(Message::assistant(reply, options.generate_code));
        if first_exchange && !session.is_temporary {
            session.title = derive_title(text);
        }
        let messages = session.messages.len();
        if !temporary {
            self.persist(&state.sessions);
        }
        debug!(session_id = %session_id, messages, "Turn complete");
        Ok(())
    }

    // =========================================================================
    // Memory
    // =========================================================================

    pub fn clear_learned_facts(&self) -> Result<(), ChatError> {
        self.memory.clear()?;
        info!("Cleared learned facts");
        Ok(())
    }

    pub fn update_learned_facts(&self, facts: LearnedFacts) -> Result<(), ChatError> {
        self.memory.replace(facts)
    }

    pub fn forget_category(&self, category: &str) -> Result<bool, ChatError> {
        self.memory.forget_category(category)
    }

    pub fn forget_value(&self, category: &str, value: &str) -> Result<bool, ChatError> {
        self.memory.forget_value(category, value)
    }

    // =========================================================================
    // Sharing
    // =========================================================================

    /// Copy a session transcript to the clipboard and describe the outcome.
    ///
    /// An unknown id falls back to the current session.
    pub async fn share_session(&self, id: Uuid) -> String {
        let transcript = match self.lock_state() {
            Ok(state) => state
                .sessions
                .iter()
                .find(|s| s.id == id)
                .or_else(|| {
                    state
                        .current
                        .and_then(|current| state.sessions.iter().find(|s| s.id == current))
                })
                .map(|s| render_transcript(s, &self.assistant_name)),
            Err(e) => {
                warn!(error = %e, "Cannot read sessions for sharing");
                None
            }
        };

        let Some(transcript) = transcript else {
            return "No session to share".to_string();
        };

        match self.clipboard.write_text(&transcript).await {
            Ok(()) => "Chat copied to clipboard".to_string(),
            Err(e) => {
                warn!(error = %e, "Failed to copy chat");
                "Failed to copy chat".to_string()
            }
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn current_session(&self) -> Option<Session> {
        let state = self.lock_state().ok()?;
        let id = state.current?;
        state.sessions.iter().find(|s| s.id == id).cloned()
    }

    pub fn sessions(&self) -> Vec<Session> {
        match self.lock_state() {
            Ok(state) => state.sessions.clone(),
            Err(_) => vec![],
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Acquire)
    }

    pub fn is_temporary_mode(&self) -> bool {
        self.lock_state()
            .map(|state| state.temporary_mode)
            .unwrap_or(false)
    }

    pub fn last_error(&self) -> Option<String> {
        self.lock_state().ok().and_then(|state| state.last_error.clone())
    }

    pub fn learned_facts(&self) -> LearnedFacts {
        self.memory.snapshot().unwrap_or_default()
    }
}

/// Plain-text transcript: one paragraph per message, labeled by speaker.
pub fn render_transcript(session: &Session, assistant_name: &str) -> String {
    session
        .messages
        .iter()
        .map(|m| {
            let label = if m.is_user() { USER_LABEL } else { assistant_name };
            format!("{}: {}", label, m.text)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

// =============================================================================
// Tests
// =============================================================================
