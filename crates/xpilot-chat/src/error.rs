//! Error types for the conversational core.

use xpilot_core::error::XpilotError;
use xpilot_insight::InsightError;

/// Errors from the chat engine.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("a message is already being processed")]
    Busy,
    #[error("session not found: {0}")]
    SessionNotFound(uuid::Uuid),
    #[error("config error: {0}")]
    Config(String),
    #[error("storage error: {0}")]
    StorageError(String),
    #[error("state error: {0}")]
    StateError(String),
    #[error("clipboard error: {0}")]
    Clipboard(String),
}

impl From<XpilotError> for ChatError {
    fn from(err: XpilotError) -> Self {
        ChatError::StorageError(err.to_string())
    }
}

impl From<InsightError> for ChatError {
    fn from(err: InsightError) -> Self {
        ChatError::Config(err.to_string())
    }
}
