//! Conversational core for Xpilot.
//!
//! Owns chat sessions and the learned-facts memory, talks to the language
//! model, and post-processes replies for display.

pub mod clipboard;
pub mod error;
pub mod gemini;
pub mod llm;
pub mod manager;
pub mod markup;
pub mod memory;
pub mod response;
pub mod typing;

pub use clipboard::{Clipboard, CommandClipboard, MemoryClipboard};
pub use error::ChatError;
pub use gemini::GeminiClient;
pub use llm::{build_prompt, LlmClient, LlmError, Prompt, PromptRequest};
pub use manager::{render_transcript, SendOptions, SessionManager};
pub use markup::{contains_code_fence, format_timestamp, parse_code_blocks, ContentPart};
pub use memory::MemoryContext;
pub use response::{EmojiAnnotator, ResponseGenerator};
pub use typing::{animate, TypingAnimation};
