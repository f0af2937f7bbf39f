//! Xpilot Insight crate - heuristic entity extraction from chat messages.
//!
//! Scans what the user types for technology mentions, topic words and a
//! self-introduced name. The results feed the learned-facts memory that
//! personalizes later prompts.

pub mod entity;
pub mod error;

pub use entity::{EntityExtractor, INTERESTS, NAME, TECHNOLOGIES};
pub use error::InsightError;
