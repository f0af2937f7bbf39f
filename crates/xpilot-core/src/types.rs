use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Title given to a fresh, persistent session before its first message.
pub const DEFAULT_SESSION_TITLE: &str = "New Chat";

/// Fixed title of a temporary session.
pub const TEMPORARY_SESSION_TITLE: &str = "Temporary Chat";

/// Titles longer than this many characters are ellipsized.
pub const MAX_TITLE_CHARS: usize = 30;

// =============================================================================
// Enums
// =============================================================================

/// Who authored a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    /// The human at the keyboard.
    User,
    /// The model.
    Assistant,
}

// =============================================================================
// Messages and sessions
// =============================================================================

/// A single chat message. Immutable once appended to a session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub text: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
    /// Set on assistant messages: whether code mode was requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_code: Option<bool>,
}

impl Message {
    /// Create a user message stamped with the current time.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            sender: Sender::User,
            timestamp: Utc::now(),
            is_code: None,
        }
    }

    /// Create an assistant message stamped with the current time.
    pub fn assistant(text: impl Into<String>, is_code: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            sender: Sender::Assistant,
            timestamp: Utc::now(),
            is_code: Some(is_code),
        }
    }

    pub fn is_user(&self) -> bool {
        self.sender == Sender::User
    }
}

/// One conversation thread.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: Uuid,
    pub title: String,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub is_temporary: bool,
}

impl Session {
    /// Create an empty session.
    pub fn new(temporary: bool) -> Self {
        let now = Utc::now();
        let title = if temporary {
            TEMPORARY_SESSION_TITLE
        } else {
            DEFAULT_SESSION_TITLE
        };
        Self {
            id: Uuid::new_v4(),
            title: title.to_string(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
            is_temporary: temporary,
        }
    }

    /// Append a message and advance `updated_at`.
    pub fn push_message(&mut self, message: Message) {
        self.messages.push(message);
        self.touch();
    }

    /// Set `updated_at` to now, keeping it strictly increasing even when the
    /// clock has not moved since the last update.
    pub fn touch(&mut self) {
        let now = Utc::now();
        self.updated_at = if now > self.updated_at {
            now
        } else {
            self.updated_at + Duration::microseconds(1)
        };
    }

    /// Index of the most recent user message, scanning backward.
    pub fn last_user_index(&self) -> Option<usize> {
        self.messages.iter().rposition(Message::is_user)
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Derive a session title from the first user message.
///
/// Counts characters, not bytes: anything over [`MAX_TITLE_CHARS`] becomes
/// the first 27 characters followed by `"..."`.
pub fn derive_title(text: &str) -> String {
    if text.chars().count() > MAX_TITLE_CHARS {
        let head: String = text.chars().take(MAX_TITLE_CHARS - 3).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

// =============================================================================
// Learned facts
// =============================================================================

/// Category name to distinct values, learned from what the user tells us.
///
/// Values keep first-seen order so prompts built from them are stable, but
/// duplicates within a category are never stored. Stored records go through
/// the same rule on load.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<String, Vec<String>>",
    into = "BTreeMap<String, Vec<String>>"
)]
pub struct LearnedFacts(BTreeMap<String, Vec<String>>);

impl LearnedFacts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of categories.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, category: &str) -> Option<&[String]> {
        self.0.get(category).map(Vec::as_slice)
    }

    pub fn contains(&self, category: &str, value: &str) -> bool {
        self.0
            .get(category)
            .is_some_and(|values| values.iter().any(|v| v == value))
    }

    /// Add one value. Returns `true` if it was not already present.
    pub fn insert(&mut self, category: impl Into<String>, value: impl Into<String>) -> bool {
        let value = value.into();
        let values = self.0.entry(category.into()).or_default();
        if values.contains(&value) {
            return false;
        }
        values.push(value);
        true
    }

    /// Union `other` into `self`. Returns `true` if anything was added.
    pub fn merge(&mut self, other: &LearnedFacts) -> bool {
        let mut changed = false;
        for (category, values) in &other.0 {
            for value in values {
                changed |= self.insert(category.as_str(), value.as_str());
            }
        }
        changed
    }

    /// Drop a whole category. Returns `true` if it existed.
    pub fn remove_category(&mut self, category: &str) -> bool {
        self.0.remove(category).is_some()
    }

    /// Drop one value; an emptied category is removed too.
    pub fn remove_value(&mut self, category: &str, value: &str) -> bool {
        let Some(values) = self.0.get_mut(category) else {
            return false;
        };
        let before = values.len();
        values.retain(|v| v != value);
        let removed = values.len() != before;
        if values.is_empty() {
            self.0.remove(category);
        }
        removed
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

impl From<BTreeMap<String, Vec<String>>> for LearnedFacts {
    fn from(map: BTreeMap<String, Vec<String>>) -> Self {
        let mut facts = LearnedFacts::new();
        for (category, values) in map {
            for value in values {
                facts.insert(category.as_str(), value);
            }
        }
        facts
    }
}

impl From<LearnedFacts> for BTreeMap<String, Vec<String>> {
    fn from(facts: LearnedFacts) -> Self {
        facts.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ---- Title derivation ----

    #[test]
    fn test_derive_title_long_message_ellipsized() {
        let title = derive_title("Explain promises in JavaScript and why they matter here");
        assert_eq!(title, "Explain promises in JavaScr...");
        assert_eq!(title.chars().count(), 30);
    }

    #[test]
    fn test_derive_title_short_message_verbatim() {
        assert_eq!(derive_title("Hello there"), "Hello there");
    }

    #[test]
    fn test_derive_title_exactly_thirty_chars() {
        let text = "a".repeat(30);
        assert_eq!(derive_title(&text), text);
    }

    #[test]
    fn test_derive_title_thirty_one_chars() {
        let text = "b".repeat(31);
        assert_eq!(derive_title(&text), format!("{}...", "b".repeat(27)));
    }

    #[test]
    fn test_derive_title_counts_chars_not_bytes() {
        let text = "\u{00e9}".repeat(31);
        let title = derive_title(&text);
        assert!(title.ends_with("..."));
        assert_eq!(title.chars().count(), 30);
    }

    // ---- Session ----

    #[test]
    fn test_new_session_titles() {
        assert_eq!(Session::new(false).title, DEFAULT_SESSION_TITLE);
        assert_eq!(Session::new(true).title, TEMPORARY_SESSION_TITLE);
        assert!(Session::new(true).is_temporary);
    }

    #[test]
    fn test_push_message_advances_updated_at() {
        let mut session = Session::new(false);
        let before = session.updated_at;
        session.push_message(Message::user("hi"));
        assert!(session.updated_at > before);
        let mid = session.updated_at;
        session.push_message(Message::assistant("hello", false));
        assert!(session.updated_at > mid);
        assert_eq!(session.messages.len(), 2);
    }

    #[test]
    fn test_last_user_index() {
        let mut session = Session::new(false);
        assert_eq!(session.last_user_index(), None);
        session.push_message(Message::user("one"));
        session.push_message(Message::assistant("two", false));
        session.push_message(Message::user("three"));
        session.push_message(Message::assistant("four", true));
        assert_eq!(session.last_user_index(), Some(2));
    }

    #[test]
    fn test_session_json_uses_iso_timestamps() {
        let mut session = Session::new(false);
        session.push_message(Message::assistant("code", true));
        let json = serde_json::to_value(&session).unwrap();
        let created = json["createdAt"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(created).is_ok());
        assert_eq!(json["messages"][0]["sender"], "assistant");
        assert_eq!(json["messages"][0]["isCode"], true);

        let back: Session = serde_json::from_value(json).unwrap();
        assert_eq!(back, session);
    }

    #[test]
    fn test_session_missing_is_temporary_defaults_false() {
        let json = serde_json::json!({
            "id": Uuid::new_v4(),
            "title": "Old chat",
            "messages": [],
            "createdAt": "2024-05-01T10:00:00Z",
            "updatedAt": "2024-05-01T10:05:00Z"
        });
        let session: Session = serde_json::from_value(json).unwrap();
        assert!(!session.is_temporary);
        assert_eq!(session.updated_at.to_rfc3339(), "2024-05-01T10:05:00+00:00");
    }

    // ---- Learned facts ----

    #[test]
    fn test_facts_insert_dedups() {
        let mut facts = LearnedFacts::new();
        assert!(facts.insert("technologies", "python"));
        assert!(!facts.insert("technologies", "python"));
        assert_eq!(facts.get("technologies").unwrap(), ["python".to_string()]);
    }

    #[test]
    fn test_facts_merge_is_idempotent() {
        let mut incoming = LearnedFacts::new();
        incoming.insert("technologies", "rust");
        incoming.insert("name", "Sam");

        let mut facts = LearnedFacts::new();
        assert!(facts.merge(&incoming));
        let snapshot = facts.clone();
        assert!(!facts.merge(&incoming));
        assert_eq!(facts, snapshot);
    }

    #[test]
    fn test_facts_merge_never_shrinks() {
        let mut facts = LearnedFacts::new();
        facts.insert("technologies", "python");
        let mut incoming = LearnedFacts::new();
        incoming.insert("technologies", "docker");
        facts.merge(&incoming);
        assert_eq!(
            facts.get("technologies").unwrap(),
            ["python".to_string(), "docker".to_string()]
        );
    }

    #[test]
    fn test_facts_remove_value_drops_empty_category() {
        let mut facts = LearnedFacts::new();
        facts.insert("name", "Sam");
        assert!(facts.remove_value("name", "Sam"));
        assert!(facts.get("name").is_none());
        assert!(facts.is_empty());
        assert!(!facts.remove_value("name", "Sam"));
    }

    #[test]
    fn test_facts_remove_category() {
        let mut facts = LearnedFacts::new();
        facts.insert("interests", "recursion");
        facts.insert("technologies", "rust");
        assert!(facts.remove_category("interests"));
        assert!(!facts.remove_category("interests"));
        assert_eq!(facts.categories().collect::<Vec<_>>(), vec!["technologies"]);
    }

    #[test]
    fn test_facts_serialize_as_plain_map() {
        let mut facts = LearnedFacts::new();
        facts.insert("technologies", "python");
        let json = serde_json::to_string(&facts).unwrap();
        assert_eq!(json, r#"{"technologies":["python"]}"#);
        let back: LearnedFacts = serde_json::from_str(&json).unwrap();
        assert_eq!(back, facts);
    }

    #[test]
    fn test_facts_from_map_dedups() {
        let mut map = BTreeMap::new();
        map.insert(
            "technologies".to_string(),
            vec!["go".to_string(), "go".to_string()],
        );
        let facts = LearnedFacts::from(map);
        assert_eq!(facts.get("technologies").unwrap().len(), 1);
    }

    #[test]
    fn test_facts_load_dedups_and_drops_empty_categories() {
        let facts: LearnedFacts =
            serde_json::from_str(r#"{"technologies":["go","go","rust"],"name":[]}"#).unwrap();
        assert_eq!(
            facts.get("technologies").unwrap(),
            &["go".to_string(), "rust".to_string()]
        );
        assert!(facts.get("name").is_none());
        assert_eq!(facts.len(), 1);
    }
}
