//! Entity extraction from user messages.

use regex::Regex;

use xpilot_core::config::ExtractionConfig;
use xpilot_core::types::LearnedFacts;

use crate::error::InsightError;

/// Category holding technology keywords.
pub const TECHNOLOGIES: &str = "technologies";
/// Category holding topic words from "how to" / "explain" questions.
pub const INTERESTS: &str = "interests";
/// Category holding the name the user introduced themselves with.
pub const NAME: &str = "name";

const INTEREST_TRIGGERS: [&str; 2] = ["how to", "explain"];
const NAME_TRIGGERS: [&str; 2] = ["my name is", "i am called"];

/// Extracts technologies, interests and a self-introduced name from text.
///
/// Pure and deterministic: the same text always yields the same facts.
pub struct EntityExtractor {
    technologies: Vec<String>,
    stop_words: Vec<String>,
    max_interests: usize,
    min_interest_len: usize,
    name_regex: Regex,
}

impl EntityExtractor {
    /// Build an extractor from the configured keyword tables.
    pub fn new(config: &ExtractionConfig) -> Result<Self, InsightError> {
        if config.technologies.iter().any(|t| t.trim().is_empty()) {
            return Err(InsightError::Config(
                "technology keywords must not be empty".to_string(),
            ));
        }

        Ok(Self {
            technologies: config
                .technologies
                .iter()
                .map(|t| t.trim().to_lowercase())
                .collect(),
            stop_words: config.stop_words.iter().map(|w| w.to_lowercase()).collect(),
            max_interests: config.max_interests,
            min_interest_len: config.min_interest_len,
            name_regex: Regex::new(r"(?i)\b(?:my name is|i am called)\s+(\w+)")?,
        })
    }

    /// Extract all recognized categories. Empty categories are omitted.
    pub fn extract(&self, text: &str) -> LearnedFacts {
        let lower = text.to_lowercase();
        let mut facts = LearnedFacts::new();

        for tech in self.find_technologies(&lower) {
            facts.insert(TECHNOLOGIES, tech);
        }

        if INTEREST_TRIGGERS.iter().any(|t| lower.contains(t)) {
            for interest in self.find_interests(&lower) {
                facts.insert(INTERESTS, interest);
            }
        }

        if NAME_TRIGGERS.iter().any(|t| lower.contains(t)) {
            if let Some(name) = self.find_name(text) {
                facts.insert(NAME, name);
            }
        }

        tracing::trace!(categories = facts.len(), "Entities extracted");
        facts
    }

    fn find_technologies(&self, lower: &str) -> Vec<&str> {
        self.technologies
            .iter()
            .filter(|tech| lower.contains(tech.as_str()))
            .map(String::as_str)
            .collect()
    }

    fn find_interests(&self, lower: &str) -> Vec<String> {
        let mut interests: Vec<String> = Vec::new();
        for token in lower.split_whitespace() {
            if interests.len() >= self.max_interests {
                break;
            }
            let word = token.trim_matches(|c: char| !c.is_alphanumeric());
            if word.chars().count() <= self.min_interest_len
                || self.stop_words.iter().any(|s| s == word)
                || self.technologies.iter().any(|t| t == word)
                || interests.iter().any(|i| i == word)
            {
                continue;
            }
            interests.push(word.to_string());
        }
        interests
    }

    fn find_name(&self, text: &str) -> Option<String> {
        self.name_regex
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }
}

impl Default for EntityExtractor {
    fn default() -> Self {
        Self::new(&ExtractionConfig::default()).expect("default extraction tables are valid")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> EntityExtractor {
        EntityExtractor::new(&ExtractionConfig::default()).unwrap()
    }

    fn values<'a>(facts: &'a LearnedFacts, category: &str) -> Vec<&'a str> {
        facts
            .get(category)
            .map(|v| v.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_extract_technologies_only() {
        let facts = extractor().extract("I want to learn Python and Docker today");
        assert_eq!(values(&facts, TECHNOLOGIES), vec!["python", "docker"]);
        assert!(facts.get(INTERESTS).is_none());
        assert!(facts.get(NAME).is_none());
        assert_eq!(facts.len(), 1);
    }

    #[test]
    fn test_extract_technologies_follow_keyword_order() {
        let facts = extractor().extract("docker first, then rust, then react");
        assert_eq!(values(&facts, TECHNOLOGIES), vec!["react", "rust", "docker"]);
    }

    #[test]
    fn test_extract_name_and_interests() {
        let facts = extractor().extract("My name is Sam, how to explain recursion");
        assert_eq!(values(&facts, NAME), vec!["Sam"]);
        assert_eq!(values(&facts, INTERESTS), vec!["recursion"]);
    }

    #[test]
    fn test_extract_name_i_am_called() {
        let facts = extractor().extract("Hi, I am called Priya");
        assert_eq!(values(&facts, NAME), vec!["Priya"]);
    }

    #[test]
    fn test_interests_require_trigger() {
        let facts = extractor().extract("recursion closures generators");
        assert!(facts.get(INTERESTS).is_none());
    }

    #[test]
    fn test_interests_exclude_stop_words_and_technologies() {
        let facts =
            extractor().extract("Can you explain closures in kotlin and swift generators");
        assert_eq!(values(&facts, INTERESTS), vec!["closures", "generators"]);
        assert_eq!(values(&facts, TECHNOLOGIES), vec!["kotlin", "swift"]);
    }

    #[test]
    fn test_interests_capped_at_three_in_order() {
        let facts = extractor()
            .extract("how to combine monads functors lenses prisms traversals");
        assert_eq!(
            values(&facts, INTERESTS),
            vec!["combine", "monads", "functors"]
        );
    }

    #[test]
    fn test_interests_skip_short_tokens() {
        let facts = extractor().extract("how to do a tree walk");
        assert!(facts.get(INTERESTS).is_none());
    }

    #[test]
    fn test_empty_text_yields_nothing() {
        assert!(extractor().extract("").is_empty());
        assert!(extractor().extract("   ").is_empty());
    }

    #[test]
    fn test_name_trigger_without_following_word() {
        let facts = extractor().extract("my name is");
        assert!(facts.get(NAME).is_none());
    }

    #[test]
    fn test_extract_is_deterministic() {
        let text = "My name is Ana. Explain kubernetes operators and reconciliation loops";
        assert_eq!(extractor().extract(text), extractor().extract(text));
    }

    #[test]
    fn test_merge_same_message_twice_is_idempotent() {
        let ex = extractor();
        let mut memory = LearnedFacts::new();
        let text = "My name is Sam, how to explain recursion in python";
        memory.merge(&ex.extract(text));
        let after_first = memory.clone();
        assert!(!memory.merge(&ex.extract(text)));
        assert_eq!(memory, after_first);
    }

    #[test]
    fn test_custom_tables() {
        let config = ExtractionConfig {
            technologies: vec!["Zig".to_string()],
            stop_words: vec![],
            max_interests: 1,
            min_interest_len: 2,
        };
        let ex = EntityExtractor::new(&config).unwrap();
        let facts = ex.extract("explain zig comptime please");
        assert_eq!(values(&facts, TECHNOLOGIES), vec!["zig"]);
        assert_eq!(values(&facts, INTERESTS), vec!["explain"]);
    }

    #[test]
    fn test_empty_keyword_rejected() {
        let config = ExtractionConfig {
            technologies: vec!["rust".to_string(), "  ".to_string()],
            ..ExtractionConfig::default()
        };
        assert!(matches!(
            EntityExtractor::new(&config),
            Err(InsightError::Config(_))
        ));
    }

    #[test]
    fn test_default_matches_default_config() {
        let text = "My name is Lee and I explain typescript generics";
        assert_eq!(EntityExtractor::default().extract(text), extractor().extract(text));
    }
}
