//! Reply shaping: canned answers about the assistant's origin and emoji
//! annotation of prose replies.

use regex::{Captures, Regex};

use xpilot_core::config::PersonaConfig;

use crate::markup::contains_code_fence;

enum Placement {
    /// Insert the emoji right after the first match.
    AfterMatch,
    /// Append the emoji to the end of the reply.
    Append,
}

struct EmojiRule {
    pattern: Regex,
    emoji: &'static str,
    placement: Placement,
}

/// Adds at most one emoji to a reply, picked by the first matching rule.
pub struct EmojiAnnotator {
    rules: Vec<EmojiRule>,
}

impl EmojiAnnotator {
    pub fn new() -> Self {
        let rule = |pattern: &str, emoji, placement| EmojiRule {
            pattern: Regex::new(pattern).expect("emoji pattern is valid"),
            emoji,
            placement,
        };
        Self {
            rules: vec![
                rule(r"(?i)\b(hello|hi)\b", "👋", Placement::AfterMatch),
                rule(r"(?i)thank", "😊", Placement::Append),
                rule(r"(?i)sorry|apologize", "🙏", Placement::AfterMatch),
                rule(r"(?i)congratulations|congrats", "🎉", Placement::AfterMatch),
                rule(r"(?i)important", "❗", Placement::AfterMatch),
                rule(r"(?i)javascript|code", "💻", Placement::AfterMatch),
                rule(r"(?i)idea|suggest", "💡", Placement::AfterMatch),
            ],
        }
    }

    /// Annotate a prose reply. Replies containing a code fence are returned
    /// unchanged.
    pub fn annotate(&self, reply: &str) -> String {
        if contains_code_fence(reply) {
            return reply.to_string();
        }
        let Some(rule) = self.rules.iter().find(|r| r.pattern.is_match(reply)) else {
            return reply.to_string();
        };
        match rule.placement {
            Placement::Append => format!("{} {}", reply, rule.emoji),
            Placement::AfterMatch => rule
                .pattern
                .replace(reply, |caps: &Captures| format!("{} {}", &caps[0], rule.emoji))
                .into_owned(),
        }
    }
}

impl Default for EmojiAnnotator {
    fn default() -> Self {
        Self::new()
    }
}

/// Produces the locally answered replies and post-processes model output.
pub struct ResponseGenerator {
    creator_reply: String,
    operator_bio: String,
    operator_phrases: Vec<String>,
    annotator: EmojiAnnotator,
}

impl ResponseGenerator {
    pub fn new(persona: &PersonaConfig) -> Self {
        let operator = persona.operator_name.trim().to_lowercase();
        let operator_phrases = if operator.is_empty() {
            Vec::new()
        } else {
            ["who is", "who's", "tell me about", "about"]
                .iter()
                .map(|prefix| format!("{} {}", prefix, operator))
                .collect()
        };
        Self {
            creator_reply: persona.creator_reply.clone(),
            operator_bio: persona.operator_bio.clone(),
            operator_phrases,
            annotator: EmojiAnnotator::new(),
        }
    }

    /// Fixed reply for questions about who built the assistant, if any.
    pub fn canned_reply(&self, text: &str) -> Option<String> {
        let lower = text.to_lowercase();
        if lower.contains("who made you") || lower.contains("who created you") {
            return Some(self.creator_reply.clone());
        }
        if self.operator_phrases.iter().any(|p| lower.contains(p.as_str())) {
            return Some(self.operator_bio.clone());
        }
        None
    }

    /// Emoji annotation for prose replies; code replies pass through.
    pub fn finish(&self, reply: String, generate_code: bool) -> String {
        if generate_code {
            reply
        } else {
            self.annotator.annotate(&reply)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_greeting_injects_after_word() {
        let annotator = EmojiAnnotator::new();
        assert_eq!(annotator.annotate("Hi there!"), "Hi 👋 there!");
        assert_eq!(annotator.annotate("Well, hello."), "Well, hello 👋.");
    }

    #[test]
    fn test_greeting_needs_word_boundary() {
        let annotator = EmojiAnnotator::new();
        assert_eq!(annotator.annotate("This is a thing."), "This is a thing.");
    }

    #[test]
    fn test_thanks_appends() {
        let annotator = EmojiAnnotator::new();
        assert_eq!(
            annotator.annotate("Thank you for asking."),
            "Thank you for asking. 😊"
        );
    }

    #[test]
    fn test_first_rule_wins() {
        let annotator = EmojiAnnotator::new();
        // Greeting outranks the "code" rule.
        assert_eq!(
            annotator.annotate("Hello, here is the code idea"),
            "Hello 👋, here is the code idea"
        );
        assert_eq!(
            annotator.annotate("Sorry, that code is wrong"),
            "Sorry 🙏, that code is wrong"
        );
    }

    #[test]
    fn test_remaining_rules() {
        let annotator = EmojiAnnotator::new();
        assert_eq!(annotator.annotate("Congrats on shipping"), "Congrats 🎉 on shipping");
        assert_eq!(
            annotator.annotate("This is important to know"),
            "This is important ❗ to know"
        );
        assert_eq!(
            annotator.annotate("JavaScript runs everywhere"),
            "JavaScript 💻 runs everywhere"
        );
        assert_eq!(
            annotator.annotate("I suggest a different approach"),
            "I suggest 💡 a different approach"
        );
    }

    #[test]
    fn test_only_first_occurrence_annotated() {
        let annotator = EmojiAnnotator::new();
        assert_eq!(
            annotator.annotate("important, very important"),
            "important ❗, very important"
        );
    }

    #[test]
    fn test_fenced_reply_untouched() {
        let annotator = EmojiAnnotator::new();
        let reply = "Hi! Here:\n```js\nconsole.log('hi')\n```";
        assert_eq!(annotator.annotate(reply), reply);
    }

    #[test]
    fn test_no_match_untouched() {
        assert_eq!(
            EmojiAnnotator::new().annotate("Rust has ownership."),
            "Rust has ownership."
        );
    }

    #[test]
    fn test_canned_creator_reply() {
        let persona = PersonaConfig::default();
        let responses = ResponseGenerator::new(&persona);
        assert_eq!(
            responses.canned_reply("Who made you?").as_deref(),
            Some(persona.creator_reply.as_str())
        );
        assert_eq!(
            responses.canned_reply("so WHO CREATED YOU").as_deref(),
            Some(persona.creator_reply.as_str())
        );
    }

    #[test]
    fn test_canned_operator_bio() {
        let persona = PersonaConfig::default();
        let responses = ResponseGenerator::new(&persona);
        for text in ["Who is Ankit?", "who's ankit", "Tell me about Ankit", "about ankit"] {
            assert_eq!(
                responses.canned_reply(text).as_deref(),
                Some(persona.operator_bio.as_str()),
                "{}",
                text
            );
        }
    }

    #[test]
    fn test_no_canned_reply_for_regular_text() {
        let responses = ResponseGenerator::new(&PersonaConfig::default());
        assert!(responses.canned_reply("Explain promises in JavaScript").is_none());
        assert!(responses.canned_reply("Who is Linus?").is_none());
    }

    #[test]
    fn test_finish_skips_code_mode() {
        let responses = ResponseGenerator::new(&PersonaConfig::default());
        assert_eq!(responses.finish("Hi there".to_string(), true), "Hi there");
        assert_eq!(responses.finish("Hi there".to_string(), false), "Hi 👋 there");
    }
}
