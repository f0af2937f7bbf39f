//! Language model seam.
//!
//! [`LlmClient`] is what the session manager talks to. Failures never escape
//! it: the client turns them into an assistant-visible explanation, so a turn
//! always ends with a reply. [`build_prompt`] is the pure part of a request
//! and is shared by every backend.

use async_trait::async_trait;

use xpilot_core::config::PersonaConfig;
use xpilot_core::types::LearnedFacts;

/// Shown for HTTP 429.
pub const RATE_LIMITED_REPLY: &str =
    "I'm receiving too many requests right now. Please try again in a moment.";
/// Shown when the provider cannot be reached.
pub const NETWORK_ERROR_REPLY: &str = "There was an error connecting to the AI service. \
                                       Please check your connection and try again.";
/// Shown when a 2xx body has no usable text.
pub const MALFORMED_REPLY: &str = "I received an unexpected response format. Please try again.";

const CODE_ONLY_PREFIX: &str = "Please provide only code as a solution to this request. \
                                Ensure the code is well-commented, efficient, and follows \
                                best practices: ";

/// One turn as the model sees it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PromptRequest {
    pub text: String,
    pub generate_code: bool,
    pub think_deeply: bool,
    /// Facts to fold into the system instruction. Empty for temporary chats.
    pub facts: LearnedFacts,
    pub temporary: bool,
}

/// Fully assembled prompt, independent of any wire format.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub user_text: String,
    pub system_text: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

/// Failures talking to a model provider.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("no API key configured")]
    MissingApiKey,
    #[error("client setup failed: {0}")]
    Setup(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("rate limited by provider")]
    RateLimited,
    #[error("provider returned HTTP {status}: {message}")]
    Http { status: u16, message: String },
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl LlmError {
    /// Text placed in the conversation instead of a model reply.
    pub fn user_message(&self) -> String {
        match self {
            LlmError::RateLimited => RATE_LIMITED_REPLY.to_string(),
            LlmError::Http { message, .. } => format!("An error occurred: {}", message),
            LlmError::MalformedResponse(_) => MALFORMED_REPLY.to_string(),
            LlmError::Network(_) => NETWORK_ERROR_REPLY.to_string(),
            LlmError::MissingApiKey | LlmError::Setup(_) => {
                format!("An error occurred: {}", self)
            }
        }
    }
}

/// Something that can answer a prompt.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Produce the assistant's reply. Never fails; errors come back as text.
    async fn send(&self, request: &PromptRequest) -> String;
}

/// Assemble the user text, system instruction and sampling parameters.
pub fn build_prompt(request: &PromptRequest, persona: &PersonaConfig) -> Prompt {
    let user_text = if request.generate_code {
        format!("{}{}", CODE_ONLY_PREFIX, request.text)
    } else {
        request.text.clone()
    };

    let mut system_text = persona.system_prompt.clone();
    system_text.push_str(&format!(
        "\nIf someone asks \"Who made you?\", always respond with: \"{}\"",
        persona.creator_reply
    ));
    system_text.push_str(&format!(
        "\nIf someone asks about {}, respond with: \"{}\"",
        persona.operator_name, persona.operator_bio
    ));

    if request.think_deeply {
        system_text.push_str("\n\n");
        system_text.push_str(&persona.deep_thinking_prompt);
    }

    if !request.temporary && !request.facts.is_empty() {
        system_text.push_str(
            "\n\nI've learned the following information about the user or their interests:",
        );
        for (category, values) in request.facts.iter() {
            system_text.push_str(&format!("\n- {}: {}", category, values.join(", ")));
        }
        system_text.push_str(
            "\n\nUse this information to personalize your response when relevant, but don't \
             explicitly mention that you've \"learned\" this unless asked about your memory \
             or capabilities.",
        );
    }

    let temperature = if request.generate_code {
        0.2
    } else if request.think_deeply {
        0.5
    } else {
        0.7
    };
    let max_output_tokens = if request.think_deeply { 4096 } else { 2048 };

    Prompt {
        user_text,
        system_text,
        temperature,
        max_output_tokens,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(text: &str) -> PromptRequest {
        PromptRequest {
            text: text.to_string(),
            ..PromptRequest::default()
        }
    }

    #[test]
    fn test_plain_prompt() {
        let persona = PersonaConfig::default();
        let prompt = build_prompt(&request("What is a closure?"), &persona);
        assert_eq!(prompt.user_text, "What is a closure?");
        assert!(prompt.system_text.starts_with(&persona.system_prompt));
        assert!(prompt.system_text.contains(&persona.creator_reply));
        assert!(!prompt.system_text.contains(&persona.deep_thinking_prompt));
        assert!(!prompt.system_text.contains("I've learned"));
        assert_eq!(prompt.temperature, 0.7);
        assert_eq!(prompt.max_output_tokens, 2048);
    }

    #[test]
    fn test_code_mode_prefixes_text() {
        let req = PromptRequest {
            generate_code: true,
            ..request("reverse a string")
        };
        let prompt = build_prompt(&req, &PersonaConfig::default());
        assert_eq!(
            prompt.user_text,
            "Please provide only code as a solution to this request. Ensure the code is \
             well-commented, efficient, and follows best practices: reverse a string"
        );
        assert_eq!(prompt.temperature, 0.2);
        assert_eq!(prompt.max_output_tokens, 2048);
    }

    #[test]
    fn test_think_deeply_extends_instruction() {
        let persona = PersonaConfig::default();
        let req = PromptRequest {
            think_deeply: true,
            ..request("Compare actors and channels")
        };
        let prompt = build_prompt(&req, &persona);
        assert!(prompt.system_text.contains(&persona.deep_thinking_prompt));
        assert_eq!(prompt.temperature, 0.5);
        assert_eq!(prompt.max_output_tokens, 4096);
    }

    #[test]
    fn test_code_mode_wins_temperature_over_deep() {
        let req = PromptRequest {
            generate_code: true,
            think_deeply: true,
            ..request("binary search")
        };
        let prompt = build_prompt(&req, &PersonaConfig::default());
        assert_eq!(prompt.temperature, 0.2);
        assert_eq!(prompt.max_output_tokens, 4096);
    }

    #[test]
    fn test_facts_are_summarized() {
        let mut facts = LearnedFacts::new();
        facts.insert("technologies", "rust");
        facts.insert("technologies", "docker");
        facts.insert("name", "Sam");
        let req = PromptRequest {
            facts,
            ..request("hello")
        };
        let prompt = build_prompt(&req, &PersonaConfig::default());
        assert!(prompt.system_text.contains(
            "I've learned the following information about the user or their interests:\n\
             - name: Sam\n\
             - technologies: rust, docker"
        ));
        assert!(prompt.system_text.contains("don't explicitly mention"));
    }

    #[test]
    fn test_temporary_prompt_omits_facts() {
        let mut facts = LearnedFacts::new();
        facts.insert("name", "Sam");
        let req = PromptRequest {
            facts,
            temporary: true,
            ..request("hello")
        };
        let prompt = build_prompt(&req, &PersonaConfig::default());
        assert!(!prompt.system_text.contains("I've learned"));
        assert!(!prompt.system_text.contains("- name: Sam"));
    }

    #[test]
    fn test_user_messages() {
        assert_eq!(LlmError::RateLimited.user_message(), RATE_LIMITED_REPLY);
        assert_eq!(
            LlmError::Network("refused".to_string()).user_message(),
            NETWORK_ERROR_REPLY
        );
        assert_eq!(
            LlmError::MalformedResponse("no candidates".to_string()).user_message(),
            MALFORMED_REPLY
        );
        let http = LlmError::Http {
            status: 400,
            message: "API key not valid".to_string(),
        };
        assert_eq!(http.user_message(), "An error occurred: API key not valid");
        assert!(LlmError::MissingApiKey
            .user_message()
            .starts_with("An error occurred:"));
    }
}
