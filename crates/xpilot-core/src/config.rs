use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, XpilotError};

/// Top-level configuration for Xpilot.
///
/// Loaded from `~/.xpilot/config.toml` by default. Every section falls back
/// to its defaults, so an empty file is a valid configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct XpilotConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub persona: PersonaConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

impl XpilotConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: XpilotConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| XpilotError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory holding the chat database.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.xpilot/data".to_string(),
            log_level: "warn".to_string(),
        }
    }
}

/// Language model provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider API key. Usually supplied through `XPILOT_API_KEY` instead.
    pub api_key: Option<String>,
    /// Model name appended to `base_url`.
    pub model: String,
    /// Base URL of the `generateContent` endpoint family.
    pub base_url: String,
    /// Request timeout in seconds. 0 disables the timeout.
    pub request_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-2.0-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta/models".to_string(),
            request_timeout_secs: 60,
        }
    }
}

/// Assistant persona and the canned answers about its operator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonaConfig {
    /// Speaker label used for assistant lines when sharing a chat.
    pub assistant_name: String,
    /// Lower-case name matched by the "who is <operator>" shortcut.
    pub operator_name: String,
    /// Reply to "who made you" / "who created you".
    pub creator_reply: String,
    /// Reply to "who is <operator>" / "about <operator>".
    pub operator_bio: String,
    /// Base system instruction.
    pub system_prompt: String,
    /// Paragraph appended to the system instruction in think-deeply mode.
    pub deep_thinking_prompt: String,
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            assistant_name: "AnkitXpilot".to_string(),
            operator_name: "ankit".to_string(),
            creator_reply: "Ankit Pramanik, A Web Developer and AI Trainer made me.".to_string(),
            operator_bio: "Ankit is a web developer and AI Trainer who knows various coding \
                           languages. To know more about him reach \
                           https://ankit404developer.github.io/About/"
                .to_string(),
            system_prompt: "You are AnkitXpilot, a helpful and knowledgeable AI assistant \
                            created by Ankit Pramanik.\n\
                            Your responses should be informative, concise, and user-friendly.\n\
                            When generating code, provide well-commented, clean, and efficient \
                            solutions."
                .to_string(),
            deep_thinking_prompt: "In this interaction, the user has requested a more \
                                   thoughtful and in-depth response.\n\
                                   Take your time to explore multiple perspectives, consider \
                                   edge cases, and provide a comprehensive analysis.\n\
                                   Your response should be more detailed than usual, thoroughly \
                                   examining the subject matter.\n\
                                   Include relevant examples, potential implications, and \
                                   nuanced considerations in your answer."
                .to_string(),
        }
    }
}

/// Keyword tables for the entity extractor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Technology keywords, matched as lower-case substrings in list order.
    pub technologies: Vec<String>,
    /// Words never recorded as interests.
    pub stop_words: Vec<String>,
    /// Maximum number of interest tokens taken from one message.
    pub max_interests: usize,
    /// Interest tokens must be longer than this many characters.
    pub min_interest_len: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        let technologies = [
            "javascript",
            "typescript",
            "python",
            "java",
            "react",
            "angular",
            "vue",
            "node",
            "html",
            "css",
            "sql",
            "rust",
            "golang",
            "kotlin",
            "swift",
            "docker",
            "kubernetes",
            "aws",
            "linux",
            "git",
        ];
        let stop_words = [
            "about", "after", "again", "because", "before", "being", "could", "does", "explain",
            "following", "have", "learn", "please", "really", "should", "something", "their",
            "there", "these", "thing", "things", "those", "through", "using", "want", "what",
            "when", "where", "which", "while", "with", "would", "write", "your",
        ];
        Self {
            technologies: technologies.iter().map(|s| s.to_string()).collect(),
            stop_words: stop_words.iter().map(|s| s.to_string()).collect(),
            max_interests: 3,
            min_interest_len: 4,
        }
    }
}

/// Terminal front-end settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Animate assistant replies as if typed.
    pub typing_effect: bool,
    /// Delay between typed characters in milliseconds.
    pub typing_speed_ms: u64,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            typing_effect: true,
            typing_speed_ms: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = XpilotConfig::default();
        assert_eq!(config.general.data_dir, "~/.xpilot/data");
        assert_eq!(config.general.log_level, "warn");
        assert!(config.llm.api_key.is_none());
        assert_eq!(config.llm.request_timeout_secs, 60);
        assert_eq!(config.persona.assistant_name, "AnkitXpilot");
        assert_eq!(config.extraction.max_interests, 3);
        assert_eq!(config.ui.typing_speed_ms, 30);
    }

    #[test]
    fn test_default_technologies_order() {
        let config = ExtractionConfig::default();
        let python = config.technologies.iter().position(|t| t == "python");
        let docker = config.technologies.iter().position(|t| t == "docker");
        assert!(python < docker);
    }

    #[test]
    fn test_load_valid_config() {
        let content = r#"
[general]
data_dir = "/custom/data"
log_level = "debug"

[llm]
api_key = "secret"
model = "gemini-pro"
request_timeout_secs = 10

[extraction]
technologies = ["zig", "elixir"]
"#;
        let file = create_temp_config(content);
        let config = XpilotConfig::load(file.path()).unwrap();
        assert_eq!(config.general.data_dir, "/custom/data");
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.llm.api_key.as_deref(), Some("secret"));
        assert_eq!(config.llm.model, "gemini-pro");
        assert_eq!(config.extraction.technologies, vec!["zig", "elixir"]);
        // Unset fields inside a present section keep their defaults.
        assert_eq!(config.extraction.max_interests, 3);
        assert!(config.llm.base_url.starts_with("https://"));
    }

    #[test]
    fn test_load_partial_config_uses_defaults() {
        let content = r#"
[ui]
typing_effect = false
"#;
        let file = create_temp_config(content);
        let config = XpilotConfig::load(file.path()).unwrap();
        assert!(!config.ui.typing_effect);
        assert_eq!(config.ui.typing_speed_ms, 30);
        assert_eq!(config.persona.operator_name, "ankit");
    }

    #[test]
    fn test_empty_toml_uses_all_defaults() {
        let file = create_temp_config("");
        let config = XpilotConfig::load(file.path()).unwrap();
        assert_eq!(config.llm.model, LlmConfig::default().model);
    }

    #[test]
    fn test_load_invalid_toml() {
        let file = create_temp_config("[general\nlog_level = ");
        let result = XpilotConfig::load(file.path());
        assert!(matches!(result, Err(XpilotError::Config(_))));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = XpilotConfig::load_or_default(Path::new("/nonexistent/config.toml"));
        assert_eq!(config.general.data_dir, "~/.xpilot/data");
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = XpilotConfig::default();
        config.llm.model = "gemini-1.5-pro".to_string();
        config.ui.typing_speed_ms = 5;
        config.save(&path).unwrap();

        let loaded = XpilotConfig::load(&path).unwrap();
        assert_eq!(loaded.llm.model, "gemini-1.5-pro");
        assert_eq!(loaded.ui.typing_speed_ms, 5);
        assert_eq!(loaded.extraction.stop_words, config.extraction.stop_words);
    }
}
