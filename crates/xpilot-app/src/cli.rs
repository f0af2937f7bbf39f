//! CLI argument definitions for the Xpilot terminal client.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

/// Xpilot, a terminal chat assistant with sessions and a learned memory.
#[derive(Parser, Debug)]
#[command(name = "xpilot", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Data directory holding the chat database.
    #[arg(short = 'd', long = "data-dir")]
    pub data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    /// Gemini API key.
    #[arg(long = "api-key")]
    pub api_key: Option<String>,

    /// Model name, e.g. gemini-2.0-flash.
    #[arg(short = 'm', long = "model")]
    pub model: Option<String>,

    /// Start in a temporary chat that is never saved.
    #[arg(short = 't', long = "temporary")]
    pub temporary: bool,

    /// Print replies at once instead of typing them out.
    #[arg(long = "no-typing")]
    pub no_typing: bool,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > XPILOT_CONFIG env var > ~/.xpilot/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        self.resolve_config_path_with(|key| std::env::var(key).ok())
    }

    fn resolve_config_path_with(&self, env: impl Fn(&str) -> Option<String>) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Some(p) = env("XPILOT_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the API key.
    ///
    /// Priority: --api-key flag > XPILOT_API_KEY > GEMINI_API_KEY > config file.
    pub fn resolve_api_key(&self, config_key: Option<&str>) -> Option<String> {
        self.resolve_api_key_with(config_key, |key| std::env::var(key).ok())
    }

    fn resolve_api_key_with(
        &self,
        config_key: Option<&str>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Option<String> {
        let non_empty = |k: &String| !k.trim().is_empty();
        self.api_key
            .clone()
            .filter(non_empty)
            .or_else(|| env("XPILOT_API_KEY").filter(non_empty))
            .or_else(|| env("GEMINI_API_KEY").filter(non_empty))
            .or_else(|| config_key.map(str::to_string).filter(non_empty))
    }

    /// Resolve the data directory path.
    ///
    /// Returns `None` if not overridden (use config value).
    pub fn resolve_data_dir(&self) -> Option<String> {
        self.data_dir
            .as_ref()
            .map(|p| p.to_string_lossy().to_string())
    }

    /// Resolve the log filter.
    ///
    /// Priority: --log-level flag > RUST_LOG > config file value.
    pub fn resolve_log_level(&self, config_level: &str) -> String {
        self.resolve_log_level_with(config_level, |key| std::env::var(key).ok())
    }

    fn resolve_log_level_with(
        &self,
        config_level: &str,
        env: impl Fn(&str) -> Option<String>,
    ) -> String {
        self.log_level
            .clone()
            .or_else(|| env("RUST_LOG"))
            .unwrap_or_else(|| config_level.to_string())
    }
}

fn home_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    let home = std::env::var("USERPROFILE");
    #[cfg(not(target_os = "windows"))]
    let home = std::env::var("HOME");
    home.ok().map(PathBuf::from)
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    match home_dir() {
        Some(home) => home.join(".xpilot").join("config.toml"),
        None => PathBuf::from("config.toml"),
    }
}

/// Expand a leading `~` to the home directory.
pub fn expand_home(path: &str) -> PathBuf {
    let rest = path
        .strip_prefix("~/")
        .or_else(|| path.strip_prefix("~\\"));
    match (rest, home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        (Some(rest), None) => PathBuf::from(".").join(rest),
        (None, _) => PathBuf::from(path),
    }
}
