use thiserror::Error;

/// Top-level error type for Xpilot.
///
/// Subsystem crates define their own error types and implement
/// `From<XpilotError>` (or the reverse) so that `?` works across crate
/// boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum XpilotError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for XpilotError {
    fn from(err: toml::de::Error) -> Self {
        XpilotError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for XpilotError {
    fn from(err: toml::ser::Error) -> Self {
        XpilotError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for XpilotError {
    fn from(err: serde_json::Error) -> Self {
        XpilotError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Xpilot operations.
pub type Result<T> = std::result::Result<T, XpilotError>;
