use thiserror::Error;

/// Errors that can occur while building the extraction pipeline.
#[derive(Error, Debug)]
pub enum InsightError {
    #[error("config error: {0}")]
    Config(String),
    #[error("pattern error: {0}")]
    Pattern(#[from] regex::Error),
}
