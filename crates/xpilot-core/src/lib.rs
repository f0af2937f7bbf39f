pub mod config;
pub mod error;
pub mod types;

pub use config::XpilotConfig;
pub use error::{Result, XpilotError};
pub use types::*;
