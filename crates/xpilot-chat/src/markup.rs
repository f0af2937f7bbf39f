//! Display helpers: fenced code splitting and message timestamps.

use chrono::{DateTime, Local, Utc};

const FENCE: &str = "```";

/// A run of prose or a fenced code block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentPart {
    pub text: String,
    pub is_code: bool,
    /// Info string after the opening fence, e.g. `rust`.
    pub language: Option<String>,
}

pub fn contains_code_fence(text: &str) -> bool {
    text.contains(FENCE)
}

/// Split text into alternating prose and code parts.
///
/// An opening fence without a closing one runs to the end of the text.
/// Whitespace-only prose between blocks is dropped.
pub fn parse_code_blocks(text: &str) -> Vec<ContentPart> {
    let mut parts = Vec::new();
    for (i, segment) in text.split(FENCE).enumerate() {
        if i % 2 == 0 {
            let prose = segment.trim_matches('\n');
            if !prose.trim().is_empty() {
                parts.push(ContentPart {
                    text: prose.to_string(),
                    is_code: false,
                    language: None,
                });
            }
        } else {
            parts.push(code_part(segment));
        }
    }
    parts
}

fn code_part(segment: &str) -> ContentPart {
    let (language, body) = match segment.split_once('\n') {
        Some((info, rest)) => {
            let info = info.trim();
            if info.is_empty() || info.contains(char::is_whitespace) {
                (None, segment)
            } else {
                (Some(info.to_string()), rest)
            }
        }
        None => (None, segment),
    };
    ContentPart {
        text: body.trim_matches('\n').to_string(),
        is_code: true,
        language,
    }
}

/// Local wall-clock time as `HH:MM`.
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.with_timezone(&Local).format("%H:%M").to_string()
}
