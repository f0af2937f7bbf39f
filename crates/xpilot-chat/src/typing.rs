//! Character-by-character reveal of a finished reply.

use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};

/// Yields growing prefixes of a text, one character at a time.
///
/// Prefixes always end on a char boundary, so multi-byte characters such as
/// emoji are revealed whole.
#[derive(Debug, Clone)]
pub struct TypingAnimation<'a> {
    text: &'a str,
    end: usize,
}

impl<'a> TypingAnimation<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { text, end: 0 }
    }

    pub fn is_done(&self) -> bool {
        self.end >= self.text.len()
    }
}

impl<'a> Iterator for TypingAnimation<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.text[self.end..].chars().next()?;
        self.end += next.len_utf8();
        Some(&self.text[..self.end])
    }
}

/// Drive `on_frame` with each prefix, one per tick of `speed`.
///
/// A zero speed shows the whole text in a single frame.
pub async fn animate<F>(text: &str, speed: Duration, mut on_frame: F)
where
    F: FnMut(&str),
{
    if text.is_empty() {
        return;
    }
    if speed.is_zero() {
        on_frame(text);
        return;
    }

    let mut ticker = interval(speed);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    for frame in TypingAnimation::new(text) {
        ticker.tick().await;
        on_frame(frame);
    }
}
