//! Deterministic token estimation.
//!
//! Uses a 4-characters-per-token heuristic rather than a real tokenizer. The
//! numbers must stay stable: stored session records carry token counts that
//! were computed with exactly this rule.
//!
//! - Characters are counted in UTF-16 code units.
//! - Metadata counts toward a message through its JSON serialization.
//! - Each message rounds up on its own (`ceil(chars / 4)`).
//! - A 10% safety margin is applied once to the summed total, rounded up.

use sitewright_types::{Message, MessageMetadata};

const CHARS_PER_TOKEN: u64 = 4;
const SAFETY_MARGIN: f64 = 1.1;

/// Stateless estimator. Cheap to copy; [`estimate_token_count`] is the
/// shorthand most callers want.
///
/// # Example
///
/// ```
/// use std::time::SystemTime;
/// use sitewright_context::TokenEstimator;
/// use sitewright_types::Message;
///
/// let estimator = TokenEstimator::new();
/// let messages = vec![
///     Message::user("Hello world", SystemTime::now()),
///     Message::assistant("Hi there!", SystemTime::now()),
/// ];
/// assert_eq!(estimator.count_messages(&messages), 7);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenEstimator;

impl TokenEstimator {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Length of `text` in UTF-16 code units.
    #[must_use]
    pub fn count_str(&self, text: &str) -> u64 {
        text.encode_utf16().count() as u64
    }

    /// Raw per-message estimate, before the safety margin.
    #[must_use]
    pub fn count_message(&self, msg: &Message) -> u64 {
        let metadata_len = msg.metadata().map_or(0, |m| self.metadata_len(m));
        let char_len = self.count_str(msg.content()) + metadata_len;
        char_len.div_ceil(CHARS_PER_TOKEN)
    }

    /// Estimated tokens for a whole sequence, margin included.
    #[must_use]
    pub fn count_messages(&self, messages: &[Message]) -> u32 {
        let raw: u64 = messages.iter().map(|msg| self.count_message(msg)).sum();
        Self::with_margin(raw)
    }

    /// Apply the safety margin to a summed raw estimate.
    ///
    /// Computed in `f64` so rounding matches the counts already persisted.
    #[must_use]
    pub fn with_margin(raw_total: u64) -> u32 {
        if raw_total == 0 {
            return 0;
        }
        let estimate = (raw_total as f64 * SAFETY_MARGIN).ceil();
        if estimate >= f64::from(u32::MAX) {
            u32::MAX
        } else {
            estimate as u32
        }
    }

    fn metadata_len(&self, metadata: &MessageMetadata) -> u64 {
        match serde_json::to_string(metadata) {
            Ok(json) => self.count_str(&json),
            Err(e) => {
                tracing::warn!("Failed to serialize message metadata for estimation: {e}");
                0
            }
        }
    }
}

/// Estimate the tokens a message sequence would consume when serialized.
#[must_use]
pub fn estimate_token_count(messages: &[Message]) -> u32 {
    TokenEstimator::new().count_messages(messages)
}
