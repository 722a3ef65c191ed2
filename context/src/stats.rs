//! Observational statistics over a message sequence.

use std::time::SystemTime;

use serde::Serialize;
use sitewright_types::{Message, Role};

use crate::token_estimator::estimate_token_count;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PruningStats {
    pub total_messages: usize,
    pub system_messages: usize,
    pub user_messages: usize,
    pub assistant_messages: usize,
    pub estimated_tokens: u32,
    /// Timestamp of the first message in sequence order.
    #[serde(with = "sitewright_types::timestamp::option")]
    pub oldest_message: Option<SystemTime>,
    /// Timestamp of the last message in sequence order.
    #[serde(with = "sitewright_types::timestamp::option")]
    pub newest_message: Option<SystemTime>,
}

#[must_use]
pub fn get_pruning_stats(messages: &[Message]) -> PruningStats {
    let mut stats = PruningStats {
        total_messages: messages.len(),
        estimated_tokens: estimate_token_count(messages),
        oldest_message: messages.first().and_then(Message::timestamp),
        newest_message: messages.last().and_then(Message::timestamp),
        ..PruningStats::default()
    };

    for msg in messages {
        match msg.role() {
            Role::System => stats.system_messages += 1,
            Role::User => stats.user_messages += 1,
            Role::Assistant => stats.assistant_messages += 1,
        }
    }

    stats
}
