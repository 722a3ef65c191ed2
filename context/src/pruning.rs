//! Token-budget-aware message pruning.
//!
//! Pruning is selection only: it decides which messages stay and never
//! rewrites or reorders them. Summaries of evicted content are produced by a
//! [`Summarizer`](crate::Summarizer) that the caller invokes separately.
//!
//! # Retention tiers
//!
//! ```text
//! pinned   importance set (bookends, markers, system when preserved)
//!          never evicted, even if limits stay exceeded
//! recent   last `preserve_recent_count` non-system messages
//!          evicted only under pressure, oldest first
//! older    everything else, evicted as soon as pruning triggers
//! ```

use std::collections::BTreeSet;

use serde::Serialize;
use sitewright_types::{Message, PruningPolicy};

use crate::importance::classify;
use crate::token_estimator::TokenEstimator;

/// Outcome of a pruning pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PruningResult {
    /// Retained messages, a chronological subsequence of the input.
    pub messages: Vec<Message>,
    /// Number of messages removed.
    pub pruned_count: usize,
    /// Estimated tokens of `messages`.
    pub token_count: u32,
    /// Carried-over summary; the engine never writes a new one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Removed messages in original order, for a summarizer.
    pub evicted: Vec<Message>,
}

impl PruningResult {
    fn unchanged(messages: &[Message], token_count: u32, summary: Option<&str>) -> Self {
        Self {
            messages: messages.to_vec(),
            pruned_count: 0,
            token_count,
            summary: summary.map(ToOwned::to_owned),
            evicted: Vec::new(),
        }
    }

    #[must_use]
    pub fn was_pruned(&self) -> bool {
        self.pruned_count > 0
    }
}

/// Whether `messages` exceed either policy limit.
///
/// The count check runs first so the token estimate is only computed when it
/// can change the answer.
#[must_use]
pub fn should_trigger_pruning(messages: &[Message], policy: &PruningPolicy) -> bool {
    messages.len() > policy.max_messages
        || TokenEstimator::new().count_messages(messages) > policy.max_tokens
}

/// Prune `messages` down to the policy limits.
///
/// When pruning does not trigger, the input comes back unchanged. Otherwise
/// messages outside the pinned set and the recency window are dropped, then
/// the oldest unpinned survivors are dropped one by one until both limits
/// hold or only pinned messages remain. The result may still exceed the
/// limits when everything left is pinned; callers that need a hard cap check
/// `token_count` and `messages.len()` themselves.
#[must_use]
pub fn prune_messages(
    messages: &[Message],
    existing_summary: Option<&str>,
    policy: &PruningPolicy,
) -> PruningResult {
    let estimator = TokenEstimator::new();

    if !should_trigger_pruning(messages, policy) {
        return PruningResult::unchanged(
            messages,
            estimator.count_messages(messages),
            existing_summary,
        );
    }

    let pinned = classify(
        messages,
        &policy.importance_markers,
        policy.preserve_system_messages,
    );
    let recent = recent_window(messages, policy.preserve_recent_count);

    let costs: Vec<u64> = messages
        .iter()
        .map(|msg| estimator.count_message(msg))
        .collect();

    let mut retained: Vec<bool> = (0..messages.len())
        .map(|index| pinned.contains(&index) || recent.contains(&index))
        .collect();
    let mut kept = retained.iter().filter(|keep| **keep).count();
    let mut raw_tokens: u64 = costs
        .iter()
        .zip(&retained)
        .filter_map(|(cost, keep)| keep.then_some(*cost))
        .sum();

    let over_limit = |kept: usize, raw: u64| {
        kept > policy.max_messages || TokenEstimator::with_margin(raw) > policy.max_tokens
    };

    for index in 0..messages.len() {
        if !over_limit(kept, raw_tokens) {
            break;
        }
        if retained[index] && !pinned.contains(&index) {
            retained[index] = false;
            kept -= 1;
            raw_tokens -= costs[index];
        }
    }

    let mut kept_messages = Vec::with_capacity(kept);
    let mut evicted = Vec::with_capacity(messages.len() - kept);
    for (msg, keep) in messages.iter().zip(&retained) {
        if *keep {
            kept_messages.push(msg.clone());
        } else {
            evicted.push(msg.clone());
        }
    }

    let token_count = TokenEstimator::with_margin(raw_tokens);
    if over_limit(kept, raw_tokens) {
        tracing::debug!(
            retained = kept,
            token_count,
            max_messages = policy.max_messages,
            max_tokens = policy.max_tokens,
            "Pinned messages alone exceed pruning limits"
        );
    }
    tracing::debug!(
        input = messages.len(),
        retained = kept_messages.len(),
        pruned = evicted.len(),
        token_count,
        "Pruned conversation"
    );

    PruningResult {
        pruned_count: evicted.len(),
        messages: kept_messages,
        token_count,
        summary: existing_summary.map(ToOwned::to_owned),
        evicted,
    }
}

/// Indices of the last `count` non-system messages.
fn recent_window(messages: &[Message], count: usize) -> BTreeSet<usize> {
    messages
        .iter()
        .enumerate()
        .rev()
        .filter(|(_, msg)| !msg.is_system())
        .take(count)
        .map(|(index, _)| index)
        .collect()
}
