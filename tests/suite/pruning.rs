//! Pruning engine properties over generated and hand-built conversations.

use sitewright_context::{
    TokenEstimator, estimate_token_count, identify_important_messages_with, prune_messages,
    should_trigger_pruning,
};
use rand::prelude::*;
use rand::rngs::StdRng;
use sitewright_types::{ImportanceMarkers, Message, PruningPolicy};

use crate::common::{at, conversation, is_subsequence, random_conversation, seeded_rng};

fn random_policy(rng: &mut StdRng) -> PruningPolicy {
    PruningPolicy::default()
        .with_max_messages(rng.random_range(1..=40))
        .with_max_tokens(rng.random_range(50..3050))
        .with_preserve_recent_count(rng.random_range(0..35))
        .with_preserve_system_messages(rng.random_bool(2.0 / 3.0))
}

fn cases() -> impl Iterator<Item = (Vec<Message>, PruningPolicy)> {
    let mut rng = seeded_rng();
    (0..300).map(move |_| {
        let len = rng.random_range(0..80);
        let messages = random_conversation(&mut rng, len);
        let policy = random_policy(&mut rng);
        (messages, policy)
    })
}

#[test]
fn untriggered_pruning_returns_input_unchanged() {
    let mut checked = 0;
    for (messages, policy) in cases() {
        if should_trigger_pruning(&messages, &policy) {
            continue;
        }
        let result = prune_messages(&messages, Some("kept"), &policy);
        assert_eq!(result.messages, messages);
        assert_eq!(result.pruned_count, 0);
        assert!(result.evicted.is_empty());
        assert_eq!(result.summary.as_deref(), Some("kept"));
        checked += 1;
    }
    assert!(checked > 0, "generator never produced an in-budget case");
}

#[test]
fn retained_messages_keep_their_order() {
    for (messages, policy) in cases() {
        let result = prune_messages(&messages, None, &policy);

        assert!(is_subsequence(&result.messages, &messages));
        assert!(is_subsequence(&result.evicted, &messages));
        assert_eq!(result.messages.len() + result.pruned_count, messages.len());
        assert_eq!(result.evicted.len(), result.pruned_count);
    }
}

#[test]
fn important_messages_always_survive() {
    let markers = ImportanceMarkers::default();
    for (messages, policy) in cases() {
        let policy = policy.with_preserve_system_messages(true);
        let result = prune_messages(&messages, None, &policy);

        for index in identify_important_messages_with(&messages, &markers) {
            assert!(
                result.messages.contains(&messages[index]),
                "important message {index} was evicted"
            );
        }
    }
}

#[test]
fn unpreserved_system_messages_lose_their_pin() {
    let markers = ImportanceMarkers::default();
    for (messages, policy) in cases() {
        let policy = policy.with_preserve_system_messages(false);
        let result = prune_messages(&messages, None, &policy);
        let last = messages.len().saturating_sub(1);

        for index in identify_important_messages_with(&messages, &markers) {
            let pinned_anyway =
                index == 0 || index == last || markers.matches(messages[index].content());
            if pinned_anyway {
                assert!(
                    result.messages.contains(&messages[index]),
                    "bookend or marked message {index} was evicted"
                );
            } else if result.was_pruned() {
                // Only system messages are in the set without being pinned,
                // and pruning passes never keep them.
                assert!(messages[index].is_system());
                assert!(!result.messages.contains(&messages[index]));
            }
        }
    }
}

#[test]
fn token_count_matches_retained_messages() {
    for (messages, policy) in cases() {
        let result = prune_messages(&messages, None, &policy);
        assert_eq!(result.token_count, estimate_token_count(&result.messages));
    }
}

#[test]
fn limits_hold_whenever_pinned_messages_fit() {
    let markers = ImportanceMarkers::default();
    let estimator = TokenEstimator::new();

    for (messages, policy) in cases() {
        let policy = policy.with_preserve_system_messages(true);
        let pinned = identify_important_messages_with(&messages, &markers);
        let pinned_raw: u64 = pinned
            .iter()
            .map(|&index| estimator.count_message(&messages[index]))
            .sum();
        if pinned.len() > policy.max_messages
            || TokenEstimator::with_margin(pinned_raw) > policy.max_tokens
        {
            continue;
        }

        let result = prune_messages(&messages, None, &policy);
        assert!(result.messages.len() <= policy.max_messages);
        assert!(result.token_count <= policy.max_tokens);
    }
}

#[test]
fn pruning_a_pruned_conversation_removes_nothing() {
    for (messages, policy) in cases() {
        let once = prune_messages(&messages, None, &policy);
        let twice = prune_messages(&once.messages, None, &policy);

        assert_eq!(twice.pruned_count, 0);
        assert_eq!(twice.messages, once.messages);
    }
}

#[test]
fn long_chat_keeps_system_prompt_and_recent_window() {
    let messages = conversation(60);
    assert_eq!(messages.len(), 61);

    let result = prune_messages(&messages, None, &PruningPolicy::default());

    assert_eq!(result.messages.len(), 31);
    assert_eq!(result.pruned_count, 30);
    assert!(result.messages[0].is_system());
    assert_eq!(result.messages[1].content(), "Message 30");
    assert_eq!(result.messages[30].content(), "Response 59");
}

#[test]
fn oversized_messages_are_evicted_oldest_first() {
    let big = "x".repeat(10_000);
    let messages = vec![
        Message::user(big.clone(), at(1)),
        Message::assistant(big.clone(), at(2)),
        Message::user(big.clone(), at(3)),
        Message::assistant(big, at(4)),
    ];
    assert_eq!(estimate_token_count(&messages), 11_000);

    let result = prune_messages(&messages, None, &PruningPolicy::default());

    assert_eq!(result.messages, vec![messages[0].clone(), messages[3].clone()]);
    assert_eq!(result.token_count, 5500);
    assert_eq!(result.evicted, vec![messages[1].clone(), messages[2].clone()]);
}

#[test]
fn marked_messages_outlive_the_window() {
    let mut messages = conversation(60);
    messages[5] = Message::user("IMPORTANT: the domain is bakery.example", at(5));
    messages[9] = Message::assistant("Note: brand colour is #aa3300", at(9));

    let result = prune_messages(&messages, None, &PruningPolicy::default());

    assert_eq!(result.messages.len(), 33);
    assert_eq!(result.messages[1], messages[5]);
    assert_eq!(result.messages[2], messages[9]);
}

#[test]
fn empty_conversation_is_a_no_op() {
    let result = prune_messages(&[], None, &PruningPolicy::default());
    assert!(result.messages.is_empty());
    assert_eq!(result.token_count, 0);
    assert!(!result.was_pruned());
}
