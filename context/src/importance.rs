//! Importance classification: which messages must survive any eviction.

use std::collections::BTreeSet;

use sitewright_types::{ImportanceMarkers, Message};

/// Indices of messages that are never evicted, using the default markers.
///
/// The set is the union of:
/// - every `system` message
/// - the first and the last message (conversation bookends)
/// - every message whose content contains an importance marker
///
/// This is the set the pruning engine pins under the default policy. With
/// `preserve_system_messages` off, [`prune_messages`](crate::prune_messages)
/// pins only the bookends and marker hits, so other system messages in this
/// set can be evicted.
#[must_use]
pub fn identify_important_messages(messages: &[Message]) -> BTreeSet<usize> {
    identify_important_messages_with(messages, &ImportanceMarkers::default())
}

/// [`identify_important_messages`] with a caller-supplied marker list.
#[must_use]
pub fn identify_important_messages_with(
    messages: &[Message],
    markers: &ImportanceMarkers,
) -> BTreeSet<usize> {
    classify(messages, markers, true)
}

/// Shared classifier. With `include_system` false, system messages are only
/// important when they are bookends or carry a marker.
pub(crate) fn classify(
    messages: &[Message],
    markers: &ImportanceMarkers,
    include_system: bool,
) -> BTreeSet<usize> {
    let mut important = BTreeSet::new();
    let Some(last) = messages.len().checked_sub(1) else {
        return important;
    };

    important.insert(0);
    important.insert(last);

    for (index, msg) in messages.iter().enumerate() {
        if (include_system && msg.is_system()) || markers.matches(msg.content()) {
            important.insert(index);
        }
    }

    important
}
