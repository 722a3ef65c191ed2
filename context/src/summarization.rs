//! Summaries of evicted conversation content.
//!
//! The pruning engine only selects; writing a summary of what it removed is
//! the job of a [`Summarizer`]. The context service calls one after every
//! pruning pass that evicted something, when one is configured.

use std::fmt::Write;

use anyhow::Result;
use sitewright_types::{Message, Role};

/// Produces the summary stored alongside a pruned conversation.
pub trait Summarizer: Send + Sync {
    /// Summarize `evicted` (oldest first), folding in the `previous` summary
    /// if the conversation already had one.
    fn summarize(&self, evicted: &[Message], previous: Option<&str>) -> Result<String>;
}

/// Deterministic summarizer that records how much was pruned, by role.
///
/// Each pruning pass appends one line, so the summary reads as a log of
/// evictions. Useful where no model is available to write real summaries.
#[derive(Debug, Clone, Copy, Default)]
pub struct EvictionNoteSummarizer;

impl Summarizer for EvictionNoteSummarizer {
    fn summarize(&self, evicted: &[Message], previous: Option<&str>) -> Result<String> {
        let count = |role: Role| evicted.iter().filter(|m| m.role() == role).count();

        let mut summary = previous
            .map(str::trim_end)
            .filter(|p| !p.is_empty())
            .map(|p| format!("{p}\n"))
            .unwrap_or_default();
        let _ = write!(
            summary,
            "[{} earlier messages pruned: {} user, {} assistant, {} system]",
            evicted.len(),
            count(Role::User),
            count(Role::Assistant),
            count(Role::System),
        );
        Ok(summary)
    }
}

/// Build a prompt for a model-backed summarizer.
///
/// Returns `(system_instruction, conversation_text)`. The previous summary,
/// when present, is placed ahead of the evicted messages so the model folds
/// it into the new summary instead of losing it.
#[must_use]
pub fn build_summarization_prompt(
    evicted: &[Message],
    previous: Option<&str>,
    target_tokens: u32,
) -> (String, String) {
    let system_instruction = format!(
        r#"You summarize the earlier part of a conversation between a website owner and a site-building assistant.

REQUIREMENTS:
1. Preserve decisions about pages, content types, layout and copy
2. Preserve names, URLs, field names and any values the user supplied
3. Note unresolved requests or pending changes
4. Keep the summary under approximately {target_tokens} tokens
5. Merge the previous summary (if given) into the new one

Write the summary as plain prose. Start directly with the content."#
    );

    let mut conversation_text = String::new();
    if let Some(previous) = previous.filter(|p| !p.trim().is_empty()) {
        let _ = write!(conversation_text, "[Previous summary]\n{previous}\n\n");
    }
    for (index, message) in evicted.iter().enumerate() {
        let role = match message.role() {
            Role::System => "System",
            Role::User => "User",
            Role::Assistant => "Assistant",
        };
        let _ = write!(
            conversation_text,
            "[Message {}] {}: {}\n\n",
            index + 1,
            role,
            message.content()
        );
    }

    (system_instruction, conversation_text)
}
