//! Context service - keeps stored conversations within the pruning policy.
//!
//! ```text
//! append_message(key, msg)
//!   store.get(key) ──> record (or a fresh one)
//!   push msg
//!   should_trigger_pruning? ──yes──> prune_messages ──> summarizer(evicted)
//!   store.put(key, record)
//! ```

use std::time::SystemTime;

use anyhow::{Context, Result};
use sitewright_types::{ConversationRecord, Message, PruningPolicy, SessionKey};

use crate::pruning::{PruningResult, prune_messages, should_trigger_pruning};
use crate::stats::{PruningStats, get_pruning_stats};
use crate::store::SessionStore;
use crate::summarization::Summarizer;
use crate::token_estimator::estimate_token_count;

/// Result of a write through the service.
#[derive(Debug, Clone)]
pub struct StoreOutcome {
    /// The record as persisted.
    pub record: ConversationRecord,
    /// Messages removed by pruning during this write (0 when none ran).
    pub pruned_count: usize,
}

pub struct ContextService<S> {
    store: S,
    policy: PruningPolicy,
    summarizer: Option<Box<dyn Summarizer>>,
}

impl<S: std::fmt::Debug> std::fmt::Debug for ContextService<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextService")
            .field("store", &self.store)
            .field("policy", &self.policy)
            .field("summarizer", &self.summarizer.as_ref().map(|_| "<Summarizer>"))
            .finish()
    }
}

impl<S: SessionStore> ContextService<S> {
    #[must_use]
    pub fn new(store: S, policy: PruningPolicy) -> Self {
        Self {
            store,
            policy,
            summarizer: None,
        }
    }

    /// Summarize evicted messages on every pruning pass that removes something.
    /// Without one, an existing summary is carried forward unchanged.
    #[must_use]
    pub fn with_summarizer(mut self, summarizer: impl Summarizer + 'static) -> Self {
        self.summarizer = Some(Box::new(summarizer));
        self
    }

    #[must_use]
    pub fn policy(&self) -> &PruningPolicy {
        &self.policy
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn get_context(&self, key: &SessionKey) -> Result<Option<ConversationRecord>> {
        self.store.get(key)
    }

    /// Replace a session's history, pruning first when it exceeds the policy.
    ///
    /// `created_at` is kept from an existing record.
    pub fn store_context(
        &mut self,
        key: &SessionKey,
        website_id: Option<String>,
        messages: Vec<Message>,
        summary: Option<String>,
    ) -> Result<StoreOutcome> {
        let now = SystemTime::now();
        let mut record = match self.store.get(key)? {
            Some(existing) => ConversationRecord {
                website_id,
                summary,
                ..existing
            },
            None => {
                let mut record = ConversationRecord::new(website_id, now);
                record.summary = summary;
                record
            }
        };
        record.messages = messages;

        let pruned_count = self.prune_and_put(key, &mut record, now)?;
        Ok(StoreOutcome {
            record,
            pruned_count,
        })
    }

    /// Append one message to a session, creating the session if needed.
    pub fn append_message(&mut self, key: &SessionKey, message: Message) -> Result<StoreOutcome> {
        let now = SystemTime::now();
        let mut record = self
            .store
            .get(key)?
            .unwrap_or_else(|| ConversationRecord::new(None, now));
        record.messages.push(message);

        let pruned_count = self.prune_and_put(key, &mut record, now)?;
        Ok(StoreOutcome {
            record,
            pruned_count,
        })
    }

    /// Returns whether the session existed.
    pub fn clear_context(&mut self, key: &SessionKey) -> Result<bool> {
        let existed = self.store.delete(key)?;
        if existed {
            tracing::info!(session = %key, "Cleared conversation context");
        }
        Ok(existed)
    }

    pub fn context_stats(&self, key: &SessionKey) -> Result<Option<PruningStats>> {
        Ok(self
            .store
            .get(key)?
            .map(|record| get_pruning_stats(&record.messages)))
    }

    /// Messages to send to a model: the stored summary (if any) as a leading
    /// system message, then the stored history.
    pub fn context_messages(&self, key: &SessionKey) -> Result<Vec<Message>> {
        let Some(record) = self.store.get(key)? else {
            return Ok(Vec::new());
        };

        let mut messages = Vec::with_capacity(record.messages.len() + 1);
        if let Some(summary) = record.summary.as_deref().filter(|s| !s.trim().is_empty()) {
            let at = record
                .messages
                .first()
                .and_then(Message::timestamp)
                .unwrap_or(record.created_at);
            messages.push(Message::system(
                format!("Summary of earlier conversation:\n{summary}"),
                at,
            ));
        }
        messages.extend(record.messages);
        Ok(messages)
    }

    fn prune_and_put(
        &mut self,
        key: &SessionKey,
        record: &mut ConversationRecord,
        now: SystemTime,
    ) -> Result<usize> {
        let mut pruned_count = 0;

        if should_trigger_pruning(&record.messages, &self.policy) {
            let PruningResult {
                messages,
                pruned_count: removed,
                token_count,
                summary,
                evicted,
            } = prune_messages(&record.messages, record.summary.as_deref(), &self.policy);

            record.summary = match (&self.summarizer, evicted.is_empty()) {
                (Some(summarizer), false) => Some(
                    summarizer
                        .summarize(&evicted, summary.as_deref())
                        .with_context(|| format!("Failed to summarize pruned messages for {key}"))?,
                ),
                _ => summary,
            };
            record.messages = messages;
            record.token_count = token_count;
            if removed > 0 {
                record.last_pruned_at = Some(now);
                tracing::info!(
                    session = %key,
                    pruned = removed,
                    retained = record.messages.len(),
                    token_count,
                    "Pruned conversation context"
                );
            }
            pruned_count = removed;
        } else {
            record.token_count = estimate_token_count(&record.messages);
        }

        record.updated_at = now;
        self.store.put(key, record)?;
        Ok(pruned_count)
    }
}
