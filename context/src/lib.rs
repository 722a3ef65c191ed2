//! Conversation context management for the site-building assistant.
//!
//! This crate provides:
//! - Deterministic token estimation
//! - Importance classification and policy-driven pruning
//! - Observational stats over a conversation
//! - A storage port with in-memory and SQLite stores
//! - `ContextService`, which keeps stored sessions within policy
//!
//! # Architecture
//!
//! ```text
//! ContextService<S: SessionStore>
//! ├── store: S (MemorySessionStore | SqliteSessionStore)
//! ├── policy: PruningPolicy
//! └── summarizer: Option<Box<dyn Summarizer>>
//!
//! prune_messages
//! ├── should_trigger_pruning ── estimate_token_count
//! └── importance classification (bookends, markers, system)
//! ```

mod importance;
mod pruning;
mod service;
mod sqlite_store;
mod stats;
mod store;
mod summarization;
mod token_estimator;

pub use importance::{identify_important_messages, identify_important_messages_with};
pub use pruning::{PruningResult, prune_messages, should_trigger_pruning};
pub use service::{ContextService, StoreOutcome};
pub use sqlite_store::SqliteSessionStore;
pub use stats::{PruningStats, get_pruning_stats};
pub use store::{MemorySessionStore, SessionStore};
pub use summarization::{EvictionNoteSummarizer, Summarizer, build_summarization_prompt};
pub use token_estimator::{TokenEstimator, estimate_token_count};
