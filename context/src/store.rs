//! Session storage port.
//!
//! The context service never owns global state; it is handed a
//! [`SessionStore`] and reads/writes whole [`ConversationRecord`]s through it.

use std::collections::HashMap;

use anyhow::Result;
use sitewright_types::{ConversationRecord, SessionKey};

/// Durable (or not) keyed storage for conversation records.
///
/// Writes take `&mut self`, so a single owner serializes appends to a session.
pub trait SessionStore {
    fn get(&self, key: &SessionKey) -> Result<Option<ConversationRecord>>;

    /// Insert or replace the record for `key`.
    fn put(&mut self, key: &SessionKey, record: &ConversationRecord) -> Result<()>;

    /// Returns whether a record existed.
    fn delete(&mut self, key: &SessionKey) -> Result<bool>;
}

/// Process-local store; records vanish with the process.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    records: HashMap<SessionKey, ConversationRecord>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &SessionKey) -> Result<Option<ConversationRecord>> {
        Ok(self.records.get(key).cloned())
    }

    fn put(&mut self, key: &SessionKey, record: &ConversationRecord) -> Result<()> {
        self.records.insert(key.clone(), record.clone());
        Ok(())
    }

    fn delete(&mut self, key: &SessionKey) -> Result<bool> {
        Ok(self.records.remove(key).is_some())
    }
}
