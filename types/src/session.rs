//! Session identity and the durable conversation record.

use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::message::Message;

/// Identifier of a stored conversation, guaranteed non-empty after trimming.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionKey(String);

#[derive(Debug, Error)]
#[error("session key must not be empty")]
pub struct EmptySessionKeyError;

impl SessionKey {
    pub fn new(value: impl Into<String>) -> Result<Self, EmptySessionKeyError> {
        let value = value.into();
        if value.trim().is_empty() {
            Err(EmptySessionKeyError)
        } else {
            Ok(Self(value))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SessionKey {
    type Error = EmptySessionKeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for SessionKey {
    type Error = EmptySessionKeyError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SessionKey> for String {
    fn from(value: SessionKey) -> Self {
        value.0
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a session store persists for one conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationRecord {
    /// Website the assistant conversation belongs to, when known.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub website_id: Option<String>,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub summary: Option<String>,
    /// Estimated tokens of `messages` at the last write.
    pub token_count: u32,
    #[serde(with = "crate::timestamp")]
    pub created_at: SystemTime,
    #[serde(with = "crate::timestamp")]
    pub updated_at: SystemTime,
    #[serde(
        skip_serializing_if = "Option::is_none",
        with = "crate::timestamp::option",
        default
    )]
    pub last_pruned_at: Option<SystemTime>,
}

impl ConversationRecord {
    #[must_use]
    pub fn new(website_id: Option<String>, now: SystemTime) -> Self {
        Self {
            website_id,
            messages: Vec::new(),
            summary: None,
            token_count: 0,
            created_at: now,
            updated_at: now,
            last_pruned_at: None,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
