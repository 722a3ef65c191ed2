//! Conversation message domain model.
//!
//! Constructors take `SystemTime` explicitly; callers own the clock.

use std::fmt;
use std::str::FromStr;
use std::time::SystemTime;

use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown message role: {0:?} (expected user, assistant or system)")]
pub struct RoleParseError(String);

impl FromStr for Role {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            "system" => Ok(Role::System),
            other => Err(RoleParseError(other.to_string())),
        }
    }
}

/// Side-channel data recorded alongside a message.
///
/// Only its serialized size matters to token estimation, so absent fields are
/// skipped on serialization and never counted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageMetadata {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub tokens: Option<u32>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_js_number",
        default
    )]
    pub temperature: Option<f64>,
}

/// Whole numbers are written without a fraction (`1`, not `1.0`), matching
/// how browsers serialize the same metadata. Token estimates depend on it.
#[allow(clippy::ref_option)]
fn serialize_js_number<S: Serializer>(
    value: &Option<f64>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    const MAX_EXACT_INT: f64 = 9_007_199_254_740_992.0;
    match *value {
        Some(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < MAX_EXACT_INT => {
            serializer.serialize_i64(v as i64)
        }
        Some(v) => serializer.serialize_f64(v),
        None => serializer.serialize_none(),
    }
}

/// A single conversation turn.
///
/// Content may be empty. Stored records written by older producers can lack
/// `content` or `timestamp`; both deserialize leniently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    role: Role,
    #[serde(default)]
    content: String,
    #[serde(
        skip_serializing_if = "Option::is_none",
        with = "crate::timestamp::option",
        default
    )]
    timestamp: Option<SystemTime>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    metadata: Option<MessageMetadata>,
}

impl Message {
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>, timestamp: SystemTime) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Some(timestamp),
            metadata: None,
        }
    }

    #[must_use]
    pub fn system(content: impl Into<String>, timestamp: SystemTime) -> Self {
        Self::new(Role::System, content, timestamp)
    }

    #[must_use]
    pub fn user(content: impl Into<String>, timestamp: SystemTime) -> Self {
        Self::new(Role::User, content, timestamp)
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>, timestamp: SystemTime) -> Self {
        Self::new(Role::Assistant, content, timestamp)
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: MessageMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    #[must_use]
    pub fn is_system(&self) -> bool {
        self.role == Role::System
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    #[must_use]
    pub fn timestamp(&self) -> Option<SystemTime> {
        self.timestamp
    }

    #[must_use]
    pub fn metadata(&self) -> Option<&MessageMetadata> {
        self.metadata.as_ref()
    }
}
