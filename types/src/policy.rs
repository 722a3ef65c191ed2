//! Pruning policy configuration.

use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_MESSAGES: usize = 50;
pub const DEFAULT_MAX_TOKENS: u32 = 8000;
pub const DEFAULT_PRESERVE_RECENT_COUNT: usize = 30;

/// Case-sensitive substrings that pin a message against eviction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImportanceMarkers(Vec<String>);

impl ImportanceMarkers {
    pub const DEFAULT: [&'static str; 2] = ["IMPORTANT", "Note:"];

    /// Empty markers are dropped: an empty substring would match every message.
    #[must_use]
    pub fn new<I, S>(markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(
            markers
                .into_iter()
                .map(Into::into)
                .filter(|marker: &String| !marker.is_empty())
                .collect(),
        )
    }

    #[must_use]
    pub fn matches(&self, content: &str) -> bool {
        self.0.iter().any(|marker| content.contains(marker.as_str()))
    }

    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for ImportanceMarkers {
    fn default() -> Self {
        Self::new(Self::DEFAULT)
    }
}

/// Limits and retention rules applied by the pruning engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PruningPolicy {
    /// Retained message count above which pruning triggers.
    pub max_messages: usize,
    /// Estimated token total above which pruning triggers.
    pub max_tokens: u32,
    /// Pin every `system` message.
    pub preserve_system_messages: bool,
    /// Most-recent non-system messages kept by the recency window.
    pub preserve_recent_count: usize,
    pub importance_markers: ImportanceMarkers,
}

impl PruningPolicy {
    #[must_use]
    pub fn with_max_messages(mut self, max_messages: usize) -> Self {
        self.max_messages = max_messages;
        self
    }

    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    #[must_use]
    pub fn with_preserve_system_messages(mut self, preserve: bool) -> Self {
        self.preserve_system_messages = preserve;
        self
    }

    #[must_use]
    pub fn with_preserve_recent_count(mut self, count: usize) -> Self {
        self.preserve_recent_count = count;
        self
    }

    #[must_use]
    pub fn with_importance_markers(mut self, markers: ImportanceMarkers) -> Self {
        self.importance_markers = markers;
        self
    }
}

impl Default for PruningPolicy {
    fn default() -> Self {
        Self {
            max_messages: DEFAULT_MAX_MESSAGES,
            max_tokens: DEFAULT_MAX_TOKENS,
            preserve_system_messages: true,
            preserve_recent_count: DEFAULT_PRESERVE_RECENT_COUNT,
            importance_markers: ImportanceMarkers::default(),
        }
    }
}
