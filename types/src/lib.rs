//! Core domain types for Sitewright's assistant conversations.
//!
//! This crate contains pure domain types with no IO and minimal dependencies.
//! Everything here can be used from any layer of the application.

mod message;
mod policy;
mod session;
pub mod timestamp;

pub use message::{Message, MessageMetadata, Role, RoleParseError};
pub use policy::{
    DEFAULT_MAX_MESSAGES, DEFAULT_MAX_TOKENS, DEFAULT_PRESERVE_RECENT_COUNT, ImportanceMarkers,
    PruningPolicy,
};
pub use session::{ConversationRecord, EmptySessionKeyError, SessionKey};
