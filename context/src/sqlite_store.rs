//! SQLite-backed session store.
//!
//! One row per session. Messages are stored as a JSON array so a record is
//! read and written as a unit, matching the whole-record semantics of
//! [`SessionStore`]. Timestamps are RFC 3339 text in UTC.

use std::path::Path;
use std::time::SystemTime;

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};

use sitewright_types::{ConversationRecord, Message, SessionKey, timestamp};

use crate::store::SessionStore;

pub struct SqliteSessionStore {
    db: Connection,
}

impl std::fmt::Debug for SqliteSessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteSessionStore")
            .field("path", &self.db.path())
            .finish()
    }
}

/// Raw column values of a `conversations` row.
struct StoredRow {
    website_id: Option<String>,
    messages: String,
    summary: Option<String>,
    token_count: i64,
    created_at: String,
    updated_at: String,
    last_pruned_at: Option<String>,
}

impl SqliteSessionStore {
    const SCHEMA: &'static str = r"
        CREATE TABLE IF NOT EXISTS conversations (
            session_key TEXT PRIMARY KEY,
            website_id TEXT,
            messages TEXT NOT NULL,
            summary TEXT,
            token_count INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            last_pruned_at TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_conversations_website
        ON conversations(website_id);
    ";

    /// Open or create the session database at `path`.
    ///
    /// The parent directory is created if missing. On Unix the database file
    /// is restricted to the owner.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let db = Connection::open(path)
            .with_context(|| format!("Failed to open session store at {}", path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
                .with_context(|| format!("Failed to set database permissions: {}", path.display()))?;
        }

        tracing::debug!(path = %path.display(), "Opened session store");
        Self::initialize(db)
    }

    /// Open an in-memory store (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let db = Connection::open_in_memory().context("Failed to open in-memory session store")?;
        Self::initialize(db)
    }

    fn initialize(db: Connection) -> Result<Self> {
        db.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=FULL;")
            .context("Failed to set session store pragmas")?;
        db.execute_batch(Self::SCHEMA)
            .context("Failed to create session store schema")?;
        Ok(Self { db })
    }

    /// All stored session keys, most recently updated first.
    pub fn session_keys(&self) -> Result<Vec<SessionKey>> {
        let mut stmt = self
            .db
            .prepare("SELECT session_key FROM conversations ORDER BY updated_at DESC, session_key")
            .context("Failed to prepare session listing")?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .context("Failed to list sessions")?;

        let mut keys = Vec::new();
        for raw in rows {
            let raw = raw.context("Failed to read session key")?;
            match SessionKey::new(raw) {
                Ok(key) => keys.push(key),
                Err(e) => tracing::warn!("Skipping stored session with invalid key: {e}"),
            }
        }
        Ok(keys)
    }

    fn decode(key: &SessionKey, row: StoredRow) -> Result<ConversationRecord> {
        let messages: Vec<Message> = serde_json::from_str(&row.messages)
            .with_context(|| format!("Corrupt message history for session {key}"))?;

        Ok(ConversationRecord {
            website_id: row.website_id,
            messages,
            summary: row.summary,
            token_count: u32::try_from(row.token_count).unwrap_or(u32::MAX),
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: parse_timestamp(&row.updated_at)?,
            last_pruned_at: row
                .last_pruned_at
                .as_deref()
                .map(parse_timestamp)
                .transpose()?,
        })
    }
}

impl SessionStore for SqliteSessionStore {
    fn get(&self, key: &SessionKey) -> Result<Option<ConversationRecord>> {
        let row = self
            .db
            .query_row(
                "SELECT website_id, messages, summary, token_count, created_at, updated_at, last_pruned_at
                 FROM conversations WHERE session_key = ?1",
                params![key.as_str()],
                |row| {
                    Ok(StoredRow {
                        website_id: row.get(0)?,
                        messages: row.get(1)?,
                        summary: row.get(2)?,
                        token_count: row.get(3)?,
                        created_at: row.get(4)?,
                        updated_at: row.get(5)?,
                        last_pruned_at: row.get(6)?,
                    })
                },
            )
            .optional()
            .with_context(|| format!("Failed to load session {key}"))?;

        row.map(|row| Self::decode(key, row)).transpose()
    }

    fn put(&mut self, key: &SessionKey, record: &ConversationRecord) -> Result<()> {
        let messages =
            serde_json::to_string(&record.messages).context("Failed to serialize messages")?;

        self.db
            .execute(
                "INSERT INTO conversations
                    (session_key, website_id, messages, summary, token_count, created_at, updated_at, last_pruned_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(session_key) DO UPDATE SET
                    website_id = excluded.website_id,
                    messages = excluded.messages,
                    summary = excluded.summary,
                    token_count = excluded.token_count,
                    created_at = excluded.created_at,
                    updated_at = excluded.updated_at,
                    last_pruned_at = excluded.last_pruned_at",
                params![
                    key.as_str(),
                    record.website_id,
                    messages,
                    record.summary,
                    i64::from(record.token_count),
                    format_timestamp(record.created_at),
                    format_timestamp(record.updated_at),
                    record.last_pruned_at.map(format_timestamp),
                ],
            )
            .with_context(|| format!("Failed to store session {key}"))?;

        tracing::debug!(session = %key, messages = record.messages.len(), "Stored session");
        Ok(())
    }

    fn delete(&mut self, key: &SessionKey) -> Result<bool> {
        let deleted = self
            .db
            .execute(
                "DELETE FROM conversations WHERE session_key = ?1",
                params![key.as_str()],
            )
            .with_context(|| format!("Failed to delete session {key}"))?;
        Ok(deleted > 0)
    }
}

fn format_timestamp(time: SystemTime) -> String {
    timestamp::format(time)
}

fn parse_timestamp(raw: &str) -> Result<SystemTime> {
    timestamp::parse(raw).with_context(|| format!("Invalid stored timestamp: {raw}"))
}
