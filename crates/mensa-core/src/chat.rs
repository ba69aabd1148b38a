//! Chat message store
//!
//! Directed, timestamped messages between two platform users (a student and
//! a store, a store and an admin, ...). Messages are immutable once stored;
//! retrieval is filter + sort, newest first by convention.

use crate::error::Error;
use crate::storage::{Database, SortOrder};
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Row;
use uuid::Uuid;

/// Role of the user sending a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderRole {
    Student,
    Store,
    Admin,
}

impl SenderRole {
    /// Convert to string for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            SenderRole::Student => "student",
            SenderRole::Store => "store",
            SenderRole::Admin => "admin",
        }
    }

    /// Parse from database string
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "student" => Some(SenderRole::Student),
            "store" => Some(SenderRole::Store),
            "admin" => Some(SenderRole::Admin),
            _ => None,
        }
    }
}

/// A chat message between two platform users
///
/// Serialized field names follow the collection contract external readers
/// consume (`senderId`, `receiverId`, `senderRole`, `message`, `createdAt`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Unique message identifier
    pub id: String,
    /// Identifier of the sending user
    pub sender_id: String,
    /// Identifier of the receiving user
    pub receiver_id: String,
    /// Role of the sender
    pub sender_role: SenderRole,
    /// Message text
    #[serde(rename = "message")]
    pub body: String,
    /// When the message was created
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    /// Create a new message with `created_at` set to the current time
    pub fn new(
        sender_id: impl Into<String>,
        receiver_id: impl Into<String>,
        sender_role: SenderRole,
        body: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            sender_id: sender_id.into(),
            receiver_id: receiver_id.into(),
            sender_role,
            body: body.into(),
            created_at: Utc::now(),
        }
    }

    /// Override the creation timestamp
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Check the required-field invariants
    ///
    /// The role cannot be invalid by construction; identifiers and body must
    /// be non-empty.
    pub fn validate(&self) -> Result<()> {
        if self.sender_id.trim().is_empty() {
            return Err(Error::Validation("senderId must not be empty".to_string()));
        }
        if self.receiver_id.trim().is_empty() {
            return Err(Error::Validation("receiverId must not be empty".to_string()));
        }
        if self.body.trim().is_empty() {
            return Err(Error::Validation("message must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Filter for message retrieval
///
/// Time bounds follow the inclusive-start/exclusive-end convention:
/// `since <= created_at < until`.
#[derive(Debug, Clone, Default)]
pub struct MessageFilter {
    /// Match the sending user
    pub sender_id: Option<String>,
    /// Match the receiving user
    pub receiver_id: Option<String>,
    /// Match the sender role
    pub sender_role: Option<SenderRole>,
    /// Inclusive lower bound on `created_at`
    pub since: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `created_at`
    pub until: Option<DateTime<Utc>>,
    /// Maximum number of messages to return
    pub limit: Option<u32>,
    /// Sort order on `created_at` (descending by default)
    pub order: SortOrder,
}

impl MessageFilter {
    /// Create an empty filter (matches everything, newest first)
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter by sending user
    pub fn sender(mut self, sender_id: impl Into<String>) -> Self {
        self.sender_id = Some(sender_id.into());
        self
    }

    /// Filter by receiving user
    pub fn receiver(mut self, receiver_id: impl Into<String>) -> Self {
        self.receiver_id = Some(receiver_id.into());
        self
    }

    /// Filter by sender role
    pub fn role(mut self, role: SenderRole) -> Self {
        self.sender_role = Some(role);
        self
    }

    /// Inclusive lower bound on `created_at`
    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    /// Exclusive upper bound on `created_at`
    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    /// Cap the number of returned messages
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set the sort order
    pub fn order(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }
}

const MESSAGE_COLUMNS: &str = "id, sender_id, receiver_id, sender_role, body, created_at";

/// Message repository for database operations
pub struct MessageRepository<'a> {
    db: &'a Database,
}

impl<'a> MessageRepository<'a> {
    /// Create a new message repository
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Store a new message
    ///
    /// Fails with `Error::Validation` if a required field is empty; a failed
    /// insert leaves the store unchanged.
    pub async fn insert(&self, message: &ChatMessage) -> Result<()> {
        message.validate()?;

        sqlx::query(
            r#"
            INSERT INTO chat_messages (id, sender_id, receiver_id, sender_role, body, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&message.id)
        .bind(&message.sender_id)
        .bind(&message.receiver_id)
        .bind(message.sender_role.as_str())
        .bind(&message.body)
        .bind(message.created_at)
        .execute(self.db.pool())
        .await?;

        Ok(())
    }

    /// Get a message by ID
    pub async fn get(&self, id: &str) -> Result<Option<ChatMessage>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM chat_messages WHERE id = ?",
            MESSAGE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(self.db.pool())
        .await?;

        row.map(row_to_message).transpose()
    }

    /// Retrieve messages matching the filter
    ///
    /// Returns a finite batch per query; sorted on `created_at` per the
    /// filter's order (newest first by default).
    pub async fn find(&self, filter: &MessageFilter) -> Result<Vec<ChatMessage>> {
        let mut sql = format!("SELECT {} FROM chat_messages WHERE 1=1", MESSAGE_COLUMNS);
        if filter.sender_id.is_some() {
            sql.push_str(" AND sender_id = ?");
        }
        if filter.receiver_id.is_some() {
            sql.push_str(" AND receiver_id = ?");
        }
        if filter.sender_role.is_some() {
            sql.push_str(" AND sender_role = ?");
        }
        if filter.since.is_some() {
            sql.push_str(" AND created_at >= ?");
        }
        if filter.until.is_some() {
            sql.push_str(" AND created_at < ?");
        }
        sql.push_str(" ORDER BY created_at ");
        sql.push_str(filter.order.as_sql());
        if filter.limit.is_some() {
            sql.push_str(" LIMIT ?");
        }

        let mut query = sqlx::query(&sql);
        if let Some(sender_id) = &filter.sender_id {
            query = query.bind(sender_id);
        }
        if let Some(receiver_id) = &filter.receiver_id {
            query = query.bind(receiver_id);
        }
        if let Some(role) = filter.sender_role {
            query = query.bind(role.as_str());
        }
        if let Some(since) = filter.since {
            query = query.bind(since);
        }
        if let Some(until) = filter.until {
            query = query.bind(until);
        }
        if let Some(limit) = filter.limit {
            query = query.bind(i64::from(limit));
        }

        let rows = query.fetch_all(self.db.pool()).await?;
        rows.into_iter().map(row_to_message).collect()
    }

    /// Retrieve the conversation between two users, newest first
    ///
    /// Matches messages in either direction.
    pub async fn history(&self, user: &str, peer: &str) -> Result<Vec<ChatMessage>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM chat_messages \
             WHERE (sender_id = ? AND receiver_id = ?) OR (sender_id = ? AND receiver_id = ?) \
             ORDER BY created_at DESC",
            MESSAGE_COLUMNS
        ))
        .bind(user)
        .bind(peer)
        .bind(peer)
        .bind(user)
        .fetch_all(self.db.pool())
        .await?;

        rows.into_iter().map(row_to_message).collect()
    }

    /// Count all stored messages
    pub async fn count(&self) -> Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM chat_messages")
            .fetch_one(self.db.pool())
            .await?;
        Ok(row.0)
    }
}

/// Convert a database row to a ChatMessage
fn row_to_message(row: sqlx::sqlite::SqliteRow) -> Result<ChatMessage> {
    let role: String = row.get("sender_role");
    let sender_role = SenderRole::parse(&role).ok_or_else(|| {
        Error::Validation(format!("unknown sender role '{}' in stored message", role))
    })?;

    Ok(ChatMessage {
        id: row.get("id"),
        sender_id: row.get("sender_id"),
        receiver_id: row.get("receiver_id"),
        sender_role,
        body: row.get("body"),
        created_at: row.get("created_at"),
    })
}
