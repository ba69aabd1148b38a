//! Public notice store
//!
//! Broadcast or role-targeted announcements. A notice is published once and
//! never updated; `target_role` scopes the audience, with `all` acting as a
//! wildcard.

use crate::error::Error;
use crate::storage::{Database, SortOrder};
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Row;
use uuid::Uuid;

/// Kind of public notice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Announcement,
    System,
}

impl NoticeKind {
    /// Convert to string for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            NoticeKind::Announcement => "announcement",
            NoticeKind::System => "system",
        }
    }

    /// Parse from database string
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "announcement" => Some(NoticeKind::Announcement),
            "system" => Some(NoticeKind::System),
            _ => None,
        }
    }
}

/// Audience a notice is scoped to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetRole {
    Student,
    Store,
    Admin,
    All,
}

impl TargetRole {
    /// Convert to string for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetRole::Student => "student",
            TargetRole::Store => "store",
            TargetRole::Admin => "admin",
            TargetRole::All => "all",
        }
    }

    /// Parse from database string
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "student" => Some(TargetRole::Student),
            "store" => Some(TargetRole::Store),
            "admin" => Some(TargetRole::Admin),
            "all" => Some(TargetRole::All),
            _ => None,
        }
    }
}

/// A public notice
///
/// Serialized field names follow the collection contract (`sender`,
/// `message`, `type`, `targetRole`, `createdAt`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicNotice {
    /// Unique notice identifier
    pub id: String,
    /// Identifier of the publishing user
    pub sender: String,
    /// Notice text
    #[serde(rename = "message")]
    pub body: String,
    /// Notice kind
    #[serde(rename = "type")]
    pub kind: NoticeKind,
    /// Audience the notice is scoped to
    pub target_role: TargetRole,
    /// When the notice was published
    pub created_at: DateTime<Utc>,
}

impl PublicNotice {
    /// Create a new notice with `created_at` set to the current time
    pub fn new(
        sender: impl Into<String>,
        kind: NoticeKind,
        target_role: TargetRole,
        body: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            sender: sender.into(),
            body: body.into(),
            kind,
            target_role,
            created_at: Utc::now(),
        }
    }

    /// Override the publication timestamp
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Check the required-field invariants
    ///
    /// `kind` and `target_role` cannot be invalid by construction; sender
    /// and body must be non-empty.
    pub fn validate(&self) -> Result<()> {
        if self.sender.trim().is_empty() {
            return Err(Error::Validation("sender must not be empty".to_string()));
        }
        if self.body.trim().is_empty() {
            return Err(Error::Validation("message must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Filter for notice retrieval
///
/// Time bounds follow the inclusive-start/exclusive-end convention:
/// `since <= created_at < until`.
#[derive(Debug, Clone, Default)]
pub struct NoticeFilter {
    /// Match the publishing user
    pub sender: Option<String>,
    /// Match the notice kind
    pub kind: Option<NoticeKind>,
    /// Match the target role exactly (no wildcard expansion; see
    /// [`NoticeRepository::visible_to`] for audience semantics)
    pub target_role: Option<TargetRole>,
    /// Inclusive lower bound on `created_at`
    pub since: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `created_at`
    pub until: Option<DateTime<Utc>>,
    /// Maximum number of notices to return
    pub limit: Option<u32>,
    /// Sort order on `created_at` (descending by default)
    pub order: SortOrder,
}

impl NoticeFilter {
    /// Create an empty filter (matches everything, newest first)
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter by publishing user
    pub fn sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self
    }

    /// Filter by notice kind
    pub fn kind(mut self, kind: NoticeKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Filter by exact target role
    pub fn target_role(mut self, target_role: TargetRole) -> Self {
        self.target_role = Some(target_role);
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

    /// Cap the number of returned notices
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

const NOTICE_COLUMNS: &str = "id, sender, body, kind, target_role, created_at";

/// Notice repository for database operations
pub struct NoticeRepository<'a> {
    db: &'a Database,
}

impl<'a> NoticeRepository<'a> {
    /// Create a new notice repository
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Store a new notice
    ///
    /// Fails with `Error::Validation` if a required field is empty; a failed
    /// insert leaves the store unchanged.
    pub async fn insert(&self, notice: &PublicNotice) -> Result<()> {
        notice.validate()?;

        sqlx::query(
            r#"
            INSERT INTO public_notices (id, sender, body, kind, target_role, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&notice.id)
        .bind(&notice.sender)
        .bind(&notice.body)
        .bind(notice.kind.as_str())
        .bind(notice.target_role.as_str())
        .bind(notice.created_at)
        .execute(self.db.pool())
        .await?;

        Ok(())
    }

    /// Get a notice by ID
    pub async fn get(&self, id: &str) -> Result<Option<PublicNotice>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM public_notices WHERE id = ?",
            NOTICE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(self.db.pool())
        .await?;

        row.map(row_to_notice).transpose()
    }

    /// Retrieve notices matching the filter
    pub async fn find(&self, filter: &NoticeFilter) -> Result<Vec<PublicNotice>> {
        let mut sql = format!("SELECT {} FROM public_notices WHERE 1=1", NOTICE_COLUMNS);
        if filter.sender.is_some() {
            sql.push_str(" AND sender = ?");
        }
        if filter.kind.is_some() {
            sql.push_str(" AND kind = ?");
        }
        if filter.target_role.is_some() {
            sql.push_str(" AND target_role = ?");
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
        if let Some(sender) = &filter.sender {
            query = query.bind(sender);
        }
        if let Some(kind) = filter.kind {
            query = query.bind(kind.as_str());
        }
        if let Some(target_role) = filter.target_role {
            query = query.bind(target_role.as_str());
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
        rows.into_iter().map(row_to_notice).collect()
    }

    /// Retrieve notices visible to a role, newest first
    ///
    /// Matches notices targeted at the role itself plus `all`-targeted
    /// broadcasts.
    pub async fn visible_to(&self, role: TargetRole) -> Result<Vec<PublicNotice>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM public_notices WHERE target_role IN (?, 'all') \
             ORDER BY created_at DESC",
            NOTICE_COLUMNS
        ))
        .bind(role.as_str())
        .fetch_all(self.db.pool())
        .await?;

        rows.into_iter().map(row_to_notice).collect()
    }

    /// Count all stored notices
    pub async fn count(&self) -> Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM public_notices")
            .fetch_one(self.db.pool())
            .await?;
        Ok(row.0)
    }
}

/// Convert a database row to a PublicNotice
fn row_to_notice(row: sqlx::sqlite::SqliteRow) -> Result<PublicNotice> {
    let kind: String = row.get("kind");
    let kind = NoticeKind::parse(&kind)
        .ok_or_else(|| Error::Validation(format!("unknown notice kind '{}' in stored notice", kind)))?;

    let target: String = row.get("target_role");
    let target_role = TargetRole::parse(&target)
        .ok_or_else(|| Error::Validation(format!("unknown target role '{}' in stored notice", target)))?;

    Ok(PublicNotice {
        id: row.get("id"),
        sender: row.get("sender"),
        body: row.get("body"),
        kind,
        target_role,
        created_at: row.get("created_at"),
    })
}
