//! Mensa Core Library
//!
//! This crate provides the storage layer of the Mensa campus food-ordering
//! platform's messaging side:
//! - Chat messages (directed, timestamped, between two platform users)
//! - Public notices (broadcast or role-targeted announcements)
//! - Storage (SQLite connection pool + migrations)
//! - Configuration (TOML file + environment overrides)

pub mod chat;
pub mod config;
pub mod error;
pub mod notice;
pub mod storage;

pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::chat::{ChatMessage, MessageFilter, MessageRepository, SenderRole};
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::notice::{NoticeFilter, NoticeKind, NoticeRepository, PublicNotice, TargetRole};
    pub use crate::storage::{Database, DatabaseConfig, SortOrder};
}
