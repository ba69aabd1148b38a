//! Mensa CLI - chat message and public notice store for the campus
//! food-ordering platform

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use mensa_core::chat::{ChatMessage, MessageFilter, MessageRepository, SenderRole};
use mensa_core::config::Config;
use mensa_core::notice::{NoticeFilter, NoticeKind, NoticeRepository, PublicNotice, TargetRole};
use mensa_core::storage::Database;
use tracing::error;

#[derive(Parser)]
#[command(name = "mensa")]
#[command(author, version, about = "Chat message and public notice store", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum RoleArg {
    Student,
    Store,
    Admin,
}

impl From<RoleArg> for SenderRole {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Student => SenderRole::Student,
            RoleArg::Store => SenderRole::Store,
            RoleArg::Admin => SenderRole::Admin,
        }
    }
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum KindArg {
    Announcement,
    System,
}

impl From<KindArg> for NoticeKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Announcement => NoticeKind::Announcement,
            KindArg::System => NoticeKind::System,
        }
    }
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum TargetArg {
    Student,
    Store,
    Admin,
    All,
}

impl From<TargetArg> for TargetRole {
    fn from(target: TargetArg) -> Self {
        match target {
            TargetArg::Student => TargetRole::Student,
            TargetArg::Store => TargetRole::Store,
            TargetArg::Admin => TargetRole::Admin,
            TargetArg::All => TargetRole::All,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Send a chat message
    Send {
        /// Sending user ID
        sender: String,
        /// Receiving user ID
        receiver: String,
        /// Message text
        message: String,
        /// Role of the sender
        #[arg(short, long, value_enum, default_value = "student")]
        role: RoleArg,
    },

    /// Show the conversation between two users, newest first
    History {
        /// First user ID
        user: String,
        /// Second user ID
        peer: String,
    },

    /// List messages addressed to a user
    Inbox {
        /// Receiving user ID
        user: String,
        /// Only messages at or after this RFC 3339 timestamp
        #[arg(long)]
        since: Option<String>,
        /// Only messages before this RFC 3339 timestamp
        #[arg(long)]
        until: Option<String>,
        /// Maximum number of messages
        #[arg(short, long)]
        limit: Option<u32>,
    },

    /// Publish a public notice
    Publish {
        /// Publishing user ID
        sender: String,
        /// Notice text
        message: String,
        /// Notice kind
        #[arg(short, long, value_enum, default_value = "announcement")]
        kind: KindArg,
        /// Audience the notice is scoped to
        #[arg(short, long, value_enum, default_value = "all")]
        target: TargetArg,
    },

    /// List public notices, newest first
    Notices {
        /// Show only notices visible to this role (includes `all` broadcasts)
        #[arg(long, value_enum)]
        visible_to: Option<TargetArg>,
        /// Only notices at or after this RFC 3339 timestamp
        #[arg(long)]
        since: Option<String>,
        /// Only notices before this RFC 3339 timestamp
        #[arg(long)]
        until: Option<String>,
        /// Maximum number of notices
        #[arg(short, long)]
        limit: Option<u32>,
    },

    /// Run a health check against the store
    Doctor,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mensa_core=info".parse()?)
                .add_directive("mensa_cli=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    let config = Config::load()?;
    let db = match Database::new(config.database_config()).await {
        Ok(db) => db,
        Err(err) => {
            // Startup connection failure is fatal: log the diagnostic and
            // terminate with a non-zero exit code.
            error!("Failed to connect to the message store: {:#}", err);
            std::process::exit(1);
        }
    };

    match cli.command {
        Commands::Send {
            sender,
            receiver,
            message,
            role,
        } => cmd_send(&db, sender, receiver, role, message, cli.format, cli.quiet).await,

        Commands::History { user, peer } => cmd_history(&db, &user, &peer, cli.format).await,

        Commands::Inbox {
            user,
            since,
            until,
            limit,
        } => cmd_inbox(&db, &user, since, until, limit, cli.format).await,

        Commands::Publish {
            sender,
            message,
            kind,
            target,
        } => cmd_publish(&db, sender, kind, target, message, cli.format, cli.quiet).await,

        Commands::Notices {
            visible_to,
            since,
            until,
            limit,
        } => cmd_notices(&db, visible_to, since, until, limit, cli.format).await,

        Commands::Doctor => cmd_doctor(&db, cli.quiet).await,
    }
}

async fn cmd_send(
    db: &Database,
    sender: String,
    receiver: String,
    role: RoleArg,
    message: String,
    format: OutputFormat,
    quiet: bool,
) -> anyhow::Result<()> {
    let msg = ChatMessage::new(sender, receiver, role.into(), message);
    MessageRepository::new(db).insert(&msg).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&msg)?),
        OutputFormat::Text => {
            if !quiet {
                println!("sent {}", msg.id);
            }
        }
    }
    Ok(())
}

async fn cmd_history(
    db: &Database,
    user: &str,
    peer: &str,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let messages = MessageRepository::new(db).history(user, peer).await?;
    print_messages(&messages, format)
}

async fn cmd_inbox(
    db: &Database,
    user: &str,
    since: Option<String>,
    until: Option<String>,
    limit: Option<u32>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let mut filter = MessageFilter::new().receiver(user);
    if let Some(since) = since {
        filter = filter.since(parse_timestamp(&since)?);
    }
    if let Some(until) = until {
        filter = filter.until(parse_timestamp(&until)?);
    }
    if let Some(limit) = limit {
        filter = filter.limit(limit);
    }

    let messages = MessageRepository::new(db).find(&filter).await?;
    print_messages(&messages, format)
}

async fn cmd_publish(
    db: &Database,
    sender: String,
    kind: KindArg,
    target: TargetArg,
    message: String,
    format: OutputFormat,
    quiet: bool,
) -> anyhow::Result<()> {
    let notice = PublicNotice::new(sender, kind.into(), target.into(), message);
    NoticeRepository::new(db).insert(&notice).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&notice)?),
        OutputFormat::Text => {
            if !quiet {
                println!("published {}", notice.id);
            }
        }
    }
    Ok(())
}

async fn cmd_notices(
    db: &Database,
    visible_to: Option<TargetArg>,
    since: Option<String>,
    until: Option<String>,
    limit: Option<u32>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let repo = NoticeRepository::new(db);

    let notices = if let Some(role) = visible_to {
        let mut notices = repo.visible_to(role.into()).await?;
        if let Some(since) = since {
            let since = parse_timestamp(&since)?;
            notices.retain(|n| n.created_at >= since);
        }
        if let Some(until) = until {
            let until = parse_timestamp(&until)?;
            notices.retain(|n| n.created_at < until);
        }
        if let Some(limit) = limit {
            notices.truncate(limit as usize);
        }
        notices
    } else {
        let mut filter = NoticeFilter::new();
        if let Some(since) = since {
            filter = filter.since(parse_timestamp(&since)?);
        }
        if let Some(until) = until {
            filter = filter.until(parse_timestamp(&until)?);
        }
        if let Some(limit) = limit {
            filter = filter.limit(limit);
        }
        repo.find(&filter).await?
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&notices)?),
        OutputFormat::Text => {
            for notice in &notices {
                println!(
                    "{} [{}/{}] {}: {}",
                    notice.created_at.to_rfc3339(),
                    notice.kind.as_str(),
                    notice.target_role.as_str(),
                    notice.sender,
                    notice.body
                );
            }
        }
    }
    Ok(())
}

async fn cmd_doctor(db: &Database, quiet: bool) -> anyhow::Result<()> {
    db.health_check().await?;
    let status = db.migration_status().await?;

    if !quiet {
        println!("store: ok ({})", db.path().display());
        println!(
            "schema: v{} (target v{}){}",
            status.current_version,
            status.target_version,
            if status.needs_migration {
                " - migration needed"
            } else {
                ""
            }
        );
    }
    Ok(())
}

fn print_messages(messages: &[ChatMessage], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(messages)?),
        OutputFormat::Text => {
            for msg in messages {
                println!(
                    "{} {} -> {} [{}]: {}",
                    msg.created_at.to_rfc3339(),
                    msg.sender_id,
                    msg.receiver_id,
                    msg.sender_role.as_str(),
                    msg.body
                );
            }
        }
    }
    Ok(())
}

fn parse_timestamp(s: &str) -> anyhow::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| {
            format!(
                "Invalid timestamp '{}', expected RFC 3339 (e.g. 2025-12-06T00:00:00Z)",
                s
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_timestamp() {
        let ts = parse_timestamp("2025-12-06T00:00:00Z").unwrap();
        assert_eq!(ts.to_rfc3339(), "2025-12-06T00:00:00+00:00");

        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn test_role_arg_conversion() {
        assert_eq!(SenderRole::from(RoleArg::Store), SenderRole::Store);
        assert_eq!(TargetRole::from(TargetArg::All), TargetRole::All);
        assert_eq!(NoticeKind::from(KindArg::System), NoticeKind::System);
    }
}
