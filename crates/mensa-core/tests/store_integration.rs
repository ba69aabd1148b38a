//! Mensa Core Integration Tests

use chrono::{Duration, TimeZone, Utc};
use mensa_core::{
    chat::{ChatMessage, MessageFilter, MessageRepository, SenderRole},
    notice::{NoticeFilter, NoticeKind, NoticeRepository, PublicNotice, TargetRole},
    storage::{Database, DatabaseConfig},
    Error,
};

#[tokio::test]
async fn test_full_store_workflow() {
    let db = Database::in_memory().await.expect("Failed to open database");
    let messages = MessageRepository::new(&db);
    let notices = NoticeRepository::new(&db);

    // A student orders, the store replies
    let base = Utc.with_ymd_and_hms(2025, 12, 6, 11, 30, 0).unwrap();
    messages
        .insert(
            &ChatMessage::new("student-42", "store-7", SenderRole::Student, "one laksa please")
                .with_created_at(base),
        )
        .await
        .unwrap();
    messages
        .insert(
            &ChatMessage::new("store-7", "student-42", SenderRole::Store, "ready at 11:45")
                .with_created_at(base + Duration::minutes(2)),
        )
        .await
        .unwrap();

    // An admin publishes a campus-wide broadcast and a store-only notice
    notices
        .insert(&PublicNotice::new(
            "admin-1",
            NoticeKind::Announcement,
            TargetRole::All,
            "food court closes early today",
        ))
        .await
        .unwrap();
    notices
        .insert(&PublicNotice::new(
            "admin-1",
            NoticeKind::System,
            TargetRole::Store,
            "settlement reports delayed",
        ))
        .await
        .unwrap();

    // Conversation retrieval, newest first
    let convo = messages.history("student-42", "store-7").await.unwrap();
    assert_eq!(convo.len(), 2);
    assert_eq!(convo[0].body, "ready at 11:45");

    // Day-range query over messages
    let today = messages
        .find(
            &MessageFilter::new()
                .since(Utc.with_ymd_and_hms(2025, 12, 6, 0, 0, 0).unwrap())
                .until(Utc.with_ymd_and_hms(2025, 12, 7, 0, 0, 0).unwrap()),
        )
        .await
        .unwrap();
    assert_eq!(today.len(), 2);

    // Students see the broadcast but not the store-only notice
    let student_view = notices.visible_to(TargetRole::Student).await.unwrap();
    assert_eq!(student_view.len(), 1);
    assert_eq!(student_view[0].body, "food court closes early today");

    let store_view = notices.visible_to(TargetRole::Store).await.unwrap();
    assert_eq!(store_view.len(), 2);

    // Exact-role filtering ignores the wildcard
    let store_only = notices
        .find(&NoticeFilter::new().target_role(TargetRole::Store))
        .await
        .unwrap();
    assert_eq!(store_only.len(), 1);
}

#[tokio::test]
async fn test_validation_failures_leave_both_stores_unchanged() {
    let db = Database::in_memory().await.expect("Failed to open database");
    let messages = MessageRepository::new(&db);
    let notices = NoticeRepository::new(&db);

    let err = messages
        .insert(&ChatMessage::new("", "store-7", SenderRole::Student, "hi"))
        .await
        .expect_err("empty sender must be rejected");
    assert!(matches!(err, Error::Validation(_)));

    let err = notices
        .insert(&PublicNotice::new("", NoticeKind::System, TargetRole::All, "hi"))
        .await
        .expect_err("empty sender must be rejected");
    assert!(matches!(err, Error::Validation(_)));

    assert_eq!(messages.count().await.unwrap(), 0);
    assert_eq!(notices.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_on_disk_database_persists_across_reopen() {
    let dir = tempfile::TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("mensa.db");

    let msg = ChatMessage::new("student-1", "store-1", SenderRole::Student, "see you at noon");
    {
        let db = Database::new(DatabaseConfig::with_path(&path))
            .await
            .expect("Failed to open database");
        MessageRepository::new(&db).insert(&msg).await.unwrap();
        db.close().await;
    }

    let db = Database::new(DatabaseConfig::with_path(&path))
        .await
        .expect("Failed to reopen database");
    let stored = MessageRepository::new(&db)
        .get(&msg.id)
        .await
        .unwrap()
        .expect("Message should survive reopen");
    assert_eq!(stored, msg);
}
