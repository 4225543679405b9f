//! Subscription upsert tests against a real PostgreSQL instance.
//!
//! Ignored by default; run with:
//! `cargo test -p farmvisit-db -- --ignored`

use chrono::Utc;
use sea_orm::Set;

use farmvisit_common::new_id;
use farmvisit_db::entities::{push_subscription, user};
use farmvisit_db::repositories::{PushSubscriptionRepository, UserRepository};
use farmvisit_db::test_utils::TestDatabase;

fn subscription_active_model(
    id: &str,
    user_id: &str,
    device_id: &str,
    endpoint: &str,
) -> push_subscription::ActiveModel {
    push_subscription::ActiveModel {
        id: Set(id.to_string()),
        user_id: Set(user_id.to_string()),
        device_id: Set(device_id.to_string()),
        farm_id: Set(None),
        endpoint: Set(endpoint.to_string()),
        p256dh: Set("BPubKeyMaterial".to_string()),
        auth: Set("AuthSecret".to_string()),
        user_agent: Set(Some("Mozilla/5.0".to_string())),
        is_active: Set(true),
        consecutive_failure_count: Set(0),
        last_validated_at: Set(Some(Utc::now().into())),
        created_at: Set(Utc::now().into()),
        updated_at: Set(None),
    }
}

async fn seed_user(repo: &UserRepository, id: &str) {
    let now = Utc::now();
    repo.create(user::ActiveModel {
        id: Set(id.to_string()),
        username: Set(format!("farmer_{id}")),
        username_lower: Set(format!("farmer_{id}")),
        token: Set(Some(format!("token_{id}"))),
        name: Set(None),
        email: Set(None),
        is_admin: Set(false),
        is_suspended: Set(false),
        created_at: Set(now.into()),
        updated_at: Set(None),
    })
    .await
    .expect("seed user");
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL instance"]
async fn upsert_same_device_never_duplicates() {
    let test_db = TestDatabase::create_unique().await.expect("test database");
    farmvisit_db::migrate(test_db.connection().as_ref())
        .await
        .expect("migrations");

    let db = test_db.connection();
    let users = UserRepository::new(db.clone());
    let subscriptions = PushSubscriptionRepository::new(db);

    seed_user(&users, "user1").await;

    // First subscribe inserts
    let first = subscriptions
        .upsert(subscription_active_model(
            &new_id(),
            "user1",
            "Chrome_Windows_desktop",
            "https://push.example.com/send/e1",
        ))
        .await
        .expect("first upsert");
    assert!(first.updated_at.is_none(), "insert leaves updated_at NULL");

    // Resubscribe from the same device with a rotated endpoint updates in place
    let second = subscriptions
        .upsert(subscription_active_model(
            &new_id(),
            "user1",
            "Chrome_Windows_desktop",
            "https://push.example.com/send/e2",
        ))
        .await
        .expect("second upsert");
    assert!(second.updated_at.is_some(), "update sets updated_at");
    assert_eq!(second.id, first.id, "row is updated, not replaced");
    assert_eq!(second.endpoint, "https://push.example.com/send/e2");

    let count = subscriptions.count_by_user("user1").await.expect("count");
    assert_eq!(count, 1, "one row per (user, device)");

    // A different device gets its own row
    subscriptions
        .upsert(subscription_active_model(
            &new_id(),
            "user1",
            "Safari_iOS_mobile",
            "https://push.example.com/send/e3",
        ))
        .await
        .expect("second device upsert");
    let count = subscriptions.count_by_user("user1").await.expect("count");
    assert_eq!(count, 2);

    // Hard delete by endpoint; a second call finds nothing
    let removed = subscriptions
        .delete_by_endpoint("user1", "https://push.example.com/send/e2")
        .await
        .expect("delete");
    assert_eq!(removed, 1);
    let removed = subscriptions
        .delete_by_endpoint("user1", "https://push.example.com/send/e2")
        .await
        .expect("repeat delete");
    assert_eq!(removed, 0);

    test_db.drop_database().await.expect("drop test database");
}
