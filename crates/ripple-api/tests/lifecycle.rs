use ripple_api::auth::AppStateInner;
use ripple_api::notify;
use ripple_db::Database;
use ripple_db::models::NewNotification;
use ripple_gateway::Registry;
use ripple_types::models::NotificationKind;

fn state_with_users() -> (AppStateInner, i64, i64) {
    let db = Database::open_in_memory().unwrap();
    let alice = db
        .create_user("alice", "alice@example.com", "hash", None, None, None, false)
        .unwrap();
    let bob = db
        .create_user("bob", "bob@example.com", "hash", None, None, None, true)
        .unwrap();
    (
        AppStateInner {
            db,
            registry: Registry::new(),
        },
        alice,
        bob,
    )
}

fn follow_request(actor: i64, recipient: i64) -> NewNotification {
    NewNotification {
        notified_user_id: recipient,
        notifying_user_id: actor,
        kind: NotificationKind::FollowRequest,
        object_label: Some("alice".into()),
        object_id: Some(actor),
        content: "alice sent you a follow request.".into(),
        notifying_avatar: None,
    }
}

#[tokio::test]
async fn follow_request_then_cancel_pushes_create_and_denotification() {
    let (state, alice, bob) = state_with_users();
    let (_, mut rx) = state.registry.register(bob).await;

    notify::create(&state, follow_request(alice, bob)).await.unwrap();

    let frame: serde_json::Value =
        serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
    assert_eq!(frame["type"], "notification");
    assert_eq!(frame["payload"]["type"], "follow_request");
    assert_eq!(frame["payload"]["notifiedUserId"], bob);
    assert_eq!(frame["payload"]["isRead"], false);
    assert_eq!(state.db.unread_notification_count(bob).unwrap(), 1);

    // Cancel before bob responds: the badge must roll back in real time
    notify::retract(
        &state,
        alice,
        bob,
        NotificationKind::FOLLOW_FAMILY,
        Some(alice),
        Some("alice"),
    )
    .await
    .unwrap();

    let frame: serde_json::Value =
        serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
    assert_eq!(frame["type"], "denotification");
    assert!(frame.get("payload").is_none());
    assert_eq!(state.db.unread_notification_count(bob).unwrap(), 0);
    assert!(state.db.notifications_for(bob).unwrap().is_empty());
}

#[tokio::test]
async fn self_notification_is_suppressed_at_creation() {
    let (state, alice, _) = state_with_users();
    let (_, mut rx) = state.registry.register(alice).await;

    notify::create(&state, follow_request(alice, alice)).await.unwrap();

    assert!(rx.try_recv().is_err());
    assert_eq!(state.db.unread_notification_count(alice).unwrap(), 0);
}

#[tokio::test]
async fn retract_after_read_deletes_without_denotification() {
    let (state, alice, bob) = state_with_users();

    notify::create(&state, follow_request(alice, bob)).await.unwrap();
    state.db.mark_all_notifications_read(bob).unwrap();

    // Register only now so any pushed frame would be observable
    let (_, mut rx) = state.registry.register(bob).await;
    notify::retract(
        &state,
        alice,
        bob,
        NotificationKind::FOLLOW_FAMILY,
        Some(alice),
        Some("alice"),
    )
    .await
    .unwrap();

    assert!(rx.try_recv().is_err());
    assert!(state.db.notifications_for(bob).unwrap().is_empty());
}

#[tokio::test]
async fn retract_with_no_match_is_a_benign_no_op() {
    let (state, alice, bob) = state_with_users();

    notify::retract(
        &state,
        alice,
        bob,
        &[NotificationKind::Reaction],
        Some(99),
        Some("post"),
    )
    .await
    .unwrap();

    assert_eq!(state.db.unread_notification_count(bob).unwrap(), 0);
}

#[tokio::test]
async fn offline_recipient_still_gets_the_row() {
    let (state, alice, bob) = state_with_users();

    // No registry entry for bob: the push is skipped, the row is durable
    notify::create(&state, follow_request(alice, bob)).await.unwrap();

    assert_eq!(state.db.unread_notification_count(bob).unwrap(), 1);
    assert!(!state.registry.is_connected(bob).await);
}

#[tokio::test]
async fn unread_count_survives_create_retract_mark_read_interleaving() {
    let (state, alice, bob) = state_with_users();
    let carol = state
        .db
        .create_user("carol", "carol@example.com", "hash", None, None, None, false)
        .unwrap();

    notify::create(&state, follow_request(alice, bob)).await.unwrap();
    notify::create(
        &state,
        NewNotification {
            notified_user_id: bob,
            notifying_user_id: carol,
            kind: NotificationKind::Follow,
            object_label: Some("carol".into()),
            object_id: Some(carol),
            content: "carol Started Following You.".into(),
            notifying_avatar: None,
        },
    )
    .await
    .unwrap();
    assert_eq!(state.db.unread_notification_count(bob).unwrap(), 2);

    notify::retract(
        &state,
        alice,
        bob,
        NotificationKind::FOLLOW_FAMILY,
        Some(alice),
        Some("alice"),
    )
    .await
    .unwrap();
    assert_eq!(state.db.unread_notification_count(bob).unwrap(), 1);

    state.db.mark_all_notifications_read(bob).unwrap();
    assert_eq!(state.db.unread_notification_count(bob).unwrap(), 0);

    // Retracting the already-read remainder never drives the count below
    // zero
    notify::retract(
        &state,
        carol,
        bob,
        NotificationKind::FOLLOW_FAMILY,
        Some(carol),
        Some("carol"),
    )
    .await
    .unwrap();
    assert_eq!(state.db.unread_notification_count(bob).unwrap(), 0);
}

#[tokio::test]
async fn accepting_a_follow_request_retypes_the_notification() {
    let (state, alice, bob) = state_with_users();

    notify::create(&state, follow_request(alice, bob)).await.unwrap();
    notify::retype(
        &state,
        alice,
        bob,
        &[NotificationKind::FollowRequest],
        NotificationKind::Follow,
    )
    .unwrap();

    let rows = state.db.notifications_for(bob).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].kind, "follow");

    // Unfollow after acceptance must still find the retyped row
    notify::retract(
        &state,
        alice,
        bob,
        NotificationKind::FOLLOW_FAMILY,
        Some(alice),
        Some("alice"),
    )
    .await
    .unwrap();
    assert!(state.db.notifications_for(bob).unwrap().is_empty());
}
