use ripple_api::auth::AppStateInner;
use ripple_api::chat::{fan_out_direct, fan_out_group};
use ripple_db::Database;
use ripple_gateway::Registry;

fn state_with_users() -> (AppStateInner, i64, i64, i64) {
    let db = Database::open_in_memory().unwrap();
    let alice = db
        .create_user("alice", "alice@example.com", "hash", None, None, None, false)
        .unwrap();
    let bob = db
        .create_user("bob", "bob@example.com", "hash", None, None, None, false)
        .unwrap();
    let carol = db
        .create_user("carol", "carol@example.com", "hash", None, None, None, false)
        .unwrap();
    (
        AppStateInner {
            db,
            registry: Registry::new(),
        },
        alice,
        bob,
        carol,
    )
}

#[tokio::test]
async fn direct_fan_out_echoes_sender_and_marks_only_the_receiver() {
    let (state, alice, bob, _) = state_with_users();
    let (_, mut alice_rx) = state.registry.register(alice).await;
    let (_, mut bob_rx) = state.registry.register(bob).await;

    let message = state
        .db
        .insert_message(alice, Some(bob), None, "hey")
        .unwrap()
        .into_model();
    fan_out_direct(&state, &message).await.unwrap();

    for rx in [&mut alice_rx, &mut bob_rx] {
        let frame: serde_json::Value =
            serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(frame["type"], "chat");
        assert_eq!(frame["payload"]["senderId"], alice);
        assert_eq!(frame["payload"]["content"], "hey");
    }

    assert_eq!(state.db.unread_direct_markers(bob, alice).unwrap(), 1);
    assert_eq!(state.db.unread_direct_markers(alice, bob).unwrap(), 0);
}

#[tokio::test]
async fn group_fan_out_pushes_to_all_but_marks_only_non_senders() {
    let (state, alice, bob, carol) = state_with_users();
    let group = state.db.create_group("climbers", None, alice).unwrap();
    state.db.set_member_status(group, bob, "accepted").unwrap();
    state.db.set_member_status(group, carol, "accepted").unwrap();

    let (_, mut alice_rx) = state.registry.register(alice).await;
    let (_, mut bob_rx) = state.registry.register(bob).await;
    let (_, mut carol_rx) = state.registry.register(carol).await;

    let message = state
        .db
        .insert_message(alice, None, Some(group), "route at 9?")
        .unwrap()
        .into_model();
    let members = state.db.accepted_member_ids(group).unwrap();
    fan_out_group(&state, &message, &members).await.unwrap();

    // Everyone gets the push, sender included
    for rx in [&mut alice_rx, &mut bob_rx, &mut carol_rx] {
        let frame: serde_json::Value =
            serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(frame["type"], "chat");
        assert_eq!(frame["payload"]["groupId"], group);
    }

    // Unread markers for everyone except the sender
    assert_eq!(state.db.unread_group_markers(alice, group).unwrap(), 0);
    assert_eq!(state.db.unread_group_markers(bob, group).unwrap(), 1);
    assert_eq!(state.db.unread_group_markers(carol, group).unwrap(), 1);
}

#[tokio::test]
async fn offline_receiver_still_gets_message_and_marker() {
    let (state, alice, bob, _) = state_with_users();
    // Nobody is connected

    let message = state
        .db
        .insert_message(alice, Some(bob), None, "see you there")
        .unwrap()
        .into_model();
    fan_out_direct(&state, &message).await.unwrap();

    assert_eq!(state.db.direct_history(alice, bob).unwrap().len(), 1);
    assert_eq!(state.db.unread_direct_markers(bob, alice).unwrap(), 1);
}

#[tokio::test]
async fn opening_the_thread_clears_markers_without_touching_history() {
    let (state, alice, bob, _) = state_with_users();

    for text in ["one", "two", "three"] {
        let message = state
            .db
            .insert_message(alice, Some(bob), None, text)
            .unwrap()
            .into_model();
        fan_out_direct(&state, &message).await.unwrap();
    }
    assert_eq!(state.db.unread_direct_markers(bob, alice).unwrap(), 3);

    state.db.delete_direct_markers(bob, alice).unwrap();
    assert_eq!(state.db.unread_direct_markers(bob, alice).unwrap(), 0);
    assert_eq!(state.db.direct_history(alice, bob).unwrap().len(), 3);
}
