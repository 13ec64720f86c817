//! Notification lifecycle shared by every action handler: create on action,
//! retract on undo, retype on request resolution. All pushes are
//! commit-then-notify: the row is durable before the socket is touched, and
//! a failed push is never compensated.

use anyhow::Result;
use chrono::Utc;
use tracing::debug;

use ripple_db::models::NewNotification;
use ripple_types::models::{Notification, NotificationKind};
use ripple_types::push::PushMessage;

use crate::auth::AppStateInner;

/// Persist a notification and push it to the recipient if they are online.
/// Actor == recipient is suppressed here, at creation, so no call site has
/// to remember the check.
pub async fn create(state: &AppStateInner, new: NewNotification) -> Result<()> {
    if new.notifying_user_id == new.notified_user_id {
        return Ok(());
    }

    let id = state.db.create_notification(&new)?;

    let notification = Notification {
        id,
        notified_user_id: new.notified_user_id,
        notifying_user_id: new.notifying_user_id,
        kind: new.kind,
        object_label: new.object_label,
        object_id: new.object_id,
        content: new.content,
        is_read: false,
        created_at: Utc::now(),
        notifying_avatar: new.notifying_avatar,
    };
    let recipient = notification.notified_user_id;
    let text = serde_json::to_string(&PushMessage::Notification(notification))?;
    state.registry.unicast(recipient, text).await;
    Ok(())
}

/// Undo the notification an earlier action created, matched by the full
/// composite key. Zero matches is a benign no-op. An unread match gets a
/// denotification push before the row is deleted; a read match is deleted
/// silently (the recipient already consumed it).
pub async fn retract(
    state: &AppStateInner,
    actor: i64,
    recipient: i64,
    kinds: &[NotificationKind],
    object_id: Option<i64>,
    object_label: Option<&str>,
) -> Result<()> {
    let Some(row) = state
        .db
        .find_notification(actor, recipient, kinds, object_id, object_label)?
    else {
        debug!("Nothing to retract for actor {} -> user {}", actor, recipient);
        return Ok(());
    };
    finish_retract(state, recipient, row.id, row.is_read).await
}

/// Retract variant for request resolutions where the recipient acts and the
/// original sender is not in the request payload (group invitations).
pub async fn retract_received(
    state: &AppStateInner,
    recipient: i64,
    kinds: &[NotificationKind],
    object_id: Option<i64>,
    object_label: Option<&str>,
) -> Result<()> {
    let Some(row) =
        state
            .db
            .find_notification_for_recipient(recipient, kinds, object_id, object_label)?
    else {
        return Ok(());
    };
    finish_retract(state, recipient, row.id, row.is_read).await
}

async fn finish_retract(
    state: &AppStateInner,
    recipient: i64,
    notification_id: i64,
    is_read: bool,
) -> Result<()> {
    if !is_read {
        let text = serde_json::to_string(&PushMessage::Denotification)?;
        state.registry.unicast(recipient, text).await;
    }
    state.db.delete_notification(notification_id)?;
    Ok(())
}

/// Rewrite a resolved request's kind in place (follow_request -> follow on
/// acceptance), leaving the read flag and content alone.
pub fn retype(
    state: &AppStateInner,
    actor: i64,
    recipient: i64,
    from: &[NotificationKind],
    to: NotificationKind,
) -> Result<()> {
    state.db.retype_notifications(actor, recipient, from, to)
}
