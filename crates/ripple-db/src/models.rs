//! Database row types — these map directly to SQLite rows.
//! Distinct from the ripple-types API models; conversions live here so the
//! lenient timestamp/kind parsing happens in one place.

use chrono::{DateTime, Utc};
use tracing::warn;

use ripple_types::models::{ChatMessage, Notification, UserItem};

pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar_url: Option<String>,
    pub about: Option<String>,
    pub is_private: bool,
    pub created_at: String,
}

impl UserRow {
    pub fn item(&self) -> UserItem {
        UserItem {
            id: self.id,
            username: self.username.clone(),
            avatar_url: self.avatar_url.clone(),
        }
    }
}

/// Parameters for a new notification row. The id and read flag are assigned
/// by the store (is_read always starts false).
pub struct NewNotification {
    pub notified_user_id: i64,
    pub notifying_user_id: i64,
    pub kind: ripple_types::models::NotificationKind,
    pub object_label: Option<String>,
    pub object_id: Option<i64>,
    pub content: String,
    pub notifying_avatar: Option<String>,
}

pub struct NotificationRow {
    pub id: i64,
    pub notified_user_id: i64,
    pub notifying_user_id: i64,
    pub kind: String,
    pub object_label: Option<String>,
    pub object_id: Option<i64>,
    pub content: String,
    pub is_read: bool,
    pub created_at: String,
    pub notifying_avatar: Option<String>,
}

impl NotificationRow {
    pub fn into_model(self) -> anyhow::Result<Notification> {
        Ok(Notification {
            id: self.id,
            notified_user_id: self.notified_user_id,
            notifying_user_id: self.notifying_user_id,
            kind: self.kind.parse()?,
            object_label: self.object_label,
            object_id: self.object_id,
            content: self.content,
            is_read: self.is_read,
            created_at: parse_timestamp(&self.created_at),
            notifying_avatar: self.notifying_avatar,
        })
    }
}

pub struct MessageRow {
    pub id: i64,
    pub sender_id: i64,
    pub receiver_id: Option<i64>,
    pub group_id: Option<i64>,
    pub content: String,
    pub created_at: String,
}

impl MessageRow {
    pub fn into_model(self) -> ChatMessage {
        ChatMessage {
            id: self.id,
            sender_id: self.sender_id,
            receiver_id: self.receiver_id,
            group_id: self.group_id,
            content: self.content,
            created_at: parse_timestamp(&self.created_at),
        }
    }
}

pub struct PostRow {
    pub id: i64,
    pub author_id: i64,
    pub author_username: String,
    pub group_id: Option<i64>,
    pub content: String,
    pub privacy: String,
    pub created_at: String,
}

pub struct CommentRow {
    pub id: i64,
    pub post_id: i64,
    pub author_id: i64,
    pub author_username: String,
    pub content: String,
    pub created_at: String,
}

pub struct GroupRow {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub creator_id: i64,
    pub created_at: String,
}

pub struct EventRow {
    pub id: i64,
    pub group_id: i64,
    pub creator_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub event_date: String,
    pub created_at: String,
}

/// Outcome of applying a reaction to a post or comment. The notification
/// lifecycle dispatches on this: Created notifies, Removed retracts, and a
/// value change leaves the existing notification untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionOutcome {
    Created,
    Updated,
    Removed,
}

/// Rows insert RFC 3339 timestamps, but `datetime('now')` defaults produce
/// \"YYYY-MM-DD HH:MM:SS\" without a timezone, so accept both.
pub fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}': {}", raw, e);
            DateTime::default()
        })
}

pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339()
}
