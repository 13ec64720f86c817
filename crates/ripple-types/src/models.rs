use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Closed set of notification kinds. Dispatch and retract-matching switch
/// exhaustively over this enum; the string tag only exists at the storage
/// and wire boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Follow,
    FollowRequest,
    GroupInvitation,
    GroupJoinRequest,
    Comment,
    Reaction,
    Post,
    EventCreation,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Follow => "follow",
            Self::FollowRequest => "follow_request",
            Self::GroupInvitation => "group_invitation",
            Self::GroupJoinRequest => "group_join_request",
            Self::Comment => "comment",
            Self::Reaction => "reaction",
            Self::Post => "post",
            Self::EventCreation => "event_creation",
        }
    }

    /// Kinds a follow may have been recorded under: a pending request is
    /// retyped to `follow` on acceptance, so unfollow must match both.
    pub const FOLLOW_FAMILY: &[NotificationKind] = &[Self::Follow, Self::FollowRequest];
}

impl FromStr for NotificationKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "follow" => Ok(Self::Follow),
            "follow_request" => Ok(Self::FollowRequest),
            "group_invitation" => Ok(Self::GroupInvitation),
            "group_join_request" => Ok(Self::GroupJoinRequest),
            "comment" => Ok(Self::Comment),
            "reaction" => Ok(Self::Reaction),
            "post" => Ok(Self::Post),
            "event_creation" => Ok(Self::EventCreation),
            other => Err(UnknownKind(other.to_string())),
        }
    }
}

#[derive(Debug)]
pub struct UnknownKind(pub String);

impl fmt::Display for UnknownKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown notification kind '{}'", self.0)
    }
}

impl std::error::Error for UnknownKind {}

/// Persisted record of a cross-user event requiring the recipient's
/// attention. This is the full record pushed over the wire, so the JSON
/// field names are part of the client contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: i64,
    pub notified_user_id: i64,
    pub notifying_user_id: i64,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    #[serde(rename = "object")]
    pub object_label: Option<String>,
    pub object_id: Option<i64>,
    pub content: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    #[serde(rename = "notifyingImage")]
    pub notifying_avatar: Option<String>,
}

/// A chat message, direct (receiver_id set) or group (group_id set).
/// Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: i64,
    pub sender_id: i64,
    pub receiver_id: Option<i64>,
    pub group_id: Option<i64>,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Compact user representation embedded in list and chat responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserItem {
    pub id: i64,
    pub username: String,
    pub avatar_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_its_tag() {
        for kind in [
            NotificationKind::Follow,
            NotificationKind::FollowRequest,
            NotificationKind::GroupInvitation,
            NotificationKind::GroupJoinRequest,
            NotificationKind::Comment,
            NotificationKind::Reaction,
            NotificationKind::Post,
            NotificationKind::EventCreation,
        ] {
            assert_eq!(kind.as_str().parse::<NotificationKind>().unwrap(), kind);
        }
        assert!("group".parse::<NotificationKind>().is_err());
    }

    #[test]
    fn notification_serializes_with_client_field_names() {
        let n = Notification {
            id: 7,
            notified_user_id: 2,
            notifying_user_id: 1,
            kind: NotificationKind::FollowRequest,
            object_label: Some("alice".into()),
            object_id: Some(1),
            content: "alice sent you a follow request.".into(),
            is_read: false,
            created_at: Utc::now(),
            notifying_avatar: None,
        };
        let value = serde_json::to_value(&n).unwrap();
        assert_eq!(value["type"], "follow_request");
        assert_eq!(value["notifiedUserId"], 2);
        assert_eq!(value["object"], "alice");
        assert_eq!(value["isRead"], false);
    }
}
