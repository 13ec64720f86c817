use serde::{Deserialize, Serialize};

use crate::models::{ChatMessage, Notification};

/// Wire envelope for every server-originated push: a JSON object
/// `{ "type": <string>, "payload": <any> }`. The denotification carries no
/// payload; it tells the client to retract the most recent matching item
/// and refetch if it needs specifics.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "lowercase")]
pub enum PushMessage {
    Notification(Notification),
    Denotification,
    Chat(ChatMessage),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NotificationKind;
    use chrono::Utc;

    #[test]
    fn envelope_tags_match_the_client_contract() {
        let n = Notification {
            id: 1,
            notified_user_id: 2,
            notifying_user_id: 3,
            kind: NotificationKind::Follow,
            object_label: None,
            object_id: None,
            content: "bob Started Following You.".into(),
            is_read: false,
            created_at: Utc::now(),
            notifying_avatar: None,
        };
        let value = serde_json::to_value(PushMessage::Notification(n)).unwrap();
        assert_eq!(value["type"], "notification");
        assert_eq!(value["payload"]["content"], "bob Started Following You.");

        let value = serde_json::to_value(PushMessage::Denotification).unwrap();
        assert_eq!(value["type"], "denotification");
        assert!(value.get("payload").is_none());
    }
}
