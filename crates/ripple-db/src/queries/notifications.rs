use anyhow::Result;
use rusqlite::types::ToSql;

use crate::models::{NewNotification, NotificationRow};
use crate::{Database, OptionalExt};
use ripple_types::models::NotificationKind;

const NOTIFICATION_COLUMNS: &str = "id, notified_user_id, notifying_user_id, kind, object_label, \
     object_id, content, is_read, created_at, notifying_avatar";

impl Database {
    /// Persists a new notification with is_read = false and returns its id.
    /// Self-notification suppression happens in the lifecycle layer, never
    /// here — the store accepts whatever it is given.
    pub fn create_notification(&self, n: &NewNotification) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO notifications
                     (notified_user_id, notifying_user_id, kind, object_label, object_id,
                      content, is_read, created_at, notifying_avatar)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7, ?8)",
                rusqlite::params![
                    n.notified_user_id,
                    n.notifying_user_id,
                    n.kind.as_str(),
                    n.object_label,
                    n.object_id,
                    n.content,
                    crate::models::now_timestamp(),
                    n.notifying_avatar,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Deterministic retract lookup by the composite key
    /// (actor, recipient, kind family, object id, object label).
    pub fn find_notification(
        &self,
        notifying_user_id: i64,
        notified_user_id: i64,
        kinds: &[NotificationKind],
        object_id: Option<i64>,
        object_label: Option<&str>,
    ) -> Result<Option<NotificationRow>> {
        self.with_conn(|conn| {
            let placeholders: Vec<String> =
                (3..3 + kinds.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT {NOTIFICATION_COLUMNS} FROM notifications
                 WHERE notifying_user_id = ?1 AND notified_user_id = ?2
                   AND kind IN ({})
                   AND object_id IS ?{} AND object_label IS ?{}
                 LIMIT 1",
                placeholders.join(", "),
                3 + kinds.len(),
                4 + kinds.len(),
            );

            let kind_tags: Vec<&str> = kinds.iter().map(|k| k.as_str()).collect();
            let mut params: Vec<&dyn ToSql> = vec![&notifying_user_id, &notified_user_id];
            for tag in &kind_tags {
                params.push(tag);
            }
            params.push(&object_id);
            params.push(&object_label);

            let mut stmt = conn.prepare(&sql)?;
            let row = stmt.query_row(params.as_slice(), map_notification).optional()?;
            Ok(row)
        })
    }

    /// Same composite lookup without the actor: used when the recipient
    /// resolves a request whose sender is not part of the request payload
    /// (e.g. answering a group invitation).
    pub fn find_notification_for_recipient(
        &self,
        notified_user_id: i64,
        kinds: &[NotificationKind],
        object_id: Option<i64>,
        object_label: Option<&str>,
    ) -> Result<Option<NotificationRow>> {
        self.with_conn(|conn| {
            let placeholders: Vec<String> =
                (2..2 + kinds.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT {NOTIFICATION_COLUMNS} FROM notifications
                 WHERE notified_user_id = ?1
                   AND kind IN ({})
                   AND object_id IS ?{} AND object_label IS ?{}
                 LIMIT 1",
                placeholders.join(", "),
                2 + kinds.len(),
                3 + kinds.len(),
            );

            let kind_tags: Vec<&str> = kinds.iter().map(|k| k.as_str()).collect();
            let mut params: Vec<&dyn ToSql> = vec![&notified_user_id];
            for tag in &kind_tags {
                params.push(tag);
            }
            params.push(&object_id);
            params.push(&object_label);

            let mut stmt = conn.prepare(&sql)?;
            let row = stmt.query_row(params.as_slice(), map_notification).optional()?;
            Ok(row)
        })
    }

    pub fn delete_notification(&self, id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM notifications WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    /// Bulk kind rewrite used when a request is resolved, e.g. a pending
    /// follow_request becomes a plain follow once accepted.
    pub fn retype_notifications(
        &self,
        notifying_user_id: i64,
        notified_user_id: i64,
        from: &[NotificationKind],
        to: NotificationKind,
    ) -> Result<()> {
        self.with_conn(|conn| {
            let placeholders: Vec<String> =
                (4..4 + from.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "UPDATE notifications SET kind = ?1
                 WHERE notified_user_id = ?2 AND notifying_user_id = ?3 AND kind IN ({})",
                placeholders.join(", ")
            );

            let to_tag = to.as_str();
            let from_tags: Vec<&str> = from.iter().map(|k| k.as_str()).collect();
            let mut params: Vec<&dyn ToSql> =
                vec![&to_tag, &notified_user_id, &notifying_user_id];
            for tag in &from_tags {
                params.push(tag);
            }

            conn.execute(&sql, params.as_slice())?;
            Ok(())
        })
    }

    pub fn mark_all_notifications_read(&self, user_id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE notifications SET is_read = 1 WHERE notified_user_id = ?1",
                [user_id],
            )?;
            Ok(())
        })
    }

    /// Derived, never stored.
    pub fn unread_notification_count(&self, user_id: i64) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM notifications WHERE notified_user_id = ?1 AND is_read = 0",
                [user_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    pub fn notifications_for(&self, user_id: i64) -> Result<Vec<NotificationRow>> {
        self.query_notifications(
            user_id,
            &format!(
                "SELECT {NOTIFICATION_COLUMNS} FROM notifications
                 WHERE notified_user_id = ?1 ORDER BY created_at DESC"
            ),
        )
    }

    pub fn unread_notifications_for(&self, user_id: i64) -> Result<Vec<NotificationRow>> {
        self.query_notifications(
            user_id,
            &format!(
                "SELECT {NOTIFICATION_COLUMNS} FROM notifications
                 WHERE notified_user_id = ?1 AND is_read = 0 ORDER BY created_at DESC"
            ),
        )
    }

    fn query_notifications(&self, user_id: i64, sql: &str) -> Result<Vec<NotificationRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(sql)?;
            let rows = stmt
                .query_map([user_id], map_notification)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn map_notification(row: &rusqlite::Row<'_>) -> rusqlite::Result<NotificationRow> {
    Ok(NotificationRow {
        id: row.get(0)?,
        notified_user_id: row.get(1)?,
        notifying_user_id: row.get(2)?,
        kind: row.get(3)?,
        object_label: row.get(4)?,
        object_id: row.get(5)?,
        content: row.get(6)?,
        is_read: row.get(7)?,
        created_at: row.get(8)?,
        notifying_avatar: row.get(9)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_users(db: &Database) -> (i64, i64) {
        let a = db
            .create_user("alice", "alice@example.com", "hash", None, None, None, false)
            .unwrap();
        let b = db
            .create_user("bob", "bob@example.com", "hash", None, None, None, false)
            .unwrap();
        (a, b)
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

    #[test]
    fn unread_count_tracks_create_retract_and_mark_read() {
        let db = Database::open_in_memory().unwrap();
        let (alice, bob) = two_users(&db);

        assert_eq!(db.unread_notification_count(bob).unwrap(), 0);

        let id = db.create_notification(&follow_request(alice, bob)).unwrap();
        assert_eq!(db.unread_notification_count(bob).unwrap(), 1);

        db.mark_all_notifications_read(bob).unwrap();
        assert_eq!(db.unread_notification_count(bob).unwrap(), 0);

        // Deleting a read row must not drive the count negative
        db.delete_notification(id).unwrap();
        assert_eq!(db.unread_notification_count(bob).unwrap(), 0);
        assert!(db.notifications_for(bob).unwrap().is_empty());
    }

    #[test]
    fn find_matches_on_the_full_composite_key() {
        let db = Database::open_in_memory().unwrap();
        let (alice, bob) = two_users(&db);
        db.create_notification(&follow_request(alice, bob)).unwrap();

        let found = db
            .find_notification(
                alice,
                bob,
                NotificationKind::FOLLOW_FAMILY,
                Some(alice),
                Some("alice"),
            )
            .unwrap();
        assert!(found.is_some());

        // Wrong object id — no match, benign
        let missed = db
            .find_notification(alice, bob, NotificationKind::FOLLOW_FAMILY, Some(99), Some("alice"))
            .unwrap();
        assert!(missed.is_none());

        // Kind outside the family — no match
        let missed = db
            .find_notification(
                alice,
                bob,
                &[NotificationKind::Reaction],
                Some(alice),
                Some("alice"),
            )
            .unwrap();
        assert!(missed.is_none());
    }

    #[test]
    fn retype_rewrites_the_kind_in_place() {
        let db = Database::open_in_memory().unwrap();
        let (alice, bob) = two_users(&db);
        db.create_notification(&follow_request(alice, bob)).unwrap();

        db.retype_notifications(
            alice,
            bob,
            &[NotificationKind::FollowRequest],
            NotificationKind::Follow,
        )
        .unwrap();

        let rows = db.notifications_for(bob).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].kind, "follow");
        // Retype must not touch the read flag
        assert!(!rows[0].is_read);
    }
}
