use anyhow::Result;

use crate::Database;
use crate::models::{MessageRow, now_timestamp};

impl Database {
    pub fn insert_message(
        &self,
        sender_id: i64,
        receiver_id: Option<i64>,
        group_id: Option<i64>,
        content: &str,
    ) -> Result<MessageRow> {
        self.with_conn(|conn| {
            let created_at = now_timestamp();
            conn.execute(
                "INSERT INTO messages (sender_id, receiver_id, group_id, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![sender_id, receiver_id, group_id, content, created_at],
            )?;
            Ok(MessageRow {
                id: conn.last_insert_rowid(),
                sender_id,
                receiver_id,
                group_id,
                content: content.to_string(),
                created_at,
            })
        })
    }

    /// One unread marker per recipient for a freshly persisted message.
    pub fn create_chat_markers(&self, message_id: i64, notified_user_ids: &[i64]) -> Result<()> {
        if notified_user_ids.is_empty() {
            return Ok(());
        }
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "INSERT OR IGNORE INTO chat_notifications (message_id, notified_user_id)
                 VALUES (?1, ?2)",
            )?;
            for user_id in notified_user_ids {
                stmt.execute(rusqlite::params![message_id, user_id])?;
            }
            Ok(())
        })
    }

    /// Thread-level read marking: drop every marker the viewer holds for
    /// direct messages from the other party.
    pub fn delete_direct_markers(&self, viewer_id: i64, other_id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "DELETE FROM chat_notifications
                 WHERE notified_user_id = ?1 AND message_id IN (
                     SELECT id FROM messages WHERE sender_id = ?2 AND group_id IS NULL
                 )",
                rusqlite::params![viewer_id, other_id],
            )?;
            Ok(())
        })
    }

    pub fn delete_group_markers(&self, viewer_id: i64, group_id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "DELETE FROM chat_notifications
                 WHERE notified_user_id = ?1 AND message_id IN (
                     SELECT id FROM messages WHERE group_id = ?2
                 )",
                rusqlite::params![viewer_id, group_id],
            )?;
            Ok(())
        })
    }

    pub fn direct_history(&self, user_a: i64, user_b: i64) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, sender_id, receiver_id, group_id, content, created_at
                 FROM messages
                 WHERE group_id IS NULL
                   AND ((sender_id = ?1 AND receiver_id = ?2)
                     OR (sender_id = ?2 AND receiver_id = ?1))
                 ORDER BY created_at ASC",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![user_a, user_b], map_message)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn group_history(&self, group_id: i64) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, sender_id, receiver_id, group_id, content, created_at
                 FROM messages WHERE group_id = ?1
                 ORDER BY created_at ASC",
            )?;
            let rows = stmt
                .query_map([group_id], map_message)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Latest message of every direct thread the user participates in.
    pub fn latest_direct_messages(&self, user_id: i64) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, sender_id, receiver_id, group_id, content, created_at
                 FROM messages
                 WHERE group_id IS NULL AND id IN (
                     SELECT MAX(id) FROM messages
                     WHERE group_id IS NULL AND (sender_id = ?1 OR receiver_id = ?1)
                     GROUP BY MIN(sender_id, receiver_id), MAX(sender_id, receiver_id)
                 )
                 ORDER BY created_at DESC",
            )?;
            let rows = stmt
                .query_map([user_id], map_message)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Latest message of every group the user is an accepted member of.
    pub fn latest_group_messages(&self, user_id: i64) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, sender_id, receiver_id, group_id, content, created_at
                 FROM messages
                 WHERE id IN (
                     SELECT MAX(id) FROM messages
                     WHERE group_id IN (
                         SELECT group_id FROM group_members
                         WHERE user_id = ?1 AND status = 'accepted'
                     )
                     GROUP BY group_id
                 )
                 ORDER BY created_at DESC",
            )?;
            let rows = stmt
                .query_map([user_id], map_message)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn unread_direct_markers(&self, viewer_id: i64, other_id: i64) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM chat_notifications
                 WHERE notified_user_id = ?1 AND message_id IN (
                     SELECT id FROM messages WHERE sender_id = ?2 AND group_id IS NULL
                 )",
                rusqlite::params![viewer_id, other_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    pub fn unread_group_markers(&self, viewer_id: i64, group_id: i64) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM chat_notifications
                 WHERE notified_user_id = ?1 AND message_id IN (
                     SELECT id FROM messages WHERE group_id = ?2
                 )",
                rusqlite::params![viewer_id, group_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }
}

fn map_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        sender_id: row.get(1)?,
        receiver_id: row.get(2)?,
        group_id: row.get(3)?,
        content: row.get(4)?,
        created_at: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed_users(db: &Database) -> (i64, i64) {
        let a = db
            .create_user("alice", "alice@example.com", "hash", None, None, None, false)
            .unwrap();
        let b = db
            .create_user("bob", "bob@example.com", "hash", None, None, None, false)
            .unwrap();
        (a, b)
    }

    #[test]
    fn direct_markers_are_per_recipient_and_thread_scoped() {
        let db = Database::open_in_memory().unwrap();
        let (alice, bob) = seed_users(&db);

        let m1 = db.insert_message(alice, Some(bob), None, "hi").unwrap();
        let m2 = db.insert_message(alice, Some(bob), None, "there").unwrap();
        db.create_chat_markers(m1.id, &[bob]).unwrap();
        db.create_chat_markers(m2.id, &[bob]).unwrap();

        assert_eq!(db.unread_direct_markers(bob, alice).unwrap(), 2);

        // Opening the thread clears everything from that sender at once
        db.delete_direct_markers(bob, alice).unwrap();
        assert_eq!(db.unread_direct_markers(bob, alice).unwrap(), 0);

        // The messages themselves are untouched
        assert_eq!(db.direct_history(alice, bob).unwrap().len(), 2);
    }

    #[test]
    fn group_markers_clear_by_group_and_viewer_only() {
        let db = Database::open_in_memory().unwrap();
        let (alice, bob) = seed_users(&db);
        let carol = db
            .create_user("carol", "carol@example.com", "hash", None, None, None, false)
            .unwrap();
        let group = db.create_group("climbers", None, alice).unwrap();
        db.set_member_status(group, bob, "accepted").unwrap();
        db.set_member_status(group, carol, "accepted").unwrap();

        let m = db.insert_message(alice, None, Some(group), "route?").unwrap();
        db.create_chat_markers(m.id, &[bob, carol]).unwrap();

        db.delete_group_markers(bob, group).unwrap();
        assert_eq!(db.unread_group_markers(bob, group).unwrap(), 0);
        assert_eq!(db.unread_group_markers(carol, group).unwrap(), 1);
    }

    #[test]
    fn latest_direct_messages_collapse_each_thread_to_one_row() {
        let db = Database::open_in_memory().unwrap();
        let (alice, bob) = seed_users(&db);
        db.insert_message(alice, Some(bob), None, "first").unwrap();
        db.insert_message(bob, Some(alice), None, "second").unwrap();

        let latest = db.latest_direct_messages(alice).unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].content, "second");
    }
}
