use std::collections::HashMap;

use anyhow::Result;

use crate::models::{ReactionOutcome, now_timestamp};
use crate::{Database, OptionalExt};

impl Database {
    /// Idempotent-by-pair reaction toggle. Exactly one of post_id/comment_id
    /// is set (the caller validates). The first reaction on a pair creates;
    /// the same value again removes; a different value updates in place.
    pub fn apply_reaction(
        &self,
        user_id: i64,
        post_id: Option<i64>,
        comment_id: Option<i64>,
        value: &str,
    ) -> Result<ReactionOutcome> {
        self.with_conn(|conn| {
            let existing: Option<(i64, String)> = conn
                .query_row(
                    "SELECT id, value FROM reactions
                     WHERE user_id = ?1 AND post_id IS ?2 AND comment_id IS ?3",
                    rusqlite::params![user_id, post_id, comment_id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            match existing {
                Some((id, old_value)) if old_value == value => {
                    conn.execute("DELETE FROM reactions WHERE id = ?1", [id])?;
                    Ok(ReactionOutcome::Removed)
                }
                Some((id, _)) => {
                    conn.execute(
                        "UPDATE reactions SET value = ?1 WHERE id = ?2",
                        rusqlite::params![value, id],
                    )?;
                    Ok(ReactionOutcome::Updated)
                }
                None => {
                    conn.execute(
                        "INSERT INTO reactions (user_id, post_id, comment_id, value, created_at)
                         VALUES (?1, ?2, ?3, ?4, ?5)",
                        rusqlite::params![user_id, post_id, comment_id, value, now_timestamp()],
                    )?;
                    Ok(ReactionOutcome::Created)
                }
            }
        })
    }

    pub fn reaction_counts(
        &self,
        post_id: Option<i64>,
        comment_id: Option<i64>,
    ) -> Result<HashMap<String, i64>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT value, COUNT(*) FROM reactions
                 WHERE post_id IS ?1 AND comment_id IS ?2
                 GROUP BY value",
            )?;
            let mut counts = HashMap::new();
            let rows = stmt.query_map(rusqlite::params![post_id, comment_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?;
            for row in rows {
                let (value, count) = row?;
                counts.insert(value, count);
            }
            Ok(counts)
        })
    }

    pub fn user_reaction(
        &self,
        user_id: i64,
        post_id: Option<i64>,
        comment_id: Option<i64>,
    ) -> Result<Option<String>> {
        self.with_conn(|conn| {
            let value = conn
                .query_row(
                    "SELECT value FROM reactions
                     WHERE user_id = ?1 AND post_id IS ?2 AND comment_id IS ?3",
                    rusqlite::params![user_id, post_id, comment_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(value)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db_with_post() -> (Database, i64, i64) {
        let db = Database::open_in_memory().unwrap();
        let alice = db
            .create_user("alice", "alice@example.com", "hash", None, None, None, false)
            .unwrap();
        let post = db.insert_post(alice, None, "hello", "public").unwrap();
        (db, alice, post)
    }

    #[test]
    fn toggle_cycle_returns_to_absent_and_back() {
        let (db, _, post) = db_with_post();
        let bob = db
            .create_user("bob", "bob@example.com", "hash", None, None, None, false)
            .unwrap();

        assert_eq!(
            db.apply_reaction(bob, Some(post), None, "like").unwrap(),
            ReactionOutcome::Created
        );
        assert_eq!(
            db.apply_reaction(bob, Some(post), None, "like").unwrap(),
            ReactionOutcome::Removed
        );
        assert_eq!(db.user_reaction(bob, Some(post), None).unwrap(), None);

        // Third identical react reproduces the created state
        assert_eq!(
            db.apply_reaction(bob, Some(post), None, "like").unwrap(),
            ReactionOutcome::Created
        );
        assert_eq!(
            db.user_reaction(bob, Some(post), None).unwrap(),
            Some("like".to_string())
        );
    }

    #[test]
    fn different_value_updates_in_place() {
        let (db, _, post) = db_with_post();
        let bob = db
            .create_user("bob", "bob@example.com", "hash", None, None, None, false)
            .unwrap();

        db.apply_reaction(bob, Some(post), None, "like").unwrap();
        assert_eq!(
            db.apply_reaction(bob, Some(post), None, "love").unwrap(),
            ReactionOutcome::Updated
        );
        assert_eq!(
            db.user_reaction(bob, Some(post), None).unwrap(),
            Some("love".to_string())
        );
        let counts = db.reaction_counts(Some(post), None).unwrap();
        assert_eq!(counts.get("love"), Some(&1));
        assert_eq!(counts.get("like"), None);
    }
}
