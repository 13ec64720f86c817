use anyhow::Result;

use crate::{Database, OptionalExt};
use ripple_types::models::UserItem;

impl Database {
    pub fn upsert_follow(&self, follower_id: i64, followed_id: i64, status: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO follows (follower_id, followed_id, status) VALUES (?1, ?2, ?3)
                 ON CONFLICT (follower_id, followed_id) DO UPDATE SET status = excluded.status",
                rusqlite::params![follower_id, followed_id, status],
            )?;
            Ok(())
        })
    }

    pub fn delete_follow(&self, follower_id: i64, followed_id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "DELETE FROM follows WHERE follower_id = ?1 AND followed_id = ?2",
                rusqlite::params![follower_id, followed_id],
            )?;
            Ok(())
        })
    }

    pub fn follow_status(&self, follower_id: i64, followed_id: i64) -> Result<Option<String>> {
        self.with_conn(|conn| {
            let status = conn
                .query_row(
                    "SELECT status FROM follows WHERE follower_id = ?1 AND followed_id = ?2",
                    rusqlite::params![follower_id, followed_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(status)
        })
    }

    /// Accepted relationship in either direction — the direct-chat gate.
    pub fn users_connected(&self, user_a: i64, user_b: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let status: Option<String> = conn
                .query_row(
                    "SELECT status FROM follows
                     WHERE (follower_id = ?1 AND followed_id = ?2)
                        OR (follower_id = ?2 AND followed_id = ?1)",
                    rusqlite::params![user_a, user_b],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(status.as_deref() == Some("accepted"))
        })
    }

    pub fn accepted_follower_ids(&self, user_id: i64) -> Result<Vec<i64>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT follower_id FROM follows WHERE followed_id = ?1 AND status = 'accepted'",
            )?;
            let ids = stmt
                .query_map([user_id], |row| row.get(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(ids)
        })
    }

    pub fn followers(&self, user_id: i64) -> Result<Vec<UserItem>> {
        self.follow_edge_users(
            user_id,
            "SELECT u.id, u.username, u.avatar_url FROM follows f
             JOIN users u ON u.id = f.follower_id
             WHERE f.followed_id = ?1 AND f.status = 'accepted'
             ORDER BY u.username",
        )
    }

    pub fn following(&self, user_id: i64) -> Result<Vec<UserItem>> {
        self.follow_edge_users(
            user_id,
            "SELECT u.id, u.username, u.avatar_url FROM follows f
             JOIN users u ON u.id = f.followed_id
             WHERE f.follower_id = ?1 AND f.status = 'accepted'
             ORDER BY u.username",
        )
    }

    fn follow_edge_users(&self, user_id: i64, sql: &str) -> Result<Vec<UserItem>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(sql)?;
            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(UserItem {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        avatar_url: row.get(2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}
