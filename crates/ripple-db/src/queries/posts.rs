use anyhow::Result;

use crate::models::{PostRow, now_timestamp};
use crate::{Database, OptionalExt};

impl Database {
    pub fn insert_post(
        &self,
        author_id: i64,
        group_id: Option<i64>,
        content: &str,
        privacy: &str,
    ) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO posts (author_id, group_id, content, privacy, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![author_id, group_id, content, privacy, now_timestamp()],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn insert_post_viewer(&self, post_id: i64, user_id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO post_viewers (post_id, user_id) VALUES (?1, ?2)",
                rusqlite::params![post_id, user_id],
            )?;
            Ok(())
        })
    }

    pub fn is_post_viewer(&self, post_id: i64, user_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM post_viewers WHERE post_id = ?1 AND user_id = ?2",
                rusqlite::params![post_id, user_id],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
    }

    pub fn post_author(&self, post_id: i64) -> Result<Option<i64>> {
        self.with_conn(|conn| {
            let author = conn
                .query_row("SELECT author_id FROM posts WHERE id = ?1", [post_id], |row| {
                    row.get(0)
                })
                .optional()?;
            Ok(author)
        })
    }

    pub fn post_by_id(&self, post_id: i64) -> Result<Option<PostRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT p.id, p.author_id, u.username, p.group_id, p.content, p.privacy, p.created_at
                     FROM posts p JOIN users u ON u.id = p.author_id
                     WHERE p.id = ?1",
                    [post_id],
                    map_post,
                )
                .optional()?;
            Ok(row)
        })
    }

    /// Top-level feed for one viewer: public posts, the viewer's own, posts
    /// from authors the viewer follows with followers-only privacy, and
    /// selected-privacy posts the viewer was picked for.
    pub fn visible_posts(&self, viewer_id: i64) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT p.id, p.author_id, u.username, p.group_id, p.content, p.privacy, p.created_at
                 FROM posts p JOIN users u ON u.id = p.author_id
                 WHERE p.group_id IS NULL AND (
                       p.privacy = 'public'
                    OR p.author_id = ?1
                    OR (p.privacy = 'followers' AND EXISTS (
                            SELECT 1 FROM follows f
                            WHERE f.follower_id = ?1 AND f.followed_id = p.author_id
                              AND f.status = 'accepted'))
                    OR (p.privacy = 'selected' AND EXISTS (
                            SELECT 1 FROM post_viewers pv
                            WHERE pv.post_id = p.id AND pv.user_id = ?1)))
                 ORDER BY p.created_at DESC",
            )?;
            let rows = stmt
                .query_map([viewer_id], map_post)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn group_posts(&self, group_id: i64) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT p.id, p.author_id, u.username, p.group_id, p.content, p.privacy, p.created_at
                 FROM posts p JOIN users u ON u.id = p.author_id
                 WHERE p.group_id = ?1
                 ORDER BY p.created_at DESC",
            )?;
            let rows = stmt
                .query_map([group_id], map_post)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn map_post(row: &rusqlite::Row<'_>) -> rusqlite::Result<PostRow> {
    Ok(PostRow {
        id: row.get(0)?,
        author_id: row.get(1)?,
        author_username: row.get(2)?,
        group_id: row.get(3)?,
        content: row.get(4)?,
        privacy: row.get(5)?,
        created_at: row.get(6)?,
    })
}
