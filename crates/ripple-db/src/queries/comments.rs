use anyhow::Result;

use crate::models::{CommentRow, now_timestamp};
use crate::{Database, OptionalExt};

impl Database {
    pub fn insert_comment(&self, post_id: i64, author_id: i64, content: &str) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO comments (post_id, author_id, content, created_at) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![post_id, author_id, content, now_timestamp()],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn comment_author(&self, comment_id: i64) -> Result<Option<i64>> {
        self.with_conn(|conn| {
            let author = conn
                .query_row(
                    "SELECT author_id FROM comments WHERE id = ?1",
                    [comment_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(author)
        })
    }

    pub fn comments_for_post(&self, post_id: i64) -> Result<Vec<CommentRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT c.id, c.post_id, c.author_id, u.username, c.content, c.created_at
                 FROM comments c JOIN users u ON u.id = c.author_id
                 WHERE c.post_id = ?1
                 ORDER BY c.created_at ASC",
            )?;
            let rows = stmt
                .query_map([post_id], |row| {
                    Ok(CommentRow {
                        id: row.get(0)?,
                        post_id: row.get(1)?,
                        author_id: row.get(2)?,
                        author_username: row.get(3)?,
                        content: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}
