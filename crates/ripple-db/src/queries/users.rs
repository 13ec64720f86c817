use anyhow::Result;
use rusqlite::Connection;

use crate::models::UserRow;
use crate::{Database, OptionalExt};
use ripple_types::models::UserItem;

impl Database {
    pub fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        first_name: Option<&str>,
        last_name: Option<&str>,
        avatar_url: Option<&str>,
        is_private: bool,
    ) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (username, email, password, first_name, last_name, avatar_url, is_private)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    username,
                    email,
                    password_hash,
                    first_name,
                    last_name,
                    avatar_url,
                    is_private
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            query_user(conn, "SELECT id, username, email, password, first_name, last_name, avatar_url, about, is_private, created_at FROM users WHERE username = ?1", username)
        })
    }

    pub fn user_by_id(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            query_user(conn, "SELECT id, username, email, password, first_name, last_name, avatar_url, about, is_private, created_at FROM users WHERE id = ?1", id)
        })
    }

    pub fn list_users(&self) -> Result<Vec<UserItem>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, username, avatar_url FROM users ORDER BY username")?;
            let rows = stmt
                .query_map([], |row| {
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

fn query_user<P: rusqlite::ToSql>(conn: &Connection, sql: &str, param: P) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(sql)?;
    let row = stmt
        .query_row([param], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                email: row.get(2)?,
                password: row.get(3)?,
                first_name: row.get(4)?,
                last_name: row.get(5)?,
                avatar_url: row.get(6)?,
                about: row.get(7)?,
                is_private: row.get(8)?,
                created_at: row.get(9)?,
            })
        })
        .optional()?;
    Ok(row)
}
