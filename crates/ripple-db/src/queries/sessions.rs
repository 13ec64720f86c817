use anyhow::Result;

use crate::models::UserRow;
use crate::{Database, OptionalExt};

impl Database {
    pub fn create_session(&self, token: &str, user_id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO sessions (token, user_id) VALUES (?1, ?2)",
                rusqlite::params![token, user_id],
            )?;
            Ok(())
        })
    }

    pub fn session_user(&self, token: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT u.id, u.username, u.email, u.password, u.first_name, u.last_name,
                        u.avatar_url, u.about, u.is_private, u.created_at
                 FROM sessions s
                 JOIN users u ON u.id = s.user_id
                 WHERE s.token = ?1",
            )?;
            let row = stmt
                .query_row([token], |row| {
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
        })
    }

    pub fn delete_session(&self, token: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM sessions WHERE token = ?1", [token])?;
            Ok(())
        })
    }
}
