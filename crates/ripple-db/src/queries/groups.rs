use anyhow::Result;

use crate::models::GroupRow;
use crate::{Database, OptionalExt};
use ripple_types::models::UserItem;

impl Database {
    /// Creates the group and installs the creator as an accepted member.
    pub fn create_group(&self, name: &str, description: Option<&str>, creator_id: i64) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO groups (name, description, creator_id) VALUES (?1, ?2, ?3)",
                rusqlite::params![name, description, creator_id],
            )?;
            let group_id = conn.last_insert_rowid();
            conn.execute(
                "INSERT INTO group_members (group_id, user_id, status) VALUES (?1, ?2, 'accepted')",
                rusqlite::params![group_id, creator_id],
            )?;
            Ok(group_id)
        })
    }

    pub fn group_by_id(&self, group_id: i64) -> Result<Option<GroupRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, name, description, creator_id, created_at FROM groups WHERE id = ?1",
                    [group_id],
                    |row| {
                        Ok(GroupRow {
                            id: row.get(0)?,
                            name: row.get(1)?,
                            description: row.get(2)?,
                            creator_id: row.get(3)?,
                            created_at: row.get(4)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn list_groups(&self) -> Result<Vec<GroupRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT id, name, description, creator_id, created_at FROM groups ORDER BY name")?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(GroupRow {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        description: row.get(2)?,
                        creator_id: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn member_status(&self, group_id: i64, user_id: i64) -> Result<Option<String>> {
        self.with_conn(|conn| {
            let status = conn
                .query_row(
                    "SELECT status FROM group_members WHERE group_id = ?1 AND user_id = ?2",
                    rusqlite::params![group_id, user_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(status)
        })
    }

    pub fn set_member_status(&self, group_id: i64, user_id: i64, status: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO group_members (group_id, user_id, status) VALUES (?1, ?2, ?3)
                 ON CONFLICT (group_id, user_id) DO UPDATE SET status = excluded.status",
                rusqlite::params![group_id, user_id, status],
            )?;
            Ok(())
        })
    }

    pub fn remove_member(&self, group_id: i64, user_id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "DELETE FROM group_members WHERE group_id = ?1 AND user_id = ?2",
                rusqlite::params![group_id, user_id],
            )?;
            Ok(())
        })
    }

    pub fn accepted_member_ids(&self, group_id: i64) -> Result<Vec<i64>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT user_id FROM group_members WHERE group_id = ?1 AND status = 'accepted'",
            )?;
            let ids = stmt
                .query_map([group_id], |row| row.get(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(ids)
        })
    }

    pub fn group_members(&self, group_id: i64) -> Result<Vec<UserItem>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT u.id, u.username, u.avatar_url FROM group_members gm
                 JOIN users u ON u.id = gm.user_id
                 WHERE gm.group_id = ?1 AND gm.status = 'accepted'
                 ORDER BY u.username",
            )?;
            let rows = stmt
                .query_map([group_id], |row| {
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
