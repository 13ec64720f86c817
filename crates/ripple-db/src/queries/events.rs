use anyhow::Result;

use crate::models::{EventRow, now_timestamp};
use crate::{Database, OptionalExt};

impl Database {
    pub fn insert_event(
        &self,
        group_id: i64,
        creator_id: i64,
        title: &str,
        description: Option<&str>,
        event_date: &str,
    ) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO events (group_id, creator_id, title, description, event_date, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![group_id, creator_id, title, description, event_date, now_timestamp()],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn event_by_id(&self, event_id: i64) -> Result<Option<EventRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, group_id, creator_id, title, description, event_date, created_at
                     FROM events WHERE id = ?1",
                    [event_id],
                    map_event,
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn events_for_group(&self, group_id: i64) -> Result<Vec<EventRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, group_id, creator_id, title, description, event_date, created_at
                 FROM events WHERE group_id = ?1
                 ORDER BY event_date ASC",
            )?;
            let rows = stmt
                .query_map([group_id], map_event)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Upsert: responding again overwrites the previous answer.
    pub fn respond_event(&self, event_id: i64, user_id: i64, response: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO event_responses (event_id, user_id, response)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT (event_id, user_id) DO UPDATE SET response = excluded.response",
                rusqlite::params![event_id, user_id, response],
            )?;
            Ok(())
        })
    }

    pub fn event_responses(&self, event_id: i64) -> Result<Vec<(i64, String)>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT user_id, response FROM event_responses WHERE event_id = ?1",
            )?;
            let rows = stmt
                .query_map([event_id], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn map_event(row: &rusqlite::Row<'_>) -> rusqlite::Result<EventRow> {
    Ok(EventRow {
        id: row.get(0)?,
        group_id: row.get(1)?,
        creator_id: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        event_date: row.get(5)?,
        created_at: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn responding_twice_keeps_one_row_with_the_latest_answer() {
        let db = Database::open_in_memory().unwrap();
        let alice = db
            .create_user("alice", "alice@example.com", "hash", None, None, None, false)
            .unwrap();
        let group = db.create_group("hikers", None, alice).unwrap();
        let event = db
            .insert_event(group, alice, "Summit day", None, "2026-09-01T08:00:00Z")
            .unwrap();

        db.respond_event(event, alice, "going").unwrap();
        db.respond_event(event, alice, "not_going").unwrap();

        let responses = db.event_responses(event).unwrap();
        assert_eq!(responses, vec![(alice, "not_going".to_string())]);
    }
}
