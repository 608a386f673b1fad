use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, params};
use tracing::debug;

use crate::models::SessionRow;
use crate::{Database, StoreResult, format_timestamp, now, parse_timestamp};

impl Database {
    pub fn create_session(&self, id: &str, user_id: i64, expires_at: DateTime<Utc>) -> StoreResult<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO sessions (id, user_id, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
                params![id, user_id, format_timestamp(now()), format_timestamp(expires_at)],
            )?;
            Ok(())
        })
    }

    /// Returns the session only while it has not expired.
    pub fn get_live_session(&self, id: &str) -> StoreResult<Option<SessionRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, user_id, created_at, expires_at FROM sessions WHERE id = ?1",
                    [id],
                    |row| {
                        Ok(SessionRow {
                            id: row.get(0)?,
                            user_id: row.get(1)?,
                            created_at: row.get(2)?,
                            expires_at: row.get(3)?,
                        })
                    },
                )
                .optional()?;

            match row {
                Some(session) if parse_timestamp(&session.expires_at)? > Utc::now() => Ok(Some(session)),
                _ => Ok(None),
            }
        })
    }

    /// Returns true when a session was removed.
    pub fn delete_session(&self, id: &str) -> StoreResult<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute("DELETE FROM sessions WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }

    pub fn prune_expired_sessions(&self) -> StoreResult<usize> {
        self.with_conn_mut(|conn| {
            let removed = conn.execute(
                "DELETE FROM sessions WHERE expires_at < ?1",
                [format_timestamp(now())],
            )?;
            if removed > 0 {
                debug!("Pruned {} expired sessions", removed);
            }
            Ok(removed)
        })
    }
}
