use rusqlite::{Connection, OptionalExtension, Row};
use tracing::info;

use crate::models::UserRow;
use crate::{Database, StoreError, StoreResult, format_timestamp, now};

const USER_COLUMNS: &str = "id, username, email, password_hash, profile_photo, created_at";

impl Database {
    /// Inserts an account. The caller hashes the password; plaintext never
    /// reaches this layer.
    pub fn create_user(&self, username: &str, email: &str, password_hash: &str) -> StoreResult<UserRow> {
        if username.trim().is_empty() || email.trim().is_empty() || password_hash.is_empty() {
            return Err(StoreError::Validation(
                "username, email and password are required".into(),
            ));
        }

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            if query_user(&tx, "username", username)?.is_some() {
                return Err(StoreError::Duplicate { field: "username" });
            }
            if query_user(&tx, "email", email)?.is_some() {
                return Err(StoreError::Duplicate { field: "email" });
            }

            tx.execute(
                "INSERT INTO users (username, email, password_hash, created_at) VALUES (?1, ?2, ?3, ?4)",
                (username, email, password_hash, format_timestamp(now())),
            )?;
            let id = tx.last_insert_rowid();
            let row = query_user_by_id(&tx, id)?.ok_or(StoreError::NotFound)?;
            tx.commit()?;

            info!("Created user {}", id);
            Ok(row)
        })
    }

    pub fn find_user_by_username(&self, username: &str) -> StoreResult<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }

    pub fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user(&self, id: i64) -> StoreResult<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_id(conn, id))
    }

    pub fn update_username(&self, id: i64, username: &str) -> StoreResult<UserRow> {
        self.update_profile(id, username, None)
    }

    /// Renames the account and, when given, replaces the password hash. Both
    /// writes commit together or not at all.
    pub fn update_profile(&self, id: i64, username: &str, password_hash: Option<&str>) -> StoreResult<UserRow> {
        if username.trim().is_empty() {
            return Err(StoreError::Validation("username is required".into()));
        }

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            if let Some(existing) = query_user(&tx, "username", username)? {
                if existing.id != id {
                    return Err(StoreError::Duplicate { field: "username" });
                }
            }
            let changed = tx.execute("UPDATE users SET username = ?1 WHERE id = ?2", (username, id))?;
            if changed == 0 {
                return Err(StoreError::NotFound);
            }
            if let Some(hash) = password_hash {
                tx.execute("UPDATE users SET password_hash = ?1 WHERE id = ?2", (hash, id))?;
                info!("Password changed for user {}", id);
            }
            let row = query_user_by_id(&tx, id)?.ok_or(StoreError::NotFound)?;
            tx.commit()?;
            Ok(row)
        })
    }

    /// Sets the profile photo and returns the one it replaced.
    pub fn update_profile_photo(&self, id: i64, photo: &str) -> StoreResult<String> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let previous: String = tx
                .query_row("SELECT profile_photo FROM users WHERE id = ?1", [id], |row| row.get(0))
                .optional()?
                .ok_or(StoreError::NotFound)?;
            tx.execute("UPDATE users SET profile_photo = ?1 WHERE id = ?2", (photo, id))?;
            tx.commit()?;
            Ok(previous)
        })
    }

    /// Deletes an account. Its translations and sessions go with it through
    /// the `ON DELETE CASCADE` foreign keys.
    pub fn delete_user(&self, id: i64) -> StoreResult<()> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute("DELETE FROM users WHERE id = ?1", [id])?;
            if changed == 0 {
                return Err(StoreError::NotFound);
            }
            info!("Deleted user {} and owned records", id);
            Ok(())
        })
    }
}

fn map_user(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        profile_photo: row.get(4)?,
        created_at: row.get(5)?,
    })
}

/// `column` is always one of our literals, never caller input.
fn query_user(conn: &Connection, column: &str, value: &str) -> StoreResult<Option<UserRow>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1");
    let row = conn.query_row(&sql, [value], map_user).optional()?;
    Ok(row)
}

fn query_user_by_id(conn: &Connection, id: i64) -> StoreResult<Option<UserRow>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
    let row = conn.query_row(&sql, [id], map_user).optional()?;
    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use polyglot_types::models::DEFAULT_AVATAR;

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn create_and_find_user() {
        let db = db();
        let created = db.create_user("alice", "alice@example.com", "$argon2id$hash").unwrap();
        assert_eq!(created.profile_photo, DEFAULT_AVATAR);

        let by_name = db.find_user_by_username("alice").unwrap().unwrap();
        let by_email = db.find_user_by_email("alice@example.com").unwrap().unwrap();
        assert_eq!(by_name.id, created.id);
        assert_eq!(by_email.id, created.id);
        assert!(db.find_user_by_username("bob").unwrap().is_none());
    }

    #[test]
    fn duplicates_are_reported_per_field() {
        let db = db();
        db.create_user("alice", "alice@example.com", "h").unwrap();

        let err = db.create_user("alice", "other@example.com", "h").unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { field: "username" }));

        let err = db.create_user("bob", "alice@example.com", "h").unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { field: "email" }));
    }

    #[test]
    fn missing_fields_are_rejected() {
        let err = db().create_user(" ", "a@example.com", "h").unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[test]
    fn rename_checks_other_accounts_only() {
        let db = db();
        let alice = db.create_user("alice", "alice@example.com", "h").unwrap();
        db.create_user("bob", "bob@example.com", "h").unwrap();

        assert_eq!(db.update_username(alice.id, "alice").unwrap().username, "alice");
        assert!(matches!(
            db.update_username(alice.id, "bob").unwrap_err(),
            StoreError::Duplicate { field: "username" }
        ));
        assert_eq!(db.update_username(alice.id, "alicia").unwrap().username, "alicia");
        assert!(matches!(db.update_username(999, "ghost").unwrap_err(), StoreError::NotFound));
    }

    #[test]
    fn profile_update_renames_and_rehashes_together() {
        let db = db();
        let alice = db.create_user("alice", "alice@example.com", "old-hash").unwrap();
        db.create_user("bob", "bob@example.com", "h").unwrap();

        let err = db.update_profile(alice.id, "bob", Some("new-hash")).unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { field: "username" }));
        let unchanged = db.get_user(alice.id).unwrap().unwrap();
        assert_eq!(unchanged.username, "alice");
        assert_eq!(unchanged.password_hash, "old-hash");

        let updated = db.update_profile(alice.id, "alicia", Some("new-hash")).unwrap();
        assert_eq!(updated.username, "alicia");
        assert_eq!(updated.password_hash, "new-hash");

        let renamed = db.update_profile(alice.id, "alice", None).unwrap();
        assert_eq!(renamed.password_hash, "new-hash");
    }

    #[test]
    fn photo_update_returns_previous() {
        let db = db();
        let alice = db.create_user("alice", "alice@example.com", "h").unwrap();
        assert_eq!(db.update_profile_photo(alice.id, "1_a.png").unwrap(), DEFAULT_AVATAR);
        assert_eq!(db.update_profile_photo(alice.id, "1_b.png").unwrap(), "1_a.png");
    }

    #[test]
    fn delete_unknown_user_is_not_found() {
        assert!(matches!(db().delete_user(42).unwrap_err(), StoreError::NotFound));
    }
}
