use rusqlite::{params, Connection};

use crate::db::DatabaseError;

/// Get a user preference by key. Returns None if not set.
pub fn get_user_preference(
    conn: &Connection,
    key: &str,
) -> Result<Option<String>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT value FROM user_preferences WHERE key = ?1")?;
    match stmt.query_row([key], |row| row.get::<_, String>(0)) {
        Ok(val) => Ok(Some(val)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(DatabaseError::from(e)),
    }
}

/// Set a user preference (upsert).
pub fn set_user_preference(
    conn: &Connection,
    key: &str,
    value: &str,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO user_preferences (key, value, updated_at)
         VALUES (?1, ?2, datetime('now'))
         ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
        params![key, value],
    )?;
    Ok(())
}

/// Delete a user preference. Deleting an unset key is a no-op.
pub fn delete_user_preference(conn: &Connection, key: &str) -> Result<(), DatabaseError> {
    conn.execute("DELETE FROM user_preferences WHERE key = ?1", [key])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;

    #[test]
    fn unset_preference_is_none() {
        let conn = open_memory_database().unwrap();
        assert_eq!(get_user_preference(&conn, "current_patient_id").unwrap(), None);
    }

    #[test]
    fn set_then_overwrite() {
        let conn = open_memory_database().unwrap();
        set_user_preference(&conn, "k", "one").unwrap();
        set_user_preference(&conn, "k", "two").unwrap();
        assert_eq!(get_user_preference(&conn, "k").unwrap().as_deref(), Some("two"));
    }

    #[test]
    fn delete_is_idempotent() {
        let conn = open_memory_database().unwrap();
        set_user_preference(&conn, "k", "v").unwrap();
        delete_user_preference(&conn, "k").unwrap();
        delete_user_preference(&conn, "k").unwrap();
        assert!(get_user_preference(&conn, "k").unwrap().is_none());
    }
}
