use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::{path::Path, sync::Mutex};

use crate::session::{Session, SessionStorage, StorageError};

const INIT_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS session (
  id              INTEGER PRIMARY KEY CHECK (id = 1),
  token           TEXT NOT NULL,
  user_identifier TEXT NOT NULL,
  established_at  TEXT NOT NULL -- RFC3339
);
"#;

/// Connect to SQLite (with WAL mode so a crashed write cannot corrupt the row)
pub fn connect(path: impl AsRef<Path>) -> Result<Connection, StorageError> {
    let conn = Connection::open(path)?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    Ok(conn)
}

/// Run schema migrations
pub fn run_migrations(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(INIT_SQL)?;
    Ok(())
}

/// Durable session storage in a single-row table.
pub struct SqliteSessionStorage {
    conn: Mutex<Connection>,
}

impl SqliteSessionStorage {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let conn = connect(path)?;
        run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SessionStorage for SqliteSessionStorage {
    fn load(&self) -> Result<Option<Session>, StorageError> {
        let conn = self.conn();
        let row = conn
            .query_row(
                "SELECT token, user_identifier, established_at FROM session WHERE id = 1",
                [],
                |r| {
                    Ok((
                        r.get::<_, String>(0)?,
                        r.get::<_, String>(1)?,
                        r.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;

        let Some((token, user_identifier, established_at)) = row else {
            return Ok(None);
        };

        let established_at = DateTime::parse_from_rfc3339(&established_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| StorageError(format!("bad established_at {established_at:?}: {e}")))?;

        Ok(Some(Session {
            token,
            user_identifier,
            established_at,
        }))
    }

    fn save(&self, session: &Session) -> Result<(), StorageError> {
        self.conn().execute(
            r#"
            INSERT INTO session (id, token, user_identifier, established_at)
            VALUES (1, ?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE SET
                token           = excluded.token,
                user_identifier = excluded.user_identifier,
                established_at  = excluded.established_at
            "#,
            params![
                session.token,
                session.user_identifier,
                session.established_at.to_rfc3339()
            ],
        )?;
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.conn().execute("DELETE FROM session", [])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionStore;

    #[test]
    fn session_round_trips_through_sqlite() {
        let storage = SqliteSessionStorage::open_in_memory().unwrap();
        assert_eq!(storage.load().unwrap(), None);

        let session = Session {
            token: "tok-1".into(),
            user_identifier: "ann@example.com".into(),
            established_at: Utc::now(),
        };
        storage.save(&session).unwrap();

        let loaded = storage.load().unwrap().unwrap();
        assert_eq!(loaded.token, "tok-1");
        assert_eq!(loaded.user_identifier, "ann@example.com");

        storage.clear().unwrap();
        assert_eq!(storage.load().unwrap(), None);
    }

    #[test]
    fn second_save_replaces_the_row() {
        let storage = SqliteSessionStorage::open_in_memory().unwrap();
        let store = SessionStore::new(storage);
        store.set_session("old", "ann@example.com").unwrap();
        store.set_session("new", "bob@example.com").unwrap();

        let reloaded = store.load().unwrap();
        assert_eq!(reloaded.token, "new");
        assert_eq!(reloaded.user_identifier, "bob@example.com");
    }

    #[test]
    fn session_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.db");

        {
            let store = SessionStore::new(SqliteSessionStorage::open(&path).unwrap());
            store.set_session("durable", "ann@example.com").unwrap();
        }

        let store = SessionStore::new(SqliteSessionStorage::open(&path).unwrap());
        assert!(!store.is_authenticated());
        store.load();
        assert_eq!(store.token().as_deref(), Some("durable"));

        store.clear();
        let store = SessionStore::new(SqliteSessionStorage::open(&path).unwrap());
        assert_eq!(store.load(), None);
    }
}
