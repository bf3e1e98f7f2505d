//! SQLite-backed tracking store.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, SecondsFormat};
use rusqlite::{params, Connection};
use tracing::debug;

use super::{TrackingError, TrackingSnapshot, TrackingStore};

pub struct SqliteTrackingStore {
    conn: Mutex<Connection>,
}

impl SqliteTrackingStore {
    /// Open the database file, creating it and its table if needed.
    pub fn new(path: &Path) -> Result<Self, TrackingError> {
        let conn = Connection::open(path)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store (useful for testing).
    pub fn in_memory() -> Result<Self, TrackingError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), TrackingError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS file_tracking (
                path TEXT PRIMARY KEY,
                created_at TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, TrackingError> {
        self.conn
            .lock()
            .map_err(|e| TrackingError::Database(format!("connection lock poisoned: {}", e)))
    }
}

impl TrackingStore for SqliteTrackingStore {
    fn load(&self) -> Result<TrackingSnapshot, TrackingError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT path, created_at FROM file_tracking ORDER BY path")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut snapshot = TrackingSnapshot::new();
        for row in rows {
            let (path, value) = row?;
            let created_at = DateTime::parse_from_rfc3339(&value).map_err(|_| {
                TrackingError::Corrupt {
                    path: path.clone(),
                    value: value.clone(),
                }
            })?;
            snapshot.insert(PathBuf::from(path), created_at);
        }
        Ok(snapshot)
    }

    fn save(&self, snapshot: &TrackingSnapshot) -> Result<(), TrackingError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM file_tracking", [])?;
        {
            let mut stmt =
                tx.prepare("INSERT INTO file_tracking (path, created_at) VALUES (?1, ?2)")?;
            for (path, created_at) in snapshot {
                stmt.execute(params![
                    path.to_string_lossy(),
                    created_at.to_rfc3339_opts(SecondsFormat::AutoSi, false)
                ])?;
            }
        }
        tx.commit()?;
        debug!(entries = snapshot.len(), "Saved tracking snapshot");
        Ok(())
    }
}
