use std::sync::Mutex;

use anyhow::{Context, Result};
use rusqlite::{Connection, OpenFlags, OptionalExtension};

use super::AllowList;

/// Allow-list kept in a SQLite `subscribers` table.
///
/// Opened read-only: rows are provisioned out of band and the service
/// never writes to the database.
pub struct SqliteAllowList {
    conn: Mutex<Connection>,
}

impl SqliteAllowList {
    /// Open an existing database that has a `subscribers (id, name)` table.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("failed to open allow-list database {path}"))?;
        Self::from_connection(conn)
    }

    /// Wrap an already-open connection (tests use `:memory:`).
    pub fn from_connection(conn: Connection) -> Result<Self> {
        conn.query_row("SELECT COUNT(*) FROM subscribers", [], |row| {
            row.get::<_, i64>(0)
        })
        .context("allow-list database has no usable subscribers table")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl AllowList for SqliteAllowList {
    fn lookup(&self, id: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().unwrap();
        let name = conn
            .query_row("SELECT name FROM subscribers WHERE id = ?1", [id], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(name)
    }

    fn len(&self) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM subscribers", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> SqliteAllowList {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE subscribers (id TEXT PRIMARY KEY, name TEXT NOT NULL);
             INSERT INTO subscribers (id, name) VALUES ('u1', 'Alex'), ('42', 'Sam');",
        )
        .unwrap();
        SqliteAllowList::from_connection(conn).unwrap()
    }

    #[test]
    fn lookup_known_and_unknown() {
        let list = seeded();
        assert_eq!(list.lookup("u1").unwrap().as_deref(), Some("Alex"));
        assert_eq!(list.lookup("42").unwrap().as_deref(), Some("Sam"));
        assert!(list.lookup("nobody").unwrap().is_none());
    }

    #[test]
    fn len_counts_rows() {
        assert_eq!(seeded().len().unwrap(), 2);
    }

    #[test]
    fn missing_table_is_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(SqliteAllowList::from_connection(conn).is_err());
    }

    #[test]
    fn open_file_read_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("subs.db");
        let path_str = path.to_str().unwrap();
        {
            let conn = Connection::open(path_str).unwrap();
            conn.execute_batch(
                "CREATE TABLE subscribers (id TEXT PRIMARY KEY, name TEXT NOT NULL);
                 INSERT INTO subscribers VALUES ('777', 'Robin');",
            )
            .unwrap();
        }

        let list = SqliteAllowList::open(path_str).unwrap();
        assert_eq!(list.lookup("777").unwrap().as_deref(), Some("Robin"));
    }

    #[test]
    fn open_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.db");
        assert!(SqliteAllowList::open(path.to_str().unwrap()).is_err());
    }
}
