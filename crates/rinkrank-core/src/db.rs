// SQLite persistence for the player annotation snapshot.

use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use rusqlite::{params, Connection};

/// SQLite-backed key-value table of per-player annotation values.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a SQLite database at `path` and ensure the table
    /// exists. Pass `":memory:"` for an ephemeral in-memory database.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS player_meta (
                player_id TEXT PRIMARY KEY,
                value     TEXT NOT NULL
            );
            ",
        )
        .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the database connection.
    ///
    /// Panics if the mutex is poisoned (another thread panicked while
    /// holding the lock).
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    /// Replace the whole table with `entries` in one transaction.
    pub fn replace_all(&self, entries: &[(String, serde_json::Value)]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin transaction")?;
        tx.execute("DELETE FROM player_meta", [])
            .context("failed to clear player_meta")?;
        {
            let mut stmt = tx
                .prepare("INSERT INTO player_meta (player_id, value) VALUES (?1, ?2)")
                .context("failed to prepare player_meta insert")?;
            for (player_id, value) in entries {
                let json_str =
                    serde_json::to_string(value).context("failed to serialize meta value")?;
                stmt.execute(params![player_id, json_str])
                    .with_context(|| format!("failed to insert meta for player {player_id}"))?;
            }
        }
        tx.commit().context("failed to commit player_meta snapshot")?;
        Ok(())
    }

    /// Load every stored entry, ordered by player id.
    pub fn load_all(&self) -> Result<Vec<(String, serde_json::Value)>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT player_id, value FROM player_meta ORDER BY player_id")
            .context("failed to prepare load_all query")?;

        let rows = stmt
            .query_map([], |row| {
                let id: String = row.get(0)?;
                let json_str: String = row.get(1)?;
                Ok((id, json_str))
            })
            .context("failed to query player_meta")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map player_meta rows")?;

        rows.into_iter()
            .map(|(id, json_str)| {
                let value = serde_json::from_str(&json_str)
                    .with_context(|| format!("failed to deserialize meta for player {id}"))?;
                Ok((id, value))
            })
            .collect()
    }

    /// Number of stored entries.
    pub fn count(&self) -> Result<usize> {
        let conn = self.conn();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM player_meta", [], |row| row.get(0))
            .context("failed to count player_meta rows")?;
        Ok(count as usize)
    }
}
