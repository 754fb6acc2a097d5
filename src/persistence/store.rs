//! SQLite-backed farm store.
//!
//! A single key-value table holds JSON documents under `farms` and
//! `active_farm_id`. Actuator state and timestamps round-trip through serde.

use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Mutex, MutexGuard};

use super::{FarmRecord, FarmStore};
use crate::farm::FarmId;

const FARMS_KEY: &str = "farms";
const ACTIVE_FARM_KEY: &str = "active_farm_id";

/// Persists the farm list in SQLite.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (or creates) the SQLite database and ensures the table exists.
    pub fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open farm DB at {}", db_path))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.create_table()?;
        Ok(store)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("farm DB connection lock poisoned"))
    }

    fn create_table(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )
        .context("Failed to create kv table")?;
        Ok(())
    }

    fn get(conn: &Connection, key: &str) -> Result<Option<String>> {
        conn.query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
            row.get(0)
        })
        .optional()
        .with_context(|| format!("Failed to read key '{}'", key))
    }

    fn put(conn: &Connection, key: &str, value: &str) -> Result<()> {
        conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )
        .with_context(|| format!("Failed to write key '{}'", key))?;
        Ok(())
    }

    fn delete(conn: &Connection, key: &str) -> Result<()> {
        conn.execute("DELETE FROM kv WHERE key = ?1", params![key])
            .with_context(|| format!("Failed to delete key '{}'", key))?;
        Ok(())
    }

    fn write_active(conn: &Connection, id: Option<&FarmId>) -> Result<()> {
        match id {
            Some(id) => Self::put(conn, ACTIVE_FARM_KEY, id.as_str()),
            None => Self::delete(conn, ACTIVE_FARM_KEY),
        }
    }
}

impl FarmStore for SqliteStore {
    fn load_farms(&self) -> Result<Vec<FarmRecord>> {
        let conn = self.lock()?;
        match Self::get(&conn, FARMS_KEY)? {
            Some(json) => serde_json::from_str(&json).context("Failed to parse stored farm list"),
            None => Ok(Vec::new()),
        }
    }

    fn save_farms(&self, farms: &[FarmRecord]) -> Result<()> {
        let json = serde_json::to_string(farms).context("Failed to serialize farm list")?;
        let conn = self.lock()?;
        Self::put(&conn, FARMS_KEY, &json)
    }

    fn load_active_farm_id(&self) -> Result<Option<FarmId>> {
        let conn = self.lock()?;
        Ok(Self::get(&conn, ACTIVE_FARM_KEY)?.map(FarmId::from))
    }

    fn save_active_farm_id(&self, id: Option<&FarmId>) -> Result<()> {
        let conn = self.lock()?;
        Self::write_active(&conn, id)
    }

    /// Both keys in one transaction
    fn save_all(&self, farms: &[FarmRecord], active: Option<&FarmId>) -> Result<()> {
        let json = serde_json::to_string(farms).context("Failed to serialize farm list")?;
        let mut conn = self.lock()?;
        let tx = conn.transaction().context("Failed to begin transaction")?;
        Self::put(&tx, FARMS_KEY, &json)?;
        Self::write_active(&tx, active)?;
        tx.commit().context("Failed to commit farm state")?;
        Ok(())
    }
}
