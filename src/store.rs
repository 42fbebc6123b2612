use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::info;

use crate::model::ScanResultEntry;

pub const SITES_KEY: &str = "sites";
pub const RESULTS_KEY: &str = "scanResults";

/// Local key/value storage with JSON-encoded values.
pub struct Store {
    conn: Mutex<Connection>,
}

pub fn default_store_path() -> Result<PathBuf> {
    let home = env::var("HOME").or_else(|_| env::var("USERPROFILE"))?;
    Ok(PathBuf::from(home).join(".medalscan/store.db"))
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create store directory {:?}", parent))?;
            }
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open store at {:?}", path))?;
        info!(action = "open", component = "store", path = ?path, "Opened store");
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS entries (key TEXT PRIMARY KEY, value TEXT NOT NULL)",
        )
        .context("Failed to initialize store schema")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| anyhow!("Store lock poisoned"))
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let raw: Option<String> = self
            .conn()?
            .query_row(
                "SELECT value FROM entries WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .with_context(|| format!("Failed to read '{}'", key))?;

        raw.map(|s| {
            serde_json::from_str(&s).with_context(|| format!("Corrupt value stored under '{}'", key))
        })
        .transpose()
    }

    /// Replaces the value under `key` in a single statement.
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.conn()?
            .execute(
                "INSERT INTO entries (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, raw],
            )
            .with_context(|| format!("Failed to write '{}'", key))?;
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        self.conn()?
            .execute("DELETE FROM entries WHERE key = ?1", params![key])
            .with_context(|| format!("Failed to remove '{}'", key))?;
        Ok(())
    }

    pub fn sites(&self) -> Result<Vec<String>> {
        Ok(self.get(SITES_KEY)?.unwrap_or_default())
    }

    pub fn set_sites(&self, sites: &[String]) -> Result<()> {
        self.set(SITES_KEY, sites)
    }

    pub fn results(&self) -> Result<Option<Vec<ScanResultEntry>>> {
        self.get(RESULTS_KEY)
    }

    pub fn set_results(&self, results: &[ScanResultEntry]) -> Result<()> {
        self.set(RESULTS_KEY, results)
    }

    pub fn clear_results(&self) -> Result<()> {
        self.remove(RESULTS_KEY)
    }
}
