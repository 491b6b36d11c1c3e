use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{BoardError, Result};
use crate::models::{Record, View};
use crate::store::StoreBackend;

/// Local SQLite file: the latest fetched records per view and stored filter preferences.
pub struct Database {
    conn: Connection,
    path: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotInfo {
    pub view: View,
    pub records: usize,
    pub fetched_at: String,
}

impl Database {
    pub fn open() -> Result<Self> {
        let path = Self::default_path();
        Self::open_at(&path)
    }

    pub fn open_at(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn default_path() -> PathBuf {
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "nursejobs") {
            proj_dirs.data_dir().join("nursejobs.db")
        } else {
            PathBuf::from("nursejobs.db")
        }
    }

    pub fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS record_snapshots (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                view TEXT NOT NULL CHECK (view IN ('candidates', 'wishlist', 'jobs', 'saved-jobs')),
                position INTEGER NOT NULL,
                record_json TEXT NOT NULL,
                fetched_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS filter_prefs (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                expires_at TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX IF NOT EXISTS idx_snapshots_view ON record_snapshots(view, position);
            "#,
        )?;
        Ok(())
    }

    pub fn ensure_initialized(&self) -> Result<()> {
        let tables: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='record_snapshots'",
            [],
            |row| row.get(0),
        )?;
        if tables == 0 {
            return Err(BoardError::NotInitialized);
        }
        Ok(())
    }

    // --- Snapshot operations ---

    /// Swap in a freshly fetched record list for `view`, keeping fetch order.
    pub fn replace_snapshot(&self, view: View, records: &[Record]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM record_snapshots WHERE view = ?1", [view.as_str()])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO record_snapshots (view, position, record_json) VALUES (?1, ?2, ?3)",
            )?;
            for (position, record) in records.iter().enumerate() {
                let json = serde_json::to_string(record)?;
                stmt.execute(params![view.as_str(), position as i64, json])?;
            }
        }
        tx.commit()?;
        debug!(view = %view, count = records.len(), "Replaced snapshot");
        Ok(records.len())
    }

    pub fn load_snapshot(&self, view: View) -> Result<Vec<Record>> {
        let mut stmt = self.conn.prepare(
            "SELECT record_json FROM record_snapshots WHERE view = ?1 ORDER BY position",
        )?;
        let rows = stmt.query_map([view.as_str()], |row| row.get::<_, String>(0))?;

        let mut records = Vec::new();
        for json in rows {
            records.push(serde_json::from_str(&json?)?);
        }
        Ok(records)
    }

    pub fn snapshot_info(&self, view: View) -> Result<Option<SnapshotInfo>> {
        let row: Option<(i64, Option<String>)> = self
            .conn
            .query_row(
                "SELECT COUNT(*), MAX(fetched_at) FROM record_snapshots WHERE view = ?1",
                [view.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        Ok(match row {
            Some((count, Some(fetched_at))) if count > 0 => Some(SnapshotInfo {
                view,
                records: count as usize,
                fetched_at,
            }),
            _ => None,
        })
    }

    // --- Filter preference operations ---

    pub fn prefs(&self) -> PrefsTable<'_> {
        PrefsTable { db: self }
    }

    pub fn purge_expired_prefs(&self) -> Result<usize> {
        let now = timestamp(Utc::now());
        let removed = self
            .conn
            .execute("DELETE FROM filter_prefs WHERE expires_at <= ?1", [now])?;
        Ok(removed)
    }
}

/// Fixed-width UTC text so stored expiries compare correctly as strings.
fn timestamp(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// `filter_prefs` as a filter store backend.
pub struct PrefsTable<'a> {
    db: &'a Database,
}

impl StoreBackend for PrefsTable<'_> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let row: Option<(String, String)> = self
            .db
            .conn
            .query_row(
                "SELECT value, expires_at FROM filter_prefs WHERE key = ?1",
                [key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        Ok(row.and_then(|(value, expires_at)| {
            let live = DateTime::parse_from_rfc3339(&expires_at)
                .map(|t| t.with_timezone(&Utc) > Utc::now())
                .unwrap_or(false);
            live.then_some(value)
        }))
    }

    fn set(&mut self, key: &str, value: &str, expires_at: DateTime<Utc>) -> Result<()> {
        self.db.conn.execute(
            "INSERT INTO filter_prefs (key, value, expires_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                 expires_at = excluded.expires_at, updated_at = datetime('now')",
            params![key, value, timestamp(expires_at)],
        )?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.db
            .conn
            .execute("DELETE FROM filter_prefs WHERE key = ?1", [key])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterState;
    use crate::store::FilterStore;
    use chrono::Duration;
    use serde_json::json;
    use tempfile::tempdir;

    fn test_db() -> (tempfile::TempDir, Database) {
        let dir = tempdir().expect("Failed to create temp dir");
        let db = Database::open_at(&dir.path().join("test.db")).unwrap();
        db.init().unwrap();
        (dir, db)
    }

    #[test]
    fn test_uninitialized_database_is_reported() {
        let dir = tempdir().expect("Failed to create temp dir");
        let db = Database::open_at(&dir.path().join("fresh.db")).unwrap();
        assert!(matches!(db.ensure_initialized(), Err(BoardError::NotInitialized)));
        db.init().unwrap();
        assert!(db.ensure_initialized().is_ok());
    }

    #[test]
    fn test_snapshot_round_trip_keeps_order() {
        let (_dir, db) = test_db();
        let records = vec![
            Record::from(json!({"id": 2, "title": "Midwife"})),
            Record::from(json!({"id": 1, "title": "Registered Nurse"})),
        ];
        assert_eq!(db.replace_snapshot(View::Jobs, &records).unwrap(), 2);
        assert_eq!(db.load_snapshot(View::Jobs).unwrap(), records);
        assert!(db.load_snapshot(View::SavedJobs).unwrap().is_empty());
    }

    #[test]
    fn test_replace_snapshot_discards_previous() {
        let (_dir, db) = test_db();
        db.replace_snapshot(View::Candidates, &[Record::from(json!({"id": 1}))])
            .unwrap();
        db.replace_snapshot(View::Candidates, &[Record::from(json!({"id": 9}))])
            .unwrap();
        let loaded = db.load_snapshot(View::Candidates).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id(), Some("9".to_string()));

        let info = db.snapshot_info(View::Candidates).unwrap().unwrap();
        assert_eq!(info.records, 1);
        assert!(db.snapshot_info(View::Wishlist).unwrap().is_none());
    }

    #[test]
    fn test_prefs_table_as_filter_store() {
        let (_dir, db) = test_db();
        let mut store = FilterStore::new(db.prefs());
        let state = FilterState {
            location: "Darwin".to_string(),
            pay_rate: 38.0,
            ..Default::default()
        };
        store.save(View::Wishlist, &state).unwrap();
        assert_eq!(store.load(View::Wishlist).unwrap(), state);
        assert_eq!(store.load(View::Candidates).unwrap(), FilterState::default());

        store.clear(View::Wishlist).unwrap();
        assert_eq!(store.load(View::Wishlist).unwrap(), FilterState::default());
    }

    #[test]
    fn test_expired_prefs_are_hidden_and_purged() {
        let (_dir, db) = test_db();
        let mut prefs = db.prefs();
        prefs
            .set("jobFilters_search", "\"old\"", Utc::now() - Duration::days(1))
            .unwrap();
        assert_eq!(prefs.get("jobFilters_search").unwrap(), None);
        assert_eq!(db.purge_expired_prefs().unwrap(), 1);
    }
}
