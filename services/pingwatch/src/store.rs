//! Target store: trait plus in-memory and SQLite implementations

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use tokio::sync::{Mutex, RwLock};

use crate::error::{PingwatchError, Result};
use crate::target::{NewTarget, Target, TargetStatus};

const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS targets (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    url TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'unknown',
    total_checks INTEGER NOT NULL DEFAULT 0,
    passed_checks INTEGER NOT NULL DEFAULT 0,
    last_checked_at INTEGER,
    created_at INTEGER NOT NULL
);
";

/// Durable table of monitored targets shared by the scheduler and the API
#[async_trait]
pub trait TargetStore: Send + Sync + std::fmt::Debug {
    /// All targets, ordered by id
    async fn list_targets(&self) -> Result<Vec<Target>>;

    /// Register a new target with unknown status and zeroed counters
    async fn insert_target(&self, new: NewTarget) -> Result<Target>;

    /// Persist the probe-derived fields of `target` (status, counters,
    /// last check time) in one write. Name, url and creation time are left
    /// as stored.
    async fn update_target(&self, target: &Target) -> Result<()>;
}

/// Volatile store used when no database path is configured, and in tests
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryInner>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    targets: Vec<Target>,
    last_id: i64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TargetStore for MemoryStore {
    async fn list_targets(&self) -> Result<Vec<Target>> {
        Ok(self.inner.read().await.targets.clone())
    }

    async fn insert_target(&self, new: NewTarget) -> Result<Target> {
        let mut inner = self.inner.write().await;
        if inner.targets.iter().any(|t| t.name == new.name) {
            return Err(PingwatchError::Conflict(format!(
                "a target named '{}' already exists",
                new.name
            )));
        }
        inner.last_id += 1;
        let target = Target::registered(inner.last_id, new, Utc::now());
        inner.targets.push(target.clone());
        Ok(target)
    }

    async fn update_target(&self, target: &Target) -> Result<()> {
        let mut inner = self.inner.write().await;
        let stored = inner
            .targets
            .iter_mut()
            .find(|t| t.id == target.id)
            .ok_or(PingwatchError::NotFound(target.id))?;
        stored.status = target.status;
        stored.total_checks = target.total_checks;
        stored.passed_checks = target.passed_checks;
        stored.last_checked_at = target.last_checked_at;
        Ok(())
    }
}

/// SQLite-backed target store
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("path", &self.path)
            .finish()
    }
}

impl SqliteStore {
    /// Open or create the database at `path`, creating parent directories
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        // WAL lets the API read while a sweep is writing
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        tracing::debug!("SQLite journal mode: {}", mode);
        conn.execute_batch(SCHEMA)?;
        tracing::info!("Opened target database at {:?}", path);

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: Some(path.to_path_buf()),
        })
    }

    /// Private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: None,
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            f(&conn)
        })
        .await
        .map_err(|e| PingwatchError::Storage(format!("database task failed: {}", e)))?
    }
}

#[async_trait]
impl TargetStore for SqliteStore {
    async fn list_targets(&self) -> Result<Vec<Target>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, url, status, total_checks, passed_checks, last_checked_at, created_at
                 FROM targets ORDER BY id",
            )?;
            let rows = stmt.query_map([], TargetRow::read)?;
            let mut targets = Vec::new();
            for row in rows {
                targets.push(Target::try_from(row?)?);
            }
            Ok(targets)
        })
        .await
    }

    async fn insert_target(&self, new: NewTarget) -> Result<Target> {
        self.with_conn(move |conn| {
            let created_at = Utc::now();
            conn.execute(
                "INSERT INTO targets (name, url, status, total_checks, passed_checks, created_at)
                 VALUES (?1, ?2, ?3, 0, 0, ?4)",
                params![
                    new.name,
                    new.url,
                    TargetStatus::Unknown.as_str(),
                    created_at.timestamp_millis()
                ],
            )
            .map_err(|e| match PingwatchError::from(e) {
                PingwatchError::Conflict(_) => PingwatchError::Conflict(format!(
                    "a target named '{}' already exists",
                    new.name
                )),
                other => other,
            })?;
            let id = conn.last_insert_rowid();
            // Stored at millisecond precision
            let created_at = from_epoch_ms(created_at.timestamp_millis())?;
            Ok(Target::registered(id, new, created_at))
        })
        .await
    }

    async fn update_target(&self, target: &Target) -> Result<()> {
        let target = target.clone();
        self.with_conn(move |conn| {
            let changed = conn.execute(
                "UPDATE targets
                 SET status = ?1, total_checks = ?2, passed_checks = ?3, last_checked_at = ?4
                 WHERE id = ?5",
                params![
                    target.status.as_str(),
                    to_sql_count(target.total_checks),
                    to_sql_count(target.passed_checks),
                    target.last_checked_at.map(|t| t.timestamp_millis()),
                    target.id
                ],
            )?;
            if changed == 0 {
                return Err(PingwatchError::NotFound(target.id));
            }
            Ok(())
        })
        .await
    }
}

/// A `targets` row before its columns are checked
struct TargetRow {
    id: i64,
    name: String,
    url: String,
    status: String,
    total_checks: i64,
    passed_checks: i64,
    last_checked_at: Option<i64>,
    created_at: i64,
}

impl TargetRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            url: row.get(2)?,
            status: row.get(3)?,
            total_checks: row.get(4)?,
            passed_checks: row.get(5)?,
            last_checked_at: row.get(6)?,
            created_at: row.get(7)?,
        })
    }
}

impl TryFrom<TargetRow> for Target {
    type Error = PingwatchError;

    fn try_from(row: TargetRow) -> Result<Self> {
        Ok(Target {
            id: row.id,
            name: row.name,
            url: row.url,
            status: row.status.parse()?,
            total_checks: row.total_checks.max(0) as u64,
            passed_checks: row.passed_checks.max(0) as u64,
            last_checked_at: row.last_checked_at.map(from_epoch_ms).transpose()?,
            created_at: from_epoch_ms(row.created_at)?,
        })
    }
}

fn to_sql_count(count: u64) -> i64 {
    i64::try_from(count).unwrap_or(i64::MAX)
}

fn from_epoch_ms(ms: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| PingwatchError::Storage(format!("timestamp {} out of range", ms)))
}
