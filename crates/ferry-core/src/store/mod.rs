//! SQLite-backed persistence for projects, deployment manifests and history.
//!
//! Every public write commits in its own transaction. There is no
//! transaction spanning several writes; callers sequence them.

pub mod diagnostics;
pub mod history;
pub mod projects;

use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use thiserror::Error;

pub use diagnostics::{ConnectionDiagnostics, DiagnosticsSnapshot};
pub use history::{HistoryAction, HistoryEntry, HistoryLog};
pub use projects::{NewProject, Project, ProjectFilter, ProjectStore};

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors returned by the store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("project '{0}' already exists")]
    ProjectExists(String),
    #[error("project '{0}' not found")]
    ProjectNotFound(String),
    #[error("invalid persisted value for '{field}': {value}")]
    InvalidPersistedValue { field: &'static str, value: String },
    #[error("unrecognized manifest shape for '{codename}': {reason}")]
    InvalidManifest { codename: String, reason: String },
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Chrono(#[from] chrono::ParseError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Handle on the state database. Cheap to clone; connections are opened
/// per operation.
#[derive(Debug, Clone)]
pub struct Database {
    db_path: PathBuf,
    diagnostics: Arc<ConnectionDiagnostics>,
}

impl Database {
    /// Open (creating if needed) the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::open_with_diagnostics(path, Arc::new(ConnectionDiagnostics::new()))
    }

    /// Open the database, accounting connections in `diagnostics`.
    pub fn open_with_diagnostics(
        path: impl AsRef<Path>,
        diagnostics: Arc<ConnectionDiagnostics>,
    ) -> StoreResult<Self> {
        let db_path = path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let database = Self {
            db_path,
            diagnostics,
        };
        let connection = database.connect()?;
        initialize_schema(&connection)?;
        Ok(database)
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    pub fn diagnostics(&self) -> &ConnectionDiagnostics {
        &self.diagnostics
    }

    pub fn projects(&self) -> ProjectStore {
        ProjectStore::new(self.clone())
    }

    pub fn history(&self) -> HistoryLog {
        HistoryLog::new(self.clone())
    }

    pub(crate) fn connect(&self) -> StoreResult<TrackedConnection> {
        let connection = match open_connection(&self.db_path) {
            Ok(connection) => connection,
            Err(err) => {
                self.diagnostics.record_failure();
                return Err(err);
            }
        };
        self.diagnostics.record_open();
        Ok(TrackedConnection {
            connection,
            diagnostics: Arc::clone(&self.diagnostics),
        })
    }
}

/// A connection that reports its own close to the diagnostics collector.
pub(crate) struct TrackedConnection {
    connection: Connection,
    diagnostics: Arc<ConnectionDiagnostics>,
}

impl Deref for TrackedConnection {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        &self.connection
    }
}

impl DerefMut for TrackedConnection {
    fn deref_mut(&mut self) -> &mut Connection {
        &mut self.connection
    }
}

impl Drop for TrackedConnection {
    fn drop(&mut self) {
        self.diagnostics.record_close();
    }
}

fn open_connection(path: &Path) -> StoreResult<Connection> {
    let connection = Connection::open(path)?;
    connection.busy_timeout(Duration::from_secs(5))?;
    connection.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
        "#,
    )?;
    Ok(connection)
}

fn initialize_schema(connection: &Connection) -> StoreResult<()> {
    connection.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS projects (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            codename TEXT NOT NULL UNIQUE,
            display_name TEXT NOT NULL,
            kind TEXT NOT NULL,
            visibility TEXT NOT NULL,
            status TEXT NOT NULL,
            version TEXT NOT NULL,
            workspace_path TEXT NOT NULL,
            installed_at TEXT NULL,
            deployed_manifest TEXT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            project_id INTEGER NOT NULL,
            action TEXT NOT NULL,
            details TEXT NULL,
            timestamp TEXT NOT NULL,
            FOREIGN KEY(project_id) REFERENCES projects(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_history_project ON history (project_id, id);
        "#,
    )?;
    Ok(())
}

pub(crate) fn timestamp_to_db(value: DateTime<Utc>) -> String {
    value.to_rfc3339()
}

pub(crate) fn option_timestamp_to_db(value: Option<DateTime<Utc>>) -> Option<String> {
    value.map(timestamp_to_db)
}

pub(crate) fn timestamp_from_db(value: &str) -> StoreResult<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)?.with_timezone(&Utc))
}

pub(crate) fn option_timestamp_from_db(value: Option<String>) -> StoreResult<Option<DateTime<Utc>>> {
    value.as_deref().map(timestamp_from_db).transpose()
}
