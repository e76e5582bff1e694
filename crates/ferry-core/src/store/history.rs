//! Append-only audit log of lifecycle transitions.
//!
//! Entries are written after the state change they describe has committed.
//! A missing entry for an applied change is tolerated; an entry for a change
//! that never happened is not.

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row, params};
use serde::Serialize;

use super::{Database, StoreError, StoreResult, timestamp_from_db, timestamp_to_db};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryAction {
    Created,
    Installed,
    Uninstalled,
    Archived,
    Restored,
}

impl HistoryAction {
    pub fn as_str(self) -> &'static str {
        match self {
            HistoryAction::Created => "created",
            HistoryAction::Installed => "installed",
            HistoryAction::Uninstalled => "uninstalled",
            HistoryAction::Archived => "archived",
            HistoryAction::Restored => "restored",
        }
    }

    fn from_db(value: &str) -> StoreResult<Self> {
        match value {
            "created" => Ok(HistoryAction::Created),
            "installed" => Ok(HistoryAction::Installed),
            "uninstalled" => Ok(HistoryAction::Uninstalled),
            "archived" => Ok(HistoryAction::Archived),
            "restored" => Ok(HistoryAction::Restored),
            _ => Err(StoreError::InvalidPersistedValue {
                field: "history_action",
                value: value.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub project_id: i64,
    pub codename: String,
    pub action: HistoryAction,
    pub details: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct HistoryLog {
    db: Database,
}

impl HistoryLog {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn append(
        &self,
        codename: &str,
        action: HistoryAction,
        details: Option<&str>,
    ) -> StoreResult<HistoryEntry> {
        let mut connection = self.db.connect()?;
        let transaction = connection.transaction()?;
        let project_id = transaction
            .query_row(
                "SELECT id FROM projects WHERE codename = ?1",
                params![codename],
                |row| row.get::<_, i64>(0),
            )
            .optional()?
            .ok_or_else(|| StoreError::ProjectNotFound(codename.to_string()))?;

        let timestamp = Utc::now();
        transaction.execute(
            "INSERT INTO history (project_id, action, details, timestamp) VALUES (?1, ?2, ?3, ?4)",
            params![
                project_id,
                action.as_str(),
                details,
                timestamp_to_db(timestamp)
            ],
        )?;
        let id = transaction.last_insert_rowid();
        transaction.commit()?;

        Ok(HistoryEntry {
            id,
            project_id,
            codename: codename.to_string(),
            action,
            details: details.map(str::to_string),
            timestamp,
        })
    }

    /// Entries for one project, newest first.
    pub fn for_project(&self, codename: &str, limit: usize) -> StoreResult<Vec<HistoryEntry>> {
        let connection = self.db.connect()?;
        let mut statement = connection.prepare(
            "SELECT h.id, h.project_id, p.codename, h.action, h.details, h.timestamp \
             FROM history h JOIN projects p ON p.id = h.project_id \
             WHERE p.codename = ?1 ORDER BY h.id DESC LIMIT ?2",
        )?;
        let rows = statement.query_map(params![codename, limit as i64], RawEntry::from_row)?;
        collect_entries(rows)
    }

    /// Entries across all projects, newest first.
    pub fn recent(&self, limit: usize) -> StoreResult<Vec<HistoryEntry>> {
        let connection = self.db.connect()?;
        let mut statement = connection.prepare(
            "SELECT h.id, h.project_id, p.codename, h.action, h.details, h.timestamp \
             FROM history h JOIN projects p ON p.id = h.project_id \
             ORDER BY h.id DESC LIMIT ?1",
        )?;
        let rows = statement.query_map(params![limit as i64], RawEntry::from_row)?;
        collect_entries(rows)
    }
}

struct RawEntry {
    id: i64,
    project_id: i64,
    codename: String,
    action: String,
    details: Option<String>,
    timestamp: String,
}

impl RawEntry {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            project_id: row.get(1)?,
            codename: row.get(2)?,
            action: row.get(3)?,
            details: row.get(4)?,
            timestamp: row.get(5)?,
        })
    }
}

fn collect_entries(
    rows: impl Iterator<Item = rusqlite::Result<RawEntry>>,
) -> StoreResult<Vec<HistoryEntry>> {
    let mut entries = Vec::new();
    for row in rows {
        let raw = row?;
        entries.push(HistoryEntry {
            id: raw.id,
            project_id: raw.project_id,
            action: HistoryAction::from_db(&raw.action)?,
            timestamp: timestamp_from_db(&raw.timestamp)?,
            codename: raw.codename,
            details: raw.details,
        });
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::NewProject;
    use crate::types::{ProjectKind, Visibility};
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn setup() -> (tempfile::TempDir, Database) {
        let temp = tempdir().expect("create tempdir");
        let db = Database::open(temp.path().join("ferry.db")).expect("open db");
        for codename in ["widget", "gadget"] {
            db.projects()
                .create(&NewProject {
                    codename: codename.to_string(),
                    display_name: codename.to_string(),
                    kind: ProjectKind::Plugin,
                    visibility: Visibility::Private,
                    version: "1.0.0".to_string(),
                    workspace_path: PathBuf::from("/ws").join(codename),
                })
                .expect("create project");
        }
        (temp, db)
    }

    #[test]
    fn entries_come_back_newest_first() {
        let (_temp, db) = setup();
        let log = db.history();
        log.append("widget", HistoryAction::Created, None).unwrap();
        log.append("widget", HistoryAction::Installed, Some("2 files"))
            .unwrap();
        log.append("gadget", HistoryAction::Created, None).unwrap();

        let widget = log.for_project("widget", 10).unwrap();
        assert_eq!(
            widget.iter().map(|e| e.action).collect::<Vec<_>>(),
            vec![HistoryAction::Installed, HistoryAction::Created]
        );
        assert_eq!(widget[0].details.as_deref(), Some("2 files"));

        let recent = log.recent(2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].codename, "gadget");
    }

    #[test]
    fn append_for_unknown_project_fails_without_writing() {
        let (_temp, db) = setup();
        let log = db.history();
        assert!(matches!(
            log.append("missing", HistoryAction::Installed, None),
            Err(StoreError::ProjectNotFound(_))
        ));
        assert!(log.recent(10).unwrap().is_empty());
    }
}
