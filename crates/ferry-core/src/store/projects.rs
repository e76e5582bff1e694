//! Project rows.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row, params};
use serde::Serialize;

use super::{
    Database, StoreError, StoreResult, option_timestamp_from_db, option_timestamp_to_db,
    timestamp_from_db, timestamp_to_db,
};
use crate::types::{ProjectKind, ProjectStatus, Visibility};

/// A registered plugin or theme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Project {
    pub id: i64,
    pub codename: String,
    pub display_name: String,
    pub kind: ProjectKind,
    pub visibility: Visibility,
    pub status: ProjectStatus,
    pub version: String,
    pub workspace_path: PathBuf,
    pub installed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields needed to register a project.
#[derive(Debug, Clone)]
pub struct NewProject {
    pub codename: String,
    pub display_name: String,
    pub kind: ProjectKind,
    pub visibility: Visibility,
    pub version: String,
    pub workspace_path: PathBuf,
}

#[derive(Debug, Clone, Default)]
pub struct ProjectFilter {
    pub kind: Option<ProjectKind>,
    pub status: Option<ProjectStatus>,
}

impl ProjectFilter {
    pub fn with_kind(mut self, kind: ProjectKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_status(mut self, status: ProjectStatus) -> Self {
        self.status = Some(status);
        self
    }
}

const PROJECT_COLUMNS: &str = "id, codename, display_name, kind, visibility, status, version, \
     workspace_path, installed_at, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct ProjectStore {
    db: Database,
}

impl ProjectStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn create(&self, project: &NewProject) -> StoreResult<Project> {
        let mut connection = self.db.connect()?;
        let transaction = connection.transaction()?;

        let exists = transaction
            .query_row(
                "SELECT 1 FROM projects WHERE codename = ?1",
                params![project.codename],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        if exists.is_some() {
            return Err(StoreError::ProjectExists(project.codename.clone()));
        }

        let now = Utc::now();
        transaction.execute(
            r#"
            INSERT INTO projects (
                codename, display_name, kind, visibility, status, version,
                workspace_path, installed_at, deployed_manifest, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, NULL, NULL, ?8, ?8)
            "#,
            params![
                project.codename,
                project.display_name,
                project.kind.as_str(),
                project.visibility.as_str(),
                ProjectStatus::Development.as_str(),
                project.version,
                project.workspace_path.to_string_lossy(),
                timestamp_to_db(now),
            ],
        )?;
        let id = transaction.last_insert_rowid();
        transaction.commit()?;

        Ok(Project {
            id,
            codename: project.codename.clone(),
            display_name: project.display_name.clone(),
            kind: project.kind,
            visibility: project.visibility,
            status: ProjectStatus::Development,
            version: project.version.clone(),
            workspace_path: project.workspace_path.clone(),
            installed_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn get(&self, codename: &str) -> StoreResult<Option<Project>> {
        let connection = self.db.connect()?;
        let raw = connection
            .query_row(
                &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE codename = ?1"),
                params![codename],
                RawProject::from_row,
            )
            .optional()?;
        raw.map(RawProject::into_project).transpose()
    }

    /// Like [`get`](Self::get), but a missing project is an error.
    pub fn require(&self, codename: &str) -> StoreResult<Project> {
        self.get(codename)?
            .ok_or_else(|| StoreError::ProjectNotFound(codename.to_string()))
    }

    pub fn list(&self, filter: &ProjectFilter) -> StoreResult<Vec<Project>> {
        let connection = self.db.connect()?;
        let mut statement = connection.prepare(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects \
             WHERE (?1 IS NULL OR kind = ?1) AND (?2 IS NULL OR status = ?2) \
             ORDER BY codename"
        ))?;
        let rows = statement.query_map(
            params![
                filter.kind.map(ProjectKind::as_str),
                filter.status.map(ProjectStatus::as_str),
            ],
            RawProject::from_row,
        )?;
        let mut projects = Vec::new();
        for row in rows {
            projects.push(row?.into_project()?);
        }
        Ok(projects)
    }

    /// Atomic single-row status update.
    pub fn set_status(
        &self,
        codename: &str,
        status: ProjectStatus,
        installed_at: Option<DateTime<Utc>>,
    ) -> StoreResult<()> {
        let connection = self.db.connect()?;
        let updated = connection.execute(
            "UPDATE projects SET status = ?2, installed_at = ?3, updated_at = ?4 WHERE codename = ?1",
            params![
                codename,
                status.as_str(),
                option_timestamp_to_db(installed_at),
                timestamp_to_db(Utc::now()),
            ],
        )?;
        if updated == 0 {
            return Err(StoreError::ProjectNotFound(codename.to_string()));
        }
        Ok(())
    }

    pub fn set_version(&self, codename: &str, version: &str) -> StoreResult<()> {
        let connection = self.db.connect()?;
        let updated = connection.execute(
            "UPDATE projects SET version = ?2, updated_at = ?3 WHERE codename = ?1",
            params![codename, version, timestamp_to_db(Utc::now())],
        )?;
        if updated == 0 {
            return Err(StoreError::ProjectNotFound(codename.to_string()));
        }
        Ok(())
    }
}

struct RawProject {
    id: i64,
    codename: String,
    display_name: String,
    kind: String,
    visibility: String,
    status: String,
    version: String,
    workspace_path: String,
    installed_at: Option<String>,
    created_at: String,
    updated_at: String,
}

impl RawProject {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            codename: row.get(1)?,
            display_name: row.get(2)?,
            kind: row.get(3)?,
            visibility: row.get(4)?,
            status: row.get(5)?,
            version: row.get(6)?,
            workspace_path: row.get(7)?,
            installed_at: row.get(8)?,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
        })
    }

    fn into_project(self) -> StoreResult<Project> {
        Ok(Project {
            id: self.id,
            kind: kind_from_db(&self.kind)?,
            visibility: visibility_from_db(&self.visibility)?,
            status: status_from_db(&self.status)?,
            installed_at: option_timestamp_from_db(self.installed_at)?,
            created_at: timestamp_from_db(&self.created_at)?,
            updated_at: timestamp_from_db(&self.updated_at)?,
            codename: self.codename,
            display_name: self.display_name,
            version: self.version,
            workspace_path: PathBuf::from(self.workspace_path),
        })
    }
}

fn kind_from_db(value: &str) -> StoreResult<ProjectKind> {
    match value {
        "plugin" => Ok(ProjectKind::Plugin),
        "theme" => Ok(ProjectKind::Theme),
        _ => Err(StoreError::InvalidPersistedValue {
            field: "kind",
            value: value.to_string(),
        }),
    }
}

fn visibility_from_db(value: &str) -> StoreResult<Visibility> {
    match value {
        "public" => Ok(Visibility::Public),
        "private" => Ok(Visibility::Private),
        _ => Err(StoreError::InvalidPersistedValue {
            field: "visibility",
            value: value.to_string(),
        }),
    }
}

fn status_from_db(value: &str) -> StoreResult<ProjectStatus> {
    match value {
        "development" => Ok(ProjectStatus::Development),
        "installed" => Ok(ProjectStatus::Installed),
        "archived" => Ok(ProjectStatus::Archived),
        _ => Err(StoreError::InvalidPersistedValue {
            field: "status",
            value: value.to_string(),
        }),
    }
}
