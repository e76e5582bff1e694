//! Project registry operations.
//!
//! Creating, registering, archiving and restoring projects, plus the
//! caller-driven activation hooks. Install and uninstall live in
//! [`crate::deploy`].

use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::bridge::ActivationBridge;
use crate::manifest::{DeploymentManifest, ManifestStore};
use crate::store::{
    Database, HistoryAction, HistoryEntry, HistoryLog, NewProject, Project, ProjectFilter,
    ProjectStore,
};
use crate::types::{ProjectKind, ProjectStatus, Visibility};
use crate::workspace::{WorkspaceMeta, default_workspace_path, scaffold_workspace};

/// Everything needed to scaffold and register a new project.
#[derive(Debug, Clone)]
pub struct CreateProject {
    pub codename: String,
    pub name: String,
    pub kind: ProjectKind,
    pub visibility: Visibility,
    pub version: String,
    pub description: Option<String>,
    pub author: Option<String>,
    /// Overrides the default `<workspaces>/<kind>s/<visibility>/<codename>`.
    pub workspace_path: Option<PathBuf>,
}

impl CreateProject {
    pub fn new(codename: impl Into<String>, name: impl Into<String>, kind: ProjectKind) -> Self {
        Self {
            codename: codename.into(),
            name: name.into(),
            kind,
            visibility: Visibility::default(),
            version: "1.0.0".to_string(),
            description: None,
            author: None,
            workspace_path: None,
        }
    }

    fn meta(&self) -> WorkspaceMeta {
        WorkspaceMeta {
            codename: self.codename.clone(),
            name: self.name.clone(),
            kind: self.kind,
            version: self.version.clone(),
            visibility: self.visibility,
            description: self.description.clone(),
            author: self.author.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProjectService {
    projects: ProjectStore,
    manifests: ManifestStore,
    history: HistoryLog,
    workspaces_dir: PathBuf,
}

impl ProjectService {
    pub fn new(db: Database, workspaces_dir: PathBuf) -> Self {
        Self {
            projects: db.projects(),
            manifests: ManifestStore::new(db.clone()),
            history: db.history(),
            workspaces_dir,
        }
    }

    pub fn workspaces_dir(&self) -> &Path {
        &self.workspaces_dir
    }

    /// Scaffold a workspace and register the project.
    pub fn create(&self, request: &CreateProject) -> anyhow::Result<Project> {
        let meta = request.meta();
        meta.validate()?;
        if self.projects.get(&request.codename)?.is_some() {
            anyhow::bail!("Project '{}' already exists", request.codename);
        }

        let workspace_path = request.workspace_path.clone().unwrap_or_else(|| {
            default_workspace_path(
                &self.workspaces_dir,
                request.kind,
                request.visibility,
                &request.codename,
            )
        });
        scaffold_workspace(&workspace_path, &meta)?;

        let project = self.register(&meta, workspace_path)?;
        self.record(&project.codename, HistoryAction::Created, None);
        tracing::info!(codename = %project.codename, kind = %project.kind, "created project");
        Ok(project)
    }

    /// Register a workspace that already carries a `meta.json`.
    pub fn register_existing(&self, workspace_path: &Path) -> anyhow::Result<Project> {
        let meta = WorkspaceMeta::load(workspace_path)?;
        meta.validate()?;
        let project = self.register(&meta, workspace_path.to_path_buf())?;
        self.record(
            &project.codename,
            HistoryAction::Created,
            Some("registered existing workspace"),
        );
        tracing::info!(codename = %project.codename, "registered project");
        Ok(project)
    }

    fn register(&self, meta: &WorkspaceMeta, workspace_path: PathBuf) -> anyhow::Result<Project> {
        let new = NewProject {
            codename: meta.codename.clone(),
            display_name: meta.name.clone(),
            kind: meta.kind,
            visibility: meta.visibility,
            version: meta.version.clone(),
            workspace_path,
        };
        self.projects
            .create(&new)
            .with_context(|| format!("Failed to register project '{}'", meta.codename))
    }

    pub fn get(&self, codename: &str) -> anyhow::Result<Option<Project>> {
        Ok(self.projects.get(codename)?)
    }

    pub fn require(&self, codename: &str) -> anyhow::Result<Project> {
        Ok(self.projects.require(codename)?)
    }

    pub fn list(&self, filter: &ProjectFilter) -> anyhow::Result<Vec<Project>> {
        Ok(self.projects.list(filter)?)
    }

    pub fn manifest(&self, codename: &str) -> anyhow::Result<DeploymentManifest> {
        Ok(self.manifests.get_manifest(codename)?)
    }

    pub fn history(&self, codename: Option<&str>, limit: usize) -> anyhow::Result<Vec<HistoryEntry>> {
        let entries = match codename {
            Some(codename) => self.history.for_project(codename, limit)?,
            None => self.history.recent(limit)?,
        };
        Ok(entries)
    }

    /// Copy the version from the workspace's `meta.json` into the registry.
    ///
    /// Returns the new version when it changed.
    pub fn sync_version(&self, codename: &str) -> anyhow::Result<Option<String>> {
        let project = self.projects.require(codename)?;
        let meta = WorkspaceMeta::load(&project.workspace_path)?;
        meta.validate()?;
        if meta.version == project.version {
            return Ok(None);
        }
        self.projects.set_version(codename, &meta.version)?;
        tracing::info!(codename, from = %project.version, to = %meta.version, "version updated");
        Ok(Some(meta.version))
    }

    /// Move a project out of active development.
    pub fn archive(&self, codename: &str) -> anyhow::Result<Project> {
        let project = self.projects.require(codename)?;
        if project.status != ProjectStatus::Development {
            anyhow::bail!(
                "Project '{}' is {}; only projects in development can be archived",
                codename,
                project.status
            );
        }
        self.projects
            .set_status(codename, ProjectStatus::Archived, None)?;
        self.record(codename, HistoryAction::Archived, None);
        Ok(self.projects.require(codename)?)
    }

    pub fn restore(&self, codename: &str) -> anyhow::Result<Project> {
        let project = self.projects.require(codename)?;
        if project.status != ProjectStatus::Archived {
            anyhow::bail!("Project '{}' is not archived", codename);
        }
        self.projects
            .set_status(codename, ProjectStatus::Development, None)?;
        self.record(codename, HistoryAction::Restored, None);
        Ok(self.projects.require(codename)?)
    }

    /// Run the host's activation routine for an installed project.
    pub fn activate(&self, bridge: &dyn ActivationBridge, codename: &str) -> anyhow::Result<String> {
        self.require_installed(codename)?;
        bridge
            .activate(codename)
            .with_context(|| format!("Failed to activate '{}'", codename))
    }

    pub fn deactivate(&self, bridge: &dyn ActivationBridge, codename: &str) -> anyhow::Result<String> {
        self.require_installed(codename)?;
        bridge
            .deactivate(codename)
            .with_context(|| format!("Failed to deactivate '{}'", codename))
    }

    fn require_installed(&self, codename: &str) -> anyhow::Result<()> {
        let project = self.projects.require(codename)?;
        if project.status != ProjectStatus::Installed {
            anyhow::bail!("Project '{}' is not installed", codename);
        }
        Ok(())
    }

    fn record(&self, codename: &str, action: HistoryAction, details: Option<&str>) {
        if let Err(err) = self.history.append(codename, action, details) {
            tracing::warn!(codename, action = action.as_str(), error = %err, "failed to record history");
        }
    }
}
