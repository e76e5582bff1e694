//! Overlay installer.
//!
//! Copies a workspace onto the host tree file by file. Each file is handled
//! independently: a failure becomes a warning and the next file is tried.
//! The manifest written at the end lists exactly what landed, so the
//! uninstaller always works from real filesystem state, even after a
//! partial install.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};

use super::backup::BackupWriter;
use super::report::{DeployResult, LifecycleError, Warning, WarningKind};
use crate::bridge::{ThemeBridge, ThemeResource, ThemeResourceKind};
use crate::fs::{
    bytes_checksum, copy_preserving_mtime, file_checksum, file_facts, normalize_lexically,
};
use crate::guard::ProtectedPathGuard;
use crate::manifest::{BackupRecord, DeploymentManifest, EntryKind, ManifestFile, ManifestStore};
use crate::store::{Database, HistoryAction, HistoryLog, ProjectStore};
use crate::types::{ProjectKind, ProjectStatus};
use crate::workspace::{Delivery, Workspace, WorkspaceFile};

/// Theme bridge shared with the deployer and uninstaller.
pub type SharedThemeBridge = Arc<dyn ThemeBridge + Send + Sync>;

#[derive(Clone)]
pub struct Deployer {
    projects: ProjectStore,
    manifests: ManifestStore,
    history: HistoryLog,
    backup_root: PathBuf,
    extra_protected: Vec<String>,
    theme_bridge: Option<SharedThemeBridge>,
}

impl std::fmt::Debug for Deployer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deployer")
            .field("backup_root", &self.backup_root)
            .field("extra_protected", &self.extra_protected)
            .field("theme_bridge", &self.theme_bridge.is_some())
            .finish()
    }
}

/// Mutable state of one install run.
struct InstallRun<'a> {
    codename: &'a str,
    guard: ProtectedPathGuard,
    backups: BackupWriter,
    started_at: DateTime<Utc>,
    /// Every directory the manifest will list, previous installs included.
    directories: Vec<PathBuf>,
    /// Directories created by this run only.
    dirs_created: Vec<PathBuf>,
    /// Host files the previous install deployed, with their recorded checksum.
    previous_files: HashMap<PathBuf, Option<String>>,
    backups_created: Vec<BackupRecord>,
}

impl Deployer {
    pub fn new(db: Database, backup_root: PathBuf) -> Self {
        Self {
            projects: db.projects(),
            manifests: ManifestStore::new(db.clone()),
            history: db.history(),
            backup_root,
            extra_protected: Vec::new(),
            theme_bridge: None,
        }
    }

    /// Protect additional host-relative directories.
    pub fn with_extra_protected(mut self, extra: Vec<String>) -> Self {
        self.extra_protected = extra;
        self
    }

    pub fn with_theme_bridge(mut self, bridge: SharedThemeBridge) -> Self {
        self.theme_bridge = Some(bridge);
        self
    }

    /// Deploy the workspace of `codename` onto `host_root`.
    ///
    /// Returns `Err` only for store failures; missing projects, workspaces
    /// or entry points produce a failed [`DeployResult`] without touching
    /// the host.
    pub fn install(&self, codename: &str, host_root: &Path) -> anyhow::Result<DeployResult> {
        let Some(project) = self.projects.get(codename)? else {
            return Ok(DeployResult::failed(
                codename,
                LifecycleError::ProjectNotFound(codename.to_string()),
            ));
        };
        if project.status == ProjectStatus::Archived {
            return Ok(DeployResult::failed(
                codename,
                LifecycleError::ProjectArchived(codename.to_string()),
            ));
        }
        if !host_root.is_dir() {
            return Ok(DeployResult::failed(
                codename,
                LifecycleError::HostRootNotFound(host_root.to_path_buf()),
            ));
        }
        let workspace = Workspace::new(&project.workspace_path, codename, project.kind);
        if !workspace.exists() {
            return Ok(DeployResult::failed(
                codename,
                LifecycleError::WorkspaceNotFound(project.workspace_path.clone()),
            ));
        }
        if workspace.entry_point().is_none() {
            let expected = match project.kind {
                ProjectKind::Plugin => workspace.root().join(Workspace::plugin_entry_relative(codename)),
                ProjectKind::Theme => workspace.root().join("stylesheets").join("*.css"),
            };
            return Ok(DeployResult::failed(
                codename,
                LifecycleError::EntryPointMissing(expected),
            ));
        }

        let sources = workspace
            .files()
            .with_context(|| format!("Failed to enumerate workspace for '{}'", codename))?;
        let previous = self.manifests.get_manifest(codename)?;

        tracing::info!(
            codename,
            host_root = %host_root.display(),
            files = sources.len(),
            "installing"
        );

        let started_at = Utc::now();
        let guard = ProtectedPathGuard::with_extra_roots(host_root, &self.extra_protected);
        let mut run = InstallRun {
            codename,
            backups: BackupWriter::new(&self.backup_root, codename, started_at),
            started_at,
            directories: previous
                .directories
                .iter()
                .filter(|dir| dir.is_dir())
                .cloned()
                .collect(),
            dirs_created: Vec::new(),
            previous_files: previous
                .files
                .iter()
                .filter(|entry| !entry.is_pushed())
                .map(|entry| (normalize_lexically(&entry.path), entry.checksum.clone()))
                .collect(),
            backups_created: Vec::new(),
            guard,
        };
        dedup_in_place(&mut run.directories);

        let mut warnings = Vec::new();
        if previous.legacy {
            warnings.push(Warning::new(
                WarningKind::LegacyManifest,
                None,
                "Previous manifest used a legacy format; its entries carry no checksums",
            ));
        }

        let mut deployed = Vec::new();
        for file in &sources {
            let outcome = match file.delivery {
                Delivery::Copy => self.copy_file(&mut run, file),
                Delivery::Stylesheet => self.push_resource(&run, file, ThemeResourceKind::Stylesheet),
                Delivery::Template => self.push_resource(&run, file, ThemeResourceKind::Template),
            };
            match outcome {
                Ok(entry) => {
                    tracing::debug!(codename, path = %entry.path.display(), "deployed");
                    deployed.push(entry);
                }
                Err(warning) => {
                    tracing::warn!(codename, %warning, "deploy step skipped");
                    warnings.push(warning);
                }
            }
        }

        let mut files = deployed.clone();
        retain_previous_files(&previous, &mut files, &mut warnings);

        let mut backups = previous.backups.clone();
        backups.extend(run.backups_created.iter().cloned());

        let manifest = self
            .manifests
            .set_manifest(codename, files, run.directories.clone(), backups)
            .with_context(|| format!("Failed to persist manifest for '{}'", codename))?;
        self.projects
            .set_status(codename, ProjectStatus::Installed, Some(Utc::now()))
            .with_context(|| format!("Failed to mark '{}' installed", codename))?;
        self.record_history(codename, &manifest, &run, &warnings);

        warnings.push(Warning::new(
            WarningKind::Activation,
            None,
            format!(
                "Files for '{}' are deployed but not activated; run the host's activation routine",
                codename
            ),
        ));

        tracing::info!(
            codename,
            files = manifest.file_count,
            dirs = manifest.dir_count,
            warnings = warnings.len(),
            "install finished"
        );

        Ok(DeployResult {
            codename: codename.to_string(),
            success: true,
            files_deployed: deployed,
            dirs_created: run.dirs_created,
            backups_created: run.backups_created,
            file_count: manifest.file_count,
            dir_count: manifest.dir_count,
            warnings,
            error: None,
        })
    }

    fn copy_file(&self, run: &mut InstallRun<'_>, file: &WorkspaceFile) -> Result<ManifestFile, Warning> {
        let host_root = run.guard.host_root().to_path_buf();
        let dest = normalize_lexically(&host_root.join(&file.relative));
        if !dest.starts_with(&host_root) || dest == host_root {
            return Err(Warning::new(
                WarningKind::ProtectedPath,
                Some(dest.as_path()),
                format!("Refused destination outside the host root: {}", dest.display()),
            ));
        }

        // Missing ancestors, shallowest first. All of them must pass the
        // guard before any is created.
        let mut missing: Vec<PathBuf> = dest
            .ancestors()
            .skip(1)
            .take_while(|dir| *dir != host_root)
            .filter(|dir| !dir.exists())
            .map(Path::to_path_buf)
            .collect();
        missing.reverse();
        for dir in &missing {
            if let Err(violation) = run.guard.check(dir) {
                return Err(Warning::new(
                    WarningKind::ProtectedPath,
                    Some(dest.as_path()),
                    format!(
                        "Skipped {}: cannot create directory ({})",
                        file.relative.display(),
                        violation
                    ),
                ));
            }
        }
        for dir in missing {
            fs::create_dir(&dir).map_err(|err| Warning::partial(&dir, err))?;
            if !run.directories.contains(&dir) {
                run.directories.push(dir.clone());
            }
            run.dirs_created.push(dir);
        }

        if dest.exists() {
            self.snapshot_existing(run, &dest, &file.relative)?;
        }

        copy_preserving_mtime(&file.source, &dest)
            .map_err(|err| Warning::partial(&dest, format!("{err:#}")))?;
        let facts = file_facts(&dest).map_err(|err| Warning::partial(&dest, format!("{err:#}")))?;

        Ok(ManifestFile {
            path: dest,
            source: Some(file.source.clone()),
            size: Some(facts.size),
            mtime: facts.mtime,
            checksum: Some(facts.checksum),
            deployed_at: Some(run.started_at),
            kind: EntryKind::File,
        })
    }

    /// Back up `dest` before it is overwritten, unless it is an unchanged
    /// copy from the previous install.
    fn snapshot_existing(
        &self,
        run: &mut InstallRun<'_>,
        dest: &Path,
        relative: &Path,
    ) -> Result<(), Warning> {
        let deployed_before = run.previous_files.get(dest);
        if let Some(Some(recorded)) = deployed_before {
            let current =
                file_checksum(dest).map_err(|err| Warning::partial(dest, format!("{err:#}")))?;
            if &current == recorded {
                tracing::debug!(codename = run.codename, path = %dest.display(), "replacing own copy");
                return Ok(());
            }
        }

        let mut record = run
            .backups
            .snapshot(dest, relative)
            .map_err(|err| Warning::partial(dest, format!("{err:#}")))?;
        record.pre_install = deployed_before.is_none();
        tracing::debug!(
            codename = run.codename,
            path = %dest.display(),
            pre_install = record.pre_install,
            "backed up existing file"
        );
        run.backups_created.push(record);
        Ok(())
    }

    fn push_resource(
        &self,
        run: &InstallRun<'_>,
        file: &WorkspaceFile,
        kind: ThemeResourceKind,
    ) -> Result<ManifestFile, Warning> {
        let resource_name = file.resource_name();
        let Some(bridge) = &self.theme_bridge else {
            return Err(Warning::new(
                WarningKind::BridgeUnavailable,
                Some(file.source.as_path()),
                format!(
                    "Skipped {} '{}': no theme bridge configured",
                    kind.as_str(),
                    resource_name
                ),
            ));
        };
        let content = fs::read(&file.source).map_err(|err| Warning::partial(&file.source, err))?;
        let mtime = fs::metadata(&file.source)
            .and_then(|meta| meta.modified())
            .ok()
            .map(DateTime::<Utc>::from);
        let resource = ThemeResource {
            kind,
            name: resource_name,
            content,
        };
        bridge
            .push(run.codename, &resource)
            .map_err(|err| Warning::partial(&file.source, err))?;

        Ok(ManifestFile {
            path: PathBuf::from(resource.resource_id()),
            source: Some(file.source.clone()),
            size: Some(resource.content.len() as u64),
            mtime,
            checksum: Some(bytes_checksum(&resource.content)),
            deployed_at: Some(run.started_at),
            kind: EntryKind::Pushed,
        })
    }

    fn record_history(
        &self,
        codename: &str,
        manifest: &DeploymentManifest,
        run: &InstallRun<'_>,
        warnings: &[Warning],
    ) {
        let details = format!(
            "deployed {} files, created {} directories, {} backups, {} warnings",
            manifest.file_count,
            run.dirs_created.len(),
            run.backups_created.len(),
            warnings.len()
        );
        if let Err(err) = self
            .history
            .append(codename, HistoryAction::Installed, Some(details.as_str()))
        {
            tracing::warn!(codename, error = %err, "failed to record install history");
        }
    }
}

/// Carry forward files from the previous manifest that this run did not
/// redeploy but that are still on the host.
fn retain_previous_files(
    previous: &DeploymentManifest,
    files: &mut Vec<ManifestFile>,
    warnings: &mut Vec<Warning>,
) {
    let deployed: HashSet<PathBuf> = files.iter().map(|f| f.path.clone()).collect();
    for entry in &previous.files {
        if deployed.contains(&entry.path) {
            continue;
        }
        let still_present = entry.is_pushed() || entry.path.is_file();
        if !still_present {
            continue;
        }
        warnings.push(Warning::new(
            WarningKind::Retained,
            Some(entry.path.as_path()),
            format!(
                "{} is no longer in the workspace; kept in the manifest for uninstall",
                entry.path.display()
            ),
        ));
        files.push(entry.clone());
    }
}

fn dedup_in_place(paths: &mut Vec<PathBuf>) {
    let mut seen = HashSet::new();
    paths.retain(|path| seen.insert(path.clone()));
}
