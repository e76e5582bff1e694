//! Manifest-driven removal.
//!
//! Only paths listed in the manifest are touched. Files are removed one by
//! one, then directories deepest first, and a directory is only removed when
//! it is empty. Nothing is ever deleted recursively.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::Context;

use super::backup::restore_backup;
use super::installer::SharedThemeBridge;
use super::report::{LifecycleError, UninstallResult, Warning, WarningKind};
use crate::bridge::parse_resource_id;
use crate::fs::{normalize_lexically, path_depth};
use crate::guard::ProtectedPathGuard;
use crate::manifest::{BackupRecord, DeploymentManifest, ManifestFile, ManifestStore};
use crate::store::{Database, HistoryAction, HistoryLog, ProjectStore};
use crate::types::{ProjectKind, ProjectStatus};
use crate::workspace::Workspace;

#[derive(Debug, Clone, Copy, Default)]
pub struct UninstallOptions {
    /// Put overwritten host files back from their earliest snapshot.
    pub restore_backups: bool,
}

#[derive(Clone)]
pub struct Uninstaller {
    projects: ProjectStore,
    manifests: ManifestStore,
    history: HistoryLog,
    extra_protected: Vec<String>,
    theme_bridge: Option<SharedThemeBridge>,
}

impl std::fmt::Debug for Uninstaller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Uninstaller")
            .field("extra_protected", &self.extra_protected)
            .field("theme_bridge", &self.theme_bridge.is_some())
            .finish()
    }
}

impl Uninstaller {
    pub fn new(db: Database) -> Self {
        Self {
            projects: db.projects(),
            manifests: ManifestStore::new(db.clone()),
            history: db.history(),
            extra_protected: Vec::new(),
            theme_bridge: None,
        }
    }

    pub fn with_extra_protected(mut self, extra: Vec<String>) -> Self {
        self.extra_protected = extra;
        self
    }

    pub fn with_theme_bridge(mut self, bridge: SharedThemeBridge) -> Self {
        self.theme_bridge = Some(bridge);
        self
    }

    pub fn uninstall(&self, codename: &str, host_root: &Path) -> anyhow::Result<UninstallResult> {
        self.uninstall_with(codename, host_root, UninstallOptions::default())
    }

    /// Remove everything the manifest of `codename` lists.
    ///
    /// Returns `Err` only for store failures.
    pub fn uninstall_with(
        &self,
        codename: &str,
        host_root: &Path,
        options: UninstallOptions,
    ) -> anyhow::Result<UninstallResult> {
        let Some(project) = self.projects.get(codename)? else {
            return Ok(UninstallResult::failed(
                codename,
                LifecycleError::ProjectNotFound(codename.to_string()),
            ));
        };
        if project.status == ProjectStatus::Archived {
            return Ok(UninstallResult::failed(
                codename,
                LifecycleError::ProjectArchived(codename.to_string()),
            ));
        }
        if !host_root.is_dir() {
            return Ok(UninstallResult::failed(
                codename,
                LifecycleError::HostRootNotFound(host_root.to_path_buf()),
            ));
        }

        let manifest = self.manifests.get_manifest(codename)?;
        let guard = ProtectedPathGuard::with_extra_roots(host_root, &self.extra_protected);
        let mut result = UninstallResult::empty(codename);

        tracing::info!(
            codename,
            host_root = %host_root.display(),
            files = manifest.files.len(),
            dirs = manifest.directories.len(),
            "uninstalling"
        );

        if manifest.legacy {
            push_warning(
                &mut result,
                Warning::new(
                    WarningKind::LegacyManifest,
                    None,
                    "Manifest used a legacy format; removal is based on paths only",
                ),
            );
        }

        if manifest.is_empty() {
            self.fallback_cleanup(codename, project.kind, guard.host_root(), &mut result);
        } else {
            self.remove_files(codename, &manifest, &guard, options, &mut result);
            remove_directories(&manifest.directories, &guard, codename, &mut result);
        }

        self.manifests
            .clear_manifest(codename)
            .with_context(|| format!("Failed to clear manifest for '{}'", codename))?;
        self.projects
            .set_status(codename, ProjectStatus::Development, None)
            .with_context(|| format!("Failed to mark '{}' as in development", codename))?;

        let details = format!(
            "removed {} files, {} directories, {} bytes freed",
            result.files_removed.len(),
            result.dirs_removed.len(),
            result.bytes_freed
        );
        if let Err(err) = self
            .history
            .append(codename, HistoryAction::Uninstalled, Some(details.as_str()))
        {
            tracing::warn!(codename, error = %err, "failed to record uninstall history");
        }

        result.success = true;
        tracing::info!(
            codename,
            files = result.files_removed.len(),
            dirs = result.dirs_removed.len(),
            bytes = result.bytes_freed,
            warnings = result.warnings.len(),
            "uninstall finished"
        );
        Ok(result)
    }

    /// No manifest: remove only the plugin entry point, never a directory.
    fn fallback_cleanup(
        &self,
        codename: &str,
        kind: ProjectKind,
        host_root: &Path,
        result: &mut UninstallResult,
    ) {
        match kind {
            ProjectKind::Plugin => {
                let entry = host_root.join(Workspace::plugin_entry_relative(codename));
                match remove_file_entry(&entry) {
                    Ok(bytes) => {
                        result.bytes_freed += bytes;
                        result.files_removed.push(entry.clone());
                    }
                    Err(warning) if warning.kind == WarningKind::MissingFile => {
                        tracing::debug!(codename, path = %entry.display(), "no entry point to remove");
                    }
                    Err(warning) => push_warning(result, warning),
                }
                push_warning(
                    result,
                    Warning::new(
                        WarningKind::IncompleteCleanup,
                        None,
                        format!(
                            "No deployment manifest for '{}'; only the plugin entry point was removed",
                            codename
                        ),
                    ),
                );
            }
            ProjectKind::Theme => push_warning(
                result,
                Warning::new(
                    WarningKind::IncompleteCleanup,
                    None,
                    format!(
                        "No deployment manifest for theme '{}'; nothing was removed",
                        codename
                    ),
                ),
            ),
        }
    }

    fn remove_files(
        &self,
        codename: &str,
        manifest: &DeploymentManifest,
        guard: &ProtectedPathGuard,
        options: UninstallOptions,
        result: &mut UninstallResult,
    ) {
        for entry in &manifest.files {
            let outcome = if entry.is_pushed() {
                self.retract(codename, entry)
            } else {
                remove_host_file(entry, guard.host_root())
            };
            match outcome {
                Ok(bytes) => {
                    tracing::debug!(codename, path = %entry.path.display(), "removed");
                    result.bytes_freed += bytes;
                    result.files_removed.push(entry.path.clone());
                }
                Err(warning) => {
                    push_warning(result, warning);
                    continue;
                }
            }

            if options.restore_backups
                && !entry.is_pushed()
                && let Some(record) = earliest_backup(&manifest.backups, &entry.path)
            {
                match restore_backup(record) {
                    Ok(path) => {
                        tracing::debug!(codename, path = %path.display(), "restored from backup");
                        result.restored.push(path);
                    }
                    Err(err) => push_warning(result, Warning::partial(&entry.path, format!("{err:#}"))),
                }
            }
        }
    }

    fn retract(&self, codename: &str, entry: &ManifestFile) -> Result<u64, Warning> {
        let id = entry.path.to_string_lossy();
        let Some((kind, name)) = parse_resource_id(&id) else {
            return Err(Warning::partial(&entry.path, "not a theme resource id"));
        };
        let Some(bridge) = &self.theme_bridge else {
            return Err(Warning::new(
                WarningKind::BridgeUnavailable,
                Some(entry.path.as_path()),
                format!("Left {} in the host: no theme bridge configured", id),
            ));
        };
        bridge
            .retract(codename, kind, name)
            .map_err(|err| Warning::partial(&entry.path, err))?;
        Ok(0)
    }
}

fn push_warning(result: &mut UninstallResult, warning: Warning) {
    tracing::warn!(codename = %result.codename, %warning, "uninstall step skipped");
    result.warnings.push(warning);
}

fn remove_host_file(entry: &ManifestFile, host_root: &Path) -> Result<u64, Warning> {
    let path = normalize_lexically(&entry.path);
    if !path.starts_with(host_root) || path == host_root {
        return Err(Warning::new(
            WarningKind::ProtectedPath,
            Some(path.as_path()),
            format!("Refused to delete a file outside the host root: {}", path.display()),
        ));
    }
    remove_file_entry(&path)
}

/// Delete a single non-directory entry and return its size.
fn remove_file_entry(path: &Path) -> Result<u64, Warning> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(Warning::new(
                WarningKind::MissingFile,
                Some(path),
                format!("Already gone: {}", path.display()),
            ));
        }
        Err(err) => return Err(Warning::partial(path, err)),
    };
    if metadata.is_dir() {
        return Err(Warning::partial(path, "expected a file, found a directory"));
    }
    fs::remove_file(path).map_err(|err| Warning::partial(path, err))?;
    Ok(metadata.len())
}

/// Earliest snapshot of `original` taken before any install touched it.
fn earliest_backup<'a>(backups: &'a [BackupRecord], original: &Path) -> Option<&'a BackupRecord> {
    backups
        .iter()
        .filter(|record| record.pre_install && record.original.as_deref() == Some(original))
        .min_by_key(|record| record.created_at)
}

/// Remove tracked directories deepest first.
///
/// A directory that cannot be removed blocks all of its ancestors for the
/// rest of the pass.
fn remove_directories(
    directories: &[PathBuf],
    guard: &ProtectedPathGuard,
    codename: &str,
    result: &mut UninstallResult,
) {
    let mut ordered: Vec<PathBuf> = directories
        .iter()
        .map(|dir| normalize_lexically(dir))
        .collect();
    ordered.sort_by(|a, b| path_depth(b).cmp(&path_depth(a)).then_with(|| b.cmp(a)));
    ordered.dedup();

    let mut blocked: Vec<PathBuf> = Vec::new();
    for dir in ordered {
        if blocked.iter().any(|held| held.starts_with(&dir)) {
            tracing::debug!(codename, path = %dir.display(), "kept: holds a directory that was not removed");
            blocked.push(dir);
            continue;
        }
        if let Err(violation) = guard.check(&dir) {
            push_warning(result, Warning::protected(&violation));
            blocked.push(dir);
            continue;
        }

        let metadata = match fs::symlink_metadata(&dir) {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(codename, path = %dir.display(), "directory already gone");
                continue;
            }
            Err(err) => {
                push_warning(result, Warning::partial(&dir, err));
                blocked.push(dir);
                continue;
            }
        };
        if !metadata.is_dir() {
            push_warning(result, Warning::partial(&dir, "expected a directory"));
            blocked.push(dir);
            continue;
        }

        match is_empty_dir(&dir) {
            Ok(true) => {}
            Ok(false) => {
                push_warning(
                    result,
                    Warning::new(
                        WarningKind::NonEmptyDirectory,
                        Some(dir.as_path()),
                        format!("Left {} in place: it is not empty", dir.display()),
                    ),
                );
                blocked.push(dir);
                continue;
            }
            Err(err) => {
                push_warning(result, Warning::partial(&dir, err));
                blocked.push(dir);
                continue;
            }
        }

        match fs::remove_dir(&dir) {
            Ok(()) => {
                tracing::debug!(codename, path = %dir.display(), "removed directory");
                result.dirs_removed.push(dir);
            }
            Err(err) => {
                push_warning(result, Warning::partial(&dir, err));
                blocked.push(dir);
            }
        }
    }
}

fn is_empty_dir(dir: &Path) -> io::Result<bool> {
    Ok(fs::read_dir(dir)?.next().is_none())
}
