//! Result objects returned by install and uninstall.
//!
//! Expected failures never surface as `Err`: they are reported through the
//! `success` flag, an optional [`LifecycleError`], and a list of
//! [`Warning`]s collected per file or directory.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::guard::ProtectedPathViolation;
use crate::manifest::{BackupRecord, ManifestFile};

/// Preconditions that fail a whole operation before anything is mutated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("project '{0}' not found")]
    ProjectNotFound(String),
    #[error("project '{0}' is archived; restore it first")]
    ProjectArchived(String),
    #[error("workspace not found: {0}")]
    WorkspaceNotFound(PathBuf),
    #[error("entry point missing: {0}")]
    EntryPointMissing(PathBuf),
    #[error("host root not found: {0}")]
    HostRootNotFound(PathBuf),
}

impl Serialize for LifecycleError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// A single file or directory operation failed; the batch continued.
    PartialFailure,
    /// A create or delete was refused by the protected-path guard.
    ProtectedPath,
    /// A manifest entry was already gone from the host.
    MissingFile,
    /// A directory still had content and was left in place with its ancestors.
    NonEmptyDirectory,
    /// Files are deployed but the host has not activated the project.
    Activation,
    /// No manifest existed, so only the entry point was removed.
    IncompleteCleanup,
    /// The manifest was stored in an older shape.
    LegacyManifest,
    /// A file from the previous install was kept in the manifest.
    Retained,
    /// A theme resource needed the theme bridge, which is not configured.
    BridgeUnavailable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    pub kind: WarningKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    pub message: String,
}

impl Warning {
    pub fn new(kind: WarningKind, path: Option<&Path>, message: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.map(Path::to_path_buf),
            message: message.into(),
        }
    }

    pub fn partial(path: &Path, err: impl fmt::Display) -> Self {
        Self::new(
            WarningKind::PartialFailure,
            Some(path),
            format!("{}: {}", path.display(), err),
        )
    }

    pub fn protected(violation: &ProtectedPathViolation) -> Self {
        Self::new(
            WarningKind::ProtectedPath,
            Some(violation.path()),
            format!("Refused protected path: {violation}"),
        )
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Outcome of an install.
#[derive(Debug, Clone, Serialize)]
pub struct DeployResult {
    pub codename: String,
    pub success: bool,
    pub files_deployed: Vec<ManifestFile>,
    pub dirs_created: Vec<PathBuf>,
    pub backups_created: Vec<BackupRecord>,
    /// Counts of the manifest persisted at the end of the install.
    pub file_count: usize,
    pub dir_count: usize,
    pub warnings: Vec<Warning>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<LifecycleError>,
}

impl DeployResult {
    pub fn failed(codename: &str, error: LifecycleError) -> Self {
        Self {
            codename: codename.to_string(),
            success: false,
            files_deployed: Vec::new(),
            dirs_created: Vec::new(),
            backups_created: Vec::new(),
            file_count: 0,
            dir_count: 0,
            warnings: Vec::new(),
            error: Some(error),
        }
    }

    pub fn has_warning(&self, kind: WarningKind) -> bool {
        self.warnings.iter().any(|w| w.kind == kind)
    }
}

/// Outcome of an uninstall.
#[derive(Debug, Clone, Serialize)]
pub struct UninstallResult {
    pub codename: String,
    pub success: bool,
    pub files_removed: Vec<PathBuf>,
    pub dirs_removed: Vec<PathBuf>,
    /// Host files put back from their pre-install snapshots.
    pub restored: Vec<PathBuf>,
    pub bytes_freed: u64,
    pub warnings: Vec<Warning>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<LifecycleError>,
}

impl UninstallResult {
    pub(crate) fn empty(codename: &str) -> Self {
        Self {
            codename: codename.to_string(),
            success: false,
            files_removed: Vec::new(),
            dirs_removed: Vec::new(),
            restored: Vec::new(),
            bytes_freed: 0,
            warnings: Vec::new(),
            error: None,
        }
    }

    pub fn failed(codename: &str, error: LifecycleError) -> Self {
        let mut result = Self::empty(codename);
        result.error = Some(error);
        result
    }

    pub fn has_warning(&self, kind: WarningKind) -> bool {
        self.warnings.iter().any(|w| w.kind == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protected_warning_carries_violation_path() {
        let violation = ProtectedPathViolation::ScaffoldingRoot(PathBuf::from("/srv/inc"));
        let warning = Warning::protected(&violation);
        assert_eq!(warning.kind, WarningKind::ProtectedPath);
        assert_eq!(warning.path.as_deref(), Some(Path::new("/srv/inc")));
        assert!(warning.to_string().contains("protected scaffolding"));
    }

    #[test]
    fn failed_result_serializes_error_as_text() {
        let result = DeployResult::failed(
            "widget",
            LifecycleError::WorkspaceNotFound(PathBuf::from("/ws/widget")),
        );
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "workspace not found: /ws/widget");
    }
}
