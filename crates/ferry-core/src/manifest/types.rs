//! Deployment manifest types and the on-disk shape probe.
//!
//! Three shapes exist in stored data:
//! - a bare JSON list of deployed path strings (oldest releases)
//! - an object whose `files` is a list of path strings
//! - the current object with per-file metadata
//!
//! [`StoredManifest::probe`] decides which one a value is by looking at its
//! structure, then [`StoredManifest::into_manifest`] normalizes it.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// How a manifest entry reached the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Written to the host filesystem at `path`.
    #[default]
    File,
    /// Handed to the theme bridge; `path` is a resource id.
    Pushed,
}

/// One file (or pushed resource) the deployer actually delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestFile {
    pub path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub mtime: Option<DateTime<Utc>>,
    #[serde(default)]
    pub checksum: Option<String>,
    #[serde(default)]
    pub deployed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub kind: EntryKind,
}

impl ManifestFile {
    /// Entry recovered from a legacy manifest: only the path is known.
    pub fn legacy(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            source: None,
            size: None,
            mtime: None,
            checksum: None,
            deployed_at: None,
            kind: EntryKind::File,
        }
    }

    pub fn is_pushed(&self) -> bool {
        self.kind == EntryKind::Pushed
    }
}

/// Snapshot of a host file taken before it was overwritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupRecord {
    /// Snapshot location, outside the host tree.
    pub path: PathBuf,
    /// Host path the snapshot was taken from.
    #[serde(default)]
    pub original: Option<PathBuf>,
    /// Checksum of the pre-overwrite content.
    #[serde(default)]
    pub checksum: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// False when the snapshot was taken of a file an earlier install
    /// deployed. Only pre-install snapshots are restored on uninstall.
    #[serde(default = "default_pre_install")]
    pub pre_install: bool,
}

fn default_pre_install() -> bool {
    true
}

impl BackupRecord {
    pub fn legacy(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            original: None,
            checksum: None,
            created_at: None,
            pre_install: true,
        }
    }
}

/// Normalized deployment record for one project.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeploymentManifest {
    #[serde(default)]
    pub deployed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub files: Vec<ManifestFile>,
    #[serde(default)]
    pub directories: Vec<PathBuf>,
    #[serde(default)]
    pub backups: Vec<BackupRecord>,
    #[serde(default)]
    pub file_count: usize,
    #[serde(default)]
    pub dir_count: usize,
    /// Set when the record was upgraded from a legacy shape. Never stored.
    #[serde(skip)]
    pub legacy: bool,
}

impl DeploymentManifest {
    pub fn new(
        files: Vec<ManifestFile>,
        directories: Vec<PathBuf>,
        backups: Vec<BackupRecord>,
    ) -> Self {
        let mut manifest = Self {
            deployed_at: Some(Utc::now()),
            files,
            directories,
            backups,
            file_count: 0,
            dir_count: 0,
            legacy: false,
        };
        manifest.recount();
        manifest
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.directories.is_empty()
    }

    fn recount(&mut self) {
        self.file_count = self.files.len();
        self.dir_count = self.directories.len();
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ManifestShapeError {
    #[error("expected a list or an object, found {0}")]
    UnexpectedType(&'static str),
    #[error("list manifest contains a non-string entry at index {0}")]
    NonStringPath(usize),
    #[error("`files` mixes path strings and file records")]
    MixedFiles,
    #[error("{0}")]
    Malformed(String),
}

/// Legacy object whose `files` are bare path strings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LegacyFileDict {
    pub files: Vec<String>,
    #[serde(default)]
    pub directories: Vec<PathBuf>,
    #[serde(default)]
    pub backups: Vec<LegacyBackup>,
    #[serde(default)]
    pub deployed_at: Option<DateTime<Utc>>,
}

/// Backups in legacy objects were stored either as paths or as records.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum LegacyBackup {
    Path(PathBuf),
    Record(BackupRecord),
}

/// Every manifest shape that can be found in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredManifest {
    LegacyPathList(Vec<String>),
    LegacyFileDictList(LegacyFileDict),
    Current(DeploymentManifest),
}

impl StoredManifest {
    pub fn decode(text: &str) -> Result<Self, ManifestShapeError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|err| ManifestShapeError::Malformed(err.to_string()))?;
        Self::probe(value)
    }

    /// Classify a stored value by shape.
    pub fn probe(value: Value) -> Result<Self, ManifestShapeError> {
        match value {
            Value::Null => Ok(StoredManifest::Current(DeploymentManifest::default())),
            Value::Array(items) => {
                let mut paths = Vec::with_capacity(items.len());
                for (index, item) in items.into_iter().enumerate() {
                    match item {
                        Value::String(path) => paths.push(path),
                        _ => return Err(ManifestShapeError::NonStringPath(index)),
                    }
                }
                Ok(StoredManifest::LegacyPathList(paths))
            }
            Value::Object(map) => {
                let string_files = match map.get("files") {
                    Some(Value::Array(files)) => {
                        let strings = files.iter().filter(|f| f.is_string()).count();
                        if strings > 0 && strings != files.len() {
                            return Err(ManifestShapeError::MixedFiles);
                        }
                        strings > 0
                    }
                    _ => false,
                };
                let value = Value::Object(map);
                if string_files {
                    serde_json::from_value(value)
                        .map(StoredManifest::LegacyFileDictList)
                        .map_err(|err| ManifestShapeError::Malformed(err.to_string()))
                } else {
                    serde_json::from_value(value)
                        .map(StoredManifest::Current)
                        .map_err(|err| ManifestShapeError::Malformed(err.to_string()))
                }
            }
            Value::Bool(_) => Err(ManifestShapeError::UnexpectedType("a boolean")),
            Value::Number(_) => Err(ManifestShapeError::UnexpectedType("a number")),
            Value::String(_) => Err(ManifestShapeError::UnexpectedType("a string")),
        }
    }

    pub fn is_legacy(&self) -> bool {
        !matches!(self, StoredManifest::Current(_))
    }

    /// Upgrade to the current shape, flagging legacy input.
    pub fn into_manifest(self) -> DeploymentManifest {
        let mut manifest = match self {
            StoredManifest::LegacyPathList(paths) => DeploymentManifest {
                files: paths.into_iter().map(ManifestFile::legacy).collect(),
                legacy: true,
                ..DeploymentManifest::default()
            },
            StoredManifest::LegacyFileDictList(dict) => DeploymentManifest {
                deployed_at: dict.deployed_at,
                files: dict.files.into_iter().map(ManifestFile::legacy).collect(),
                directories: dict.directories,
                backups: dict
                    .backups
                    .into_iter()
                    .map(|backup| match backup {
                        LegacyBackup::Path(path) => BackupRecord::legacy(path),
                        LegacyBackup::Record(record) => record,
                    })
                    .collect(),
                legacy: true,
                ..DeploymentManifest::default()
            },
            StoredManifest::Current(manifest) => manifest,
        };
        manifest.recount();
        manifest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bare_list_is_legacy_path_list() {
        let stored = StoredManifest::probe(json!(["/srv/a.php", "/srv/b.php", "/srv/c.php"]))
            .expect("probe");
        assert!(matches!(stored, StoredManifest::LegacyPathList(ref p) if p.len() == 3));
        let manifest = stored.into_manifest();
        assert!(manifest.legacy);
        assert_eq!(manifest.file_count, 3);
        assert_eq!(manifest.files[1].path, PathBuf::from("/srv/b.php"));
    }

    #[test]
    fn dict_with_string_files_is_legacy_dict() {
        let stored = StoredManifest::probe(json!({
            "files": ["/srv/a.php"],
            "directories": ["/srv/inc/plugins/widget"],
            "backups": ["/backups/a.php", {"path": "/backups/b.php", "checksum": "abc"}]
        }))
        .expect("probe");
        assert!(stored.is_legacy());
        let manifest = stored.into_manifest();
        assert_eq!(manifest.file_count, 1);
        assert_eq!(manifest.dir_count, 1);
        assert_eq!(manifest.backups[0], BackupRecord::legacy("/backups/a.php"));
        assert_eq!(manifest.backups[1].checksum.as_deref(), Some("abc"));
    }

    #[test]
    fn current_shape_recounts_from_lists() {
        let stored = StoredManifest::probe(json!({
            "deployed_at": "2024-05-01T10:00:00Z",
            "files": [{"path": "/srv/a.php", "size": 3, "checksum": "x"}],
            "directories": [],
            "backups": [],
            "file_count": 7,
            "dir_count": 9
        }))
        .expect("probe");
        assert!(!stored.is_legacy());
        let manifest = stored.into_manifest();
        assert!(!manifest.legacy);
        assert_eq!(manifest.file_count, 1);
        assert_eq!(manifest.dir_count, 0);
        assert_eq!(manifest.files[0].kind, EntryKind::File);
    }

    #[test]
    fn empty_object_and_null_are_empty_current_manifests() {
        for value in [json!({}), Value::Null, json!({"files": []})] {
            let manifest = StoredManifest::probe(value).expect("probe").into_manifest();
            assert!(manifest.is_empty());
            assert!(!manifest.legacy);
        }
    }

    #[test]
    fn malformed_shapes_are_rejected() {
        assert_eq!(
            StoredManifest::probe(json!(["/a", 3])),
            Err(ManifestShapeError::NonStringPath(1))
        );
        assert_eq!(
            StoredManifest::probe(json!({"files": ["/a", {"path": "/b"}]})),
            Err(ManifestShapeError::MixedFiles)
        );
        assert!(matches!(
            StoredManifest::probe(json!("files")),
            Err(ManifestShapeError::UnexpectedType(_))
        ));
    }
}
