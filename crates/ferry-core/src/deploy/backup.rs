//! Pre-overwrite snapshots of host files.
//!
//! Snapshots live outside the host tree at
//! `<backup_root>/<codename>/<timestamp>/<relative path>`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};

use crate::fs::file_checksum;
use crate::manifest::BackupRecord;

#[derive(Debug, Clone)]
pub struct BackupWriter {
    dir: PathBuf,
    created_at: DateTime<Utc>,
}

impl BackupWriter {
    pub fn new(backup_root: &Path, codename: &str, created_at: DateTime<Utc>) -> Self {
        let stamp = created_at.format("%Y%m%d_%H%M%S_%3f").to_string();
        Self {
            dir: backup_root.join(codename).join(stamp),
            created_at,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Copy `original` into the snapshot directory under `relative`.
    ///
    /// The snapshot is re-read and compared against the original's checksum
    /// before it is reported, so a record always describes a usable copy.
    pub fn snapshot(&self, original: &Path, relative: &Path) -> anyhow::Result<BackupRecord> {
        let checksum = file_checksum(original)?;
        let target = self.dir.join(relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create backup directory: {}", parent.display())
            })?;
        }
        fs::copy(original, &target).with_context(|| {
            format!(
                "Failed to back up {} to {}",
                original.display(),
                target.display()
            )
        })?;
        let copied = file_checksum(&target)?;
        if copied != checksum {
            anyhow::bail!(
                "Backup of {} does not match the original (expected {}, got {})",
                original.display(),
                checksum,
                copied
            );
        }
        Ok(BackupRecord {
            path: target,
            original: Some(original.to_path_buf()),
            checksum: Some(checksum),
            created_at: Some(self.created_at),
            pre_install: true,
        })
    }
}

/// Put a snapshot back at its original location after verifying it.
pub fn restore_backup(record: &BackupRecord) -> anyhow::Result<PathBuf> {
    let original = record
        .original
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("Backup {} has no original path", record.path.display()))?;
    if let Some(expected) = &record.checksum {
        let actual = file_checksum(&record.path)?;
        if &actual != expected {
            anyhow::bail!(
                "Backup {} was modified (expected {}, got {})",
                record.path.display(),
                expected,
                actual
            );
        }
    }
    fs::copy(&record.path, original).with_context(|| {
        format!(
            "Failed to restore {} from {}",
            original.display(),
            record.path.display()
        )
    })?;
    Ok(original.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn snapshot_preserves_relative_path_and_checksum() {
        let tmp = TempDir::new().unwrap();
        let host_file = tmp.path().join("host/inc/plugins/widget.php");
        fs::create_dir_all(host_file.parent().unwrap()).unwrap();
        fs::write(&host_file, "old").unwrap();

        let writer = BackupWriter::new(&tmp.path().join("backups"), "widget", Utc::now());
        let record = writer
            .snapshot(&host_file, Path::new("inc/plugins/widget.php"))
            .unwrap();

        assert!(record.path.starts_with(tmp.path().join("backups").join("widget")));
        assert!(record.path.ends_with("inc/plugins/widget.php"));
        assert_eq!(fs::read_to_string(&record.path).unwrap(), "old");
        assert_eq!(record.checksum, Some(file_checksum(&host_file).unwrap()));
    }

    #[test]
    fn restore_refuses_tampered_snapshot() {
        let tmp = TempDir::new().unwrap();
        let host_file = tmp.path().join("widget.php");
        fs::write(&host_file, "old").unwrap();
        let writer = BackupWriter::new(&tmp.path().join("backups"), "widget", Utc::now());
        let record = writer.snapshot(&host_file, Path::new("widget.php")).unwrap();

        fs::write(&host_file, "new").unwrap();
        assert_eq!(restore_backup(&record).unwrap(), host_file);
        assert_eq!(fs::read_to_string(&host_file).unwrap(), "old");

        fs::write(&record.path, "tampered").unwrap();
        assert!(restore_backup(&record).is_err());
    }
}
