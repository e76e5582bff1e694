//! Persisted deployment manifests.
//!
//! One manifest per project, stored in the project row. Installs replace it
//! wholesale; uninstalls clear it.

pub mod types;

use std::path::PathBuf;

use rusqlite::{OptionalExtension, params};

use crate::store::{Database, StoreError, StoreResult};

pub use types::{
    BackupRecord, DeploymentManifest, EntryKind, ManifestFile, ManifestShapeError, StoredManifest,
};

#[derive(Debug, Clone)]
pub struct ManifestStore {
    db: Database,
}

impl ManifestStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Overwrite the stored manifest for `codename`.
    pub fn set_manifest(
        &self,
        codename: &str,
        files: Vec<ManifestFile>,
        directories: Vec<PathBuf>,
        backups: Vec<BackupRecord>,
    ) -> StoreResult<DeploymentManifest> {
        let manifest = DeploymentManifest::new(files, directories, backups);
        let text = serde_json::to_string(&manifest)?;
        self.write_column(codename, Some(&text))?;
        Ok(manifest)
    }

    /// Store raw manifest JSON as-is.
    ///
    /// Used when importing records produced by older releases; the text must
    /// be one of the shapes [`StoredManifest`] recognizes.
    pub fn set_raw_manifest(&self, codename: &str, raw: &str) -> StoreResult<()> {
        StoredManifest::decode(raw).map_err(|err| StoreError::InvalidManifest {
            codename: codename.to_string(),
            reason: err.to_string(),
        })?;
        self.write_column(codename, Some(raw))
    }

    /// Load and normalize the manifest. A project without one yields an
    /// empty manifest.
    pub fn get_manifest(&self, codename: &str) -> StoreResult<DeploymentManifest> {
        let connection = self.db.connect()?;
        let column: Option<Option<String>> = connection
            .query_row(
                "SELECT deployed_manifest FROM projects WHERE codename = ?1",
                params![codename],
                |row| row.get(0),
            )
            .optional()?;
        let Some(raw) = column else {
            return Err(StoreError::ProjectNotFound(codename.to_string()));
        };
        let Some(raw) = raw else {
            return Ok(DeploymentManifest::default());
        };

        let stored = StoredManifest::decode(&raw).map_err(|err| StoreError::InvalidManifest {
            codename: codename.to_string(),
            reason: err.to_string(),
        })?;
        if stored.is_legacy() {
            tracing::debug!(codename, "upgrading legacy manifest shape");
        }
        Ok(stored.into_manifest())
    }

    /// Null out the stored manifest.
    pub fn clear_manifest(&self, codename: &str) -> StoreResult<()> {
        self.write_column(codename, None)
    }

    fn write_column(&self, codename: &str, value: Option<&str>) -> StoreResult<()> {
        let connection = self.db.connect()?;
        let updated = connection.execute(
            "UPDATE projects SET deployed_manifest = ?2 WHERE codename = ?1",
            params![codename, value],
        )?;
        if updated == 0 {
            return Err(StoreError::ProjectNotFound(codename.to_string()));
        }
        Ok(())
    }
}
