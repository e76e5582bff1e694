//! `meta.json` at the root of every workspace.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::types::{ProjectKind, Visibility};

pub const META_FILE: &str = "meta.json";

/// Descriptive metadata kept next to the workspace sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceMeta {
    pub codename: String,
    pub name: String,
    pub kind: ProjectKind,
    pub version: String,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

impl WorkspaceMeta {
    pub fn load(workspace_root: &Path) -> anyhow::Result<Self> {
        let path = workspace_root.join(META_FILE);
        let bytes = std::fs::read(&path)
            .with_context(|| format!("Failed to read workspace metadata: {}", path.display()))?;
        let meta: Self = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse workspace metadata: {}", path.display()))?;
        meta.validate()?;
        Ok(meta)
    }

    pub fn save(&self, workspace_root: &Path) -> anyhow::Result<()> {
        let path = workspace_root.join(META_FILE);
        let bytes =
            serde_json::to_vec_pretty(self).context("Failed to serialize workspace metadata")?;
        std::fs::write(&path, bytes)
            .with_context(|| format!("Failed to write workspace metadata: {}", path.display()))
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        validate_codename(&self.codename)?;
        semver::Version::parse(&self.version)
            .with_context(|| format!("Invalid version '{}' for '{}'", self.version, self.codename))?;
        Ok(())
    }
}

/// Codenames become file names on the host (`inc/plugins/<codename>.php`),
/// so they are restricted to lowercase identifiers.
pub fn validate_codename(codename: &str) -> anyhow::Result<()> {
    let mut chars = codename.chars();
    let Some(first) = chars.next() else {
        anyhow::bail!("Codename must not be empty");
    };
    if !first.is_ascii_lowercase() {
        anyhow::bail!("Codename '{}' must start with a lowercase letter", codename);
    }
    if !chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_') {
        anyhow::bail!(
            "Codename '{}' may only contain lowercase letters, digits and underscores",
            codename
        );
    }
    Ok(())
}
