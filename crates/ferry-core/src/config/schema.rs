//! Configuration schema for ferry.toml
//!
//! ```toml
//! host_root = "/srv/forum"
//! workspaces_dir = "/home/dev/ferry"
//!
//! [guard]
//! extra_protected = ["inc/tasks"]
//!
//! [bridge]
//! command = ["php", "/home/dev/bridge.php"]
//! ```

use std::path::{Component, Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Root configuration structure for ferry.toml
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FerryConfig {
    /// Root of the host application tree deployments land in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_root: Option<PathBuf>,

    /// Directory holding `plugins/` and `themes/` workspaces
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspaces_dir: Option<PathBuf>,

    /// Database and backup location; defaults to the platform state dir
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_dir: Option<PathBuf>,

    #[serde(default)]
    pub guard: GuardConfig,

    #[serde(default)]
    pub bridge: BridgeConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardConfig {
    /// Host-relative directories protected in addition to the built-in set
    #[serde(default)]
    pub extra_protected: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Argv of the host bridge; empty disables theme pushes and activation
    #[serde(default)]
    pub command: Vec<String>,
}

impl FerryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(host_root) = &self.host_root {
            require_absolute("host_root", host_root)?;
        }
        if let Some(dir) = &self.workspaces_dir {
            require_absolute("workspaces_dir", dir)?;
        }
        if let Some(dir) = &self.state_dir {
            require_absolute("state_dir", dir)?;
        }

        for entry in &self.guard.extra_protected {
            validate_protected_entry(entry)
                .with_context(|| format!("Invalid guard.extra_protected entry: '{}'", entry))?;
        }

        if let Some(program) = self.bridge.command.first()
            && program.trim().is_empty()
        {
            anyhow::bail!("bridge.command must start with a program name");
        }
        Ok(())
    }

    pub fn has_bridge(&self) -> bool {
        !self.bridge.command.is_empty()
    }
}

fn require_absolute(key: &str, path: &Path) -> anyhow::Result<()> {
    if !path.is_absolute() {
        anyhow::bail!("{} must be an absolute path, got '{}'", key, path.display());
    }
    Ok(())
}

fn validate_protected_entry(entry: &str) -> anyhow::Result<()> {
    let trimmed = entry.trim_matches('/');
    if trimmed.is_empty() {
        anyhow::bail!("path is empty");
    }
    let path = Path::new(entry);
    if path.is_absolute() {
        anyhow::bail!("path must be relative to the host root");
    }
    if path
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::CurDir))
    {
        anyhow::bail!("path must not contain '.' or '..'");
    }
    Ok(())
}
