//! Config store for loading and saving ferry.toml.

use std::path::{Path, PathBuf};

use anyhow::Context;

use super::{FerryConfig, parser, paths};

#[derive(Debug, Clone)]
pub struct ConfigStore {
    config_path: PathBuf,
}

impl ConfigStore {
    /// Store at `<config dir>/ferry/ferry.toml`.
    pub fn from_default_location() -> anyhow::Result<Self> {
        Ok(Self::from_path(paths::config_path(&paths::default_config_dir()?)))
    }

    pub fn from_path(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// A missing file yields the default configuration.
    pub fn load(&self) -> anyhow::Result<FerryConfig> {
        if !self.config_path.exists() {
            tracing::debug!(path = %self.config_path.display(), "no config file, using defaults");
            return Ok(FerryConfig::new());
        }
        parser::parse_ferry_toml(&self.config_path)
    }

    pub fn save(&self, config: &FerryConfig) -> anyhow::Result<()> {
        config.validate()?;
        let content = parser::to_toml(config)?;
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        std::fs::write(&self.config_path, content).with_context(|| {
            format!(
                "Failed to write config file: {}",
                self.config_path.display()
            )
        })?;
        Ok(())
    }
}
