//! Application context for unified dependency injection.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;

use crate::bridge::CommandBridge;
use crate::config::{FerryConfig, backup_dir, database_path, default_state_dir};
use crate::deploy::{Deployer, SharedThemeBridge, Uninstaller};
use crate::project::ProjectService;
use crate::store::{ConnectionDiagnostics, Database};

/// Unified application context for dependency injection.
///
/// Frontends build this once from the loaded [`FerryConfig`] and hand out
/// services from it. All services share one [`Database`] handle and one
/// [`ConnectionDiagnostics`] collector.
#[derive(Debug, Clone)]
pub struct AppContext {
    config: FerryConfig,
    state_dir: PathBuf,
    workspaces_dir: PathBuf,
    diagnostics: Arc<ConnectionDiagnostics>,
    database: Database,
}

impl AppContext {
    /// Resolve unset directories to platform defaults and open the database.
    pub fn from_config(config: FerryConfig) -> anyhow::Result<Self> {
        let state_dir = match &config.state_dir {
            Some(dir) => dir.clone(),
            None => default_state_dir()?,
        };
        let workspaces_dir = match &config.workspaces_dir {
            Some(dir) => dir.clone(),
            None => dirs::home_dir()
                .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?
                .join("ferry"),
        };
        Self::with_paths(config, state_dir, workspaces_dir)
    }

    /// Create a context with explicit directories (for testing).
    pub fn with_paths(
        config: FerryConfig,
        state_dir: PathBuf,
        workspaces_dir: PathBuf,
    ) -> anyhow::Result<Self> {
        let diagnostics = Arc::new(ConnectionDiagnostics::new());
        let db_path = database_path(&state_dir);
        let database = Database::open_with_diagnostics(&db_path, Arc::clone(&diagnostics))
            .with_context(|| format!("Failed to open state database: {}", db_path.display()))?;
        Ok(Self {
            config,
            state_dir,
            workspaces_dir,
            diagnostics,
            database,
        })
    }

    pub fn config(&self) -> &FerryConfig {
        &self.config
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    pub fn workspaces_dir(&self) -> &Path {
        &self.workspaces_dir
    }

    pub fn backup_dir(&self) -> PathBuf {
        backup_dir(&self.state_dir)
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn diagnostics(&self) -> &ConnectionDiagnostics {
        &self.diagnostics
    }

    /// Host root from the config, or an error naming how to set it.
    pub fn host_root(&self) -> anyhow::Result<&Path> {
        self.config.host_root.as_deref().ok_or_else(|| {
            anyhow::anyhow!("No host root configured; set host_root in ferry.toml or pass --host-root")
        })
    }

    /// Override the configured host root.
    pub fn set_host_root(&mut self, host_root: PathBuf) {
        self.config.host_root = Some(host_root);
    }

    /// The configured command bridge, if any.
    pub fn command_bridge(&self) -> Option<CommandBridge> {
        CommandBridge::from_argv(&self.config.bridge.command).ok()
    }

    pub fn project_service(&self) -> ProjectService {
        ProjectService::new(self.database.clone(), self.workspaces_dir.clone())
    }

    pub fn deployer(&self) -> Deployer {
        let deployer = Deployer::new(self.database.clone(), self.backup_dir())
            .with_extra_protected(self.config.guard.extra_protected.clone());
        match self.theme_bridge() {
            Some(bridge) => deployer.with_theme_bridge(bridge),
            None => deployer,
        }
    }

    pub fn uninstaller(&self) -> Uninstaller {
        let uninstaller = Uninstaller::new(self.database.clone())
            .with_extra_protected(self.config.guard.extra_protected.clone());
        match self.theme_bridge() {
            Some(bridge) => uninstaller.with_theme_bridge(bridge),
            None => uninstaller,
        }
    }

    fn theme_bridge(&self) -> Option<SharedThemeBridge> {
        self.command_bridge()
            .map(|bridge| Arc::new(bridge) as SharedThemeBridge)
    }
}
