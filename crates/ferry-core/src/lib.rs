//! Ferry Core Library
//!
//! Deploys plugin and theme workspaces onto a host application tree,
//! records exactly what each install changed, and removes it again without
//! touching host scaffolding.

pub mod bridge;
pub mod config;
pub mod context;
pub mod deploy;
pub mod fs;
pub mod guard;
pub mod manifest;
pub mod project;
pub mod store;
pub mod types;
pub mod workspace;

/// Re-exports of commonly used types
pub mod prelude {
    // Configuration
    pub use crate::config::{ConfigStore, FerryConfig};
    pub use crate::context::AppContext;

    // Lifecycle
    pub use crate::deploy::{
        DeployResult, Deployer, LifecycleError, UninstallOptions, UninstallResult, Uninstaller,
        Warning, WarningKind,
    };
    pub use crate::guard::{ProtectedPathGuard, ProtectedPathViolation};
    pub use crate::project::{CreateProject, ProjectService};

    // Persistence
    pub use crate::manifest::{DeploymentManifest, ManifestFile, ManifestStore};
    pub use crate::store::{
        ConnectionDiagnostics, Database, HistoryAction, HistoryEntry, Project, ProjectFilter,
    };

    // Bridges
    pub use crate::bridge::{ActivationBridge, CommandBridge, ThemeBridge};

    // Types
    pub use crate::types::{ProjectKind, ProjectStatus, Visibility};
    pub use crate::workspace::{Workspace, WorkspaceMeta};
}
