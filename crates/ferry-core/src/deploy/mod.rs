//! Install and uninstall of workspaces onto a host tree.

pub mod backup;
pub mod installer;
pub mod report;
pub mod uninstall;

pub use backup::{BackupWriter, restore_backup};
pub use installer::{Deployer, SharedThemeBridge};
pub use report::{DeployResult, LifecycleError, UninstallResult, Warning, WarningKind};
pub use uninstall::{UninstallOptions, Uninstaller};
