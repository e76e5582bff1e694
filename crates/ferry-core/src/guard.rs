//! Protected-path guard for host scaffolding.
//!
//! The host application needs a fixed set of directories to exist in order
//! to run at all (its plugin directory, language directory, admin modules,
//! upload and asset roots). The deployer may create and later delete
//! directories *below* those roots, but never a root itself and never one of
//! a root's ancestors.
//!
//! The guard is consulted twice for every tracked directory:
//! - when the deployer is about to create it (forward direction)
//! - immediately before the uninstaller deletes it (reverse direction)
//!
//! The reverse check never trusts the stored manifest: a manifest can be
//! stale, hand-edited, or written by a buggy release.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::fs::normalize_lexically;

/// Scaffolding directories, relative to the host root, that must survive
/// every install and uninstall.
pub const PROTECTED_DIRECTORIES: &[&str] = &[
    "inc",
    "inc/plugins",
    "inc/languages",
    "inc/languages/english",
    "inc/languages/english/admin",
    "admin",
    "admin/modules",
    "jscripts",
    "images",
    "uploads",
];

/// Why a path may not be created or deleted by the deployer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtectedPathViolation {
    #[error("{0} is outside the host root")]
    OutsideHostRoot(PathBuf),
    #[error("{0} is the host root")]
    HostRoot(PathBuf),
    #[error("{0} is a protected scaffolding directory")]
    ScaffoldingRoot(PathBuf),
    #[error("{path} is an ancestor of protected directory {root}")]
    ScaffoldingAncestor { path: PathBuf, root: PathBuf },
    #[error("{0} is not below any protected scaffolding directory")]
    Untracked(PathBuf),
}

impl ProtectedPathViolation {
    pub fn path(&self) -> &Path {
        match self {
            ProtectedPathViolation::OutsideHostRoot(path)
            | ProtectedPathViolation::HostRoot(path)
            | ProtectedPathViolation::ScaffoldingRoot(path)
            | ProtectedPathViolation::Untracked(path) => path,
            ProtectedPathViolation::ScaffoldingAncestor { path, .. } => path,
        }
    }
}

/// Pure predicate over host paths. Holds no state beyond its configuration.
#[derive(Debug, Clone)]
pub struct ProtectedPathGuard {
    host_root: PathBuf,
    roots: Vec<PathBuf>,
}

impl ProtectedPathGuard {
    /// Guard with the default scaffolding set.
    pub fn new(host_root: impl Into<PathBuf>) -> Self {
        Self::with_extra_roots(host_root, std::iter::empty::<&str>())
    }

    /// Guard with additional host-relative protected directories.
    pub fn with_extra_roots<I, S>(host_root: impl Into<PathBuf>, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let host_root = normalize_lexically(&host_root.into());
        let mut roots: Vec<PathBuf> = PROTECTED_DIRECTORIES
            .iter()
            .map(|rel| host_root.join(rel))
            .collect();
        for rel in extra {
            let rel = rel.as_ref().trim_matches('/');
            if rel.is_empty() {
                continue;
            }
            let root = normalize_lexically(&host_root.join(rel));
            if root.starts_with(&host_root) && !roots.contains(&root) {
                roots.push(root);
            }
        }
        Self { host_root, roots }
    }

    pub fn host_root(&self) -> &Path {
        &self.host_root
    }

    /// Absolute scaffolding roots this guard protects.
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Whether `path` may be created and tracked by the deployer, or deleted
    /// by the uninstaller, on behalf of `codename`.
    pub fn is_safe_to_track(&self, path: &Path, codename: &str) -> bool {
        match self.check(path) {
            Ok(()) => true,
            Err(violation) => {
                tracing::debug!(codename, %violation, "protected path refused");
                false
            }
        }
    }

    /// Same decision as [`is_safe_to_track`](Self::is_safe_to_track), with
    /// the reason for a refusal.
    pub fn check(&self, path: &Path) -> Result<(), ProtectedPathViolation> {
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.host_root.join(path)
        };
        let candidate = normalize_lexically(&absolute);

        if !candidate.starts_with(&self.host_root) {
            return Err(ProtectedPathViolation::OutsideHostRoot(candidate));
        }
        if candidate == self.host_root {
            return Err(ProtectedPathViolation::HostRoot(candidate));
        }
        if self.roots.iter().any(|root| *root == candidate) {
            return Err(ProtectedPathViolation::ScaffoldingRoot(candidate));
        }
        if let Some(root) = self.roots.iter().find(|root| root.starts_with(&candidate)) {
            return Err(ProtectedPathViolation::ScaffoldingAncestor {
                root: root.clone(),
                path: candidate,
            });
        }
        if !self.roots.iter().any(|root| candidate.starts_with(root)) {
            return Err(ProtectedPathViolation::Untracked(candidate));
        }
        Ok(())
    }
}
