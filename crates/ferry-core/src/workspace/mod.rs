//! Workspace reader.
//!
//! A workspace mirrors the host layout: every file under one of the
//! kind-specific subtrees lands at the same relative path below the host
//! root. Everything else in the workspace (metadata, docs, tests, VCS data)
//! stays behind.

pub mod meta;
pub mod scaffold;

use std::path::{Path, PathBuf};

use anyhow::Context;
use walkdir::WalkDir;

use crate::types::{ProjectKind, Visibility};

pub use meta::{META_FILE, WorkspaceMeta, validate_codename};
pub use scaffold::scaffold_workspace;

/// How a workspace file reaches the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Copied to `host_root/<relative path>`.
    Copy,
    /// Theme stylesheet pushed through the theme bridge.
    Stylesheet,
    /// Theme template pushed through the theme bridge.
    Template,
}

const PLUGIN_SUBTREES: &[(&str, Delivery)] = &[
    ("inc", Delivery::Copy),
    ("admin", Delivery::Copy),
    ("jscripts", Delivery::Copy),
    ("images", Delivery::Copy),
];

const THEME_SUBTREES: &[(&str, Delivery)] = &[
    ("images", Delivery::Copy),
    ("jscripts", Delivery::Copy),
    ("stylesheets", Delivery::Stylesheet),
    ("templates", Delivery::Template),
];

const EXCLUDED_DIRS: &[&str] = &[".git", ".svn", ".hg", "tests", "__pycache__"];
const EXCLUDED_FILES: &[&str] = &[META_FILE, ".DS_Store", "Thumbs.db", "desktop.ini"];

/// Subtrees of a workspace that are mirrored onto the host, per kind.
pub fn mirrored_subtrees(kind: ProjectKind) -> &'static [(&'static str, Delivery)] {
    match kind {
        ProjectKind::Plugin => PLUGIN_SUBTREES,
        ProjectKind::Theme => THEME_SUBTREES,
    }
}

/// Default workspace location for a project.
pub fn default_workspace_path(
    workspaces_dir: &Path,
    kind: ProjectKind,
    visibility: Visibility,
    codename: &str,
) -> PathBuf {
    workspaces_dir
        .join(kind.workspace_group())
        .join(visibility.as_str())
        .join(codename)
}

/// One deployable file found in a workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceFile {
    /// Absolute path inside the workspace.
    pub source: PathBuf,
    /// Path relative to the workspace root, which is also the host-relative
    /// destination for copied files.
    pub relative: PathBuf,
    pub delivery: Delivery,
}

impl WorkspaceFile {
    /// Name under which a pushed theme resource is registered with the host.
    pub fn resource_name(&self) -> String {
        let inner = self.relative.iter().skip(1).collect::<PathBuf>();
        match self.delivery {
            Delivery::Template => inner.with_extension("").to_string_lossy().replace('\\', "/"),
            Delivery::Copy | Delivery::Stylesheet => inner.to_string_lossy().replace('\\', "/"),
        }
    }
}

/// Read-only view over a project's workspace directory.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
    codename: String,
    kind: ProjectKind,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>, codename: impl Into<String>, kind: ProjectKind) -> Self {
        Self {
            root: root.into(),
            codename: codename.into(),
            kind,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn codename(&self) -> &str {
        &self.codename
    }

    pub fn kind(&self) -> ProjectKind {
        self.kind
    }

    pub fn exists(&self) -> bool {
        self.root.is_dir()
    }

    /// Workspace-relative path of the plugin entry point.
    pub fn plugin_entry_relative(codename: &str) -> PathBuf {
        PathBuf::from("inc")
            .join("plugins")
            .join(format!("{codename}.php"))
    }

    /// The file proving this workspace is installable, if present.
    ///
    /// Plugins need `inc/plugins/<codename>.php`; themes need at least one
    /// stylesheet.
    pub fn entry_point(&self) -> Option<PathBuf> {
        match self.kind {
            ProjectKind::Plugin => {
                let path = self.root.join(Self::plugin_entry_relative(&self.codename));
                path.is_file().then_some(path)
            }
            ProjectKind::Theme => {
                let dir = self.root.join("stylesheets");
                let mut sheets: Vec<PathBuf> = std::fs::read_dir(&dir)
                    .ok()?
                    .filter_map(|entry| entry.ok().map(|e| e.path()))
                    .filter(|path| path.is_file() && is_stylesheet(path))
                    .collect();
                sheets.sort();
                sheets.into_iter().next()
            }
        }
    }

    /// Every deployable file, sorted by relative path.
    pub fn files(&self) -> anyhow::Result<Vec<WorkspaceFile>> {
        let mut files = Vec::new();
        for (subtree, delivery) in mirrored_subtrees(self.kind) {
            let base = self.root.join(subtree);
            if !base.is_dir() {
                continue;
            }
            let walker = WalkDir::new(&base)
                .follow_links(false)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|entry| !is_excluded(entry));
            for entry in walker {
                let entry = entry.with_context(|| {
                    format!("Failed to walk workspace directory: {}", base.display())
                })?;
                if !entry.file_type().is_file() {
                    continue;
                }
                if *delivery == Delivery::Stylesheet && !is_stylesheet(entry.path()) {
                    continue;
                }
                let relative = entry
                    .path()
                    .strip_prefix(&self.root)
                    .with_context(|| {
                        format!("Workspace entry escaped its root: {}", entry.path().display())
                    })?
                    .to_path_buf();
                files.push(WorkspaceFile {
                    source: entry.path().to_path_buf(),
                    relative,
                    delivery: *delivery,
                });
            }
        }
        files.sort_by(|a, b| a.relative.cmp(&b.relative));
        Ok(files)
    }
}

fn is_excluded(entry: &walkdir::DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    if entry.file_type().is_dir() {
        return entry.depth() > 0 && EXCLUDED_DIRS.contains(&name.as_ref());
    }
    EXCLUDED_FILES.contains(&name.as_ref()) || name.to_ascii_uppercase().starts_with("README")
}

fn is_stylesheet(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("css"))
        .unwrap_or(false)
}
