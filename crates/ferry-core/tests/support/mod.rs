#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use ferry_core::config::FerryConfig;
use ferry_core::context::AppContext;
use ferry_core::manifest::ManifestStore;
use ferry_core::project::CreateProject;
use ferry_core::store::Project;
use ferry_core::types::ProjectKind;
use tempfile::TempDir;

/// Scaffolding a fresh forum-style host ships with.
pub const HOST_SCAFFOLDING: &[&str] = &[
    "inc/plugins",
    "inc/languages/english/admin",
    "admin/modules",
    "jscripts",
    "images",
    "uploads",
];

pub struct Fixture {
    pub temp: TempDir,
    pub host: PathBuf,
    pub ctx: AppContext,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_scaffolding(HOST_SCAFFOLDING)
    }

    pub fn with_scaffolding(dirs: &[&str]) -> Self {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let host = temp.path().join("forum");
        fs::create_dir_all(&host).expect("Failed to create host root");
        for dir in dirs {
            fs::create_dir_all(host.join(dir)).expect("Failed to create host scaffolding");
        }
        fs::write(host.join("index.php"), "<?php // forum").expect("Failed to seed host");

        let config = FerryConfig {
            host_root: Some(host.clone()),
            ..FerryConfig::default()
        };
        let ctx = AppContext::with_paths(
            config,
            temp.path().join("state"),
            temp.path().join("workspaces"),
        )
        .expect("Failed to build context");

        Self { temp, host, ctx }
    }

    pub fn create(&self, codename: &str, kind: ProjectKind) -> Project {
        self.ctx
            .project_service()
            .create(&CreateProject::new(codename, codename, kind))
            .expect("Failed to create project")
    }

    pub fn manifests(&self) -> ManifestStore {
        ManifestStore::new(self.ctx.database().clone())
    }

    pub fn host_path(&self, relative: &str) -> PathBuf {
        self.host.join(relative)
    }
}

pub fn write_file(root: &Path, relative: &str, content: &str) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create parent directory");
    }
    fs::write(&path, content).expect("Failed to write file");
    path
}

/// Every path under `root`, relative and sorted, with file contents.
pub fn snapshot_tree(root: &Path) -> Vec<(PathBuf, Option<Vec<u8>>)> {
    let mut entries = Vec::new();
    collect(root, root, &mut entries);
    entries.sort();
    entries
}

fn collect(root: &Path, dir: &Path, out: &mut Vec<(PathBuf, Option<Vec<u8>>)>) {
    for entry in fs::read_dir(dir).expect("Failed to read dir") {
        let path = entry.expect("Failed to read entry").path();
        let relative = path.strip_prefix(root).expect("prefix").to_path_buf();
        if path.is_dir() {
            out.push((relative, None));
            collect(root, &path, out);
        } else {
            out.push((relative, Some(fs::read(&path).expect("Failed to read file"))));
        }
    }
}
