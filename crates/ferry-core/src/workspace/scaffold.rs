//! Fresh workspace layout for a new project.

use std::fs;
use std::path::Path;

use anyhow::Context;

use super::meta::WorkspaceMeta;
use super::{Workspace, mirrored_subtrees};
use crate::types::ProjectKind;

/// Create a workspace with metadata, a minimal entry point, and empty
/// mirrored subtrees.
///
/// Refuses to touch a directory that already contains a `meta.json`.
pub fn scaffold_workspace(root: &Path, meta: &WorkspaceMeta) -> anyhow::Result<()> {
    meta.validate()?;
    if root.join(super::META_FILE).exists() {
        anyhow::bail!("Workspace already exists: {}", root.display());
    }
    fs::create_dir_all(root)
        .with_context(|| format!("Failed to create workspace: {}", root.display()))?;

    for (subtree, _) in mirrored_subtrees(meta.kind) {
        let dir = root.join(subtree);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
    }

    match meta.kind {
        ProjectKind::Plugin => {
            let entry = root.join(Workspace::plugin_entry_relative(&meta.codename));
            write_new(&entry, &plugin_stub(meta))?;
        }
        ProjectKind::Theme => {
            write_new(&root.join("stylesheets").join("global.css"), "/* global */\n")?;
        }
    }

    meta.save(root)
}

fn write_new(path: &Path, content: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}

fn plugin_stub(meta: &WorkspaceMeta) -> String {
    let codename = &meta.codename;
    let name = meta.name.replace('\'', "\\'");
    let description = meta
        .description
        .as_deref()
        .unwrap_or_default()
        .replace('\'', "\\'");
    let author = meta.author.as_deref().unwrap_or_default().replace('\'', "\\'");
    format!(
        "<?php\n\
         if (!defined('IN_MYBB')) {{\n    die('Direct access not allowed.');\n}}\n\n\
         function {codename}_info()\n{{\n    return [\n\
         \x20       'name' => '{name}',\n\
         \x20       'description' => '{description}',\n\
         \x20       'author' => '{author}',\n\
         \x20       'version' => '{version}',\n\
         \x20       'codename' => '{codename}',\n\
         \x20       'compatibility' => '18*',\n\
         \x20   ];\n}}\n",
        version = meta.version,
    )
}
