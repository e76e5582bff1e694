//! Filesystem primitives shared across features.

pub mod checksum;

use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use filetime::FileTime;

pub use checksum::{bytes_checksum, file_checksum};

/// Metadata captured for a file right after it was written.
#[derive(Debug, Clone)]
pub struct FileFacts {
    pub size: u64,
    pub mtime: Option<DateTime<Utc>>,
    pub checksum: String,
}

/// Stat and checksum a file.
pub fn file_facts(path: &Path) -> anyhow::Result<FileFacts> {
    let meta = fs::metadata(path)
        .with_context(|| format!("Failed to stat file: {}", path.display()))?;
    let mtime = meta.modified().ok().map(DateTime::<Utc>::from);
    Ok(FileFacts {
        size: meta.len(),
        mtime,
        checksum: file_checksum(path)?,
    })
}

/// Copy `src` over `dst`, carrying the source modification time across.
///
/// The parent of `dst` must already exist; directory creation is the
/// caller's decision.
pub fn copy_preserving_mtime(src: &Path, dst: &Path) -> anyhow::Result<u64> {
    let bytes = fs::copy(src, dst)
        .with_context(|| format!("Failed to copy {} to {}", src.display(), dst.display()))?;
    let src_meta = fs::metadata(src)
        .with_context(|| format!("Failed to stat source file: {}", src.display()))?;
    let mtime = FileTime::from_last_modification_time(&src_meta);
    filetime::set_file_mtime(dst, mtime)
        .with_context(|| format!("Failed to set mtime on {}", dst.display()))?;
    Ok(bytes)
}

/// Resolve `.` and `..` components without touching the filesystem.
///
/// A `..` that would climb above the first component is kept, so callers can
/// detect paths escaping their base.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    out.iter().map(|c| c.as_os_str()).collect()
}

/// Number of normal components, used for deepest-first ordering.
pub fn path_depth(path: &Path) -> usize {
    path.components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .count()
}
