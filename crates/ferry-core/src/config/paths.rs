//! Config and state path resolution helpers.

use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "ferry.toml";
pub const DATABASE_FILE: &str = "ferry.db";
pub const BACKUP_DIR: &str = "backups";

pub fn config_path(config_dir: &Path) -> PathBuf {
    config_dir.join(CONFIG_FILE)
}

pub fn default_config_dir() -> anyhow::Result<PathBuf> {
    Ok(dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
        .join("ferry"))
}

/// Platforms without a state directory fall back to local data.
pub fn default_state_dir() -> anyhow::Result<PathBuf> {
    Ok(dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .ok_or_else(|| anyhow::anyhow!("Could not determine state directory"))?
        .join("ferry"))
}

pub fn database_path(state_dir: &Path) -> PathBuf {
    state_dir.join(DATABASE_FILE)
}

pub fn backup_dir(state_dir: &Path) -> PathBuf {
    state_dir.join(BACKUP_DIR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_layout_is_rooted_at_state_dir() {
        let state = Path::new("/var/lib/ferry");
        assert_eq!(database_path(state), PathBuf::from("/var/lib/ferry/ferry.db"));
        assert_eq!(backup_dir(state), PathBuf::from("/var/lib/ferry/backups"));
        assert_eq!(
            config_path(Path::new("/etc/ferry")),
            PathBuf::from("/etc/ferry/ferry.toml")
        );
    }
}
