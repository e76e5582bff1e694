//! Shared core types used across the store, workspace and deploy layers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// What a project deploys as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectKind {
    /// Filesystem plugin with a PHP entry point.
    Plugin,
    /// Theme whose stylesheets and templates live in the host database.
    Theme,
}

impl ProjectKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ProjectKind::Plugin => "plugin",
            ProjectKind::Theme => "theme",
        }
    }

    /// Directory name grouping workspaces of this kind.
    pub fn workspace_group(self) -> &'static str {
        match self {
            ProjectKind::Plugin => "plugins",
            ProjectKind::Theme => "themes",
        }
    }
}

impl fmt::Display for ProjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "plugin" => Ok(ProjectKind::Plugin),
            "theme" => Ok(ProjectKind::Theme),
            _ => anyhow::bail!("Unknown project kind: '{}'. Use 'plugin' or 'theme'", s),
        }
    }
}

/// Lifecycle status of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    Development,
    Installed,
    Archived,
}

impl ProjectStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ProjectStatus::Development => "development",
            ProjectStatus::Installed => "installed",
            ProjectStatus::Archived => "archived",
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" => Ok(ProjectStatus::Development),
            "installed" => Ok(ProjectStatus::Installed),
            "archived" => Ok(ProjectStatus::Archived),
            _ => anyhow::bail!("Unknown project status: '{}'", s),
        }
    }
}

/// Whether a workspace is published or kept private.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    #[default]
    Private,
}

impl Visibility {
    pub fn as_str(self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Visibility {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "public" => Ok(Visibility::Public),
            "private" => Ok(Visibility::Private),
            _ => anyhow::bail!("Unknown visibility: '{}'. Use 'public' or 'private'", s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_str() {
        for kind in [ProjectKind::Plugin, ProjectKind::Theme] {
            assert_eq!(kind.as_str().parse::<ProjectKind>().unwrap(), kind);
        }
        assert!("widget".parse::<ProjectKind>().is_err());
    }

    #[test]
    fn status_parse_is_case_insensitive() {
        assert_eq!(
            "Installed".parse::<ProjectStatus>().unwrap(),
            ProjectStatus::Installed
        );
    }
}
