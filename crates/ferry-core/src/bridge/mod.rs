//! Seams to the host application's own runtime.
//!
//! The deployer only moves files. Anything that has to run inside the host
//! (activating a plugin, storing a theme's stylesheets and templates in the
//! host database) goes through these traits. Activation is always invoked by
//! the caller after a deploy, never by the deployer itself.

pub mod command;

use thiserror::Error;

pub use command::CommandBridge;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("no bridge command is configured")]
    NotConfigured,
    #[error("failed to run bridge command '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("bridge command '{command}' failed ({status}): {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeResourceKind {
    Stylesheet,
    Template,
}

impl ThemeResourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ThemeResourceKind::Stylesheet => "stylesheet",
            ThemeResourceKind::Template => "template",
        }
    }
}

/// A theme stylesheet or template as handed to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeResource {
    pub kind: ThemeResourceKind,
    pub name: String,
    pub content: Vec<u8>,
}

impl ThemeResource {
    /// Identifier recorded in the manifest, e.g. `stylesheet:global.css`.
    pub fn resource_id(&self) -> String {
        resource_id(self.kind, &self.name)
    }
}

pub fn resource_id(kind: ThemeResourceKind, name: &str) -> String {
    format!("{}:{}", kind.as_str(), name)
}

/// Split a manifest resource id back into kind and name.
pub fn parse_resource_id(id: &str) -> Option<(ThemeResourceKind, &str)> {
    let (kind, name) = id.split_once(':')?;
    let kind = match kind {
        "stylesheet" => ThemeResourceKind::Stylesheet,
        "template" => ThemeResourceKind::Template,
        _ => return None,
    };
    (!name.is_empty()).then_some((kind, name))
}

/// Stores theme resources in the host database.
pub trait ThemeBridge {
    fn push(&self, codename: &str, resource: &ThemeResource) -> Result<(), BridgeError>;
    fn retract(
        &self,
        codename: &str,
        kind: ThemeResourceKind,
        name: &str,
    ) -> Result<(), BridgeError>;
}

/// Runs the host's own activate/deactivate routines for a project.
pub trait ActivationBridge {
    fn activate(&self, codename: &str) -> Result<String, BridgeError>;
    fn deactivate(&self, codename: &str) -> Result<String, BridgeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_ids_round_trip() {
        let id = resource_id(ThemeResourceKind::Template, "header/welcome");
        assert_eq!(id, "template:header/welcome");
        assert_eq!(
            parse_resource_id(&id),
            Some((ThemeResourceKind::Template, "header/welcome"))
        );
        assert_eq!(parse_resource_id("/srv/forum/inc/plugins/widget.php"), None);
        assert_eq!(parse_resource_id("stylesheet:"), None);
    }
}
