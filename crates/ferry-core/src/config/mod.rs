//! Configuration for ferry.
//!
//! A single `ferry.toml` holds the host root, the workspaces directory,
//! optional state location, extra protected directories and the bridge
//! command. Command-line flags override individual values.

pub mod parser;
pub mod paths;
pub mod schema;
pub mod store;

pub use parser::{parse_ferry_toml, parse_ferry_toml_str, to_toml};
pub use paths::{backup_dir, config_path, database_path, default_config_dir, default_state_dir};
pub use schema::{BridgeConfig, FerryConfig, GuardConfig};
pub use store::ConfigStore;
