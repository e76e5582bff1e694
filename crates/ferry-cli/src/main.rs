//! Ferry - plugin & theme deployment manager
//!
//! Usage:
//!   ferry create widget --kind plugin   # Scaffold a workspace
//!   ferry install widget                # Deploy onto the host root
//!   ferry uninstall widget              # Remove what the install added
//!   ferry history                       # Recent lifecycle events

mod output;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use console::style;
use dialoguer::{Confirm, theme::ColorfulTheme};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ferry_core::config::ConfigStore;
use ferry_core::context::AppContext;
use ferry_core::deploy::{UninstallOptions, Warning};
use ferry_core::project::CreateProject;
use ferry_core::store::ProjectFilter;
use ferry_core::types::{ProjectKind, ProjectStatus, Visibility};

#[derive(Parser)]
#[command(name = "ferry")]
#[command(about = "Plugin & theme deployment manager", long_about = None)]
struct Cli {
    /// Path to ferry.toml (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Host root to deploy into (overrides host_root in ferry.toml)
    #[arg(long, global = true)]
    host_root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scaffold a new workspace and register it
    Create {
        /// Codename: lowercase letters, digits and underscores
        codename: String,
        /// Display name (defaults to the codename)
        #[arg(long)]
        name: Option<String>,
        /// plugin or theme
        #[arg(long, short, default_value = "plugin")]
        kind: String,
        /// public or private
        #[arg(long, default_value = "private")]
        visibility: String,
        /// Initial semantic version
        #[arg(long, default_value = "1.0.0")]
        version: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        author: Option<String>,
        /// Workspace location (defaults to <workspaces_dir>/<kind>s/<visibility>/<codename>)
        #[arg(long)]
        path: Option<PathBuf>,
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Register an existing workspace from its meta.json
    Register {
        path: PathBuf,
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// List registered projects
    #[command(alias = "ls")]
    List {
        /// Filter by kind (plugin or theme)
        #[arg(long, short)]
        kind: Option<String>,
        /// Filter by status (development, installed, archived)
        #[arg(long, short)]
        status: Option<String>,
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Show a project and its deployment manifest
    Show {
        codename: String,
        /// List every manifest entry
        #[arg(short = 'v', long)]
        verbose: bool,
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Deploy a workspace onto the host root
    Install {
        codename: String,
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Remove everything a previous install deployed
    #[command(alias = "rm")]
    Uninstall {
        codename: String,
        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
        /// Put overwritten host files back from their backups
        #[arg(long)]
        restore_backups: bool,
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Show lifecycle history, newest first
    History {
        /// Only this project
        codename: Option<String>,
        #[arg(long, short = 'n', default_value_t = 20)]
        limit: usize,
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Run the host's activation routine through the bridge
    Activate { codename: String },

    /// Run the host's deactivation routine through the bridge
    Deactivate { codename: String },

    /// Archive a project in development
    Archive { codename: String },

    /// Return an archived project to development
    Restore { codename: String },
}

#[derive(Clone, Copy, ValueEnum, Default)]
pub(crate) enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// Machine-readable JSON
    Json,
    /// Only show issues (non-zero exit if install or uninstall reports any)
    Quiet,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ferry=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let ctx = build_context(&cli)?;
    let result = run_cli(&ctx, cli.command);
    ctx.diagnostics().report_leaks();
    result
}

fn build_context(cli: &Cli) -> Result<AppContext> {
    let store = match &cli.config {
        Some(path) => ConfigStore::from_path(path.clone()),
        None => ConfigStore::from_default_location()?,
    };
    let config = store.load()?;
    let mut ctx = AppContext::from_config(config)?;
    if let Some(host_root) = &cli.host_root {
        let host_root = std::path::absolute(host_root)
            .with_context(|| format!("Invalid host root: {}", host_root.display()))?;
        ctx.set_host_root(host_root);
    }
    Ok(ctx)
}

fn run_cli(ctx: &AppContext, command: Commands) -> Result<()> {
    match command {
        Commands::Create {
            codename,
            name,
            kind,
            visibility,
            version,
            description,
            author,
            path,
            format,
        } => {
            let mut request = CreateProject::new(
                codename.clone(),
                name.unwrap_or(codename),
                kind.parse::<ProjectKind>()?,
            );
            request.visibility = visibility.parse::<Visibility>()?;
            request.version = version;
            request.description = description;
            request.author = author;
            request.workspace_path = path;

            let project = ctx.project_service().create(&request)?;
            output::print_project_created(&project, format)?;
        }
        Commands::Register { path, format } => {
            let path = std::path::absolute(&path)
                .with_context(|| format!("Invalid workspace path: {}", path.display()))?;
            let project = ctx.project_service().register_existing(&path)?;
            output::print_project_created(&project, format)?;
        }
        Commands::List {
            kind,
            status,
            format,
        } => {
            let mut filter = ProjectFilter::default();
            if let Some(kind) = kind {
                filter = filter.with_kind(kind.parse::<ProjectKind>()?);
            }
            if let Some(status) = status {
                filter = filter.with_status(status.parse::<ProjectStatus>()?);
            }
            let projects = ctx.project_service().list(&filter)?;
            output::print_project_list(&projects, format)?;
        }
        Commands::Show {
            codename,
            verbose,
            format,
        } => {
            let service = ctx.project_service();
            let project = service.require(&codename)?;
            let manifest = service.manifest(&codename)?;
            output::print_project_detail(&project, &manifest, verbose, format)?;
        }
        Commands::Install { codename, format } => run_install(ctx, &codename, format)?,
        Commands::Uninstall {
            codename,
            yes,
            restore_backups,
            format,
        } => run_uninstall(ctx, &codename, yes, restore_backups, format)?,
        Commands::History {
            codename,
            limit,
            format,
        } => {
            let entries = ctx.project_service().history(codename.as_deref(), limit)?;
            output::print_history(&entries, format)?;
        }
        Commands::Activate { codename } => {
            let bridge = require_bridge(ctx)?;
            let out = ctx.project_service().activate(&bridge, &codename)?;
            println!("{} Activated '{}'", style("✓").green(), codename);
            print_bridge_output(&out);
        }
        Commands::Deactivate { codename } => {
            let bridge = require_bridge(ctx)?;
            let out = ctx.project_service().deactivate(&bridge, &codename)?;
            println!("{} Deactivated '{}'", style("✓").green(), codename);
            print_bridge_output(&out);
        }
        Commands::Archive { codename } => {
            ctx.project_service().archive(&codename)?;
            println!("{} Archived '{}'", style("✓").green(), codename);
        }
        Commands::Restore { codename } => {
            ctx.project_service().restore(&codename)?;
            println!("{} Restored '{}' to development", style("✓").green(), codename);
        }
    }
    Ok(())
}

fn run_install(ctx: &AppContext, codename: &str, format: OutputFormat) -> Result<()> {
    let host_root = ctx.host_root()?;
    let service = ctx.project_service();
    if service.get(codename)?.is_some()
        && let Some(version) = service.sync_version(codename)?
    {
        tracing::info!(codename, version = %version, "picked up version from meta.json");
    }

    let result = ctx.deployer().install(codename, host_root)?;
    output::print_deploy_result(&result, format)?;
    if let Some(error) = &result.error {
        anyhow::bail!("Install of '{}' failed: {}", codename, error);
    }
    fail_on_quiet_issues(format, &result.warnings, "Install", codename)
}

fn run_uninstall(
    ctx: &AppContext,
    codename: &str,
    yes: bool,
    restore_backups: bool,
    format: OutputFormat,
) -> Result<()> {
    let host_root = ctx.host_root()?;
    if !yes {
        let manifest = ctx.project_service().manifest(codename)?;
        let prompt = format!(
            "Remove {} files and {} directories of '{}' from {}?",
            manifest.file_count,
            manifest.dir_count,
            codename,
            host_root.display()
        );
        let confirmed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .default(false)
            .interact()?;
        if !confirmed {
            println!("Uninstall cancelled.");
            return Ok(());
        }
    }

    let options = UninstallOptions { restore_backups };
    let result = ctx
        .uninstaller()
        .uninstall_with(codename, host_root, options)?;
    output::print_uninstall_result(&result, format)?;
    if let Some(error) = &result.error {
        anyhow::bail!("Uninstall of '{}' failed: {}", codename, error);
    }
    fail_on_quiet_issues(format, &result.warnings, "Uninstall", codename)
}

/// Quiet mode turns reported issues into a non-zero exit.
fn fail_on_quiet_issues(
    format: OutputFormat,
    warnings: &[Warning],
    operation: &str,
    codename: &str,
) -> Result<()> {
    if !matches!(format, OutputFormat::Quiet) {
        return Ok(());
    }
    let count = output::issues(warnings).count();
    if count > 0 {
        anyhow::bail!("{} of '{}' reported {} issue(s)", operation, codename, count);
    }
    Ok(())
}

fn require_bridge(ctx: &AppContext) -> Result<ferry_core::bridge::CommandBridge> {
    ctx.command_bridge().ok_or_else(|| {
        anyhow::anyhow!("No bridge configured; set [bridge] command in ferry.toml")
    })
}

fn print_bridge_output(out: &str) {
    for line in out.lines() {
        println!("  {}", style(line).dim());
    }
}
