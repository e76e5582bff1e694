//! Rendering of command results in table, JSON and quiet formats.

use anyhow::Result;
use console::style;

use ferry_core::deploy::{DeployResult, UninstallResult, Warning, WarningKind};
use ferry_core::manifest::DeploymentManifest;
use ferry_core::store::{HistoryEntry, Project};

use crate::OutputFormat;

pub(crate) fn print_project_created(project: &Project, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => {
            println!(
                "{} Registered {} '{}' ({})",
                style("✓").green(),
                project.kind,
                project.codename,
                project.version
            );
            println!("  Workspace: {}", project.workspace_path.display());
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(project)?),
        OutputFormat::Quiet => {}
    }
    Ok(())
}

pub(crate) fn print_project_list(projects: &[Project], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => {
            if projects.is_empty() {
                println!("No projects registered.");
                println!("Create one with: ferry create <codename> --kind plugin");
                return Ok(());
            }
            println!(
                "{:<24} {:<8} {:<12} {:<10} Workspace",
                "Codename", "Kind", "Status", "Version"
            );
            println!("{}", "-".repeat(80));
            for project in projects {
                println!(
                    "{:<24} {:<8} {:<12} {:<10} {}",
                    project.codename,
                    project.kind,
                    project.status,
                    project.version,
                    project.workspace_path.display()
                );
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(projects)?),
        OutputFormat::Quiet => {}
    }
    Ok(())
}

pub(crate) fn print_project_detail(
    project: &Project,
    manifest: &DeploymentManifest,
    verbose: bool,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Table => {
            println!("{}", style(&project.display_name).bold());
            println!("  Codename:   {}", project.codename);
            println!("  Kind:       {}", project.kind);
            println!("  Visibility: {}", project.visibility);
            println!("  Status:     {}", project.status);
            println!("  Version:    {}", project.version);
            println!("  Workspace:  {}", project.workspace_path.display());
            if let Some(installed_at) = project.installed_at {
                println!("  Installed:  {}", installed_at.to_rfc3339());
            }
            if manifest.is_empty() {
                println!("  Manifest:   none");
            } else {
                println!(
                    "  Manifest:   {} files, {} directories, {} backups{}",
                    manifest.file_count,
                    manifest.dir_count,
                    manifest.backups.len(),
                    if manifest.legacy { " (legacy)" } else { "" }
                );
            }
            if verbose {
                for file in &manifest.files {
                    println!("    {}", file.path.display());
                }
                for dir in &manifest.directories {
                    println!("    {}/", dir.display());
                }
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "project": project,
                "manifest": manifest,
                "legacy_manifest": manifest.legacy,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Quiet => {}
    }
    Ok(())
}

pub(crate) fn print_deploy_result(result: &DeployResult, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => {
            if result.success {
                println!(
                    "{} Installed '{}': {} files deployed, {} directories created, {} backups",
                    style("✓").green(),
                    result.codename,
                    result.files_deployed.len(),
                    result.dirs_created.len(),
                    result.backups_created.len()
                );
            }
            print_warnings(&result.warnings);
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(result)?),
        OutputFormat::Quiet => print_issues(&result.warnings),
    }
    Ok(())
}

pub(crate) fn print_uninstall_result(result: &UninstallResult, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => {
            if result.success {
                println!(
                    "{} Uninstalled '{}': {} files and {} directories removed, {} bytes freed",
                    style("✓").green(),
                    result.codename,
                    result.files_removed.len(),
                    result.dirs_removed.len(),
                    result.bytes_freed
                );
                if !result.restored.is_empty() {
                    println!("  Restored {} files from backups", result.restored.len());
                }
            }
            print_warnings(&result.warnings);
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(result)?),
        OutputFormat::Quiet => print_issues(&result.warnings),
    }
    Ok(())
}

pub(crate) fn print_history(entries: &[HistoryEntry], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => {
            if entries.is_empty() {
                println!("No history recorded.");
                return Ok(());
            }
            println!("{:<26} {:<20} {:<12} Details", "Time", "Project", "Action");
            println!("{}", "-".repeat(80));
            for entry in entries {
                println!(
                    "{:<26} {:<20} {:<12} {}",
                    entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    entry.codename,
                    entry.action.as_str(),
                    entry.details.as_deref().unwrap_or("-")
                );
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(entries)?),
        OutputFormat::Quiet => {}
    }
    Ok(())
}

fn print_warnings(warnings: &[Warning]) {
    for warning in warnings {
        println!("  {} {}", style("⚠").yellow(), warning);
    }
}

/// Warnings that need attention. The activation reminder is expected on
/// every install and is left out.
pub(crate) fn issues(warnings: &[Warning]) -> impl Iterator<Item = &Warning> {
    warnings
        .iter()
        .filter(|w| w.kind != WarningKind::Activation)
}

fn print_issues(warnings: &[Warning]) {
    for warning in issues(warnings) {
        eprintln!("{}", warning);
    }
}
