//! End-to-end install and uninstall of plugin workspaces.

mod support;

use std::fs;

use ferry_core::deploy::{LifecycleError, UninstallOptions, WarningKind};
use ferry_core::fs::file_checksum;
use ferry_core::store::HistoryAction;
use ferry_core::types::{ProjectKind, ProjectStatus};

use support::{Fixture, snapshot_tree, write_file};

#[test]
fn widget_install_then_uninstall() {
    let fx = Fixture::new();
    let project = fx.create("widget", ProjectKind::Plugin);
    write_file(
        &project.workspace_path,
        "inc/languages/english/widget.lang.php",
        "<?php $l['widget'] = 'Widget';",
    );

    let result = fx.ctx.deployer().install("widget", &fx.host).unwrap();
    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.file_count, 2);
    assert_eq!(result.dir_count, 0);
    assert!(result.dirs_created.is_empty());
    assert!(result.has_warning(WarningKind::Activation));
    assert!(fx.host_path("inc/plugins/widget.php").is_file());
    assert!(fx.host_path("inc/languages/english/widget.lang.php").is_file());

    let installed = fx.ctx.project_service().require("widget").unwrap();
    assert_eq!(installed.status, ProjectStatus::Installed);
    assert!(installed.installed_at.is_some());

    let result = fx.ctx.uninstaller().uninstall("widget", &fx.host).unwrap();
    assert!(result.success);
    assert_eq!(result.files_removed.len(), 2);
    assert!(result.bytes_freed > 0);
    assert!(!fx.host_path("inc/plugins/widget.php").exists());
    assert!(!fx.host_path("inc/languages/english/widget.lang.php").exists());
    assert!(fx.host_path("inc/plugins").is_dir());
    assert!(fx.host_path("inc/languages/english").is_dir());

    let project = fx.ctx.project_service().require("widget").unwrap();
    assert_eq!(project.status, ProjectStatus::Development);
    assert!(project.installed_at.is_none());
    assert_eq!(fx.manifests().get_manifest("widget").unwrap().file_count, 0);

    let actions: Vec<_> = fx
        .ctx
        .project_service()
        .history(Some("widget"), 10)
        .unwrap()
        .into_iter()
        .map(|entry| entry.action)
        .collect();
    assert_eq!(
        actions,
        vec![
            HistoryAction::Uninstalled,
            HistoryAction::Installed,
            HistoryAction::Created
        ]
    );
}

#[test]
fn reinstall_of_unchanged_workspace_is_stable() {
    let fx = Fixture::new();
    let project = fx.create("widget", ProjectKind::Plugin);
    write_file(&project.workspace_path, "images/widget/icons/star.png", "png");
    write_file(&project.workspace_path, "jscripts/widget.js", "// js");

    let first = fx.ctx.deployer().install("widget", &fx.host).unwrap();
    assert_eq!(first.dirs_created.len(), 2);
    assert_eq!(first.file_count, 3);
    assert_eq!(first.dir_count, 2);

    let second = fx.ctx.deployer().install("widget", &fx.host).unwrap();
    assert!(second.success);
    assert!(second.dirs_created.is_empty());
    assert_eq!(second.file_count, first.file_count);
    assert_eq!(second.dir_count, first.dir_count);

    let manifest = fx.manifests().get_manifest("widget").unwrap();
    let mut dirs = manifest.directories.clone();
    dirs.dedup();
    assert_eq!(dirs.len(), manifest.directories.len());

    let result = fx.ctx.uninstaller().uninstall("widget", &fx.host).unwrap();
    assert_eq!(result.dirs_removed.len(), 2);
    assert!(!fx.host_path("images/widget").exists());
    assert!(fx.host_path("images").is_dir());
}

#[test]
fn overwritten_files_are_backed_up_and_restorable() {
    let fx = Fixture::new();
    let project = fx.create("widget", ProjectKind::Plugin);
    write_file(
        &project.workspace_path,
        "inc/languages/english/widget.lang.php",
        "new strings",
    );
    let existing = write_file(&fx.host, "inc/languages/english/widget.lang.php", "old strings");
    let pre_checksum = file_checksum(&existing).unwrap();
    let before = snapshot_tree(&fx.host);

    let result = fx.ctx.deployer().install("widget", &fx.host).unwrap();
    assert_eq!(result.backups_created.len(), 1);
    let backup = &result.backups_created[0];
    assert_eq!(backup.checksum.as_deref(), Some(pre_checksum.as_str()));
    assert_eq!(backup.original.as_deref(), Some(existing.as_path()));
    assert!(!backup.path.starts_with(&fx.host));
    assert_eq!(fs::read_to_string(&existing).unwrap(), "new strings");

    let result = fx
        .ctx
        .uninstaller()
        .uninstall_with("widget", &fx.host, UninstallOptions { restore_backups: true })
        .unwrap();
    assert!(result.success);
    assert_eq!(result.restored, vec![existing.clone()]);
    assert_eq!(snapshot_tree(&fx.host), before);
}

#[test]
fn restore_after_reinstall_returns_host_to_pre_install_state() {
    let fx = Fixture::new();
    let project = fx.create("widget", ProjectKind::Plugin);
    write_file(&project.workspace_path, "images/widget/logo.png", "png");
    write_file(
        &project.workspace_path,
        "inc/languages/english/widget.lang.php",
        "new strings",
    );
    let existing = write_file(&fx.host, "inc/languages/english/widget.lang.php", "old strings");
    let before = snapshot_tree(&fx.host);

    fx.ctx.deployer().install("widget", &fx.host).unwrap();
    let second = fx.ctx.deployer().install("widget", &fx.host).unwrap();
    assert!(second.backups_created.is_empty());
    assert_eq!(fx.manifests().get_manifest("widget").unwrap().backups.len(), 1);

    let result = fx
        .ctx
        .uninstaller()
        .uninstall_with("widget", &fx.host, UninstallOptions { restore_backups: true })
        .unwrap();
    assert!(result.success);
    assert_eq!(result.restored, vec![existing]);
    assert!(!fx.host_path("inc/plugins/widget.php").exists());
    assert!(!fx.host_path("images/widget").exists());
    assert_eq!(snapshot_tree(&fx.host), before);
}

#[test]
fn edited_deployed_file_is_backed_up_but_not_restored() {
    let fx = Fixture::new();
    let project = fx.create("widget", ProjectKind::Plugin);
    write_file(&project.workspace_path, "jscripts/widget.js", "// js");
    let before = snapshot_tree(&fx.host);

    fx.ctx.deployer().install("widget", &fx.host).unwrap();
    write_file(&fx.host, "jscripts/widget.js", "// hand edited");

    let second = fx.ctx.deployer().install("widget", &fx.host).unwrap();
    assert_eq!(second.backups_created.len(), 1);
    assert!(!second.backups_created[0].pre_install);
    assert_eq!(
        fs::read_to_string(fx.host_path("jscripts/widget.js")).unwrap(),
        "// js"
    );

    let result = fx
        .ctx
        .uninstaller()
        .uninstall_with("widget", &fx.host, UninstallOptions { restore_backups: true })
        .unwrap();
    assert!(result.restored.is_empty());
    assert_eq!(snapshot_tree(&fx.host), before);
}

#[test]
fn uninstall_without_restore_leaves_overwritten_path_absent() {
    let fx = Fixture::new();
    let project = fx.create("widget", ProjectKind::Plugin);
    write_file(&project.workspace_path, "inc/plugins/widget_hooks.php", "hooks");
    let other = write_file(&fx.host, "inc/plugins/other.php", "<?php // other");
    let overwritten = write_file(&fx.host, "inc/plugins/widget_hooks.php", "stale");

    fx.ctx.deployer().install("widget", &fx.host).unwrap();
    let result = fx.ctx.uninstaller().uninstall("widget", &fx.host).unwrap();

    assert!(result.restored.is_empty());
    assert!(!overwritten.exists());
    assert_eq!(fs::read_to_string(other).unwrap(), "<?php // other");
    assert_eq!(
        fs::read_to_string(fx.host_path("index.php")).unwrap(),
        "<?php // forum"
    );
}

#[test]
fn files_removed_from_workspace_are_retained_until_uninstall() {
    let fx = Fixture::new();
    let project = fx.create("widget", ProjectKind::Plugin);
    let dropped = write_file(&project.workspace_path, "jscripts/widget_old.js", "// old");

    fx.ctx.deployer().install("widget", &fx.host).unwrap();
    fs::remove_file(dropped).unwrap();

    let result = fx.ctx.deployer().install("widget", &fx.host).unwrap();
    assert!(result.has_warning(WarningKind::Retained));
    assert_eq!(result.file_count, 2);
    assert!(fx.host_path("jscripts/widget_old.js").is_file());

    fx.ctx.uninstaller().uninstall("widget", &fx.host).unwrap();
    assert!(!fx.host_path("jscripts/widget_old.js").exists());
}

#[test]
fn missing_workspace_fails_without_mutation() {
    let fx = Fixture::new();
    let project = fx.create("widget", ProjectKind::Plugin);
    fs::remove_dir_all(&project.workspace_path).unwrap();
    let before = snapshot_tree(&fx.host);

    let result = fx.ctx.deployer().install("widget", &fx.host).unwrap();
    assert!(!result.success);
    assert!(matches!(
        result.error,
        Some(LifecycleError::WorkspaceNotFound(_))
    ));
    assert_eq!(snapshot_tree(&fx.host), before);
    assert_eq!(
        fx.ctx.project_service().require("widget").unwrap().status,
        ProjectStatus::Development
    );
}

#[test]
fn missing_entry_point_fails_without_mutation() {
    let fx = Fixture::new();
    let project = fx.create("widget", ProjectKind::Plugin);
    fs::remove_file(project.workspace_path.join("inc/plugins/widget.php")).unwrap();
    write_file(&project.workspace_path, "jscripts/widget.js", "// js");
    let before = snapshot_tree(&fx.host);

    let result = fx.ctx.deployer().install("widget", &fx.host).unwrap();
    assert!(matches!(
        result.error,
        Some(LifecycleError::EntryPointMissing(_))
    ));
    assert_eq!(snapshot_tree(&fx.host), before);
    assert!(fx.manifests().get_manifest("widget").unwrap().is_empty());
}

#[test]
fn unknown_and_archived_projects_do_not_install() {
    let fx = Fixture::new();
    let result = fx.ctx.deployer().install("ghost", &fx.host).unwrap();
    assert!(matches!(result.error, Some(LifecycleError::ProjectNotFound(_))));

    fx.create("widget", ProjectKind::Plugin);
    fx.ctx.project_service().archive("widget").unwrap();
    let result = fx.ctx.deployer().install("widget", &fx.host).unwrap();
    assert!(matches!(result.error, Some(LifecycleError::ProjectArchived(_))));
    assert!(!fx.host_path("inc/plugins/widget.php").exists());
}

#[test]
fn archived_project_is_not_uninstalled() {
    let fx = Fixture::new();
    fx.create("widget", ProjectKind::Plugin);
    let entry = write_file(&fx.host, "inc/plugins/widget.php", "<?php // hand copied");
    fx.ctx.project_service().archive("widget").unwrap();

    let result = fx.ctx.uninstaller().uninstall("widget", &fx.host).unwrap();
    assert!(!result.success);
    assert!(matches!(result.error, Some(LifecycleError::ProjectArchived(_))));
    assert!(entry.is_file());

    let service = fx.ctx.project_service();
    assert_eq!(service.require("widget").unwrap().status, ProjectStatus::Archived);
    let actions: Vec<_> = service
        .history(Some("widget"), 10)
        .unwrap()
        .into_iter()
        .map(|entry| entry.action)
        .collect();
    assert!(!actions.contains(&HistoryAction::Uninstalled));
}

#[test]
fn uninstall_without_manifest_removes_only_entry_point() {
    let fx = Fixture::new();
    fx.create("widget", ProjectKind::Plugin);
    write_file(&fx.host, "inc/plugins/widget.php", "<?php // hand copied");
    write_file(&fx.host, "jscripts/widget.js", "// hand copied");

    let result = fx.ctx.uninstaller().uninstall("widget", &fx.host).unwrap();
    assert!(result.success);
    assert!(result.has_warning(WarningKind::IncompleteCleanup));
    assert_eq!(result.files_removed, vec![fx.host_path("inc/plugins/widget.php")]);
    assert!(fx.host_path("jscripts/widget.js").is_file());
}

#[test]
fn missing_scaffolding_is_never_created() {
    let fx = Fixture::with_scaffolding(&["inc/plugins", "images"]);
    let project = fx.create("widget", ProjectKind::Plugin);
    write_file(&project.workspace_path, "admin/modules/widget/index.php", "<?php");

    let result = fx.ctx.deployer().install("widget", &fx.host).unwrap();
    assert!(result.success);
    assert!(result.has_warning(WarningKind::ProtectedPath));
    assert!(!fx.host_path("admin").exists());
    assert_eq!(result.file_count, 1);
}

#[test]
fn user_files_in_deployed_directories_are_kept() {
    let fx = Fixture::new();
    let project = fx.create("widget", ProjectKind::Plugin);
    write_file(&project.workspace_path, "images/widget/logo.png", "png");

    fx.ctx.deployer().install("widget", &fx.host).unwrap();
    let user_file = write_file(&fx.host, "images/widget/uploaded.png", "user");

    let result = fx.ctx.uninstaller().uninstall("widget", &fx.host).unwrap();
    assert!(result.success);
    assert!(result.has_warning(WarningKind::NonEmptyDirectory));
    assert!(user_file.is_file());
    assert!(!fx.host_path("images/widget/logo.png").exists());
}
