//! Uninstall driven by hostile, hand-edited or legacy manifests.

mod support;

use std::fs;

use ferry_core::deploy::WarningKind;
use ferry_core::manifest::ManifestFile;
use ferry_core::types::{ProjectKind, ProjectStatus};

use support::{Fixture, write_file};

#[test]
fn scaffolding_in_manifest_is_never_deleted() {
    let fx = Fixture::new();
    fx.create("widget", ProjectKind::Plugin);
    let plugin = write_file(&fx.host, "inc/plugins/widget.php", "<?php");
    let neighbour = write_file(&fx.host, "inc/plugins/other.php", "<?php // other");

    // Empty the english language dir so only the guard stands in the way.
    fs::remove_dir_all(fx.host_path("inc/languages/english/admin")).unwrap();

    let directories = vec![
        fx.host.clone(),
        fx.host_path("inc"),
        fx.host_path("inc/plugins"),
        fx.host_path("inc/languages"),
        fx.host_path("inc/languages/english"),
        fx.host_path("uploads"),
        fx.host_path("images/.."),
    ];
    fx.manifests()
        .set_manifest(
            "widget",
            vec![ManifestFile::legacy(&plugin)],
            directories,
            Vec::new(),
        )
        .unwrap();

    let result = fx.ctx.uninstaller().uninstall("widget", &fx.host).unwrap();
    assert!(result.success);
    assert!(result.dirs_removed.is_empty());
    assert!(result.has_warning(WarningKind::ProtectedPath));
    assert!(!plugin.exists());
    assert!(neighbour.is_file());
    for dir in ["inc/plugins", "inc/languages/english", "uploads", "images"] {
        assert!(fx.host_path(dir).is_dir(), "{dir} was removed");
    }
}

#[test]
fn files_outside_host_root_are_refused() {
    let fx = Fixture::new();
    fx.create("widget", ProjectKind::Plugin);
    let outside = write_file(fx.temp.path(), "elsewhere/secret.txt", "keep");
    fx.manifests()
        .set_manifest(
            "widget",
            vec![
                ManifestFile::legacy(&outside),
                ManifestFile::legacy(fx.host.join("../elsewhere/secret.txt")),
            ],
            vec![fx.temp.path().join("elsewhere")],
            Vec::new(),
        )
        .unwrap();

    let result = fx.ctx.uninstaller().uninstall("widget", &fx.host).unwrap();
    assert!(result.files_removed.is_empty());
    assert!(result.dirs_removed.is_empty());
    assert_eq!(fs::read_to_string(&outside).unwrap(), "keep");
}

#[test]
fn deepest_first_stops_at_non_empty_directory() {
    let fx = Fixture::new();
    fx.create("widget", ProjectKind::Plugin);
    let a = fx.host_path("images/a");
    let b = a.join("b");
    let c = b.join("c");
    fs::create_dir_all(&c).unwrap();
    write_file(&b, "leftover.png", "png");

    fx.manifests()
        .set_manifest("widget", Vec::new(), vec![a.clone(), b.clone(), c.clone()], Vec::new())
        .unwrap();

    let result = fx.ctx.uninstaller().uninstall("widget", &fx.host).unwrap();
    assert_eq!(result.dirs_removed, vec![c.clone()]);
    assert!(result.has_warning(WarningKind::NonEmptyDirectory));
    assert!(b.join("leftover.png").is_file());
    assert!(a.is_dir());
}

#[test]
fn legacy_path_list_is_upgraded_and_uninstalled() {
    let fx = Fixture::new();
    fx.create("widget", ProjectKind::Plugin);
    let first = write_file(&fx.host, "inc/plugins/widget.php", "<?php");
    let second = write_file(&fx.host, "jscripts/widget.js", "// js");
    let third = fx.host_path("images/widget.png");

    let raw = serde_json::json!([first, second, third]).to_string();
    fx.manifests().set_raw_manifest("widget", &raw).unwrap();

    let manifest = fx.manifests().get_manifest("widget").unwrap();
    assert!(manifest.legacy);
    assert_eq!(manifest.file_count, 3);

    let result = fx.ctx.uninstaller().uninstall("widget", &fx.host).unwrap();
    assert!(result.has_warning(WarningKind::LegacyManifest));
    assert!(result.has_warning(WarningKind::MissingFile));
    assert_eq!(result.files_removed.len(), 2);
    assert!(!first.exists());
    assert!(!second.exists());
    assert!(fx.manifests().get_manifest("widget").unwrap().is_empty());
}

#[test]
fn legacy_file_dict_keeps_directories() {
    let fx = Fixture::new();
    fx.create("widget", ProjectKind::Plugin);
    let dir = fx.host_path("images/widget");
    let file = write_file(&dir, "logo.png", "png");

    let raw = serde_json::json!({
        "files": [file],
        "directories": [dir],
    })
    .to_string();
    fx.manifests().set_raw_manifest("widget", &raw).unwrap();

    let manifest = fx.manifests().get_manifest("widget").unwrap();
    assert!(manifest.legacy);
    assert_eq!((manifest.file_count, manifest.dir_count), (1, 1));

    let result = fx.ctx.uninstaller().uninstall("widget", &fx.host).unwrap();
    assert_eq!(result.dirs_removed, vec![dir.clone()]);
    assert!(!dir.exists());
}

#[test]
fn legacy_manifest_is_replaced_on_reinstall() {
    let fx = Fixture::new();
    let project = fx.create("widget", ProjectKind::Plugin);
    let stale = write_file(&fx.host, "jscripts/widget_v1.js", "// v1");
    let raw = serde_json::json!([stale]).to_string();
    fx.manifests().set_raw_manifest("widget", &raw).unwrap();

    let result = fx.ctx.deployer().install("widget", &fx.host).unwrap();
    assert!(result.has_warning(WarningKind::LegacyManifest));
    assert!(result.has_warning(WarningKind::Retained));

    let manifest = fx.manifests().get_manifest("widget").unwrap();
    assert!(!manifest.legacy);
    assert_eq!(manifest.file_count, 2);
    assert!(
        manifest
            .files
            .iter()
            .any(|f| f.path == fx.host_path("inc/plugins/widget.php") && f.checksum.is_some())
    );
    assert!(project.workspace_path.is_dir());
}

#[test]
fn garbage_manifest_is_rejected_at_write() {
    let fx = Fixture::new();
    fx.create("widget", ProjectKind::Plugin);
    assert!(fx.manifests().set_raw_manifest("widget", "42").is_err());
    assert!(fx.manifests().set_raw_manifest("widget", "[1, 2]").is_err());
    assert_eq!(
        fx.ctx.project_service().require("widget").unwrap().status,
        ProjectStatus::Development
    );
}
