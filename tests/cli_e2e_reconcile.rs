//! End-to-end tests for the commands that work on a build tree.
//!
//! These tests create real git repositories and run only with the
//! `integration-tests` feature.

mod common;
use common::prelude::*;

fn tree() -> BuildTreeFixture {
    let tree = BuildTreeFixture::new()
        .with_layer_repo("poky.git", &["meta", "meta-poky"])
        .with_layer_repo("meta-qt5.git", &["meta-qt5"]);
    tree.write_layer_list();
    tree
}

fn capture_into(tree: &BuildTreeFixture, name: &str) -> std::path::PathBuf {
    let path = tree.path().join(name);
    tree.command()
        .args(["capture", "--id", "0000-32", "--machine", "test@host", "-o"])
        .arg(&path)
        .assert()
        .success();
    path
}

fn pin_poky(snapshot: &std::path::Path, version: &str) {
    let content = std::fs::read_to_string(snapshot).unwrap();
    let content = format!("{}\n[poky.git]\nversion = {}\n", strip_section(&content, "poky.git"), version);
    std::fs::write(snapshot, content).unwrap();
}

/// Drop `[section]` and its keys from an INI document.
fn strip_section(content: &str, section: &str) -> String {
    let header = format!("[{}]", section);
    let mut skipping = false;
    let mut kept = Vec::new();
    for line in content.lines() {
        if line.starts_with('[') {
            skipping = line.trim() == header;
        }
        if !skipping {
            kept.push(line);
        }
    }
    kept.join("\n")
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_capture_writes_every_repository() {
    let tree = tree();
    let snapshot = capture_into(&tree, "snap.ini");

    let content = std::fs::read_to_string(snapshot).unwrap();
    assert!(content.contains("id = 0000-32"));
    assert!(content.contains("machine = test@host"));
    assert!(content.contains("[msc-ldk]"));
    assert!(content.contains("[poky.git]"));
    assert!(content.contains("[meta-qt5.git]"));
    assert!(content.contains("branch = develop"));
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_reconcile_captured_snapshot_is_up_to_date() {
    let tree = tree();
    let snapshot = capture_into(&tree, "snap.ini");

    tree.command()
        .arg("reconcile")
        .arg(&snapshot)
        .assert()
        .success()
        .stdout(predicate::str::contains("already at their requested versions"));
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_reconcile_with_relative_root() {
    let tree = tree();
    let snapshot = capture_into(&tree, "snap.ini");

    tree.command()
        .env("LAYER_SYNC_ROOT", "..")
        .arg("reconcile")
        .arg(&snapshot)
        .assert()
        .success()
        .stdout(predicate::str::contains("already at their requested versions"));

    tree.command()
        .args(["layers", "--root", ".."])
        .assert()
        .success()
        .stdout(predicate::str::contains("Layer: meta-qt5.git/meta-qt5"));
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_reconcile_dry_run_then_apply() {
    let tree = tree();
    let snapshot = capture_into(&tree, "snap.ini");
    pin_poky(&snapshot, "v1.0");
    let before = head_of(&tree.repo("poky.git"), "HEAD");

    tree.command()
        .args(["reconcile", "--dry-run"])
        .arg(&snapshot)
        .assert()
        .success()
        .stdout(predicate::str::contains("Would switch 1 layer repositories"));
    assert_eq!(head_of(&tree.repo("poky.git"), "HEAD"), before);

    tree.command()
        .arg("reconcile")
        .arg(&snapshot)
        .assert()
        .success()
        .stdout(predicate::str::contains("poky.git:"))
        .stdout(predicate::str::contains("Switched 1 layer repositories"));
    assert_eq!(
        head_of(&tree.repo("poky.git"), "HEAD"),
        head_of(&tree.repo("poky.git"), "v1.0")
    );
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_reconcile_json_report() {
    let tree = tree();
    let snapshot = capture_into(&tree, "snap.ini");

    let output = tree
        .command()
        .args(["reconcile", "--json"])
        .arg(&snapshot)
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let json_start = stdout.find('{').unwrap();
    let report: serde_json::Value = serde_json::from_str(&stdout[json_start..]).unwrap();
    assert_eq!(report["outcome"], "up-to-date");
    assert!(report["diagnostics"].is_object() || report["diagnostics"].is_array());
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_reconcile_unknown_layer_aborts() {
    let tree = tree();
    let snapshot = capture_into(&tree, "snap.ini");
    let content = std::fs::read_to_string(&snapshot).unwrap();
    std::fs::write(&snapshot, format!("{}\n[meta-gone.git]\nversion = v1.0\n", content)).unwrap();

    tree.command()
        .arg("reconcile")
        .arg(&snapshot)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Aborting snapshot activation"));
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_reconcile_anchor_switch_requests_restart() {
    let tree = tree();
    let snapshot = capture_into(&tree, "snap.ini");
    let content = strip_section(&std::fs::read_to_string(&snapshot).unwrap(), "msc-ldk");
    std::fs::write(&snapshot, format!("{}\n[msc-ldk]\nversion = v1.0\n", content)).unwrap();

    tree.command()
        .arg("reconcile")
        .arg(&snapshot)
        .assert()
        .code(3)
        .stdout(predicate::str::contains("run reconcile again"));
    assert_eq!(head_of(&tree.anchor(), "HEAD"), head_of(&tree.anchor(), "v1.0"));
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_reconcile_missing_snapshot_fails() {
    let tree = tree();

    tree.command()
        .arg("reconcile")
        .arg(tree.path().join("absent.ini"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Cannot read snapshot"));
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_layers_lists_repositories() {
    let tree = tree();

    tree.command()
        .arg("layers")
        .assert()
        .success()
        .stdout(predicate::str::contains("branch develop"))
        .stdout(predicate::str::contains("Layers: poky.git/meta, poky.git/meta-poky"))
        .stdout(predicate::str::contains("Layer: meta-qt5.git/meta-qt5"))
        .stdout(predicate::str::contains("second"));
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_resolve_ref_follows_development_anchor() {
    let tree = tree();

    tree.command()
        .args(["resolve-ref", "--ref", "v1.0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("msc-ldk is on branch develop"))
        .stdout(predicate::str::contains("poky.git: branch develop == develop"));
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_resolve_ref_checkout_with_force() {
    let tree = tree();

    tree.command()
        .args(["resolve-ref", "--ref", "v1.0", "--force", "--checkout"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Switched 2 layer repositories"));
    assert_eq!(
        head_of(&tree.repo("meta-qt5.git"), "HEAD"),
        head_of(&tree.repo("meta-qt5.git"), "v1.0")
    );
}
