mod common;

use common::{fixture, wfpatch, Workspace};
use std::ffi::OsString;
use std::path::Path;

fn args(flags: &[&str], files: &[&Path]) -> Vec<OsString> {
    flags
        .iter()
        .map(OsString::from)
        .chain(files.iter().map(|path| path.as_os_str().to_owned()))
        .collect()
}

#[test]
fn check_reports_pending_updates_without_writing() {
    let workspace = Workspace::create();
    let original = fixture("pester/pester-selfhosted.yml");
    let path = workspace.add("pester-selfhosted.yml", &original);

    let run = wfpatch(args(&["--check"], &[&path]));
    assert_eq!(run.code, 3, "{run:?}");
    assert!(
        run.stdout.contains(&format!("NEEDS UPDATE: {}", path.display())),
        "{run:?}"
    );
    assert_eq!(workspace.read(&path), original);
}

#[test]
fn write_converges_and_a_second_check_is_clean() {
    let workspace = Workspace::create();
    let path = workspace.add(
        "pester-selfhosted.yml",
        &fixture("pester/pester-selfhosted.yml"),
    );

    let run = wfpatch(args(&["--write"], &[&path]));
    assert_eq!(run.code, 0, "{run:?}");
    assert!(
        run.stdout.contains(&format!("updated: {}", path.display())),
        "{run:?}"
    );
    assert_eq!(workspace.read(&path), fixture("pester/expected.yml"));

    let run = wfpatch(args(&["--check"], &[&path]));
    assert_eq!(run.code, 0, "{run:?}");
    assert!(run.stdout.is_empty(), "{run:?}");

    let run = wfpatch(args(&["--write"], &[&path]));
    assert_eq!(run.code, 0, "{run:?}");
    assert!(run.stdout.is_empty(), "{run:?}");
}

#[test]
fn malformed_files_are_skipped_and_the_rest_processed() {
    let workspace = Workspace::create();
    let broken = workspace.add("broken.yml", "on: [push\n");
    let pester = workspace.add(
        "pester-selfhosted.yml",
        &fixture("pester/pester-selfhosted.yml"),
    );
    let plain = workspace.add("plain.yml", "name: Plain\non: push\n");

    let run = wfpatch(args(&["--write"], &[&broken, &pester, &plain]));
    assert_eq!(run.code, 0, "{run:?}");
    assert!(
        run.stdout
            .contains(&format!("::warning::Skipping {}", broken.display())),
        "{run:?}"
    );
    assert_eq!(workspace.read(&broken), "on: [push\n");
    assert_eq!(workspace.read(&pester), fixture("pester/expected.yml"));
    assert_eq!(workspace.read(&plain), "name: Plain\non: push\n");
}

#[test]
fn missing_files_are_skipped() {
    let workspace = Workspace::create();
    let missing = workspace.path().join("missing.yml");
    let run = wfpatch(args(&["--check"], &[&missing]));
    assert_eq!(run.code, 0, "{run:?}");
    assert!(run.stdout.contains("::warning::Skipping"), "{run:?}");
}

#[test]
fn json_summary_follows_the_notices() {
    let workspace = Workspace::create();
    let path = workspace.add(
        "pester-selfhosted.yml",
        &fixture("pester/pester-selfhosted.yml"),
    );
    let run = wfpatch(args(&["--check", "--json"], &[&path]));
    assert_eq!(run.code, 3, "{run:?}");
    let start = run.stdout.find('{').expect("json in stdout");
    let summary: serde_json::Value =
        serde_json::from_str(&run.stdout[start..]).expect("summary parses");
    assert_eq!(summary["mode"], "check");
    assert_eq!(summary["files"][0]["status"], "needs_update");
    assert_eq!(
        summary["files"][0]["rules"].as_array().map(Vec::len),
        Some(4)
    );
}

#[test]
fn config_rule_sets_extend_the_catalog() {
    let workspace = Workspace::create();
    let config = workspace.add(
        "wfpatch.json",
        r#"{
  "builtin_catalog": false,
  "rule_sets": [{
    "name": "ci-lint",
    "file_names": ["ci.yml"],
    "rules": [{"name": "needs-lint", "actions": [
      {"op": "ensure_list_contains", "parent": "jobs.test", "key": "needs", "value": "lint"}
    ]}]
  }]
}"#,
    );
    let ci = workspace.add("ci.yml", "jobs:\n  test:\n    needs: [build]\n");
    let config_arg = config.display().to_string();
    let run = wfpatch(args(&["--write", "--config", &config_arg], &[&ci]));
    assert_eq!(run.code, 0, "{run:?}");
    assert_eq!(
        workspace.read(&ci),
        "jobs:\n  test:\n    needs: [build, lint]\n"
    );
}

#[test]
fn usage_and_config_errors_exit_two() {
    let workspace = Workspace::create();
    let path = workspace.add("ci.yml", "name: CI\n");

    let run = wfpatch(args(&[], &[&path]));
    assert_eq!(run.code, 2, "{run:?}");

    let run = wfpatch(args(&["--check", "--write"], &[&path]));
    assert_eq!(run.code, 2, "{run:?}");

    let missing = workspace.path().join("absent.json");
    let missing_arg = missing.display().to_string();
    let run = wfpatch(args(&["--check", "--config", &missing_arg], &[&path]));
    assert_eq!(run.code, 2, "{run:?}");
    assert!(run.stderr.contains("error:"), "{run:?}");
}
