//! End-to-end checks of the `dm` binary that never reach git or pip

mod common;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

use common::test_fixtures::WorkspaceFixture;

fn dm() -> Command {
    let mut cmd = Command::cargo_bin("dm").unwrap();
    cmd.env_remove("DM_MANIFEST")
        .env_remove("DM_PYTHON")
        .env_remove("DM_TIMEOUT")
        .env_remove("MONGODB_URI")
        .arg("--no-color");
    cmd
}

#[test]
fn test_help_lists_command_groups() {
    dm().arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("repo"))
        .stdout(predicate::str::contains("project"))
        .stdout(predicate::str::contains("frontend"));
}

#[test]
fn test_version_reports_build_info() {
    dm().arg("version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("dm "));
}

#[test]
fn test_package_license() {
    assert_eq!(env!("CARGO_PKG_LICENSE"), "BSD-3-Clause");
}

#[test]
fn test_missing_manifest_is_a_config_error() {
    let temp = TempDir::new().unwrap();
    dm().arg("-C")
        .arg(temp.path())
        .args(["repo", "list"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("dm init"));
}

#[test]
fn test_selector_is_required() {
    let fixture = WorkspaceFixture::sample();
    dm().arg("-C")
        .arg(fixture.root())
        .args(["repo", "pull"])
        .assert()
        .code(2);
}

#[test]
fn test_list_with_explicit_manifest() {
    let fixture = WorkspaceFixture::sample();
    let elsewhere = TempDir::new().unwrap();
    dm().arg("-C")
        .arg(elsewhere.path())
        .arg("--manifest")
        .arg(fixture.manifest_path())
        .args(["repo", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("demo"))
        .stdout(predicate::str::contains("wagtail"))
        .stdout(predicate::str::contains("bare"));
}

#[test]
fn test_unknown_repository_fails_without_running_anything() {
    let fixture = WorkspaceFixture::sample();
    dm().arg("-C")
        .arg(fixture.root())
        .args(["repo", "fetch", "zzz"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("zzz"));
    assert_path_not_exists!(fixture.root().join("src"));
}

#[test]
fn test_invalid_manifest_reports_every_problem() {
    let fixture = WorkspaceFixture::new(
        r#"
[tool.django_mongodb_cli]
repos = ["a@https://example.com/a.git", "a@https://example.com/other.git"]

[tool.django_mongodb_cli.groups]
g = ["missing"]
"#,
    );
    dm().arg("-C")
        .arg(fixture.root())
        .args(["repo", "list"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("missing"))
        .stderr(predicate::str::contains("'a'"));
}

#[test]
fn test_show_test_configuration() {
    let fixture = WorkspaceFixture::sample();
    dm().arg("-C")
        .arg(fixture.root())
        .args(["repo", "test", "django-filter", "--show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("runtests.py"));
}

#[test]
fn test_reset_refuses_without_confirmation() {
    let fixture = WorkspaceFixture::sample();
    fixture.fake_clone("demo");
    dm().arg("-C")
        .arg(fixture.root())
        .args(["repo", "reset", "demo"])
        .write_stdin("")
        .assert()
        .code(130);
}

#[test]
fn test_init_creates_then_refuses_to_overwrite() {
    let temp = TempDir::new().unwrap();
    dm().arg("-C")
        .arg(temp.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Next steps"));

    let manifest = std::fs::read_to_string(temp.path().join("pyproject.toml")).unwrap();
    assert!(manifest.contains("[tool.django_mongodb_cli]"));

    dm().arg("-C")
        .arg(temp.path())
        .arg("init")
        .assert()
        .code(1);

    dm().arg("-C")
        .arg(temp.path())
        .args(["init", "--force"])
        .assert()
        .success();

    dm().arg("-C")
        .arg(temp.path())
        .args(["repo", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("django-mongodb-backend"));
}
