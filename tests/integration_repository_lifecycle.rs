//! Clone, install, git and delete use cases against a workspace on disk

mod common;

use std::sync::Arc;

use common::assertion_helpers::{assert_has_command, snapshot_tree};
use common::recording_runner::RecordingRunner;
use common::test_fixtures::WorkspaceFixture;
use pretty_assertions::assert_eq;

use django_mongodb_cli::application::use_cases::batch::silent;
use django_mongodb_cli::application::use_cases::clone_repositories::{
    CloneRepositoriesConfig, CloneRepositoriesUseCase,
};
use django_mongodb_cli::application::use_cases::delete_repositories::DeleteRepositoriesUseCase;
use django_mongodb_cli::application::use_cases::git_operations::{
    GitOperation, GitOperationsUseCase,
};
use django_mongodb_cli::application::use_cases::install_repositories::{
    InstallRepositoriesConfig, InstallRepositoriesUseCase,
};
use django_mongodb_cli::application::use_cases::status_check::{
    RepositoryState, StatusCheckUseCase,
};
use django_mongodb_cli::application::use_cases::RepoOutcome;
use django_mongodb_cli::domain::entities::invocation::Selector;
use django_mongodb_cli::infrastructure::process::ProcessRunner;

fn names(list: &[&str]) -> Selector {
    Selector::Names(list.iter().map(|s| s.to_string()).collect())
}

fn runner_arc(runner: &RecordingRunner) -> Arc<dyn ProcessRunner> {
    Arc::new(runner.clone())
}

#[tokio::test]
async fn test_clone_uses_pinned_branch() {
    let fixture = WorkspaceFixture::sample();
    let workspace = fixture.load().await;
    let runner = RecordingRunner::new();

    let result = CloneRepositoriesUseCase::new(&workspace, runner_arc(&runner))
        .execute(&CloneRepositoriesConfig::new(names(&["demo"])), &mut silent)
        .await
        .unwrap();

    assert_eq!(result.succeeded(), 1);
    assert_has_command(
        &runner.command_lines(),
        "git clone --branch main https://example.com/demo.git",
    );
    assert_dir_exists!(fixture.clone_path("demo"));
}

#[tokio::test]
async fn test_second_clone_is_a_no_op() {
    let fixture = WorkspaceFixture::sample();
    let workspace = fixture.load().await;
    let runner = RecordingRunner::new();
    let use_case = CloneRepositoriesUseCase::new(&workspace, runner_arc(&runner));
    let config = CloneRepositoriesConfig::new(names(&["g"]));

    use_case.execute(&config, &mut silent).await.unwrap();
    let before = snapshot_tree(fixture.root());
    assert_eq!(runner.calls_for("clone").len(), 2);

    let second = use_case.execute(&config, &mut silent).await.unwrap();

    assert_eq!(second.skipped(), 2);
    assert!(second.is_success());
    assert_eq!(runner.calls_for("clone").len(), 2);
    assert_eq!(snapshot_tree(fixture.root()), before);
}

#[tokio::test]
async fn test_group_members_run_in_declared_order() {
    let fixture = WorkspaceFixture::sample();
    let workspace = fixture.load().await;
    for name in ["demo", "django-filter", "wagtail"] {
        fixture.fake_clone(name);
    }
    let runner = RecordingRunner::new();

    let mut seen = Vec::new();
    let result = GitOperationsUseCase::new(&workspace, runner_arc(&runner))
        .execute(
            &names(&["g"]),
            &GitOperation::Pull,
            &mut |outcome: &RepoOutcome| seen.push(outcome.name.clone()),
        )
        .await
        .unwrap();

    assert_eq!(result.succeeded(), 2);
    assert_eq!(seen, vec!["demo", "django-filter"]);
    let dirs: Vec<_> = runner
        .calls_for("pull")
        .into_iter()
        .map(|c| c.working_directory.unwrap())
        .collect();
    assert_eq!(
        dirs,
        vec![fixture.clone_path("demo"), fixture.clone_path("django-filter")]
    );
}

#[tokio::test]
async fn test_unknown_name_runs_nothing() {
    let fixture = WorkspaceFixture::sample();
    let workspace = fixture.load().await;
    let runner = RecordingRunner::new();
    let before = snapshot_tree(fixture.root());

    let result = CloneRepositoriesUseCase::new(&workspace, runner_arc(&runner))
        .execute(&CloneRepositoriesConfig::new(names(&["zzz"])), &mut silent)
        .await
        .unwrap();

    assert_eq!(result.failed(), 1);
    assert_eq!(result.exit_code(), 1);
    assert!(runner.calls().is_empty());
    assert_path_not_exists!(fixture.root().join("src"));
    assert_eq!(snapshot_tree(fixture.root()), before);
}

#[tokio::test]
async fn test_git_operation_skips_missing_clones() {
    let fixture = WorkspaceFixture::sample();
    let workspace = fixture.load().await;
    fixture.fake_clone("demo");
    let runner = RecordingRunner::new();

    let result = GitOperationsUseCase::new(&workspace, runner_arc(&runner))
        .execute(&names(&["demo", "bare"]), &GitOperation::Fetch, &mut silent)
        .await
        .unwrap();

    assert_eq!(result.succeeded(), 1);
    assert_eq!(result.skipped(), 1);
    assert_eq!(runner.calls_for("fetch").len(), 1);
}

#[tokio::test]
async fn test_install_without_project_files_fails_cleanly() {
    let fixture = WorkspaceFixture::sample();
    let workspace = fixture.load().await;
    fixture.fake_clone("bare");
    let runner = RecordingRunner::new();

    let result = InstallRepositoriesUseCase::new(&workspace, runner_arc(&runner))
        .execute(&InstallRepositoriesConfig::new(names(&["bare"])), &mut silent)
        .await
        .unwrap();

    assert_eq!(result.failed(), 1);
    assert_eq!(result.exit_code(), 1);
    assert!(runner.calls().is_empty());
}

#[tokio::test]
async fn test_install_failure_keeps_going() {
    let fixture = WorkspaceFixture::sample();
    let workspace = fixture.load().await;
    let demo = fixture.fake_clone("demo");
    std::fs::write(demo.join("pyproject.toml"), "[project]\nname = \"demo\"\n").unwrap();
    fixture.fake_clone("bare");
    let runner = RecordingRunner::new();

    let result = InstallRepositoriesUseCase::new(&workspace, runner_arc(&runner))
        .execute(
            &InstallRepositoriesConfig::new(names(&["bare", "demo"])),
            &mut silent,
        )
        .await
        .unwrap();

    assert_eq!(result.failed(), 1);
    assert_eq!(result.succeeded(), 1);
    assert_eq!(runner.calls().len(), 1);
}

#[tokio::test]
async fn test_status_of_uncloned_repositories() {
    let fixture = WorkspaceFixture::sample();
    let workspace = fixture.load().await;
    let runner = RecordingRunner::new();

    let status = StatusCheckUseCase::new(&workspace, runner_arc(&runner))
        .status(&Selector::All)
        .await;

    assert_eq!(status.repositories.len(), 4);
    assert_eq!(status.count(RepositoryState::Missing), 4);
    assert!(runner.calls().is_empty());
}

#[tokio::test]
async fn test_delete_removes_only_selected_clone() {
    let fixture = WorkspaceFixture::sample();
    let workspace = fixture.load().await;
    fixture.fake_clone("demo");
    fixture.fake_clone("wagtail");
    let runner = RecordingRunner::new();

    let result = DeleteRepositoriesUseCase::new(&workspace, runner_arc(&runner))
        .execute(&Selector::Groups(vec!["cms".to_string()]), false, &mut silent)
        .await
        .unwrap();

    assert!(result.is_success());
    assert_path_not_exists!(fixture.clone_path("wagtail"));
    assert_dir_exists!(fixture.clone_path("demo"));
    assert!(runner.calls().is_empty());
}
