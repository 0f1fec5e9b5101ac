use std::path::Path;
use std::sync::Arc;

use super::batch::{resolve_selection, BatchResult, RepoOutcome, Reporter};
use crate::common::result::DmResult;
use crate::domain::entities::invocation::Selector;
use crate::domain::entities::workspace::Workspace;
use crate::infrastructure::process::ProcessRunner;
use crate::infrastructure::scm::GitScm;

/// デフォルトのリモート名
pub const DEFAULT_REMOTE: &str = "origin";

/// クローン済みリポジトリに対する git 操作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitOperation {
    /// `git fetch origin`
    Fetch,
    /// fetch の後に pull
    Update,
    Pull,
    Push,
    /// `git reset --hard HEAD`（未コミットの変更は失われる）
    Reset,
    RemoteAdd { remote: String, url: String },
    RemoteRemove { remote: String },
}

impl GitOperation {
    /// 完了時の表示メッセージ
    fn done_message(&self) -> String {
        match self {
            GitOperation::Fetch => format!("fetched {}", DEFAULT_REMOTE),
            GitOperation::Update => "updated".to_string(),
            GitOperation::Pull => "pulled".to_string(),
            GitOperation::Push => "pushed".to_string(),
            GitOperation::Reset => "reset to HEAD".to_string(),
            GitOperation::RemoteAdd { remote, url } => format!("added remote {} ({})", remote, url),
            GitOperation::RemoteRemove { remote } => format!("removed remote {}", remote),
        }
    }
}

/// git 操作を選択されたリポジトリに順番に適用する
pub struct GitOperationsUseCase<'w> {
    workspace: &'w Workspace,
    git: GitScm,
}

impl<'w> GitOperationsUseCase<'w> {
    pub fn new(workspace: &'w Workspace, runner: Arc<dyn ProcessRunner>) -> Self {
        let git = GitScm::new(runner).with_timeout(workspace.settings().timeout_secs);
        Self { workspace, git }
    }

    pub async fn execute(
        &self,
        selector: &Selector,
        operation: &GitOperation,
        reporter: Reporter<'_>,
    ) -> DmResult<BatchResult> {
        let mut result = BatchResult::new();
        let repos = resolve_selection(self.workspace, selector, &mut result, reporter);

        for repo in repos {
            let path = self.workspace.clone_path(&repo.name);
            if !path.exists() {
                result.record(
                    RepoOutcome::skipped(&repo.name, format!("not cloned at {}", path.display())),
                    reporter,
                );
                continue;
            }

            let outcome = self
                .apply(&path, operation)
                .await
                .map(|_| operation.done_message());
            result.absorb(&repo.name, outcome, reporter)?;
        }
        Ok(result)
    }

    async fn apply(&self, path: &Path, operation: &GitOperation) -> DmResult<()> {
        match operation {
            GitOperation::Fetch => self.git.fetch(path, DEFAULT_REMOTE).await,
            GitOperation::Update => {
                self.git.fetch(path, DEFAULT_REMOTE).await?;
                self.git.pull(path).await
            }
            GitOperation::Pull => self.git.pull(path).await,
            GitOperation::Push => self.git.push(path).await,
            GitOperation::Reset => self.git.reset_hard(path).await,
            GitOperation::RemoteAdd { remote, url } => self.git.remote_add(path, remote, url).await,
            GitOperation::RemoteRemove { remote } => self.git.remote_remove(path, remote).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::use_cases::batch::silent;
    use crate::domain::entities::registry::Registry;
    use crate::domain::entities::repository::RepositorySpec;
    use crate::domain::entities::workspace::ToolSettings;
    use crate::domain::value_objects::RepoSource;
    use crate::infrastructure::process::{MockProcessRunner, ProcessOutput};
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;
    use tempfile::TempDir;

    fn workspace(root: &Path) -> Workspace {
        let mut registry = Registry::new();
        for name in ["a", "b", "c"] {
            let url = format!("https://example.com/{}.git", name);
            registry
                .insert(RepositorySpec::new(name, RepoSource::new(&url, None).unwrap()))
                .unwrap();
        }
        registry
            .define_group("g", vec!["a".to_string(), "b".to_string()])
            .unwrap();
        Workspace::new(root.join("pyproject.toml"), "src", registry, ToolSettings::default())
    }

    #[tokio::test]
    async fn test_update_runs_fetch_then_pull_per_group_member() {
        let temp = TempDir::new().unwrap();
        let ws = workspace(temp.path());
        for name in ["a", "b", "c"] {
            std::fs::create_dir_all(ws.clone_path(name)).unwrap();
        }

        let calls = Arc::new(Mutex::new(Vec::new()));
        let recorded = calls.clone();
        let mut runner = MockProcessRunner::new();
        runner.expect_run().returning(move |cmd| {
            let dir = cmd.working_directory.clone().unwrap();
            let repo = dir.file_name().unwrap().to_string_lossy().into_owned();
            recorded.lock().unwrap().push(format!("{} {}", repo, cmd.args[0]));
            Ok(ProcessOutput::success_with(""))
        });

        let use_case = GitOperationsUseCase::new(&ws, Arc::new(runner));
        let result = use_case
            .execute(
                &Selector::Names(vec!["g".to_string()]),
                &GitOperation::Update,
                &mut silent,
            )
            .await
            .unwrap();

        assert_eq!(result.names(), vec!["a", "b"]);
        assert_eq!(
            *calls.lock().unwrap(),
            vec!["a fetch", "a pull", "b fetch", "b pull"]
        );
    }

    #[tokio::test]
    async fn test_missing_clone_is_skipped_and_failures_continue() {
        let temp = TempDir::new().unwrap();
        let ws = workspace(temp.path());
        std::fs::create_dir_all(ws.clone_path("b")).unwrap();
        std::fs::create_dir_all(ws.clone_path("c")).unwrap();

        let mut runner = MockProcessRunner::new();
        runner
            .expect_run()
            .withf(|cmd| cmd.working_directory.as_ref().unwrap().ends_with("b"))
            .returning(|_| Ok(ProcessOutput::failure(1, "fatal: no upstream configured")));
        runner
            .expect_run()
            .withf(|cmd| cmd.working_directory.as_ref().unwrap().ends_with("c"))
            .returning(|_| Ok(ProcessOutput::success_with("")));

        let use_case = GitOperationsUseCase::new(&ws, Arc::new(runner));
        let result = use_case
            .execute(&Selector::All, &GitOperation::Pull, &mut silent)
            .await
            .unwrap();

        assert_eq!(result.skipped(), 1);
        assert_eq!(result.failed(), 1);
        assert_eq!(result.succeeded(), 1);
        assert_eq!(result.exit_code(), 1);
    }

    #[tokio::test]
    async fn test_unknown_name_touches_nothing() {
        let temp = TempDir::new().unwrap();
        let ws = workspace(temp.path());
        let mut runner = MockProcessRunner::new();
        runner.expect_run().never();

        let use_case = GitOperationsUseCase::new(&ws, Arc::new(runner));
        let result = use_case
            .execute(
                &Selector::Names(vec!["ghost".to_string()]),
                &GitOperation::Reset,
                &mut silent,
            )
            .await
            .unwrap();
        assert_eq!(result.unknown, vec!["ghost".to_string()]);
        assert_eq!(result.exit_code(), 1);
        assert!(!ws.home().exists());
    }
}
