use std::sync::Arc;

use super::batch::{resolve_selection, BatchResult, RepoOutcome, Reporter};
use crate::common::result::{DmResult, DmResultExt};
use crate::domain::entities::invocation::Selector;
use crate::domain::entities::repository::RepositorySpec;
use crate::domain::entities::workspace::Workspace;
use crate::infrastructure::filesystem::file_operations::remove_dir;
use crate::infrastructure::process::ProcessRunner;
use crate::infrastructure::tools::PythonTool;

/// クローンを削除する（任意でパッケージを先にアンインストール）
pub struct DeleteRepositoriesUseCase<'w> {
    workspace: &'w Workspace,
    runner: Arc<dyn ProcessRunner>,
    python: PythonTool,
}

impl<'w> DeleteRepositoriesUseCase<'w> {
    pub fn new(workspace: &'w Workspace, runner: Arc<dyn ProcessRunner>) -> Self {
        let settings = workspace.settings();
        let python = PythonTool::new(&settings.python, settings.installer)
            .with_timeout(settings.timeout_secs);
        Self {
            workspace,
            runner,
            python,
        }
    }

    pub async fn execute(
        &self,
        selector: &Selector,
        uninstall: bool,
        reporter: Reporter<'_>,
    ) -> DmResult<BatchResult> {
        let mut result = BatchResult::new();
        let repos = resolve_selection(self.workspace, selector, &mut result, reporter);

        for repo in repos {
            let path = self.workspace.clone_path(&repo.name);
            if !path.exists() {
                result.record(
                    RepoOutcome::skipped(&repo.name, format!("nothing at {}", path.display())),
                    reporter,
                );
                continue;
            }

            if uninstall {
                self.uninstall(repo).await;
            }
            let removed = remove_dir(&path).map(|_| format!("removed {}", path.display()));
            result.absorb(&repo.name, removed, reporter)?;
        }
        Ok(result)
    }

    /// アンインストールの失敗は警告のみ
    async fn uninstall(&self, repo: &RepositorySpec) {
        let command = self.python.uninstall(repo.package_name());
        let outcome = match self.runner.run(&command).await {
            Ok(output) => output.check(&command).map(|_| ()),
            Err(e) => Err(e),
        };
        outcome.warn_on_error(&format!("could not uninstall {}", repo.package_name()));
    }
}
