use std::sync::Arc;

use super::batch::{resolve_selection, BatchResult, RepoOutcome, Reporter};
use super::install_repositories::InstallRepositoriesUseCase;
use crate::common::error::DmError;
use crate::common::result::{DmResult, DmResultExt};
use crate::domain::entities::invocation::Selector;
use crate::domain::entities::repository::RepositorySpec;
use crate::domain::entities::workspace::Workspace;
use crate::domain::value_objects::EnvOverlay;
use crate::infrastructure::process::ProcessRunner;
use crate::infrastructure::scm::{CloneOptions, CloneOutcome, GitScm};
use crate::infrastructure::tools::PythonTool;

/// pre-commit のフック設定ファイル
const PRE_COMMIT_CONFIG: &str = ".pre-commit-config.yaml";

/// クローンの設定
#[derive(Debug, Clone)]
pub struct CloneRepositoriesConfig {
    pub selector: Selector,

    /// クローン後（または既存の場合）にインストールする
    pub install: bool,

    /// git の出力を端末に流す
    pub stream_output: bool,

    /// インストール時の追加環境変数
    pub env: EnvOverlay,
}

impl CloneRepositoriesConfig {
    pub fn new(selector: Selector) -> Self {
        Self {
            selector,
            install: false,
            stream_output: false,
            env: EnvOverlay::new(),
        }
    }

    pub fn with_install(mut self, install: bool) -> Self {
        self.install = install;
        self
    }

    pub fn with_stream_output(mut self, stream_output: bool) -> Self {
        self.stream_output = stream_output;
        self
    }

    pub fn with_env(mut self, env: EnvOverlay) -> Self {
        self.env = env;
        self
    }
}

/// 1リポジトリのクローン結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloneStatus {
    Cloned(CloneOutcome),
    /// クローン先が既に存在した（何もしていない）
    AlreadyPresent,
}

/// リポジトリをワークスペースにクローンする
pub struct CloneRepositoriesUseCase<'w> {
    workspace: &'w Workspace,
    runner: Arc<dyn ProcessRunner>,
    git: GitScm,
    python: PythonTool,
}

impl<'w> CloneRepositoriesUseCase<'w> {
    pub fn new(workspace: &'w Workspace, runner: Arc<dyn ProcessRunner>) -> Self {
        let settings = workspace.settings();
        let git = GitScm::new(runner.clone()).with_timeout(settings.timeout_secs);
        let python = PythonTool::new(&settings.python, settings.installer)
            .with_timeout(settings.timeout_secs);
        Self {
            workspace,
            runner,
            git,
            python,
        }
    }

    pub async fn execute(
        &self,
        config: &CloneRepositoriesConfig,
        reporter: Reporter<'_>,
    ) -> DmResult<BatchResult> {
        let mut result = BatchResult::new();
        let repos = resolve_selection(self.workspace, &config.selector, &mut result, reporter);
        let installer = InstallRepositoriesUseCase::new(self.workspace, self.runner.clone());

        for repo in repos {
            let status = match self.clone_one(repo, config.stream_output).await {
                Ok(status) => status,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    result.record(RepoOutcome::failed(&repo.name, e), reporter);
                    continue;
                }
            };

            let path = self.workspace.clone_path(&repo.name);
            let outcome = match &status {
                CloneStatus::AlreadyPresent => RepoOutcome::skipped(
                    &repo.name,
                    format!("{} already exists", path.display()),
                ),
                CloneStatus::Cloned(CloneOutcome::Cloned) => {
                    RepoOutcome::done(&repo.name, format!("cloned into {}", path.display()))
                }
                CloneStatus::Cloned(CloneOutcome::FellBackToDefault { requested }) => {
                    RepoOutcome::done(
                        &repo.name,
                        format!(
                            "cloned into {} (branch '{}' not found, using the default branch)",
                            path.display(),
                            requested
                        ),
                    )
                }
            };
            result.record(outcome, reporter);

            if config.install {
                let installed = installer.install_one(repo, &config.env).await;
                result.absorb(&repo.name, installed, reporter)?;
            }
        }
        Ok(result)
    }

    /// 1リポジトリをクローンする。クローン先が存在する場合は何もしない
    pub async fn clone_one(&self, repo: &RepositorySpec, stream_output: bool) -> DmResult<CloneStatus> {
        let path = self.workspace.clone_path(&repo.name);
        if path.exists() {
            tracing::warn!(
                "{} already exists, not cloning {}",
                path.display(),
                repo.name
            );
            return Ok(CloneStatus::AlreadyPresent);
        }

        tokio::fs::create_dir_all(self.workspace.home())
            .await
            .map_err(|e| {
                DmError::filesystem_error_with_source(
                    "failed to create workspace home",
                    Some(self.workspace.home().to_path_buf()),
                    e,
                )
            })?;

        let options = CloneOptions {
            branch: repo.source.branch().map(str::to_string),
            stream_output,
        };
        tracing::info!("cloning {} from {}", repo.name, repo.source);
        let outcome = self
            .git
            .clone_repository(repo.source.url(), &path, &options)
            .await?;

        if path.join(PRE_COMMIT_CONFIG).is_file() {
            let command = self.python.pre_commit_install(&path);
            let hooked = match self.runner.run(&command).await {
                Ok(output) => output.check(&command).map(|_| ()),
                Err(e) => Err(e),
            };
            hooked.warn_on_error(&format!("pre-commit hooks not installed for {}", repo.name));
        }

        Ok(CloneStatus::Cloned(outcome))
    }
}
