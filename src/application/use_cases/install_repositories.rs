use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::batch::{resolve_selection, BatchResult, Reporter};
use crate::common::error::DmError;
use crate::common::result::DmResult;
use crate::domain::entities::invocation::Selector;
use crate::domain::entities::repository::RepositorySpec;
use crate::domain::entities::workspace::Workspace;
use crate::domain::value_objects::EnvOverlay;
use crate::infrastructure::process::{CommandSpec, ProcessRunner};
use crate::infrastructure::tools::PythonTool;

/// インストール方法（検出順）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallMethod {
    /// pyproject.toml による editable install
    Editable,
    /// 旧来の `setup.py develop`
    SetupDevelop,
    /// requirements.txt
    Requirements(PathBuf),
}

impl InstallMethod {
    /// ディレクトリの内容からインストール方法を決める
    pub fn detect(path: &Path) -> Option<Self> {
        if path.join("pyproject.toml").is_file() {
            Some(Self::Editable)
        } else if path.join("setup.py").is_file() {
            Some(Self::SetupDevelop)
        } else {
            let requirements = path.join("requirements.txt");
            requirements.is_file().then_some(Self::Requirements(requirements))
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Self::Editable => "editable install",
            Self::SetupDevelop => "setup.py develop",
            Self::Requirements(_) => "requirements.txt",
        }
    }
}

/// インストールの設定
#[derive(Debug, Clone)]
pub struct InstallRepositoriesConfig {
    pub selector: Selector,

    /// 子プロセスへの追加環境変数
    pub env: EnvOverlay,
}

impl InstallRepositoriesConfig {
    pub fn new(selector: Selector) -> Self {
        Self {
            selector,
            env: EnvOverlay::new(),
        }
    }

    pub fn with_env(mut self, env: EnvOverlay) -> Self {
        self.env = env;
        self
    }
}

/// クローン済みリポジトリを現在のPython環境にインストールする
pub struct InstallRepositoriesUseCase<'w> {
    workspace: &'w Workspace,
    runner: Arc<dyn ProcessRunner>,
    python: PythonTool,
}

impl<'w> InstallRepositoriesUseCase<'w> {
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
        config: &InstallRepositoriesConfig,
        reporter: Reporter<'_>,
    ) -> DmResult<BatchResult> {
        let mut result = BatchResult::new();
        let repos = resolve_selection(self.workspace, &config.selector, &mut result, reporter);
        for repo in repos {
            let outcome = self.install_one(repo, &config.env).await;
            result.absorb(&repo.name, outcome, reporter)?;
        }
        Ok(result)
    }

    /// 1リポジトリをインストールする
    pub async fn install_one(&self, repo: &RepositorySpec, env: &EnvOverlay) -> DmResult<String> {
        let path = self.workspace.install_path(repo);
        if !self.workspace.is_cloned(&repo.name) {
            return Err(DmError::state_conflict(
                format!("{} is not cloned (run `dm repo clone {}`)", repo.name, repo.name),
                Some(self.workspace.clone_path(&repo.name)),
            ));
        }
        if !path.is_dir() {
            return Err(DmError::state_conflict(
                format!("install directory {} does not exist", path.display()),
                Some(path),
            ));
        }

        let method = InstallMethod::detect(&path).ok_or_else(|| {
            DmError::state_conflict(
                format!(
                    "nothing to install in {}: no pyproject.toml, setup.py or requirements.txt",
                    path.display()
                ),
                Some(path.clone()),
            )
        })?;

        let command = self.command_for(&method, &path).with_env(&repo.install.env.merged(env));
        tracing::info!("installing {} ({})", repo.name, method.describe());
        self.runner.run(&command).await?.check(&command)?;
        Ok(format!("installed via {}", method.describe()))
    }

    fn command_for(&self, method: &InstallMethod, path: &Path) -> CommandSpec {
        let command = match method {
            InstallMethod::Editable => self.python.editable_install(path),
            InstallMethod::SetupDevelop => self.python.setup_develop(path),
            InstallMethod::Requirements(requirements) => {
                self.python.requirements_install(path, requirements)
            }
        };
        command.inherit_output()
    }
}
