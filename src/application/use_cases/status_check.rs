use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::batch::{resolve_selection, BatchResult, RepoOutcome, Reporter};
use super::git_operations::DEFAULT_REMOTE;
use crate::common::result::DmResult;
use crate::domain::entities::invocation::Selector;
use crate::domain::entities::repository::RepositorySpec;
use crate::domain::entities::workspace::Workspace;
use crate::infrastructure::process::ProcessRunner;
use crate::infrastructure::scm::GitScm;

/// リポジトリの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepositoryState {
    /// クリーン（変更なし）
    Clean,
    /// ダーティ（未コミットの変更あり）
    Dirty,
    /// クローンされていない
    Missing,
    /// git の実行に失敗
    Error,
}

/// 単一リポジトリのステータス
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryStatus {
    pub name: String,

    pub state: RepositoryState,

    /// 現在のブランチ
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,

    /// origin の URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_url: Option<String>,

    pub staged_files: usize,
    pub modified_files: usize,
    pub untracked_files: usize,

    /// リモートより進んでいるコミット数
    pub commits_ahead: usize,

    /// リモートより遅れているコミット数
    pub commits_behind: usize,

    /// エラーメッセージ（エラー状態の場合）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl RepositoryStatus {
    /// 新しいRepositoryStatusを作成（初期状態は Missing）
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: RepositoryState::Missing,
            branch: None,
            remote_url: None,
            staged_files: 0,
            modified_files: 0,
            untracked_files: 0,
            commits_ahead: 0,
            commits_behind: 0,
            error_message: None,
        }
    }

    /// エラー状態に設定
    pub fn with_error(mut self, error: String) -> Self {
        self.state = RepositoryState::Error;
        self.error_message = Some(error);
        self
    }
}

/// 全体のステータス結果
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusResult {
    /// 各リポジトリのステータス（選択順）
    pub repositories: Vec<RepositoryStatus>,

    /// レジストリに存在しなかった名前
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unknown: Vec<String>,
}

impl StatusResult {
    pub fn count(&self, state: RepositoryState) -> usize {
        self.repositories.iter().filter(|r| r.state == state).count()
    }

    /// 未知の名前や git エラーがあれば 1
    pub fn exit_code(&self) -> i32 {
        if self.unknown.is_empty() && self.count(RepositoryState::Error) == 0 {
            0
        } else {
            1
        }
    }
}

/// 読み取り専用の検査（status / diff / log）
pub struct StatusCheckUseCase<'w> {
    workspace: &'w Workspace,
    git: GitScm,
}

impl<'w> StatusCheckUseCase<'w> {
    pub fn new(workspace: &'w Workspace, runner: Arc<dyn ProcessRunner>) -> Self {
        let git = GitScm::new(runner).with_timeout(workspace.settings().timeout_secs);
        Self { workspace, git }
    }

    /// 選択されたリポジトリのステータスを集める
    pub async fn status(&self, selector: &Selector) -> StatusResult {
        let selection = selector.resolve(self.workspace.registry());
        let mut result = StatusResult {
            repositories: Vec::with_capacity(selection.repos.len()),
            unknown: selection.unknown,
        };
        for repo in selection.repos {
            result.repositories.push(self.check_repository(repo).await);
        }
        result
    }

    async fn check_repository(&self, repo: &RepositorySpec) -> RepositoryStatus {
        let path = self.workspace.clone_path(&repo.name);
        let status = RepositoryStatus::new(&repo.name);
        if !path.exists() {
            return status;
        }

        let summary = match self.git.status(&path).await {
            Ok(summary) => summary,
            Err(e) => return status.with_error(e.to_string()),
        };
        let remote_url = match self.git.remote_url(&path, DEFAULT_REMOTE).await {
            Ok(url) => url,
            Err(e) => {
                tracing::debug!("no {} url for {}: {}", DEFAULT_REMOTE, repo.name, e);
                None
            }
        };

        RepositoryStatus {
            state: if summary.is_clean() {
                RepositoryState::Clean
            } else {
                RepositoryState::Dirty
            },
            branch: summary.branch,
            remote_url,
            staged_files: summary.staged,
            modified_files: summary.modified,
            untracked_files: summary.untracked,
            commits_ahead: summary.ahead,
            commits_behind: summary.behind,
            ..status
        }
    }

    /// 各リポジトリの `git diff`。結果のメッセージが差分本文
    pub async fn diff(&self, selector: &Selector, reporter: Reporter<'_>) -> DmResult<BatchResult> {
        self.inspect(selector, None, reporter).await
    }

    /// 各リポジトリの直近 `max_count` 件のログ
    pub async fn log(
        &self,
        selector: &Selector,
        max_count: usize,
        reporter: Reporter<'_>,
    ) -> DmResult<BatchResult> {
        self.inspect(selector, Some(max_count), reporter).await
    }

    async fn inspect(
        &self,
        selector: &Selector,
        log_count: Option<usize>,
        reporter: Reporter<'_>,
    ) -> DmResult<BatchResult> {
        let mut result = BatchResult::new();
        let repos = resolve_selection(self.workspace, selector, &mut result, reporter);
        for repo in repos {
            let path = self.workspace.clone_path(&repo.name);
            if !path.exists() {
                result.record(RepoOutcome::skipped(&repo.name, "not cloned"), reporter);
                continue;
            }
            let text = match log_count {
                Some(n) => self.git.log(&path, n).await,
                None => self.git.diff(&path).await,
            };
            result.absorb(&repo.name, text, reporter)?;
        }
        Ok(result)
    }
}
