use crate::common::error::DmError;
use crate::common::result::DmResult;
use crate::domain::entities::invocation::{Selection, Selector};
use crate::domain::entities::repository::RepositorySpec;
use crate::domain::entities::workspace::Workspace;

/// 1リポジトリに対する処理結果の種類
#[derive(Debug)]
pub enum OutcomeKind {
    /// 成功（表示用メッセージ）
    Done(String),
    /// スキップ（理由）
    Skipped(String),
    /// 失敗
    Failed(DmError),
}

/// 1リポジトリに対する処理結果
#[derive(Debug)]
pub struct RepoOutcome {
    pub name: String,
    pub kind: OutcomeKind,
}

impl RepoOutcome {
    pub fn done(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: OutcomeKind::Done(message.into()),
        }
    }

    pub fn skipped(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: OutcomeKind::Skipped(reason.into()),
        }
    }

    pub fn failed(name: impl Into<String>, error: DmError) -> Self {
        Self {
            name: name.into(),
            kind: OutcomeKind::Failed(error),
        }
    }

    /// `DmResult<String>` から結果を作る
    pub fn from_result(name: impl Into<String>, result: DmResult<String>) -> Self {
        match result {
            Ok(message) => Self::done(name, message),
            Err(e) => Self::failed(name, e),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.kind, OutcomeKind::Failed(_))
    }
}

/// 結果を受け取るコールバック（CLI側で逐次表示する）
pub type Reporter<'a> = &'a mut dyn FnMut(&RepoOutcome);

/// 何もしないレポーター
pub fn silent(_: &RepoOutcome) {}

/// バッチ処理全体の結果
#[derive(Debug, Default)]
pub struct BatchResult {
    /// 処理順の結果
    pub outcomes: Vec<RepoOutcome>,

    /// レジストリに存在しなかった名前
    pub unknown: Vec<String>,
}

impl BatchResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// 結果を記録してレポーターに通知する
    pub fn record(&mut self, outcome: RepoOutcome, reporter: Reporter<'_>) {
        match &outcome.kind {
            OutcomeKind::Done(message) => tracing::debug!("{}: {}", outcome.name, message),
            OutcomeKind::Skipped(reason) => tracing::warn!("{}: skipped ({})", outcome.name, reason),
            OutcomeKind::Failed(e) => tracing::warn!("{}: {}", outcome.name, e),
        }
        reporter(&outcome);
        self.outcomes.push(outcome);
    }

    /// 結果を記録する。致命的なエラーはバッチを中断して返す
    pub fn absorb(
        &mut self,
        name: &str,
        result: DmResult<String>,
        reporter: Reporter<'_>,
    ) -> DmResult<()> {
        match result {
            Err(e) if e.is_fatal() => Err(e),
            other => {
                self.record(RepoOutcome::from_result(name, other), reporter);
                Ok(())
            }
        }
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.kind, OutcomeKind::Done(_)))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.kind, OutcomeKind::Skipped(_)))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failure()).count() + self.unknown.len()
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    /// 0 if every target succeeded; otherwise the first external tool's
    /// exit code, or 1.
    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            return 0;
        }
        self.outcomes
            .iter()
            .find_map(|o| match &o.kind {
                OutcomeKind::Failed(e @ DmError::ExternalTool { .. }) => Some(e.exit_code()),
                _ => None,
            })
            .unwrap_or(1)
    }

    /// 処理された名前（テスト・表示用）
    pub fn names(&self) -> Vec<&str> {
        self.outcomes.iter().map(|o| o.name.as_str()).collect()
    }
}

/// セレクタを解決し、未知の名前は NotFound として記録する
pub fn resolve_selection<'w>(
    workspace: &'w Workspace,
    selector: &Selector,
    result: &mut BatchResult,
    reporter: Reporter<'_>,
) -> Vec<&'w RepositorySpec> {
    let Selection { repos, unknown } = selector.resolve(workspace.registry());
    for name in unknown {
        let kind = match selector {
            Selector::Groups(_) => "group",
            _ => "repository or group",
        };
        let error = DmError::not_found(kind, name.clone());
        tracing::warn!("{}", error);
        reporter(&RepoOutcome::failed(name.clone(), error));
        result.unknown.push(name);
    }
    repos
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_prefers_first_external_tool_code() {
        let mut result = BatchResult::new();
        let mut noop = silent;
        result.record(RepoOutcome::done("a", "ok"), &mut noop);
        result.record(
            RepoOutcome::failed("b", DmError::state_conflict("exists", None)),
            &mut noop,
        );
        result.record(
            RepoOutcome::failed("c", DmError::external_tool("boom", "git pull", Some(128))),
            &mut noop,
        );
        result.record(
            RepoOutcome::failed("d", DmError::external_tool("boom", "git pull", Some(3))),
            &mut noop,
        );
        assert_eq!(result.exit_code(), 128);
        assert_eq!(result.succeeded(), 1);
        assert_eq!(result.failed(), 3);
    }

    #[test]
    fn test_skips_do_not_fail_the_batch() {
        let mut result = BatchResult::new();
        let mut seen = Vec::new();
        let mut reporter = |o: &RepoOutcome| seen.push(o.name.clone());
        result.record(RepoOutcome::skipped("a", "not cloned"), &mut reporter);
        assert_eq!(result.exit_code(), 0);
        assert_eq!(seen, vec!["a".to_string()]);
    }

    #[test]
    fn test_unknown_names_fail_with_one() {
        let mut result = BatchResult::new();
        result.unknown.push("ghost".to_string());
        assert!(!result.is_success());
        assert_eq!(result.exit_code(), 1);
    }
}
