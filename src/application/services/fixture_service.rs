use std::path::Path;

use crate::common::error::DmError;
use crate::common::result::DmResult;
use crate::domain::entities::repository::{CopyPolicy, FileCopy, FixtureKind, RepositorySpec};
use crate::infrastructure::filesystem::file_operations::copy_path;

/// フィクスチャ適用の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FixtureOutcome {
    /// コピーした（ファイル数）
    Copied { files: usize },
    /// コピー先が既に存在するためスキップ
    Skipped,
    /// マニフェストに宣言がない
    NotDeclared,
}

/// マニフェストで宣言されたファイルをクローンへ配置するサービス
#[derive(Debug, Clone, Default)]
pub struct FixtureService;

impl FixtureService {
    pub fn new() -> Self {
        Self
    }

    /// 指定種類のフィクスチャを `clone_path` に適用する
    pub fn apply(
        &self,
        repo: &RepositorySpec,
        kind: FixtureKind,
        clone_path: &Path,
    ) -> DmResult<FixtureOutcome> {
        match repo.fixture(kind) {
            Some(copy) => self.apply_copy(copy, clone_path),
            None => Ok(FixtureOutcome::NotDeclared),
        }
    }

    /// 1件のコピーをポリシーに従って実行する。
    /// コピー元の存在確認は実行時まで遅延する。
    pub fn apply_copy(&self, copy: &FileCopy, clone_path: &Path) -> DmResult<FixtureOutcome> {
        let target = clone_path.join(&copy.target);

        if copy.policy == CopyPolicy::SkipIfExists && target.exists() {
            tracing::debug!(
                "{} already present at {}, leaving it untouched",
                copy.kind.key(),
                target.display()
            );
            return Ok(FixtureOutcome::Skipped);
        }

        if !copy.source.exists() {
            return Err(DmError::filesystem_error(
                format!("{} source does not exist", copy.kind.key()),
                Some(copy.source.clone()),
            ));
        }

        let files = copy_path(&copy.source, &target)?;
        tracing::info!(
            "copied {} -> {} ({} file(s))",
            copy.source.display(),
            target.display(),
            files
        );
        Ok(FixtureOutcome::Copied { files })
    }
}
