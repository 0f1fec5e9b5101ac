use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::domain::value_objects::{EnvOverlay, RepoSource};

/// フィクスチャコピーの上書きポリシー
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CopyPolicy {
    /// 毎回上書きする
    Overwrite,
    /// コピー先が存在する場合は何もしない
    SkipIfExists,
}

/// フィクスチャの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixtureKind {
    /// INSTALLED_APPS 用のモジュール
    Apps,
    /// マイグレーションディレクトリ
    Migrations,
    /// テスト用設定ファイル
    Settings,
    /// makemigrations 用設定ファイル
    MigrationsSettings,
}

impl FixtureKind {
    /// 種類ごとのデフォルトポリシー
    pub fn default_policy(self) -> CopyPolicy {
        match self {
            FixtureKind::Migrations => CopyPolicy::SkipIfExists,
            FixtureKind::Apps | FixtureKind::Settings | FixtureKind::MigrationsSettings => {
                CopyPolicy::Overwrite
            }
        }
    }

    /// マニフェスト上のキー名
    pub fn key(self) -> &'static str {
        match self {
            FixtureKind::Apps => "apps",
            FixtureKind::Migrations => "migrations",
            FixtureKind::Settings => "settings_file",
            FixtureKind::MigrationsSettings => "migrations_settings_file",
        }
    }
}

/// フィクスチャのコピー指示
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileCopy {
    pub kind: FixtureKind,

    /// コピー元（マニフェストのディレクトリで解決済みの絶対パス）
    pub source: PathBuf,

    /// コピー先（クローンからの相対パス）
    pub target: PathBuf,

    pub policy: CopyPolicy,
}

/// テストランナーの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunnerKind {
    /// Django の runtests.py / manage.py test
    Django,
    /// pytest / pytest-django
    Pytest,
    /// それ以外（just, tox など）
    Custom,
}

impl RunnerKind {
    /// コマンドからランナーを推定する
    pub fn infer(command: &[String]) -> Self {
        let is_named = |token: &String, names: &[&str]| {
            let base = Path::new(token)
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or(token);
            names.contains(&base)
        };

        if command.iter().any(|t| is_named(t, &["pytest", "py.test"])) {
            RunnerKind::Pytest
        } else if command.iter().any(|t| is_named(t, &["runtests.py", "manage.py"])) {
            RunnerKind::Django
        } else {
            RunnerKind::Custom
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RunnerKind::Django => "django",
            RunnerKind::Pytest => "pytest",
            RunnerKind::Custom => "custom",
        }
    }
}

/// テスト実行の定義
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSpec {
    /// ランナーのコマンド（プログラムと固定引数）
    pub command: Vec<String>,

    pub runner: RunnerKind,

    /// 主テストルート（クローンからの相対パス）
    pub primary_root: PathBuf,

    /// テストルート一覧（空のマニフェスト指定では主テストルートのみ）
    pub roots: Vec<PathBuf>,

    /// コマンドの後に付ける固定引数
    pub args: Vec<String>,

    /// テスト用の設定モジュール
    pub settings_module: Option<String>,

    /// makemigrations 用の設定モジュール
    pub migrations_settings_module: Option<String>,

    pub env: EnvOverlay,
}

impl TestSpec {
    /// 相対パスで書かれたコマンドを主テストルート基準で解決する
    pub fn resolved_program(&self, clone_path: &Path) -> Option<String> {
        let program = self.command.first()?;
        if program.starts_with("./") || program.starts_with("../") {
            Some(
                clone_path
                    .join(&self.primary_root)
                    .join(program)
                    .to_string_lossy()
                    .into_owned(),
            )
        } else {
            Some(program.clone())
        }
    }
}

/// インストール方法の定義
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallSpec {
    /// インストール対象のサブディレクトリ
    pub layout: Option<PathBuf>,

    /// アンインストールに使うパッケージ名
    pub package: Option<String>,

    pub env: EnvOverlay,
}

/// レジストリ内の1リポジトリ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositorySpec {
    /// レジストリ内で一意な名前
    pub name: String,

    pub source: RepoSource,

    pub install: InstallSpec,

    pub test: Option<TestSpec>,

    pub file_copies: Vec<FileCopy>,

    /// 所属グループ（マニフェストの groups テーブルとエントリ側指定の和）
    pub groups: Vec<String>,
}

impl RepositorySpec {
    /// 新しいRepositorySpecを作成
    pub fn new(name: impl Into<String>, source: RepoSource) -> Self {
        Self {
            name: name.into(),
            source,
            install: InstallSpec::default(),
            test: None,
            file_copies: Vec::new(),
            groups: Vec::new(),
        }
    }

    pub fn with_install(mut self, install: InstallSpec) -> Self {
        self.install = install;
        self
    }

    pub fn with_test(mut self, test: TestSpec) -> Self {
        self.test = Some(test);
        self
    }

    pub fn with_file_copy(mut self, copy: FileCopy) -> Self {
        self.file_copies.push(copy);
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        let group = group.into();
        if !self.groups.contains(&group) {
            self.groups.push(group);
        }
        self
    }

    /// 種類を指定してフィクスチャを取得
    pub fn fixture(&self, kind: FixtureKind) -> Option<&FileCopy> {
        self.file_copies.iter().find(|c| c.kind == kind)
    }

    /// アンインストールに使うパッケージ名（デフォルトはリポジトリ名）
    pub fn package_name(&self) -> &str {
        self.install.package.as_deref().unwrap_or(&self.name)
    }

    /// Django本体か（apps シムが不要）
    pub fn is_django_core(&self) -> bool {
        self.name == "django"
    }

    pub fn in_group(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }
}
