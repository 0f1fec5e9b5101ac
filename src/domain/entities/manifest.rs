use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;

use super::repository::{CopyPolicy, RunnerKind};

/// マニフェストを格納する `pyproject.toml` のうち、本ツールが読む部分
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PyProjectDocument {
    #[serde(default)]
    pub tool: ToolSection,
}

/// `[tool]` テーブル
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub django_mongodb_cli: Option<Manifest>,
}

fn default_home() -> String {
    "src".to_string()
}

fn default_python() -> String {
    "python3".to_string()
}

fn default_project_settings() -> String {
    "settings.base".to_string()
}

/// パッケージインストーラの種別
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Installer {
    /// `python -m pip`
    #[default]
    Pip,
    /// `uv pip`
    Uv,
}

/// `[tool.django_mongodb_cli]` テーブル（検証前の生データ）
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Manifest {
    /// クローン先ディレクトリ（マニフェストのディレクトリからの相対パス）
    #[serde(default = "default_home")]
    #[validate(length(min = 1))]
    pub home: String,

    /// pip / setup.py に使用するPythonインタプリタ
    #[serde(default = "default_python")]
    #[validate(length(min = 1))]
    pub python: String,

    #[serde(default)]
    pub installer: Installer,

    /// サブプロセスのタイムアウト秒（0またはなしで無制限）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    /// リポジトリ定義（旧キー `dev` も受け付ける）
    #[serde(default, alias = "dev")]
    pub repos: Vec<RepoEntry>,

    /// グループ名からリポジトリ名のリスト
    #[serde(default)]
    pub groups: BTreeMap<String, Vec<String>>,

    #[serde(default)]
    pub install: BTreeMap<String, InstallTable>,

    #[serde(default)]
    pub test: BTreeMap<String, TestTable>,

    #[serde(default)]
    pub project: ProjectTable,
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            home: default_home(),
            python: default_python(),
            installer: Installer::default(),
            timeout: None,
            repos: Vec::new(),
            groups: BTreeMap::new(),
            install: BTreeMap::new(),
            test: BTreeMap::new(),
            project: ProjectTable::default(),
        }
    }
}

/// `repos` の要素: spec文字列またはテーブル
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RepoEntry {
    Spec(String),
    Table(RepoTable),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct RepoTable {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[validate(length(min = 1))]
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
}

/// `[install.<name>]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct InstallTable {
    /// インストール対象のサブディレクトリ（クローンからの相対パス）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1))]
    pub dir: Option<String>,

    /// アンインストール時に使うディストリビューション名
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1))]
    pub package: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

/// `[test.<name>]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct TestTable {
    #[validate(length(min = 1))]
    pub command: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runner: Option<RunnerKind>,

    /// 主テストルート（デフォルト "."）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dirs: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<SettingsTable>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apps: Option<FixtureTable>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub migrations: Option<FixtureTable>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings_file: Option<FixtureTable>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub migrations_settings_file: Option<FixtureTable>,
}

/// 設定モジュール名
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsTable {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub migrations: Option<String>,
}

/// フィクスチャコピーの定義
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct FixtureTable {
    /// マニフェストのディレクトリからの相対パス
    #[validate(length(min = 1))]
    pub source: String,

    /// クローンからの相対パス
    #[validate(length(min = 1))]
    pub target: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<CopyPolicy>,
}

/// `[project]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectTable {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_template: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frontend_template: Option<String>,

    /// `DJANGO_SETTINGS_MODULE` のプロジェクト名以降の部分
    #[serde(default = "default_project_settings")]
    pub settings: String,
}

impl Default for ProjectTable {
    fn default() -> Self {
        Self {
            template: None,
            app_template: None,
            frontend_template: None,
            settings: default_project_settings(),
        }
    }
}
