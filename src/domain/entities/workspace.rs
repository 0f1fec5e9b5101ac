use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use super::manifest::Installer;
use super::registry::Registry;
use super::repository::RepositorySpec;

/// マニフェストを格納するファイル名
pub const MANIFEST_FILE_NAME: &str = "pyproject.toml";

fn manifest_table_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?m)^\s*\[\s*tool\.django_mongodb_cli\s*[\].]").expect("static regex is valid")
    })
}

/// プロジェクト scaffolding 用の設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectSettings {
    /// プロジェクトテンプレート（解決済みパス）
    pub template: Option<PathBuf>,
    pub app_template: Option<PathBuf>,
    pub frontend_template: Option<PathBuf>,

    /// `DJANGO_SETTINGS_MODULE` のプロジェクト名以降
    pub settings: String,
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            template: None,
            app_template: None,
            frontend_template: None,
            settings: "settings.base".to_string(),
        }
    }
}

/// マニフェストから読み取ったツール設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolSettings {
    pub python: String,
    pub installer: Installer,
    /// サブプロセスのタイムアウト秒
    pub timeout_secs: Option<u64>,
    pub project: ProjectSettings,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            python: "python3".to_string(),
            installer: Installer::Pip,
            timeout_secs: None,
            project: ProjectSettings::default(),
        }
    }
}

/// ワークスペース: マニフェストの位置、クローン先、レジストリ
#[derive(Debug, Clone)]
pub struct Workspace {
    /// マニフェストがあるディレクトリ
    root: PathBuf,

    manifest_path: PathBuf,

    /// クローン先のルート（絶対パス）
    home: PathBuf,

    registry: Registry,

    settings: ToolSettings,
}

impl Workspace {
    /// 新しいWorkspaceを作成。`home` が相対パスなら `root` 基準で解決する
    pub fn new(
        manifest_path: impl Into<PathBuf>,
        home: impl AsRef<Path>,
        registry: Registry,
        settings: ToolSettings,
    ) -> Self {
        let manifest_path = manifest_path.into();
        let root = manifest_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let home = root.join(home.as_ref());
        Self {
            root,
            manifest_path,
            home,
            registry,
            settings,
        }
    }

    /// `start` から上位ディレクトリへ向かってマニフェストを探す
    pub fn discover_manifest(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .map(|dir| dir.join(MANIFEST_FILE_NAME))
            .find(|candidate| Self::has_manifest_table(candidate))
    }

    /// ファイルに `[tool.django_mongodb_cli]` テーブルがあるか
    pub fn has_manifest_table(path: &Path) -> bool {
        if !path.is_file() {
            return false;
        }
        std::fs::read_to_string(path)
            .map(|content| Self::content_has_manifest_table(&content))
            .unwrap_or(false)
    }

    pub fn content_has_manifest_table(content: &str) -> bool {
        manifest_table_pattern().is_match(content)
    }

    /// クローン先のパス（常に home と名前から導出する）
    pub fn clone_path(&self, name: &str) -> PathBuf {
        self.home.join(name)
    }

    /// インストール対象のパス
    pub fn install_path(&self, repo: &RepositorySpec) -> PathBuf {
        let clone = self.clone_path(&repo.name);
        match &repo.install.layout {
            Some(layout) => clone.join(layout),
            None => clone,
        }
    }

    pub fn is_cloned(&self, name: &str) -> bool {
        self.clone_path(name).exists()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn settings(&self) -> &ToolSettings {
        &self.settings
    }

    /// タイムアウトを上書きする（CLI / 環境変数が優先）
    pub fn with_timeout(mut self, timeout_secs: Option<u64>) -> Self {
        if timeout_secs.is_some() {
            self.settings.timeout_secs = timeout_secs.filter(|t| *t > 0);
        }
        self
    }

    /// Pythonインタプリタを上書きする
    pub fn with_python(mut self, python: Option<String>) -> Self {
        if let Some(python) = python.filter(|p| !p.trim().is_empty()) {
            self.settings.python = python;
        }
        self
    }
}
