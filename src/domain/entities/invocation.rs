use super::registry::Registry;
use super::repository::RepositorySpec;
use crate::domain::value_objects::EnvOverlay;

/// 対象リポジトリの指定方法
///
/// 3つの形式は排他的。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// 名前（リポジトリ名優先、次にグループ名）
    Names(Vec<String>),
    /// グループ名のみ
    Groups(Vec<String>),
    /// 全リポジトリ
    All,
}

/// セレクタの解決結果
#[derive(Debug, Clone, Default)]
pub struct Selection<'a> {
    /// 重複を除いた対象（最初の出現順）
    pub repos: Vec<&'a RepositorySpec>,

    /// 何にも一致しなかった名前
    pub unknown: Vec<String>,
}

impl<'a> Selection<'a> {
    fn push_unique(&mut self, repo: &'a RepositorySpec) {
        if !self.repos.iter().any(|r| r.name == repo.name) {
            self.repos.push(repo);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.repos.is_empty()
    }
}

impl Selector {
    /// レジストリに対して解決する
    pub fn resolve<'a>(&self, registry: &'a Registry) -> Selection<'a> {
        let mut selection = Selection::default();
        match self {
            Selector::All => {
                for repo in registry.list_all() {
                    selection.push_unique(repo);
                }
            }
            Selector::Names(names) => {
                for name in names {
                    let repos = registry.resolve(name);
                    if repos.is_empty() {
                        selection.unknown.push(name.clone());
                    }
                    for repo in repos {
                        selection.push_unique(repo);
                    }
                }
            }
            Selector::Groups(groups) => {
                for group in groups {
                    match registry.resolve_group(group) {
                        Some(repos) => {
                            for repo in repos {
                                selection.push_unique(repo);
                            }
                        }
                        None => selection.unknown.push(group.clone()),
                    }
                }
            }
        }
        selection
    }
}

/// `repo test` のオプション
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestOptions {
    /// 明示的なモジュール / テストパス
    pub modules: Vec<String>,
    /// キーワードフィルタ（-k）
    pub keyword: Option<String>,
    /// テストDBを保持する
    pub keepdb: bool,
}

/// 実行するアクション
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    List,
    Clone { install: bool },
    Install,
    Fetch,
    Update,
    Pull,
    Push,
    Status,
    Diff,
    Log { max_count: usize },
    Reset,
    Delete { uninstall: bool },
    RemoteAdd { remote: String, url: String },
    RemoteRemove { remote: String },
    Test(TestOptions),
    MakeMigrations { args: Vec<String> },
}

impl Action {
    /// 表示用の名前
    pub fn name(&self) -> &'static str {
        match self {
            Action::List => "list",
            Action::Clone { .. } => "clone",
            Action::Install => "install",
            Action::Fetch => "fetch",
            Action::Update => "update",
            Action::Pull => "pull",
            Action::Push => "push",
            Action::Status => "status",
            Action::Diff => "diff",
            Action::Log { .. } => "log",
            Action::Reset => "reset",
            Action::Delete { .. } => "delete",
            Action::RemoteAdd { .. } => "remote add",
            Action::RemoteRemove { .. } => "remote remove",
            Action::Test(_) => "test",
            Action::MakeMigrations { .. } => "makemigrations",
        }
    }

    /// 実行前に確認が必要か
    pub fn is_destructive(&self) -> bool {
        matches!(self, Action::Reset | Action::Delete { .. })
    }
}

/// 1回のCLI実行で使われる、解析済みのコマンド
#[derive(Debug, Clone)]
pub struct CommandInvocation {
    pub selector: Selector,
    pub action: Action,
    /// 子プロセスに渡す環境変数（MONGODB_URI など）
    pub env: EnvOverlay,
}

impl CommandInvocation {
    pub fn new(selector: Selector, action: Action) -> Self {
        Self {
            selector,
            action,
            env: EnvOverlay::new(),
        }
    }

    pub fn with_env(mut self, env: EnvOverlay) -> Self {
        self.env = env;
        self
    }
}
