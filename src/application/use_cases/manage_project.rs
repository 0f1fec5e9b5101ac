use std::path::PathBuf;
use std::sync::Arc;

use super::scaffold_project::ProjectPaths;
use crate::common::error::DmError;
use crate::common::result::DmResult;
use crate::domain::entities::workspace::ToolSettings;
use crate::domain::value_objects::EnvOverlay;
use crate::infrastructure::filesystem::file_operations::{remove_dir, remove_file};
use crate::infrastructure::process::{CommandSpec, ProcessOutput, ProcessRunner};
use crate::infrastructure::tools::{DjangoAdmin, NpmTool, PythonTool};

/// データベース URI が指定されなかったときの案内
pub const DEFAULT_DATABASE_NOTICE: &str =
    "MONGODB_URI is not set; Django's default database settings apply";

/// 開発サーバーの設定
#[derive(Debug, Clone)]
pub struct RunServerConfig {
    pub host: String,
    pub port: u16,
    /// `npm run watch` を並行して実行する
    pub frontend: bool,
}

impl Default for RunServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            frontend: false,
        }
    }
}

/// スーパーユーザー作成の設定
#[derive(Debug, Clone)]
pub struct SuperuserConfig {
    pub username: String,
    pub password: String,
    pub email: String,
}

/// 生成済みプロジェクトに対する django-admin / npm 操作
pub struct ManageProjectUseCase {
    runner: Arc<dyn ProcessRunner>,
    settings: ToolSettings,
    django_admin: DjangoAdmin,
    python: PythonTool,
    npm: NpmTool,
    mongodb_uri: Option<String>,
}

impl ManageProjectUseCase {
    pub fn new(settings: ToolSettings, runner: Arc<dyn ProcessRunner>) -> Self {
        let timeout = settings.timeout_secs;
        Self {
            runner,
            django_admin: DjangoAdmin::new().with_timeout(timeout),
            python: PythonTool::new(&settings.python, settings.installer).with_timeout(timeout),
            npm: NpmTool::new().with_timeout(timeout),
            settings,
            mongodb_uri: None,
        }
    }

    /// 子プロセスに渡すデータベース URI
    pub fn with_mongodb_uri(mut self, uri: Option<String>) -> Self {
        self.mongodb_uri = uri.filter(|u| !u.trim().is_empty());
        self
    }

    /// URI がない場合の案内文
    pub fn database_notice(&self) -> Option<&'static str> {
        self.mongodb_uri.is_none().then_some(DEFAULT_DATABASE_NOTICE)
    }

    /// `<name>.<settings>` 形式の設定モジュール名
    pub fn settings_module(&self, paths: &ProjectPaths) -> String {
        format!("{}.{}", paths.name, self.settings.project.settings)
    }

    /// プロジェクト用の環境変数
    pub fn project_env(&self, paths: &ProjectPaths) -> EnvOverlay {
        let mut env = EnvOverlay::new()
            .with("DJANGO_SETTINGS_MODULE", self.settings_module(paths))
            .with_optional("MONGODB_URI", self.mongodb_uri.clone());
        env.prepend_path(
            "PYTHONPATH",
            &paths.dir().to_string_lossy(),
            std::env::var("PYTHONPATH").ok(),
        );
        env
    }

    /// プロジェクトディレクトリ内で実行する django-admin コマンドを準備する
    fn in_project(&self, paths: &ProjectPaths, command: CommandSpec) -> DmResult<CommandSpec> {
        paths.require_existing()?;
        if let Some(notice) = self.database_notice() {
            tracing::info!("{}", notice);
        }
        Ok(command
            .with_working_directory(&paths.parent)
            .with_env(&self.project_env(paths))
            .inherit_output())
    }

    async fn run_checked(&self, command: &CommandSpec) -> DmResult<ProcessOutput> {
        self.runner.run(command).await?.check(command)
    }

    /// プロジェクトを editable install する
    pub async fn install(&self, paths: &ProjectPaths) -> DmResult<PathBuf> {
        let dir = paths.require_existing()?;
        let command = self.python.editable_install(&dir).inherit_output();
        self.run_checked(&command).await?;
        Ok(dir)
    }

    /// 開発サーバーを起動する。`frontend` 指定時は `npm run watch` を
    /// 監視付きで並行実行し、サーバー終了時に停止する。
    pub async fn run(&self, paths: &ProjectPaths, config: &RunServerConfig) -> DmResult<ProcessOutput> {
        let server = self.in_project(
            paths,
            self.django_admin.runserver(&config.host, config.port),
        )?;

        if !config.frontend {
            return self.run_checked(&server).await;
        }

        let frontend = self.require_frontend(paths)?;
        let install = self.npm.install(&frontend).inherit_output();
        self.run_checked(&install).await?;

        let watch = self.npm.run_script(&frontend, "watch").inherit_output();
        let output = self.runner.run_with_companion(&server, &watch).await?;
        output.check(&server)
    }

    pub async fn migrate(
        &self,
        paths: &ProjectPaths,
        app_label: Option<&str>,
        migration: Option<&str>,
    ) -> DmResult<ProcessOutput> {
        let command = self.in_project(paths, self.django_admin.migrate(app_label, migration))?;
        self.run_checked(&command).await
    }

    pub async fn makemigrations(
        &self,
        paths: &ProjectPaths,
        app_label: Option<&str>,
    ) -> DmResult<ProcessOutput> {
        let command = self.in_project(paths, self.django_admin.makemigrations(app_label))?;
        self.run_checked(&command).await
    }

    /// 任意の管理コマンド
    pub async fn manage(
        &self,
        paths: &ProjectPaths,
        command: Option<&str>,
        args: &[String],
    ) -> DmResult<ProcessOutput> {
        let command = self.in_project(paths, self.django_admin.manage(command, args))?;
        self.run_checked(&command).await
    }

    /// パスワードは環境変数で渡し、コマンドラインには出さない
    pub async fn create_superuser(
        &self,
        paths: &ProjectPaths,
        config: &SuperuserConfig,
    ) -> DmResult<ProcessOutput> {
        let command = self
            .in_project(
                paths,
                self.django_admin
                    .createsuperuser(&config.username, &config.email),
            )?
            .with_env_var("DJANGO_SUPERUSER_PASSWORD", &config.password);
        self.run_checked(&command).await
    }

    fn require_frontend(&self, paths: &ProjectPaths) -> DmResult<PathBuf> {
        paths.require_existing()?;
        let frontend = paths.frontend_dir();
        if !frontend.join("package.json").is_file() {
            return Err(DmError::state_conflict(
                format!(
                    "{} has no frontend/package.json (run `dm frontend add {}`)",
                    paths.name, paths.name
                ),
                Some(frontend),
            ));
        }
        Ok(frontend)
    }

    /// `npm install`。`clean` 指定時は node_modules と package-lock.json を先に削除する
    pub async fn frontend_install(&self, paths: &ProjectPaths, clean: bool) -> DmResult<PathBuf> {
        let frontend = self.require_frontend(paths)?;
        if clean {
            remove_dir(&frontend.join("node_modules"))?;
            remove_file(&frontend.join("package-lock.json"))?;
        }
        let command = self.npm.install(&frontend).inherit_output();
        self.run_checked(&command).await?;
        Ok(frontend)
    }

    pub async fn frontend_run(&self, paths: &ProjectPaths, script: &str) -> DmResult<ProcessOutput> {
        let frontend = self.require_frontend(paths)?;
        let command = self.npm.run_script(&frontend, script).inherit_output();
        self.run_checked(&command).await
    }
}
