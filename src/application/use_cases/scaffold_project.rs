use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use crate::common::error::DmError;
use crate::common::result::{DmResult, DmResultExt};
use crate::common::templates::TemplateProcessor;
use crate::domain::entities::workspace::ToolSettings;
use crate::infrastructure::filesystem::file_operations::remove_dir;
use crate::infrastructure::process::{CommandSpec, ProcessRunner};
use crate::infrastructure::tools::{DjangoAdmin, PythonTool};

/// プロジェクト名・アプリ名に使える Python 識別子
fn identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static regex is valid"))
}

/// 名前が Python 識別子として有効か検証する
pub fn validate_identifier(field: &str, name: &str) -> DmResult<()> {
    if identifier_pattern().is_match(name) {
        Ok(())
    } else {
        Err(DmError::validation_error(
            field,
            format!("'{}' is not a valid Python identifier", name),
            Some(name.to_string()),
        ))
    }
}

/// プロジェクトの配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPaths {
    pub name: String,
    /// プロジェクトを置く親ディレクトリ
    pub parent: PathBuf,
}

impl ProjectPaths {
    pub fn new(name: impl Into<String>, parent: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            parent: parent.into(),
        }
    }

    pub fn dir(&self) -> PathBuf {
        self.parent.join(&self.name)
    }

    pub fn frontend_dir(&self) -> PathBuf {
        self.dir().join("frontend")
    }

    pub fn app_dir(&self, app: &str) -> PathBuf {
        self.dir().join(app)
    }

    /// プロジェクトが存在しない場合は NotFound
    pub fn require_existing(&self) -> DmResult<PathBuf> {
        let dir = self.dir();
        if dir.is_dir() {
            Ok(dir)
        } else {
            Err(DmError::not_found(
                "project",
                format!("{} (looked in {})", self.name, self.parent.display()),
            ))
        }
    }
}

/// プロジェクト作成の設定
#[derive(Debug, Clone)]
pub struct CreateProjectConfig {
    pub paths: ProjectPaths,
    pub frontend: bool,
    /// マニフェストのテンプレートより優先する
    pub template: Option<PathBuf>,
}

/// プロジェクト作成の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateProjectResult {
    pub path: PathBuf,
    /// プロジェクト用 pyproject.toml を書き出したか
    pub pyproject_written: bool,
    /// フロントエンドの作成に失敗した場合の理由（警告扱い）
    pub frontend_warning: Option<String>,
    pub frontend_created: bool,
}

/// プロジェクト・アプリ・フロントエンドの生成と削除
pub struct ScaffoldProjectUseCase {
    runner: Arc<dyn ProcessRunner>,
    settings: ToolSettings,
    django_admin: DjangoAdmin,
    python: PythonTool,
    templates: TemplateProcessor,
}

impl ScaffoldProjectUseCase {
    pub fn new(settings: ToolSettings, runner: Arc<dyn ProcessRunner>) -> Self {
        let django_admin = DjangoAdmin::new().with_timeout(settings.timeout_secs);
        let python =
            PythonTool::new(&settings.python, settings.installer).with_timeout(settings.timeout_secs);
        Self {
            runner,
            settings,
            django_admin,
            python,
            templates: TemplateProcessor::new(),
        }
    }

    /// 外部ツールを実行し、失敗時はツール自身の最後の stderr 行を理由にする
    async fn run_checked(&self, command: &CommandSpec) -> DmResult<()> {
        self.runner.run(command).await?.check(command)?;
        Ok(())
    }

    pub async fn create_project(&self, config: &CreateProjectConfig) -> DmResult<CreateProjectResult> {
        let paths = &config.paths;
        validate_identifier("project name", &paths.name)?;

        let dir = paths.dir();
        if dir.exists() {
            return Err(DmError::state_conflict(
                format!("project directory {} already exists", dir.display()),
                Some(dir),
            ));
        }
        tokio::fs::create_dir_all(&paths.parent).await.map_err(|e| {
            DmError::filesystem_error_with_source(
                "failed to create project parent directory",
                Some(paths.parent.clone()),
                e,
            )
        })?;

        let template = config
            .template
            .as_deref()
            .or(self.settings.project.template.as_deref());
        let command = self
            .django_admin
            .startproject(&paths.name, template, &paths.parent);
        if let Err(e) = self.run_checked(&command).await {
            remove_dir(&dir).warn_on_error("failed to clean up partial project");
            return Err(e);
        }

        let pyproject = dir.join("pyproject.toml");
        let pyproject_written = if pyproject.exists() {
            false
        } else {
            let content = self
                .templates
                .render_project_pyproject(&paths.name, &self.settings.project.settings);
            tokio::fs::write(&pyproject, content).await.map_err(|e| {
                DmError::filesystem_error_with_source(
                    "failed to write project pyproject.toml",
                    Some(pyproject.clone()),
                    e,
                )
            })?;
            true
        };

        let mut result = CreateProjectResult {
            path: dir,
            pyproject_written,
            frontend_warning: None,
            frontend_created: false,
        };
        if config.frontend {
            match self.add_frontend(paths).await {
                Ok(_) => result.frontend_created = true,
                Err(e) => {
                    tracing::warn!("frontend for {} was not created: {}", paths.name, e);
                    result.frontend_warning = Some(e.to_string());
                }
            }
        }
        Ok(result)
    }

    /// アンインストール（失敗は警告のみ）してからディレクトリを削除する
    pub async fn remove_project(&self, paths: &ProjectPaths) -> DmResult<PathBuf> {
        let dir = paths.require_existing()?;
        self.uninstall(&paths.name).await;
        remove_dir(&dir)?;
        Ok(dir)
    }

    async fn uninstall(&self, package: &str) {
        let command = self.python.uninstall(package);
        let uninstalled = match self.runner.run(&command).await {
            Ok(output) => output.check(&command).map(|_| ()),
            Err(e) => Err(e),
        };
        uninstalled.warn_on_error(&format!("could not uninstall {}", package));
    }

    pub async fn add_app(
        &self,
        app: &str,
        paths: &ProjectPaths,
        template: Option<&Path>,
    ) -> DmResult<PathBuf> {
        validate_identifier("app name", app)?;
        paths.require_existing()?;

        let app_dir = paths.app_dir(app);
        if app_dir.exists() {
            return Err(DmError::state_conflict(
                format!("app {} already exists in {}", app, paths.name),
                Some(app_dir),
            ));
        }

        // startapp requires the target directory to exist.
        tokio::fs::create_dir_all(&app_dir).await.map_err(|e| {
            DmError::filesystem_error_with_source(
                "failed to create app directory",
                Some(app_dir.clone()),
                e,
            )
        })?;

        let template = template.or(self.settings.project.app_template.as_deref());
        let command = self.django_admin.startapp(app, template, &app_dir);
        if let Err(e) = self.run_checked(&command).await {
            remove_dir(&app_dir).warn_on_error("failed to clean up partial app");
            return Err(e);
        }
        Ok(app_dir)
    }

    pub async fn remove_app(&self, app: &str, paths: &ProjectPaths) -> DmResult<PathBuf> {
        paths.require_existing()?;
        let app_dir = paths.app_dir(app);
        if !app_dir.is_dir() {
            return Err(DmError::not_found("app", format!("{} in project {}", app, paths.name)));
        }
        self.uninstall(app).await;
        remove_dir(&app_dir)?;
        Ok(app_dir)
    }

    /// フロントエンドをテンプレートから生成する
    pub async fn add_frontend(&self, paths: &ProjectPaths) -> DmResult<PathBuf> {
        paths.require_existing()?;
        let template = self.settings.project.frontend_template.as_deref().ok_or_else(|| {
            DmError::config_error(
                "no frontend template configured ([tool.django_mongodb_cli.project].frontend_template)",
                None,
            )
        })?;

        let frontend = paths.frontend_dir();
        if frontend.exists() {
            return Err(DmError::state_conflict(
                format!("{} already exists", frontend.display()),
                Some(frontend),
            ));
        }
        tokio::fs::create_dir_all(&frontend).await.map_err(|e| {
            DmError::filesystem_error_with_source(
                "failed to create frontend directory",
                Some(frontend.clone()),
                e,
            )
        })?;

        let command = self.django_admin.startapp("frontend", Some(template), &frontend);
        if let Err(e) = self.run_checked(&command).await {
            remove_dir(&frontend).warn_on_error("failed to clean up partial frontend");
            return Err(e);
        }
        Ok(frontend)
    }

    pub async fn remove_frontend(&self, paths: &ProjectPaths) -> DmResult<PathBuf> {
        paths.require_existing()?;
        let frontend = paths.frontend_dir();
        if !remove_dir(&frontend)? {
            return Err(DmError::not_found("frontend", paths.name.clone()));
        }
        Ok(frontend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::process::{MockProcessRunner, ProcessOutput};
    use std::fs;
    use tempfile::TempDir;

    fn settings() -> ToolSettings {
        let mut settings = ToolSettings::default();
        settings.project.template = Some(PathBuf::from("/tpl/project_template"));
        settings
    }

    #[tokio::test]
    async fn test_create_project_writes_pyproject() {
        let temp = TempDir::new().unwrap();
        let mut runner = MockProcessRunner::new();
        runner
            .expect_run()
            .withf(|cmd| cmd.args[0] == "startproject")
            .times(1)
            .returning(|cmd| {
                let parent = cmd.working_directory.clone().unwrap();
                fs::create_dir_all(parent.join("mysite/mysite")).unwrap();
                Ok(ProcessOutput::success_with(""))
            });

        let use_case = ScaffoldProjectUseCase::new(settings(), Arc::new(runner));
        let result = use_case
            .create_project(&CreateProjectConfig {
                paths: ProjectPaths::new("mysite", temp.path()),
                frontend: false,
                template: None,
            })
            .await
            .unwrap();

        assert!(result.pyproject_written);
        let pyproject = fs::read_to_string(result.path.join("pyproject.toml")).unwrap();
        assert!(pyproject.contains("name = \"mysite\""));
        assert!(pyproject.contains("mysite.settings.base"));
    }

    #[tokio::test]
    async fn test_create_project_surfaces_last_stderr_line() {
        let temp = TempDir::new().unwrap();
        let mut runner = MockProcessRunner::new();
        runner.expect_run().times(1).returning(|_| {
            Ok(ProcessOutput::failure(
                1,
                "Traceback (most recent call last):\n  ...\nCommandError: 'mysite' conflicts with the name of an existing Python module\n",
            ))
        });

        let use_case = ScaffoldProjectUseCase::new(settings(), Arc::new(runner));
        let err = use_case
            .create_project(&CreateProjectConfig {
                paths: ProjectPaths::new("mysite", temp.path()),
                frontend: false,
                template: None,
            })
            .await
            .unwrap_err();
        match err {
            DmError::ExternalTool { message, .. } => {
                assert!(message.starts_with("CommandError: 'mysite' conflicts"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_existing_project_is_a_conflict() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("mysite")).unwrap();
        let mut runner = MockProcessRunner::new();
        runner.expect_run().never();

        let use_case = ScaffoldProjectUseCase::new(settings(), Arc::new(runner));
        let err = use_case
            .create_project(&CreateProjectConfig {
                paths: ProjectPaths::new("mysite", temp.path()),
                frontend: true,
                template: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DmError::StateConflict { .. }));
    }

    #[tokio::test]
    async fn test_add_app_rules() {
        let temp = TempDir::new().unwrap();
        let paths = ProjectPaths::new("mysite", temp.path());
        let mut runner = MockProcessRunner::new();
        runner
            .expect_run()
            .withf(|cmd| cmd.args[0] == "startapp")
            .times(1)
            .returning(|_| Ok(ProcessOutput::success_with("")));
        runner
            .expect_run()
            .withf(|cmd| cmd.args.contains(&"uninstall".to_string()))
            .times(1)
            .returning(|_| Ok(ProcessOutput::success_with("")));
        let use_case = ScaffoldProjectUseCase::new(settings(), Arc::new(runner));

        assert!(matches!(
            use_case.add_app("blog", &paths, None).await,
            Err(DmError::NotFound { .. })
        ));
        fs::create_dir_all(paths.dir()).unwrap();
        assert!(matches!(
            use_case.add_app("my-blog", &paths, None).await,
            Err(DmError::ValidationError { .. })
        ));

        let app_dir = use_case.add_app("blog", &paths, None).await.unwrap();
        assert!(app_dir.is_dir());
        assert!(matches!(
            use_case.add_app("blog", &paths, None).await,
            Err(DmError::StateConflict { .. })
        ));

        use_case.remove_app("blog", &paths).await.unwrap();
        assert!(!app_dir.exists());
    }

    #[tokio::test]
    async fn test_remove_project_tolerates_uninstall_failure() {
        let temp = TempDir::new().unwrap();
        let paths = ProjectPaths::new("mysite", temp.path());
        fs::create_dir_all(paths.dir().join("mysite")).unwrap();

        let mut runner = MockProcessRunner::new();
        runner
            .expect_run()
            .times(1)
            .returning(|_| Ok(ProcessOutput::failure(1, "not installed")));
        let use_case = ScaffoldProjectUseCase::new(settings(), Arc::new(runner));

        use_case.remove_project(&paths).await.unwrap();
        assert!(!paths.dir().exists());
    }

    #[tokio::test]
    async fn test_remove_app_tolerates_uninstall_failure() {
        let temp = TempDir::new().unwrap();
        let paths = ProjectPaths::new("mysite", temp.path());
        let app_dir = paths.app_dir("blog");
        fs::create_dir_all(&app_dir).unwrap();

        let mut runner = MockProcessRunner::new();
        runner
            .expect_run()
            .withf(|cmd| {
                cmd.args.contains(&"uninstall".to_string()) && cmd.args.contains(&"blog".to_string())
            })
            .times(1)
            .returning(|_| Ok(ProcessOutput::failure(1, "WARNING: Skipping blog as it is not installed.")));
        let use_case = ScaffoldProjectUseCase::new(settings(), Arc::new(runner));

        let removed = use_case.remove_app("blog", &paths).await.unwrap();
        assert_eq!(removed, app_dir);
        assert!(!app_dir.exists());
        assert!(paths.dir().is_dir());
    }

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("app", "blog_2").is_ok());
        assert!(validate_identifier("app", "_private").is_ok());
        assert!(validate_identifier("app", "2blog").is_err());
        assert!(validate_identifier("app", "my-blog").is_err());
    }
}
