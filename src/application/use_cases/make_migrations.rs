use std::sync::Arc;

use crate::application::services::{FixtureOutcome, FixtureService};
use crate::common::error::DmError;
use crate::common::result::{DmResult, OptionExt};
use crate::domain::entities::repository::FixtureKind;
use crate::domain::entities::workspace::Workspace;
use crate::domain::value_objects::EnvOverlay;
use crate::infrastructure::process::{CommandSpec, ProcessRunner};
use crate::infrastructure::tools::DjangoAdmin;

/// makemigrations の結果
#[derive(Debug, Clone)]
pub struct MakeMigrationsResult {
    pub fixtures: Vec<(FixtureKind, FixtureOutcome)>,
    pub command: CommandSpec,
}

/// クローン済みリポジトリのマイグレーションを生成する
pub struct MakeMigrationsUseCase<'w> {
    workspace: &'w Workspace,
    runner: Arc<dyn ProcessRunner>,
    fixtures: FixtureService,
    django_admin: DjangoAdmin,
}

impl<'w> MakeMigrationsUseCase<'w> {
    pub fn new(workspace: &'w Workspace, runner: Arc<dyn ProcessRunner>) -> Self {
        let django_admin = DjangoAdmin::new().with_timeout(workspace.settings().timeout_secs);
        Self {
            workspace,
            runner,
            fixtures: FixtureService::new(),
            django_admin,
        }
    }

    /// apps と migrations 用設定ファイルを配置してから
    /// `django-admin makemigrations` を実行する
    pub async fn execute(
        &self,
        name: &str,
        args: &[String],
        env: &EnvOverlay,
    ) -> DmResult<MakeMigrationsResult> {
        let repo = self
            .workspace
            .registry()
            .get(name)
            .ok_or_else(|| DmError::repository_not_found(name))?;
        let test = repo
            .test
            .as_ref()
            .ok_or_not_found("test configuration for repository", name)?;
        let settings = test.migrations_settings_module.as_deref().ok_or_else(|| {
            DmError::config_error(
                format!("test.{}.settings.migrations is not set", name),
                Some(self.workspace.manifest_path().to_path_buf()),
            )
        })?;

        let clone_path = self.workspace.clone_path(&repo.name);
        if !clone_path.exists() {
            return Err(DmError::state_conflict(
                format!("{} is not cloned (run `dm repo clone {}`)", name, name),
                Some(clone_path),
            ));
        }

        let mut fixtures = Vec::new();
        for kind in [FixtureKind::Apps, FixtureKind::MigrationsSettings] {
            let outcome = self.fixtures.apply(repo, kind, &clone_path)?;
            if outcome != FixtureOutcome::NotDeclared {
                fixtures.push((kind, outcome));
            }
        }

        let pythonpath = clone_path.join(&test.primary_root);
        let command = self
            .django_admin
            .makemigrations_with_settings(settings, &pythonpath, args)
            .with_working_directory(&pythonpath)
            .with_env(&test.env.merged(env))
            .inherit_output();
        self.runner.run(&command).await?.check(&command)?;

        Ok(MakeMigrationsResult { fixtures, command })
    }
}
