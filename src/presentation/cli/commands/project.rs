use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Subcommand};

use crate::application::use_cases::manage_project::{
    ManageProjectUseCase, RunServerConfig, SuperuserConfig,
};
use crate::application::use_cases::scaffold_project::{
    CreateProjectConfig, ProjectPaths, ScaffoldProjectUseCase,
};
use crate::common::result::DmResult;
use crate::domain::entities::workspace::ToolSettings;
use crate::infrastructure::process::ProcessRunner;
use crate::presentation::cli::{display, CliContext, DatabaseArgs};

/// Where a project lives
#[derive(Args, Debug, Clone, Default)]
pub struct ProjectLocation {
    /// Parent directory of the project (defaults to the working directory)
    #[arg(short = 'd', long = "dir", value_name = "DIR")]
    pub dir: Option<PathBuf>,
}

impl ProjectLocation {
    pub fn paths(&self, name: &str, context: &CliContext) -> ProjectPaths {
        let parent = match &self.dir {
            Some(dir) => context.resolve(dir),
            None => context.cwd.clone(),
        };
        ProjectPaths::new(name, parent)
    }
}

#[derive(Subcommand, Debug)]
pub enum ProjectCommand {
    /// Create a project from the project template
    Add {
        /// Project name (a Python identifier)
        name: String,

        #[command(flatten)]
        location: ProjectLocation,

        /// Also create a frontend
        #[arg(long)]
        frontend: bool,

        /// Project template directory (overrides the manifest)
        #[arg(long)]
        template: Option<PathBuf>,
    },

    /// Delete a project directory
    Remove {
        name: String,

        #[command(flatten)]
        location: ProjectLocation,
    },

    /// Editable install of the project
    Install {
        name: String,

        #[command(flatten)]
        location: ProjectLocation,
    },

    /// Start the development server
    Run {
        name: String,

        #[command(flatten)]
        location: ProjectLocation,

        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        #[arg(long, default_value_t = 8000)]
        port: u16,

        /// Also run `npm run watch` in the frontend
        #[arg(long)]
        frontend: bool,

        #[command(flatten)]
        database: DatabaseArgs,
    },

    /// Apply migrations
    Migrate {
        name: String,
        app_label: Option<String>,
        migration: Option<String>,

        #[command(flatten)]
        location: ProjectLocation,

        #[command(flatten)]
        database: DatabaseArgs,
    },

    /// Create migrations
    Makemigrations {
        name: String,
        app_label: Option<String>,

        #[command(flatten)]
        location: ProjectLocation,

        #[command(flatten)]
        database: DatabaseArgs,
    },

    /// Run any django-admin command for the project
    Manage {
        name: String,

        /// Management command (lists the commands when omitted)
        command: Option<String>,

        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,

        #[command(flatten)]
        location: ProjectLocation,

        #[command(flatten)]
        database: DatabaseArgs,
    },

    /// Create a superuser without prompting
    Su {
        name: String,

        #[arg(short, long, default_value = "admin")]
        username: String,

        #[arg(short, long, default_value = "admin")]
        password: String,

        #[arg(short, long, env = "PROJECT_EMAIL", default_value = "admin@example.com")]
        email: String,

        #[command(flatten)]
        location: ProjectLocation,

        #[command(flatten)]
        database: DatabaseArgs,
    },
}

impl ProjectCommand {
    pub async fn execute(self, context: &CliContext) -> DmResult<i32> {
        let settings = context.tool_settings().await?;
        let runner = context.runner.clone();

        match self {
            ProjectCommand::Add {
                name,
                location,
                frontend,
                template,
            } => {
                let config = CreateProjectConfig {
                    paths: location.paths(&name, context),
                    frontend,
                    template: template.map(|t| context.resolve(&t)),
                };
                display::header(&format!("Creating project {}", name));
                let result = ScaffoldProjectUseCase::new(settings, runner)
                    .create_project(&config)
                    .await?;
                display::success(&format!(
                    "created {}",
                    display::relative(&result.path, &context.cwd)
                ));
                if result.pyproject_written {
                    display::success("wrote pyproject.toml");
                }
                if result.frontend_created {
                    display::success("created frontend");
                }
                if let Some(warning) = &result.frontend_warning {
                    display::warning(&format!("frontend not created: {}", warning));
                }
                Ok(0)
            }
            ProjectCommand::Remove { name, location } => {
                let removed = ScaffoldProjectUseCase::new(settings, runner)
                    .remove_project(&location.paths(&name, context))
                    .await?;
                display::success(&format!(
                    "removed {}",
                    display::relative(&removed, &context.cwd)
                ));
                Ok(0)
            }
            ProjectCommand::Install { name, location } => {
                let dir = ManageProjectUseCase::new(settings, runner)
                    .install(&location.paths(&name, context))
                    .await?;
                display::success(&format!(
                    "installed {}",
                    display::relative(&dir, &context.cwd)
                ));
                Ok(0)
            }
            ProjectCommand::Run {
                name,
                location,
                host,
                port,
                frontend,
                database,
            } => {
                let use_case = manage(settings, runner, &database);
                let config = RunServerConfig {
                    host,
                    port,
                    frontend,
                };
                display::header(&format!(
                    "Running {} on http://{}:{}",
                    name, config.host, config.port
                ));
                use_case.run(&location.paths(&name, context), &config).await?;
                Ok(0)
            }
            ProjectCommand::Migrate {
                name,
                app_label,
                migration,
                location,
                database,
            } => {
                manage(settings, runner, &database)
                    .migrate(
                        &location.paths(&name, context),
                        app_label.as_deref(),
                        migration.as_deref(),
                    )
                    .await?;
                Ok(0)
            }
            ProjectCommand::Makemigrations {
                name,
                app_label,
                location,
                database,
            } => {
                manage(settings, runner, &database)
                    .makemigrations(&location.paths(&name, context), app_label.as_deref())
                    .await?;
                Ok(0)
            }
            ProjectCommand::Manage {
                name,
                command,
                args,
                location,
                database,
            } => {
                manage(settings, runner, &database)
                    .manage(&location.paths(&name, context), command.as_deref(), &args)
                    .await?;
                Ok(0)
            }
            ProjectCommand::Su {
                name,
                username,
                password,
                email,
                location,
                database,
            } => {
                let config = SuperuserConfig {
                    username,
                    password,
                    email,
                };
                manage(settings, runner, &database)
                    .create_superuser(&location.paths(&name, context), &config)
                    .await?;
                display::success(&format!("created superuser {}", config.username));
                Ok(0)
            }
        }
    }
}

/// Management use case with the database notice shown up front
fn manage(
    settings: ToolSettings,
    runner: Arc<dyn ProcessRunner>,
    database: &DatabaseArgs,
) -> ManageProjectUseCase {
    let use_case = ManageProjectUseCase::new(settings, runner).with_mongodb_uri(database.uri());
    if let Some(notice) = use_case.database_notice() {
        display::notice(notice);
    }
    use_case
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presentation::cli::{Cli, Commands};
    use clap::Parser;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_su_defaults() {
        let cli = Cli::try_parse_from(["dm", "project", "su", "mysite"]).unwrap();
        match cli.command {
            Commands::Project(ProjectCommand::Su {
                username, password, ..
            }) => {
                assert_eq!(username, "admin");
                assert_eq!(password, "admin");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_manage_passes_flags_through() {
        let cli = Cli::try_parse_from([
            "dm", "project", "manage", "mysite", "shell", "-c", "print(1)",
        ])
        .unwrap();
        match cli.command {
            Commands::Project(ProjectCommand::Manage { command, args, .. }) => {
                assert_eq!(command.as_deref(), Some("shell"));
                assert_eq!(args, vec!["-c".to_string(), "print(1)".to_string()]);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
