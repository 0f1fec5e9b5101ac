use clap::Subcommand;

use super::project::ProjectLocation;
use crate::application::use_cases::manage_project::ManageProjectUseCase;
use crate::application::use_cases::scaffold_project::ScaffoldProjectUseCase;
use crate::common::result::DmResult;
use crate::presentation::cli::{display, CliContext};

#[derive(Subcommand, Debug)]
pub enum FrontendCommand {
    /// Create `<project>/frontend` from the frontend template
    Add {
        project: String,

        #[command(flatten)]
        location: ProjectLocation,
    },

    /// Delete a project's frontend
    Remove {
        project: String,

        #[command(flatten)]
        location: ProjectLocation,
    },

    /// Run `npm install` in the frontend
    Install {
        project: String,

        #[command(flatten)]
        location: ProjectLocation,

        /// Remove node_modules and package-lock.json first
        #[arg(long)]
        clean: bool,
    },

    /// Run an npm script in the frontend
    Run {
        project: String,

        #[command(flatten)]
        location: ProjectLocation,

        #[arg(long, default_value = "watch")]
        script: String,
    },
}

impl FrontendCommand {
    pub async fn execute(self, context: &CliContext) -> DmResult<i32> {
        let settings = context.tool_settings().await?;
        let runner = context.runner.clone();

        match self {
            FrontendCommand::Add { project, location } => {
                let dir = ScaffoldProjectUseCase::new(settings, runner)
                    .add_frontend(&location.paths(&project, context))
                    .await?;
                display::success(&format!(
                    "created {}",
                    display::relative(&dir, &context.cwd)
                ));
            }
            FrontendCommand::Remove { project, location } => {
                let dir = ScaffoldProjectUseCase::new(settings, runner)
                    .remove_frontend(&location.paths(&project, context))
                    .await?;
                display::success(&format!(
                    "removed {}",
                    display::relative(&dir, &context.cwd)
                ));
            }
            FrontendCommand::Install {
                project,
                location,
                clean,
            } => {
                let dir = ManageProjectUseCase::new(settings, runner)
                    .frontend_install(&location.paths(&project, context), clean)
                    .await?;
                display::success(&format!(
                    "installed dependencies in {}",
                    display::relative(&dir, &context.cwd)
                ));
            }
            FrontendCommand::Run {
                project,
                location,
                script,
            } => {
                ManageProjectUseCase::new(settings, runner)
                    .frontend_run(&location.paths(&project, context), &script)
                    .await?;
            }
        }
        Ok(0)
    }
}
