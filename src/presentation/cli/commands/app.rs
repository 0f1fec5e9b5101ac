use std::path::PathBuf;

use clap::Subcommand;

use super::project::ProjectLocation;
use crate::application::use_cases::scaffold_project::ScaffoldProjectUseCase;
use crate::common::result::DmResult;
use crate::presentation::cli::{display, CliContext};

#[derive(Subcommand, Debug)]
pub enum AppCommand {
    /// Create an app inside a project from the app template
    Add {
        /// App name (a Python identifier)
        name: String,

        /// Project the app belongs to
        project: String,

        #[command(flatten)]
        location: ProjectLocation,

        /// App template directory (overrides the manifest)
        #[arg(long)]
        template: Option<PathBuf>,
    },

    /// Delete an app from a project
    Remove {
        name: String,
        project: String,

        #[command(flatten)]
        location: ProjectLocation,
    },
}

impl AppCommand {
    pub async fn execute(self, context: &CliContext) -> DmResult<i32> {
        let settings = context.tool_settings().await?;
        let use_case = ScaffoldProjectUseCase::new(settings, context.runner.clone());

        match self {
            AppCommand::Add {
                name,
                project,
                location,
                template,
            } => {
                let template = template.map(|t| context.resolve(&t));
                let dir = use_case
                    .add_app(&name, &location.paths(&project, context), template.as_deref())
                    .await?;
                display::success(&format!(
                    "created app {}",
                    display::relative(&dir, &context.cwd)
                ));
            }
            AppCommand::Remove {
                name,
                project,
                location,
            } => {
                let dir = use_case
                    .remove_app(&name, &location.paths(&project, context))
                    .await?;
                display::success(&format!(
                    "removed app {}",
                    display::relative(&dir, &context.cwd)
                ));
            }
        }
        Ok(0)
    }
}
