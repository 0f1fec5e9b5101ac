pub mod app;
pub mod frontend;
pub mod init;
pub mod project;
pub mod repo;

pub use app::AppCommand;
pub use frontend::FrontendCommand;
pub use init::InitCommand;
pub use project::{ProjectCommand, ProjectLocation};
pub use repo::{RemoteCommand, RepoCommand, TestArgs};

use crate::application::services::FixtureOutcome;
use crate::domain::entities::repository::FixtureKind;
use crate::presentation::cli::display;

/// Report the fixture copies made before a test or migrations run
pub(crate) fn print_fixtures(fixtures: &[(FixtureKind, FixtureOutcome)]) {
    for (kind, outcome) in fixtures {
        match outcome {
            FixtureOutcome::Copied { files } => display::success(&format!(
                "copied {} fixture ({} file{})",
                kind.key(),
                files,
                if *files == 1 { "" } else { "s" }
            )),
            FixtureOutcome::Skipped => {
                display::notice(&format!("{} fixture already in place", kind.key()))
            }
            FixtureOutcome::NotDeclared => {}
        }
    }
}
