use clap::Args;

use crate::common::result::DmResult;
use crate::common::templates::TemplateProcessor;
use crate::infrastructure::filesystem::manifest_store::{ManifestStore, ManifestWrite};
use crate::presentation::cli::{display, CliContext};

/// Write a starter `[tool.django_mongodb_cli]` table into pyproject.toml
#[derive(Args, Debug)]
pub struct InitCommand {
    /// Rewrite the file even if it already has the table
    #[arg(short, long)]
    pub force: bool,
}

impl InitCommand {
    pub async fn execute(&self, context: &CliContext) -> DmResult<i32> {
        let target = context.cwd.join("pyproject.toml");
        let template = TemplateProcessor::new().get_default_manifest();

        let written = ManifestStore::new()
            .write_starter_manifest(&target, &template, self.force)
            .await?;

        match written {
            ManifestWrite::Created => display::success(&format!("created {}", target.display())),
            ManifestWrite::Appended => display::success(&format!(
                "added [tool.django_mongodb_cli] to {}",
                target.display()
            )),
            ManifestWrite::Replaced { backup } => display::success(&format!(
                "rewrote {} (previous content saved to {})",
                target.display(),
                backup.display()
            )),
        }
        println!();
        println!("Next steps:");
        println!("   1. Edit the repos list in pyproject.toml");
        println!("   2. Run 'dm repo clone -a' to clone every repository");
        println!("   3. Run 'dm repo test <name>' to run a repository's tests");
        Ok(0)
    }
}
