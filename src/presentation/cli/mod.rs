pub mod commands;
pub mod display;

use std::env;
use std::path::{Path, PathBuf};
use std::process::exit;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use crate::application::services::ManifestService;
use crate::common::error::DmError;
use crate::common::result::DmResult;
use crate::domain::entities::invocation::Selector;
use crate::domain::entities::workspace::{ToolSettings, Workspace};
use crate::domain::value_objects::EnvOverlay;
use crate::infrastructure::process::{ProcessRunner, TokioProcessRunner};

use commands::{AppCommand, FrontendCommand, InitCommand, ProjectCommand, RepoCommand};

/// Output format options for status
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output (default)
    Text,
    /// JSON output
    Json,
    /// YAML output
    Yaml,
}

/// dm - clone, configure and test Django ecosystem repositories against MongoDB
#[derive(Parser, Debug)]
#[command(name = "dm")]
#[command(about = "Clone, configure and test Django ecosystem repositories against MongoDB")]
#[command(version)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Working directory (defaults to current directory)
    #[arg(short = 'C', long, global = true)]
    pub directory: Option<PathBuf>,

    /// Manifest file (pyproject.toml with a [tool.django_mongodb_cli] table)
    #[arg(long, global = true, env = "DM_MANIFEST")]
    pub manifest: Option<PathBuf>,

    /// Python interpreter used for installs
    #[arg(long, global = true, env = "DM_PYTHON")]
    pub python: Option<String>,

    /// Subprocess timeout in seconds (0 disables)
    #[arg(long, global = true, env = "DM_TIMEOUT")]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a starter manifest into pyproject.toml
    Init(InitCommand),

    /// Manage the repositories declared in the manifest
    #[command(subcommand)]
    Repo(RepoCommand),

    /// Create, run and manage Django projects
    #[command(subcommand)]
    Project(ProjectCommand),

    /// Add or remove apps inside a project
    #[command(subcommand)]
    App(AppCommand),

    /// Manage a project's frontend
    #[command(subcommand)]
    Frontend(FrontendCommand),

    /// Show build information
    Version,
}

/// Repository selector: names, groups or everything.
///
/// Exactly one form must be given.
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct SelectorArgs {
    /// Repository or group names
    #[arg(value_name = "NAME")]
    pub names: Vec<String>,

    /// Group to operate on (repeatable)
    #[arg(short, long = "group", value_name = "GROUP")]
    pub groups: Vec<String>,

    /// Operate on every declared repository
    #[arg(short, long)]
    pub all_repos: bool,
}

impl SelectorArgs {
    pub fn selector(&self) -> Selector {
        if self.all_repos {
            Selector::All
        } else if !self.groups.is_empty() {
            Selector::Groups(self.groups.clone())
        } else {
            Selector::Names(self.names.clone())
        }
    }
}

/// Database connection passed to child processes
#[derive(Args, Debug, Clone, Default)]
pub struct DatabaseArgs {
    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", hide_env_values = true)]
    pub mongodb_uri: Option<String>,
}

impl DatabaseArgs {
    pub fn uri(&self) -> Option<String> {
        self.mongodb_uri.clone().filter(|u| !u.trim().is_empty())
    }

    pub fn overlay(&self) -> EnvOverlay {
        EnvOverlay::new().with_optional("MONGODB_URI", self.uri())
    }
}

/// Settings shared by every command handler
pub struct CliContext {
    pub verbose: bool,
    /// Base directory for relative paths and manifest discovery
    pub cwd: PathBuf,
    pub manifest: Option<PathBuf>,
    pub python: Option<String>,
    pub timeout: Option<u64>,
    pub runner: Arc<dyn ProcessRunner>,
}

impl CliContext {
    pub fn from_cli(cli: &Cli) -> DmResult<Self> {
        let current = env::current_dir()?;
        let cwd = match &cli.directory {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => current.join(dir),
            None => current,
        };
        if !cwd.is_dir() {
            return Err(DmError::not_found("directory", cwd.display().to_string()));
        }
        Ok(Self {
            verbose: cli.verbose,
            cwd,
            manifest: cli.manifest.clone(),
            python: cli.python.clone(),
            timeout: cli.timeout,
            runner: Arc::new(TokioProcessRunner::new()),
        })
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.cwd.join(path)
        }
    }

    /// Locate, parse and validate the manifest
    pub async fn load_workspace(&self) -> DmResult<Workspace> {
        let service = ManifestService::new();
        let path = service.locate(self.manifest.as_deref(), &self.cwd)?;
        self.load_from(&service, &path).await
    }

    async fn load_from(&self, service: &ManifestService, path: &Path) -> DmResult<Workspace> {
        let processed = service.load(path).await?;
        for warning in &processed.warnings {
            display::warning(warning);
        }
        Ok(processed
            .workspace
            .with_timeout(self.timeout)
            .with_python(self.python.clone()))
    }

    /// Tool settings for project commands.
    ///
    /// Projects can live outside a manifest workspace, so a missing manifest
    /// falls back to defaults; a broken one is still an error.
    pub async fn tool_settings(&self) -> DmResult<ToolSettings> {
        let service = ManifestService::new();
        match service.locate(self.manifest.as_deref(), &self.cwd) {
            Ok(path) => Ok(self.load_from(&service, &path).await?.settings().clone()),
            Err(DmError::ConfigError { .. }) if self.manifest.is_none() => {
                tracing::debug!("no manifest found; using default tool settings");
                let mut settings = ToolSettings::default();
                if let Some(python) = self.python.clone().filter(|p| !p.trim().is_empty()) {
                    settings.python = python;
                }
                settings.timeout_secs = self.timeout.filter(|t| *t > 0);
                Ok(settings)
            }
            Err(e) => Err(e),
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// CLI application runner
pub struct CliApp {
    cli: Cli,
}

impl CliApp {
    pub fn new() -> Self {
        Self { cli: Cli::parse() }
    }

    pub fn from_cli(cli: Cli) -> Self {
        Self { cli }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        if self.cli.no_color {
            colored::control::set_override(false);
        }
        init_tracing(self.cli.verbose);

        match self.handle_command().await {
            Ok(0) => Ok(()),
            Ok(code) => exit(code),
            Err(e) => {
                eprintln!("{} {}", "Error:".red().bold(), e);
                let code = e
                    .downcast_ref::<DmError>()
                    .map(DmError::exit_code)
                    .unwrap_or(1);
                exit(code);
            }
        }
    }

    async fn handle_command(self) -> anyhow::Result<i32> {
        let context = CliContext::from_cli(&self.cli)?;
        let code = match self.cli.command {
            Commands::Init(command) => command.execute(&context).await?,
            Commands::Repo(command) => command.execute(&context).await?,
            Commands::Project(command) => command.execute(&context).await?,
            Commands::App(command) => command.execute(&context).await?,
            Commands::Frontend(command) => command.execute(&context).await?,
            Commands::Version => {
                print_version();
                0
            }
        };
        Ok(code)
    }
}

impl Default for CliApp {
    fn default() -> Self {
        Self::new()
    }
}

fn print_version() {
    println!(
        "dm {} ({} {}, {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_DATE"),
        env!("BUILD_TARGET")
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_selector_forms_are_exclusive() {
        assert!(Cli::try_parse_from(["dm", "repo", "pull", "django", "-a"]).is_err());
        assert!(Cli::try_parse_from(["dm", "repo", "pull", "-g", "core", "django"]).is_err());
        assert!(Cli::try_parse_from(["dm", "repo", "pull"]).is_err());
    }

    #[test]
    fn test_selector_from_group_flags() {
        let cli = Cli::try_parse_from(["dm", "repo", "fetch", "-g", "core", "-g", "third-party"])
            .unwrap();
        match cli.command {
            Commands::Repo(RepoCommand::Fetch { selector }) => assert_eq!(
                selector.selector(),
                Selector::Groups(vec!["core".to_string(), "third-party".to_string()])
            ),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_database_overlay_skips_blank_uri() {
        let args = DatabaseArgs {
            mongodb_uri: Some("  ".to_string()),
        };
        assert!(args.overlay().is_empty());
    }
}
