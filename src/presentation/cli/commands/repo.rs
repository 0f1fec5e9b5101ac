use clap::{Args, Subcommand};
use colored::Colorize;

use super::print_fixtures;
use crate::application::use_cases::batch::{BatchResult, RepoOutcome};
use crate::application::use_cases::clone_repositories::{
    CloneRepositoriesConfig, CloneRepositoriesUseCase,
};
use crate::application::use_cases::delete_repositories::DeleteRepositoriesUseCase;
use crate::application::use_cases::git_operations::{GitOperation, GitOperationsUseCase};
use crate::application::use_cases::install_repositories::{
    InstallRepositoriesConfig, InstallRepositoriesUseCase,
};
use crate::application::use_cases::make_migrations::MakeMigrationsUseCase;
use crate::application::use_cases::manage_project::DEFAULT_DATABASE_NOTICE;
use crate::application::use_cases::run_tests::{RunTestsConfig, RunTestsUseCase};
use crate::application::use_cases::status_check::{
    RepositoryState, RepositoryStatus, StatusCheckUseCase, StatusResult,
};
use crate::common::error::DmError;
use crate::common::result::DmResult;
use crate::domain::entities::invocation::{Action, CommandInvocation, Selector, TestOptions};
use crate::domain::entities::workspace::Workspace;
use crate::domain::value_objects::EnvOverlay;
use crate::presentation::cli::{display, CliContext, DatabaseArgs, OutputFormat, SelectorArgs};

#[derive(Subcommand, Debug)]
pub enum RepoCommand {
    /// List the declared repositories and groups
    List,

    /// Clone repositories into the workspace
    Clone {
        #[command(flatten)]
        selector: SelectorArgs,

        /// Install each repository after cloning
        #[arg(long)]
        install: bool,

        #[command(flatten)]
        database: DatabaseArgs,
    },

    /// Install cloned repositories into the active Python environment
    Install {
        #[command(flatten)]
        selector: SelectorArgs,

        #[command(flatten)]
        database: DatabaseArgs,
    },

    /// Fetch from origin
    Fetch {
        #[command(flatten)]
        selector: SelectorArgs,
    },

    /// Fetch, then pull
    Update {
        #[command(flatten)]
        selector: SelectorArgs,
    },

    /// Pull the current branch
    Pull {
        #[command(flatten)]
        selector: SelectorArgs,
    },

    /// Push the current branch
    Push {
        #[command(flatten)]
        selector: SelectorArgs,
    },

    /// Show working tree status
    Status {
        #[command(flatten)]
        selector: SelectorArgs,

        /// Output format (text, json, yaml)
        #[arg(short, long, value_enum, default_value = "text")]
        output: OutputFormat,
    },

    /// Show uncommitted changes
    Diff {
        #[command(flatten)]
        selector: SelectorArgs,
    },

    /// Show recent commits
    Log {
        #[command(flatten)]
        selector: SelectorArgs,

        /// Number of commits to show
        #[arg(short = 'n', long, default_value_t = 10)]
        max_count: usize,
    },

    /// Discard local changes (git reset --hard)
    Reset {
        #[command(flatten)]
        selector: SelectorArgs,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Remove clones from the workspace
    Delete {
        #[command(flatten)]
        selector: SelectorArgs,

        /// Uninstall the package first
        #[arg(long)]
        uninstall: bool,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Add or remove git remotes
    #[command(subcommand)]
    Remote(RemoteCommand),

    /// Run a repository's own test suite against MongoDB
    Test(TestArgs),

    /// Generate migrations with the repository's migrations settings
    Makemigrations {
        /// Repository name
        name: String,

        /// Extra arguments for makemigrations
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,

        #[command(flatten)]
        database: DatabaseArgs,
    },
}

#[derive(Subcommand, Debug)]
pub enum RemoteCommand {
    /// Add a remote to a cloned repository
    Add {
        /// Repository name
        name: String,
        /// Remote name
        remote: String,
        /// Remote URL
        url: String,
    },

    /// Remove a remote from a cloned repository
    Remove {
        /// Repository name
        name: String,
        /// Remote name
        remote: String,
    },
}

#[derive(Args, Debug)]
pub struct TestArgs {
    /// Repository name
    pub name: String,

    /// Test modules or paths (default: every declared test root)
    pub modules: Vec<String>,

    /// Only run tests matching this keyword
    #[arg(short, long)]
    pub keyword: Option<String>,

    /// Keep the test database between runs
    #[arg(long)]
    pub keepdb: bool,

    /// List the modules in each test root instead of running
    #[arg(long, conflicts_with = "show")]
    pub list: bool,

    /// Print the resolved test configuration and exit
    #[arg(long)]
    pub show: bool,

    #[command(flatten)]
    pub database: DatabaseArgs,
}

/// What `repo test` should do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TestMode {
    Run,
    List,
    Show,
}

/// Presentation options that are not part of the invocation itself
#[derive(Debug, Clone, Copy)]
struct RepoView {
    output: OutputFormat,
    test_mode: TestMode,
    assume_yes: bool,
}

impl Default for RepoView {
    fn default() -> Self {
        Self {
            output: OutputFormat::Text,
            test_mode: TestMode::Run,
            assume_yes: false,
        }
    }
}

impl RepoCommand {
    pub async fn execute(self, context: &CliContext) -> DmResult<i32> {
        let workspace = context.load_workspace().await?;
        let (invocation, view) = self.into_invocation();
        let handler = RepoHandler {
            context,
            workspace: &workspace,
        };
        handler.dispatch(invocation, view).await
    }

    fn into_invocation(self) -> (CommandInvocation, RepoView) {
        let mut view = RepoView::default();
        let single = |name: String| Selector::Names(vec![name]);
        let invocation = match self {
            RepoCommand::List => CommandInvocation::new(Selector::All, Action::List),
            RepoCommand::Clone {
                selector,
                install,
                database,
            } => CommandInvocation::new(selector.selector(), Action::Clone { install })
                .with_env(database.overlay()),
            RepoCommand::Install { selector, database } => {
                CommandInvocation::new(selector.selector(), Action::Install)
                    .with_env(database.overlay())
            }
            RepoCommand::Fetch { selector } => {
                CommandInvocation::new(selector.selector(), Action::Fetch)
            }
            RepoCommand::Update { selector } => {
                CommandInvocation::new(selector.selector(), Action::Update)
            }
            RepoCommand::Pull { selector } => CommandInvocation::new(selector.selector(), Action::Pull),
            RepoCommand::Push { selector } => CommandInvocation::new(selector.selector(), Action::Push),
            RepoCommand::Status { selector, output } => {
                view.output = output;
                CommandInvocation::new(selector.selector(), Action::Status)
            }
            RepoCommand::Diff { selector } => CommandInvocation::new(selector.selector(), Action::Diff),
            RepoCommand::Log {
                selector,
                max_count,
            } => CommandInvocation::new(selector.selector(), Action::Log { max_count }),
            RepoCommand::Reset { selector, yes } => {
                view.assume_yes = yes;
                CommandInvocation::new(selector.selector(), Action::Reset)
            }
            RepoCommand::Delete {
                selector,
                uninstall,
                yes,
            } => {
                view.assume_yes = yes;
                CommandInvocation::new(selector.selector(), Action::Delete { uninstall })
            }
            RepoCommand::Remote(RemoteCommand::Add { name, remote, url }) => {
                CommandInvocation::new(single(name), Action::RemoteAdd { remote, url })
            }
            RepoCommand::Remote(RemoteCommand::Remove { name, remote }) => {
                CommandInvocation::new(single(name), Action::RemoteRemove { remote })
            }
            RepoCommand::Test(args) => {
                view.test_mode = if args.show {
                    TestMode::Show
                } else if args.list {
                    TestMode::List
                } else {
                    TestMode::Run
                };
                let options = TestOptions {
                    modules: args.modules,
                    keyword: args.keyword,
                    keepdb: args.keepdb,
                };
                CommandInvocation::new(single(args.name), Action::Test(options))
                    .with_env(args.database.overlay())
            }
            RepoCommand::Makemigrations {
                name,
                args,
                database,
            } => CommandInvocation::new(single(name), Action::MakeMigrations { args })
                .with_env(database.overlay()),
        };
        (invocation, view)
    }
}

struct RepoHandler<'a> {
    context: &'a CliContext,
    workspace: &'a Workspace,
}

impl<'a> RepoHandler<'a> {
    async fn dispatch(&self, invocation: CommandInvocation, view: RepoView) -> DmResult<i32> {
        let CommandInvocation {
            selector,
            action,
            env,
        } = invocation;
        let action_name = action.name();
        tracing::debug!("repo {} on {:?}", action_name, selector);

        if action.is_destructive() {
            display::confirm(
                &format!("{} {}?", action_name, describe(&selector)),
                view.assume_yes,
            )?;
        }

        let runner = self.context.runner.clone();
        let workspace = self.workspace;
        let mut report = display::outcome;

        let result = match action {
            Action::List => {
                self.list();
                return Ok(0);
            }
            Action::Status => return self.status(&selector, view.output).await,
            Action::Test(options) => {
                return self.test(&selector, options, env, view.test_mode).await
            }
            Action::MakeMigrations { args } => {
                return self.makemigrations(&selector, &args, &env).await
            }
            Action::Clone { install } => self.clone_repositories(selector, install, env).await?,
            Action::Install => {
                let config = InstallRepositoriesConfig::new(selector).with_env(env);
                InstallRepositoriesUseCase::new(workspace, runner)
                    .execute(&config, &mut report)
                    .await?
            }
            Action::Diff => {
                StatusCheckUseCase::new(workspace, runner)
                    .diff(&selector, &mut display::outcome_with_body)
                    .await?
            }
            Action::Log { max_count } => {
                StatusCheckUseCase::new(workspace, runner)
                    .log(&selector, max_count, &mut display::outcome_with_body)
                    .await?
            }
            Action::Delete { uninstall } => {
                DeleteRepositoriesUseCase::new(workspace, runner)
                    .execute(&selector, uninstall, &mut report)
                    .await?
            }
            Action::Fetch => self.git(&selector, GitOperation::Fetch).await?,
            Action::Update => self.git(&selector, GitOperation::Update).await?,
            Action::Pull => self.git(&selector, GitOperation::Pull).await?,
            Action::Push => self.git(&selector, GitOperation::Push).await?,
            Action::Reset => self.git(&selector, GitOperation::Reset).await?,
            Action::RemoteAdd { remote, url } => {
                self.git(&selector, GitOperation::RemoteAdd { remote, url })
                    .await?
            }
            Action::RemoteRemove { remote } => {
                self.git(&selector, GitOperation::RemoteRemove { remote })
                    .await?
            }
        };

        display::batch_summary(action_name, &result);
        Ok(result.exit_code())
    }

    async fn git(&self, selector: &Selector, operation: GitOperation) -> DmResult<BatchResult> {
        let mut report = display::outcome;
        GitOperationsUseCase::new(self.workspace, self.context.runner.clone())
            .execute(selector, &operation, &mut report)
            .await
    }

    async fn clone_repositories(
        &self,
        selector: Selector,
        install: bool,
        env: EnvOverlay,
    ) -> DmResult<BatchResult> {
        // Installs stream pip output, which would fight with a spinner
        let interactive = atty::is(atty::Stream::Stdout) && !install;
        let config = CloneRepositoriesConfig::new(selector)
            .with_install(install)
            .with_stream_output(!interactive)
            .with_env(env);
        let use_case = CloneRepositoriesUseCase::new(self.workspace, self.context.runner.clone());

        if !interactive {
            let mut report = display::outcome;
            return use_case.execute(&config, &mut report).await;
        }

        let bar = display::spinner(format!(
            "cloning into {}",
            display::relative(self.workspace.home(), &self.context.cwd)
        ));
        let mut report = |outcome: &RepoOutcome| bar.suspend(|| display::outcome(outcome));
        let result = use_case.execute(&config, &mut report).await;
        bar.finish_and_clear();
        result
    }

    fn list(&self) {
        let registry = self.workspace.registry();
        display::header(&format!(
            "{} repositories in {}",
            registry.len(),
            display::relative(self.workspace.home(), &self.context.cwd)
        ));
        for repo in registry.list_all() {
            let state = if self.workspace.is_cloned(&repo.name) {
                "cloned".green()
            } else {
                "not cloned".dimmed()
            };
            let branch = repo
                .source
                .branch()
                .map(|b| format!(" ({})", b.blue()))
                .unwrap_or_default();
            let groups = if repo.groups.is_empty() {
                String::new()
            } else {
                format!(" [{}]", repo.groups.join(", "))
            };
            println!(
                "  {} {}{}{} {}",
                repo.name.bold(),
                repo.source.url(),
                branch,
                groups,
                state
            );
        }
        if !registry.groups().is_empty() {
            display::header("groups");
            for (group, members) in registry.groups() {
                println!("  {}: {}", group.bold(), members.join(", "));
            }
        }
    }

    async fn status(&self, selector: &Selector, output: OutputFormat) -> DmResult<i32> {
        let result = StatusCheckUseCase::new(self.workspace, self.context.runner.clone())
            .status(selector)
            .await;
        match output {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
            OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&result)?),
            OutputFormat::Text => print_status(&result),
        }
        Ok(result.exit_code())
    }

    async fn test(
        &self,
        selector: &Selector,
        options: TestOptions,
        env: EnvOverlay,
        mode: TestMode,
    ) -> DmResult<i32> {
        let name = single_name(selector)?;
        let use_case = RunTestsUseCase::new(self.workspace, self.context.runner.clone());

        match mode {
            TestMode::Show => {
                print!("{}", use_case.show(name)?);
                Ok(0)
            }
            TestMode::List => {
                for listing in use_case.list(name)? {
                    let root = format!("{}/", listing.root.display());
                    if listing.exists {
                        print!("{}", display::tree(&root, &listing.entries));
                    } else {
                        display::warning(&format!("{} does not exist", root));
                    }
                }
                Ok(0)
            }
            TestMode::Run => {
                if env.get("MONGODB_URI").is_none() {
                    display::notice(DEFAULT_DATABASE_NOTICE);
                }
                display::header(&format!("Testing {}", name));
                let config = RunTestsConfig::new(name)
                    .with_options(options)
                    .with_env(env);
                let result = use_case.execute(&config).await?;
                print_fixtures(&result.fixtures);
                for run in &result.runs {
                    let root = run.root.display().to_string();
                    match (&run.error, run.exit_code) {
                        (Some(error), _) => {
                            println!("{} {}: {}", "✗".red().bold(), root.bold(), error.red())
                        }
                        (None, Some(0)) => display::success(&format!("{}: passed", root)),
                        (None, Some(code)) => println!(
                            "{} {}: exited with {}",
                            "✗".red().bold(),
                            root.bold(),
                            code
                        ),
                        (None, None) => println!(
                            "{} {}: terminated by signal",
                            "✗".red().bold(),
                            root.bold()
                        ),
                    }
                }
                Ok(result.exit_code())
            }
        }
    }

    async fn makemigrations(
        &self,
        selector: &Selector,
        args: &[String],
        env: &EnvOverlay,
    ) -> DmResult<i32> {
        let name = single_name(selector)?;
        display::header(&format!("Making migrations for {}", name));
        let result = MakeMigrationsUseCase::new(self.workspace, self.context.runner.clone())
            .execute(name, args, env)
            .await?;
        print_fixtures(&result.fixtures);
        display::success(&format!("makemigrations finished for {}", name));
        Ok(0)
    }
}

/// Single-repository actions always carry exactly one name
fn single_name(selector: &Selector) -> DmResult<&str> {
    match selector {
        Selector::Names(names) if names.len() == 1 => Ok(&names[0]),
        other => Err(DmError::internal_error(format!(
            "expected a single repository, got {:?}",
            other
        ))),
    }
}

fn describe(selector: &Selector) -> String {
    match selector {
        Selector::All => "every repository".to_string(),
        Selector::Names(names) => names.join(", "),
        Selector::Groups(groups) => format!("group {}", groups.join(", ")),
    }
}

fn print_status(result: &StatusResult) {
    for status in &result.repositories {
        println!("{}", status_line(status));
    }
    for name in &result.unknown {
        println!("{}: {}", name.bold(), "not found".red());
    }
}

fn status_line(status: &RepositoryStatus) -> String {
    let state = match status.state {
        RepositoryState::Clean => "clean".green(),
        RepositoryState::Dirty => "dirty".yellow(),
        RepositoryState::Missing => "missing".red(),
        RepositoryState::Error => "error".red(),
    };
    let mut line = format!("{}: {}", status.name.bold(), state);

    if let Some(branch) = &status.branch {
        line.push_str(&format!(" ({})", branch.blue()));
    }
    if let Some(url) = status.remote_url.as_deref().filter(|u| !u.is_empty()) {
        line.push_str(&format!(" {}", url.dimmed()));
    }

    if status.state == RepositoryState::Dirty {
        let mut changes = Vec::new();
        if status.modified_files > 0 {
            changes.push(format!("{}M", status.modified_files));
        }
        if status.staged_files > 0 {
            changes.push(format!("{}S", status.staged_files));
        }
        if status.untracked_files > 0 {
            changes.push(format!("{}U", status.untracked_files));
        }
        if !changes.is_empty() {
            line.push_str(&format!(" [{}]", changes.join(" ")));
        }
    }

    if status.commits_ahead > 0 {
        line.push_str(&format!(" ↑{}", status.commits_ahead));
    }
    if status.commits_behind > 0 {
        line.push_str(&format!(" ↓{}", status.commits_behind));
    }
    if let Some(error) = &status.error_message {
        line.push_str(&format!(" {}", error.red()));
    }
    line
}
