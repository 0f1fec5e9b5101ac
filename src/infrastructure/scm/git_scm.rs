use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use crate::common::error::DmError;
use crate::common::result::DmResult;
use crate::infrastructure::process::{CommandSpec, OutputMode, ProcessOutput, ProcessRunner};

/// Options for cloning repositories
#[derive(Debug, Clone, Default)]
pub struct CloneOptions {
    /// Branch to check out; falls back to the default branch when missing upstream
    pub branch: Option<String>,
    /// Stream git's progress to the terminal instead of capturing it
    pub stream_output: bool,
}

/// Outcome of a clone
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloneOutcome {
    /// Cloned with the requested branch (or the default when none was requested)
    Cloned,
    /// The requested branch does not exist upstream; the default branch was used
    FellBackToDefault { requested: String },
}

/// Parsed `git status --porcelain=v1 --branch`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitStatusSummary {
    pub branch: Option<String>,
    pub upstream: Option<String>,
    pub ahead: usize,
    pub behind: usize,
    pub staged: usize,
    pub modified: usize,
    pub untracked: usize,
}

impl GitStatusSummary {
    pub fn is_clean(&self) -> bool {
        self.staged == 0 && self.modified == 0 && self.untracked == 0
    }

    /// Parse porcelain v1 output including the `##` branch header
    pub fn parse(output: &str) -> Self {
        let mut summary = Self::default();
        for line in output.lines() {
            if let Some(header) = line.strip_prefix("## ") {
                summary.parse_branch_header(header);
                continue;
            }
            let mut chars = line.chars();
            let (x, y) = match (chars.next(), chars.next()) {
                (Some(x), Some(y)) => (x, y),
                _ => continue,
            };
            if x == '?' && y == '?' {
                summary.untracked += 1;
                continue;
            }
            if x == '!' {
                continue;
            }
            if x != ' ' {
                summary.staged += 1;
            }
            if y != ' ' {
                summary.modified += 1;
            }
        }
        summary
    }

    fn parse_branch_header(&mut self, header: &str) {
        if let Some(rest) = header.strip_prefix("No commits yet on ") {
            self.branch = Some(rest.trim().to_string());
            return;
        }
        if header.starts_with("HEAD (no branch)") {
            return;
        }

        let (refs, tracking) = match header.find(" [") {
            Some(i) => (&header[..i], Some(header[i + 2..].trim_end_matches(']'))),
            None => (header, None),
        };
        match refs.split_once("...") {
            Some((local, upstream)) => {
                self.branch = Some(local.to_string());
                self.upstream = Some(upstream.trim().to_string());
            }
            None => self.branch = Some(refs.trim().to_string()),
        }

        for part in tracking.into_iter().flat_map(|t| t.split(", ")) {
            if let Some(n) = part.strip_prefix("ahead ") {
                self.ahead = n.trim().parse().unwrap_or(0);
            } else if let Some(n) = part.strip_prefix("behind ") {
                self.behind = n.trim().parse().unwrap_or(0);
            }
        }
    }
}

/// Git client that shells out to the `git` executable through a [`ProcessRunner`]
#[derive(Clone)]
pub struct GitScm {
    runner: Arc<dyn ProcessRunner>,
    git_executable: String,
    timeout_secs: Option<u64>,
}

impl GitScm {
    /// Create a new Git client
    pub fn new(runner: Arc<dyn ProcessRunner>) -> Self {
        Self {
            runner,
            git_executable: "git".to_string(),
            timeout_secs: None,
        }
    }

    pub fn with_timeout(mut self, timeout_secs: Option<u64>) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    fn git_command(&self, args: &[&str], working_dir: Option<&Path>) -> CommandSpec {
        let mut command = CommandSpec::new(&self.git_executable)
            .args(args.iter().copied())
            .with_timeout(self.timeout_secs);
        if let Some(dir) = working_dir {
            command = command.with_working_directory(dir);
        }
        command
    }

    /// Execute a git command in the given directory
    async fn execute_git_command(
        &self,
        args: &[&str],
        working_dir: Option<&Path>,
    ) -> DmResult<ProcessOutput> {
        let command = self.git_command(args, working_dir);
        self.runner.run(&command).await
    }

    /// Execute a git command and check for success; returns trimmed stdout
    async fn execute_git_command_checked(
        &self,
        args: &[&str],
        working_dir: Option<&Path>,
    ) -> DmResult<String> {
        let command = self.git_command(args, working_dir);
        let output = self.runner.run(&command).await?.check(&command)?;
        Ok(output.stdout.trim_end().to_string())
    }

    /// Run a git command with output streamed to the terminal
    async fn execute_git_command_streamed(&self, args: &[&str], working_dir: &Path) -> DmResult<()> {
        let command = self
            .git_command(args, Some(working_dir))
            .with_output(OutputMode::Inherit);
        self.runner.run(&command).await?.check(&command)?;
        Ok(())
    }

    fn is_missing_branch(output: &ProcessOutput) -> bool {
        output.stderr.contains("not found in upstream")
            || output.stderr.contains("Could not find remote branch")
    }

    /// Clone `url` into `dest_path`
    pub async fn clone_repository(
        &self,
        url: &str,
        dest_path: &Path,
        options: &CloneOptions,
    ) -> DmResult<CloneOutcome> {
        let dest = dest_path.to_str().ok_or_else(|| {
            DmError::validation_error("path", "clone path is not valid UTF-8", None)
        })?;

        if let Some(branch) = &options.branch {
            // Captured and in the C locale so a missing branch can be detected from stderr.
            let command = self
                .git_command(&["clone", "--branch", branch.as_str(), url, dest], None)
                .with_env_var("LC_ALL", "C");
            let output = self.runner.run(&command).await?;
            if output.success() {
                return Ok(CloneOutcome::Cloned);
            }
            if !Self::is_missing_branch(&output) {
                return output.check(&command).map(|_| CloneOutcome::Cloned);
            }

            tracing::warn!(
                "branch '{}' not found upstream for {}, using the default branch",
                branch,
                url
            );
            if dest_path.exists() {
                tokio::fs::remove_dir_all(dest_path).await.map_err(|e| {
                    DmError::filesystem_error_with_source(
                        "failed to remove partial clone",
                        Some(dest_path.to_path_buf()),
                        e,
                    )
                })?;
            }
            self.clone_default(url, dest, options).await?;
            return Ok(CloneOutcome::FellBackToDefault {
                requested: branch.clone(),
            });
        }

        self.clone_default(url, dest, options).await?;
        Ok(CloneOutcome::Cloned)
    }

    async fn clone_default(&self, url: &str, dest: &str, options: &CloneOptions) -> DmResult<()> {
        let mut command = self.git_command(&["clone", url, dest], None);
        if options.stream_output {
            command = command.with_output(OutputMode::Inherit);
        }
        self.runner.run(&command).await?.check(&command)?;
        Ok(())
    }

    /// `git fetch <remote>`
    pub async fn fetch(&self, repo_path: &Path, remote: &str) -> DmResult<()> {
        self.execute_git_command_streamed(&["fetch", remote], repo_path)
            .await
    }

    /// `git pull`
    pub async fn pull(&self, repo_path: &Path) -> DmResult<()> {
        self.execute_git_command_streamed(&["pull"], repo_path).await
    }

    /// `git push`
    pub async fn push(&self, repo_path: &Path) -> DmResult<()> {
        self.execute_git_command_streamed(&["push"], repo_path).await
    }

    /// `git reset --hard HEAD`
    pub async fn reset_hard(&self, repo_path: &Path) -> DmResult<()> {
        self.execute_git_command_checked(&["reset", "--hard", "HEAD"], Some(repo_path))
            .await
            .map(|_| ())
    }

    pub async fn status(&self, repo_path: &Path) -> DmResult<GitStatusSummary> {
        let output = self
            .execute_git_command_checked(&["status", "--porcelain=v1", "--branch"], Some(repo_path))
            .await?;
        Ok(GitStatusSummary::parse(&output))
    }

    /// URL of `remote`, or None when it is not configured
    pub async fn remote_url(&self, repo_path: &Path, remote: &str) -> DmResult<Option<String>> {
        let output = self
            .execute_git_command(&["remote", "get-url", remote], Some(repo_path))
            .await?;
        Ok(output
            .success()
            .then(|| output.stdout.trim().to_string())
            .filter(|url| !url.is_empty()))
    }

    pub async fn diff(&self, repo_path: &Path) -> DmResult<String> {
        self.execute_git_command_checked(&["diff", "--no-color"], Some(repo_path))
            .await
    }

    pub async fn log(&self, repo_path: &Path, max_count: usize) -> DmResult<String> {
        let count = max_count.to_string();
        self.execute_git_command_checked(
            &[
                "log",
                "--no-color",
                "-n",
                &count,
                "--date=short",
                "--format=%h %ad %an %s",
            ],
            Some(repo_path),
        )
        .await
    }

    pub async fn remote_add(&self, repo_path: &Path, name: &str, url: &str) -> DmResult<()> {
        self.execute_git_command_checked(&["remote", "add", name, url], Some(repo_path))
            .await
            .map(|_| ())
    }

    pub async fn remote_remove(&self, repo_path: &Path, name: &str) -> DmResult<()> {
        self.execute_git_command_checked(&["remote", "remove", name], Some(repo_path))
            .await
            .map(|_| ())
    }
}
