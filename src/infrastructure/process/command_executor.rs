use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command as TokioCommand;

use crate::common::error::DmError;
use crate::common::result::{async_helpers::with_optional_timeout, DmResult};
use crate::domain::value_objects::EnvOverlay;

/// How the child's stdout/stderr are handled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputMode {
    /// Capture stdout and stderr into the result
    #[default]
    Capture,
    /// Stream directly to the terminal
    Inherit,
}

/// A single external command to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub working_directory: Option<PathBuf>,
    /// Applied on top of the inherited environment
    pub env: EnvOverlay,
    pub output: OutputMode,
    pub timeout_secs: Option<u64>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_directory: None,
            env: EnvOverlay::new(),
            output: OutputMode::Capture,
            timeout_secs: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn with_working_directory<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.working_directory = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Merge `env` into this command's overlay (later values win)
    pub fn with_env(mut self, env: &EnvOverlay) -> Self {
        self.env.merge(env);
        self
    }

    pub fn with_env_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.set(key, value);
        self
    }

    pub fn with_output(mut self, output: OutputMode) -> Self {
        self.output = output;
        self
    }

    pub fn inherit_output(self) -> Self {
        self.with_output(OutputMode::Inherit)
    }

    pub fn with_timeout(mut self, timeout_secs: Option<u64>) -> Self {
        self.timeout_secs = timeout_secs.filter(|t| *t > 0);
        self
    }

    /// Shell-like rendering used in logs and error messages
    pub fn display(&self) -> String {
        std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|part| {
                if part.is_empty() || part.contains(char::is_whitespace) {
                    format!("'{}'", part)
                } else {
                    part.clone()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Result of command execution
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code of the process (None when terminated by a signal)
    pub exit_code: Option<i32>,

    /// Standard output (empty when streamed)
    pub stdout: String,

    /// Standard error output (empty when streamed)
    pub stderr: String,

    /// Execution time in milliseconds
    pub elapsed_ms: u64,
}

impl ProcessOutput {
    pub fn new(exit_code: Option<i32>, stdout: String, stderr: String, elapsed_ms: u64) -> Self {
        Self {
            exit_code,
            stdout,
            stderr,
            elapsed_ms,
        }
    }

    /// Successful result with the given stdout
    pub fn success_with(stdout: impl Into<String>) -> Self {
        Self::new(Some(0), stdout.into(), String::new(), 0)
    }

    /// Failed result with the given exit code and stderr
    pub fn failure(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self::new(Some(exit_code), String::new(), stderr.into(), 0)
    }

    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Last non-empty line of stderr
    pub fn last_stderr_line(&self) -> Option<&str> {
        self.stderr
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .last()
    }

    /// Convert a non-zero exit into an `ExternalTool` error
    pub fn check(self, command: &CommandSpec) -> DmResult<Self> {
        if self.success() {
            return Ok(self);
        }
        let message = self
            .last_stderr_line()
            .map(str::to_string)
            .unwrap_or_else(|| "command exited unsuccessfully".to_string());
        Err(DmError::external_tool(message, command.display(), self.exit_code))
    }
}

/// Boundary for every external process the tool launches
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run a command to completion
    async fn run(&self, command: &CommandSpec) -> DmResult<ProcessOutput>;

    /// Run `primary` to completion while `companion` runs alongside it.
    /// The companion is terminated when the primary exits or on interrupt.
    async fn run_with_companion(
        &self,
        primary: &CommandSpec,
        companion: &CommandSpec,
    ) -> DmResult<ProcessOutput>;
}

/// Production runner backed by `tokio::process`
#[derive(Debug, Clone, Default)]
pub struct TokioProcessRunner;

impl TokioProcessRunner {
    pub fn new() -> Self {
        Self
    }

    /// Build the tokio command for a spec
    pub(crate) fn build_command(command: &CommandSpec) -> TokioCommand {
        let mut cmd = TokioCommand::new(&command.program);
        cmd.args(&command.args).kill_on_drop(true);

        if let Some(ref dir) = command.working_directory {
            cmd.current_dir(dir);
        }
        for (key, value) in command.env.iter() {
            cmd.env(key, value);
        }

        match command.output {
            OutputMode::Capture => {
                cmd.stdin(Stdio::null())
                    .stdout(Stdio::piped())
                    .stderr(Stdio::piped());
            }
            OutputMode::Inherit => {
                cmd.stdin(Stdio::inherit())
                    .stdout(Stdio::inherit())
                    .stderr(Stdio::inherit());
            }
        }
        cmd
    }

    pub(crate) fn spawn_error(command: &CommandSpec, error: std::io::Error) -> DmError {
        let message = if error.kind() == std::io::ErrorKind::NotFound {
            format!("'{}' was not found on PATH", command.program)
        } else {
            format!("failed to start: {}", error)
        };
        DmError::external_tool(message, command.display(), Some(127))
    }

    async fn execute(command: &CommandSpec) -> DmResult<ProcessOutput> {
        let mut cmd = Self::build_command(command);
        let start = Instant::now();

        let output = match command.output {
            OutputMode::Capture => {
                let output = cmd
                    .output()
                    .await
                    .map_err(|e| Self::spawn_error(command, e))?;
                ProcessOutput::new(
                    output.status.code(),
                    String::from_utf8_lossy(&output.stdout).into_owned(),
                    String::from_utf8_lossy(&output.stderr).into_owned(),
                    0,
                )
            }
            OutputMode::Inherit => {
                let status = cmd
                    .status()
                    .await
                    .map_err(|e| Self::spawn_error(command, e))?;
                ProcessOutput::new(status.code(), String::new(), String::new(), 0)
            }
        };

        Ok(ProcessOutput {
            elapsed_ms: start.elapsed().as_millis() as u64,
            ..output
        })
    }
}

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(&self, command: &CommandSpec) -> DmResult<ProcessOutput> {
        tracing::debug!(
            program = %command.program,
            args = ?command.args,
            cwd = ?command.working_directory,
            env = ?command.env.iter().map(|(k, _)| k).collect::<Vec<_>>(),
            "running command"
        );

        let result = with_optional_timeout(Self::execute(command), command.timeout_secs).await;

        match &result {
            Ok(output) => tracing::debug!(
                command = %command.display(),
                exit_code = ?output.exit_code,
                elapsed_ms = output.elapsed_ms,
                "command finished"
            ),
            Err(e) => tracing::debug!(command = %command.display(), error = %e, "command failed"),
        }
        result
    }

    async fn run_with_companion(
        &self,
        primary: &CommandSpec,
        companion: &CommandSpec,
    ) -> DmResult<ProcessOutput> {
        super::supervisor::Supervisor::new(primary.clone())
            .with_companion(companion.clone())
            .run()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_command_spec_builder() {
        let env = EnvOverlay::new().with("MONGODB_URI", "mongodb://localhost");
        let spec = CommandSpec::new("git")
            .args(["clone", "https://example.com/demo.git"])
            .arg("/tmp/my dir")
            .with_working_directory("/tmp")
            .with_env(&env)
            .with_timeout(Some(0));

        assert_eq!(spec.args.len(), 3);
        assert_eq!(spec.working_directory, Some(PathBuf::from("/tmp")));
        assert_eq!(spec.env.get("MONGODB_URI"), Some("mongodb://localhost"));
        assert_eq!(spec.timeout_secs, None);
        assert_eq!(
            spec.display(),
            "git clone https://example.com/demo.git '/tmp/my dir'"
        );
    }

    #[test]
    fn test_last_stderr_line_skips_blank_lines() {
        let output = ProcessOutput::failure(1, "warning: x\nCommandError: boom\n\n  \n");
        assert_eq!(output.last_stderr_line(), Some("CommandError: boom"));
        assert_eq!(ProcessOutput::default().last_stderr_line(), None);
    }

    #[test]
    fn test_check_maps_failure_to_external_tool() {
        let spec = CommandSpec::new("pip").args(["install", "-e", "."]);
        let err = ProcessOutput::failure(2, "ERROR: no setup\n")
            .check(&spec)
            .unwrap_err();
        match err {
            DmError::ExternalTool {
                message,
                command,
                exit_code,
            } => {
                assert_eq!(message, "ERROR: no setup");
                assert_eq!(command, "pip install -e .");
                assert_eq!(exit_code, Some(2));
            }
            other => panic!("unexpected error: {:?}", other),
        }

        assert!(ProcessOutput::success_with("ok").check(&spec).is_ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_tokio_runner_captures_output_and_env() {
        let runner = TokioProcessRunner::new();
        let spec = CommandSpec::new("sh")
            .args(["-c", "echo \"$DM_TEST_VALUE\"; echo oops >&2; exit 3"])
            .with_env_var("DM_TEST_VALUE", "hello");

        let output = runner.run(&spec).await.unwrap();
        assert_eq!(output.exit_code, Some(3));
        assert_eq!(output.stdout.trim(), "hello");
        assert_eq!(output.last_stderr_line(), Some("oops"));
        assert!(std::env::var("DM_TEST_VALUE").is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_tokio_runner_honours_timeout() {
        let runner = TokioProcessRunner::new();
        let spec = CommandSpec::new("sleep").arg("5").with_timeout(Some(1));
        match runner.run(&spec).await {
            Err(DmError::Timeout { timeout_secs }) => assert_eq!(timeout_secs, 1),
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_program_is_external_tool_error() {
        let runner = TokioProcessRunner::new();
        let spec = CommandSpec::new("dm-definitely-not-a-real-program");
        let err = runner.run(&spec).await.unwrap_err();
        assert_eq!(err.exit_code(), 127);
    }
}
