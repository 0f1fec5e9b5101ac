use std::time::Instant;
use tokio::process::Child;

use super::command_executor::{CommandSpec, OutputMode, ProcessOutput, TokioProcessRunner};
use crate::common::error::DmError;
use crate::common::result::DmResult;

/// Runs a primary process with an optional companion (e.g. a frontend
/// watcher next to the development server).
///
/// Both processes stream to the terminal. The companion never outlives the
/// primary: it is terminated when the primary exits, and on Ctrl-C both are
/// terminated before control returns.
pub struct Supervisor {
    primary: CommandSpec,
    companion: Option<CommandSpec>,
}

impl Supervisor {
    pub fn new(primary: CommandSpec) -> Self {
        Self {
            primary,
            companion: None,
        }
    }

    pub fn with_companion(mut self, companion: CommandSpec) -> Self {
        self.companion = Some(companion);
        self
    }

    fn spawn(command: &CommandSpec) -> DmResult<Child> {
        let streamed = command.clone().with_output(OutputMode::Inherit);
        tracing::debug!(
            program = %streamed.program,
            args = ?streamed.args,
            cwd = ?streamed.working_directory,
            "spawning supervised process"
        );
        TokioProcessRunner::build_command(&streamed)
            .spawn()
            .map_err(|e| TokioProcessRunner::spawn_error(command, e))
    }

    async fn terminate(child: &mut Child, label: &str) {
        if let Err(e) = child.start_kill() {
            // Already exited.
            tracing::debug!("{} could not be signalled: {}", label, e);
            return;
        }
        if let Err(e) = child.wait().await {
            tracing::warn!("failed to reap {}: {}", label, e);
        }
    }

    async fn wait_companion(child: &mut Option<Child>) -> std::io::Result<std::process::ExitStatus> {
        match child {
            Some(child) => child.wait().await,
            None => std::future::pending().await,
        }
    }

    pub async fn run(self) -> DmResult<ProcessOutput> {
        let start = Instant::now();

        let mut companion = match &self.companion {
            Some(spec) => Some(Self::spawn(spec)?),
            None => None,
        };

        let mut primary = match Self::spawn(&self.primary) {
            Ok(child) => child,
            Err(e) => {
                if let Some(ref mut child) = companion {
                    Self::terminate(child, "companion process").await;
                }
                return Err(e);
            }
        };

        let mut companion_running = companion.is_some();
        let status = loop {
            tokio::select! {
                status = primary.wait() => break status,
                status = Self::wait_companion(&mut companion), if companion_running => {
                    companion_running = false;
                    match status {
                        Ok(status) => tracing::warn!("companion process exited early ({})", status),
                        Err(e) => tracing::warn!("companion process failed: {}", e),
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::debug!("interrupt received, stopping supervised processes");
                    if let Some(ref mut child) = companion {
                        Self::terminate(child, "companion process").await;
                    }
                    Self::terminate(&mut primary, "primary process").await;
                    return Err(DmError::Cancelled);
                }
            }
        };

        if companion_running {
            if let Some(ref mut child) = companion {
                Self::terminate(child, "companion process").await;
            }
        }

        let status = status.map_err(|e| {
            DmError::filesystem_error_with_source("failed to wait for process", None, e)
        })?;
        Ok(ProcessOutput::new(
            status.code(),
            String::new(),
            String::new(),
            start.elapsed().as_millis() as u64,
        ))
    }
}
