//! A process runner that records commands instead of launching them

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use django_mongodb_cli::infrastructure::process::{CommandSpec, ProcessOutput, ProcessRunner};
use django_mongodb_cli::Result as DmResult;

/// Records every command and answers with success, unless a failure was
/// scripted for the program.
///
/// `git clone` is simulated by creating the destination directory with an
/// empty `.git` inside, so idempotence checks can look at the file system.
#[derive(Debug, Clone, Default)]
pub struct RecordingRunner {
    calls: Arc<Mutex<Vec<CommandSpec>>>,
    failures: Arc<Mutex<HashMap<String, (i32, String)>>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call whose first argument is `subcommand` fail
    pub fn fail_on(&self, subcommand: &str, exit_code: i32, stderr: &str) {
        self.failures
            .lock()
            .unwrap()
            .insert(subcommand.to_string(), (exit_code, stderr.to_string()));
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }

    /// `program arg arg ...` for each recorded call
    pub fn command_lines(&self) -> Vec<String> {
        self.calls()
            .iter()
            .map(|c| {
                let program = PathBuf::from(&c.program)
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| c.program.clone());
                std::iter::once(program)
                    .chain(c.args.iter().cloned())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect()
    }

    /// Calls whose first argument is `subcommand`
    pub fn calls_for(&self, subcommand: &str) -> Vec<CommandSpec> {
        self.calls()
            .into_iter()
            .filter(|c| c.args.first().map(String::as_str) == Some(subcommand))
            .collect()
    }

    fn respond(&self, command: &CommandSpec) -> ProcessOutput {
        self.calls.lock().unwrap().push(command.clone());

        let subcommand = command.args.first().cloned().unwrap_or_default();
        if let Some((code, stderr)) = self.failures.lock().unwrap().get(&subcommand) {
            return ProcessOutput::failure(*code, stderr.clone());
        }

        if command.program == "git" && subcommand == "clone" {
            if let Some(dest) = command.args.last() {
                std::fs::create_dir_all(PathBuf::from(dest).join(".git")).unwrap();
            }
        }
        ProcessOutput::success_with("")
    }
}

#[async_trait]
impl ProcessRunner for RecordingRunner {
    async fn run(&self, command: &CommandSpec) -> DmResult<ProcessOutput> {
        Ok(self.respond(command))
    }

    async fn run_with_companion(
        &self,
        primary: &CommandSpec,
        companion: &CommandSpec,
    ) -> DmResult<ProcessOutput> {
        self.calls.lock().unwrap().push(companion.clone());
        Ok(self.respond(primary))
    }
}
