use std::path::Path;

use crate::infrastructure::process::CommandSpec;

/// Builds npm invocations for a project's frontend directory
#[derive(Debug, Clone)]
pub struct NpmTool {
    program: String,
    timeout_secs: Option<u64>,
}

impl Default for NpmTool {
    fn default() -> Self {
        Self {
            program: "npm".to_string(),
            timeout_secs: None,
        }
    }
}

impl NpmTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout_secs: Option<u64>) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn install(&self, frontend_dir: &Path) -> CommandSpec {
        CommandSpec::new(&self.program)
            .arg("install")
            .with_working_directory(frontend_dir)
            .with_timeout(self.timeout_secs)
    }

    /// `npm run <script>`; scripts such as `watch` run until stopped
    pub fn run_script(&self, frontend_dir: &Path, script: &str) -> CommandSpec {
        CommandSpec::new(&self.program)
            .args(["run", script])
            .with_working_directory(frontend_dir)
    }
}
