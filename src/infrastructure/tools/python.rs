use std::path::Path;

use crate::domain::entities::manifest::Installer;
use crate::infrastructure::process::CommandSpec;

/// Builds pip / uv / setup.py invocations
#[derive(Debug, Clone)]
pub struct PythonTool {
    python: String,
    installer: Installer,
    timeout_secs: Option<u64>,
}

impl PythonTool {
    pub fn new(python: impl Into<String>, installer: Installer) -> Self {
        Self {
            python: python.into(),
            installer,
            timeout_secs: None,
        }
    }

    pub fn with_timeout(mut self, timeout_secs: Option<u64>) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    fn pip(&self) -> CommandSpec {
        let command = match self.installer {
            Installer::Pip => CommandSpec::new(&self.python).args(["-m", "pip"]),
            Installer::Uv => CommandSpec::new("uv").arg("pip"),
        };
        command.with_timeout(self.timeout_secs)
    }

    /// Editable install of a directory with a build-system manifest
    pub fn editable_install(&self, path: &Path) -> CommandSpec {
        self.pip()
            .args(["install", "-e"])
            .arg(path.to_string_lossy())
            .with_working_directory(path)
    }

    /// Legacy `setup.py develop`
    pub fn setup_develop(&self, path: &Path) -> CommandSpec {
        CommandSpec::new(&self.python)
            .args(["setup.py", "develop"])
            .with_working_directory(path)
            .with_timeout(self.timeout_secs)
    }

    /// `pip install -r requirements.txt`
    pub fn requirements_install(&self, path: &Path, requirements: &Path) -> CommandSpec {
        self.pip()
            .args(["install", "-r"])
            .arg(requirements.to_string_lossy())
            .with_working_directory(path)
    }

    pub fn uninstall(&self, package: &str) -> CommandSpec {
        match self.installer {
            Installer::Pip => self.pip().args(["uninstall", "-y", package]),
            Installer::Uv => self.pip().args(["uninstall", package]),
        }
    }

    /// `pre-commit install` inside a fresh clone
    pub fn pre_commit_install(&self, repo_path: &Path) -> CommandSpec {
        CommandSpec::new("pre-commit")
            .arg("install")
            .with_working_directory(repo_path)
            .with_timeout(self.timeout_secs)
    }
}
