use std::path::Path;

use crate::infrastructure::process::CommandSpec;

/// Builds `django-admin` invocations
#[derive(Debug, Clone)]
pub struct DjangoAdmin {
    program: String,
    timeout_secs: Option<u64>,
}

impl Default for DjangoAdmin {
    fn default() -> Self {
        Self {
            program: "django-admin".to_string(),
            timeout_secs: None,
        }
    }
}

impl DjangoAdmin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout_secs: Option<u64>) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    fn command(&self, subcommand: &str) -> CommandSpec {
        CommandSpec::new(&self.program)
            .arg(subcommand)
            .with_timeout(self.timeout_secs)
    }

    fn with_template(command: CommandSpec, template: Option<&Path>) -> CommandSpec {
        match template {
            Some(template) => command.arg("--template").arg(template.to_string_lossy()),
            None => command,
        }
    }

    /// `django-admin startproject [--template T] NAME` run inside `parent`
    pub fn startproject(&self, name: &str, template: Option<&Path>, parent: &Path) -> CommandSpec {
        Self::with_template(self.command("startproject"), template)
            .arg(name)
            .with_working_directory(parent)
    }

    /// `django-admin startapp [--template T] NAME TARGET`
    pub fn startapp(&self, name: &str, template: Option<&Path>, target: &Path) -> CommandSpec {
        Self::with_template(self.command("startapp"), template)
            .arg(name)
            .arg(target.to_string_lossy())
    }

    /// Long-running development server; never given a timeout
    pub fn runserver(&self, host: &str, port: u16) -> CommandSpec {
        CommandSpec::new(&self.program)
            .arg("runserver")
            .arg(format!("{}:{}", host, port))
    }

    pub fn migrate(&self, app_label: Option<&str>, migration: Option<&str>) -> CommandSpec {
        self.command("migrate").args(app_label).args(migration)
    }

    pub fn makemigrations(&self, app_label: Option<&str>) -> CommandSpec {
        self.command("makemigrations").args(app_label)
    }

    /// `makemigrations` against a cloned repository's migrations settings
    pub fn makemigrations_with_settings(
        &self,
        settings: &str,
        pythonpath: &Path,
        extra: &[String],
    ) -> CommandSpec {
        self.command("makemigrations")
            .args(["--settings", settings, "--pythonpath"])
            .arg(pythonpath.to_string_lossy())
            .args(extra.iter().cloned())
    }

    /// Arbitrary management command; bare `django-admin` when none is given
    pub fn manage(&self, command: Option<&str>, args: &[String]) -> CommandSpec {
        let base = CommandSpec::new(&self.program).with_timeout(self.timeout_secs);
        match command {
            Some(command) => base.arg(command).args(args.iter().cloned()),
            None => base,
        }
    }

    /// Non-interactive `createsuperuser`; the password travels via the environment
    pub fn createsuperuser(&self, username: &str, email: &str) -> CommandSpec {
        self.command("createsuperuser")
            .args(["--noinput", "--username", username, "--email", email])
    }
}
