use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DmError {
    #[error("Configuration error: {message}{}", display_path(path))]
    ConfigError {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Invalid manifest {}:\n  - {}", file_path.display(), problems.join("\n  - "))]
    ManifestValidation {
        file_path: PathBuf,
        problems: Vec<String>,
    },

    #[error("{kind} '{name}' not found")]
    NotFound { kind: String, name: String },

    #[error("`{command}` failed{}: {message}", display_exit_code(exit_code))]
    ExternalTool {
        message: String,
        command: String,
        exit_code: Option<i32>,
    },

    #[error("{message}")]
    StateConflict {
        message: String,
        path: Option<PathBuf>,
    },

    #[error("File system operation failed: {message}{}", display_path(path))]
    FileSystemError {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Validation error: {field} - {message}")]
    ValidationError {
        field: String,
        message: String,
        value: Option<String>,
    },

    #[error("Serialization error: {message}")]
    SerializationError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Operation timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    #[error("Internal error: {message}")]
    InternalError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

fn display_path(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| format!(" ({})", p.display()))
        .unwrap_or_default()
}

fn display_exit_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!(" with exit code {}", code),
        None => " (terminated by signal)".to_string(),
    }
}

impl DmError {
    pub fn config_error(message: impl Into<String>, path: Option<PathBuf>) -> Self {
        Self::ConfigError {
            message: message.into(),
            path,
            source: None,
        }
    }

    pub fn config_error_with_source(
        message: impl Into<String>,
        path: Option<PathBuf>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::ConfigError {
            message: message.into(),
            path,
            source: Some(Box::new(source)),
        }
    }

    pub fn manifest_validation(file_path: impl Into<PathBuf>, problems: Vec<String>) -> Self {
        Self::ManifestValidation {
            file_path: file_path.into(),
            problems,
        }
    }

    pub fn not_found(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            name: name.into(),
        }
    }

    pub fn repository_not_found(name: impl Into<String>) -> Self {
        Self::not_found("Repository", name)
    }

    pub fn external_tool(
        message: impl Into<String>,
        command: impl Into<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::ExternalTool {
            message: message.into(),
            command: command.into(),
            exit_code,
        }
    }

    pub fn state_conflict(message: impl Into<String>, path: Option<PathBuf>) -> Self {
        Self::StateConflict {
            message: message.into(),
            path,
        }
    }

    pub fn filesystem_error(message: impl Into<String>, path: Option<PathBuf>) -> Self {
        Self::FileSystemError {
            message: message.into(),
            path,
            source: None,
        }
    }

    pub fn filesystem_error_with_source(
        message: impl Into<String>,
        path: Option<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::FileSystemError {
            message: message.into(),
            path,
            source: Some(source),
        }
    }

    pub fn validation_error(
        field: impl Into<String>,
        message: impl Into<String>,
        value: Option<String>,
    ) -> Self {
        Self::ValidationError {
            field: field.into(),
            message: message.into(),
            value,
        }
    }

    pub fn serialization_error_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::SerializationError {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn timeout(timeout_secs: u64) -> Self {
        Self::Timeout { timeout_secs }
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::InternalError {
            message: message.into(),
            source: None,
        }
    }

    pub fn internal_error_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::InternalError {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Process exit code the CLI reports for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConfigError { .. } | Self::ManifestValidation { .. } => 2,
            Self::ExternalTool { exit_code, .. } => match exit_code {
                Some(code) if *code != 0 => *code,
                _ => 1,
            },
            Self::Timeout { .. } => 124,
            Self::Cancelled => 130,
            _ => 1,
        }
    }

    /// Configuration errors abort the whole invocation; everything else is
    /// reported per repository and lets a batch continue.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ConfigError { .. } | Self::ManifestValidation { .. } | Self::Cancelled
        )
    }
}

impl From<std::io::Error> for DmError {
    fn from(error: std::io::Error) -> Self {
        Self::filesystem_error_with_source("File system operation failed", None, error)
    }
}

impl From<serde_yaml::Error> for DmError {
    fn from(error: serde_yaml::Error) -> Self {
        Self::serialization_error_with_source("YAML serialization failed", error)
    }
}

impl From<serde_json::Error> for DmError {
    fn from(error: serde_json::Error) -> Self {
        Self::serialization_error_with_source("JSON serialization failed", error)
    }
}

impl From<toml::ser::Error> for DmError {
    fn from(error: toml::ser::Error) -> Self {
        Self::serialization_error_with_source("TOML serialization failed", error)
    }
}

impl From<walkdir::Error> for DmError {
    fn from(error: walkdir::Error) -> Self {
        let path = error.path().map(|p| p.to_path_buf());
        match error.into_io_error() {
            Some(io) => Self::filesystem_error_with_source("Directory walk failed", path, io),
            None => Self::filesystem_error("Directory walk failed (filesystem loop)", path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_names_path() {
        let error = DmError::config_error(
            "manifest not found",
            Some(PathBuf::from("/work/pyproject.toml")),
        );
        assert_eq!(
            error.to_string(),
            "Configuration error: manifest not found (/work/pyproject.toml)"
        );
        assert_eq!(error.exit_code(), 2);
        assert!(error.is_fatal());
    }

    #[test]
    fn test_manifest_validation_lists_every_problem() {
        let error = DmError::manifest_validation(
            "pyproject.toml",
            vec!["duplicate repository 'a'".to_string(), "bad spec".to_string()],
        );
        let rendered = error.to_string();
        assert!(rendered.contains("duplicate repository 'a'"));
        assert!(rendered.contains("bad spec"));
    }

    #[test]
    fn test_external_tool_propagates_exit_code() {
        let error = DmError::external_tool("tests failed", "pytest -k foo", Some(3));
        assert_eq!(error.exit_code(), 3);
        assert_eq!(
            error.to_string(),
            "`pytest -k foo` failed with exit code 3: tests failed"
        );

        let killed = DmError::external_tool("killed", "pytest", None);
        assert_eq!(killed.exit_code(), 1);
        assert!(!killed.is_fatal());
    }

    #[test]
    fn test_not_found_display() {
        let error = DmError::repository_not_found("django-allauth");
        assert_eq!(error.to_string(), "Repository 'django-allauth' not found");
        assert_eq!(error.exit_code(), 1);
    }

    #[test]
    fn test_timeout_and_cancel_exit_codes() {
        assert_eq!(DmError::timeout(30).exit_code(), 124);
        assert_eq!(DmError::Cancelled.exit_code(), 130);
    }

    #[test]
    fn test_error_conversion_from_io_error() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let dm_error: DmError = io_error.into();
        assert!(matches!(dm_error, DmError::FileSystemError { .. }));
    }
}
